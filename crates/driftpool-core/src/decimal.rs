//! # Decimal Arithmetic
//!
//! `Dec` wraps an arbitrary-precision decimal and pins down the rounding
//! policy so that every accounting value in the engine is deterministic and
//! reproducible across platforms:
//!
//! - `add`/`sub` are exact (the scale never grows past the operands');
//! - `mul`, `div`, `powi` and `sqrt` round half-even to
//!   [`DECIMAL_SCALE`](crate::constants::DECIMAL_SCALE) fractional digits;
//! - division by zero panics and is never catchable.
//!
//! Floating point appears nowhere in accounting; `to_f64` exists for display
//! and sampling only.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use std::sync::OnceLock;

use bigdecimal::{BigDecimal, ParseBigDecimalError, RoundingMode};
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::constants::{DECIMAL_SCALE, DUST_EXP};

/// High-precision decimal with a fixed rounding policy
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dec(BigDecimal);

impl Default for Dec {
    fn default() -> Self {
        Dec::zero()
    }
}

impl Dec {
    pub fn zero() -> Self {
        Dec(BigDecimal::zero())
    }

    pub fn one() -> Self {
        Dec(BigDecimal::one())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Strictly greater than zero
    pub fn is_positive(&self) -> bool {
        !self.0.is_zero() && self.0.is_positive()
    }

    /// True when the magnitude is below the engine's dust threshold (1e-48).
    ///
    /// Residues smaller than this are rounding artifacts of the 64-digit
    /// scale, not liquidity; fill loops treat them as exhausted.
    pub fn is_dust(&self) -> bool {
        self.0.abs().lt(&dust_threshold().0)
    }

    pub fn abs(&self) -> Dec {
        Dec(self.0.abs())
    }

    pub fn min(self, other: Dec) -> Dec {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Dec) -> Dec {
        if self >= other {
            self
        } else {
            other
        }
    }

    /// Integer power by repeated squaring, rounding after every step
    pub fn powi(&self, exp: i32) -> Dec {
        if exp == 0 {
            return Dec::one();
        }
        let mut base = if exp < 0 {
            Dec::one() / self.clone()
        } else {
            self.clone()
        };
        let mut e = exp.unsigned_abs();
        let mut acc = Dec::one();
        while e > 0 {
            if e & 1 == 1 {
                acc = &acc * &base;
            }
            e >>= 1;
            if e > 0 {
                base = &base * &base;
            }
        }
        acc
    }

    /// Square root; `None` for negative inputs
    pub fn sqrt(&self) -> Option<Dec> {
        self.0.sqrt().map(|r| Dec(rounded(r)))
    }

    /// Lossy conversion for display and sampling
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

/// Round to the engine scale, half-even
fn rounded(value: BigDecimal) -> BigDecimal {
    value.with_scale_round(DECIMAL_SCALE, RoundingMode::HalfEven)
}

fn dust_threshold() -> &'static Dec {
    static CELL: OnceLock<Dec> = OnceLock::new();
    CELL.get_or_init(|| {
        let mut t = format!("0.{}", "0".repeat((DUST_EXP - 1) as usize));
        t.push('1');
        Dec(t.parse().expect("dust threshold literal"))
    })
}

// ============================================================================
// Operators
// ============================================================================

/// Generate the four owned/borrowed impls for a binary operator.
/// `exact` keeps the raw result; `rounded` applies the engine scale.
macro_rules! dec_binop {
    ($trait:ident, $method:ident, exact) => {
        dec_binop!(@impls $trait, $method, |r| Dec(r));
    };
    ($trait:ident, $method:ident, rounded) => {
        dec_binop!(@impls $trait, $method, |r| Dec(rounded(r)));
    };
    (@impls $trait:ident, $method:ident, $wrap:expr) => {
        impl $trait<Dec> for Dec {
            type Output = Dec;
            fn $method(self, rhs: Dec) -> Dec {
                $wrap($trait::$method(self.0, rhs.0))
            }
        }
        impl<'a> $trait<&'a Dec> for Dec {
            type Output = Dec;
            fn $method(self, rhs: &'a Dec) -> Dec {
                $wrap($trait::$method(self.0, &rhs.0))
            }
        }
        impl<'a> $trait<Dec> for &'a Dec {
            type Output = Dec;
            fn $method(self, rhs: Dec) -> Dec {
                $wrap($trait::$method(&self.0, rhs.0))
            }
        }
        impl<'a, 'b> $trait<&'b Dec> for &'a Dec {
            type Output = Dec;
            fn $method(self, rhs: &'b Dec) -> Dec {
                $wrap($trait::$method(&self.0, &rhs.0))
            }
        }
    };
}

dec_binop!(Add, add, exact);
dec_binop!(Sub, sub, exact);
dec_binop!(Mul, mul, rounded);
dec_binop!(Div, div, rounded);

impl AddAssign<Dec> for Dec {
    fn add_assign(&mut self, rhs: Dec) {
        self.0 += rhs.0;
    }
}

impl AddAssign<&Dec> for Dec {
    fn add_assign(&mut self, rhs: &Dec) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<Dec> for Dec {
    fn sub_assign(&mut self, rhs: Dec) {
        self.0 -= rhs.0;
    }
}

impl SubAssign<&Dec> for Dec {
    fn sub_assign(&mut self, rhs: &Dec) {
        self.0 -= &rhs.0;
    }
}

impl Neg for Dec {
    type Output = Dec;
    fn neg(self) -> Dec {
        Dec(-self.0)
    }
}

impl Sum for Dec {
    fn sum<I: Iterator<Item = Dec>>(iter: I) -> Dec {
        iter.fold(Dec::zero(), |acc, v| acc + v)
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! dec_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Dec {
            fn from(value: $t) -> Dec {
                Dec(BigDecimal::from(value))
            }
        })*
    };
}

dec_from_int!(u32, u64, i32, i64);

impl FromStr for Dec {
    type Err = ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Dec(s.parse()?))
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.normalized().fmt(f)
    }
}
