//! Signed rationals with deferred division
//!
//! PID terms are accumulated as a single exact fraction and divided once at
//! the end, so truncation never compounds across terms.

use serde::{Deserialize, Serialize};

use super::{i256_from_i128, I256};
use crate::error::{ConfigError, RateError, Result};

/// Signed `(numerator, denominator)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: i128,
    pub denominator: i128,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction::new(0, 1);
    pub const ONE: Fraction = Fraction::new(1, 1);

    pub const fn new(numerator: i128, denominator: i128) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Reject a zero denominator; `term` names the offending field
    pub fn validate(&self, term: &'static str) -> std::result::Result<(), ConfigError> {
        if self.denominator == 0 {
            return Err(ConfigError::ZeroDenominator { term });
        }
        Ok(())
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.numerator == 0
    }

    /// `value * numerator / denominator`, truncating toward zero
    pub fn scale(&self, value: I256) -> Result<I256> {
        let numerator = i256_from_i128(self.numerator)?;
        let denominator = i256_from_i128(self.denominator)?;

        value
            .checked_mul(numerator)
            .ok_or_else(|| RateError::overflow("fraction scale"))?
            .checked_div(denominator)
            .ok_or_else(|| RateError::overflow("fraction scale: zero denominator"))
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::ONE
    }
}

/// Exact running sum of `coefficient * value` terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RationalSum {
    numerator: I256,
    denominator: I256,
}

impl RationalSum {
    pub fn zero() -> Self {
        Self {
            numerator: I256::ZERO,
            denominator: I256::ONE,
        }
    }

    /// Add `coefficient * value` without dividing
    pub fn add_term(self, coefficient: Fraction, value: I256) -> Result<Self> {
        let term_denominator = i256_from_i128(coefficient.denominator)?;
        if term_denominator.is_zero() {
            return Err(RateError::overflow("rational term: zero denominator"));
        }

        let term_numerator = i256_from_i128(coefficient.numerator)?
            .checked_mul(value)
            .ok_or_else(|| RateError::overflow("rational term numerator"))?;

        self.add_ratio(term_numerator, term_denominator)
    }

    /// Add another exact sum
    pub fn add(self, other: RationalSum) -> Result<Self> {
        self.add_ratio(other.numerator, other.denominator)
    }

    fn add_ratio(self, numerator: I256, denominator: I256) -> Result<Self> {
        if numerator.is_zero() {
            return Ok(self);
        }
        if self.numerator.is_zero() {
            return Ok(Self {
                numerator,
                denominator,
            });
        }

        if denominator == self.denominator {
            let numerator = self
                .numerator
                .checked_add(numerator)
                .ok_or_else(|| RateError::overflow("rational sum"))?;
            return Ok(Self {
                numerator,
                denominator: self.denominator,
            });
        }

        let left = self
            .numerator
            .checked_mul(denominator)
            .ok_or_else(|| RateError::overflow("rational sum cross product"))?;
        let right = numerator
            .checked_mul(self.denominator)
            .ok_or_else(|| RateError::overflow("rational sum cross product"))?;

        Ok(Self {
            numerator: left
                .checked_add(right)
                .ok_or_else(|| RateError::overflow("rational sum"))?,
            denominator: self
                .denominator
                .checked_mul(denominator)
                .ok_or_else(|| RateError::overflow("rational sum denominator"))?,
        })
    }

    /// Divide once, truncating toward zero
    pub fn truncate(self) -> Result<I256> {
        self.numerator
            .checked_div(self.denominator)
            .ok_or_else(|| RateError::overflow("rational truncate"))
    }

    pub fn numerator(&self) -> I256 {
        self.numerator
    }

    pub fn denominator(&self) -> I256 {
        self.denominator
    }
}

impl Default for RationalSum {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i(v: i128) -> I256 {
        i256_from_i128(v).unwrap()
    }

    #[test]
    fn test_validate_zero_denominator() {
        assert_eq!(
            Fraction::new(1, 0).validate("kP"),
            Err(ConfigError::ZeroDenominator { term: "kP" })
        );
        assert!(Fraction::new(0, 7).validate("kP").is_ok());
    }

    #[test]
    fn test_scale_truncates_toward_zero() {
        let third = Fraction::new(1, 3);
        assert_eq!(third.scale(i(10)).unwrap(), i(3));
        assert_eq!(third.scale(i(-10)).unwrap(), i(-3));

        let negative = Fraction::new(-1, 3);
        assert_eq!(negative.scale(i(10)).unwrap(), i(-3));
    }

    #[test]
    fn test_deferred_division_avoids_compounded_truncation() {
        // 1/3 * 1 + 1/3 * 1 + 1/3 * 1 == 1 exactly, but 0 + 0 + 0 if truncated per term
        let third = Fraction::new(1, 3);
        let sum = RationalSum::zero()
            .add_term(third, i(1))
            .unwrap()
            .add_term(third, i(1))
            .unwrap()
            .add_term(third, i(1))
            .unwrap();
        assert_eq!(sum.truncate().unwrap(), i(1));
    }

    #[test]
    fn test_mixed_denominators() {
        // 1/2 * 3 + 1/3 * 4 = 3/2 + 4/3 = 17/6 -> 2
        let sum = RationalSum::zero()
            .add_term(Fraction::new(1, 2), i(3))
            .unwrap()
            .add_term(Fraction::new(1, 3), i(4))
            .unwrap();
        assert_eq!(sum.numerator(), i(17));
        assert_eq!(sum.denominator(), i(6));
        assert_eq!(sum.truncate().unwrap(), i(2));
    }

    #[test]
    fn test_add_sums_exactly() {
        // 1/3 * 2 + (1/6 * 2) = 1
        let left = RationalSum::zero().add_term(Fraction::new(1, 3), i(2)).unwrap();
        let right = RationalSum::zero().add_term(Fraction::new(1, 6), i(2)).unwrap();
        assert_eq!(left.add(right).unwrap().truncate().unwrap(), i(1));
        assert_eq!(left.add(RationalSum::zero()).unwrap(), left);
    }

    #[test]
    fn test_zero_terms_keep_denominator() {
        let sum = RationalSum::zero()
            .add_term(Fraction::new(1, 4), i(3))
            .unwrap()
            .add_term(Fraction::new(0, 7), i(100))
            .unwrap()
            .add_term(Fraction::new(1, 4), i(1))
            .unwrap();
        assert_eq!(sum.denominator(), i(4));
        assert_eq!(sum.truncate().unwrap(), i(1));
    }

    #[test]
    fn test_negative_sum_truncates_toward_zero() {
        // -5/2 -> -2
        let sum = RationalSum::zero()
            .add_term(Fraction::new(-5, 2), i(1))
            .unwrap();
        assert_eq!(sum.truncate().unwrap(), i(-2));
    }

    #[test]
    fn test_overflow_is_reported() {
        let huge = Fraction::new(i128::MAX, 1);
        let result = RationalSum::zero()
            .add_term(huge, i(i128::MAX))
            .and_then(|s| s.add_term(Fraction::new(1, i128::MAX - 1), i(i128::MAX)))
            .and_then(|s| s.add_term(Fraction::new(1, i128::MAX - 2), i(i128::MAX)));
        assert!(matches!(result, Err(RateError::ArithmeticOverflow(_))));
    }
}
