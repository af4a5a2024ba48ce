//! Input/error transformers applied before the PID terms are computed

use ratekeeper_common::math::I256;
use ratekeeper_common::{ConfigError, Fraction, Result};
use serde::{Deserialize, Serialize};

/// Maps `(input, error)` to `(input', error')`
pub trait InputAndErrorTransformer {
    fn transform(&self, input: I256, error: I256) -> Result<(I256, I256)>;
}

/// Scales negative errors by `numerator / denominator`; everything else
/// passes through unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeErrorScalingTransformer {
    pub scale: Fraction,
}

impl NegativeErrorScalingTransformer {
    pub fn new(numerator: i128, denominator: i128) -> Self {
        Self {
            scale: Fraction::new(numerator, denominator),
        }
    }
}

impl InputAndErrorTransformer for NegativeErrorScalingTransformer {
    fn transform(&self, input: I256, error: I256) -> Result<(I256, I256)> {
        if error.is_negative() {
            Ok((input, self.scale.scale(error)?))
        } else {
            Ok((input, error))
        }
    }
}

/// Scales positive errors by `numerator / denominator`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositiveErrorScalingTransformer {
    pub scale: Fraction,
}

impl PositiveErrorScalingTransformer {
    pub fn new(numerator: i128, denominator: i128) -> Self {
        Self {
            scale: Fraction::new(numerator, denominator),
        }
    }
}

impl InputAndErrorTransformer for PositiveErrorScalingTransformer {
    fn transform(&self, input: I256, error: I256) -> Result<(I256, I256)> {
        if error.is_positive() {
            Ok((input, self.scale.scale(error)?))
        } else {
            Ok((input, error))
        }
    }
}

/// Transformer stored in a PID config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTransformer {
    NegativeErrorScaling(NegativeErrorScalingTransformer),
    PositiveErrorScaling(PositiveErrorScalingTransformer),
}

impl ErrorTransformer {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match self {
            ErrorTransformer::NegativeErrorScaling(t) => t.scale.validate("transformer"),
            ErrorTransformer::PositiveErrorScaling(t) => t.scale.validate("transformer"),
        }
    }
}

impl InputAndErrorTransformer for ErrorTransformer {
    fn transform(&self, input: I256, error: I256) -> Result<(I256, I256)> {
        match self {
            ErrorTransformer::NegativeErrorScaling(t) => t.transform(input, error),
            ErrorTransformer::PositiveErrorScaling(t) => t.transform(input, error),
        }
    }
}

impl From<NegativeErrorScalingTransformer> for ErrorTransformer {
    fn from(t: NegativeErrorScalingTransformer) -> Self {
        ErrorTransformer::NegativeErrorScaling(t)
    }
}

impl From<PositiveErrorScalingTransformer> for ErrorTransformer {
    fn from(t: PositiveErrorScalingTransformer) -> Self {
        ErrorTransformer::PositiveErrorScaling(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratekeeper_common::math::i256_from_i128;

    fn i(v: i128) -> I256 {
        i256_from_i128(v).unwrap()
    }

    #[test]
    fn test_negative_scaling_doubles_only_negative_errors() {
        let t = NegativeErrorScalingTransformer::new(2, 1);
        for input in [-1, 0, 1] {
            assert_eq!(t.transform(i(input), i(-1)).unwrap(), (i(input), i(-2)));
            assert_eq!(t.transform(i(input), i(0)).unwrap(), (i(input), i(0)));
            assert_eq!(t.transform(i(input), i(1)).unwrap(), (i(input), i(1)));
        }
    }

    #[test]
    fn test_positive_scaling_halves_positive_errors() {
        let t = PositiveErrorScalingTransformer::new(1, 2);
        assert_eq!(t.transform(i(5), i(9)).unwrap(), (i(5), i(4)));
        assert_eq!(t.transform(i(5), i(-9)).unwrap(), (i(5), i(-9)));
        assert_eq!(t.transform(i(5), i(0)).unwrap(), (i(5), i(0)));
    }

    #[test]
    fn test_enum_dispatch_and_validation() {
        let t: ErrorTransformer = NegativeErrorScalingTransformer::new(3, 1).into();
        assert_eq!(t.transform(i(0), i(-2)).unwrap(), (i(0), i(-6)));
        assert!(t.validate().is_ok());

        let bad: ErrorTransformer = PositiveErrorScalingTransformer::new(1, 0).into();
        assert_eq!(
            bad.validate(),
            Err(ConfigError::ZeroDenominator { term: "transformer" })
        );
    }

    #[test]
    fn test_transformer_json() {
        let t: ErrorTransformer = NegativeErrorScalingTransformer::new(2, 1).into();
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("negative_error_scaling"));
        let back: ErrorTransformer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
