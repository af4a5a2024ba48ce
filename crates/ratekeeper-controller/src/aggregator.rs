//! Weighted rate aggregation
//!
//! `candidate = base + Σ(weight × reading) / Σ(weight)`, or `base` when the
//! weights sum to zero. Every reading must be available; a single missing
//! reading fails the whole aggregation.

use ratekeeper_common::{Address, RateConfig, RateError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::sources::SourceRegistry;

/// A single component reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentReading {
    pub source: Address,
    pub weight: u64,
    pub value: u128,
}

/// Intermediate values of one aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationBreakdown {
    pub base: u128,
    /// Σ(weight × reading)
    pub weighted_sum: u128,
    /// Σ(weight)
    pub total_weight: u128,
    pub readings: Vec<ComponentReading>,
    /// Unclamped result
    pub candidate: u128,
}

/// Reads component values and combines them into a candidate rate
pub struct RateAggregator<'a> {
    sources: &'a SourceRegistry,
}

impl<'a> RateAggregator<'a> {
    pub fn new(sources: &'a SourceRegistry) -> Self {
        Self { sources }
    }

    /// Aggregate all components of `config` for `token`
    #[instrument(skip(self, config), fields(components = config.components.len()))]
    pub fn aggregate(&self, token: Address, config: &RateConfig) -> Result<AggregationBreakdown> {
        let mut readings = Vec::with_capacity(config.components.len());

        for component in &config.components {
            let value = self
                .sources
                .value_source(component.source)?
                .get_value(token)?;

            readings.push(ComponentReading {
                source: component.source,
                weight: component.weight,
                value,
            });
        }

        let breakdown = Self::combine(config.base, readings)?;
        debug!(
            %token,
            candidate = breakdown.candidate,
            total_weight = breakdown.total_weight,
            "Aggregated rate"
        );
        Ok(breakdown)
    }

    /// Combine readings without touching any source
    pub fn combine(base: u128, readings: Vec<ComponentReading>) -> Result<AggregationBreakdown> {
        let mut weighted_sum: u128 = 0;
        let mut total_weight: u128 = 0;

        for reading in &readings {
            let weighted = reading
                .value
                .checked_mul(reading.weight as u128)
                .ok_or_else(|| RateError::overflow("component weight × reading"))?;
            weighted_sum = weighted_sum
                .checked_add(weighted)
                .ok_or_else(|| RateError::overflow("weighted sum"))?;
            total_weight = total_weight
                .checked_add(reading.weight as u128)
                .ok_or_else(|| RateError::overflow("total weight"))?;
        }

        let dynamic = if total_weight == 0 {
            0
        } else {
            weighted_sum / total_weight
        };

        let candidate = base
            .checked_add(dynamic)
            .ok_or_else(|| RateError::overflow("base + weighted average"))?;

        Ok(AggregationBreakdown {
            base,
            weighted_sum,
            total_weight,
            readings,
            candidate,
        })
    }
}
