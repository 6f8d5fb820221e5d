// src/probe/range.rs — Upper-bound search for numeric parameters
//
// Declared maxima are often placeholders, so the real ceiling is found by
// trial. The search starts at the sentinel ceiling and, on each rejection,
// halves the distance to the known-good minimum. It stops at the first value
// that validates and never moves back up, so the answer is a valid value
// close to the boundary rather than the exact boundary. Each step costs one
// compiler run; the approximation is deliberate.

use crate::core::types::{render_param, ParameterDefinition, ResolvedRange, SENTINEL_CEILING};
use crate::infra::errors::Result;
use crate::probe::FlagProbe;

/// Termination cap. Halving from the ceiling reaches the minimum in about
/// 32 steps; this only matters for a compiler that flip-flops on `min`.
pub const MAX_NARROWING_STEPS: u32 = 64;

#[derive(Clone)]
pub struct ParameterRangeSearch {
    probe: FlagProbe,
    ceiling: i64,
}

impl ParameterRangeSearch {
    pub fn new(probe: FlagProbe) -> Self {
        Self {
            probe,
            ceiling: SENTINEL_CEILING,
        }
    }

    /// Largest value found valid for `prefix + name + separator + value`,
    /// and whether the search succeeded. On failure the minimum is returned.
    pub async fn find_max(
        &self,
        name: &str,
        prefix: &str,
        separator: &str,
        min: i64,
    ) -> Result<(i64, bool)> {
        if min > self.ceiling {
            tracing::error!(
                "Parameter {} has minimum {} above the probing ceiling",
                name,
                min
            );
            return Ok((min, false));
        }

        let min_flag = render_param(prefix, name, separator, min);
        if !self.probe.trial(&min_flag).await?.is_accepted() {
            tracing::error!("Parameter {} has no valid value", name);
            return Ok((min, false));
        }

        let mut value = self.ceiling;
        for step in 0..MAX_NARROWING_STEPS {
            let flag = render_param(prefix, name, separator, value);
            let verdict = self.probe.trial(&flag).await?;
            tracing::debug!("{}: step {} value {} -> {:?}", name, step, value, verdict);
            if verdict.is_accepted() {
                return Ok((value, true));
            }

            // A minimum near i64::MIN leaves no representable midpoint
            let Some(span) = value.checked_sub(min) else {
                break;
            };
            value = span.abs() / 2 + min;
            if value > self.ceiling || value < min {
                break;
            }
        }

        tracing::error!("Parameter {} has no valid max value", name);
        Ok((min, false))
    }

    /// Resolve a definition's range. Definitions with a meaningful declared
    /// max are taken as-is; placeholders go through `find_max`.
    pub async fn resolve(
        &self,
        def: &ParameterDefinition,
        prefix: &str,
        separator: &str,
    ) -> Result<ResolvedRange> {
        if !def.needs_range_resolution() {
            return Ok(ResolvedRange {
                name: def.name.clone(),
                min: def.min,
                max: def.max,
                resolved: true,
            });
        }

        let (max, resolved) = self.find_max(&def.name, prefix, separator, def.min).await?;
        Ok(ResolvedRange {
            name: def.name.clone(),
            min: def.min,
            max: if resolved { max } else { def.min },
            resolved,
        })
    }
}
