//! Model mapping resolution.
//!
//! Operators can redirect a requested model to another one through a JSON
//! object of `"from": "to"` pairs. Redirections may chain (`a -> b -> c`), and
//! since the table is edited by hand it may also loop. Resolution walks the
//! chain iteratively with a visited set so that any table shape terminates.

use gateway_core::{GatewayError, GatewayResult, RequestContext};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Result of resolving a model through the mapping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingOutcome {
    /// Model name to dispatch upstream
    pub upstream_model: String,
    /// Whether at least one redirection was applied
    pub is_mapped: bool,
}

impl MappingOutcome {
    fn unmapped(model: &str) -> Self {
        Self {
            upstream_model: model.to_string(),
            is_mapped: false,
        }
    }
}

/// Parsed model mapping table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelMapping {
    table: HashMap<String, String>,
}

impl ModelMapping {
    /// Parse a serialized mapping table.
    ///
    /// Blank input, `{}` and `null` all yield an empty table.
    ///
    /// # Errors
    /// Returns `GatewayError::MappingParse` if the input is not a JSON object
    /// of string values.
    pub fn parse(serialized: &str) -> GatewayResult<Self> {
        let trimmed = serialized.trim();
        if trimmed.is_empty() || trimmed == "{}" {
            return Ok(Self::default());
        }

        let table: Option<HashMap<String, String>> =
            serde_json::from_str(trimmed).map_err(GatewayError::mapping_parse)?;

        Ok(Self {
            table: table.unwrap_or_default(),
        })
    }

    /// Build a mapping from in-memory pairs
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Number of entries in the table
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if the table has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Models with an entry in the table, sorted
    #[must_use]
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.table.keys().map(String::as_str).collect();
        sources.sort_unstable();
        sources
    }

    /// Source models whose chain loops, sorted
    #[must_use]
    pub fn cyclic_sources(&self) -> Vec<&str> {
        self.sources()
            .into_iter()
            .filter(|model| matches!(self.resolve(model), Err(GatewayError::MappingCycle { .. })))
            .collect()
    }

    /// Resolve `origin` through the table.
    ///
    /// A model mapped directly to itself is treated as unmapped. Any other
    /// revisit of an already-seen model is a cycle.
    ///
    /// # Errors
    /// Returns `GatewayError::MappingCycle` if the chain starting at `origin`
    /// loops.
    pub fn resolve(&self, origin: &str) -> GatewayResult<MappingOutcome> {
        let mut visited: HashSet<&str> = HashSet::with_capacity(self.table.len() + 1);
        visited.insert(origin);

        let mut current = origin;
        let mut is_mapped = false;

        // Every hop that continues lands on a model not seen before, so the
        // walk stops within `len + 1` lookups.
        for hop in 0..=self.table.len() {
            let next = match self.table.get(current) {
                Some(next) if !next.is_empty() => next.as_str(),
                _ => {
                    if is_mapped {
                        debug!(origin = %origin, upstream = %current, "Model mapping applied");
                    }
                    return Ok(MappingOutcome {
                        upstream_model: current.to_string(),
                        is_mapped,
                    });
                }
            };

            if visited.contains(next) {
                if hop == 0 && next == current {
                    return Ok(MappingOutcome::unmapped(origin));
                }
                warn!(origin = %origin, model = %next, "Model mapping cycle detected");
                return Err(GatewayError::mapping_cycle(origin, next));
            }

            visited.insert(next);
            current = next;
            is_mapped = true;
        }

        warn!(origin = %origin, model = %current, "Model mapping exceeded hop bound");
        Err(GatewayError::mapping_cycle(origin, current))
    }

    /// Resolve the context's origin model and record the outcome on it.
    ///
    /// The context is left untouched on error.
    ///
    /// # Errors
    /// Returns `GatewayError::MappingCycle` if the chain loops.
    pub fn apply(&self, ctx: &mut RequestContext) -> GatewayResult<()> {
        let outcome = self.resolve(ctx.origin_model_name())?;
        ctx.set_upstream_model(outcome.upstream_model, outcome.is_mapped);
        Ok(())
    }
}

/// Parse `serialized` and resolve `origin` through it.
///
/// # Errors
/// Returns `GatewayError::MappingParse` for a malformed table and
/// `GatewayError::MappingCycle` for a looping chain.
pub fn resolve_mapping(origin: &str, serialized: &str) -> GatewayResult<MappingOutcome> {
    ModelMapping::parse(serialized)?.resolve(origin)
}

/// Resolve the context's origin model through `serialized` and record the
/// result on the context. Nothing is written on error.
///
/// # Errors
/// Returns `GatewayError::MappingParse` for a malformed table and
/// `GatewayError::MappingCycle` for a looping chain.
pub fn apply_model_mapping(ctx: &mut RequestContext, serialized: &str) -> GatewayResult<()> {
    ModelMapping::parse(serialized)?.apply(ctx)
}
