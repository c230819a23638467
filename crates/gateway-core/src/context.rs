//! Per-request context shared between gatekeeping and dispatch.

use serde::Serialize;
use uuid::Uuid;

/// Model-routing state for a single request.
///
/// The origin model is fixed at construction. Model mapping writes the
/// upstream model and mapped flag once; the dispatch layer reads them after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    request_id: Uuid,
    origin_model_name: String,
    upstream_model_name: String,
    is_model_mapped: bool,
}

impl RequestContext {
    /// Create a context for a request asking for `origin_model`
    #[must_use]
    pub fn new(origin_model: impl Into<String>) -> Self {
        let origin_model_name = origin_model.into();
        Self {
            request_id: Uuid::new_v4(),
            upstream_model_name: origin_model_name.clone(),
            origin_model_name,
            is_model_mapped: false,
        }
    }

    /// Request identifier used in log spans
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Model name the caller asked for
    #[must_use]
    pub fn origin_model_name(&self) -> &str {
        &self.origin_model_name
    }

    /// Model name to send upstream
    #[must_use]
    pub fn upstream_model_name(&self) -> &str {
        &self.upstream_model_name
    }

    /// Whether the upstream model came from the mapping table
    #[must_use]
    pub fn is_model_mapped(&self) -> bool {
        self.is_model_mapped
    }

    /// Record the outcome of model mapping
    pub fn set_upstream_model(&mut self, upstream_model: impl Into<String>, is_mapped: bool) {
        self.upstream_model_name = upstream_model.into();
        self.is_model_mapped = is_mapped;
    }
}
