//! Observability module for correlation and tracing

use uuid::Uuid;

/// Correlation ID for tracking one logical submission across attempts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a new correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Trace context for one `execute` call and its child operations
/// (verification, final lookup).
#[derive(Debug, Clone)]
pub struct TraceContext {
    /// Unique trace identifier for the entire operation
    pub trace_id: String,

    /// Unique span identifier for this specific operation
    pub span_id: String,

    /// Correlation ID for request tracking
    pub correlation_id: CorrelationId,

    /// Optional parent span ID
    pub parent_span_id: Option<String>,

    /// Operation name
    pub operation: String,
}

impl TraceContext {
    /// Create a new trace context for an operation
    pub fn new(operation: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id: CorrelationId::new(),
            parent_span_id: None,
            operation: operation.to_string(),
        }
    }

    /// Create a child span context sharing trace and correlation ids
    pub fn child_span(&self, operation: &str) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: Uuid::new_v4().to_string(),
            correlation_id: self.correlation_id.clone(),
            parent_span_id: Some(self.span_id.clone()),
            operation: operation.to_string(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_span_inherits_trace() {
        let parent = TraceContext::new("execute_transaction");
        let child = parent.child_span("verify_transaction");

        assert_eq!(child.trace_id(), parent.trace_id());
        assert_eq!(child.correlation_id(), parent.correlation_id());
        assert_ne!(child.span_id(), parent.span_id());
        assert_eq!(child.parent_span_id.as_deref(), Some(parent.span_id()));
        assert_eq!(child.operation, "verify_transaction");
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
        assert_eq!(CorrelationId::from("abc").to_string(), "abc");
    }
}
