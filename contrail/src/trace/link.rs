use crate::trace::SpanContext;
use crate::KeyValue;

/// A causal reference from one span to a span in this or another trace.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    span_context: SpanContext,

    /// Attributes describing this link.
    pub attributes: Vec<KeyValue>,

    /// The number of attributes dropped due to the per-link limit.
    pub dropped_attributes_count: u32,
}

impl Link {
    /// Create a new link to the span identified by `span_context`.
    pub fn new(span_context: SpanContext, attributes: Vec<KeyValue>) -> Self {
        Link {
            span_context,
            attributes,
            dropped_attributes_count: 0,
        }
    }

    /// The span context of the linked span.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }
}
