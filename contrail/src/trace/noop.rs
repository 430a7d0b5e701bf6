//! No-op trace implementations.
//!
//! Returned where no real SDK is installed, and useful in tests for their
//! minimal runtime impact. A no-op tracer never records, but it still
//! propagates a valid parent span context through the spans it returns.

use crate::trace::{
    Span, SpanBuilder, SpanContext, SpanKind, Status, TraceContextExt, Tracer, TracerProvider,
};
use crate::{Context, InstrumentationScope, KeyValue};
use std::borrow::Cow;
use std::time::SystemTime;

/// A no-op instance of a [`TracerProvider`].
#[derive(Clone, Debug, Default)]
pub struct NoopTracerProvider {
    _private: (),
}

impl NoopTracerProvider {
    /// Create a new no-op tracer provider.
    pub fn new() -> Self {
        NoopTracerProvider { _private: () }
    }
}

impl TracerProvider for NoopTracerProvider {
    type Tracer = NoopTracer;

    fn tracer_with_scope(&self, _scope: InstrumentationScope) -> Self::Tracer {
        NoopTracer::new()
    }
}

/// A no-op instance of a [`Span`].
#[derive(Clone, Debug)]
pub struct NoopSpan {
    span_context: SpanContext,
}

impl Default for NoopSpan {
    fn default() -> Self {
        NoopSpan::new()
    }
}

impl NoopSpan {
    /// Create a new no-op span with an invalid span context.
    pub fn new() -> Self {
        NoopSpan {
            span_context: SpanContext::empty_context(),
        }
    }

    pub(crate) fn with_span_context(span_context: SpanContext) -> Self {
        NoopSpan { span_context }
    }
}

impl Span for NoopSpan {
    fn add_event_with_timestamp<T>(
        &mut self,
        _name: T,
        _timestamp: SystemTime,
        _attributes: Vec<KeyValue>,
    ) where
        T: Into<Cow<'static, str>>,
    {
        // Ignored
    }

    fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    fn is_recording(&self) -> bool {
        false
    }

    fn set_attribute(&mut self, _attribute: KeyValue) {
        // Ignored
    }

    fn set_status(&mut self, _status: Status) {
        // Ignored
    }

    fn update_name<T>(&mut self, _new_name: T)
    where
        T: Into<Cow<'static, str>>,
    {
        // Ignored
    }

    fn add_link(&mut self, _span_context: SpanContext, _attributes: Vec<KeyValue>) {
        // Ignored
    }

    fn end_with_timestamp(&mut self, _timestamp: SystemTime) {
        // Ignored
    }
}

/// A no-op instance of a [`Tracer`].
#[derive(Clone, Debug, Default)]
pub struct NoopTracer {
    _private: (),
}

impl NoopTracer {
    /// Create a new no-op tracer.
    pub fn new() -> Self {
        NoopTracer { _private: () }
    }
}

impl Tracer for NoopTracer {
    type Span = NoopSpan;

    /// Builds a `NoopSpan`, propagating the parent context's span identity
    /// if one is active.
    fn build_with_context(&self, _builder: SpanBuilder, parent_cx: &Context) -> Self::Span {
        if parent_cx.has_active_span() {
            NoopSpan::with_span_context(parent_cx.span().span_context().clone())
        } else {
            NoopSpan::new()
        }
    }

    /// A no-op span is never started, so `should_start_span` is always
    /// `false`.
    fn should_start_span(&self, _kind: SpanKind, _cx: &Context) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{TraceFlags, TraceState};
    use crate::{SpanId, TraceId};

    fn valid_span_context() -> SpanContext {
        SpanContext::new(
            TraceId::from(42u128),
            SpanId::from(42u64),
            TraceFlags::default(),
            true,
            TraceState::default(),
        )
    }

    #[test]
    fn noop_tracer_defaults_to_invalid_span() {
        let tracer = NoopTracer::new();
        let span = tracer.start_with_context("foo", &Context::new());
        assert!(!span.span_context().is_valid());
        assert!(!span.is_recording());
    }

    #[test]
    fn noop_tracer_propagates_an_active_span_context() {
        let tracer = NoopTracer::new();
        let cx = Context::new().with_span(NoopSpan::with_span_context(valid_span_context()));
        let span = tracer.start_with_context("foo", &cx);
        assert_eq!(span.span_context(), &valid_span_context());
    }

    #[test]
    fn noop_tracer_propagates_a_remote_span_context() {
        let tracer = NoopTracer::new();
        let cx = Context::new().with_remote_span_context(valid_span_context());
        let span = tracer.start_with_context("foo", &cx);
        assert_eq!(span.span_context(), &valid_span_context());
    }
}
