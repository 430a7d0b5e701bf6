//! Hooks into the span lifecycle.
//!
//! Span processors are notified synchronously when a recording span starts
//! and when it ends. Built-in processors hand finished spans to a
//! [`SpanExporter`]; anything blocking happens behind this boundary, never
//! in the span creation path. Failures in a processor are contained and
//! logged, they never propagate back into the instrumented application.

use crate::error::{SdkError, SdkResult};
use crate::resource::Resource;
use crate::trace::export::{SpanData, SpanExporter};
use crate::trace::Span;
use contrail::{trail_debug, Context};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Interface for hooking span start and end.
///
/// Processors are registered on a provider and invoked in registration
/// order, only for spans that are recording.
pub trait SpanProcessor: Send + Sync + fmt::Debug {
    /// Called synchronously when a recording span starts, on the thread
    /// that started it. Must not block.
    fn on_start(&self, span: &mut Span, cx: &Context);

    /// Called synchronously when a recording span ends. Must not block.
    fn on_end(&self, span: SpanData);

    /// Export whatever spans are buffered.
    fn force_flush(&self) -> SdkResult;

    /// Shut down the processor, flushing remaining work. Must tolerate
    /// being called more than once.
    fn shutdown(&self) -> SdkResult;

    /// Set the resource spans of this provider are associated with.
    fn set_resource(&mut self, _resource: &Resource) {}
}

/// A [`SpanProcessor`] that forwards each finished span to its exporter as
/// soon as the span ends, without batching.
///
/// Useful for debugging and tests; latency-sensitive production setups
/// want a batching processor in front of a real exporter instead.
#[derive(Debug)]
pub struct SimpleSpanProcessor {
    exporter: Mutex<Box<dyn SpanExporter>>,
}

impl SimpleSpanProcessor {
    /// Create a new [`SimpleSpanProcessor`] using the provided exporter.
    pub fn new<T: SpanExporter + 'static>(exporter: T) -> Self {
        Self {
            exporter: Mutex::new(Box::new(exporter)),
        }
    }
}

impl SpanProcessor for SimpleSpanProcessor {
    fn on_start(&self, _span: &mut Span, _cx: &Context) {
        // Ignored
    }

    fn on_end(&self, span: SpanData) {
        if !span.span_context.is_sampled() {
            return;
        }

        let result = self
            .exporter
            .lock()
            .map_err(|_| SdkError::InternalFailure("exporter lock poisoned".into()))
            .and_then(|mut exporter| futures_executor::block_on(exporter.export(vec![span])));

        if let Err(err) = result {
            trail_debug!(
                name: "SimpleSpanProcessor.OnEnd.Error",
                reason = format!("{err:?}")
            );
        }
    }

    fn force_flush(&self) -> SdkResult {
        // Nothing is buffered.
        Ok(())
    }

    fn shutdown(&self) -> SdkResult {
        let mut exporter = self
            .exporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        exporter.shutdown();
        Ok(())
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(mut exporter) = self.exporter.lock() {
            exporter.set_resource(resource);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::in_memory_exporter::InMemorySpanExporter;
    use contrail::trace::{SpanContext, SpanKind, Status, TraceFlags, TraceState};
    use contrail::{InstrumentationScope, SpanId, TraceId};

    fn finished_span(sampled: bool) -> SpanData {
        SpanData {
            span_context: SpanContext::new(
                TraceId::from(7u128),
                SpanId::from(7u64),
                TraceFlags::default().with_sampled(sampled),
                false,
                TraceState::default(),
            ),
            parent_span_id: SpanId::INVALID,
            span_kind: SpanKind::Internal,
            instrumentation_type: Default::default(),
            name: "test".into(),
            start_time: contrail::time::now(),
            end_time: contrail::time::now(),
            attributes: Vec::new(),
            dropped_attributes_count: 0,
            events: Default::default(),
            links: Default::default(),
            status: Status::Unset,
            instrumentation_scope: InstrumentationScope::builder("test").build(),
        }
    }

    #[test]
    fn exports_sampled_spans_only() {
        let exporter = InMemorySpanExporter::default();
        let processor = SimpleSpanProcessor::new(exporter.clone());

        processor.on_end(finished_span(false));
        assert!(exporter.get_finished_spans().unwrap().is_empty());

        processor.on_end(finished_span(true));
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let processor = SimpleSpanProcessor::new(InMemorySpanExporter::default());
        assert!(processor.shutdown().is_ok());
        assert!(processor.shutdown().is_ok());
    }
}
