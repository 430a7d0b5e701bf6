//! # Tracer provider
//!
//! [`SdkTracerProvider`] is the central configuration point for tracing: it
//! owns the sampler, id generator, span limits, resource, suppression gate
//! and span processors that all of its tracers share, plus the registry
//! that makes tracer resolution reference-stable.
//!
//! ## Tracer resolution
//!
//! Tracers are keyed by their full instrumentation scope (name, version,
//! schema URL, instrumentation type). Resolving the same scope twice
//! returns handles to the same cached tracer, so instrumentation can
//! re-resolve on every call without its own caching.
//!
//! ## Cloning and shutdown
//!
//! Cloning a provider clones a handle to shared state. [`shutdown`] is
//! idempotent across all handles; after it, existing tracers produce
//! non-recording spans and newly resolved tracers are detached no-ops that
//! keep their scope's name and version. Dropping the last handle triggers
//! shutdown automatically.
//!
//! [`shutdown`]: SdkTracerProvider::shutdown

use crate::error::{SdkError, SdkResult};
use crate::resource::Resource;
use crate::trace::{
    Config, IdGenerator, SdkTracer, ShouldSample, SimpleSpanProcessor, SpanExporter, SpanLimits,
    SpanProcessor, SuppressionGate, SuppressionStrategy,
};
use contrail::trace::TracerProvider;
use contrail::{trail_debug, trail_info, InstrumentationScope};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
pub(crate) struct TracerProviderInner {
    processors: Vec<Box<dyn SpanProcessor>>,
    config: Config,
    suppression: SuppressionGate,
    tracers: Mutex<HashMap<InstrumentationScope, SdkTracer>>,
    is_shutdown: AtomicBool,
}

impl TracerProviderInner {
    /// Shut down all processors; called from explicit shutdown and from
    /// `Drop` when the last handle goes away.
    fn shutdown_processors(&self) -> Vec<SdkResult> {
        let mut results = Vec::with_capacity(self.processors.len());
        for processor in &self.processors {
            let result = processor.shutdown();
            if let Err(err) = &result {
                trail_debug!(
                    name: "TracerProvider.ShutdownError",
                    error = format!("{err}")
                );
            }
            results.push(result);
        }
        results
    }
}

impl Drop for TracerProviderInner {
    fn drop(&mut self) {
        if !self.is_shutdown.load(Ordering::Relaxed) {
            let _ = self.shutdown_processors();
        }
    }
}

/// Creator and registry of [`SdkTracer`] instances.
#[derive(Clone, Debug)]
pub struct SdkTracerProvider {
    inner: Arc<TracerProviderInner>,
}

impl Default for SdkTracerProvider {
    fn default() -> Self {
        SdkTracerProvider::builder().build()
    }
}

impl SdkTracerProvider {
    pub(crate) fn from_inner(inner: Arc<TracerProviderInner>) -> Self {
        SdkTracerProvider { inner }
    }

    /// Create a new [`SdkTracerProvider`] builder.
    pub fn builder() -> TracerProviderBuilder {
        TracerProviderBuilder::default()
    }

    /// Span processors associated with this provider.
    pub(crate) fn span_processors(&self) -> &[Box<dyn SpanProcessor>] {
        &self.inner.processors
    }

    /// Config associated with this provider.
    pub(crate) fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The suppression gate shared by this provider's tracers.
    pub(crate) fn suppression_gate(&self) -> &SuppressionGate {
        &self.inner.suppression
    }

    /// Whether this provider has been shut down. No span is recorded after
    /// that point.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Relaxed)
    }

    /// Push every pending span through the processors, blocking until all
    /// have reported.
    pub fn force_flush(&self) -> SdkResult {
        let results: Vec<_> = self
            .span_processors()
            .iter()
            .map(|processor| processor.force_flush())
            .collect();
        if results.iter().all(|r| r.is_ok()) {
            Ok(())
        } else {
            Err(SdkError::InternalFailure(format!("errs: {results:?}")))
        }
    }

    /// Shut this provider down, flushing and stopping its processors.
    ///
    /// Only the first call across all handles performs the shutdown;
    /// subsequent calls return [`SdkError::AlreadyShutdown`].
    pub fn shutdown(&self) -> SdkResult {
        if self
            .inner
            .is_shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let results = self.inner.shutdown_processors();
            if results.iter().all(|res| res.is_ok()) {
                Ok(())
            } else {
                Err(SdkError::InternalFailure(format!(
                    "shutdown errors: {:?}",
                    results
                        .into_iter()
                        .filter_map(Result::err)
                        .collect::<Vec<_>>()
                )))
            }
        } else {
            Err(SdkError::AlreadyShutdown)
        }
    }
}

impl TracerProvider for SdkTracerProvider {
    type Tracer = SdkTracer;

    /// A tracer for the given scope, cached by the full identity tuple.
    ///
    /// After shutdown this returns a detached no-op tracer that keeps the
    /// scope's name and version but never creates a span.
    fn tracer_with_scope(&self, scope: InstrumentationScope) -> Self::Tracer {
        if self.is_shutdown() {
            return SdkTracer::detached(scope);
        }
        if scope.name().is_empty() {
            trail_info!(name: "TracerNameEmpty");
        }
        let mut tracers = self
            .inner
            .tracers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tracers
            .entry(scope.clone())
            .or_insert_with(|| SdkTracer::new(scope, Arc::downgrade(&self.inner)))
            .clone()
    }
}

/// Builder for [`SdkTracerProvider`].
#[derive(Debug, Default)]
pub struct TracerProviderBuilder {
    processors: Vec<Box<dyn SpanProcessor>>,
    config: Config,
}

impl TracerProviderBuilder {
    /// Add a [`SimpleSpanProcessor`] wrapping `exporter` to the pipeline.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_simple_exporter<T: SpanExporter + 'static>(self, exporter: T) -> Self {
        self.with_span_processor(SimpleSpanProcessor::new(exporter))
    }

    /// Add a custom [`SpanProcessor`] to the pipeline.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_span_processor<T: SpanProcessor + 'static>(self, processor: T) -> Self {
        let mut processors = self.processors;
        processors.push(Box::new(processor));

        TracerProviderBuilder { processors, ..self }
    }

    /// Specify the sampler to be used.
    pub fn with_sampler<T: ShouldSample + 'static>(mut self, sampler: T) -> Self {
        self.config.sampler = Box::new(sampler);
        self
    }

    /// Specify the id generator to be used.
    pub fn with_id_generator<T: IdGenerator + 'static>(mut self, id_generator: T) -> Self {
        self.config.id_generator = Box::new(id_generator);
        self
    }

    /// Specify the duplicate-span suppression granularity.
    ///
    /// The default comes from `CONTRAIL_SPAN_SUPPRESSION_STRATEGY`, falling
    /// back to disabled.
    pub fn with_suppression_strategy(mut self, strategy: SuppressionStrategy) -> Self {
        self.config.suppression_strategy = strategy;
        self
    }

    /// Specify the number of events to be recorded per span.
    pub fn with_max_events_per_span(mut self, max_events: u32) -> Self {
        self.config.span_limits.max_events_per_span = max_events;
        self
    }

    /// Specify the number of attributes to be recorded per span.
    pub fn with_max_attributes_per_span(mut self, max_attributes: u32) -> Self {
        self.config.span_limits.max_attributes_per_span = max_attributes;
        self
    }

    /// Specify the number of links to be recorded per span.
    pub fn with_max_links_per_span(mut self, max_links: u32) -> Self {
        self.config.span_limits.max_links_per_span = max_links;
        self
    }

    /// Specify all limits via a [`SpanLimits`] value.
    pub fn with_span_limits(mut self, span_limits: SpanLimits) -> Self {
        self.config.span_limits = span_limits;
        self
    }

    /// Associate a [`Resource`] with all spans this provider creates.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.config.resource = resource;
        self
    }

    /// Create a provider from this configuration.
    pub fn build(self) -> SdkTracerProvider {
        let mut processors = self.processors;
        for processor in &mut processors {
            processor.set_resource(&self.config.resource);
        }

        let suppression = SuppressionGate::new(self.config.suppression_strategy);
        SdkTracerProvider {
            inner: Arc::new(TracerProviderInner {
                processors,
                config: self.config,
                suppression,
                tracers: Mutex::new(HashMap::new()),
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::export::SpanData;
    use crate::trace::Span;
    use contrail::trace::{InstrumentationType, Tracer};
    use contrail::Context;
    use std::sync::atomic::AtomicU32;

    #[derive(Debug, Default)]
    struct CountingProcessor {
        started: Arc<AtomicU32>,
        shutdowns: Arc<AtomicU32>,
        flush_ok: bool,
    }

    impl CountingProcessor {
        fn new(flush_ok: bool) -> Self {
            CountingProcessor {
                started: Arc::default(),
                shutdowns: Arc::default(),
                flush_ok,
            }
        }
    }

    impl SpanProcessor for CountingProcessor {
        fn on_start(&self, _span: &mut Span, _cx: &Context) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_end(&self, _span: SpanData) {}

        fn force_flush(&self) -> SdkResult {
            if self.flush_ok {
                Ok(())
            } else {
                Err(SdkError::InternalFailure("cannot export".into()))
            }
        }

        fn shutdown(&self) -> SdkResult {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            self.force_flush()
        }
    }

    #[test]
    fn force_flush_aggregates_processor_failures() {
        let provider = SdkTracerProvider::builder()
            .with_span_processor(CountingProcessor::new(true))
            .with_span_processor(CountingProcessor::new(false))
            .build();

        assert!(provider.force_flush().is_err());
    }

    #[test]
    fn tracer_resolution_is_reference_stable() {
        let provider = SdkTracerProvider::default();

        let scope = InstrumentationScope::builder("orm")
            .with_version("1.0.0")
            .with_schema_url("https://example.com/schemas/1.0")
            .with_instrumentation_type(InstrumentationType::DB)
            .build();

        let first = provider.tracer_with_scope(scope.clone());
        let second = provider.tracer_with_scope(scope);
        // Identity equality: both handles share the cached tracer.
        assert_eq!(first, second);

        let other = provider.tracer_with_scope(
            InstrumentationScope::builder("orm")
                .with_version("1.0.0")
                .with_schema_url("https://example.com/schemas/1.0")
                .with_instrumentation_type(InstrumentationType::HTTP)
                .build(),
        );
        assert_ne!(first, other);
    }

    #[test]
    fn tracers_by_name_share_one_entry() {
        let provider = SdkTracerProvider::default();
        assert_eq!(provider.tracer("a"), provider.tracer("a"));
        assert_ne!(provider.tracer("a"), provider.tracer("b"));
    }

    #[test]
    fn shutdown_degrades_tracers_to_noops() {
        let processor = CountingProcessor::new(true);
        let started = Arc::clone(&processor.started);
        let provider = SdkTracerProvider::builder()
            .with_span_processor(processor)
            .build();

        let tracer = provider.tracer("test");
        let _ = tracer.start("before");
        assert_eq!(started.load(Ordering::SeqCst), 1);

        // Shutdown through a clone works, and is observed everywhere.
        assert!(provider.clone().shutdown().is_ok());
        assert_eq!(provider.shutdown(), Err(SdkError::AlreadyShutdown));

        // Existing tracers no longer start recording spans.
        let span = tracer.start("after");
        assert!(!contrail::trace::Span::is_recording(&span));
        assert_eq!(started.load(Ordering::SeqCst), 1);

        // Newly resolved tracers are detached no-ops that keep their scope.
        let noop_tracer = provider.tracer("late");
        assert_eq!(noop_tracer.instrumentation_scope().name(), "late");
        let _ = noop_tracer.start("nothing");
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_the_last_handle_shuts_down_once() {
        let processor = CountingProcessor::new(true);
        let shutdowns = Arc::clone(&processor.shutdowns);
        {
            let provider = SdkTracerProvider::builder()
                .with_span_processor(processor)
                .build();
            let clone = provider.clone();
            drop(provider);
            assert_eq!(shutdowns.load(Ordering::SeqCst), 0);
            drop(clone);
        }
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_shutdown_suppresses_drop_shutdown() {
        let processor = CountingProcessor::new(true);
        let shutdowns = Arc::clone(&processor.shutdowns);
        {
            let provider = SdkTracerProvider::builder()
                .with_span_processor(processor)
                .build();
            assert!(provider.shutdown().is_ok());
        }
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }
}
