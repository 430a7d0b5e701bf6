//! # Tracer
//!
//! [`SdkTracer`] executes the span creation decision pipeline. For every
//! attempted span start it resolves the parent, consults the suppression
//! gate, assigns trace/span identity, invokes the sampler, and maps the
//! decision to one of three span variants: recording, non-recording, or
//! suppressed. The whole pass is synchronous, bounded and non-blocking.

use crate::trace::provider::TracerProviderInner;
use crate::trace::span::{Span, SpanData};
use crate::trace::{MonotonicClock, SdkTracerProvider, SpanEvents, SpanLimits, SpanLinks};
use contrail::trace::{
    SamplingDecision, SpanBuilder, SpanContext, SpanKind, Status, TraceContextExt, TraceFlags,
    Tracer,
};
use contrail::{Context, InstrumentationScope};
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Weak};

/// Name given to spans whose builder carried a blank name.
const FALLBACK_SPAN_NAME: &str = "<unspecified span name>";

struct TracerInner {
    scope: InstrumentationScope,
    provider: Weak<TracerProviderInner>,
}

/// `Tracer` implementation to create and manage spans.
///
/// Handles resolved from the same provider with an equal scope tuple share
/// one cached inner allocation, so re-resolving a tracer is cheap and
/// equality ([`PartialEq`]) is registry identity.
#[derive(Clone)]
pub struct SdkTracer {
    inner: Arc<TracerInner>,
}

impl fmt::Debug for SdkTracer {
    /// Formats the `Tracer` using the given formatter.
    /// Omitting `provider` here is necessary to avoid cycles.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkTracer")
            .field("name", &self.inner.scope.name())
            .field("version", &self.inner.scope.version())
            .finish()
    }
}

impl PartialEq for SdkTracer {
    /// Two tracers are equal iff they are handles to the same registry
    /// entry.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl SdkTracer {
    pub(crate) fn new(scope: InstrumentationScope, provider: Weak<TracerProviderInner>) -> Self {
        SdkTracer {
            inner: Arc::new(TracerInner { scope, provider }),
        }
    }

    /// A tracer that keeps its scope identity but is not connected to any
    /// provider, used after provider shutdown. It never records.
    pub(crate) fn detached(scope: InstrumentationScope) -> Self {
        SdkTracer {
            inner: Arc::new(TracerInner {
                scope,
                provider: Weak::new(),
            }),
        }
    }

    /// Instrumentation scope of this tracer.
    pub fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.inner.scope
    }

    pub(crate) fn provider(&self) -> Option<SdkTracerProvider> {
        self.inner
            .provider
            .upgrade()
            .map(SdkTracerProvider::from_inner)
    }

    fn non_recording(&self, span_context: SpanContext, span_limits: SpanLimits) -> Span {
        Span::new(
            span_context,
            None,
            self.clone(),
            span_limits,
            MonotonicClock::new(),
        )
    }
}

impl Tracer for SdkTracer {
    /// This implementation of `Tracer` produces [`Span`] instances.
    type Span = Span;

    /// Starts a span from a `SpanBuilder`, running the creation pipeline.
    ///
    /// A span is a _root span_ if the resolved parent context holds no
    /// valid span; root spans open a new trace, every other span continues
    /// its parent's.
    fn build_with_context(&self, mut builder: SpanBuilder, parent_cx: &Context) -> Self::Span {
        // Blank names are replaced before anything else happens.
        if builder.name.trim().is_empty() {
            builder.name = Cow::Borrowed(FALLBACK_SPAN_NAME);
        }

        // An explicit parent on the builder wins over the passed (ambient)
        // context; `with_no_parent` put an empty root context here.
        let parent_cx = builder.parent_context.take().unwrap_or_else(|| parent_cx.clone());

        let Some(provider) = self.provider() else {
            // Detached tracer (provider shut down or gone): degrade to a
            // span that records nothing and propagates nothing.
            return self.non_recording(SpanContext::empty_context(), SpanLimits::default());
        };
        if provider.is_shutdown() {
            return self.non_recording(SpanContext::empty_context(), SpanLimits::default());
        }

        // Parent span context, invalid when the parent context holds none.
        let psc = if parent_cx.has_active_span() {
            parent_cx.span().span_context().clone()
        } else {
            SpanContext::empty_context()
        };

        let span_kind = builder.span_kind.take().unwrap_or(SpanKind::Internal);
        let instrumentation_type = builder
            .instrumentation_type
            .take()
            .unwrap_or_else(|| self.inner.scope.instrumentation_type());

        // Authoritative suppression check: if an equivalent span is in
        // flight, hand back the O(1) stand-in. No id is consumed, no
        // sampler runs, no processor hears about it.
        if provider
            .suppression_gate()
            .exists(span_kind, instrumentation_type, &parent_cx)
        {
            return Span::suppressed(psc, self.clone());
        }

        let config = provider.config();

        // Every non-suppressed attempt consumes a span id, even if the
        // sampler drops it below.
        let span_id = config.id_generator.new_span_id();
        // Trace identity is never regenerated mid-trace.
        let trace_id = if psc.is_valid() {
            psc.trace_id()
        } else {
            config.id_generator.new_trace_id()
        };

        let span_limits = config.span_limits;

        // Snapshot the links: invalid links were never addable, storage is
        // capped, and the excess count is kept as the dropped count.
        let links_limit = span_limits.max_links_per_span as usize;
        let link_attributes_limit = span_limits.max_attributes_per_link as usize;
        let span_links = match builder.links.take() {
            Some(mut links) => {
                links.retain(|link| link.span_context().is_valid());
                let dropped_count = links.len().saturating_sub(links_limit) as u32;
                links.truncate(links_limit);
                for link in links.iter_mut() {
                    let dropped_attributes_count =
                        link.attributes.len().saturating_sub(link_attributes_limit);
                    link.attributes.truncate(link_attributes_limit);
                    link.dropped_attributes_count = dropped_attributes_count as u32;
                }
                SpanLinks {
                    links,
                    dropped_count,
                }
            }
            None => SpanLinks::default(),
        };

        let mut attributes = builder.attributes.take().unwrap_or_default();
        attributes.retain(|kv| !kv.key.as_str().is_empty());

        let sampling_result = config.sampler.should_sample(
            Some(&parent_cx),
            trace_id,
            &builder.name,
            &span_kind,
            &attributes,
            &span_links.links,
        );

        let sampled = sampling_result.decision == SamplingDecision::RecordAndSample;
        let span_context = SpanContext::new(
            trace_id,
            span_id,
            TraceFlags::default().with_sampled(sampled),
            false,
            sampling_result.trace_state,
        );

        if sampling_result.decision == SamplingDecision::Drop {
            // Valid identity for propagation and correlation, nothing else.
            return self.non_recording(span_context, span_limits);
        }

        // Timestamps within one lineage come from one monotonic base: a
        // recording parent of this SDK donates its clock, roots anchor a
        // fresh one.
        let clock = parent_cx
            .span()
            .downcast_map(Span::clock)
            .unwrap_or_else(MonotonicClock::new);

        // Merge sampler-contributed attributes and snapshot the
        // accumulator; the cap is enforced here, the excess becomes the
        // dropped count.
        attributes.extend(sampling_result.attributes);
        let attributes_limit = span_limits.max_attributes_per_span as usize;
        let dropped_attributes_count = attributes.len().saturating_sub(attributes_limit) as u32;
        attributes.truncate(attributes_limit);

        let start_time = builder.start_time.unwrap_or_else(|| clock.now());
        let mut span = Span::new(
            span_context,
            Some(SpanData {
                parent_span_id: psc.span_id(),
                span_kind,
                instrumentation_type,
                name: builder.name,
                start_time,
                end_time: start_time,
                attributes,
                dropped_attributes_count,
                events: SpanEvents::default(),
                links: span_links,
                status: Status::Unset,
            }),
            self.clone(),
            span_limits,
            clock,
        );

        for processor in provider.span_processors() {
            processor.on_start(&mut span, &parent_cx);
        }

        span
    }

    /// Cheap pre-check for instrumentation: `false` when an equivalent
    /// span of this tracer's type is already in flight under `cx`.
    fn should_start_span(&self, kind: SpanKind, cx: &Context) -> bool {
        match self.provider() {
            Some(provider) => !provider.suppression_gate().exists(
                kind,
                self.inner.scope.instrumentation_type(),
                cx,
            ),
            None => true,
        }
    }
}
