use crate::trace::{InstrumentationType, Link, Span, SpanKind, TraceState};
use crate::{Context, KeyValue};
use std::borrow::Cow;
use std::time::SystemTime;

/// A sampler's verdict for one span creation attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SamplingDecision {
    /// The span is neither recorded nor exported; only its identity exists.
    Drop,
    /// The span is recorded in-process but the sampled flag stays clear, so
    /// it is not exported.
    RecordOnly,
    /// The span is recorded and the sampled flag is set.
    RecordAndSample,
}

/// The full result of a sampling decision.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingResult {
    /// The sampling decision.
    pub decision: SamplingDecision,
    /// Extra attributes the sampler contributes to the span.
    pub attributes: Vec<KeyValue>,
    /// The trace state for the new span's context. Samplers that do not
    /// participate in trace state pass the parent's through.
    pub trace_state: TraceState,
}

/// Accumulates the intent to create one span.
///
/// A builder is owned by a single caller and consumed by [`start`] /
/// [`start_with_context`], which transfers the accumulated buffers into the
/// span creation pipeline; a builder reference can therefore never mutate a
/// span that has already been returned. Builders are `Clone`, so callers
/// that want several similar spans clone before starting.
///
/// [`start`]: SpanBuilder::start
/// [`start_with_context`]: SpanBuilder::start_with_context
#[derive(Clone, Debug, Default)]
pub struct SpanBuilder {
    /// The span's name. Blank names are replaced with a fixed fallback by
    /// the SDK.
    pub name: Cow<'static, str>,

    /// The span kind, `Internal` when unset.
    pub span_kind: Option<SpanKind>,

    /// Explicit parent context. `None` means the ambient current context at
    /// start time; an explicit root context forces a new trace.
    pub parent_context: Option<Context>,

    /// Semantic category of the instrumented operation, falling back to the
    /// tracer's own instrumentation type when unset.
    pub instrumentation_type: Option<InstrumentationType>,

    /// Attributes to set on the span before the sampler runs.
    pub attributes: Option<Vec<KeyValue>>,

    /// Links to other spans.
    pub links: Option<Vec<Link>>,

    /// Explicit start time; wall/monotonic "now" when unset.
    pub start_time: Option<SystemTime>,
}

impl SpanBuilder {
    /// Create a builder for a span with the given name.
    pub fn from_name<T: Into<Cow<'static, str>>>(name: T) -> Self {
        SpanBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Specify the span kind.
    pub fn with_kind(self, span_kind: SpanKind) -> Self {
        SpanBuilder {
            span_kind: Some(span_kind),
            ..self
        }
    }

    /// Use an explicit parent context instead of the ambient current one.
    pub fn with_parent(self, parent: Context) -> Self {
        SpanBuilder {
            parent_context: Some(parent),
            ..self
        }
    }

    /// Force the span to start a new trace, ignoring any ambient parent.
    pub fn with_no_parent(self) -> Self {
        SpanBuilder {
            parent_context: Some(Context::new()),
            ..self
        }
    }

    /// Specify the semantic instrumentation type for this span.
    pub fn with_instrumentation_type(self, instrumentation_type: InstrumentationType) -> Self {
        SpanBuilder {
            instrumentation_type: Some(instrumentation_type),
            ..self
        }
    }

    /// Specify attributes known before span creation.
    pub fn with_attributes<I>(self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        SpanBuilder {
            attributes: Some(attributes.into_iter().collect()),
            ..self
        }
    }

    /// Specify links to other spans. Links with invalid span contexts are
    /// discarded by the SDK rather than stored.
    pub fn with_links(self, links: Vec<Link>) -> Self {
        SpanBuilder {
            links: Some(links),
            ..self
        }
    }

    /// Specify an explicit start time.
    pub fn with_start_time<T: Into<SystemTime>>(self, start_time: T) -> Self {
        SpanBuilder {
            start_time: Some(start_time.into()),
            ..self
        }
    }

    /// Start the span, consuming this builder.
    pub fn start<T: Tracer>(self, tracer: &T) -> T::Span {
        tracer.build(self)
    }

    /// Start the span with an explicit parent context, consuming this
    /// builder.
    pub fn start_with_context<T: Tracer>(self, tracer: &T, parent_cx: &Context) -> T::Span {
        tracer.build_with_context(self, parent_cx)
    }
}

/// The interface for creating [`Span`]s.
///
/// A tracer carries the instrumentation scope it was resolved for; spans it
/// creates are attributed to that scope.
pub trait Tracer {
    /// The `Span` type produced by this tracer.
    type Span: Span;

    /// Start a span named `name` under the ambient current context.
    fn start<T>(&self, name: T) -> Self::Span
    where
        T: Into<Cow<'static, str>>,
    {
        self.build(SpanBuilder::from_name(name))
    }

    /// Start a span named `name` under an explicit parent context.
    fn start_with_context<T>(&self, name: T, parent_cx: &Context) -> Self::Span
    where
        T: Into<Cow<'static, str>>,
    {
        self.build_with_context(SpanBuilder::from_name(name), parent_cx)
    }

    /// Create a span builder for a span named `name`.
    fn span_builder<T>(&self, name: T) -> SpanBuilder
    where
        T: Into<Cow<'static, str>>,
    {
        SpanBuilder::from_name(name)
    }

    /// Start a span from `builder` under the ambient current context.
    fn build(&self, builder: SpanBuilder) -> Self::Span {
        Context::map_current(|cx| self.build_with_context(builder, cx))
    }

    /// Start a span from `builder`, resolving the parent against
    /// `parent_cx` (unless the builder carries an explicit parent).
    fn build_with_context(&self, builder: SpanBuilder, parent_cx: &Context) -> Self::Span;

    /// Cheap pre-check: would a span of this kind be suppressed as a
    /// duplicate under `cx`?
    ///
    /// Instrumentation can use a `false` result to skip computing expensive
    /// attributes. Calling the full creation path regardless is always safe;
    /// skipping the check only costs efficiency, never correctness. The
    /// default implementation (for tracers without a suppression facility)
    /// always answers `true`.
    fn should_start_span(&self, kind: SpanKind, cx: &Context) -> bool {
        let _ = (kind, cx);
        true
    }

    /// Start a span, mark it active for the duration of `f`, and end it.
    ///
    /// The span's context is handed to `f` and restored as "previous
    /// current" when `f` returns.
    fn in_span<T, F, N>(&self, name: N, f: F) -> T
    where
        F: FnOnce(Context) -> T,
        N: Into<Cow<'static, str>>,
        Self::Span: Send + Sync + 'static,
    {
        let span = self.start(name);
        let cx = Context::map_current(|current| span.store_in_context(current));
        let guard = cx.clone().attach();
        let result = f(cx);
        drop(guard);
        result
    }
}
