//! Context extensions for carrying the active span.

use crate::trace::{Span, SpanContext, Status};
use crate::{Context, ContextGuard, KeyValue};
use std::any::Any;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::sync::Mutex;
use std::time::SystemTime;

const NOOP_SPAN: SynchronizedSpan = SynchronizedSpan {
    span_context: SpanContext::NONE,
    inner: None,
};

/// The object-safe mirror of [`Span`], used to store spans of any
/// implementation in a context.
pub(crate) trait ObjectSafeSpan: Send + Sync {
    fn add_event_with_timestamp(
        &mut self,
        name: Cow<'static, str>,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    );
    fn span_context(&self) -> &SpanContext;
    fn is_recording(&self) -> bool;
    fn set_attribute(&mut self, attribute: KeyValue);
    fn set_status(&mut self, status: Status);
    fn update_name(&mut self, new_name: Cow<'static, str>);
    fn add_link(&mut self, span_context: SpanContext, attributes: Vec<KeyValue>);
    fn end_with_timestamp(&mut self, timestamp: SystemTime);
    fn as_any(&self) -> &dyn Any;
}

impl<T: Span + Send + Sync + 'static> ObjectSafeSpan for T {
    fn add_event_with_timestamp(
        &mut self,
        name: Cow<'static, str>,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) {
        Span::add_event_with_timestamp(self, name, timestamp, attributes)
    }

    fn span_context(&self) -> &SpanContext {
        Span::span_context(self)
    }

    fn is_recording(&self) -> bool {
        Span::is_recording(self)
    }

    fn set_attribute(&mut self, attribute: KeyValue) {
        Span::set_attribute(self, attribute)
    }

    fn set_status(&mut self, status: Status) {
        Span::set_status(self, status)
    }

    fn update_name(&mut self, new_name: Cow<'static, str>) {
        Span::update_name(self, new_name)
    }

    fn add_link(&mut self, span_context: SpanContext, attributes: Vec<KeyValue>) {
        Span::add_link(self, span_context, attributes)
    }

    fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        Span::end_with_timestamp(self, timestamp)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A span stored in a context, with its immutable identity duplicated
/// outside the lock so reads of the span context never contend.
pub(crate) struct SynchronizedSpan {
    span_context: SpanContext,
    inner: Option<Mutex<Box<dyn ObjectSafeSpan>>>,
}

impl SynchronizedSpan {
    pub(crate) fn span_context(&self) -> &SpanContext {
        &self.span_context
    }
}

impl fmt::Debug for SynchronizedSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronizedSpan")
            .field("span_context", &self.span_context)
            .finish()
    }
}

impl From<SpanContext> for SynchronizedSpan {
    fn from(value: SpanContext) -> Self {
        Self {
            span_context: value,
            inner: None,
        }
    }
}

impl<T: Span + Send + Sync + 'static> From<T> for SynchronizedSpan {
    fn from(value: T) -> Self {
        Self {
            span_context: value.span_context().clone(),
            inner: Some(Mutex::new(Box::new(value))),
        }
    }
}

/// A reference to the currently active span in a context.
#[derive(Debug)]
pub struct SpanRef<'a>(&'a SynchronizedSpan);

impl SpanRef<'_> {
    fn with_inner_mut<F: FnOnce(&mut Box<dyn ObjectSafeSpan>)>(&self, f: F) {
        if let Some(inner) = &self.0.inner {
            if let Ok(mut locked) = inner.lock() {
                f(&mut locked)
            }
        }
    }

    /// Record an event for the active span.
    pub fn add_event<T>(&self, name: T, attributes: Vec<KeyValue>)
    where
        T: Into<Cow<'static, str>>,
    {
        self.add_event_with_timestamp(name, crate::time::now(), attributes)
    }

    /// Record an event for the active span at the given time.
    pub fn add_event_with_timestamp<T>(
        &self,
        name: T,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) where
        T: Into<Cow<'static, str>>,
    {
        self.with_inner_mut(move |inner| {
            inner.add_event_with_timestamp(name.into(), timestamp, attributes)
        })
    }

    /// Record an error as an `exception` event on the active span.
    ///
    /// The span status is not changed by this method.
    pub fn record_error(&self, err: &dyn Error) {
        if self.is_recording() {
            let attributes = vec![KeyValue::new("exception.message", err.to_string())];
            self.add_event("exception", attributes);
        }
    }

    /// The [`SpanContext`] of the active span.
    pub fn span_context(&self) -> &SpanContext {
        &self.0.span_context
    }

    /// Whether the active span is recording information.
    pub fn is_recording(&self) -> bool {
        self.0
            .inner
            .as_ref()
            .and_then(|inner| inner.lock().ok().map(|active| active.is_recording()))
            .unwrap_or(false)
    }

    /// Set one attribute of the active span.
    pub fn set_attribute(&self, attribute: KeyValue) {
        self.with_inner_mut(move |inner| inner.set_attribute(attribute))
    }

    /// Set multiple attributes of the active span.
    pub fn set_attributes(&self, attributes: impl IntoIterator<Item = KeyValue>) {
        self.with_inner_mut(move |inner| {
            for attribute in attributes {
                inner.set_attribute(attribute);
            }
        })
    }

    /// Set the status of the active span.
    pub fn set_status(&self, status: Status) {
        self.with_inner_mut(move |inner| inner.set_status(status))
    }

    /// Update the active span's name.
    pub fn update_name<T>(&self, new_name: T)
    where
        T: Into<Cow<'static, str>>,
    {
        self.with_inner_mut(move |inner| inner.update_name(new_name.into()))
    }

    /// End the active span now.
    pub fn end(&self) {
        self.end_with_timestamp(crate::time::now());
    }

    /// End the active span at the given time.
    pub fn end_with_timestamp(&self, timestamp: SystemTime) {
        self.with_inner_mut(move |inner| inner.end_with_timestamp(timestamp))
    }

    /// Apply `f` to the active span if its concrete type is `S`.
    ///
    /// This is an SDK hook (e.g. to inherit a parent span's clock), not an
    /// application-facing API.
    #[doc(hidden)]
    pub fn downcast_map<S: 'static, T>(&self, f: impl FnOnce(&S) -> T) -> Option<T> {
        let inner = self.0.inner.as_ref()?;
        let guard = inner.lock().ok()?;
        guard.as_any().downcast_ref::<S>().map(f)
    }
}

/// Methods for storing and retrieving trace data in a [`Context`].
pub trait TraceContextExt {
    /// A clone of the current context with `span` set as the active span.
    fn current_with_span<T: Span + Send + Sync + 'static>(span: T) -> Self;

    /// A clone of this context with `span` set as the active span.
    ///
    /// This stores the raw span binding; prefer [`Span::store_in_context`],
    /// which lets the span's implementation participate (suppression
    /// marking, no-op re-injection).
    fn with_span<T: Span + Send + Sync + 'static>(&self, span: T) -> Self;

    /// A reference to this context's active span, or a no-op span if none
    /// is set.
    fn span(&self) -> SpanRef<'_>;

    /// Whether an active span is set in this context.
    fn has_active_span(&self) -> bool;

    /// A clone of this context holding the span identity extracted from a
    /// remote peer, for propagators.
    fn with_remote_span_context(&self, span_context: SpanContext) -> Self;
}

impl TraceContextExt for Context {
    fn current_with_span<T: Span + Send + Sync + 'static>(span: T) -> Self {
        Context::current_with_synchronized_span(span.into())
    }

    fn with_span<T: Span + Send + Sync + 'static>(&self, span: T) -> Self {
        self.with_synchronized_span(span.into())
    }

    fn span(&self) -> SpanRef<'_> {
        if let Some(span) = self.span.as_ref() {
            SpanRef(span)
        } else {
            SpanRef(&NOOP_SPAN)
        }
    }

    fn has_active_span(&self) -> bool {
        self.span.is_some()
    }

    fn with_remote_span_context(&self, span_context: SpanContext) -> Self {
        self.with_synchronized_span(span_context.into())
    }
}

/// Mark `span` as active for the current scope.
///
/// The span is stored through [`Span::store_in_context`] and the resulting
/// context attached; dropping the returned guard restores the previous
/// context.
///
/// # Examples
///
/// ```
/// use contrail::trace::{get_active_span, mark_span_as_active, Tracer, NoopTracer};
/// use contrail::KeyValue;
///
/// fn my_function() {
///     let tracer = NoopTracer::new();
///     let span = tracer.start("operation");
///     let _guard = mark_span_as_active(span);
///     // anything happening in functions we call can still access the active span...
///     my_other_function();
/// }
///
/// fn my_other_function() {
///     get_active_span(|span| {
///         span.add_event("An event!", vec![KeyValue::new("happened", true)]);
///     });
/// }
/// ```
#[must_use = "Dropping the guard detaches the context."]
pub fn mark_span_as_active<T: Span + Send + Sync + 'static>(span: T) -> ContextGuard {
    let cx = Context::map_current(|cx| span.store_in_context(cx));
    cx.attach()
}

/// Executes a closure with a reference to this thread's current span.
pub fn get_active_span<F, T>(f: F) -> T
where
    F: FnOnce(SpanRef<'_>) -> T,
{
    Context::map_current(|cx| f(cx.span()))
}
