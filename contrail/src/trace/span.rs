use crate::trace::{SpanContext, TraceContextExt};
use crate::{Context, KeyValue};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::time::SystemTime;

/// The relationship between a span and its parent or peers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Copy)]
pub enum SpanKind {
    /// Outgoing synchronous remote call, e.g. an HTTP request or database
    /// query.
    Client,
    /// Incoming synchronous remote call handled by this process.
    Server,
    /// Creation or enqueueing of a message for asynchronous processing.
    Producer,
    /// Processing of a message from a broker or queue.
    Consumer,
    /// In-process work with no remote peer. Internal spans are never
    /// considered duplicates of each other by suppression.
    Internal,
}

impl SpanKind {
    /// The canonical lowercase name of this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Client => "client",
            SpanKind::Server => "server",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
            SpanKind::Internal => "internal",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status of a finished span.
///
/// Once set to [`Status::Ok`] the status can no longer be changed; `Ok`
/// takes precedence over `Error`, which takes precedence over the default
/// `Unset`.
#[derive(Clone, Debug, Default, PartialEq, PartialOrd)]
pub enum Status {
    /// The default status.
    #[default]
    Unset,

    /// The operation contains an error.
    Error {
        /// Description of the error.
        description: Cow<'static, str>,
    },

    /// The operation completed successfully, as affirmed by the application
    /// developer.
    Ok,
}

impl Status {
    /// Create an error status with the given description.
    pub fn error(description: impl Into<Cow<'static, str>>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }
}

/// A single timed unit of work within a trace.
///
/// Spans are created by a [`Tracer`] and identified by a [`SpanContext`].
/// Depending on how the SDK decided the creation attempt, a handle may be
/// recording (mutations are stored), non-recording (valid identity, all
/// mutations are no-ops), or suppressed (a stand-in for an equivalent span
/// already in flight). Mutating a non-recording handle is never an error.
///
/// [`Tracer`]: crate::trace::Tracer
pub trait Span {
    /// Record an event for this span at the current time.
    fn add_event<T>(&mut self, name: T, attributes: Vec<KeyValue>)
    where
        T: Into<Cow<'static, str>>,
    {
        self.add_event_with_timestamp(name, crate::time::now(), attributes)
    }

    /// Record an event for this span at the given time.
    fn add_event_with_timestamp<T>(
        &mut self,
        name: T,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) where
        T: Into<Cow<'static, str>>;

    /// Record an error as an `exception` event.
    ///
    /// This does not change the span status; call [`set_status`] separately
    /// if the error is terminal.
    ///
    /// [`set_status`]: Span::set_status
    fn record_error(&mut self, err: &dyn Error) {
        if self.is_recording() {
            let attributes = vec![KeyValue::new("exception.message", err.to_string())];
            self.add_event("exception", attributes);
        }
    }

    /// The [`SpanContext`] identifying this span.
    fn span_context(&self) -> &SpanContext;

    /// Whether this span records information like events and attributes.
    ///
    /// Returns `false` after the span has ended, and always for
    /// non-recording and suppressed handles.
    fn is_recording(&self) -> bool;

    /// Set one attribute of this span.
    ///
    /// Attributes with empty keys are silently discarded. Setting an
    /// attribute with an existing key stores both; consumers see the later
    /// value.
    fn set_attribute(&mut self, attribute: KeyValue);

    /// Set multiple attributes of this span.
    fn set_attributes(&mut self, attributes: impl IntoIterator<Item = KeyValue>)
    where
        Self: Sized,
    {
        if self.is_recording() {
            for attr in attributes {
                self.set_attribute(attr);
            }
        }
    }

    /// Set the status of this span, respecting status precedence.
    fn set_status(&mut self, status: Status);

    /// Update the span's name.
    fn update_name<T>(&mut self, new_name: T)
    where
        T: Into<Cow<'static, str>>;

    /// Add a link to a span in this or another trace.
    ///
    /// Links with an invalid span context are silently discarded.
    fn add_link(&mut self, span_context: SpanContext, attributes: Vec<KeyValue>);

    /// Signal that the operation described by this span has ended now.
    fn end(&mut self) {
        self.end_with_timestamp(crate::time::now());
    }

    /// Signal that the operation described by this span ended at the given
    /// time. Only the first end is recorded; later calls are no-ops.
    fn end_with_timestamp(&mut self, timestamp: SystemTime);

    /// A copy of `cx` with this span as the active span.
    ///
    /// This is the canonical way to put a span into a context: SDK
    /// implementations hook it to layer bookkeeping alongside the span
    /// binding (suppressed handles return `cx` unchanged, so re-injecting
    /// them never widens causality).
    fn store_in_context(self, cx: &Context) -> Context
    where
        Self: Sized + Send + Sync + 'static,
    {
        cx.with_span(self)
    }
}
