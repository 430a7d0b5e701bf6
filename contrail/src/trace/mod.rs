//! Tracing API surface.
//!
//! A trace is a tree of [`Span`]s describing the work done for a single
//! request as it flows through a system. This module holds the traits that
//! tracing SDKs implement ([`Tracer`], [`TracerProvider`], [`Span`]) and the
//! value types they exchange.
//!
//! ## Managing active spans
//!
//! Spans are made "active" for a dynamic scope by storing them in a
//! [`Context`] and attaching it; any span created while the context is
//! attached becomes a child of the active span. [`mark_span_as_active`] and
//! [`Tracer::in_span`] are shorthands for this, and [`get_active_span`]
//! gives access to the active span from anywhere in the scope.
//!
//! Instrumentation that knows its [`SpanKind`] and [`InstrumentationType`]
//! can call [`Tracer::should_start_span`] first and skip computing expensive
//! attributes when an equivalent span is already in flight; starting the
//! span anyway is always safe and merely less efficient.
//!
//! [`Context`]: crate::Context

use std::error::Error;
use thiserror::Error;

pub(crate) mod context;
mod event;
mod instrumentation_type;
mod link;
mod noop;
mod span;
mod span_context;
mod tracer;
mod tracer_provider;

pub use self::context::{get_active_span, mark_span_as_active, SpanRef, TraceContextExt};
pub use self::event::Event;
pub use self::instrumentation_type::InstrumentationType;
pub use self::link::Link;
pub use self::noop::{NoopSpan, NoopTracer, NoopTracerProvider};
pub use self::span::{Span, SpanKind, Status};
pub use self::span_context::{SpanContext, TraceState};
pub use self::tracer::{SamplingDecision, SamplingResult, SpanBuilder, Tracer};
pub use self::tracer_provider::TracerProvider;
pub use crate::trace_context::{SpanId, TraceFlags, TraceId};

/// Describes the result of fallible operations in the tracing API.
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors returned by the tracing API.
///
/// Nothing on the span creation path returns these; builders and spans
/// degrade silently instead. They surface from auxiliary operations such as
/// trace state mutation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// Error propagated from a tracing component.
    #[error(transparent)]
    Other(#[from] Box<dyn Error + Send + Sync + 'static>),
}

impl From<String> for TraceError {
    fn from(err_msg: String) -> Self {
        TraceError::Other(Box::new(Custom(err_msg)))
    }
}

impl From<&'static str> for TraceError {
    fn from(err_msg: &'static str) -> Self {
        TraceError::Other(Box::new(Custom(err_msg.into())))
    }
}

/// Wrap type for string messages.
#[derive(Error, Debug)]
#[error("{0}")]
struct Custom(String);
