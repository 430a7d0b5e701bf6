//! # Contrail tracing API
//!
//! This crate defines the vendor-neutral surface of the contrail tracing
//! toolkit: the identity types that describe spans and traces, the immutable
//! [`Context`] that carries the active span and other execution-scoped
//! values, and the [`Tracer`]/[`TracerProvider`]/[`Span`] traits that SDKs
//! implement.
//!
//! The API makes no decisions by itself. Creating a span through the traits
//! here always delegates to an installed implementation such as the
//! `contrail_sdk` crate, which is where sampling, id generation and
//! duplicate-span suppression actually happen.
//!
//! ## Overview
//!
//! * [`TracerProvider`]s are the entry point of the API. They hand out
//!   [`Tracer`]s for a given instrumentation scope.
//! * [`Tracer`]s create [`Span`]s.
//! * [`Span`]s represent a single timed unit of work within a trace.
//! * [`Context`] carries the currently active span (and any suppression
//!   markers an SDK may layer on) across API boundaries.
//!
//! [`Tracer`]: crate::trace::Tracer
//! [`TracerProvider`]: crate::trace::TracerProvider
//! [`Span`]: crate::trace::Span
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![allow(clippy::needless_doctest_main)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod common;
pub mod context;
mod internal_logging;
pub mod time;
pub mod trace;
mod trace_context;

pub use common::{
    InstrumentationScope, InstrumentationScopeBuilder, Key, KeyValue, Value,
};
pub use context::{Context, ContextGuard, ContextKey};
pub use trace_context::{SpanId, TraceFlags, TraceId};

#[cfg(feature = "internal-logs")]
#[doc(hidden)]
pub mod _private {
    pub use tracing::{debug, error, info, warn};
}
