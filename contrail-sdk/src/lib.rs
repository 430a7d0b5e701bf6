//! # Contrail SDK
//!
//! An opinionated implementation of the `contrail` tracing API. The SDK
//! decides, for every span creation attempt, whether a real recording span
//! is created, a non-recording span is created, or creation is suppressed
//! as redundant because an equivalent span is already in flight in the
//! current context lineage. It assigns trace/span identity, runs the
//! configured sampler, and delivers finished spans to processors and
//! exporters.
//!
//! Everything here runs synchronously on the caller's thread; span creation
//! is bounded, non-blocking work. Exporter I/O lives strictly behind the
//! [`trace::SpanProcessor`] boundary.
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

pub mod error;
pub mod resource;
pub mod testing;
pub mod trace;

pub use error::{SdkError, SdkResult};
pub use resource::Resource;
