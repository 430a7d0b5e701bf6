//! Span export interfaces.

use crate::error::SdkError;
use crate::resource::Resource;
use crate::trace::{SpanEvents, SpanLinks};
use async_trait::async_trait;
use contrail::trace::{InstrumentationType, SpanContext, SpanKind, Status};
use contrail::{InstrumentationScope, KeyValue, SpanId};
use std::borrow::Cow;
use std::fmt;
use std::time::SystemTime;

/// Result of an export attempt.
pub type ExportResult = Result<(), SdkError>;

/// Immutable data of a finished span, as handed to processors and
/// exporters.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    /// Identity of the exported span.
    pub span_context: SpanContext,
    /// Span id of the parent, invalid for root spans.
    pub parent_span_id: SpanId,
    /// The span kind.
    pub span_kind: SpanKind,
    /// Semantic category of the instrumented operation.
    pub instrumentation_type: InstrumentationType,
    /// The span name.
    pub name: Cow<'static, str>,
    /// Start time of the span.
    pub start_time: SystemTime,
    /// End time of the span.
    pub end_time: SystemTime,
    /// The stored attributes.
    pub attributes: Vec<KeyValue>,
    /// The number of attributes dropped past the configured limit.
    pub dropped_attributes_count: u32,
    /// The stored events plus dropped count.
    pub events: SpanEvents,
    /// The stored links plus dropped count.
    pub links: SpanLinks,
    /// The span status.
    pub status: Status,
    /// Identity of the tracer that created the span.
    pub instrumentation_scope: InstrumentationScope,
}

/// Exporters deliver batches of finished spans to a backend.
///
/// All blocking I/O belongs here, strictly outside the span creation path.
#[async_trait]
pub trait SpanExporter: Send + Sync + fmt::Debug {
    /// Export a batch of sampled, finished spans.
    async fn export(&mut self, batch: Vec<SpanData>) -> ExportResult;

    /// Shut the exporter down; buffered state should be released.
    fn shutdown(&mut self) {}

    /// Set the resource for the exporter.
    fn set_resource(&mut self, _resource: &Resource) {}
}
