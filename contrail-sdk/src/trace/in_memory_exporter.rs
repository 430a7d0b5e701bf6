use crate::error::SdkError;
use crate::trace::export::{ExportResult, SpanData, SpanExporter};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// An exporter that keeps finished spans in memory, for tests and
/// debugging.
///
/// Cloning shares the underlying buffer, so a clone handed to a processor
/// can be observed from the test afterwards.
///
/// ```
/// use contrail::trace::{Tracer, TracerProvider};
/// use contrail_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SimpleSpanProcessor};
///
/// let exporter = InMemorySpanExporter::default();
/// let provider = SdkTracerProvider::builder()
///     .with_span_processor(SimpleSpanProcessor::new(exporter.clone()))
///     .build();
///
/// provider.tracer("test").in_span("operation", |_cx| {});
///
/// let spans = exporter.get_finished_spans().unwrap();
/// assert_eq!(spans.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

/// Builder for [`InMemorySpanExporter`].
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporterBuilder {
    _private: (),
}

impl InMemorySpanExporterBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the exporter.
    pub fn build(self) -> InMemorySpanExporter {
        InMemorySpanExporter::default()
    }
}

impl InMemorySpanExporter {
    /// A copy of all finished spans exported so far.
    pub fn get_finished_spans(&self) -> Result<Vec<SpanData>, SdkError> {
        self.spans
            .lock()
            .map(|spans| spans.clone())
            .map_err(|_| SdkError::InternalFailure("spans lock poisoned".into()))
    }

    /// Discard all finished spans collected so far.
    pub fn reset(&self) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.clear();
        }
    }
}

#[async_trait]
impl SpanExporter for InMemorySpanExporter {
    async fn export(&mut self, mut batch: Vec<SpanData>) -> ExportResult {
        self.spans
            .lock()
            .map(|mut spans| spans.append(&mut batch))
            .map_err(|_| SdkError::InternalFailure("spans lock poisoned".into()))
    }

    fn shutdown(&mut self) {
        self.reset();
    }
}
