//! The SDK span handle.
//!
//! One `Span` type backs the three outcomes of a creation attempt:
//!
//! * **recording** — carries [`SpanData`] that accumulates mutations until
//!   the span ends, at which point the data is taken, finalized and handed
//!   to the provider's processors (also when the span is merely dropped);
//! * **non-recording** — a valid span context for propagation, no data:
//!   every mutation is a no-op;
//! * **suppressed** — a stand-in for an equivalent span already in flight.
//!   It exposes the *parent's* span context unchanged, records nothing, and
//!   re-injecting it into a context returns the context as-is, so it never
//!   widens causality.

use crate::trace::{MonotonicClock, SdkTracer, SpanEvents, SpanLimits, SpanLinks};
use contrail::trace::{Event, InstrumentationType, SpanContext, SpanId, SpanKind, Status};
use contrail::{Context, KeyValue};
use std::borrow::Cow;
use std::time::SystemTime;

/// Single operation within a trace.
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    data: Option<SpanData>,
    suppressed: bool,
    clock: MonotonicClock,
    tracer: SdkTracer,
    span_limits: SpanLimits,
}

#[derive(Clone, Debug)]
pub(crate) struct SpanData {
    pub(crate) parent_span_id: SpanId,
    pub(crate) span_kind: SpanKind,
    pub(crate) instrumentation_type: InstrumentationType,
    pub(crate) name: Cow<'static, str>,
    pub(crate) start_time: SystemTime,
    pub(crate) end_time: SystemTime,
    pub(crate) attributes: Vec<KeyValue>,
    pub(crate) dropped_attributes_count: u32,
    pub(crate) events: SpanEvents,
    pub(crate) links: SpanLinks,
    pub(crate) status: Status,
}

impl Span {
    pub(crate) fn new(
        span_context: SpanContext,
        data: Option<SpanData>,
        tracer: SdkTracer,
        span_limits: SpanLimits,
        clock: MonotonicClock,
    ) -> Self {
        Span {
            span_context,
            data,
            suppressed: false,
            clock,
            tracer,
            span_limits,
        }
    }

    /// A permanently non-recording stand-in for an equivalent span already
    /// in flight, exposing the parent's span context for propagation.
    pub(crate) fn suppressed(parent_span_context: SpanContext, tracer: SdkTracer) -> Self {
        Span {
            span_context: parent_span_context,
            data: None,
            suppressed: true,
            clock: MonotonicClock::new(),
            tracer,
            span_limits: SpanLimits::default(),
        }
    }

    /// Whether this handle stands in for a suppressed creation attempt.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub(crate) fn clock(&self) -> MonotonicClock {
        self.clock
    }

    fn with_data<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut SpanData) -> T,
    {
        self.data.as_mut().map(f)
    }

    /// A copy of this span's data in export form, `None` once the span has
    /// ended or for spans that never recorded.
    pub fn exported_data(&self) -> Option<crate::trace::export::SpanData> {
        let data = self.data.as_ref()?;
        Some(build_export_data(
            data.clone(),
            self.span_context.clone(),
            &self.tracer,
        ))
    }

    fn ensure_ended_and_exported(&mut self, timestamp: Option<SystemTime>) {
        let Some(mut data) = self.data.take() else {
            return; // Already ended, or never recording.
        };
        data.end_time = timestamp.unwrap_or_else(|| self.clock.now());

        let Some(provider) = self.tracer.provider() else {
            return;
        };
        let export_data = build_export_data(data, self.span_context.clone(), &self.tracer);
        for processor in provider.span_processors() {
            processor.on_end(export_data.clone());
        }
    }
}

fn build_export_data(
    data: SpanData,
    span_context: SpanContext,
    tracer: &SdkTracer,
) -> crate::trace::export::SpanData {
    crate::trace::export::SpanData {
        span_context,
        parent_span_id: data.parent_span_id,
        span_kind: data.span_kind,
        instrumentation_type: data.instrumentation_type,
        name: data.name,
        start_time: data.start_time,
        end_time: data.end_time,
        attributes: data.attributes,
        dropped_attributes_count: data.dropped_attributes_count,
        events: data.events,
        links: data.links,
        status: data.status,
        instrumentation_scope: tracer.instrumentation_scope().clone(),
    }
}

fn data_set_attribute(data: &mut SpanData, attribute: KeyValue, limit: usize) {
    if attribute.key.as_str().is_empty() {
        return;
    }
    if data.attributes.len() < limit {
        data.attributes.push(attribute);
    } else {
        data.dropped_attributes_count += 1;
    }
}

fn data_add_event(
    data: &mut SpanData,
    name: Cow<'static, str>,
    timestamp: SystemTime,
    mut attributes: Vec<KeyValue>,
    events_limit: usize,
    event_attributes_limit: usize,
) {
    if data.events.events.len() >= events_limit {
        data.events.dropped_count += 1;
        return;
    }
    let dropped_attributes_count = attributes.len().saturating_sub(event_attributes_limit);
    attributes.truncate(event_attributes_limit);
    data.events.events.push(Event::new(
        name,
        timestamp,
        attributes,
        dropped_attributes_count as u32,
    ));
}

fn data_add_link(
    data: &mut SpanData,
    span_context: SpanContext,
    mut attributes: Vec<KeyValue>,
    links_limit: usize,
    link_attributes_limit: usize,
) {
    if data.links.links.len() >= links_limit {
        data.links.dropped_count += 1;
        return;
    }
    let dropped_attributes_count = attributes.len().saturating_sub(link_attributes_limit);
    attributes.truncate(link_attributes_limit);
    let mut link = contrail::trace::Link::new(span_context, attributes);
    link.dropped_attributes_count = dropped_attributes_count as u32;
    data.links.links.push(link);
}

impl contrail::trace::Span for Span {
    fn add_event_with_timestamp<T>(
        &mut self,
        name: T,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) where
        T: Into<Cow<'static, str>>,
    {
        let events_limit = self.span_limits.max_events_per_span as usize;
        let event_attributes_limit = self.span_limits.max_attributes_per_event as usize;
        let name = name.into();
        self.with_data(|data| {
            data_add_event(
                data,
                name,
                timestamp,
                attributes,
                events_limit,
                event_attributes_limit,
            )
        });
    }

    fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    fn is_recording(&self) -> bool {
        self.data.is_some()
    }

    fn set_attribute(&mut self, attribute: KeyValue) {
        let limit = self.span_limits.max_attributes_per_span as usize;
        self.with_data(|data| data_set_attribute(data, attribute, limit));
    }

    fn set_status(&mut self, status: Status) {
        self.with_data(|data| {
            // Ok beats Error beats Unset, later writes of lower precedence
            // are ignored.
            if status > data.status {
                data.status = status;
            }
        });
    }

    fn update_name<T>(&mut self, new_name: T)
    where
        T: Into<Cow<'static, str>>,
    {
        let name = new_name.into();
        self.with_data(|data| data.name = name);
    }

    fn add_link(&mut self, span_context: SpanContext, attributes: Vec<KeyValue>) {
        if !span_context.is_valid() {
            return;
        }
        let links_limit = self.span_limits.max_links_per_span as usize;
        let link_attributes_limit = self.span_limits.max_attributes_per_link as usize;
        self.with_data(|data| {
            data_add_link(
                data,
                span_context,
                attributes,
                links_limit,
                link_attributes_limit,
            )
        });
    }

    fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        self.ensure_ended_and_exported(Some(timestamp));
    }

    fn store_in_context(self, cx: &Context) -> Context {
        if self.suppressed {
            // An equivalent span is already bound in this lineage; storing
            // the stand-in must not change the context.
            return cx.clone();
        }
        let cx = match (self.data.as_ref(), self.tracer.provider()) {
            (Some(data), Some(provider)) => provider.suppression_gate().mark(
                data.span_kind,
                data.instrumentation_type,
                cx,
            ),
            // Non-recording spans do not arm suppression; nothing about the
            // operation is being recorded that a layer below would
            // duplicate.
            _ => cx.clone(),
        };
        contrail::trace::TraceContextExt::with_span(&cx, self)
    }
}

impl Drop for Span {
    /// Report the span on drop if it was not explicitly ended.
    fn drop(&mut self) {
        self.ensure_ended_and_exported(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{InMemorySpanExporter, SdkTracerProvider, SimpleSpanProcessor};
    use contrail::trace::{Span as _, Status, Tracer, TracerProvider};

    fn recording_span_setup() -> (InMemorySpanExporter, SdkTracerProvider) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_span_processor(SimpleSpanProcessor::new(exporter.clone()))
            .with_max_attributes_per_span(2)
            .with_max_events_per_span(2)
            .build();
        (exporter, provider)
    }

    #[test]
    fn attributes_beyond_the_limit_are_counted_dropped() {
        let (exporter, provider) = recording_span_setup();
        let tracer = provider.tracer("test");

        let mut span = tracer.start("capped");
        span.set_attribute(KeyValue::new("a", 1i64));
        span.set_attribute(KeyValue::new("b", 2i64));
        span.set_attribute(KeyValue::new("c", 3i64));
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].attributes.len(), 2);
        assert_eq!(spans[0].dropped_attributes_count, 1);
    }

    #[test]
    fn empty_attribute_keys_are_ignored() {
        let (exporter, provider) = recording_span_setup();
        let tracer = provider.tracer("test");

        let mut span = tracer.start("empty-keys");
        span.set_attribute(KeyValue::new("".to_string(), 1i64));
        span.set_attribute(KeyValue::new("real", 2i64));
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans[0].attributes.len(), 1);
        assert_eq!(spans[0].dropped_attributes_count, 0);
    }

    #[test]
    fn events_beyond_the_limit_are_counted_dropped() {
        let (exporter, provider) = recording_span_setup();
        let tracer = provider.tracer("test");

        let mut span = tracer.start("events");
        span.add_event("one", vec![]);
        span.add_event("two", vec![]);
        span.add_event("three", vec![]);
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans[0].events.len(), 2);
        assert_eq!(spans[0].events.dropped_count, 1);
    }

    #[test]
    fn status_precedence() {
        let (exporter, provider) = recording_span_setup();
        let tracer = provider.tracer("test");

        let mut span = tracer.start("status");
        span.set_status(Status::error("boom"));
        // Unset never downgrades an error.
        span.set_status(Status::Unset);
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans[0].status, Status::error("boom"));

        let mut span = tracer.start("status-ok");
        span.set_status(Status::Ok);
        span.set_status(Status::error("too late"));
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.last().unwrap().status, Status::Ok);
    }

    #[test]
    fn invalid_links_are_ignored() {
        let (exporter, provider) = recording_span_setup();
        let tracer = provider.tracer("test");

        let mut span = tracer.start("links");
        span.add_link(SpanContext::empty_context(), vec![]);
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans[0].links.len(), 0);
        assert_eq!(spans[0].links.dropped_count, 0);
    }

    #[test]
    fn ending_twice_exports_once() {
        let (exporter, provider) = recording_span_setup();
        let tracer = provider.tracer("test");

        let mut span = tracer.start("once");
        span.end();
        span.end();
        drop(span);

        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn dropping_a_span_exports_it() {
        let (exporter, provider) = recording_span_setup();
        let tracer = provider.tracer("test");

        let span = tracer.start("dropped");
        drop(span);

        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn mutations_after_end_are_noops() {
        let (exporter, provider) = recording_span_setup();
        let tracer = provider.tracer("test");

        let mut span = tracer.start("done");
        span.end();
        assert!(!span.is_recording());
        span.set_attribute(KeyValue::new("late", true));
        span.add_event("late", vec![]);

        let spans = exporter.get_finished_spans().unwrap();
        assert!(spans[0].attributes.is_empty());
        assert!(spans[0].events.is_empty());
    }
}
