use contrail::trace::Event;
use std::ops::Deref;

/// Stores the events of a span along with how many were dropped past the
/// configured limit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpanEvents {
    /// The events stored on the span.
    pub events: Vec<Event>,
    /// The number of events dropped due to the per-span limit.
    pub dropped_count: u32,
}

impl Deref for SpanEvents {
    type Target = [Event];

    fn deref(&self) -> &Self::Target {
        &self.events
    }
}
