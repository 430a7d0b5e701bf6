//! Bounds on the data one span may accumulate.
//!
//! Limits keep per-span resource usage bounded; anything added beyond a
//! limit is counted as dropped rather than stored.

const DEFAULT_MAX_EVENTS_PER_SPAN: u32 = 128;
const DEFAULT_MAX_ATTRIBUTES_PER_SPAN: u32 = 128;
const DEFAULT_MAX_LINKS_PER_SPAN: u32 = 128;
const DEFAULT_MAX_ATTRIBUTES_PER_EVENT: u32 = 128;
const DEFAULT_MAX_ATTRIBUTES_PER_LINK: u32 = 128;

/// Limits applied to the data recorded on one span.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpanLimits {
    /// The max number of events that can be added to a `Span`.
    pub max_events_per_span: u32,
    /// The max number of attributes that can be added to a `Span`.
    pub max_attributes_per_span: u32,
    /// The max number of links that can be added to a `Span`.
    pub max_links_per_span: u32,
    /// The max number of attributes that can be added to an `Event`.
    pub max_attributes_per_event: u32,
    /// The max number of attributes that can be added to a `Link`.
    pub max_attributes_per_link: u32,
}

impl Default for SpanLimits {
    fn default() -> Self {
        SpanLimits {
            max_events_per_span: DEFAULT_MAX_EVENTS_PER_SPAN,
            max_attributes_per_span: DEFAULT_MAX_ATTRIBUTES_PER_SPAN,
            max_links_per_span: DEFAULT_MAX_LINKS_PER_SPAN,
            max_attributes_per_event: DEFAULT_MAX_ATTRIBUTES_PER_EVENT,
            max_attributes_per_link: DEFAULT_MAX_ATTRIBUTES_PER_LINK,
        }
    }
}
