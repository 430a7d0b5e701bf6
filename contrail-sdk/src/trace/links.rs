use contrail::trace::Link;
use std::ops::Deref;

/// Stores the links of a span along with how many were dropped past the
/// configured limit.
///
/// The dropped count is the difference between the total number of link-add
/// attempts and the number stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpanLinks {
    /// The links stored on the span.
    pub links: Vec<Link>,
    /// The number of links dropped due to the per-span limit.
    pub dropped_count: u32,
}

impl Deref for SpanLinks {
    type Target = [Link];

    fn deref(&self) -> &Self::Target {
        &self.links
    }
}
