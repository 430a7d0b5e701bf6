//! Wall-clock access used for span timestamps.

use std::time::SystemTime;

/// The current wall-clock time.
///
/// SDKs that need monotonic guarantees anchor their own clock and only use
/// this for the anchor point.
pub fn now() -> SystemTime {
    SystemTime::now()
}
