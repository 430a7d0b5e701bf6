use crate::trace::{TraceError, TraceResult};
use crate::{SpanId, TraceFlags, TraceId};
use std::collections::VecDeque;
use thiserror::Error;

/// Vendor-specific trace configuration carried alongside a trace.
///
/// `TraceState` is an ordered list of key-value pairs that lets multiple
/// tracing systems participate in the same trace. Keys and values are
/// constrained by the [W3C trace context specification]; mutating operations
/// validate and return a new `TraceState`, never modifying the receiver.
///
/// [W3C trace context specification]: https://www.w3.org/TR/trace-context/#tracestate-header
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct TraceState(Option<VecDeque<(String, String)>>);

impl TraceState {
    /// The default empty `TraceState`, as a constant.
    pub const NONE: TraceState = TraceState(None);

    fn valid_key(key: &str) -> bool {
        if key.is_empty() || key.len() > 256 {
            return false;
        }
        let bytes = key.as_bytes();
        if !(bytes[0].is_ascii_lowercase() || bytes[0].is_ascii_digit()) {
            return false;
        }
        let mut seen_at = false;
        for &b in &bytes[1..] {
            let plain = b.is_ascii_lowercase()
                || b.is_ascii_digit()
                || matches!(b, b'_' | b'-' | b'*' | b'/');
            if b == b'@' {
                if seen_at {
                    return false;
                }
                seen_at = true;
            } else if !plain {
                return false;
            }
        }
        true
    }

    fn valid_value(value: &str) -> bool {
        value.len() <= 256 && !(value.contains(',') || value.contains('='))
    }

    /// Creates a `TraceState` from the given key-value collection.
    ///
    /// ```
    /// use contrail::trace::TraceState;
    ///
    /// let trace_state = TraceState::from_key_value([("foo", "bar"), ("apple", "banana")]);
    /// assert_eq!(trace_state.unwrap().header(), "foo=bar,apple=banana");
    /// ```
    pub fn from_key_value<T, K, V>(trace_state: T) -> TraceResult<Self>
    where
        T: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
    {
        let entries = trace_state
            .into_iter()
            .map(|(key, value)| {
                let (key, value) = (key.to_string(), value.to_string());
                if !TraceState::valid_key(key.as_str()) {
                    return Err(TraceStateError::Key(key));
                }
                if !TraceState::valid_value(value.as_str()) {
                    return Err(TraceStateError::Value(value));
                }
                Ok((key, value))
            })
            .collect::<Result<VecDeque<_>, TraceStateError>>()?;

        if entries.is_empty() {
            Ok(TraceState(None))
        } else {
            Ok(TraceState(Some(entries)))
        }
    }

    /// The value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.as_ref().and_then(|kvs| {
            kvs.iter()
                .find(|(k, _)| k.as_str() == key)
                .map(|(_, v)| v.as_str())
        })
    }

    /// A new `TraceState` with the given pair inserted at the front.
    ///
    /// An existing entry for the key is replaced and moved to the front, per
    /// the W3C mutation rules. Invalid keys or values are rejected.
    pub fn insert<K, V>(&self, key: K, value: V) -> TraceResult<TraceState>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (key, value) = (key.into(), value.into());
        if !TraceState::valid_key(key.as_str()) {
            return Err(TraceStateError::Key(key).into());
        }
        if !TraceState::valid_value(value.as_str()) {
            return Err(TraceStateError::Value(value).into());
        }

        let mut owned = self.clone();
        if let Some(kvs) = owned.0.as_mut() {
            if let Some(index) = kvs.iter().position(|(k, _)| *k == key) {
                kvs.remove(index);
            }
        }
        owned
            .0
            .get_or_insert_with(|| VecDeque::with_capacity(1))
            .push_front((key, value));
        Ok(owned)
    }

    /// Renders this `TraceState` in `tracestate` header form.
    pub fn header(&self) -> String {
        self.0
            .as_ref()
            .map(|kvs| {
                kvs.iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<String>>()
                    .join(",")
            })
            .unwrap_or_default()
    }
}

/// Error returned by `TraceState` operations.
#[derive(Error, Debug)]
enum TraceStateError {
    /// The key does not satisfy the W3C trace context key grammar.
    #[error("{0} is not a valid TraceState key")]
    Key(String),

    /// The value does not satisfy the W3C trace context value grammar.
    #[error("{0} is not a valid TraceState value")]
    Value(String),
}

impl From<TraceStateError> for TraceError {
    fn from(err: TraceStateError) -> Self {
        TraceError::Other(Box::new(err))
    }
}

/// Immutable identity portion of a span, suitable for propagation.
///
/// A `SpanContext` is valid iff both its trace id and span id are non-zero.
/// Once constructed it never changes; operations that would modify it, such
/// as a sampler updating the trace state, construct a new value.
#[derive(Clone, Debug, PartialEq, Hash, Eq)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: TraceFlags,
    is_remote: bool,
    trace_state: TraceState,
}

impl SpanContext {
    /// The invalid span context.
    pub const NONE: SpanContext = SpanContext {
        trace_id: TraceId::INVALID,
        span_id: SpanId::INVALID,
        trace_flags: TraceFlags::NOT_SAMPLED,
        is_remote: false,
        trace_state: TraceState::NONE,
    };

    /// An invalid, empty span context.
    pub fn empty_context() -> Self {
        SpanContext::NONE
    }

    /// Construct a new `SpanContext`.
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: TraceFlags,
        is_remote: bool,
        trace_state: TraceState,
    ) -> Self {
        SpanContext {
            trace_id,
            span_id,
            trace_flags,
            is_remote,
            trace_state,
        }
    }

    /// The [`TraceId`] of the trace this span belongs to.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The [`SpanId`] of this span.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// The trace flags, currently only carrying the sampled bit.
    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    /// `true` iff both the trace id and the span id are non-zero.
    pub fn is_valid(&self) -> bool {
        self.trace_id != TraceId::INVALID && self.span_id != SpanId::INVALID
    }

    /// `true` if this context was propagated from a remote parent.
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// `true` if the `sampled` trace flag is set.
    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }

    /// This context's [`TraceState`].
    pub fn trace_state(&self) -> &TraceState {
        &self.trace_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_state_header_and_get() {
        let state = TraceState::from_key_value([("foo", "bar"), ("apple", "banana")]).unwrap();
        assert_eq!(state.header(), "foo=bar,apple=banana");
        assert_eq!(state.get("apple"), Some("banana"));
        assert_eq!(state.get("missing"), None);
    }

    #[test]
    fn trace_state_insert_is_persistent() {
        let state = TraceState::from_key_value([("foo", "bar")]).unwrap();
        let updated = state.insert("testkey", "testvalue").unwrap();
        // The original state is untouched.
        assert!(state.get("testkey").is_none());
        assert_eq!(updated.get("testkey"), Some("testvalue"));
        // Updated keys move to the front.
        let moved = updated.insert("foo", "baz").unwrap();
        assert!(moved.header().starts_with("foo=baz"));
    }

    #[test]
    fn trace_state_key_validation() {
        let cases: Vec<(&str, bool)> = vec![
            ("123", true),
            ("bar", true),
            ("foo@bar", true),
            ("foo@bar@baz", false),
            ("FOO", false),
            ("", false),
            ("你好", false),
        ];
        for (key, expected) in cases {
            assert_eq!(TraceState::valid_key(key), expected, "key: {key:?}");
        }
        assert!(TraceState::NONE.insert("FOO", "bar").is_err());
        assert!(TraceState::NONE.insert("foo", "a,b").is_err());
    }

    #[test]
    fn span_context_validity() {
        assert!(!SpanContext::empty_context().is_valid());
        assert!(!SpanContext::new(
            TraceId::from(1),
            SpanId::INVALID,
            TraceFlags::default(),
            false,
            TraceState::default(),
        )
        .is_valid());
        assert!(SpanContext::new(
            TraceId::from(1),
            SpanId::from(1),
            TraceFlags::default(),
            false,
            TraceState::default(),
        )
        .is_valid());
    }
}
