//! Semantic classification of instrumented operations.

use std::collections::HashSet;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

/// An open, string-backed category tag describing what kind of operation a
/// tracer instruments (database calls, outgoing HTTP requests, ...).
///
/// The set of types is not a closed enumeration: new categories can be
/// introduced by name at runtime with [`InstrumentationType::from_name`]
/// without any code change, and are interned process-wide for the lifetime
/// of the process. The backing string is interned, so copies are two words
/// and comparisons never allocate.
///
/// [`InstrumentationType::NONE`] is the distinguished "unset" value. SDKs
/// use these tags as the duplicate-span suppression granularity; untyped
/// (`NONE`) instrumentation is never suppressed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrumentationType(&'static str);

static INTERNED: OnceLock<RwLock<HashSet<&'static str>>> = OnceLock::new();

fn interned() -> &'static RwLock<HashSet<&'static str>> {
    INTERNED.get_or_init(|| {
        RwLock::new(HashSet::from([
            InstrumentationType::NONE.0,
            InstrumentationType::HTTP.0,
            InstrumentationType::DB.0,
            InstrumentationType::RPC.0,
            InstrumentationType::MESSAGING.0,
        ]))
    })
}

impl InstrumentationType {
    /// The distinguished "unset" type.
    pub const NONE: InstrumentationType = InstrumentationType("NONE");
    /// Outgoing or incoming HTTP calls.
    pub const HTTP: InstrumentationType = InstrumentationType("HTTP");
    /// Database client calls.
    pub const DB: InstrumentationType = InstrumentationType("DB");
    /// Remote procedure calls.
    pub const RPC: InstrumentationType = InstrumentationType("RPC");
    /// Messaging system operations.
    pub const MESSAGING: InstrumentationType = InstrumentationType("MESSAGING");

    /// Resolves the type with the given canonical name, interning the name
    /// on first use.
    ///
    /// Repeated calls with equal names return equal types backed by the same
    /// interned string.
    pub fn from_name(name: &str) -> Self {
        let registry = interned();
        {
            let set = registry.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = set.get(name) {
                return InstrumentationType(existing);
            }
        }
        let mut set = registry.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = set.get(name) {
            return InstrumentationType(existing);
        }
        // First use of this name anywhere in the process. The set keeps the
        // allocation alive for the process lifetime; it never shrinks.
        let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
        set.insert(name);
        InstrumentationType(name)
    }

    /// The canonical name of this type.
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl Default for InstrumentationType {
    fn default() -> Self {
        InstrumentationType::NONE
    }
}

impl fmt::Debug for InstrumentationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InstrumentationType").field(&self.0).finish()
    }
}

impl fmt::Display for InstrumentationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
