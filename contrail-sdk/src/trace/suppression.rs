//! Duplicate-span suppression.
//!
//! Layered instrumentation describes the same logical operation several
//! times over: an ORM wraps a database driver which wraps a network client,
//! and each layer independently tries to start "the" span for the call. The
//! types here answer whether an equivalent span is already in flight in the
//! current context lineage, so the creation path can hand back a no-op
//! stand-in instead of a duplicate.
//!
//! A marker is one boolean binding in the immutable [`Context`], addressed
//! by a [`ContextKey`] interned per derived key name. Granularity of "what
//! counts as equivalent" is a process-wide deployment decision captured in
//! [`SuppressionStrategy`].

use contrail::trace::{InstrumentationType, SpanKind};
use contrail::trail_warn;
use contrail::{Context, ContextKey};
use std::collections::HashMap;
use std::env;
use std::sync::{PoisonError, RwLock};

/// Key name derived under [`SuppressionStrategy::None`]. Both gate entry
/// points short-circuit before deriving a name under that strategy, so this
/// sentinel is never interned in practice; it exists so derivation is total.
const DISABLED_KEY_NAME: &str = "none";

/// Environment variable selecting the suppression granularity at startup.
pub const SUPPRESSION_STRATEGY_ENV: &str = "CONTRAIL_SPAN_SUPPRESSION_STRATEGY";

/// Granularity at which two in-flight spans count as duplicates.
///
/// Chosen once per provider (normally from the environment at process
/// start). Finer granularity suppresses more precisely at the cost of more
/// context bindings and registry entries; a single global switch keeps the
/// per-call path branch-free.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuppressionStrategy {
    /// Suppression is disabled.
    #[default]
    None,
    /// Spans of the same [`SpanKind`] are duplicates.
    ByKind,
    /// Spans of the same [`SpanKind`] and [`InstrumentationType`] are
    /// duplicates.
    ByKindAndType,
}

impl SuppressionStrategy {
    /// Read the strategy from [`SUPPRESSION_STRATEGY_ENV`].
    ///
    /// Unset or unrecognized values select [`SuppressionStrategy::None`];
    /// configuration problems never fail startup.
    pub fn from_env() -> Self {
        match env::var(SUPPRESSION_STRATEGY_ENV) {
            Ok(value) => match value.as_str() {
                "by_kind" => SuppressionStrategy::ByKind,
                "by_kind_and_type" => SuppressionStrategy::ByKindAndType,
                "none" | "" => SuppressionStrategy::None,
                unrecognized => {
                    trail_warn!(
                        name: "SuppressionStrategy.Unrecognized",
                        value = unrecognized.to_owned()
                    );
                    SuppressionStrategy::None
                }
            },
            Err(_) => SuppressionStrategy::None,
        }
    }
}

/// Process-wide interning table from derived key names to [`ContextKey`]
/// tokens.
///
/// Entries are created lazily on the first `mark` of a given name and live
/// for the rest of the process; the table grows monotonically and never
/// shrinks. Lookups of unknown names simply answer "no marker has ever been
/// placed for this name".
#[derive(Debug, Default)]
pub struct SuppressionKeyRegistry {
    keys: RwLock<HashMap<String, ContextKey>>,
}

impl SuppressionKeyRegistry {
    /// The token interned for `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<ContextKey> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// The token for `name`, interning one on first use.
    ///
    /// Concurrent first uses of the same name converge on a single token:
    /// the insert is a compare-and-insert under the write lock, so the first
    /// writer wins and later callers receive its token.
    pub fn intern(&self, name: &str) -> ContextKey {
        if let Some(key) = self.lookup(name) {
            return key;
        }
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        keys.entry(name.to_owned())
            .or_insert_with(|| ContextKey::named(name))
            .clone()
    }

    /// The number of interned key names.
    pub fn len(&self) -> usize {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no key name has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decision logic for duplicate-span suppression.
///
/// The gate is pure with respect to the context: [`exists`] has no side
/// effects, and [`mark`] returns a new layered context, never mutating its
/// input. It owns the key registry; pass a reference to the gate into the
/// components that need it rather than reaching for process-global state.
///
/// [`exists`]: SuppressionGate::exists
/// [`mark`]: SuppressionGate::mark
#[derive(Debug, Default)]
pub struct SuppressionGate {
    strategy: SuppressionStrategy,
    registry: SuppressionKeyRegistry,
}

impl SuppressionGate {
    /// Create a gate with the given strategy and a fresh key registry.
    pub fn new(strategy: SuppressionStrategy) -> Self {
        SuppressionGate {
            strategy,
            registry: SuppressionKeyRegistry::default(),
        }
    }

    /// The strategy this gate was configured with.
    pub fn strategy(&self) -> SuppressionStrategy {
        self.strategy
    }

    /// The key registry backing this gate.
    pub fn registry(&self) -> &SuppressionKeyRegistry {
        &self.registry
    }

    /// Is an equivalent span already in flight in this context lineage?
    ///
    /// `Internal` spans and untyped (`NONE`) instrumentation are never
    /// suppressible. An unknown derived name or an absent binding both
    /// answer `false`.
    pub fn exists(
        &self,
        kind: SpanKind,
        instrumentation_type: InstrumentationType,
        cx: &Context,
    ) -> bool {
        if kind == SpanKind::Internal || instrumentation_type == InstrumentationType::NONE {
            return false;
        }
        match self.registry.lookup(&self.key_name(kind, instrumentation_type)) {
            Some(key) => cx.get::<bool>(&key).copied().unwrap_or(false),
            None => false,
        }
    }

    /// A copy of `cx` layered with a marker recording that a
    /// `(kind, type)` span is now in flight.
    ///
    /// Returns the input unchanged (no new layer) when the combination is
    /// exempt (`Internal` kind, `NONE` type) or the strategy is `None`.
    /// Marking twice is idempotent in effect: the second marker layers
    /// another `true` binding that reads identically to the first.
    pub fn mark(
        &self,
        kind: SpanKind,
        instrumentation_type: InstrumentationType,
        cx: &Context,
    ) -> Context {
        if kind == SpanKind::Internal
            || instrumentation_type == InstrumentationType::NONE
            || self.strategy == SuppressionStrategy::None
        {
            return cx.clone();
        }
        let key = self.registry.intern(&self.key_name(kind, instrumentation_type));
        cx.with_value(&key, true)
    }

    fn key_name(&self, kind: SpanKind, instrumentation_type: InstrumentationType) -> String {
        match self.strategy {
            SuppressionStrategy::ByKind => kind.as_str().to_owned(),
            SuppressionStrategy::ByKindAndType => {
                format!("{}-{}", kind.as_str(), instrumentation_type.name())
            }
            SuppressionStrategy::None => DISABLED_KEY_NAME.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [SpanKind; 4] = [
        SpanKind::Client,
        SpanKind::Server,
        SpanKind::Producer,
        SpanKind::Consumer,
    ];

    #[test]
    fn mark_then_exists_by_kind_and_type() {
        let gate = SuppressionGate::new(SuppressionStrategy::ByKindAndType);
        for kind in KINDS {
            for ty in [InstrumentationType::DB, InstrumentationType::HTTP] {
                let cx = Context::new();
                let marked = gate.mark(kind, ty, &cx);
                assert!(gate.exists(kind, ty, &marked), "{kind}/{ty}");
                // The input context is untouched.
                assert!(!gate.exists(kind, ty, &cx), "{kind}/{ty}");
            }
        }
    }

    #[test]
    fn marking_is_scoped_to_the_type_under_kind_and_type() {
        let gate = SuppressionGate::new(SuppressionStrategy::ByKindAndType);
        let marked = gate.mark(SpanKind::Client, InstrumentationType::DB, &Context::new());

        assert!(gate.exists(SpanKind::Client, InstrumentationType::DB, &marked));
        assert!(!gate.exists(SpanKind::Client, InstrumentationType::HTTP, &marked));
        assert!(!gate.exists(SpanKind::Server, InstrumentationType::DB, &marked));
    }

    #[test]
    fn kind_granularity_ignores_the_type() {
        let gate = SuppressionGate::new(SuppressionStrategy::ByKind);
        let marked = gate.mark(SpanKind::Client, InstrumentationType::DB, &Context::new());

        // Any typed client span is a duplicate, whatever its type.
        assert!(gate.exists(SpanKind::Client, InstrumentationType::DB, &marked));
        assert!(gate.exists(SpanKind::Client, InstrumentationType::HTTP, &marked));
        assert!(!gate.exists(SpanKind::Server, InstrumentationType::DB, &marked));
    }

    #[test]
    fn internal_kind_is_never_suppressible() {
        for strategy in [
            SuppressionStrategy::ByKind,
            SuppressionStrategy::ByKindAndType,
        ] {
            let gate = SuppressionGate::new(strategy);
            let marked = gate.mark(SpanKind::Internal, InstrumentationType::DB, &Context::new());
            assert!(!gate.exists(SpanKind::Internal, InstrumentationType::DB, &marked));
            assert!(gate.registry().is_empty());
        }
    }

    #[test]
    fn untyped_instrumentation_is_never_suppressible() {
        let gate = SuppressionGate::new(SuppressionStrategy::ByKindAndType);
        let marked = gate.mark(SpanKind::Client, InstrumentationType::NONE, &Context::new());
        assert!(!gate.exists(SpanKind::Client, InstrumentationType::NONE, &marked));
        assert!(gate.registry().is_empty());
    }

    #[test]
    fn disabled_strategy_marks_nothing() {
        let gate = SuppressionGate::new(SuppressionStrategy::None);
        let cx = Context::new();
        let marked = gate.mark(SpanKind::Client, InstrumentationType::DB, &cx);

        assert!(!gate.exists(SpanKind::Client, InstrumentationType::DB, &marked));
        // No key was interned and no layer was added.
        assert!(gate.registry().is_empty());
        assert_eq!(format!("{marked:?}"), format!("{cx:?}"));
    }

    #[test]
    fn marker_does_not_leak_into_sibling_contexts() {
        let gate = SuppressionGate::new(SuppressionStrategy::ByKindAndType);
        let base = Context::new();
        let marked = gate.mark(SpanKind::Client, InstrumentationType::DB, &base);
        let sibling = base.clone();

        assert!(gate.exists(SpanKind::Client, InstrumentationType::DB, &marked));
        assert!(!gate.exists(SpanKind::Client, InstrumentationType::DB, &sibling));
    }

    #[test]
    fn re_marking_reads_identically() {
        let gate = SuppressionGate::new(SuppressionStrategy::ByKindAndType);
        let once = gate.mark(SpanKind::Client, InstrumentationType::DB, &Context::new());
        let twice = gate.mark(SpanKind::Client, InstrumentationType::DB, &once);

        assert!(gate.exists(SpanKind::Client, InstrumentationType::DB, &twice));
        // Still a single interned key for the derived name.
        assert_eq!(gate.registry().len(), 1);
    }

    #[test]
    fn interning_is_idempotent_per_name() {
        let registry = SuppressionKeyRegistry::default();
        let first = registry.intern("client-DB");
        let second = registry.intern("client-DB");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);

        let other = registry.intern("client-HTTP");
        assert_ne!(first, other);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lookup_of_unknown_names_is_not_an_error() {
        let registry = SuppressionKeyRegistry::default();
        assert!(registry.lookup("never-marked").is_none());
    }

    #[test]
    fn concurrent_first_use_converges_on_one_token() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SuppressionKeyRegistry::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.intern("client-DB"))
            })
            .collect();
        let keys: Vec<ContextKey> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.len(), 1);
        for key in &keys {
            assert_eq!(key, &keys[0]);
        }
    }

    #[test]
    fn strategy_from_env() {
        temp_env::with_var(SUPPRESSION_STRATEGY_ENV, Some("by_kind"), || {
            assert_eq!(SuppressionStrategy::from_env(), SuppressionStrategy::ByKind);
        });
        temp_env::with_var(SUPPRESSION_STRATEGY_ENV, Some("by_kind_and_type"), || {
            assert_eq!(
                SuppressionStrategy::from_env(),
                SuppressionStrategy::ByKindAndType
            );
        });
        temp_env::with_var(SUPPRESSION_STRATEGY_ENV, Some("everything"), || {
            assert_eq!(SuppressionStrategy::from_env(), SuppressionStrategy::None);
        });
        temp_env::with_var_unset(SUPPRESSION_STRATEGY_ENV, || {
            assert_eq!(SuppressionStrategy::from_env(), SuppressionStrategy::None);
        });
    }
}
