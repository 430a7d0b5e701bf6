use crate::trace::Tracer;
use crate::InstrumentationScope;
use std::borrow::Cow;

/// Types that can create instances of [`Tracer`].
///
/// Tracer resolution is expected to be cheap and reference-stable:
/// resolving the same instrumentation scope twice yields the same tracer,
/// so instrumentation can re-resolve freely instead of caching.
pub trait TracerProvider {
    /// The `Tracer` type this provider creates.
    type Tracer: Tracer;

    /// A tracer identified by name only.
    fn tracer(&self, name: impl Into<Cow<'static, str>>) -> Self::Tracer {
        let scope = InstrumentationScope::builder(name).build();
        self.tracer_with_scope(scope)
    }

    /// A tracer for the given instrumentation scope.
    ///
    /// The full scope tuple (name, version, schema URL, instrumentation
    /// type) is the tracer's identity.
    fn tracer_with_scope(&self, scope: InstrumentationScope) -> Self::Tracer;
}
