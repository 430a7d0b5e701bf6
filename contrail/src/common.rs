//! Common attribute and instrumentation-identity types.

use crate::trace::InstrumentationType;
use std::borrow::Cow;
use std::fmt;
use std::hash;

/// The key half of an attribute.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// Create a new key from a value that can avoid allocation for static
    /// strings.
    pub fn new(value: impl Into<Cow<'static, str>>) -> Self {
        Key(value.into())
    }

    /// Create a new key from a static string without allocating.
    pub const fn from_static_str(value: &'static str) -> Self {
        Key(Cow::Borrowed(value))
    }

    /// The key as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Key {
    fn from(value: &'static str) -> Self {
        Key(Cow::Borrowed(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key(Cow::Owned(value))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The value half of an attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A boolean value.
    Bool(bool),
    /// A signed 64-bit integer value.
    I64(i64),
    /// A 64-bit float value.
    F64(f64),
    /// A string value.
    String(Cow<'static, str>),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::String(Cow::Borrowed(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Cow::Owned(value))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => fmt::Display::fmt(v, f),
            Value::I64(v) => fmt::Display::fmt(v, f),
            Value::F64(v) => fmt::Display::fmt(v, f),
            Value::String(v) => f.write_str(v),
        }
    }
}

/// A key-value attribute pair.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    /// The attribute name.
    pub key: Key,
    /// The attribute value.
    pub value: Value,
}

impl KeyValue {
    /// Create a new `KeyValue` pair.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Identity of a library or crate providing instrumentation.
///
/// Tracers are resolved by this identity tuple: two scopes with equal name,
/// version, schema URL and instrumentation type resolve to the same tracer.
/// The scope should be named after the instrumented library (e.g.
/// `middleware` for a web framework), not the library doing the
/// instrumenting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstrumentationScope {
    /// Name of the instrumentation scope. Required, and expected to be
    /// non-empty.
    name: Cow<'static, str>,

    /// Version of the instrumented library.
    version: Option<Cow<'static, str>>,

    /// Schema URL the emitted telemetry conforms to.
    schema_url: Option<Cow<'static, str>>,

    /// Semantic category of the operations this scope instruments, used as
    /// the suppression granularity by SDKs.
    instrumentation_type: InstrumentationType,
}

impl hash::Hash for InstrumentationScope {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.schema_url.hash(state);
        self.instrumentation_type.hash(state);
    }
}

impl InstrumentationScope {
    /// Create a new builder for an [InstrumentationScope] with the given name.
    pub fn builder<T: Into<Cow<'static, str>>>(name: T) -> InstrumentationScopeBuilder {
        InstrumentationScopeBuilder {
            name: name.into(),
            version: None,
            schema_url: None,
            instrumentation_type: None,
        }
    }

    /// The instrumentation scope name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The instrumented library version, if any.
    #[inline]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The schema URL, if any.
    #[inline]
    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }

    /// The semantic instrumentation type, [`InstrumentationType::NONE`] when
    /// unset.
    #[inline]
    pub fn instrumentation_type(&self) -> InstrumentationType {
        self.instrumentation_type
    }
}

/// Configuration options for an [InstrumentationScope].
///
/// Apart from the name, all fields are optional.
#[derive(Debug)]
pub struct InstrumentationScopeBuilder {
    name: Cow<'static, str>,
    version: Option<Cow<'static, str>>,
    schema_url: Option<Cow<'static, str>>,
    instrumentation_type: Option<InstrumentationType>,
}

impl InstrumentationScopeBuilder {
    /// Configure the version for the instrumentation scope.
    pub fn with_version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Configure the schema URL for the instrumentation scope.
    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        self.schema_url = Some(schema_url.into());
        self
    }

    /// Configure the semantic instrumentation type for the scope.
    ///
    /// ```
    /// use contrail::trace::InstrumentationType;
    ///
    /// let scope = contrail::InstrumentationScope::builder("my-orm")
    ///     .with_instrumentation_type(InstrumentationType::DB)
    ///     .build();
    /// ```
    pub fn with_instrumentation_type(mut self, instrumentation_type: InstrumentationType) -> Self {
        self.instrumentation_type = Some(instrumentation_type);
        self
    }

    /// Create an [InstrumentationScope] from this configuration.
    pub fn build(self) -> InstrumentationScope {
        InstrumentationScope {
            name: self.name,
            version: self.version,
            schema_url: self.schema_url,
            instrumentation_type: self.instrumentation_type.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(scope: &InstrumentationScope) -> u64 {
        let mut hasher = DefaultHasher::new();
        scope.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn scope_identity_includes_full_tuple() {
        let build = |ty| {
            InstrumentationScope::builder("orm")
                .with_version("1.2.0")
                .with_schema_url("https://example.com/schemas/1.0")
                .with_instrumentation_type(ty)
                .build()
        };

        let db = build(InstrumentationType::DB);
        let same = build(InstrumentationType::DB);
        let http = build(InstrumentationType::HTTP);

        assert_eq!(db, same);
        assert_eq!(hash_of(&db), hash_of(&same));
        assert_ne!(db, http);
    }

    #[test]
    fn scope_defaults_to_untyped() {
        let scope = InstrumentationScope::builder("plain").build();
        assert_eq!(scope.instrumentation_type(), InstrumentationType::NONE);
        assert_eq!(scope.version(), None);
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(42i64).to_string(), "42");
        assert_eq!(Value::from("hello").to_string(), "hello");
    }
}
