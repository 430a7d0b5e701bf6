//! Representation of the entity producing telemetry.

use contrail::{Key, KeyValue, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Resource attribute key for the logical service name.
pub const SERVICE_NAME: &str = "service.name";
/// Resource attribute key for the telemetry SDK name.
pub const TELEMETRY_SDK_NAME: &str = "telemetry.sdk.name";
/// Resource attribute key for the telemetry SDK language.
pub const TELEMETRY_SDK_LANGUAGE: &str = "telemetry.sdk.language";
/// Resource attribute key for the telemetry SDK version.
pub const TELEMETRY_SDK_VERSION: &str = "telemetry.sdk.version";

/// An immutable set of attributes describing the entity that produces the
/// telemetry, shared by every span a provider creates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    attrs: Arc<HashMap<Key, Value>>,
}

impl Resource {
    /// A resource with no attributes.
    pub fn empty() -> Self {
        Resource::default()
    }

    /// A builder preloaded with the SDK identity attributes and an
    /// `unknown_service` service name.
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder {
            attrs: HashMap::from([
                (
                    Key::from_static_str(SERVICE_NAME),
                    Value::from("unknown_service"),
                ),
                (
                    Key::from_static_str(TELEMETRY_SDK_NAME),
                    Value::from("contrail"),
                ),
                (
                    Key::from_static_str(TELEMETRY_SDK_LANGUAGE),
                    Value::from("rust"),
                ),
                (
                    Key::from_static_str(TELEMETRY_SDK_VERSION),
                    Value::from(env!("CARGO_PKG_VERSION")),
                ),
            ]),
        }
    }

    /// A builder with no preloaded attributes.
    pub fn builder_empty() -> ResourceBuilder {
        ResourceBuilder {
            attrs: HashMap::new(),
        }
    }

    /// The value for `key`, if present.
    pub fn get(&self, key: &Key) -> Option<Value> {
        self.attrs.get(key).cloned()
    }

    /// The number of attributes in this resource.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Whether this resource has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Iterate over the attributes of this resource.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.attrs.iter()
    }
}

/// Builder for [`Resource`].
#[derive(Debug)]
pub struct ResourceBuilder {
    attrs: HashMap<Key, Value>,
}

impl ResourceBuilder {
    /// Set the `service.name` attribute.
    pub fn with_service_name(self, name: impl Into<Value>) -> Self {
        self.with_attribute(KeyValue::new(SERVICE_NAME, name))
    }

    /// Add a single attribute, replacing any previous value for its key.
    pub fn with_attribute(mut self, kv: KeyValue) -> Self {
        self.attrs.insert(kv.key, kv.value);
        self
    }

    /// Add attributes, replacing previous values for duplicate keys.
    pub fn with_attributes<I: IntoIterator<Item = KeyValue>>(mut self, attrs: I) -> Self {
        self.attrs
            .extend(attrs.into_iter().map(|kv| (kv.key, kv.value)));
        self
    }

    /// Create a [`Resource`] from this configuration.
    pub fn build(self) -> Resource {
        Resource {
            attrs: Arc::new(self.attrs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_builder_carries_sdk_identity() {
        let resource = Resource::builder().build();
        assert_eq!(
            resource.get(&Key::from_static_str(SERVICE_NAME)),
            Some(Value::from("unknown_service"))
        );
        assert_eq!(
            resource.get(&Key::from_static_str(TELEMETRY_SDK_LANGUAGE)),
            Some(Value::from("rust"))
        );
    }

    #[test]
    fn user_attributes_take_priority() {
        let resource = Resource::builder()
            .with_service_name("checkout")
            .build();
        assert_eq!(
            resource.get(&Key::from_static_str(SERVICE_NAME)),
            Some(Value::from("checkout"))
        );
    }

    #[test]
    fn empty_resource() {
        assert!(Resource::empty().is_empty());
        assert_eq!(Resource::builder_empty().build().len(), 0);
    }
}
