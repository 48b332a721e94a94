//! Remote definitions.

use zeroize::{Zeroize, ZeroizeOnDrop};

use stratus_common::RemoteName;

/// A named cloud-storage account definition.
///
/// Holds the provider-type tag and an ordered mapping of configuration keys
/// to values. Values are opaque strings and may contain serialized tokens
/// verbatim; everything except the name is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RemoteDefinition {
    #[zeroize(skip)]
    name: RemoteName,
    provider: String,
    fields: Vec<(String, String)>,
}

impl RemoteDefinition {
    /// Create a new remote definition.
    pub fn new(
        name: RemoteName,
        provider: impl Into<String>,
        fields: Vec<(String, String)>,
    ) -> Self {
        Self {
            name,
            provider: provider.into(),
            fields,
        }
    }

    /// The remote's unique name.
    pub fn name(&self) -> &RemoteName {
        &self.name
    }

    /// The provider-type tag (e.g. "drive", "s3", "webdav").
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The configuration fields, in insertion order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Look up a field value by key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Debug for RemoteDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Field values may hold credentials; keep them out of logs.
        f.debug_struct("RemoteDefinition")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("fields", &format_args!("[REDACTED; {} entries]", self.fields.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RemoteDefinition {
        RemoteDefinition::new(
            RemoteName::new("box1").unwrap(),
            "box",
            vec![("token".to_string(), "abc".to_string())],
        )
    }

    #[test]
    fn test_accessors() {
        let def = sample();
        assert_eq!(def.name().as_str(), "box1");
        assert_eq!(def.provider(), "box");
        assert_eq!(def.field("token"), Some("abc"));
        assert_eq!(def.field("missing"), None);
    }

    #[test]
    fn test_debug_redacts_fields() {
        let def = sample();
        let debug = format!("{:?}", def);
        assert!(!debug.contains("abc"));
        assert!(debug.contains("box1"));
    }
}
