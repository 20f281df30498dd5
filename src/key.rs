use derive_more::Display;
use serde::Serialize;
use thiserror::Error;

/// Canonical identity of one logical call, derived from its description.
///
/// The key is the canonical serialized text of the description, so two
/// descriptions that serialize identically are the same call.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub struct CallKey(String);

#[derive(Debug, Error)]
pub enum KeyError {
    /// The description has no canonical serialized form, e.g. a map with
    /// non-string keys.
    #[error("description has no canonical key: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CallKey {
    pub fn derive<D: Serialize + ?Sized>(description: &D) -> Result<Self, KeyError> {
        Ok(Self(serde_json::to_string(description)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::CallKey;

    #[derive(Serialize)]
    struct Request<'a> {
        url: &'a str,
    }

    #[test]
    fn equal_descriptions_share_a_key() {
        let a = CallKey::derive(&Request { url: "/a" }).expect("Failed to derive key");
        let b = CallKey::derive(&Request { url: "/a" }).expect("Failed to derive key");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_descriptions_get_distinct_keys() {
        let a = CallKey::derive(&Request { url: "/a" }).expect("Failed to derive key");
        let b = CallKey::derive(&Request { url: "/b" }).expect("Failed to derive key");
        assert_ne!(a, b);
    }

    #[test]
    fn key_is_the_canonical_serialized_text() {
        let key = CallKey::derive(&Request { url: "/a" }).expect("Failed to derive key");
        assert_eq!(key.as_str(), r#"{"url":"/a"}"#);
    }

    #[test]
    fn non_string_map_keys_have_no_canonical_form() {
        let description = BTreeMap::from([((1u8, 2u8), 3u8)]);
        CallKey::derive(&description).expect_err("Tuple map keys should not serialize");
    }
}
