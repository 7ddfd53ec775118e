//! Per-type block metadata
//!
//! The backend stores `meta_json` as an opaque JSON string. Persisted data is
//! not trusted: anything that fails to parse degrades to an empty `BlockMeta`
//! rather than an error, and keys this client does not know about survive a
//! read-modify-write cycle through `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Horizontal text alignment set from the floating toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Typed view over `meta_json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Todo checkbox state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,

    /// Code block language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,

    /// CSS color applied to the whole block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Table cells, row-major
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<String>>>,

    /// Agent referenced by an agent-embed block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// Keys written by other clients
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BlockMeta {
    /// Parse a persisted `meta_json` string, falling back to empty metadata
    ///
    /// # Examples
    ///
    /// ```rust
    /// use agentboard_core::models::BlockMeta;
    ///
    /// let meta = BlockMeta::parse(Some(r#"{"checked":true}"#));
    /// assert!(meta.is_checked());
    ///
    /// // Corrupted data never fails the load
    /// let meta = BlockMeta::parse(Some("{not json"));
    /// assert_eq!(meta, BlockMeta::default());
    /// ```
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Self::default();
        };

        match serde_json::from_str::<Self>(raw) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("Discarding malformed meta_json ({}): {}", e, raw);
                Self::default()
            }
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::String(raw) => Self::parse(Some(&raw)),
            other => serde_json::from_value(other).unwrap_or_else(|e| {
                tracing::warn!("Discarding malformed meta_json object: {}", e);
                Self::default()
            }),
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn is_checked(&self) -> bool {
        self.checked.unwrap_or(false)
    }
}

/// Serde adapter storing `BlockMeta` as a JSON-encoded string
pub(crate) mod as_json_string {
    use super::BlockMeta;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(meta: &BlockMeta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&meta.to_json_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BlockMeta, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.map(BlockMeta::from_value).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_empty_inputs() {
        assert_eq!(BlockMeta::parse(None), BlockMeta::default());
        assert_eq!(BlockMeta::parse(Some("")), BlockMeta::default());
        assert_eq!(BlockMeta::parse(Some("   ")), BlockMeta::default());
    }

    #[test]
    fn test_parse_typed_fields() {
        let meta = BlockMeta::parse(Some(
            r#"{"language":"rust","align":"center","rows":[["a","b"]]}"#,
        ));
        assert_eq!(meta.language.as_deref(), Some("rust"));
        assert_eq!(meta.align, Some(TextAlign::Center));
        assert_eq!(meta.rows, Some(vec![vec!["a".to_string(), "b".to_string()]]));
    }

    #[test]
    fn test_wrong_field_type_falls_back() {
        let meta = BlockMeta::parse(Some(r#"{"checked":"yes"}"#));
        assert_eq!(meta, BlockMeta::default());
    }

    #[test]
    fn test_unknown_keys_survive() {
        let meta = BlockMeta::parse(Some(r#"{"checked":false,"emoji":"🚀"}"#));
        assert_eq!(meta.extra.get("emoji"), Some(&json!("🚀")));

        let reparsed = BlockMeta::parse(Some(&meta.to_json_string()));
        assert_eq!(reparsed, meta);
    }

    #[test]
    fn test_deserialize_accepts_string_object_and_null() {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default, with = "as_json_string")]
            meta_json: BlockMeta,
        }

        let from_string: Wire = serde_json::from_value(json!({
            "meta_json": "{\"checked\":true}"
        }))
        .unwrap();
        assert!(from_string.meta_json.is_checked());

        let from_object: Wire = serde_json::from_value(json!({
            "meta_json": { "color": "red" }
        }))
        .unwrap();
        assert_eq!(from_object.meta_json.color.as_deref(), Some("red"));

        let from_null: Wire = serde_json::from_value(json!({ "meta_json": null })).unwrap();
        assert_eq!(from_null.meta_json, BlockMeta::default());

        let missing: Wire = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.meta_json, BlockMeta::default());
    }
}
