use serde::{Deserialize, Serialize};

/// Interface id every viewer manifest must declare
pub const VIEWER_INTERFACE_ID: &str = "io.docview.ViewerInterface";

/// Major API version this build understands
pub const PLUGIN_API_VERSION: u32 = 1;

pub const FEATURE_VIEW: &str = "view";
pub const FEATURE_OVERVIEW: &str = "overview";
pub const FEATURE_PRINT: &str = "print";

/// Plugin manifest as stored in `*.json` files.
///
/// Unknown fields are ignored so newer manifests keep loading on older hosts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub iid: String,
    pub api_version: String,
    /// Name of the compiled viewer factory this manifest binds to
    pub entry: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub mime_types: Vec<String>,
    #[serde(default)]
    pub file_extensions: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl PluginMetadata {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Major component of `api_version` ("1.2" -> 1)
    pub fn api_major(&self) -> Option<u32> {
        self.api_version.trim().split('.').next()?.parse().ok()
    }

    pub fn has_feature(&self, tag: &str) -> bool {
        self.features.iter().any(|f| f.eq_ignore_ascii_case(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{
            "iid": "io.docview.ViewerInterface",
            "api_version": "1.3",
            "entry": "text",
            "name": "Text",
            "mime_types": ["text/plain"],
            "homepage": "https://example.invalid"
        }"#;
        let metadata = PluginMetadata::from_json(json).unwrap();
        assert_eq!(metadata.name, "Text");
        assert_eq!(metadata.api_major(), Some(1));
        assert!(metadata.features.is_empty());
        assert!(metadata.description.is_empty());
    }

    #[test]
    fn missing_required_fields_fail() {
        assert!(PluginMetadata::from_json(r#"{"name": "Text"}"#).is_err());
    }

    #[test]
    fn api_major_rejects_garbage() {
        let mut metadata =
            PluginMetadata::from_json(include_str!("../../plugins/text.json")).unwrap();
        metadata.api_version = "one".into();
        assert_eq!(metadata.api_major(), None);
    }
}
