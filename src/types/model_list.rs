use serde::{Deserialize, Serialize};

/// One entry of the server's model catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier, e.g. `gemma3:1b`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Owner reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,

    /// Unix timestamp of the model's creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

/// Response from `GET /v1/models`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    /// Models installed on the server.
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

impl ModelList {
    /// The model identifiers, in server order.
    ///
    /// Entries without an identifier are skipped.
    pub fn ids(&self) -> Vec<String> {
        self.data.iter().filter_map(|model| model.id.clone()).collect()
    }
}

/// Result of a successful connectivity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStatus {
    /// HTTP status code the server answered with.
    pub status_code: u16,
}

impl std::fmt::Display for HostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reachable: HTTP {}", self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_openai_style_listing() {
        let json = r#"{
            "object": "list",
            "data": [
                {"id": "gemma3:4b", "object": "model", "created": 1700000000, "owned_by": "library"},
                {"id": "gemma3:1b", "object": "model", "created": 1700000001, "owned_by": "library"}
            ]
        }"#;
        let list: ModelList = serde_json::from_str(json).unwrap();
        assert_eq!(list.ids(), vec!["gemma3:4b", "gemma3:1b"]);
    }

    #[test]
    fn entries_without_id_are_skipped() {
        let json = r#"{"data":[{"id":"gemma3:1b"},{"object":"model"}]}"#;
        let list: ModelList = serde_json::from_str(json).unwrap();
        assert_eq!(list.data.len(), 2);
        assert_eq!(list.data[1].id, None);
        assert_eq!(list.ids(), vec!["gemma3:1b"]);
    }

    #[test]
    fn missing_data_is_empty() {
        let list: ModelList = serde_json::from_str("{}").unwrap();
        assert!(list.ids().is_empty());
    }

    #[test]
    fn host_status_display() {
        assert_eq!(
            HostStatus { status_code: 200 }.to_string(),
            "Reachable: HTTP 200"
        );
    }
}
