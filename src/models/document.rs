use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::step::Step;
use super::wish::WishItem;

/// The single shared document every participant reads and writes.
///
/// Field names follow the JSON already stored by earlier clients, so a
/// document written by either side round-trips without loss. Optional maps
/// are omitted when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    /// participant -> names that participant may pick
    #[serde(default)]
    pub names: BTreeMap<String, Vec<String>>,
    /// picked name -> participant who picked it
    #[serde(default)]
    pub taken: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub forbidden: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub passwords: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub wish_lists: BTreeMap<String, Vec<WishItem>>,
    /// Legacy free-text wishes, one string per participant.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gifts: BTreeMap<String, String>,
    /// Legacy per-participant lists, kept as opaque JSON.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub wishes: BTreeMap<String, Vec<serde_json::Value>>,
}

impl ExchangeDocument {
    /// Returns true if `participant` is part of the exchange.
    pub fn has_participant(&self, participant: &str) -> bool {
        self.names.contains_key(participant)
    }

    /// Participants in document order.
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn forbidden_for(&self, participant: &str) -> &[String] {
        self.forbidden
            .get(participant)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn eligible_for(&self, participant: &str) -> &[String] {
        self.names.get(participant).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    #[test]
    fn test_parse_document_written_by_web_client() {
        let json = r#"{
            "step": "selection",
            "names": { "Alice": ["Bob", "Carol"], "Bob": ["Alice", "Carol"], "Carol": ["Alice", "Bob"] },
            "taken": { "Bob": "Alice" },
            "forbidden": { "Alice": ["Dave"] },
            "passwords": { "Alice": "abc" },
            "wishLists": {
                "Alice": [{
                    "id": "1700000000000",
                    "description": "Scarf",
                    "priority": "high",
                    "createdAt": 1700000000000,
                    "updatedAt": 1700000000000,
                    "purchasedBy": "Carol",
                    "purchaseDate": 1700000001000
                }]
            },
            "wishes": { "Alice": [] }
        }"#;

        let doc: ExchangeDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.step, Some(Step::Selection));
        assert_eq!(doc.eligible_for("Alice"), ["Bob", "Carol"]);
        assert_eq!(doc.taken.get("Bob").map(String::as_str), Some("Alice"));
        assert_eq!(doc.forbidden_for("Alice"), ["Dave"]);
        assert!(doc.forbidden_for("Bob").is_empty());

        let item = &doc.wish_lists["Alice"][0];
        assert_eq!(item.priority, Priority::High);
        assert_eq!(item.purchased_by(), Some("Carol"));
    }

    #[test]
    fn test_minimal_document_defaults() {
        let doc: ExchangeDocument = serde_json::from_str(r#"{"names": {}, "taken": {}}"#).unwrap();
        assert_eq!(doc, ExchangeDocument::default());
    }

    #[test]
    fn test_empty_optional_maps_are_omitted() {
        let value = serde_json::to_value(ExchangeDocument::default()).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("names"));
        assert!(object.contains_key("taken"));
        assert!(!object.contains_key("wishLists"));
        assert!(!object.contains_key("passwords"));
        assert!(!object.contains_key("step"));
    }

    #[test]
    fn test_participant_queries() {
        let mut doc = ExchangeDocument::default();
        doc.names.insert("Bob".into(), vec!["Alice".into()]);
        doc.names.insert("Alice".into(), vec!["Bob".into()]);
        doc.taken.insert("Bob".into(), "Alice".into());

        assert!(doc.has_participant("Alice"));
        assert!(!doc.has_participant("Zed"));
        assert_eq!(doc.participants().collect::<Vec<_>>(), ["Alice", "Bob"]);
        assert!(doc.is_taken("Bob"));
        assert!(!doc.is_taken("Alice"));
        assert!(doc.eligible_for("Zed").is_empty());
    }
}
