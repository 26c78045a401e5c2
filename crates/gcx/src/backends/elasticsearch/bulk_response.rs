use std::collections::HashMap;

use serde::Deserialize;

/// 📬 What `/_bulk` says back. One entry per action line, in request order.
///
/// Each entry is a single-key map: `{"index": {...}}`. The key is the action name,
/// and we only ever send `index`, so the key is mostly decorative.
#[derive(Debug, Deserialize, Default)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkResponseItem>>,
}

impl BulkResponse {
    /// 🔪 Peel the action-name wrapper off each entry. Position `i` is item `i` of the
    /// request; an entry with no item inside stays a `None` so positions never shift.
    pub fn into_items(self) -> Vec<Option<BulkResponseItem>> {
        self.items
            .into_iter()
            .map(|entry| entry.into_values().next())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct BulkResponseItem {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub document_id: String,
    #[serde(default)]
    pub result: String,
    pub status: u16,
    #[serde(default)]
    pub error: Option<BulkItemError>,
}

impl BulkResponseItem {
    /// ✅ 200 (updated) and 201 (created) are the only happy endings, and only
    /// when no error type rode along with them.
    pub fn succeeded(&self) -> bool {
        self.status <= 201 && self.error.as_ref().is_none_or(|error| error.kind.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_a_mixed_verdict_keeps_its_positions() -> anyhow::Result<()> {
        let the_body = r#"{
            "took": 7,
            "errors": true,
            "items": [
                {"index": {"_index": "address", "_id": "a1", "status": 201, "result": "created"}},
                {"index": {"_index": "address", "_id": "a2", "status": 400,
                           "error": {"type": "mapper_parsing_exception", "reason": "failed to parse field [lat_long]"}}},
                {}
            ]
        }"#;
        let the_items = serde_json::from_str::<BulkResponse>(the_body)?.into_items();

        assert_eq!(the_items.len(), 3);
        let the_first = the_items[0].as_ref().expect("first item present");
        assert!(the_first.succeeded());
        assert_eq!(the_first.document_id, "a1");

        let the_second = the_items[1].as_ref().expect("second item present");
        assert!(!the_second.succeeded());
        let the_error = the_second.error.as_ref().expect("rejection carries an error");
        assert_eq!(the_error.kind, "mapper_parsing_exception");
        assert_eq!(the_error.reason, "failed to parse field [lat_long]");

        assert!(the_items[2].is_none());
        Ok(())
    }

    #[test]
    fn the_one_where_a_201_with_an_error_type_is_still_a_failure() {
        let the_item = BulkResponseItem {
            status: 201,
            error: Some(BulkItemError {
                kind: "version_conflict_engine_exception".into(),
                reason: "document already exists".into(),
            }),
            ..Default::default()
        };
        assert!(!the_item.succeeded());

        let the_blank_error = BulkResponseItem {
            status: 200,
            error: Some(BulkItemError::default()),
            ..Default::default()
        };
        assert!(the_blank_error.succeeded(), "an empty error type is no error");
    }

    #[test]
    fn the_one_where_a_409_is_not_a_success() {
        let the_item = BulkResponseItem {
            status: 409,
            ..Default::default()
        };
        assert!(!the_item.succeeded());
        assert!(BulkResponseItem { status: 200, ..Default::default() }.succeeded());
    }
}
