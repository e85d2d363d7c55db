use serde::{Deserialize, Serialize};

// ========== COMMENT ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: String,
    pub commented_by: String,
    pub commented_on: String, // "%Y-%m-%d %H:%M:%S" in the configured zone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_tamil: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_english: Option<String>,
}

/// Body of `POST /comments`. Every field is optional here so that a missing
/// field surfaces as a 400 with a readable description instead of a serde error.
#[derive(Debug, Deserialize, Default)]
pub struct AddCommentRequest {
    pub document_id: Option<String>,
    pub comment: Option<String>,
    pub comment_en: Option<String>,
    pub comment_tn: Option<String>,
    pub commented_by: Option<String>,
}

// ========== PLAYER LEARNING ==========
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerLearning {
    pub document_id: String,
    #[serde(rename = "playerId")]
    pub player_id: String,
    #[serde(rename = "pathwayId")]
    pub pathway_id: String,
    pub status: String,
    pub comments: Vec<CommentRecord>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Body of `POST /pathway-status`.
#[derive(Debug, Deserialize, Default)]
pub struct SetStatusRequest {
    #[serde(rename = "playerId")]
    pub player_id: Option<String>,
    #[serde(rename = "pathwayId")]
    pub pathway_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Created,
    Updated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_record_omits_absent_text_fields() {
        let record = CommentRecord {
            id: "c1".to_string(),
            commented_by: "coach1".to_string(),
            commented_on: "2024-05-01 10:00:00".to_string(),
            text_original: None,
            text_tamil: None,
            text_english: Some("Hello".to_string()),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["commentedBy"], "coach1");
        assert_eq!(json["textEnglish"], "Hello");
        assert!(json.get("textTamil").is_none());
        assert!(json.get("textOriginal").is_none());
    }

    #[test]
    fn test_set_status_request_uses_camel_case_keys() {
        let req: SetStatusRequest = serde_json::from_value(serde_json::json!({
            "playerId": "p1",
            "pathwayId": "path1",
            "status": "in_progress"
        }))
        .unwrap();
        assert_eq!(req.player_id.as_deref(), Some("p1"));
        assert_eq!(req.pathway_id.as_deref(), Some("path1"));
        assert_eq!(req.status.as_deref(), Some("in_progress"));
    }
}
