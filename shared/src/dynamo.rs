use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{DisplayErrorContext, SdkError},
    operation::transact_write_items::TransactWriteItemsError,
    types::{AttributeValue, CancellationReason, Put, TransactWriteItem},
    Client as DynamoClient,
};
use std::collections::HashMap;

use crate::error::StoreError;
use crate::store::{DocumentStore, InsertOutcome};
use crate::types::{CommentRecord, PlayerLearning};

/// `DocumentStore` backed by a single DynamoDB table.
///
/// Layout:
/// - `PLAYER_LEARNING#<id>` / same: the player learning document
/// - `PLAYER#<playerId>` / `PATHWAY#<pathwayId>`: uniqueness guard pointing at the document
/// - `PATHWAY#<pathwayId>` / same: learning pathway, owned by another service
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

fn document_key(document_id: &str) -> String {
    format!("PLAYER_LEARNING#{}", document_id)
}

fn pair_keys(player_id: &str, pathway_id: &str) -> (String, String) {
    (
        format!("PLAYER#{}", player_id),
        format!("PATHWAY#{}", pathway_id),
    )
}

fn pathway_key(pathway_id: &str) -> String {
    format!("PATHWAY#{}", pathway_id)
}

fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            StoreError::Unavailable(DisplayErrorContext(&err).to_string())
        }
        _ => StoreError::Backend(DisplayErrorContext(&err).to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CanceledInsert {
    /// The pair guard already exists.
    GuardTaken,
    /// Another transaction touched the same items. Safe to retry.
    Conflict,
    Other,
}

/// Reasons are positional: the guard put is the first item of the transaction.
fn canceled_insert(reasons: &[CancellationReason]) -> CanceledInsert {
    if reasons.first().and_then(|r| r.code()) == Some("ConditionalCheckFailed") {
        return CanceledInsert::GuardTaken;
    }
    if reasons
        .iter()
        .any(|r| r.code() == Some("TransactionConflict"))
    {
        return CanceledInsert::Conflict;
    }
    CanceledInsert::Other
}

fn get_s(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

fn require_s(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String, StoreError> {
    get_s(item, name).ok_or_else(|| StoreError::Malformed(format!("missing attribute {}", name)))
}

pub(crate) fn comment_to_item(comment: &CommentRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("id".to_string(), AttributeValue::S(comment.id.clone()));
    item.insert(
        "commentedBy".to_string(),
        AttributeValue::S(comment.commented_by.clone()),
    );
    item.insert(
        "commentedOn".to_string(),
        AttributeValue::S(comment.commented_on.clone()),
    );
    if let Some(text) = &comment.text_original {
        item.insert("textOriginal".to_string(), AttributeValue::S(text.clone()));
    }
    if let Some(text) = &comment.text_tamil {
        item.insert("textTamil".to_string(), AttributeValue::S(text.clone()));
    }
    if let Some(text) = &comment.text_english {
        item.insert("textEnglish".to_string(), AttributeValue::S(text.clone()));
    }
    item
}

pub(crate) fn comment_from_item(
    item: &HashMap<String, AttributeValue>,
) -> Result<CommentRecord, StoreError> {
    Ok(CommentRecord {
        id: require_s(item, "id")?,
        commented_by: require_s(item, "commentedBy")?,
        commented_on: require_s(item, "commentedOn")?,
        text_original: get_s(item, "textOriginal"),
        text_tamil: get_s(item, "textTamil"),
        text_english: get_s(item, "textEnglish"),
    })
}

fn document_from_item(
    item: &HashMap<String, AttributeValue>,
) -> Result<PlayerLearning, StoreError> {
    let comments = match item.get("comments").and_then(|v| v.as_l().ok()) {
        Some(list) => list
            .iter()
            .filter_map(|v| v.as_m().ok())
            .map(comment_from_item)
            .collect::<Result<Vec<_>, _>>()?,
        None => vec![],
    };

    Ok(PlayerLearning {
        document_id: require_s(item, "document_id")?,
        player_id: require_s(item, "playerId")?,
        pathway_id: require_s(item, "pathwayId")?,
        status: get_s(item, "status").unwrap_or_default(),
        comments,
        created_at: get_s(item, "created_at").unwrap_or_default(),
        updated_at: get_s(item, "updated_at"),
    })
}

#[async_trait]
impl DocumentStore for DynamoStore {
    async fn push_comment(
        &self,
        document_id: &str,
        comment: &CommentRecord,
    ) -> Result<bool, StoreError> {
        let pk = document_key(document_id);

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .update_expression("SET comments = list_append(if_not_exists(comments, :empty), :new)")
            .condition_expression("attribute_exists(PK)")
            .expression_attribute_values(":empty", AttributeValue::L(vec![]))
            .expression_attribute_values(
                ":new",
                AttributeValue::L(vec![AttributeValue::M(comment_to_item(comment))]),
            )
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                Ok(false)
            }
            Err(err) => Err(classify_sdk_error(err)),
        }
    }

    async fn find_player_learning(
        &self,
        player_id: &str,
        pathway_id: &str,
    ) -> Result<Option<PlayerLearning>, StoreError> {
        let (pk, sk) = pair_keys(player_id, pathway_id);

        let guard = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .consistent_read(true)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        match guard.item() {
            Some(item) => {
                let document_id = require_s(item, "document_id")?;
                self.get_player_learning(&document_id).await
            }
            None => Ok(None),
        }
    }

    async fn get_player_learning(
        &self,
        document_id: &str,
    ) -> Result<Option<PlayerLearning>, StoreError> {
        let pk = document_key(document_id);

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .consistent_read(true)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        result.item().map(document_from_item).transpose()
    }

    async fn update_status(
        &self,
        document_id: &str,
        status: &str,
        updated_at: &str,
    ) -> Result<bool, StoreError> {
        let pk = document_key(document_id);

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .update_expression("SET #status = :status, updated_at = :updated_at")
            .condition_expression("attribute_exists(PK)")
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":status", AttributeValue::S(status.to_string()))
            .expression_attribute_values(":updated_at", AttributeValue::S(updated_at.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                Ok(false)
            }
            Err(err) => Err(classify_sdk_error(err)),
        }
    }

    async fn pathway_exists(&self, pathway_id: &str) -> Result<bool, StoreError> {
        let pk = pathway_key(pathway_id);

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .projection_expression("PK")
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(result.item().is_some())
    }

    async fn insert_player_learning(
        &self,
        document: &PlayerLearning,
    ) -> Result<InsertOutcome, StoreError> {
        let (guard_pk, guard_sk) = pair_keys(&document.player_id, &document.pathway_id);
        let doc_pk = document_key(&document.document_id);

        let guard = Put::builder()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(guard_pk))
            .item("SK", AttributeValue::S(guard_sk))
            .item("document_id", AttributeValue::S(document.document_id.clone()))
            .condition_expression("attribute_not_exists(PK)")
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut doc = Put::builder()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(doc_pk.clone()))
            .item("SK", AttributeValue::S(doc_pk))
            .item("document_id", AttributeValue::S(document.document_id.clone()))
            .item("playerId", AttributeValue::S(document.player_id.clone()))
            .item("pathwayId", AttributeValue::S(document.pathway_id.clone()))
            .item("status", AttributeValue::S(document.status.clone()))
            .item(
                "comments",
                AttributeValue::L(
                    document
                        .comments
                        .iter()
                        .map(|c| AttributeValue::M(comment_to_item(c)))
                        .collect(),
                ),
            )
            .item("created_at", AttributeValue::S(document.created_at.clone()))
            .condition_expression("attribute_not_exists(PK)");
        if let Some(updated_at) = &document.updated_at {
            doc = doc.item("updated_at", AttributeValue::S(updated_at.clone()));
        }
        let doc = doc.build().map_err(|e| StoreError::Backend(e.to_string()))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(guard).build())
            .transact_items(TransactWriteItem::builder().put(doc).build())
            .send()
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) => {
                let canceled = match err.as_service_error() {
                    Some(TransactWriteItemsError::TransactionCanceledException(canceled)) => {
                        canceled_insert(canceled.cancellation_reasons())
                    }
                    _ => CanceledInsert::Other,
                };

                match canceled {
                    CanceledInsert::GuardTaken => {
                        tracing::info!(
                            "player {} already has a document for pathway {}",
                            document.player_id,
                            document.pathway_id
                        );
                        Ok(InsertOutcome::Duplicate)
                    }
                    CanceledInsert::Conflict => {
                        tracing::warn!(
                            "insert for player {} in pathway {} conflicted with another transaction",
                            document.player_id,
                            document.pathway_id
                        );
                        Err(StoreError::Unavailable(DisplayErrorContext(&err).to_string()))
                    }
                    CanceledInsert::Other => Err(classify_sdk_error(err)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_item_keeps_only_present_text_fields() {
        let comment = CommentRecord {
            id: "c1".to_string(),
            commented_by: "coach1".to_string(),
            commented_on: "2024-05-01 15:30:00".to_string(),
            text_original: Some("நல்ல முயற்சி".to_string()),
            text_tamil: Some("நல்ல முயற்சி".to_string()),
            text_english: None,
        };

        let item = comment_to_item(&comment);
        assert!(item.contains_key("textTamil"));
        assert!(!item.contains_key("textEnglish"));
        assert_eq!(comment_from_item(&item).unwrap(), comment);
    }

    #[test]
    fn test_document_from_item_rejects_missing_keys() {
        let mut item = HashMap::new();
        item.insert("document_id".to_string(), AttributeValue::S("d1".to_string()));
        item.insert("playerId".to_string(), AttributeValue::S("p1".to_string()));
        assert!(matches!(
            document_from_item(&item),
            Err(StoreError::Malformed(_))
        ));

        item.insert("pathwayId".to_string(), AttributeValue::S("path1".to_string()));
        item.insert("status".to_string(), AttributeValue::S("done".to_string()));
        let document = document_from_item(&item).unwrap();
        assert!(document.comments.is_empty());
        assert_eq!(document.status, "done");
    }

    fn reason(code: &str) -> CancellationReason {
        CancellationReason::builder().code(code).build()
    }

    #[test]
    fn test_canceled_insert_reasons() {
        assert_eq!(
            canceled_insert(&[reason("ConditionalCheckFailed"), reason("None")]),
            CanceledInsert::GuardTaken
        );
        assert_eq!(
            canceled_insert(&[reason("TransactionConflict"), reason("None")]),
            CanceledInsert::Conflict
        );
        assert_eq!(
            canceled_insert(&[reason("None"), reason("TransactionConflict")]),
            CanceledInsert::Conflict
        );
        // Document put failing its own condition is not a taken pair
        assert_eq!(
            canceled_insert(&[reason("None"), reason("ConditionalCheckFailed")]),
            CanceledInsert::Other
        );
        assert_eq!(canceled_insert(&[]), CanceledInsert::Other);
    }

    #[test]
    fn test_keys() {
        assert_eq!(document_key("abc"), "PLAYER_LEARNING#abc");
        assert_eq!(
            pair_keys("p1", "path1"),
            ("PLAYER#p1".to_string(), "PATHWAY#path1".to_string())
        );
        assert_eq!(pathway_key("path1"), "PATHWAY#path1");
    }
}
