use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::types::{CommentRecord, PlayerLearning};

/// Result of inserting a new player learning document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A document for the same (playerId, pathwayId) already exists.
    Duplicate,
}

/// Persistence used by the comment and pathway-status operations.
///
/// Every mutating method is a single atomic store operation. Implementations
/// must enforce at most one document per (playerId, pathwayId) in
/// `insert_player_learning`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Push `comment` onto the document's comment list.
    /// Returns `false` when no document has that id.
    async fn push_comment(
        &self,
        document_id: &str,
        comment: &CommentRecord,
    ) -> Result<bool, StoreError>;

    async fn find_player_learning(
        &self,
        player_id: &str,
        pathway_id: &str,
    ) -> Result<Option<PlayerLearning>, StoreError>;

    async fn get_player_learning(
        &self,
        document_id: &str,
    ) -> Result<Option<PlayerLearning>, StoreError>;

    /// Overwrite the status of an existing document.
    /// Returns `false` when no document has that id.
    async fn update_status(
        &self,
        document_id: &str,
        status: &str,
        updated_at: &str,
    ) -> Result<bool, StoreError>;

    async fn pathway_exists(&self, pathway_id: &str) -> Result<bool, StoreError>;

    async fn insert_player_learning(
        &self,
        document: &PlayerLearning,
    ) -> Result<InsertOutcome, StoreError>;
}

#[derive(Default)]
struct MemoryTables {
    documents: HashMap<String, PlayerLearning>,
    // (playerId, pathwayId) -> document_id
    pairs: HashMap<(String, String), String>,
    pathways: HashSet<String>,
}

/// In-process `DocumentStore`. Each operation runs under one lock, which
/// gives the same atomicity as the conditional writes in DynamoDB.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pathways<I, S>(pathways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for pathway in pathways {
            store.add_pathway(pathway);
        }
        store
    }

    pub fn add_pathway(&self, pathway_id: impl Into<String>) {
        self.lock().pathways.insert(pathway_id.into());
    }

    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryTables> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn push_comment(
        &self,
        document_id: &str,
        comment: &CommentRecord,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.documents.get_mut(document_id) {
            Some(document) => {
                document.comments.push(comment.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_player_learning(
        &self,
        player_id: &str,
        pathway_id: &str,
    ) -> Result<Option<PlayerLearning>, StoreError> {
        let tables = self.lock();
        Ok(tables
            .pairs
            .get(&(player_id.to_string(), pathway_id.to_string()))
            .and_then(|document_id| tables.documents.get(document_id))
            .cloned())
    }

    async fn get_player_learning(
        &self,
        document_id: &str,
    ) -> Result<Option<PlayerLearning>, StoreError> {
        Ok(self.lock().documents.get(document_id).cloned())
    }

    async fn update_status(
        &self,
        document_id: &str,
        status: &str,
        updated_at: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.documents.get_mut(document_id) {
            Some(document) => {
                document.status = status.to_string();
                document.updated_at = Some(updated_at.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn pathway_exists(&self, pathway_id: &str) -> Result<bool, StoreError> {
        Ok(self.lock().pathways.contains(pathway_id))
    }

    async fn insert_player_learning(
        &self,
        document: &PlayerLearning,
    ) -> Result<InsertOutcome, StoreError> {
        let mut tables = self.lock();
        let pair = (document.player_id.clone(), document.pathway_id.clone());
        if tables.pairs.contains_key(&pair) {
            return Ok(InsertOutcome::Duplicate);
        }
        tables.pairs.insert(pair, document.document_id.clone());
        tables
            .documents
            .insert(document.document_id.clone(), document.clone());
        Ok(InsertOutcome::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(id: &str, player_id: &str, pathway_id: &str) -> PlayerLearning {
        PlayerLearning {
            document_id: id.to_string(),
            player_id: player_id.to_string(),
            pathway_id: pathway_id.to_string(),
            status: "not_started".to_string(),
            comments: vec![],
            created_at: "2024-05-01T10:00:00Z".to_string(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_enforces_unique_pair() {
        let store = MemoryStore::new();
        assert_eq!(
            store.insert_player_learning(&document("d1", "p1", "path1")).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_player_learning(&document("d2", "p1", "path1")).await.unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(
            store.insert_player_learning(&document("d3", "p1", "path2")).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(store.document_count(), 2);

        let found = store.find_player_learning("p1", "path1").await.unwrap().unwrap();
        assert_eq!(found.document_id, "d1");
    }

    #[tokio::test]
    async fn test_push_comment_on_missing_document() {
        let store = MemoryStore::new();
        let comment = CommentRecord {
            id: "c1".to_string(),
            commented_by: "coach1".to_string(),
            commented_on: "2024-05-01 15:30:00".to_string(),
            text_original: None,
            text_tamil: None,
            text_english: Some("Hello".to_string()),
        };
        assert!(!store.push_comment("missing", &comment).await.unwrap());
        assert_eq!(store.document_count(), 0);
    }
}
