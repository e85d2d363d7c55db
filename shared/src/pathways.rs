use crate::error::ApiError;
use crate::store::InsertOutcome;
use crate::types::{PlayerLearning, SetStatusRequest, StatusOutcome};
use crate::AppState;

const MAX_ID_LEN: usize = 128;

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::missing_field(field))
}

/// Ids end up inside store keys, so keep them to a plain character set.
fn valid_id(value: &str) -> bool {
    value.len() <= MAX_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

fn validated_id(value: Option<String>, field: &str) -> Result<String, ApiError> {
    let id = required(value, field)?;
    if !valid_id(&id) {
        return Err(ApiError::Validation(format!("Invalid {}: {}", field, id)));
    }
    Ok(id)
}

fn updated(player_id: &str, pathway_id: &str) -> (StatusOutcome, String) {
    (
        StatusOutcome::Updated,
        format!(
            "Updated status for player {} in pathway {}.",
            player_id, pathway_id
        ),
    )
}

/// Set the status of a player in a learning pathway, creating the player
/// learning document on first use.
///
/// Returns the outcome together with the user-facing message.
pub async fn set_status(
    state: &AppState,
    req: SetStatusRequest,
) -> Result<(StatusOutcome, String), ApiError> {
    let player_id = validated_id(req.player_id, "playerId")?;
    let pathway_id = validated_id(req.pathway_id, "pathwayId")?;
    let status = required(req.status, "status")?;
    let now = chrono::Utc::now().to_rfc3339();

    if let Some(existing) = state
        .store
        .find_player_learning(&player_id, &pathway_id)
        .await?
    {
        if state
            .store
            .update_status(&existing.document_id, &status, &now)
            .await?
        {
            tracing::info!("Updated status of document {}", existing.document_id);
            return Ok(updated(&player_id, &pathway_id));
        }
        tracing::warn!(
            "document {} vanished before its status could be updated",
            existing.document_id
        );
    }

    if !state.store.pathway_exists(&pathway_id).await? {
        return Err(ApiError::NotFound(format!(
            "Pathway with id {} does not exist in Learning Pathway collection.",
            pathway_id
        )));
    }

    let document = PlayerLearning {
        document_id: uuid::Uuid::new_v4().to_string(),
        player_id: player_id.clone(),
        pathway_id: pathway_id.clone(),
        status: status.clone(),
        comments: vec![],
        created_at: now.clone(),
        updated_at: None,
    };

    match state.store.insert_player_learning(&document).await? {
        InsertOutcome::Inserted => {
            tracing::info!("Created document {}", document.document_id);
            Ok((
                StatusOutcome::Created,
                format!(
                    "Created new document for player {} in pathway {}.",
                    player_id, pathway_id
                ),
            ))
        }
        InsertOutcome::Duplicate => {
            // Lost a race with a concurrent first-time set; apply ours to the winner.
            let winner = state
                .store
                .find_player_learning(&player_id, &pathway_id)
                .await?
                .ok_or_else(|| {
                    ApiError::Internal("Failed to resolve existing document.".to_string())
                })?;
            if !state
                .store
                .update_status(&winner.document_id, &status, &now)
                .await?
            {
                return Err(ApiError::Internal(
                    "Failed to resolve existing document.".to_string(),
                ));
            }
            Ok(updated(&player_id, &pathway_id))
        }
    }
}

/// Fetch one player learning document by id.
pub async fn get_player_learning(
    state: &AppState,
    document_id: &str,
) -> Result<PlayerLearning, ApiError> {
    if uuid::Uuid::parse_str(document_id).is_err() {
        return Err(ApiError::Validation(format!(
            "Invalid document_id: {}",
            document_id
        )));
    }

    state
        .store
        .get_player_learning(document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No document found with the provided ID.".to_string()))
}
