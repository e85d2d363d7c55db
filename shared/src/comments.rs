use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::ApiError;
use crate::language::{split_bilingual, Language};
use crate::types::{AddCommentRequest, CommentRecord};
use crate::AppState;

const COMMENTED_ON_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text of a comment after validation, before any language handling.
#[derive(Debug, Clone, PartialEq)]
enum CommentText {
    /// Free text whose language still has to be classified.
    Detect(String),
    /// The caller said which language each part is in.
    Explicit {
        tamil: Option<String>,
        english: Option<String>,
    },
}

#[derive(Debug, Default, PartialEq)]
struct CommentFields {
    text_original: Option<String>,
    text_tamil: Option<String>,
    text_english: Option<String>,
}

#[derive(Debug)]
struct ValidComment {
    document_id: String,
    commented_by: String,
    text: CommentText,
}

fn non_blank_id(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Comment text is stored exactly as sent; whitespace only decides blankness.
fn non_blank_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate(req: AddCommentRequest) -> Result<ValidComment, ApiError> {
    let document_id =
        non_blank_id(req.document_id).ok_or_else(|| ApiError::missing_field("document_id"))?;
    let commented_by =
        non_blank_id(req.commented_by).ok_or_else(|| ApiError::missing_field("commented_by"))?;

    if uuid::Uuid::parse_str(&document_id).is_err() {
        return Err(ApiError::Validation(format!(
            "Invalid document_id: {}",
            document_id
        )));
    }

    let tamil = non_blank_text(req.comment_tn);
    let english = non_blank_text(req.comment_en);
    let text = if tamil.is_some() || english.is_some() {
        CommentText::Explicit { tamil, english }
    } else {
        let comment = non_blank_text(req.comment).ok_or_else(|| {
            ApiError::Validation(
                "Missing required field: one of comment, comment_en or comment_tn".to_string(),
            )
        })?;
        CommentText::Detect(comment)
    };

    Ok(ValidComment {
        document_id,
        commented_by,
        text,
    })
}

/// Current time in `tz`, second precision.
pub fn commented_on(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format(COMMENTED_ON_FORMAT).to_string()
}

/// Label `text`, treating a failure or a deadline overrun as `Unknown`.
async fn classify(state: &AppState, text: &str) -> Language {
    match tokio::time::timeout(state.external_call_timeout, state.classifier.classify(text)).await {
        Ok(Ok(language)) => language,
        Ok(Err(e)) => {
            tracing::warn!("language detection failed, treating comment as English: {}", e);
            Language::Unknown
        }
        Err(_) => {
            tracing::warn!(
                "language detection timed out after {:?}, treating comment as English",
                state.external_call_timeout
            );
            Language::Unknown
        }
    }
}

/// English translation of Tamil text, or `None` when translation is disabled
/// or did not succeed in time.
async fn translate_to_english(state: &AppState, tamil: &str) -> Option<String> {
    let translator = state.translator.as_ref()?;
    match tokio::time::timeout(
        state.external_call_timeout,
        translator.translate(tamil, "ta", "en"),
    )
    .await
    {
        Ok(Ok(english)) => Some(english),
        Ok(Err(e)) => {
            tracing::warn!("translation failed, storing Tamil text only: {}", e);
            None
        }
        Err(_) => {
            tracing::warn!(
                "translation timed out after {:?}, storing Tamil text only",
                state.external_call_timeout
            );
            None
        }
    }
}

async fn tamil_fields(state: &AppState, tamil: String, original: Option<String>) -> CommentFields {
    let text_english = translate_to_english(state, &tamil).await;
    CommentFields {
        text_original: original,
        text_tamil: Some(tamil),
        text_english,
    }
}

async fn resolve_fields(state: &AppState, text: CommentText) -> CommentFields {
    match text {
        CommentText::Explicit { tamil, english } => match (tamil, english) {
            (Some(tamil), None) => tamil_fields(state, tamil, None).await,
            (tamil, english) => CommentFields {
                text_original: None,
                text_tamil: tamil,
                text_english: english,
            },
        },
        CommentText::Detect(comment) => match classify(state, &comment).await {
            Language::Tamil => tamil_fields(state, comment.clone(), Some(comment)).await,
            Language::Bilingual => match split_bilingual(&comment) {
                Some((tamil, english)) => CommentFields {
                    text_original: Some(comment),
                    text_tamil: Some(tamil),
                    text_english: Some(english),
                },
                None => tamil_fields(state, comment.clone(), Some(comment)).await,
            },
            Language::Other | Language::Unknown => CommentFields {
                text_original: None,
                text_tamil: None,
                text_english: Some(comment),
            },
        },
    }
}

/// Append a comment to a player learning document.
///
/// The push is one conditional store write, so concurrent appenders on the
/// same document never lose each other's comments.
pub async fn append_comment(
    state: &AppState,
    req: AddCommentRequest,
) -> Result<CommentRecord, ApiError> {
    let valid = validate(req)?;
    let fields = resolve_fields(state, valid.text).await;

    let record = CommentRecord {
        id: uuid::Uuid::new_v4().to_string(),
        commented_by: valid.commented_by,
        commented_on: commented_on(Utc::now(), state.timezone),
        text_original: fields.text_original,
        text_tamil: fields.text_tamil,
        text_english: fields.text_english,
    };

    if !state.store.push_comment(&valid.document_id, &record).await? {
        return Err(ApiError::NotFound(
            "No document found with the provided ID.".to_string(),
        ));
    }

    tracing::info!(
        "Added comment {} to document {}",
        record.id,
        valid.document_id
    );
    Ok(record)
}
