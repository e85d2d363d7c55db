use coachlife_shared::{
    comments, envelope, pathways,
    types::{AddCommentRequest, SetStatusRequest, StatusOutcome},
    AppState,
};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use std::sync::Arc;

/// Main Lambda handler - routes requests to the comment and pathway endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("CoachLife API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        return envelope::preflight();
    }

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, parts.as_slice()) {
        // POST /comments - append a comment to a player learning document
        (&Method::POST, ["comments"]) => {
            let result = match envelope::decode_body::<AddCommentRequest>(body) {
                Ok(req) => comments::append_comment(&state, req).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(_) => envelope::message_response(StatusCode::OK, "Comment added successfully."),
                Err(e) => envelope::error_response(&e),
            }
        }
        // POST /pathway-status - create or update a player's pathway status
        (&Method::POST, ["pathway-status"]) => {
            let result = match envelope::decode_body::<SetStatusRequest>(body) {
                Ok(req) => pathways::set_status(&state, req).await,
                Err(e) => Err(e),
            };
            match result {
                Ok((StatusOutcome::Created, message)) => {
                    envelope::message_response(StatusCode::CREATED, &message)
                }
                Ok((StatusOutcome::Updated, message)) => {
                    envelope::message_response(StatusCode::OK, &message)
                }
                Err(e) => envelope::error_response(&e),
            }
        }
        // GET /player-learning/{id} - fetch a player learning document
        (&Method::GET, ["player-learning", document_id]) => {
            match pathways::get_player_learning(&state, document_id).await {
                Ok(document) => {
                    envelope::json_response(StatusCode::OK, &serde_json::to_value(&document)?)
                }
                Err(e) => envelope::error_response(&e),
            }
        }
        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            envelope::not_found()
        }
    }
}
