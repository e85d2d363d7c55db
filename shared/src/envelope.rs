use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "POST, GET, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";

// Clients have been seen wrapping the JSON body in a JSON string, sometimes twice.
const MAX_BODY_DECODE_DEPTH: usize = 3;

/// Decode a request body into `T`, tolerating JSON that was encoded as a
/// JSON string one or more times.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ApiError::Validation("Request body is empty.".to_string()));
    }

    let mut value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::Validation("Request body is not valid JSON.".to_string()))?;

    for _ in 0..MAX_BODY_DECODE_DEPTH {
        match value {
            Value::String(inner) => {
                value = serde_json::from_str(&inner).map_err(|_| {
                    ApiError::Validation("Request body is not valid JSON.".to_string())
                })?;
            }
            _ => break,
        }
    }

    if !value.is_object() {
        return Err(ApiError::Validation(
            "Request body must be a JSON object.".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        tracing::warn!("request body has unexpected field types: {}", e);
        ApiError::Validation("Request body has invalid field types.".to_string())
    })
}

/// JSON response carrying the CORS headers every endpoint returns.
pub fn json_response(status: StatusCode, body: &Value) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", ALLOW_ORIGIN)
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .body(body.to_string().into())
        .map_err(Box::new)?)
}

pub fn message_response(status: StatusCode, message: &str) -> Result<Response<Body>, Error> {
    json_response(status, &serde_json::json!({ "message": message }))
}

pub fn error_response(err: &ApiError) -> Result<Response<Body>, Error> {
    json_response(err.status_code(), &serde_json::json!({ "error": err.to_string() }))
}

pub fn not_found() -> Result<Response<Body>, Error> {
    json_response(StatusCode::NOT_FOUND, &serde_json::json!({"error": "Not found"}))
}

/// Answer to a CORS preflight request.
pub fn preflight() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", ALLOW_ORIGIN)
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .body(Body::Empty)
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SetStatusRequest;

    #[test]
    fn test_decode_plain_body() {
        let req: SetStatusRequest =
            decode_body(br#"{"playerId":"p1","pathwayId":"path1","status":"done"}"#).unwrap();
        assert_eq!(req.player_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_decode_double_encoded_body() {
        let inner = r#"{"playerId":"p1","pathwayId":"path1","status":"done"}"#;
        let once = serde_json::to_string(inner).unwrap();
        let twice = serde_json::to_string(&once).unwrap();

        let req: SetStatusRequest = decode_body(once.as_bytes()).unwrap();
        assert_eq!(req.status.as_deref(), Some("done"));
        let req: SetStatusRequest = decode_body(twice.as_bytes()).unwrap();
        assert_eq!(req.pathway_id.as_deref(), Some("path1"));
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(matches!(
            decode_body::<SetStatusRequest>(b""),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            decode_body::<SetStatusRequest>(b"not json"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            decode_body::<SetStatusRequest>(b"[1, 2]"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            decode_body::<SetStatusRequest>(br#""just a string""#),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            decode_body::<SetStatusRequest>(br#"{"playerId": 7}"#),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_every_response_has_cors_headers() {
        let responses = vec![
            message_response(StatusCode::OK, "ok").unwrap(),
            error_response(&ApiError::Internal("boom".into())).unwrap(),
            not_found().unwrap(),
            preflight().unwrap(),
        ];
        for resp in responses {
            let headers = resp.headers();
            assert_eq!(headers["Access-Control-Allow-Origin"], "*");
            assert_eq!(headers["Access-Control-Allow-Methods"], "POST, GET, OPTIONS");
            assert_eq!(headers["Access-Control-Allow-Headers"], "Content-Type");
        }
    }

    #[test]
    fn test_error_response_body() {
        let resp = error_response(&ApiError::missing_field("status")).unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Missing required field: status"}));
    }
}
