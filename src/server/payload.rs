//! Request extraction.
//!
//! Bodies may be JSON objects or HTML-form encoded. Anything missing or
//! unreadable becomes an empty payload, so the handlers report
//! "required field(s) missing" / "missing _id" instead of a transport error.
//! A path or query string axum cannot decode is answered with a JSON error
//! body rather than its plain-text rejection.

use std::convert::Infallible;

use axum::Json;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{Form, FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use issues_lib::{ApiResponse, Payload};
use serde_json::Value;
use tracing::debug;

/// A request body decoded into a flat JSON object.
#[derive(Debug, Clone, Default)]
pub struct RequestPayload(pub Payload);

/// The `{project}` path segment.
#[derive(Debug, Clone)]
pub struct ProjectPath(pub String);

/// Raw query pairs, in request order.
#[derive(Debug, Clone, Default)]
pub struct QueryPairs(pub Vec<(String, String)>);

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// Decode a JSON body. Non-object documents count as empty.
#[must_use]
pub fn payload_from_json(bytes: &[u8]) -> Payload {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Payload::new();
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            debug!(kind = json_kind(&other), "ignoring non-object body");
            Payload::new()
        }
        Err(e) => {
            debug!(error = %e, "ignoring unparseable body");
            Payload::new()
        }
    }
}

/// Convert form pairs to a payload. Blank fields are dropped, as browsers
/// submit every input of a form whether or not it was filled in.
#[must_use]
pub fn payload_from_form(pairs: Vec<(String, String)>) -> Payload {
    pairs
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl<S> FromRequest<S> for RequestPayload
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            return Ok(match Form::<Vec<(String, String)>>::from_request(req, state).await {
                Ok(Form(pairs)) => Self(payload_from_form(pairs)),
                Err(rejection) => {
                    debug!(error = %rejection, "ignoring unreadable form body");
                    Self::default()
                }
            });
        }

        Ok(match Bytes::from_request(req, state).await {
            Ok(bytes) => Self(payload_from_json(&bytes)),
            Err(rejection) => {
                debug!(error = %rejection, "ignoring unreadable body");
                Self::default()
            }
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ProjectPath
where
    S: Send + Sync,
{
    type Rejection = Json<ApiResponse>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(project)) => Ok(Self(project)),
            Err(rejection) => {
                debug!(error = %rejection, "rejected project path");
                Err(Json(ApiResponse::error(rejection.body_text())))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for QueryPairs
where
    S: Send + Sync,
{
    type Rejection = Json<ApiResponse>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<Vec<(String, String)>>::from_request_parts(parts, state).await {
            Ok(Query(pairs)) => Ok(Self(pairs)),
            Err(rejection) => {
                debug!(error = %rejection, "rejected query string");
                Err(Json(ApiResponse::error(rejection.body_text())))
            }
        }
    }
}
