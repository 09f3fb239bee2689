use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::sanitize::sanitize_fields;
use crate::error::{AppError, AppResult};

/// A typed request body: which keys must be present, which skip sanitizing.
pub trait Schema: DeserializeOwned {
    const REQUIRED: &'static [&'static str];
    const RAW: &'static [&'static str] = &[];
}

pub fn decode_json(bytes: &[u8]) -> AppResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(AppError::BadRequest("Invalid JSON input".into())),
    }
}

/// Fails naming every required key that is absent, null, or blank after trim.
pub fn require_fields(body: &Map<String, Value>, fields: &[&str]) -> AppResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|field| match body.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Required-field check, sanitization, then conversion into `T`.
pub fn parse<T: Schema>(body: Map<String, Value>) -> AppResult<T> {
    require_fields(&body, T::REQUIRED)?;
    let clean = sanitize_fields(body, T::RAW);
    serde_json::from_value(Value::Object(clean))
        .map_err(|e| AppError::BadRequest(format!("Invalid input: {e}")))
}

/// Decoded JSON object body, not yet validated against any schema.
#[derive(Debug)]
pub struct JsonBody(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::BadRequest("Invalid JSON input".into()))?;
        decode_json(&bytes).map(JsonBody)
    }
}

/// Like [`JsonBody`], but an empty body is allowed (DELETE, logout).
#[derive(Debug)]
pub struct MaybeJsonBody(pub Option<Map<String, Value>>);

impl MaybeJsonBody {
    pub fn require(self) -> AppResult<Map<String, Value>> {
        self.0
            .ok_or_else(|| AppError::BadRequest("Invalid JSON input".into()))
    }
}

#[async_trait]
impl<S> FromRequest<S> for MaybeJsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::BadRequest("Invalid JSON input".into()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(MaybeJsonBody(None));
        }
        decode_json(&bytes).map(|map| MaybeJsonBody(Some(map)))
    }
}

/// Body decoded, validated and sanitized straight into a [`Schema`] type.
#[derive(Debug)]
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: Schema + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(body) = JsonBody::from_request(req, state).await?;
        parse(body).map(Payload)
    }
}

/// Query-string extractor whose rejection is rendered as the JSON envelope.
#[derive(Debug)]
pub struct Params<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Params<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::try_from_uri(&parts.uri)
            .map(|Query(value)| Params(value))
            .map_err(|e| AppError::BadRequest(format!("Invalid query parameters: {}", e.body_text())))
    }
}
