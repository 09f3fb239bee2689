use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// The `{success, message, data?}` body shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Envelope plus the status code chosen by the handler.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize = ()> {
    status: StatusCode,
    body: Envelope<T>,
}

impl ApiResponse<()> {
    /// 200 with a message and no payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                success: true,
                message: message.into(),
                data: None,
            },
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Envelope {
                success: false,
                message: message.into(),
                data: None,
            },
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::optional(message, Some(data))
    }

    /// 200 whose payload may legitimately be absent (e.g. no mood logged today).
    pub fn optional(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope {
                success: true,
                message: message.into(),
                data,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Envelope<T> {
        &self.body
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
