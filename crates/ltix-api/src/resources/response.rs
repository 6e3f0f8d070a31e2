//! Service call responses.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use ltix_core::RequestContext;
use serde::Serialize;

/// Reason phrase for a status code, falling back to the phrase of its class.
pub fn reason_phrase(code: u16) -> &'static str {
    let code = if (200..600).contains(&code) { code } else { 500 };
    match code {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        300 => "Multiple Choices",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        415 => "Unsupported Media Type",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        other => reason_phrase(other / 100 * 100),
    }
}

/// Response produced by a service resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestSummary<'a> {
    method: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    accept: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    reason: String,
    request: RequestSummary<'a>,
}

impl ServiceResponse {
    /// Empty response with a status.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            reason: None,
            content_type: None,
            body: None,
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Serialized JSON body with the given media type.
    #[must_use]
    pub fn json(status: u16, content_type: &str, body: &serde_json::Value) -> Self {
        Self {
            status,
            reason: None,
            content_type: Some(content_type.to_string()),
            body: Some(body.to_string()),
        }
    }

    /// Status code, clamped to the valid range.
    #[must_use]
    pub fn code(&self) -> u16 {
        if (200..600).contains(&self.status) {
            self.status
        } else {
            500
        }
    }

    /// Explicit reason or the standard phrase for the status.
    #[must_use]
    pub fn reason(&self) -> String {
        self.reason
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| reason_phrase(self.status).to_string())
    }

    /// Renders the response. Error statuses without a body get a JSON
    /// description of the failed request.
    pub fn into_http(self, request: &RequestContext, request_uri: &str) -> Response {
        let code = self.code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self.body.clone().filter(|b| !b.is_empty());
        let mut builder = Response::builder().status(status);

        let payload = if (200..300).contains(&code) || body.is_some() {
            if let Some(content_type) = &self.content_type {
                if let Ok(value) = HeaderValue::from_str(&format!("{content_type}; charset=utf-8")) {
                    builder = builder.header(header::CONTENT_TYPE, value);
                }
            }
            body.unwrap_or_default()
        } else if code >= 400 {
            builder = builder.header(header::CONTENT_TYPE, "application/json; charset=utf-8");
            let error = ErrorBody {
                status: code,
                reason: self.reason(),
                request: RequestSummary {
                    method: &request.method,
                    url: request_uri,
                    accept: request.header("accept"),
                    content_type: request.content_type(),
                },
            };
            serde_json::to_string_pretty(&error).unwrap_or_default()
        } else {
            String::new()
        };

        builder
            .body(Body::from(payload))
            .unwrap_or_else(|_| Response::new(Body::empty()))
    }
}
