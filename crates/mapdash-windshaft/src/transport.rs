use reqwest::blocking::Client;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{MapRequest, Method};

/// Executes a planned request and hands back the decoded JSON body.
pub trait HttpTransport {
    fn send(&self, request: &MapRequest) -> Result<Value, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap a client configured elsewhere (proxies, TLS roots, timeouts).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &MapRequest) -> Result<Value, TransportError> {
        // JSONP only matters inside a browser; the tiler answers plain JSON
        // when no callback parameter is sent.
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => {
                let mut builder = self.client.post(&request.url);
                if let Some(content_type) = &request.content_type {
                    builder = builder.header(CONTENT_TYPE, content_type);
                }
                builder.body(request.body.clone().unwrap_or_default())
            }
        };

        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        decode_body(status, body)
    }
}

/// Decode a tiler response. A failed status is only passed through when its
/// body carries an `errors` array, which is how rejected map configs come back.
fn decode_body(status: StatusCode, body: String) -> Result<Value, TransportError> {
    let parsed = serde_json::from_str::<Value>(&body);
    if status.is_success() {
        return parsed.map_err(|error| TransportError::Decode(error.to_string()));
    }
    match parsed {
        Ok(value) if value.get("errors").is_some_and(Value::is_array) => Ok(value),
        _ => Err(TransportError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_status_without_errors_is_a_status_error() {
        let result = decode_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"internal"}"#.to_string(),
        );
        assert!(matches!(result, Err(TransportError::Status { status: 500, .. })));

        let result = decode_body(StatusCode::BAD_GATEWAY, "<html>".to_string());
        assert!(matches!(result, Err(TransportError::Status { status: 502, .. })));
    }

    #[test]
    fn failed_status_with_errors_passes_through() {
        let value = decode_body(StatusCode::BAD_REQUEST, r#"{"errors":["bad"]}"#.to_string())
            .expect("errors body");
        assert_eq!(value["errors"][0], "bad");
    }

    #[test]
    fn success_needs_json() {
        let value = decode_body(StatusCode::OK, r#"{"layergroupid":"lg"}"#.to_string())
            .expect("json");
        assert_eq!(value["layergroupid"], "lg");
        assert!(matches!(
            decode_body(StatusCode::OK, "nope".to_string()),
            Err(TransportError::Decode(_))
        ));
    }
}
