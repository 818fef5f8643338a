use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// How the response body is expected to come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Jsonp,
    Json,
}

/// Fully planned map instantiation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRequest {
    pub method: Method,
    pub url: String,
    pub data_type: DataType,
    pub jsonp_callback: Option<String>,
    pub cache: bool,
    pub cross_origin: bool,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

impl MapRequest {
    /// Url without its query string.
    pub fn base_url(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }

    /// Raw `key=value` query parameters in order.
    pub fn query_params(&self) -> Vec<&str> {
        self.url
            .split_once('?')
            .map(|(_, query)| query.split('&').collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_url_parts() {
        let request = MapRequest {
            method: Method::Get,
            url: "https://host/api?a=1&b=2".to_string(),
            data_type: DataType::Jsonp,
            jsonp_callback: None,
            cache: true,
            cross_origin: false,
            content_type: None,
            body: None,
        };
        assert_eq!(request.base_url(), "https://host/api");
        assert_eq!(request.query_params(), vec!["a=1", "b=2"]);
        assert_eq!(request.method.to_string(), "GET");
    }
}
