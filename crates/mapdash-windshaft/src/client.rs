use mapdash_core::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::InstantiationError;
use crate::request::{DataType, MapRequest, Method};
use crate::transport::HttpTransport;

/// Longest url-encoded map config still sent inline in a GET.
pub const MAX_URL_PAYLOAD_LENGTH: usize = 2950;

const JSONP_CALLBACK_PREFIX: &str = "_cdbc_";
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientOptions {
    /// Tiler url with a `{user}` placeholder.
    pub url_template: Option<String>,
    pub user_name: Option<String>,
    pub endpoint: Option<String>,
    pub stat_tag: Option<String>,
    pub force_cors: bool,
    /// Whether the runtime can issue cross-origin POSTs.
    #[serde(default = "default_cors_supported")]
    pub cors_supported: bool,
}

fn default_cors_supported() -> bool {
    true
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url_template: None,
            user_name: None,
            endpoint: None,
            stat_tag: None,
            force_cors: false,
            cors_supported: default_cors_supported(),
        }
    }
}

impl ClientOptions {
    pub fn new(
        url_template: impl Into<String>,
        user_name: impl Into<String>,
        endpoint: impl Into<String>,
        stat_tag: impl Into<String>,
    ) -> Self {
        Self {
            url_template: Some(url_template.into()),
            user_name: Some(user_name.into()),
            endpoint: Some(endpoint.into()),
            stat_tag: Some(stat_tag.into()),
            ..Self::default()
        }
    }
}

/// Handle to an instantiated map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapInstance {
    base_url: String,
    layergroup: Value,
}

impl MapInstance {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn layergroup(&self) -> &Value {
        &self.layergroup
    }

    pub fn layergroup_id(&self) -> Option<&str> {
        self.layergroup.get("layergroupid").and_then(Value::as_str)
    }

    /// Endpoint a category widget fetches its aggregation from.
    pub fn dataview_url(&self, dataview_id: &str) -> Option<String> {
        self.layergroup_id()
            .map(|id| format!("{}{}/dataview/{}", self.base_url, id, dataview_id))
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    url_template: String,
    user_name: String,
    endpoint: String,
    stat_tag: String,
    force_cors: bool,
    cors_supported: bool,
}

impl Client {
    pub fn new(options: ClientOptions) -> Result<Self, ConfigError> {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        ConfigError::require([
            ("urlTemplate", present(&options.url_template)),
            ("userName", present(&options.user_name)),
            ("endpoint", present(&options.endpoint)),
            ("statTag", present(&options.stat_tag)),
        ])?;

        Ok(Self {
            url_template: options.url_template.unwrap_or_default(),
            user_name: options.user_name.unwrap_or_default(),
            endpoint: options.endpoint.unwrap_or_default(),
            stat_tag: options.stat_tag.unwrap_or_default(),
            force_cors: options.force_cors,
            cors_supported: options.cors_supported,
        })
    }

    /// Tiler url with the user substituted and the endpoint appended.
    pub fn endpoint_url(&self) -> String {
        let host = self.url_template.replace("{user}", &self.user_name);
        format!(
            "{}/{}",
            host.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }

    pub fn build_request(&self, map_definition: &Value, filters: Option<&Value>) -> MapRequest {
        let mut params = vec![format!("stat_tag={}", urlencoding::encode(&self.stat_tag))];
        if let Some(filters) = filters {
            params.push(format!(
                "filters={}",
                urlencoding::encode(&filters.to_string())
            ));
        }

        let config = map_definition.to_string();
        let encoded_config = urlencoding::encode(&config);
        let use_post = self.cors_supported
            && (self.force_cors || encoded_config.len() > MAX_URL_PAYLOAD_LENGTH);

        if use_post {
            MapRequest {
                method: Method::Post,
                url: format!("{}?{}", self.endpoint_url(), params.join("&")),
                data_type: DataType::Json,
                jsonp_callback: None,
                cache: false,
                cross_origin: true,
                content_type: Some(JSON_CONTENT_TYPE.to_string()),
                body: Some(config),
            }
        } else {
            params.push(format!("config={encoded_config}"));
            MapRequest {
                method: Method::Get,
                url: format!("{}?{}", self.endpoint_url(), params.join("&")),
                data_type: DataType::Jsonp,
                jsonp_callback: Some(callback_name(&config)),
                cache: true,
                cross_origin: false,
                content_type: None,
                body: None,
            }
        }
    }

    pub fn instantiate_map(
        &self,
        map_definition: &Value,
        filters: Option<&Value>,
        transport: &impl HttpTransport,
    ) -> Result<MapInstance, InstantiationError> {
        let request = self.build_request(map_definition, filters);
        debug!(method = %request.method, url = %request.base_url(), "instantiating map");

        let response = transport.send(&request).map_err(|error| {
            warn!(error = %error, "map instantiation transport failure");
            InstantiationError::Transport(error)
        })?;

        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            let message = errors
                .first()
                .map(|first| match first {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| crate::error::UNKNOWN_ERROR.to_string());
            warn!(error = %message, "tiler rejected map definition");
            return Err(InstantiationError::Server(message));
        }

        let instance = MapInstance {
            base_url: format!("{}/map/", self.endpoint_url()),
            layergroup: response,
        };
        info!(
            base_url = %instance.base_url,
            layergroup = ?instance.layergroup_id(),
            "map instantiated"
        );
        Ok(instance)
    }
}

// Same config, same callback: lets caches serve repeated GETs.
fn callback_name(config: &str) -> String {
    let hash = config
        .bytes()
        .fold(5381u32, |hash, byte| hash.wrapping_mul(33) ^ u32::from(byte));
    format!("{JSONP_CALLBACK_PREFIX}{hash:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_names_are_deterministic() {
        assert_eq!(callback_name("{}"), callback_name("{}"));
        assert_ne!(callback_name("{}"), callback_name("[]"));
        assert!(callback_name("x").starts_with("_cdbc_"));
    }

    #[test]
    fn endpoint_url_joins_without_double_slashes() {
        let client = Client::new(ClientOptions::new(
            "https://{user}.example.com/",
            "bob",
            "/api/v1/map",
            "tag",
        ))
        .expect("client");
        assert_eq!(client.endpoint_url(), "https://bob.example.com/api/v1/map");
    }

    #[test]
    fn dataview_url_needs_layergroup() {
        let instance = MapInstance {
            base_url: "https://h/api/v1/map/".to_string(),
            layergroup: serde_json::json!({"layergroupid": "abc"}),
        };
        assert_eq!(
            instance.dataview_url("cat").as_deref(),
            Some("https://h/api/v1/map/abc/dataview/cat")
        );

        let empty = MapInstance {
            base_url: "https://h/".to_string(),
            layergroup: serde_json::json!({}),
        };
        assert!(empty.dataview_url("cat").is_none());
    }
}
