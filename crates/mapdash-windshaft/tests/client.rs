use mapdash_core::ConfigError;
use mapdash_windshaft::{
    Client, ClientOptions, DataType, HttpTransport, InstantiationError, MapRequest, Method,
    TransportError,
};
use serde_json::{Value, json};
use std::cell::RefCell;

const FILTERS_PARAM: &str = "filters=%7B%22some%22%3A%22filters%20that%20will%20be%20applied%22%7D";

struct FakeTransport {
    requests: RefCell<Vec<MapRequest>>,
    reply: fn() -> Result<Value, TransportError>,
}

impl FakeTransport {
    fn replying(reply: fn() -> Result<Value, TransportError>) -> Self {
        Self {
            requests: RefCell::new(Vec::new()),
            reply,
        }
    }

    fn last_request(&self) -> MapRequest {
        self.requests
            .borrow()
            .last()
            .cloned()
            .expect("a request was sent")
    }
}

impl HttpTransport for FakeTransport {
    fn send(&self, request: &MapRequest) -> Result<Value, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        (self.reply)()
    }
}

fn options() -> ClientOptions {
    ClientOptions::new("https://{user}.example.com:443", "rambo", "api/v1", "stat_tag")
}

fn client(options: ClientOptions) -> Client {
    Client::new(options).expect("valid options")
}

#[test]
fn missing_options_are_all_named() {
    let err = Client::new(ClientOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The following options are required: urlTemplate, userName, endpoint, statTag"
    );
    assert!(matches!(err, ConfigError::MissingOptions(fields) if fields.len() == 4));
}

#[test]
fn options_deserialize_from_camel_case() {
    let options: ClientOptions = serde_json::from_value(json!({
        "urlTemplate": "https://{user}.example.com:443",
        "userName": "rambo",
        "endpoint": "api/v1",
        "statTag": "stat_tag",
        "forceCors": true
    }))
    .expect("options");
    assert!(options.force_cors);
    assert!(options.cors_supported);
    assert!(Client::new(options).is_ok());
}

#[test]
fn small_payload_uses_cached_jsonp_get() {
    let request = client(options()).build_request(
        &json!({"some": "json that must be encoded"}),
        Some(&json!({"some": "filters that will be applied"})),
    );

    assert_eq!(request.base_url(), "https://rambo.example.com:443/api/v1");
    let params = request.query_params();
    assert_eq!(params[0], "stat_tag=stat_tag");
    assert_eq!(params[1], FILTERS_PARAM);
    assert_eq!(
        params[2],
        "config=%7B%22some%22%3A%22json%20that%20must%20be%20encoded%22%7D"
    );
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.data_type, DataType::Jsonp);
    assert!(request.jsonp_callback.as_deref().is_some_and(|name| name.starts_with("_cdbc_")));
    assert!(request.cache);
    assert!(request.body.is_none());
}

#[test]
fn force_cors_uses_json_post() {
    let mut options = options();
    options.force_cors = true;
    let request = client(options).build_request(
        &json!({"some": "json that must be encoded"}),
        Some(&json!({"some": "filters that will be applied"})),
    );

    assert_eq!(request.base_url(), "https://rambo.example.com:443/api/v1");
    assert_eq!(request.query_params(), vec!["stat_tag=stat_tag", FILTERS_PARAM]);
    assert!(request.cross_origin);
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.data_type, DataType::Json);
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        request.body.as_deref(),
        Some(r#"{"some":"json that must be encoded"}"#)
    );
}

#[test]
fn oversized_payload_uses_json_post() {
    let request = client(options()).build_request(
        &json!({"key": "x".repeat(3000)}),
        Some(&json!({"some": "filters that will be applied"})),
    );

    assert_eq!(request.query_params(), vec!["stat_tag=stat_tag", FILTERS_PARAM]);
    assert!(request.cross_origin);
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.data_type, DataType::Json);
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
}

#[test]
fn force_cors_without_cors_support_stays_get() {
    let mut options = options();
    options.force_cors = true;
    options.cors_supported = false;
    let request = client(options).build_request(
        &json!({"some": "json that must be encoded"}),
        Some(&json!({"some": "filters that will be applied"})),
    );
    assert_eq!(request.method, Method::Get);
}

#[test]
fn success_yields_instance_with_base_url() {
    let transport = FakeTransport::replying(|| Ok(json!({"layergroupid": "lg1"})));
    let instance = client(options())
        .instantiate_map(&json!("mapDefinition"), Some(&json!({})), &transport)
        .expect("instance");

    assert_eq!(instance.base_url(), "https://rambo.example.com:443/api/v1/map/");
    assert_eq!(instance.layergroup_id(), Some("lg1"));
    assert_eq!(transport.last_request().method, Method::Get);
}

#[test]
fn server_errors_report_first_message() {
    let transport =
        FakeTransport::replying(|| Ok(json!({"errors": ["something went wrong!", "second"]})));
    let err = client(options())
        .instantiate_map(&json!("mapDefinition"), Some(&json!({})), &transport)
        .unwrap_err();

    assert!(matches!(err, InstantiationError::Server(_)));
    assert_eq!(err.message(), "something went wrong!");
}

#[test]
fn transport_failures_are_unknown_errors() {
    let transport = FakeTransport::replying(|| {
        Err(TransportError::Status {
            status: 502,
            body: "something went wrong!".to_string(),
        })
    });
    let err = client(options())
        .instantiate_map(&json!("mapDefinition"), Some(&json!({})), &transport)
        .unwrap_err();

    assert_eq!(err.message(), "Unknown error");
    assert_eq!(err.to_string(), "Unknown error");
}
