//! Client for instantiating server-rendered maps on a Windshaft tiler.

pub mod client;
pub mod error;
pub mod request;
pub mod transport;

pub use client::{Client, ClientOptions, MapInstance, MAX_URL_PAYLOAD_LENGTH};
pub use error::{InstantiationError, TransportError, UNKNOWN_ERROR};
pub use request::{DataType, MapRequest, Method};
pub use transport::{HttpTransport, ReqwestTransport};
