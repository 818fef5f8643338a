use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use mapdash_core::FetchFailure;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

pub type ResponseStream = Receiver<FetchResponse>;

/// Which part of a widget a request belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    Main,
    Search,
    Range,
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Search => write!(f, "search"),
            Self::Range => write!(f, "range"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchRequest {
    pub id: RequestId,
    pub target: FetchTarget,
    pub url: String,
}

impl FetchRequest {
    pub fn new(target: FetchTarget, url: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            target,
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchResponse {
    pub id: RequestId,
    pub target: FetchTarget,
    pub result: Result<Value, FetchFailure>,
}

impl FetchResponse {
    pub fn success(request: &FetchRequest, body: Value) -> Self {
        Self {
            id: request.id,
            target: request.target,
            result: Ok(body),
        }
    }

    pub fn failure(request: &FetchRequest, failure: FetchFailure) -> Self {
        Self {
            id: request.id,
            target: request.target,
            result: Err(failure),
        }
    }
}

/// Seam between widget models and whatever performs the HTTP work.
pub trait FetchBoundary {
    fn publish_request(&self, request: FetchRequest) -> Result<()>;
    fn subscribe_responses(&self) -> ResponseStream;
}

#[derive(Clone)]
pub struct InMemoryBoundary {
    request_tx: Sender<FetchRequest>,
    request_rx: Receiver<FetchRequest>,
    response_tx: Sender<FetchResponse>,
    response_rx: Receiver<FetchResponse>,
}

impl Default for InMemoryBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBoundary {
    pub fn new() -> Self {
        let (request_tx, request_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();

        Self {
            request_tx,
            request_rx,
            response_tx,
            response_rx,
        }
    }

    /// Every request published since the last call.
    pub fn take_requests(&self) -> Vec<FetchRequest> {
        self.request_rx.try_iter().collect()
    }

    pub fn publish_response(&self, response: FetchResponse) -> Result<()> {
        self.response_tx
            .send(response)
            .map_err(|error| anyhow::anyhow!(error.to_string()))
    }
}

impl FetchBoundary for InMemoryBoundary {
    fn publish_request(&self, request: FetchRequest) -> Result<()> {
        self.request_tx
            .send(request)
            .map_err(|error| anyhow::anyhow!(error.to_string()))
    }

    fn subscribe_responses(&self) -> ResponseStream {
        self.response_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_response_roundtrip() {
        let boundary = InMemoryBoundary::new();
        let request = FetchRequest::new(FetchTarget::Search, "http://host/search?q=a");

        boundary
            .publish_request(request.clone())
            .expect("publish request");
        let received = boundary.take_requests();
        assert_eq!(received, vec![request.clone()]);
        assert!(boundary.take_requests().is_empty());

        boundary
            .publish_response(FetchResponse::success(&request, json!({"categories": []})))
            .expect("publish response");
        let response = boundary
            .subscribe_responses()
            .try_recv()
            .expect("receive response");
        assert_eq!(response.id, request.id);
        assert_eq!(response.target, FetchTarget::Search);
        assert!(response.result.is_ok());
    }

    #[test]
    fn request_ids_are_unique() {
        let a = FetchRequest::new(FetchTarget::Main, "u");
        let b = FetchRequest::new(FetchTarget::Main, "u");
        assert_ne!(a.id, b.id);
    }
}
