use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

use crate::{FetchTarget, RequestId};

const TELEMETRY_TARGET: &str = "mapdash::events::telemetry";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchLifecycle {
    Start,
    Success,
    Failure,
    Stale,
    Aborted,
}

impl fmt::Display for FetchLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "fetch_start"),
            Self::Success => write!(f, "fetch_success"),
            Self::Failure => write!(f, "fetch_failure"),
            Self::Stale => write!(f, "fetch_stale"),
            Self::Aborted => write!(f, "fetch_aborted"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchTelemetry {
    pub request_id: RequestId,
    pub target: FetchTarget,
    pub lifecycle: FetchLifecycle,
    pub error_reason: Option<String>,
    pub duration_ms: Option<u128>,
}

impl FetchTelemetry {
    fn new(target: FetchTarget, request_id: RequestId, lifecycle: FetchLifecycle) -> Self {
        Self {
            request_id,
            target,
            lifecycle,
            error_reason: None,
            duration_ms: None,
        }
    }

    pub fn start(target: FetchTarget, request_id: RequestId) -> Self {
        Self::new(target, request_id, FetchLifecycle::Start)
    }

    pub fn success(target: FetchTarget, request_id: RequestId, duration_ms: Option<u128>) -> Self {
        Self {
            duration_ms,
            ..Self::new(target, request_id, FetchLifecycle::Success)
        }
    }

    pub fn failure(target: FetchTarget, request_id: RequestId, reason: Option<String>) -> Self {
        Self {
            error_reason: reason,
            ..Self::new(target, request_id, FetchLifecycle::Failure)
        }
    }

    pub fn stale(target: FetchTarget, request_id: RequestId) -> Self {
        Self::new(target, request_id, FetchLifecycle::Stale)
    }

    pub fn aborted(target: FetchTarget, request_id: RequestId) -> Self {
        Self::new(target, request_id, FetchLifecycle::Aborted)
    }

    fn now_unix_ms() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }
}

pub fn fetch_start(target: FetchTarget, request_id: RequestId, url: &str) -> FetchTelemetry {
    let telemetry = FetchTelemetry::start(target, request_id);
    info!(
        target: TELEMETRY_TARGET,
        fetch_target = %telemetry.target,
        request_id = %telemetry.request_id,
        lifecycle = %telemetry.lifecycle,
        url = %url,
        timestamp_ms = FetchTelemetry::now_unix_ms(),
        "fetch_start"
    );
    telemetry
}

pub fn fetch_success(
    target: FetchTarget,
    request_id: RequestId,
    duration_ms: Option<u128>,
) -> FetchTelemetry {
    let telemetry = FetchTelemetry::success(target, request_id, duration_ms);
    info!(
        target: TELEMETRY_TARGET,
        fetch_target = %telemetry.target,
        request_id = %telemetry.request_id,
        lifecycle = %telemetry.lifecycle,
        duration_ms = ?telemetry.duration_ms,
        timestamp_ms = FetchTelemetry::now_unix_ms(),
        "fetch_success"
    );
    telemetry
}

pub fn fetch_failure(
    target: FetchTarget,
    request_id: RequestId,
    reason: Option<String>,
) -> FetchTelemetry {
    let telemetry = FetchTelemetry::failure(target, request_id, reason);
    let error_reason = telemetry.error_reason.as_deref().unwrap_or("unclassified");

    error!(
        target: TELEMETRY_TARGET,
        fetch_target = %telemetry.target,
        request_id = %telemetry.request_id,
        lifecycle = %telemetry.lifecycle,
        error = %error_reason,
        timestamp_ms = FetchTelemetry::now_unix_ms(),
        "fetch_failure"
    );

    telemetry
}

/// A response arrived for a request that a newer one has superseded.
pub fn fetch_stale(target: FetchTarget, request_id: RequestId) -> FetchTelemetry {
    let telemetry = FetchTelemetry::stale(target, request_id);
    debug!(
        target: TELEMETRY_TARGET,
        fetch_target = %telemetry.target,
        request_id = %telemetry.request_id,
        lifecycle = %telemetry.lifecycle,
        timestamp_ms = FetchTelemetry::now_unix_ms(),
        "fetch_stale"
    );
    telemetry
}

/// The request was cancelled on purpose; not a failure.
pub fn fetch_aborted(target: FetchTarget, request_id: RequestId) -> FetchTelemetry {
    let telemetry = FetchTelemetry::aborted(target, request_id);
    debug!(
        target: TELEMETRY_TARGET,
        fetch_target = %telemetry.target,
        request_id = %telemetry.request_id,
        lifecycle = %telemetry.lifecycle,
        timestamp_ms = FetchTelemetry::now_unix_ms(),
        "fetch_aborted"
    );
    telemetry
}
