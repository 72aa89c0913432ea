//! Redis access paths
//!
//! - [`RedisRestProbe`]: `PING` over the REST management endpoint (primary)
//! - [`RedisClientProbe`]: native client over TLS (secondary, `redis-client`
//!   feature)

use crate::probe::Probe;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use stackcheck_common::{CheckError, CheckName, ProbeResult, RedisTarget};
use std::time::Duration;
use tracing::debug;

/// Reply expected from a healthy server
pub const LIVENESS_REPLY: &str = "PONG";

/// Interpret a REST reply body. Only `{"result": "PONG"}` passes.
pub fn classify_rest_reply(body: &str) -> Result<(), CheckError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|_| CheckError::Protocol(format!("malformed response: {}", body)))?;

    match value.get("result").and_then(Value::as_str) {
        Some(LIVENESS_REPLY) => Ok(()),
        _ => Err(CheckError::Protocol(format!("unexpected response: {}", body))),
    }
}

// ============================================================================
// Primary: REST
// ============================================================================

pub struct RedisRestProbe {
    target: RedisTarget,
    limit: Duration,
}

impl RedisRestProbe {
    pub fn new(target: RedisTarget, limit: Duration) -> Self {
        Self { target, limit }
    }

    async fn ping(&self) -> Result<(), CheckError> {
        if self.target.rest_url.is_empty() {
            return Err(CheckError::Configuration(
                "Redis REST URL not configured".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(self.limit)
            .build()
            .map_err(|e| CheckError::Connectivity(e.to_string()))?;

        debug!(url = %self.target.rest_url, "sending REST PING");

        let response = client
            .post(&self.target.rest_url)
            .bearer_auth(self.target.token.expose())
            .json(&["PING"])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckError::Connectivity(format!("HTTP {}", status.as_u16())));
        }

        let body = response.text().await.map_err(transport_error)?;
        classify_rest_reply(&body)
    }
}

fn transport_error(e: reqwest::Error) -> CheckError {
    if e.is_timeout() {
        CheckError::timeout()
    } else {
        CheckError::Connectivity(e.to_string())
    }
}

#[async_trait]
impl Probe for RedisRestProbe {
    fn check(&self) -> CheckName {
        CheckName::RedisRest
    }

    fn label(&self) -> &str {
        "Redis (REST)"
    }

    async fn attempt(&self) -> ProbeResult {
        self.ping().await.into()
    }
}

// ============================================================================
// Secondary: native client
// ============================================================================

/// Host of the REST endpoint, shared with the native client. A URL without
/// a scheme is read as `https://`.
pub fn rest_host(rest_url: &str) -> Option<String> {
    let parse = |s: &str| Url::parse(s).ok().filter(Url::has_host);
    let url = parse(rest_url).or_else(|| parse(&format!("https://{}", rest_url)))?;
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

/// `rediss://:<token>@<host>:<port>` for the native client. The token is
/// percent-encoded by `Url`.
pub fn native_url(target: &RedisTarget) -> Result<Url, CheckError> {
    let host = rest_host(&target.rest_url)
        .ok_or_else(|| CheckError::Configuration("Redis URL has no host".to_string()))?;
    let invalid = |what: &str| CheckError::Configuration(format!("invalid Redis {}", what));

    let mut url = Url::parse("rediss://localhost").map_err(|_| invalid("URL"))?;
    url.set_host(Some(&host)).map_err(|_| invalid("host"))?;
    url.set_port(Some(target.port)).map_err(|_| invalid("port"))?;
    url.set_password(Some(target.token.expose()))
        .map_err(|_| invalid("token"))?;
    Ok(url)
}

pub struct RedisClientProbe {
    target: RedisTarget,
    limit: Duration,
}

impl RedisClientProbe {
    pub fn new(target: RedisTarget, limit: Duration) -> Self {
        Self { target, limit }
    }

    #[cfg(feature = "redis-client")]
    async fn ping(&self) -> Result<(), CheckError> {
        use tokio::time::timeout;

        let url = native_url(&self.target)?;
        let client = redis::Client::open(url.as_str())
            .map_err(|e| CheckError::Configuration(e.to_string()))?;

        let mut conn = timeout(self.limit, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CheckError::timeout())?
            .map_err(|e| CheckError::Connectivity(e.to_string()))?;

        let reply = timeout(
            self.limit,
            redis::cmd("PING").query_async::<_, String>(&mut conn),
        )
        .await
        .map_err(|_| CheckError::timeout())?
        .map_err(|e| CheckError::Connectivity(e.to_string()))?;

        if reply == LIVENESS_REPLY {
            Ok(())
        } else {
            Err(CheckError::Protocol(format!("unexpected reply: {}", reply)))
        }
    }

    #[cfg(not(feature = "redis-client"))]
    async fn ping(&self) -> Result<(), CheckError> {
        let _ = (&self.target, self.limit);
        Err(CheckError::DependencyUnavailable(
            "native Redis client not installed".to_string(),
        ))
    }
}

#[async_trait]
impl Probe for RedisClientProbe {
    fn check(&self) -> CheckName {
        CheckName::RedisNative
    }

    fn label(&self) -> &str {
        "Redis (native client)"
    }

    async fn attempt(&self) -> ProbeResult {
        self.ping().await.into()
    }
}
