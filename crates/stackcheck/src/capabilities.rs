//! Capability detection
//!
//! Decides once, before any probe runs, which optional access paths this
//! build can attempt. The orchestrator consults the resulting plan instead of
//! each probe checking for its own dependency.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// Dependency missing, with a human-readable reason
    Missing(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    fn from_feature(enabled: bool, what: &str, feature: &str) -> Self {
        if enabled {
            Availability::Available
        } else {
            Availability::Missing(format!(
                "{} not installed (built without the `{}` feature)",
                what, feature
            ))
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => f.write_str("available"),
            Availability::Missing(reason) => f.write_str(reason),
        }
    }
}

/// Which secondary access paths may be attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub pg_driver: Availability,
    pub redis_client: Availability,
}

impl Capabilities {
    /// Capabilities compiled into this binary
    pub fn detect() -> Self {
        let caps = Self {
            pg_driver: Availability::from_feature(
                cfg!(feature = "pg-driver"),
                "native PostgreSQL driver",
                "pg-driver",
            ),
            redis_client: Availability::from_feature(
                cfg!(feature = "redis-client"),
                "native Redis client",
                "redis-client",
            ),
        };
        tracing::debug!(
            pg_driver = %caps.pg_driver,
            redis_client = %caps.redis_client,
            "detected capabilities"
        );
        caps
    }

    pub fn all() -> Self {
        Self {
            pg_driver: Availability::Available,
            redis_client: Availability::Available,
        }
    }

    pub fn none() -> Self {
        Self {
            pg_driver: Availability::from_feature(false, "native PostgreSQL driver", "pg-driver"),
            redis_client: Availability::from_feature(false, "native Redis client", "redis-client"),
        }
    }
}
