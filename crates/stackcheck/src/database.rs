//! PostgreSQL access paths
//!
//! - [`PsqlProbe`]: the `psql` command-line client (primary, always attempted)
//! - [`PgDriverProbe`]: native driver over TLS (secondary, `pg-driver` feature)
//!
//! [`Psql`] is also used by the init script runner, so process invocation,
//! credential passing and timeouts live in one place.

use crate::probe::{Probe, LIVENESS_QUERY};
use async_trait::async_trait;
use stackcheck_common::{CheckError, CheckName, PostgresTarget, ProbeResult};
use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// What psql should execute
#[derive(Debug, Clone, Copy)]
pub enum PsqlInput<'a> {
    /// `-c <sql>`
    Command(&'a str),
    /// `-f <path>`
    File(&'a Path),
}

/// psql invocation bound to one target
#[derive(Debug, Clone)]
pub struct Psql {
    target: PostgresTarget,
}

impl Psql {
    pub fn new(target: PostgresTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &PostgresTarget {
        &self.target
    }

    /// Base command with connection flags. The password travels through
    /// `PGPASSWORD` only, never argv.
    fn command(&self) -> Command {
        let t = &self.target;
        let mut cmd = Command::new(&t.psql_bin);
        cmd.arg("-h")
            .arg(&t.host)
            .arg("-p")
            .arg(t.port.to_string())
            .arg("-U")
            .arg(&t.user)
            .arg("-d")
            .arg(&t.database)
            .env("PGPASSWORD", t.password.expose())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Run psql, capturing output.
    ///
    /// Only spawn and timeout problems are errors here; the caller classifies
    /// the exit status. A missing binary is reported as
    /// `DependencyUnavailable` so the caller can decide whether that is fatal
    /// for its path.
    pub async fn exec(&self, input: PsqlInput<'_>, limit: Duration) -> Result<Output, CheckError> {
        let mut cmd = self.command();
        match input {
            PsqlInput::Command(sql) => cmd.arg("-c").arg(sql),
            PsqlInput::File(path) => cmd.arg("-f").arg(path),
        };

        debug!(bin = %self.target.psql_bin, host = %self.target.host, ?input, "running psql");

        match timeout(limit, cmd.output()).await {
            Err(_) => Err(CheckError::timeout()),
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                let reason = format!("{} not installed", self.target.psql_bin);
                Err(CheckError::DependencyUnavailable(reason))
            }
            Ok(Err(e)) => Err(CheckError::Execution(format!(
                "failed to run {}: {}",
                self.target.psql_bin, e
            ))),
            Ok(Ok(output)) => Ok(output),
        }
    }
}

/// Diagnostic text for a failed psql run: stderr, or the exit status if silent
pub fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("psql exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

fn require_host(target: &PostgresTarget) -> Result<(), CheckError> {
    if target.host.is_empty() {
        return Err(CheckError::Configuration(
            "PostgreSQL host not configured".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Primary: psql
// ============================================================================

pub struct PsqlProbe {
    psql: Psql,
    limit: Duration,
}

impl PsqlProbe {
    pub fn new(target: PostgresTarget, limit: Duration) -> Self {
        Self {
            psql: Psql::new(target),
            limit,
        }
    }

    async fn ping(&self) -> Result<(), CheckError> {
        require_host(self.psql.target())?;
        let output = match self.psql.exec(PsqlInput::Command(LIVENESS_QUERY), self.limit).await {
            Ok(output) => output,
            // The primary path is mandatory, so a missing client is a failure
            Err(CheckError::DependencyUnavailable(reason)) => {
                return Err(CheckError::Configuration(reason))
            }
            Err(e) => return Err(e),
        };
        if output.status.success() {
            Ok(())
        } else {
            Err(CheckError::Connectivity(failure_text(&output)))
        }
    }
}

#[async_trait]
impl Probe for PsqlProbe {
    fn check(&self) -> CheckName {
        CheckName::PostgresPsql
    }

    fn label(&self) -> &str {
        "PostgreSQL (psql)"
    }

    async fn attempt(&self) -> ProbeResult {
        self.ping().await.into()
    }
}

// ============================================================================
// Secondary: native driver
// ============================================================================

pub struct PgDriverProbe {
    target: PostgresTarget,
    limit: Duration,
}

impl PgDriverProbe {
    pub fn new(target: PostgresTarget, limit: Duration) -> Self {
        Self { target, limit }
    }

    #[cfg(feature = "pg-driver")]
    async fn ping(&self) -> Result<(), CheckError> {
        use sqlx::postgres::{PgConnectOptions, PgSslMode};
        use sqlx::{ConnectOptions, Connection};

        require_host(&self.target)?;
        let t = &self.target;
        let options = PgConnectOptions::new()
            .host(&t.host)
            .port(t.port)
            .database(&t.database)
            .username(&t.user)
            .password(t.password.expose())
            .ssl_mode(PgSslMode::Require);

        let mut conn = timeout(self.limit, options.connect())
            .await
            .map_err(|_| CheckError::timeout())?
            .map_err(|e| CheckError::Connectivity(e.to_string()))?;

        let queried = timeout(
            self.limit,
            sqlx::query_scalar::<_, i32>(LIVENESS_QUERY).fetch_one(&mut conn),
        )
        .await;

        // Release the connection whatever the query did
        if let Err(e) = conn.close().await {
            debug!("closing PostgreSQL connection failed: {}", e);
        }

        match queried {
            Err(_) => Err(CheckError::timeout()),
            Ok(Err(e)) => Err(CheckError::Connectivity(e.to_string())),
            Ok(Ok(1)) => Ok(()),
            Ok(Ok(other)) => Err(CheckError::Protocol(format!(
                "liveness query returned {}",
                other
            ))),
        }
    }

    #[cfg(not(feature = "pg-driver"))]
    async fn ping(&self) -> Result<(), CheckError> {
        let _ = (&self.target, self.limit);
        Err(CheckError::DependencyUnavailable(
            "native PostgreSQL driver not installed".to_string(),
        ))
    }
}

#[async_trait]
impl Probe for PgDriverProbe {
    fn check(&self) -> CheckName {
        CheckName::PostgresNative
    }

    fn label(&self) -> &str {
        "PostgreSQL (native driver)"
    }

    async fn attempt(&self) -> ProbeResult {
        self.ping().await.into()
    }
}
