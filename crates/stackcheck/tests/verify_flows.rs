//! End-to-end verification flows
//!
//! Orchestrator runs against fake probes (deterministic outcomes) and the
//! REST probe against a local axum server standing in for the cache endpoint.

use stackcheck::cache::RedisRestProbe;
use stackcheck::{
    Availability, Capabilities, FakeProbe, FakeScriptRunner, Orchestrator, Probe, RunPaths,
    ServiceProbes,
};
use stackcheck_common::audit_log::entry_lines;
use stackcheck_common::{CheckName, ProbeResult, RedisTarget, Secret, REQUIRED_KEYS};
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::tempdir;

fn paths(dir: &Path) -> RunPaths {
    RunPaths {
        env_file: dir.join(".env"),
        init_script: dir.join("scripts/init-db.sql"),
        audit_log: dir.join("error-logs/agent1-error.txt"),
    }
}

fn write_valid_env(dir: &Path) {
    let content: String = REQUIRED_KEYS
        .iter()
        .map(|k| format!("{}=real-{}\n", k, k.to_lowercase()))
        .collect();
    fs::write(dir.join(".env"), content).unwrap();
}

fn db(primary: FakeProbe, secondary: FakeProbe) -> ServiceProbes {
    ServiceProbes {
        primary: Box::new(primary.with_label("PostgreSQL (psql)")),
        secondary: Box::new(secondary.with_label("PostgreSQL (native driver)")),
    }
}

fn cache(primary: FakeProbe, secondary: FakeProbe) -> ServiceProbes {
    ServiceProbes {
        primary: Box::new(primary.with_label("Redis (REST)")),
        secondary: Box::new(secondary.with_label("Redis (native client)")),
    }
}

fn audit_entries(path: &Path) -> Vec<String> {
    let content = fs::read_to_string(path).unwrap();
    entry_lines(&content).into_iter().map(str::to_string).collect()
}

fn count_containing(entries: &[String], needle: &str) -> usize {
    entries.iter().filter(|e| e.contains(needle)).count()
}

// ============================================================================
// Scenario A: env file with none of the required keys
// ============================================================================

#[tokio::test]
async fn scenario_a_missing_keys_still_probes_and_fails() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".env"), "UNRELATED=1\n").unwrap();

    let psql = FakeProbe::ok(CheckName::PostgresPsql);
    let rest = FakeProbe::ok(CheckName::RedisRest);
    let (psql_calls, rest_calls) = (psql.calls(), rest.calls());

    let orch = Orchestrator::new(
        paths(dir.path()),
        db(psql, FakeProbe::ok(CheckName::PostgresNative)),
        cache(rest, FakeProbe::ok(CheckName::RedisNative)),
        Box::new(FakeScriptRunner::ok()),
        Capabilities::all(),
    );
    let report = orch.run().await.unwrap();

    let env = report.outcomes.get(CheckName::EnvFile).unwrap();
    assert!(env.is_failure());
    for key in REQUIRED_KEYS {
        assert!(env.reason().unwrap().contains(key), "{} not listed", key);
    }

    assert_eq!(psql_calls.load(Ordering::SeqCst), 1);
    assert_eq!(rest_calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.outcomes.failed_checks(), vec![CheckName::EnvFile]);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn missing_env_file_is_env_failure() {
    let dir = tempdir().unwrap();
    let orch = Orchestrator::new(
        paths(dir.path()),
        db(
            FakeProbe::ok(CheckName::PostgresPsql),
            FakeProbe::ok(CheckName::PostgresNative),
        ),
        cache(
            FakeProbe::ok(CheckName::RedisRest),
            FakeProbe::ok(CheckName::RedisNative),
        ),
        Box::new(FakeScriptRunner::ok()),
        Capabilities::all(),
    );
    let report = orch.run().await.unwrap();

    let env = report.outcomes.get(CheckName::EnvFile).unwrap();
    assert!(env.reason().unwrap().contains("not found"));
    assert_eq!(report.exit_code(), 1);
}

// ============================================================================
// Scenario B: psql ok, driver absent, cache fully ok
// ============================================================================

#[tokio::test]
async fn scenario_b_not_applicable_driver_still_passes() {
    let dir = tempdir().unwrap();
    write_valid_env(dir.path());

    let runner = FakeScriptRunner::ok().with_stdout("CREATE TABLE");
    let orch = Orchestrator::new(
        paths(dir.path()),
        db(
            FakeProbe::ok(CheckName::PostgresPsql),
            FakeProbe::failing(CheckName::PostgresNative, "must not be attempted"),
        ),
        cache(
            FakeProbe::ok(CheckName::RedisRest),
            FakeProbe::ok(CheckName::RedisNative),
        ),
        Box::new(runner.clone()),
        Capabilities {
            pg_driver: Availability::Missing("native PostgreSQL driver not installed".into()),
            redis_client: Availability::Available,
        },
    );
    let report = orch.run().await.unwrap();

    assert!(report.verdict());
    assert_eq!(report.exit_code(), 0);
    assert!(matches!(
        report.outcomes.get(CheckName::PostgresNative),
        Some(ProbeResult::NotApplicable(_))
    ));
    assert_eq!(runner.call_count(), 1);

    let entries = audit_entries(&report.audit_log);
    assert_eq!(count_containing(&entries, "PostgreSQL"), 1);
    assert_eq!(count_containing(&entries, "Redis"), 2);
    assert_eq!(count_containing(&entries, "Environment file"), 1);
    assert!(entries.last().unwrap().contains("FINAL STATUS: Setup OK"));
}

// ============================================================================
// DbInit gating
// ============================================================================

#[tokio::test]
async fn init_script_never_invoked_when_database_down() {
    let dir = tempdir().unwrap();
    write_valid_env(dir.path());

    let runner = FakeScriptRunner::ok();
    let orch = Orchestrator::new(
        paths(dir.path()),
        db(
            FakeProbe::failing(CheckName::PostgresPsql, "connection refused"),
            FakeProbe::failing(CheckName::PostgresNative, "connection refused"),
        ),
        cache(
            FakeProbe::ok(CheckName::RedisRest),
            FakeProbe::ok(CheckName::RedisNative),
        ),
        Box::new(runner.clone()),
        Capabilities::all(),
    );
    let report = orch.run().await.unwrap();

    assert_eq!(runner.call_count(), 0);
    assert!(!report.outcomes.contains(CheckName::SqlExecution));
    assert_eq!(
        report.outcomes.failed_checks(),
        vec![CheckName::PostgresPsql, CheckName::PostgresNative]
    );
}

#[tokio::test]
async fn init_script_runs_when_only_secondary_succeeds() {
    let dir = tempdir().unwrap();
    write_valid_env(dir.path());

    let runner = FakeScriptRunner::ok();
    let orch = Orchestrator::new(
        paths(dir.path()),
        db(
            FakeProbe::failing(CheckName::PostgresPsql, "psql not installed"),
            FakeProbe::ok(CheckName::PostgresNative),
        ),
        cache(
            FakeProbe::ok(CheckName::RedisRest),
            FakeProbe::ok(CheckName::RedisNative),
        ),
        Box::new(runner.clone()),
        Capabilities::all(),
    );
    let report = orch.run().await.unwrap();

    assert_eq!(runner.invocations(), vec![dir.path().join("scripts/init-db.sql")]);
    assert_eq!(
        report.outcomes.get(CheckName::SqlExecution),
        Some(&ProbeResult::Success)
    );
    // psql still failed, so the run fails
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn failed_init_script_fails_run() {
    let dir = tempdir().unwrap();
    write_valid_env(dir.path());

    let orch = Orchestrator::new(
        paths(dir.path()),
        db(
            FakeProbe::ok(CheckName::PostgresPsql),
            FakeProbe::ok(CheckName::PostgresNative),
        ),
        cache(
            FakeProbe::ok(CheckName::RedisRest),
            FakeProbe::ok(CheckName::RedisNative),
        ),
        Box::new(FakeScriptRunner::new(ProbeResult::failure(
            "ERROR: relation \"x\" already exists",
        ))),
        Capabilities::all(),
    );
    let report = orch.run().await.unwrap();

    assert_eq!(report.outcomes.failed_checks(), vec![CheckName::SqlExecution]);
    let entries = audit_entries(&report.audit_log);
    assert!(entries
        .iter()
        .any(|e| e.contains("SQL execution: FAILED - ERROR: relation")));
    assert!(entries.last().unwrap().contains("Setup FAILED - sql_execution"));
}

#[tokio::test]
async fn outcome_order_follows_execution() {
    let dir = tempdir().unwrap();
    write_valid_env(dir.path());

    let orch = Orchestrator::new(
        paths(dir.path()),
        db(
            FakeProbe::ok(CheckName::PostgresPsql),
            FakeProbe::ok(CheckName::PostgresNative),
        ),
        cache(
            FakeProbe::ok(CheckName::RedisRest),
            FakeProbe::ok(CheckName::RedisNative),
        ),
        Box::new(FakeScriptRunner::ok()),
        Capabilities::all(),
    );
    let report = orch.run().await.unwrap();

    let order: Vec<&str> = report.outcomes.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "env_file",
            "postgres_psql",
            "postgres_native",
            "sql_execution",
            "redis_rest",
            "redis_native"
        ]
    );
}

// ============================================================================
// Idempotence against an unreachable database
// ============================================================================

/// Settings pointing at services that cannot be reached
#[cfg(unix)]
fn unreachable_settings(dir: &Path, psql_bin: &str) -> stackcheck_common::Settings {
    let mut settings = stackcheck_common::Settings::default();
    settings.paths.env_file = dir.join(".env");
    settings.paths.init_script = dir.join("scripts/init-db.sql");
    settings.paths.audit_log = dir.join("error-logs/agent1-error.txt");
    settings.postgres.host = Some("127.0.0.1".into());
    settings.postgres.psql_bin = Some(psql_bin.into());
    settings.redis.url = Some("http://127.0.0.1:1".into());
    settings.timeouts.rest_secs = 2;
    settings
}

#[cfg(unix)]
#[tokio::test]
async fn repeated_runs_are_identical_and_log_is_truncated() {
    use stackcheck_common::EnvRecord;

    let dir = tempdir().unwrap();
    write_valid_env(dir.path());

    // `false` stands in for a psql that cannot reach the server
    let config = unreachable_settings(dir.path(), "false").resolve(&EnvRecord::default());

    let first = Orchestrator::with_capabilities(&config, Capabilities::none())
        .run()
        .await
        .unwrap();
    let first_entries = audit_entries(&first.audit_log);

    let second = Orchestrator::with_capabilities(&config, Capabilities::none())
        .run()
        .await
        .unwrap();
    let second_entries = audit_entries(&second.audit_log);

    assert_eq!(first.outcomes, second.outcomes);
    assert_eq!(first.exit_code(), 1);
    assert_eq!(first_entries.len(), second_entries.len());

    let strip = |e: &String| e[22..].to_string();
    assert_eq!(
        first_entries.iter().map(strip).collect::<Vec<_>>(),
        second_entries.iter().map(strip).collect::<Vec<_>>()
    );
}

#[cfg(unix)]
#[tokio::test]
async fn multi_line_psql_error_is_one_audit_entry() {
    use stackcheck_common::EnvRecord;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write_valid_env(dir.path());

    let bin = dir.path().join("fake-psql");
    let mut file = fs::File::create(&bin).unwrap();
    writeln!(
        file,
        "#!/bin/sh\necho 'psql: error: connection refused' >&2\n\
         printf '\\tIs the server running?\\n' >&2\nexit 2"
    )
    .unwrap();
    file.sync_all().unwrap();
    drop(file);
    fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

    let config = unreachable_settings(dir.path(), &bin.to_string_lossy())
        .resolve(&EnvRecord::default());
    let report = Orchestrator::with_capabilities(&config, Capabilities::none())
        .run()
        .await
        .unwrap();

    // The outcome keeps the full diagnostic for the console
    let reason = report.outcomes.get(CheckName::PostgresPsql).unwrap().reason().unwrap();
    assert!(reason.contains('\n'));

    let content = fs::read_to_string(&report.audit_log).unwrap();
    for line in content.lines().filter(|l| !l.is_empty() && !l.starts_with('#')) {
        assert!(line.starts_with('['), "unprefixed audit line: {:?}", line);
    }
    let entries = audit_entries(&report.audit_log);
    assert_eq!(
        count_containing(
            &entries,
            "PostgreSQL (psql): FAILED - psql: error: connection refused | Is the server running?"
        ),
        1
    );
}

// ============================================================================
// Scenario C: REST probe against a local endpoint
// ============================================================================

mod rest {
    use super::*;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct Seen {
        auth: Option<String>,
        content_type: Option<String>,
        body: String,
    }

    type Recorded = Arc<Mutex<Vec<Seen>>>;

    async fn spawn_endpoint(status: StatusCode, reply: &'static str) -> (String, Recorded) {
        spawn_slow_endpoint(status, reply, Duration::ZERO).await
    }

    async fn spawn_slow_endpoint(
        status: StatusCode,
        reply: &'static str,
        delay: Duration,
    ) -> (String, Recorded) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);

        let app = Router::new().route(
            "/",
            post(move |headers: HeaderMap, body: String| {
                let recorder = Arc::clone(&recorder);
                async move {
                    tokio::time::sleep(delay).await;
                    let get = |name: header::HeaderName| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    recorder.lock().unwrap().push(Seen {
                        auth: get(header::AUTHORIZATION),
                        content_type: get(header::CONTENT_TYPE),
                        body,
                    });
                    (status, reply)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

        (format!("http://{}", addr), seen)
    }

    fn probe(url: &str) -> RedisRestProbe {
        probe_with_limit(url, Duration::from_secs(5))
    }

    fn probe_with_limit(url: &str, limit: Duration) -> RedisRestProbe {
        RedisRestProbe::new(
            RedisTarget {
                rest_url: url.to_string(),
                token: Secret::new("test-token"),
                port: 6379,
            },
            limit,
        )
    }

    #[tokio::test]
    async fn pong_is_success() {
        let (url, seen) = spawn_endpoint(StatusCode::OK, r#"{"result": "PONG"}"#).await;

        assert_eq!(probe(&url).attempt().await, ProbeResult::Success);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].auth.as_deref(), Some("Bearer test-token"));
        assert_eq!(seen[0].content_type.as_deref(), Some("application/json"));
        assert_eq!(seen[0].body, r#"["PING"]"#);
    }

    #[tokio::test]
    async fn error_result_is_failure_with_raw_body() {
        let body = r#"{"result": "ERROR"}"#;
        let (url, _) = spawn_endpoint(StatusCode::OK, body).await;

        let result = probe(&url).attempt().await;
        assert!(result.is_failure());
        assert!(result.reason().unwrap().contains(body));
    }

    #[tokio::test]
    async fn non_2xx_is_failure() {
        let (url, _) =
            spawn_endpoint(StatusCode::UNAUTHORIZED, r#"{"error": "unauthorized"}"#).await;

        let result = probe(&url).attempt().await;
        assert_eq!(result, ProbeResult::failure("HTTP 401"));
    }

    #[tokio::test]
    async fn slow_endpoint_is_timeout() {
        let (url, _) = spawn_slow_endpoint(
            StatusCode::OK,
            r#"{"result": "PONG"}"#,
            Duration::from_secs(3),
        )
        .await;

        let result = probe_with_limit(&url, Duration::from_millis(300))
            .attempt()
            .await;
        assert_eq!(result, ProbeResult::failure("timeout"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_failure() {
        let result = probe("http://127.0.0.1:1").attempt().await;
        assert!(result.is_failure());
    }
}
