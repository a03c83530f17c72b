//! Structured JSON-lines logging.
//!
//! Every record carries a run id, a sequence number, a level and a domain.
//! Records go to stderr and, once the run context exists, to
//! `LOG_DIR/RUN_ID/events.jsonl` (info and above) or `trace.jsonl` (debug and
//! trace). Stdout is left to the binaries.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    State,   // Demo store mutations, profile switches
    Metrics, // Derived metric snapshots
    Api,     // Remote simulator calls, retries
    Chat,    // Questions, answers, transcript cache
    System,  // Startup, shutdown, configuration
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::State => "state",
            Domain::Metrics => "metrics",
            Domain::Api => "api",
            Domain::Chat => "chat",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
    trace: Option<Mutex<BufWriter<File>>>,
}

fn open_sink(path: PathBuf) -> Option<Mutex<BufWriter<File>>> {
    match File::create(&path) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", path.display(), err);
            None
        }
    }
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("s-{}-{}", ts_epoch_ms(), process::id()));

        // File sinks only when LOG_DIR is set
        let Ok(base) = std::env::var("LOG_DIR") else {
            return RunContext { run_id, events: None, trace: None };
        };
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
            return RunContext { run_id, events: None, trace: None };
        }

        let _ = std::fs::write(
            run_dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );

        RunContext {
            events: open_sink(run_dir.join("events.jsonl")),
            trace: open_sink(run_dir.join("trace.jsonl")),
            run_id,
        }
    })
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["authorization", "Authorization", "api_key", "x-api-key", "token"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["profile_id", "corr_id", "endpoint", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Option<Mutex<BufWriter<File>>>, line: &str) {
    if let Some(writer) = writer {
        if let Ok(mut w) = writer.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    emit_record(level, domain, event, fields);
}

fn build_record(run_id: &str, seq: u64, level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> Value {
    let (mut top, data) = split_fields(sanitize_fields(fields));

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(seq));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("domain".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry)
}

fn emit_record(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let line = build_record(&ctx.run_id, next_seq(), level, domain, event, fields).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    eprintln!("{}", line);
}

// =============================================================================
// Domain-specific helpers
// =============================================================================

pub fn log_state_change(action: &str, profile_id: Option<&str>, state_hash: u64) {
    log(
        Level::Info,
        Domain::State,
        "state_change",
        obj(&[
            ("action", v_str(action)),
            ("profile_id", profile_id.map(v_str).unwrap_or(Value::Null)),
            ("state_hash", v_str(&format!("{:016x}", state_hash))),
        ]),
    );
}

pub fn log_state_rejected(action: &str, reason: &str) {
    log(
        Level::Warn,
        Domain::State,
        "state_rejected",
        obj(&[("action", v_str(action)), ("msg", v_str(reason))]),
    );
}

pub fn log_profile_fallback(requested: &str, fallback: &str) {
    log(
        Level::Warn,
        Domain::State,
        "profile_fallback",
        obj(&[
            ("requested", v_str(requested)),
            ("profile_id", v_str(fallback)),
        ]),
    );
}

pub fn log_metrics_snapshot(profile_id: Option<&str>, fields: &[(&str, Value)]) {
    let mut map = obj(fields);
    map.insert(
        "profile_id".to_string(),
        profile_id.map(v_str).unwrap_or(Value::Null),
    );
    log(Level::Debug, Domain::Metrics, "snapshot", map);
}

pub fn log_api_call(method: &str, endpoint: &str, status: u16, elapsed_ms: f64) {
    let level = if (200..300).contains(&status) { Level::Debug } else { Level::Warn };
    log(
        level,
        Domain::Api,
        "call",
        obj(&[
            ("method", v_str(method)),
            ("endpoint", v_str(endpoint)),
            ("status", json!(status)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

pub fn log_retry(operation: &str, attempt: u32, max_attempts: u32, error: &str, delay_ms: u64) {
    log(
        Level::Warn,
        Domain::Api,
        "retry",
        obj(&[
            ("operation", v_str(operation)),
            ("attempt", json!(attempt)),
            ("max_attempts", json!(max_attempts)),
            ("msg", v_str(error)),
            ("delay_ms", json!(delay_ms)),
        ]),
    );
}

pub fn log_stale_response(operation: &str, ticket: u64, latest: u64) {
    log(
        Level::Debug,
        Domain::Api,
        "stale_response",
        obj(&[
            ("operation", v_str(operation)),
            ("ticket", json!(ticket)),
            ("latest", json!(latest)),
        ]),
    );
}

pub fn log_chat(profile_id: &str, question_chars: usize, answer_chars: usize, cached: bool) {
    log(
        Level::Info,
        Domain::Chat,
        "exchange",
        obj(&[
            ("profile_id", v_str(profile_id)),
            ("question_chars", json!(question_chars)),
            ("answer_chars", json!(answer_chars)),
            ("cached", json!(cached)),
        ]),
    );
}

pub fn log_transcript_failure(profile_id: &str, error: &str) {
    log(
        Level::Warn,
        Domain::Chat,
        "transcript_write_failed",
        obj(&[("profile_id", v_str(profile_id)), ("msg", v_str(error))]),
    );
}

/// Session summary on shutdown
pub fn log_session_summary(duration_ms: u64, state_changes: u64, api_calls: u64, api_failures: u64) {
    log(
        Level::Info,
        Domain::System,
        "session_summary",
        obj(&[
            ("duration_ms", json!(duration_ms)),
            ("state_changes", json!(state_changes)),
            ("api_calls", json!(api_calls)),
            ("api_failures", json!(api_failures)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }

    #[test]
    fn test_secrets_redacted() {
        let fields = obj(&[("api_key", v_str("sk-live")), ("endpoint", v_str("/api/ask"))]);
        let record = build_record("r-test", 7, Level::Info, Domain::Api, "call", fields);
        assert_eq!(record["data"]["api_key"], "[REDACTED]");
        assert_eq!(record["endpoint"], "/api/ask");
        assert_eq!(record["domain"], "api");
        assert_eq!(record["lvl"], "INFO");
        assert_eq!(record["seq"], 7);
    }

    #[test]
    fn test_msg_promoted_to_top_level() {
        let record = build_record(
            "r-test",
            1,
            Level::Warn,
            Domain::State,
            "state_rejected",
            obj(&[("msg", v_str("negative ETH")), ("action", v_str("update_balances"))]),
        );
        assert_eq!(record["msg"], "negative ETH");
        assert!(record["data"].get("msg").is_none());
        assert_eq!(record["data"]["action"], "update_balances");
    }
}
