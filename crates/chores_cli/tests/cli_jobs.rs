use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("chores-{nanos}-{file_name}"))
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).expect("format instant")
}

fn write_store(path: &Path, tasks: serde_json::Value) {
    let content = serde_json::json!({
        "schema_version": 2,
        "groups": [
            { "id": "home", "name": "Home", "admin": "ana", "members": ["ben"] }
        ],
        "tasks": tasks
    });
    std::fs::write(path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn read_store(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn run(store_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chores_cli"))
        .args(args)
        .env("CHORES_STORE_PATH", store_path)
        .env("CHORES_CONFIG_PATH", store_path.with_extension("config.json"))
        .env("CHORES_DISABLE_NOTIFICATIONS", "1")
        .env_remove("CHORES_LOG")
        .output()
        .expect("failed to run chores_cli")
}

fn chore(
    id: &str,
    priority: &str,
    frequency: &str,
    completed_by: Option<&str>,
) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": format!("chore {id}"),
        "group_id": "home",
        "priority": priority,
        "frequency": frequency,
        "points": 1,
        "created_at": "2025-01-01T09:00:00Z",
        "completed_by": completed_by,
        "completed_at": completed_by.map(|_| "2025-02-27T19:00:00Z"),
    })
}

#[test]
fn remind_notifies_due_tasks_once() {
    let store_path = temp_path("cli-remind.json");
    write_store(
        &store_path,
        serde_json::json!([
            chore("urgent", "urgent", "daily", None),
            chore("normal", "normal", "daily", None),
            chore("done", "urgent", "daily", Some("ben")),
        ]),
    );

    let at = datetime!(2025-06-16 14:00 UTC);
    let first = run(&store_path, &["remind", "--at", &rfc3339(at)]);
    let second = run(&store_path, &["remind", "--at", &rfc3339(at + Duration::minutes(10))]);
    let stored = read_store(&store_path);
    std::fs::remove_file(&store_path).ok();

    assert!(first.status.success());
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("Notified task: chore urgent (urgent)"));
    assert!(!stdout.contains("(normal)"));
    assert!(!stdout.contains("(done)"));

    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).trim().is_empty());

    assert_eq!(stored["tasks"][0]["last_notified_at"], rfc3339(at));
    assert!(stored["tasks"][1]["last_notified_at"].is_null());
    assert!(stored["tasks"][2]["last_notified_at"].is_null());
}

#[test]
fn run_summaries_are_logged_by_default() {
    let store_path = temp_path("cli-remind-summary.json");
    write_store(
        &store_path,
        serde_json::json!([chore("urgent", "urgent", "daily", None)]),
    );

    let remind = run(&store_path, &["remind", "--at", "2025-06-16T14:00:00Z"]);
    let reset = run(&store_path, &["reset", "--at", "2025-06-17T00:05:00Z"]);
    std::fs::remove_file(&store_path).ok();

    assert!(remind.status.success());
    assert!(String::from_utf8_lossy(&remind.stderr).contains("reminder run finished"));
    assert!(String::from_utf8_lossy(&reset.stderr).contains("reset run finished"));
}

#[test]
fn remind_json_reports_outcome() {
    let store_path = temp_path("cli-remind-json.json");
    write_store(
        &store_path,
        serde_json::json!([
            chore("urgent", "urgent", "none", None),
            chore("normal", "normal", "weekly", None),
        ]),
    );

    let output = run(&store_path, &["--json", "remind", "--at", "2025-06-16T18:00:00Z"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(parsed["checked"], 2);
    assert_eq!(parsed["notified"].as_array().unwrap().len(), 2);
    assert!(parsed["failures"].as_array().unwrap().is_empty());
}

#[test]
fn remind_rejects_malformed_instant() {
    let store_path = temp_path("cli-remind-bad-at.json");
    let output = run(&store_path, &["remind", "--at", "tomorrow"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--at must be RFC3339"));
}

#[test]
fn reset_clears_daily_and_month_end_chores() {
    let store_path = temp_path("cli-reset.json");
    write_store(
        &store_path,
        serde_json::json!([
            chore("daily", "normal", "daily", Some("ana")),
            chore("weekly", "normal", "weekly", Some("ana")),
            chore("monthly", "low", "monthly", Some("ben")),
            chore("once", "low", "none", Some("ben")),
        ]),
    );

    // Friday 28 February 2025 closes the month but not the week.
    let output = run(&store_path, &["reset", "--at", "2025-02-28T00:05:00Z"]);
    let stored = read_store(&store_path);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Reset task: daily"));
    assert!(stdout.contains("Reset task: monthly"));
    assert!(!stdout.contains("weekly"));

    let tasks = stored["tasks"].as_array().unwrap();
    assert!(tasks[0]["completed_by"].is_null());
    assert!(tasks[0]["completed_at"].is_null());
    assert_eq!(tasks[1]["completed_by"], "ana");
    assert!(tasks[2]["completed_by"].is_null());
    assert_eq!(tasks[3]["completed_by"], "ben");
}

#[test]
fn reset_by_non_admin_succeeds_without_changes() {
    let store_path = temp_path("cli-reset-member.json");
    write_store(
        &store_path,
        serde_json::json!([chore("daily", "normal", "daily", Some("ana"))]),
    );
    let before = read_store(&store_path);

    let output = run(&store_path, &["reset", "--group", "home", "--as", "ben"]);
    let after = read_store(&store_path);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Nothing reset"));
    assert_eq!(before, after);
}

#[test]
fn reset_by_admin_clears_group_chores() {
    let store_path = temp_path("cli-reset-admin.json");
    write_store(
        &store_path,
        serde_json::json!([chore("daily", "normal", "daily", Some("ben"))]),
    );

    let output = run(
        &store_path,
        &[
            "--json",
            "reset",
            "--group",
            "home",
            "--as",
            "ana",
            "--at",
            "2025-06-17T08:00:00Z",
        ],
    );
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(parsed["skipped_unauthorized"], false);
    assert_eq!(parsed["cleared"], serde_json::json!(["daily"]));
    assert_eq!(parsed["frequencies"], serde_json::json!(["daily"]));
}
