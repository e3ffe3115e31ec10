use chores_cli::cli::{Cli, Command, GroupCommand};
use chores_core::clock::{Clock, FixedClock, SystemClock};
use chores_core::config::{self, Config};
use chores_core::error::{AppError, TaskFailure};
use chores_core::job::{Schedule, spawn_job};
use chores_core::model::Task;
use chores_core::notify::{NotificationSink, sink_from_env};
use chores_core::reminder::ReminderScheduler;
use chores_core::reset::{RecurrenceResetter, ResetRequest};
use chores_core::store::{JsonTaskStore, Scope, TaskStore};
use chores_core::task_api::{self, NewTask};
use clap::Parser;
use std::sync::Arc;
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Tabled)]
struct TaskRow {
    id: String,
    name: String,
    priority: &'static str,
    frequency: &'static str,
    points: u32,
    assigned: String,
    status: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        let status = match task.completed_by.as_deref() {
            Some(user) if !task.is_pending() => format!("done by {user}"),
            _ => "pending".to_string(),
        };
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            priority: task.priority.label(),
            frequency: task.frequency.label(),
            points: task.points,
            assigned: task.assigned_to.clone().unwrap_or_else(|| "-".to_string()),
            status,
        }
    }
}

fn format_time(value: Option<OffsetDateTime>) -> Option<String> {
    value.and_then(|at| at.format(&Rfc3339).ok())
}

fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "name": task.name,
        "group_id": task.group_id,
        "priority": task.priority,
        "frequency": task.frequency,
        "points": task.points,
        "assigned_to": task.assigned_to,
        "completed_by": task.completed_by,
        "completed_at": format_time(task.completed_at),
        "last_notified_at": format_time(task.last_notified_at),
    })
}

fn failures_json(failures: &[TaskFailure]) -> serde_json::Value {
    failures
        .iter()
        .map(|failure| {
            serde_json::json!({
                "task_id": failure.task_id,
                "code": failure.error.code(),
                "message": failure.error.message(),
            })
        })
        .collect()
}

fn print_failures(failures: &[TaskFailure]) {
    for failure in failures {
        eprintln!("WARN: {} - {}", failure.task_id, failure.error);
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn log_filter(verbose: bool, directives: Option<String>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(verbose, std::env::var("CHORES_LOG").ok()))
        .init();
}

fn load_config(overrides: &[String]) -> Result<Config, AppError> {
    let loaded = config::load_config_with_fallback();
    if let Some(err) = loaded.error {
        warn!(%err, "using default configuration");
    }
    config::apply_overrides(&loaded.config, overrides.iter().map(String::as_str))
}

fn clock_at(at: Option<&str>) -> Result<Arc<dyn Clock>, AppError> {
    match at {
        Some(raw) => {
            let instant = OffsetDateTime::parse(raw.trim(), &Rfc3339)
                .map_err(|_| AppError::invalid_input("--at must be RFC3339"))?;
            Ok(Arc::new(FixedClock(instant)))
        }
        None => Ok(Arc::new(SystemClock)),
    }
}

fn pick_group(flag: Option<String>, config: &Config) -> Option<String> {
    flag.or_else(|| config.group.clone())
}

fn notification_sink() -> Result<Arc<dyn NotificationSink>, AppError> {
    Ok(Arc::from(sink_from_env()?))
}

async fn run_command(cli: Cli) -> Result<(), AppError> {
    let config = load_config(&cli.config_override)?;

    match cli.command {
        Command::Group { group } => {
            let (verb, group) = match group {
                GroupCommand::Create { name, admin } => {
                    ("Created", task_api::create_group(&name, &admin)?)
                }
                GroupCommand::Join { group_id, user } => {
                    ("Joined", task_api::join_group(&group_id, &user)?)
                }
            };
            if cli.json {
                println!("{}", serde_json::to_value(&group)?);
            } else {
                println!("{verb} group: {} ({})", group.name, group.id);
            }
        }
        Command::Add {
            name,
            group,
            priority,
            frequency,
            points,
            assign,
        } => {
            let group_id = pick_group(group, &config)
                .ok_or_else(|| AppError::invalid_input("--group is required"))?;
            let task = task_api::add_task(NewTask {
                name,
                group_id,
                priority,
                frequency,
                points,
                assigned_to: assign,
            })?;
            if cli.json {
                println!("{}", task_json(&task));
            } else {
                println!("Added task: {} ({})", task.name, task.id);
            }
        }
        Command::Done { id, user } => {
            let task = task_api::complete_task(&id, &user)?;
            if cli.json {
                println!("{}", task_json(&task));
            } else {
                println!(
                    "Completed task: {} ({}) +{} for {user}",
                    task.name, task.id, task.points
                );
            }
        }
        Command::List { group, pending } => {
            let scope = Scope::from_group(pick_group(group, &config).as_deref());
            let tasks: Vec<Task> = task_api::list_tasks(&scope)?
                .into_iter()
                .filter(|task| !pending || task.is_pending())
                .collect();
            if cli.json {
                let payload: Vec<serde_json::Value> = tasks.iter().map(task_json).collect();
                println!("{}", serde_json::Value::Array(payload));
            } else if tasks.is_empty() {
                println!("No tasks.");
            } else {
                println!("{}", Table::new(tasks.iter().map(TaskRow::from)));
            }
        }
        Command::Scores { group } => {
            let ranking = task_api::scores(&group)?;
            if cli.json {
                let payload: Vec<serde_json::Value> = ranking
                    .iter()
                    .map(|(user, points)| serde_json::json!({ "user": user, "points": points }))
                    .collect();
                println!("{}", serde_json::Value::Array(payload));
            } else {
                for (user, points) in ranking {
                    println!("{user}: {points}");
                }
            }
        }
        Command::Remind { group, at } => {
            let scope = Scope::from_group(pick_group(group, &config).as_deref());
            let store: Arc<dyn TaskStore> = Arc::new(JsonTaskStore::from_env()?);
            let clock = clock_at(at.as_deref())?;
            let scheduler = ReminderScheduler::new(store, notification_sink()?, clock)
                .with_policy(config.reminder_policy())
                .with_concurrency(config.concurrency());
            let outcome = scheduler.run_once(&scope).await?;

            if cli.json {
                let notified: Vec<serde_json::Value> =
                    outcome.notified.iter().map(task_json).collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "checked": outcome.checked,
                        "notified": notified,
                        "failures": failures_json(&outcome.failures),
                    })
                );
            } else {
                for task in &outcome.notified {
                    println!("Notified task: {} ({})", task.name, task.id);
                }
                print_failures(&outcome.failures);
            }
        }
        Command::Reset { group, caller, at } => {
            let group = pick_group(group, &config);
            let request = match caller {
                Some(caller) => {
                    let group_id = group
                        .ok_or_else(|| AppError::invalid_input("--group is required with --as"))?;
                    task_api::reset_request_for(&group_id, &caller)?
                }
                None => ResetRequest::scheduled(Scope::from_group(group.as_deref())),
            };
            let store: Arc<dyn TaskStore> = Arc::new(JsonTaskStore::from_env()?);
            let resetter = RecurrenceResetter::new(store, clock_at(at.as_deref())?)
                .with_concurrency(config.concurrency());
            let outcome = resetter.run_once(&request).await?;

            if cli.json {
                let frequencies: Vec<&str> =
                    outcome.frequencies.iter().map(|f| f.label()).collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "frequencies": frequencies,
                        "cleared": outcome.cleared,
                        "failures": failures_json(&outcome.failures),
                        "skipped_unauthorized": outcome.skipped_unauthorized,
                    })
                );
            } else if outcome.skipped_unauthorized {
                println!("Nothing reset: only the group admin can reset chores.");
            } else {
                for task_id in &outcome.cleared {
                    println!("Reset task: {task_id}");
                }
                print_failures(&outcome.failures);
            }
        }
        Command::Daemon { group } => {
            let scope = Scope::from_group(pick_group(group, &config).as_deref());
            run_daemon(&config, scope).await?;
        }
    }

    Ok(())
}

async fn run_daemon(config: &Config, scope: Scope) -> Result<(), AppError> {
    let store: Arc<dyn TaskStore> = Arc::new(JsonTaskStore::from_env()?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cancel = CancellationToken::new();

    let scheduler = Arc::new(
        ReminderScheduler::new(store.clone(), notification_sink()?, clock.clone())
            .with_policy(config.reminder_policy())
            .with_concurrency(config.concurrency()),
    );
    let reminder_scope = scope.clone();
    let reminders = spawn_job(
        "reminders",
        Schedule::Every(config.reminder_interval()),
        clock.clone(),
        cancel.clone(),
        move || {
            let scheduler = scheduler.clone();
            let scope = reminder_scope.clone();
            async move { scheduler.run_once(&scope).await.map(|_| ()) }
        },
    );

    let resetter = Arc::new(
        RecurrenceResetter::new(store, clock.clone()).with_concurrency(config.concurrency()),
    );
    let resets = spawn_job(
        "resets",
        Schedule::DailyAt {
            hour: config.reset_hour,
            minute: config.reset_minute,
        },
        clock,
        cancel.clone(),
        move || {
            let resetter = resetter.clone();
            let request = ResetRequest::scheduled(scope.clone());
            async move { resetter.run_once(&request).await.map(|_| ()) }
        },
    );

    info!("daemon running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    cancel.cancel();

    for handle in [reminders, resets] {
        if let Err(err) = handle.await {
            warn!(%err, "job ended abnormally");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            // --help / --version
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    init_tracing(cli.verbose);

    if let Err(err) = run_command(cli).await {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::log_filter;

    #[test]
    fn log_filter_defaults_to_info() {
        assert_eq!(log_filter(false, None).to_string(), "info");
        assert_eq!(log_filter(true, None).to_string(), "debug");
        assert_eq!(
            log_filter(false, Some("chores_core=trace".to_string())).to_string(),
            "chores_core=trace"
        );
    }
}
