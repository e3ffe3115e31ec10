use crate::error::AppError;
use crate::model::{Frequency, Group, Priority, Task};
use crate::reset::ResetRequest;
use crate::store::json_store::{self, apply_update};
use crate::store::{Scope, TaskUpdate};
use std::path::Path;
use time::OffsetDateTime;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub group_id: String,
    pub priority: Priority,
    pub frequency: Frequency,
    pub points: u32,
    pub assigned_to: Option<String>,
}

pub fn create_group(name: &str, admin: &str) -> Result<Group, AppError> {
    let path = json_store::store_path()?;
    create_group_with_path(&path, name, admin)
}

pub fn join_group(group_id: &str, user: &str) -> Result<Group, AppError> {
    let path = json_store::store_path()?;
    join_group_with_path(&path, group_id, user)
}

pub fn add_task(new_task: NewTask) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    add_task_with_path(&path, new_task, OffsetDateTime::now_utc())
}

pub fn complete_task(task_id: &str, user: &str) -> Result<Task, AppError> {
    let path = json_store::store_path()?;
    complete_task_with_path(&path, task_id, user, OffsetDateTime::now_utc())
}

pub fn list_tasks(scope: &Scope) -> Result<Vec<Task>, AppError> {
    let path = json_store::store_path()?;
    list_tasks_with_path(&path, scope)
}

pub fn scores(group_id: &str) -> Result<Vec<(String, u32)>, AppError> {
    let path = json_store::store_path()?;
    scores_with_path(&path, group_id)
}

pub fn reset_request_for(group_id: &str, caller: &str) -> Result<ResetRequest, AppError> {
    let path = json_store::store_path()?;
    reset_request_for_with_path(&path, group_id, caller)
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn next_id(prefix: &str) -> String {
    format!("{prefix}-{}", OffsetDateTime::now_utc().unix_timestamp_nanos())
}

fn create_group_with_path(path: &Path, name: &str, admin: &str) -> Result<Group, AppError> {
    let name = required(name, "group name")?;
    let admin = required(admin, "admin")?;

    let mut state = json_store::load_state(path)?;
    if state.groups.iter().any(|group| group.name == name) {
        return Err(AppError::invalid_input(format!(
            "group already exists: {name}"
        )));
    }

    let group = Group {
        id: next_id("group"),
        name: name.to_string(),
        admin: admin.to_string(),
        members: Vec::new(),
        scores: Default::default(),
    };
    state.groups.push(group.clone());
    json_store::save_state(path, &state)?;

    info!(group = %group.id, admin, "group created");
    Ok(group)
}

fn join_group_with_path(path: &Path, group_id: &str, user: &str) -> Result<Group, AppError> {
    let group_id = required(group_id, "group id")?;
    let user = required(user, "user")?;

    let mut state = json_store::load_state(path)?;
    let group = state
        .groups
        .iter_mut()
        .find(|group| group.id == group_id)
        .ok_or_else(|| AppError::invalid_input("group not found"))?;

    if group.is_member(user) {
        return Err(AppError::invalid_input(format!(
            "{user} already belongs to {group_id}"
        )));
    }
    group.members.push(user.to_string());
    let joined = group.clone();
    json_store::save_state(path, &state)?;

    Ok(joined)
}

fn add_task_with_path(
    path: &Path,
    new_task: NewTask,
    now: OffsetDateTime,
) -> Result<Task, AppError> {
    let name = required(&new_task.name, "name")?;
    let group_id = required(&new_task.group_id, "group id")?;

    let mut state = json_store::load_state(path)?;
    let group = state
        .groups
        .iter()
        .find(|group| group.id == group_id)
        .ok_or_else(|| AppError::invalid_input("group not found"))?;

    let assigned_to = match new_task.assigned_to.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(user) if group.is_member(user) => Some(user.to_string()),
        Some(user) => {
            return Err(AppError::invalid_input(format!(
                "{user} is not a member of {group_id}"
            )));
        }
    };

    let task = Task {
        id: next_id("task"),
        name: name.to_string(),
        group_id: group_id.to_string(),
        priority: new_task.priority,
        frequency: new_task.frequency,
        points: new_task.points,
        assigned_to,
        created_at: now,
        completed_by: None,
        completed_at: None,
        last_notified_at: None,
    };
    state.tasks.push(task.clone());
    json_store::save_state(path, &state)?;

    Ok(task)
}

fn complete_task_with_path(
    path: &Path,
    task_id: &str,
    user: &str,
    now: OffsetDateTime,
) -> Result<Task, AppError> {
    let task_id = required(task_id, "id")?;
    let user = required(user, "user")?;

    let mut state = json_store::load_state(path)?;
    let task = state
        .tasks
        .iter()
        .find(|task| task.id == task_id)
        .ok_or_else(|| AppError::invalid_input("task not found"))?;
    if !task.is_pending() {
        return Err(AppError::invalid_input("task already completed"));
    }
    let (group_id, points) = (task.group_id.clone(), task.points);

    let group = state
        .groups
        .iter_mut()
        .find(|group| group.id == group_id)
        .ok_or_else(|| AppError::invalid_data("task belongs to an unknown group"))?;
    if !group.is_member(user) {
        return Err(AppError::invalid_input(format!(
            "{user} is not a member of {group_id}"
        )));
    }
    let score = group.scores.entry(user.to_string()).or_default();
    *score = score
        .checked_add(points)
        .ok_or_else(|| AppError::invalid_input("score overflow"))?;

    let update = TaskUpdate::Completed {
        by: user.to_string(),
        at: now,
    };
    let completed = apply_update(&mut state, task_id, &update)?;
    json_store::save_state(path, &state)?;

    Ok(completed)
}

fn list_tasks_with_path(path: &Path, scope: &Scope) -> Result<Vec<Task>, AppError> {
    let state = json_store::load_state(path)?;
    Ok(state
        .tasks
        .into_iter()
        .filter(|task| scope.matches(task))
        .collect())
}

fn scores_with_path(path: &Path, group_id: &str) -> Result<Vec<(String, u32)>, AppError> {
    let state = json_store::load_state(path)?;
    let group = state
        .groups
        .into_iter()
        .find(|group| group.id == group_id.trim())
        .ok_or_else(|| AppError::invalid_input("group not found"))?;

    let mut ranking: Vec<(String, u32)> = group.scores.into_iter().collect();
    ranking.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(ranking)
}

/// Unknown groups and non-admin callers both yield an unauthorized request.
fn reset_request_for_with_path(
    path: &Path,
    group_id: &str,
    caller: &str,
) -> Result<ResetRequest, AppError> {
    let state = json_store::load_state(path)?;
    let is_admin = state
        .groups
        .iter()
        .any(|group| group.id == group_id.trim() && group.is_admin(caller));
    Ok(ResetRequest::for_caller(group_id, is_admin))
}
