use crate::error::AppError;
use crate::model::{Group, Task};
use crate::store::{Scope, TaskStore, TaskUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const SCHEMA_VERSION: u32 = 2;
const STORE_FILE_NAME: &str = "chores.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    schema_version: u32,
    #[serde(default)]
    groups: Vec<Group>,
    tasks: Vec<Task>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HouseholdState {
    pub groups: Vec<Group>,
    pub tasks: Vec<Task>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var("CHORES_STORE_PATH")
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("chores").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("chores")
            .join(STORE_FILE_NAME))
    }
}

pub fn load_state(path: &Path) -> Result<HouseholdState, AppError> {
    if !path.exists() {
        return Ok(HouseholdState::default());
    }

    let content = std::fs::read_to_string(path)?;
    let stored: StoredState = serde_json::from_str(&content)?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    for task in &stored.tasks {
        if !stored.groups.is_empty() && !stored.groups.iter().any(|g| g.id == task.group_id) {
            return Err(AppError::invalid_data(format!(
                "task {} references unknown group {}",
                task.id, task.group_id
            )));
        }
    }

    Ok(HouseholdState {
        groups: stored.groups,
        tasks: stored.tasks,
    })
}

pub fn save_state(path: &Path, state: &HouseholdState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let stored = StoredState {
        schema_version: SCHEMA_VERSION,
        groups: state.groups.clone(),
        tasks: state.tasks.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)?;
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)?;
    }

    Ok(())
}

/// Applies one update to the task with `task_id` inside a loaded state.
pub fn apply_update(
    state: &mut HouseholdState,
    task_id: &str,
    update: &TaskUpdate,
) -> Result<Task, AppError> {
    let task = state
        .tasks
        .iter_mut()
        .find(|task| task.id == task_id)
        .ok_or_else(|| AppError::invalid_input(format!("task not found: {task_id}")))?;
    update.apply(task);
    Ok(task.clone())
}

/// File-backed store. Every update is a read-modify-write of the whole
/// document, serialized by `write_lock` within this process.
#[derive(Debug)]
pub struct JsonTaskStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(store_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn list_tasks(&self, scope: &Scope) -> Result<Vec<Task>, AppError> {
        let path = self.path.clone();
        let state = tokio::task::spawn_blocking(move || load_state(&path))
            .await
            .map_err(|err| AppError::store(err.to_string()))??;
        Ok(state
            .tasks
            .into_iter()
            .filter(|task| scope.matches(task))
            .collect())
    }

    async fn update_task(&self, task_id: &str, update: TaskUpdate) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let task_id = task_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut state = load_state(&path)?;
            apply_update(&mut state, &task_id, &update)?;
            save_state(&path, &state)
        })
        .await
        .map_err(|err| AppError::store(err.to_string()))?
    }
}
