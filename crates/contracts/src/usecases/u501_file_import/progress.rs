use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Live state of a running confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Finished,
}

/// Прогресс выполнения импорта (in-memory)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub upload_id: String,
    pub state: RunState,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub failed_rows: i32,
    pub skipped_rows: i32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportProgress {
    pub fn new(upload_id: String, total_rows: i32) -> Self {
        let now = Utc::now();
        Self {
            upload_id,
            state: RunState::Running,
            total_rows,
            processed_rows: 0,
            failed_rows: 0,
            skipped_rows: 0,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }
}
