use contracts::usecases::u501_file_import::{ImportProgress, RunState};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::repository::sessions::SessionCounts;

/// Трекер прогресса импорта (in-memory, для real-time мониторинга)
#[derive(Clone)]
pub struct ProgressTracker {
    sessions: Arc<RwLock<HashMap<String, ImportProgress>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ImportProgress>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ImportProgress>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Регистрирует запуск. false, если по этой загрузке уже идёт выполнение.
    pub fn try_start(&self, upload_id: &str, total_rows: i32) -> bool {
        let mut sessions = self.write();
        if sessions.get(upload_id).is_some_and(ImportProgress::is_running) {
            return false;
        }
        sessions.insert(
            upload_id.to_string(),
            ImportProgress::new(upload_id.to_string(), total_rows),
        );
        true
    }

    pub fn get_progress(&self, upload_id: &str) -> Option<ImportProgress> {
        self.read().get(upload_id).cloned()
    }

    pub fn update(&self, upload_id: &str, counts: SessionCounts) {
        if let Some(progress) = self.write().get_mut(upload_id) {
            progress.processed_rows = counts.processed;
            progress.failed_rows = counts.failed;
            progress.skipped_rows = counts.skipped;
            progress.updated_at = chrono::Utc::now();
        }
    }

    /// Завершить выполнение (успешно или нет)
    pub fn finish(&self, upload_id: &str) {
        if let Some(progress) = self.write().get_mut(upload_id) {
            let now = chrono::Utc::now();
            progress.state = RunState::Finished;
            progress.completed_at = Some(now);
            progress.updated_at = now;
        }
    }

    /// Удалить старые записи (для очистки памяти)
    pub fn cleanup_old_sessions(&self, max_age_hours: i64) {
        let now = chrono::Utc::now();
        self.write().retain(|_, progress| match progress.completed_at {
            Some(completed_at) => (now - completed_at).num_hours() < max_age_hours,
            None => true,
        });
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_start_is_rejected_while_running() {
        let tracker = ProgressTracker::new();
        assert!(tracker.try_start("u-1", 10));
        assert!(!tracker.try_start("u-1", 10));
        assert!(tracker.try_start("u-2", 3));

        tracker.update(
            "u-1",
            SessionCounts {
                processed: 4,
                failed: 1,
                skipped: 0,
            },
        );
        let progress = tracker.get_progress("u-1").unwrap();
        assert_eq!((progress.processed_rows, progress.failed_rows), (4, 1));

        tracker.finish("u-1");
        assert!(tracker.try_start("u-1", 10));
    }

    #[test]
    fn test_cleanup_keeps_running() {
        let tracker = ProgressTracker::new();
        tracker.try_start("running", 1);
        tracker.try_start("done", 1);
        tracker.finish("done");
        tracker.cleanup_old_sessions(0);
        assert!(tracker.get_progress("running").is_some());
        assert!(tracker.get_progress("done").is_none());
    }
}
