use crate::backup::BackupManager;
use crate::config::Config;
use crate::file_types::ContentClassifier;
use crate::history::{EditAction, EditHistory};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// State shared by every operation in one server process.
pub struct ToolContext {
    pub config: Config,
    pub backups: BackupManager,
    pub classifier: ContentClassifier,
    history: Mutex<EditHistory>,
}

impl ToolContext {
    pub fn new(config: Config) -> Self {
        let backups = BackupManager::new(config.backup.resolved_directory());
        let history = Mutex::new(EditHistory::new(config.history.capacity));
        Self {
            config,
            backups,
            classifier: ContentClassifier::new(),
            history,
        }
    }

    pub fn record_edit(&self, action: EditAction, file: PathBuf, details: Map<String, Value>) {
        self.history.lock().record(action, file, details);
    }

    pub fn history(&self) -> parking_lot::MutexGuard<'_, EditHistory> {
        self.history.lock()
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
