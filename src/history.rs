use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Write,
    EditLines,
    Replace,
    Format,
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EditAction::Write => "write",
            EditAction::EditLines => "edit_lines",
            EditAction::Replace => "replace",
            EditAction::Format => "format",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone)]
pub struct EditHistoryEntry {
    pub timestamp: DateTime<Local>,
    pub action: EditAction,
    pub file: PathBuf,
    pub details: Map<String, Value>,
}

/// Append-only log that keeps the newest `capacity` entries.
#[derive(Debug)]
pub struct EditHistory {
    capacity: usize,
    entries: VecDeque<EditHistoryEntry>,
}

impl EditHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn record(&mut self, action: EditAction, file: PathBuf, details: Map<String, Value>) {
        self.entries.push_back(EditHistoryEntry {
            timestamp: Local::now(),
            action,
            file,
            details,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<EditHistoryEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(n: usize) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("n".to_string(), json!(n));
        map
    }

    #[test]
    fn test_evicts_oldest() {
        let mut history = EditHistory::new(100);
        for n in 0..105 {
            history.record(EditAction::Write, PathBuf::from(format!("f{n}")), details(n));
        }
        assert_eq!(history.len(), 100);

        let recent = history.recent(usize::MAX);
        assert_eq!(recent.first().unwrap().file, PathBuf::from("f104"));
        assert_eq!(recent.last().unwrap().file, PathBuf::from("f5"));
    }

    #[test]
    fn test_recent_limit() {
        let mut history = EditHistory::new(10);
        assert!(history.is_empty());
        history.record(EditAction::Replace, PathBuf::from("a"), Map::new());
        history.record(EditAction::Format, PathBuf::from("b"), Map::new());
        let recent = history.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action, EditAction::Format);
    }
}
