use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{FileRecord, ResponseEvent};

/// All events loaded in a session, with per-file provenance.
#[derive(Debug, Default, Clone)]
pub struct AggregateStore {
    events: Vec<ResponseEvent>,
    files: Vec<FileRecord>,
}

/// Read-only view of the store. Borrowing it blocks mutation until dropped.
#[derive(Debug, Clone, Copy)]
pub struct StoreSnapshot<'a> {
    pub events: &'a [ResponseEvent],
    pub files: &'a [FileRecord],
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file's events, replacing anything previously loaded under the
    /// same name.
    pub fn add_file(&mut self, file_name: &str, events: Vec<ResponseEvent>) -> FileRecord {
        debug_assert!(
            events.iter().all(|e| e.source_file() == file_name),
            "events tagged with a different source file"
        );

        if let Some(previous) = self.remove_file(file_name) {
            debug!(
                file = file_name,
                replaced = previous.event_count,
                "replacing re-uploaded file"
            );
        }

        let record = FileRecord {
            name: file_name.to_string(),
            event_count: events.len(),
        };
        self.events.extend(events);
        self.files.push(record.clone());
        record
    }

    pub fn remove_file(&mut self, file_name: &str) -> Option<FileRecord> {
        let position = self.files.iter().position(|f| f.name == file_name)?;
        let record = self.files.remove(position);
        let before = self.events.len();
        self.events.retain(|e| e.source_file() != file_name);
        debug_assert_eq!(before - self.events.len(), record.event_count);
        Some(record)
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.files.clear();
    }

    pub fn snapshot(&self) -> StoreSnapshot<'_> {
        StoreSnapshot {
            events: &self.events,
            files: &self.files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// Distinct agents, sorted.
    pub fn agents(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|e| e.agent_id())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.events.iter().map(|e| e.calendar_date()).collect()
    }

    /// Earliest and latest calendar date, if any events are loaded.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self.dates();
        Some((*dates.first()?, *dates.last()?))
    }
}
