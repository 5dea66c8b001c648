//! The host-owned session: store, derived week list, current selection and
//! the heatmap built from them.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{IngestError, SessionError};
use crate::heatmap::{build_heatmap, Heatmap};
use crate::ingest::{ingest_all, RowWarning};
use crate::models::{AgentFilter, FileRecord, SourceFile, ViewMode, WeekRange};
use crate::store::AggregateStore;
use crate::weeks::{default_week, partition_weeks};

/// Result of one `submit_files` call. Successful files are merged even when
/// others fail.
#[derive(Debug, Default)]
pub struct SubmitOutcome {
    pub file_results: Vec<FileRecord>,
    pub errors: Vec<IngestError>,
    pub warnings: Vec<RowWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub agent_count: usize,
    pub total_events: usize,
    pub files: Vec<FileRecord>,
}

/// Mutating methods take `&mut self`, so a heatmap read always sees a
/// consistent store. Share across threads behind a lock.
#[derive(Debug)]
pub struct Session {
    store: AggregateStore,
    weeks: Vec<WeekRange>,
    agents: Vec<String>,
    range: Option<WeekRange>,
    agent_filter: AgentFilter,
    view: ViewMode,
    heatmap: Heatmap,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            store: AggregateStore::new(),
            weeks: Vec::new(),
            agents: Vec::new(),
            range: None,
            agent_filter: AgentFilter::All,
            view: ViewMode::Hourly,
            heatmap: Heatmap::empty(Vec::new()),
        }
    }

    /// Parses all files in parallel, then merges the successes in
    /// submission order.
    pub async fn submit_files(&mut self, files: Vec<SourceFile>) -> SubmitOutcome {
        let mut outcome = SubmitOutcome::default();

        for result in ingest_all(files).await {
            match result {
                Ok(ingest) => {
                    let record = self.store.add_file(&ingest.file, ingest.events);
                    outcome.file_results.push(record);
                    outcome.warnings.extend(ingest.warnings);
                }
                Err(err) => {
                    warn!(file = err.file(), error = %err, "file rejected");
                    outcome.errors.push(err);
                }
            }
        }

        if !outcome.file_results.is_empty() {
            self.store_changed();
        }
        outcome
    }

    pub fn remove_file(&mut self, name: &str) -> Option<FileRecord> {
        let removed = self.store.remove_file(name)?;
        info!(file = name, events = removed.event_count, "removed file");
        self.store_changed();
        Some(removed)
    }

    pub fn clear_all(&mut self) {
        self.store.clear();
        info!("cleared session");
        self.store_changed();
    }

    /// Selects any inclusive range, not only one of the partitioned weeks.
    pub fn select_range(&mut self, range: WeekRange) -> Result<(), SessionError> {
        let range = WeekRange::new(range.start, range.end)?;
        self.range = Some(range);
        self.rebuild();
        Ok(())
    }

    pub fn select_agent(&mut self, filter: AgentFilter) {
        if filter == AgentFilter::All && self.view == ViewMode::User {
            self.view = ViewMode::Hourly;
        }
        self.agent_filter = filter;
        self.rebuild();
    }

    pub fn select_view(&mut self, view: ViewMode) -> Result<(), SessionError> {
        if view == ViewMode::User && self.agent_filter == AgentFilter::All {
            return Err(SessionError::AgentRequired);
        }
        self.view = view;
        Ok(())
    }

    pub fn available_weeks(&self) -> &[WeekRange] {
        &self.weeks
    }

    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    pub fn heatmap(&self) -> &Heatmap {
        &self.heatmap
    }

    pub fn selected_range(&self) -> Option<WeekRange> {
        self.range
    }

    pub fn agent_filter(&self) -> &AgentFilter {
        &self.agent_filter
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn files(&self) -> &[FileRecord] {
        self.store.files()
    }

    pub fn store(&self) -> &AggregateStore {
        &self.store
    }

    pub fn summary(&self) -> Summary {
        let span = self.store.date_span();
        Summary {
            first_date: span.map(|(first, _)| first),
            last_date: span.map(|(_, last)| last),
            agent_count: self.agents.len(),
            total_events: self.store.event_count(),
            files: self.store.files().to_vec(),
        }
    }

    fn store_changed(&mut self) {
        self.weeks = partition_weeks(self.store.dates());
        self.agents = self.store.agents();

        let keep_range = self.range.is_some_and(|r| self.weeks.contains(&r));
        if !keep_range {
            self.range = default_week(&self.weeks);
            debug!(range = ?self.range, "reset range selection");
        }

        if let AgentFilter::Agent(agent) = &self.agent_filter {
            if !self.agents.contains(agent) {
                debug!(agent = %agent, "selected agent no longer present");
                self.agent_filter = AgentFilter::All;
                if self.view == ViewMode::User {
                    self.view = ViewMode::Hourly;
                }
            }
        }

        self.rebuild();
    }

    fn rebuild(&mut self) {
        let snapshot = self.store.snapshot();
        self.heatmap = build_heatmap(snapshot.events, self.range.as_ref(), &self.agent_filter);
    }
}
