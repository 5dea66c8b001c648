//! Support response heatmap pipeline.
//!
//! CSV exports of support interactions are ingested into an in-memory
//! [`store::AggregateStore`], partitioned into Sunday-aligned weeks and
//! bucketed into a day-of-week × hour-of-day [`heatmap::Heatmap`] that the
//! projection helpers read for presentation.

pub mod error;
pub mod heatmap;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod projection;
pub mod report;
pub mod session;
pub mod store;
pub mod weeks;

pub use error::{IngestError, RowRejection, SessionError};
pub use heatmap::{build_heatmap, Heatmap, HourCell};
pub use ingest::{ingest_file, FileIngest, RowWarning};
pub use models::{AgentFilter, FileRecord, ResponseEvent, SourceFile, ViewMode, WeekRange};
pub use session::{Session, SubmitOutcome, Summary};
pub use store::{AggregateStore, StoreSnapshot};
