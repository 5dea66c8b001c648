//! CSV ingestion: delimiter guessing, header validation and row
//! normalization for one uploaded file at a time.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{IngestError, RowRejection};
use crate::models::{ResponseEvent, SourceFile};
use crate::normalize::{normalize_row, RawRow, AGENT_COLUMN, TIMESTAMP_COLUMN};

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b'|', b';'];
const DELIMITER_SAMPLE_ROWS: usize = 10;

/// A row that was dropped for a reason worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    pub file: String,
    pub line: u64,
    #[serde(serialize_with = "serialize_display")]
    pub reason: RowRejection,
}

/// Everything one file contributed.
#[derive(Debug, Clone)]
pub struct FileIngest {
    pub file: String,
    pub events: Vec<ResponseEvent>,
    /// Rows without an agent, not counted as warnings
    pub dropped_rows: usize,
    pub warnings: Vec<RowWarning>,
}

impl FileIngest {
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

pub fn ingest_file(file_name: &str, raw_text: &str) -> Result<FileIngest, IngestError> {
    let text = raw_text.strip_prefix('\u{feff}').unwrap_or(raw_text);
    let delimiter = detect_delimiter(text);
    debug!(file = file_name, delimiter = %char::from(delimiter).escape_default(), "detected delimiter");

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| IngestError::Parse {
            file: file_name.to_string(),
            source,
        })?
        .clone();

    let timestamp_idx = headers.iter().position(|h| h == TIMESTAMP_COLUMN);
    let agent_idx = headers.iter().position(|h| h == AGENT_COLUMN);
    let (timestamp_idx, agent_idx) = match (timestamp_idx, agent_idx) {
        (Some(ts), Some(agent)) => (ts, agent),
        (ts, agent) => {
            let mut missing = Vec::new();
            if ts.is_none() {
                missing.push(TIMESTAMP_COLUMN.to_string());
            }
            if agent.is_none() {
                missing.push(AGENT_COLUMN.to_string());
            }
            return Err(IngestError::Schema {
                file: file_name.to_string(),
                missing,
            });
        }
    };

    // An odd quote count means some quote was never closed; multi-line
    // fields are only trusted when the quotes balance.
    let unbalanced_quotes = text.bytes().filter(|&b| b == b'"').count() % 2 == 1;

    let mut events = Vec::new();
    let mut dropped_rows = 0usize;
    let mut warnings = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|source| IngestError::Parse {
            file: file_name.to_string(),
            source,
        })?;
        if is_blank(&record) {
            continue;
        }

        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        if record.len() != headers.len() {
            return Err(IngestError::FieldCount {
                file: file_name.to_string(),
                line,
                expected: headers.len(),
                found: record.len(),
            });
        }

        let broken = record.iter().enumerate().find(|(idx, field)| {
            has_line_break(field)
                && (unbalanced_quotes || *idx == timestamp_idx || *idx == agent_idx)
        });
        if let Some((idx, _)) = broken {
            return Err(IngestError::UnterminatedField {
                file: file_name.to_string(),
                line,
                column: headers.get(idx).unwrap_or_default().to_string(),
            });
        }

        let row = RawRow {
            created_at: record.get(timestamp_idx),
            user_email: record.get(agent_idx),
        };

        match normalize_row(row, file_name) {
            Ok(event) => events.push(event),
            Err(reason) if reason.is_silent() => dropped_rows += 1,
            Err(reason) => {
                warn!(file = file_name, line, %reason, "dropping row");
                warnings.push(RowWarning {
                    file: file_name.to_string(),
                    line,
                    reason,
                });
            }
        }
    }

    info!(
        file = file_name,
        events = events.len(),
        dropped_rows,
        warnings = warnings.len(),
        "ingested file"
    );

    Ok(FileIngest {
        file: file_name.to_string(),
        events,
        dropped_rows,
        warnings,
    })
}

/// Parses every file on its own blocking task. Results come back in
/// submission order regardless of which parse finishes first.
pub async fn ingest_all(files: Vec<SourceFile>) -> Vec<Result<FileIngest, IngestError>> {
    let handles: Vec<_> = files
        .into_iter()
        .map(|file| {
            let name = file.name.clone();
            let handle =
                tokio::task::spawn_blocking(move || ingest_file(&file.name, &file.raw_text));
            (name, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(err) => Err(IngestError::Task {
                file: name,
                message: err.to_string(),
            }),
        };
        results.push(result);
    }
    results
}

/// Picks the candidate delimiter that splits the first records into the
/// most consistent number of fields (at least two). Falls back to comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let mut best: Option<(u8, f64, f64)> = None;

    for delimiter in CANDIDATE_DELIMITERS {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let counts: Vec<usize> = reader
            .records()
            .filter_map(Result::ok)
            .filter(|record| !is_blank(record))
            .take(DELIMITER_SAMPLE_ROWS)
            .map(|record| record.len())
            .collect();
        if counts.is_empty() {
            continue;
        }

        let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        if avg < 2.0 {
            continue;
        }
        let delta: f64 = counts.iter().map(|&c| (c as f64 - avg).abs()).sum();

        let better = match best {
            None => true,
            Some((_, best_delta, best_avg)) => {
                delta < best_delta || (delta == best_delta && avg > best_avg)
            }
        };
        if better {
            best = Some((delimiter, delta, avg));
        }
    }

    best.map(|(delimiter, _, _)| delimiter).unwrap_or(b',')
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

fn has_line_break(field: &str) -> bool {
    field.contains(['\n', '\r'])
}

fn serialize_display<S: serde::Serializer>(
    value: &RowRejection,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "created_at_est,user_email,subject\n\
        2024-03-11T09:15:00,a@x.com,Refund\n\
        2024-03-11T09:45:00,a@x.com,Refund\n\
        2024-03-11T09:05:00,b@x.com,Login\n\
        2024-03-12T23:50:00,,Customer reply\n";

    #[test]
    fn keeps_rows_with_agents() {
        let ingest = ingest_file("march.csv", SAMPLE).unwrap();
        assert_eq!(ingest.file, "march.csv");
        assert_eq!(ingest.event_count(), 3);
        assert_eq!(ingest.dropped_rows, 1);
        assert!(ingest.warnings.is_empty());
        assert!(ingest.events.iter().all(|e| e.source_file() == "march.csv"));
    }

    #[test]
    fn detects_each_candidate_delimiter() {
        for (delimiter, sep) in [(b',', ","), (b'\t', "\t"), (b'|', "|"), (b';', ";")] {
            let text = format!(
                "created_at_est{sep}user_email{sep}id\n2024-03-11T09:15:00{sep}a@x.com{sep}1\n"
            );
            assert_eq!(detect_delimiter(&text), delimiter);
            let ingest = ingest_file("f.csv", &text).unwrap();
            assert_eq!(ingest.event_count(), 1);
        }
    }

    #[test]
    fn quoted_commas_do_not_confuse_detection() {
        let text = "created_at_est;user_email;note\n\
            2024-03-11T09:15:00;a@x.com;\"one, two, three\"\n\
            2024-03-11T10:15:00;b@x.com;\"four, five\"\n";
        assert_eq!(detect_delimiter(text), b';');
    }

    #[test]
    fn missing_columns_fail_the_file() {
        let err = ingest_file("bad.csv", "created_at,email\n2024-03-11T09:15:00,a@x.com\n")
            .unwrap_err();
        match err {
            IngestError::Schema { file, missing } => {
                assert_eq!(file, "bad.csv");
                assert_eq!(missing, vec!["created_at_est", "user_email"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_a_schema_error() {
        let err = ingest_file("empty.csv", "").unwrap_err();
        assert!(matches!(err, IngestError::Schema { .. }));
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let text = "created_at_est,user_email\n2024-03-11T09:15:00,a@x.com,extra,fields\n";
        let err = ingest_file("ragged.csv", text).unwrap_err();
        assert!(err.is_parse_error());
        assert_eq!(err.file(), "ragged.csv");
    }

    #[test]
    fn unterminated_quote_is_a_parse_error() {
        let text = "created_at_est,user_email\n\
            2024-03-11T09:15:00,\"a@x.com\n\
            2024-03-11T10:00:00,b@x.com\n\
            2024-03-11T11:00:00,c@x.com\n";
        let err = ingest_file("q.csv", text).unwrap_err();
        assert!(err.is_parse_error());
        match err {
            IngestError::UnterminatedField { file, line, column } => {
                assert_eq!(file, "q.csv");
                assert_eq!(line, 2);
                assert_eq!(column, "user_email");
            }
            other => panic!("expected unterminated field, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_quote_in_other_column_is_a_parse_error() {
        let text = "created_at_est,user_email,note\n\
            2024-03-11T09:15:00,a@x.com,\"left open\n\
            2024-03-11T10:00:00,b@x.com,fine\n";
        let err = ingest_file("note.csv", text).unwrap_err();
        assert!(matches!(
            err,
            IngestError::UnterminatedField { ref column, .. } if column == "note"
        ));
    }

    #[test]
    fn open_quote_in_header_is_a_schema_error() {
        let text = "created_at_est,\"user_email\n2024-03-11T09:15:00,a@x.com\n";
        let err = ingest_file("head.csv", text).unwrap_err();
        assert!(matches!(err, IngestError::Schema { .. }));
        assert!(!err.is_parse_error());
    }

    #[test]
    fn balanced_multiline_note_is_accepted() {
        let text = "created_at_est,user_email,note\n\
            2024-03-11T09:15:00,a@x.com,\"first line\nsecond line\"\n\
            2024-03-11T10:00:00,b@x.com,short\n";
        let ingest = ingest_file("notes.csv", text).unwrap();
        assert_eq!(ingest.event_count(), 2);
        assert_eq!(ingest.events[1].agent_id(), "b@x.com");
    }

    #[test]
    fn quoted_fields_are_unquoted() {
        let text = "created_at_est,user_email\n\"2024-03-11T09:15:00\",\"a@x.com\"\n";
        assert_eq!(ingest_file("q.csv", text).unwrap().event_count(), 1);
    }

    #[test]
    fn bom_and_blank_lines_are_ignored() {
        let text = "\u{feff}created_at_est,user_email\n\n2024-03-11T09:15:00,a@x.com\n\n\n";
        let ingest = ingest_file("bom.csv", text).unwrap();
        assert_eq!(ingest.event_count(), 1);
    }

    #[test]
    fn bad_timestamps_become_warnings() {
        let text = "created_at_est,user_email\nyesterday,a@x.com\n2024-03-11T09:15:00,a@x.com\n";
        let ingest = ingest_file("warn.csv", text).unwrap();
        assert_eq!(ingest.event_count(), 1);
        assert_eq!(ingest.warnings.len(), 1);
        assert_eq!(ingest.warnings[0].line, 2);
        assert_eq!(
            ingest.warnings[0].reason,
            RowRejection::InvalidTimestamp {
                value: "yesterday".to_string()
            }
        );
    }

    #[test]
    fn zero_valid_rows_is_not_an_error() {
        let text = "created_at_est,user_email\n2024-03-11T09:15:00,\n";
        let ingest = ingest_file("none.csv", text).unwrap();
        assert_eq!(ingest.event_count(), 0);
        assert_eq!(ingest.dropped_rows, 1);
    }

    #[tokio::test]
    async fn ingest_all_preserves_submission_order() {
        let files = vec![
            SourceFile::new("one.csv", SAMPLE),
            SourceFile::new("broken.csv", "nope\n1\n"),
            SourceFile::new("two.csv", "created_at_est,user_email\n2024-03-12T10:00:00,c@x.com\n"),
        ];
        let results = ingest_all(files).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().event_count(), 3);
        assert_eq!(results[1].as_ref().unwrap_err().file(), "broken.csv");
        assert_eq!(results[2].as_ref().unwrap().file, "two.csv");
    }
}
