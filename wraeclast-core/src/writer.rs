//! Normalized modifier writer: idempotent upserts with bounded retry.

use crate::config::WriterConfig;
use crate::database::Database;
use crate::error::WriteError;
use crate::models::{ParsedModifier, PassSummary};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub struct Writer<'a> {
    db: &'a Database,
    config: WriterConfig,
}

impl<'a> Writer<'a> {
    pub fn new(db: &'a Database, config: WriterConfig) -> Self {
        Writer { db, config }
    }

    /// Persist one record, retrying with exponential backoff. A record
    /// that exhausts its attempts is reported, not fatal.
    pub fn write(&self, record: &ParsedModifier) -> std::result::Result<(), WriteError> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.db.upsert_parsed_modifier(record) {
                Ok(()) => {
                    if attempt > 0 {
                        info!(
                            source_key = %record.source_key,
                            attempt = attempt + 1,
                            "record persisted after retry"
                        );
                    }
                    return Ok(());
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt + 1 < attempts {
                        let delay =
                            Duration::from_millis(self.config.backoff_base_ms * (1 << attempt));
                        warn!(
                            source_key = %record.source_key,
                            attempt = attempt + 1,
                            attempts,
                            error = %last_error,
                            "write failed, retrying in {:?}",
                            delay
                        );
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!(
            source_key = %record.source_key,
            attempts,
            error = %last_error,
            "write retries exhausted"
        );
        Err(WriteError::Exhausted {
            attempts,
            last: last_error,
        })
    }

    /// Persist a resolved batch sequentially, counting outcomes into
    /// the summary. An expired deadline stops new writes and reports
    /// the remainder as unprocessed.
    pub fn write_all(
        &self,
        records: &[ParsedModifier],
        deadline: Option<Instant>,
        summary: &mut PassSummary,
    ) {
        for (index, record) in records.iter().enumerate() {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let remaining = records.len() - index;
                    warn!(remaining, "pass deadline exceeded, stopping writes");
                    summary.unprocessed += remaining;
                    return;
                }
            }

            match self.write(record) {
                Ok(()) => summary.add_written(record),
                Err(_) => summary.failed += 1,
            }
        }
    }
}
