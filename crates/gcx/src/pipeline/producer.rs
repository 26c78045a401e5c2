//! 📖 The row producer. Reads. Judges. Reports. Never blocks the runtime doing it.

use std::io::{Read, Seek};

use anyhow::{Context, Result};
use async_channel::Sender;
use csv::StringRecord;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::PipelineEvent;
use crate::common::{CanonicalAddress, Diagnostic};
use crate::progress::ProgressMetrics;
use crate::records::{RawRecord, RecordError, check_header, check_required_fields};
use crate::transforms::{CountyAddressPoints, IngestTransform};
use crate::workers::Worker;

/// 📖 Drives a `csv::Reader` over the source and publishes one event per data row.
///
/// The reader runs with `has_headers(false)` so the header row comes through as an
/// ordinary record and goes through the same field mapper as everything else.
/// Rows must all be as wide as the header; a ragged row is a read error.
pub struct RowProducer<R: Read> {
    reader: csv::Reader<R>,
    tx: Sender<PipelineEvent>,
    progress: Option<ProgressMetrics>,
    progress_every_rows: u64,
}

impl<R: Read> std::fmt::Debug for RowProducer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowProducer")
            .field("progress", &self.progress)
            .field("progress_every_rows", &self.progress_every_rows)
            .finish()
    }
}

impl<R: Read> RowProducer<R> {
    pub fn new(source: R, tx: Sender<PipelineEvent>) -> Self {
        let reader = csv_reader(source);
        Self {
            reader,
            tx,
            progress: None,
            progress_every_rows: 10_000,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressMetrics>, every_rows: u64) -> Self {
        self.progress = progress;
        self.progress_every_rows = every_rows.max(1);
        self
    }

    /// 🏭 Read the whole source, publishing as it goes. Blocks the calling thread.
    ///
    /// Per-row failures become diagnostics. Read failures, a missing header, or a header
    /// that doesn't match the column contract end the run. `Done` is published only after
    /// the last row was read cleanly.
    pub fn produce(mut self) -> Result<()> {
        let mut row = StringRecord::new();

        read_and_check_header(&mut self.reader, &mut row)?;
        debug!("✅ header checks out, reading data rows");

        let mut valid: u64 = 0;
        let mut rejected: u64 = 0;
        loop {
            let has_row = self
                .reader
                .read_record(&mut row)
                .context(format!(
                    "💀 The CSV reader choked after {} data rows. This is a read error, not a bad address, so the run stops here.",
                    valid + rejected
                ))?;
            if !has_row {
                break;
            }

            let cells: Vec<&str> = row.iter().collect();
            let event = match to_canonical(&cells) {
                Ok(address) => {
                    valid += 1;
                    PipelineEvent::Valid(address)
                }
                Err(err) => {
                    rejected += 1;
                    PipelineEvent::Diagnostic(Diagnostic::new(&err, &cells))
                }
            };
            self.publish(event)?;

            let rows = valid + rejected;
            if rows % self.progress_every_rows == 0 {
                let byte_offset = self.reader.position().byte();
                if let Some(progress) = self.progress.as_mut() {
                    progress.update(byte_offset, rows, rejected);
                }
            }
        }

        if let Some(progress) = self.progress.as_mut() {
            progress.update(self.reader.position().byte(), valid + rejected, rejected);
            progress.finish();
        }
        self.publish(PipelineEvent::Done)?;
        info!(
            "📖 finished reading: {} valid rows, {} errors",
            valid, rejected
        );
        Ok(())
    }

    fn publish(&self, event: PipelineEvent) -> Result<()> {
        self.tx
            .send_blocking(event)
            .map_err(|_| anyhow::Error::new(ConsumerHungUp))
    }
}

/// 📴 The receiving end is gone. Whatever made the consumer leave is the real story.
#[derive(Debug, thiserror::Error)]
#[error("💀 The consumer hung up mid-file. Nobody is listening, so there's no point reading further.")]
pub struct ConsumerHungUp;

fn csv_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(source)
}

fn read_and_check_header<R: Read>(reader: &mut csv::Reader<R>, row: &mut StringRecord) -> Result<()> {
    let has_header = reader
        .read_record(row)
        .context("💀 Could not even read the header row. The file is a mystery wrapped in an encoding error.")?;
    if !has_header {
        anyhow::bail!(
            "💀 The address file is empty. Not a single header. We expected ADDRNOCOM and friends and got the void."
        );
    }
    let header: Vec<&str> = row.iter().collect();
    check_header(&RawRecord::from_row(header.as_slice())).context(
        "💀 The header row doesn't match the column contract. Somebody moved the columns and nobody told us.",
    )
}

/// 🚪 Check the header of `source` without reading any data row, then rewind it.
///
/// Lets a caller refuse a bad file before anything with side effects happens.
/// Blocks the calling thread.
pub fn check_source_header<R: Read + Seek>(mut source: R) -> Result<R> {
    read_and_check_header(&mut csv_reader(&mut source), &mut StringRecord::new())?;
    source
        .rewind()
        .context("💀 Read the header fine, then couldn't rewind to the top of the file. Rude.")?;
    Ok(source)
}

/// 🔧 map → validate → normalize, first failure wins.
fn to_canonical(cells: &[&str]) -> Result<CanonicalAddress, RecordError> {
    let raw = RawRecord::from_row(cells);
    check_required_fields(&raw)?;
    CountyAddressPoints::transform_record(&raw)
}

impl<R: Read + Send + 'static> Worker for RowProducer<R> {
    fn start(self) -> JoinHandle<Result<()>> {
        // -- 🧵 csv::Reader is synchronous. it gets its own thread so the runtime keeps breathing.
        tokio::task::spawn_blocking(move || self.produce())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::*;

    /// 🧪 Produce into a channel big enough to never block, then read back everything.
    fn produce_all(csv: Vec<u8>) -> (Result<()>, Vec<PipelineEvent>, bool) {
        let (tx, rx) = async_channel::bounded(64);
        let the_outcome = RowProducer::new(std::io::Cursor::new(csv), tx).produce();
        let mut the_events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            the_events.push(event);
        }
        (the_outcome, the_events, rx.is_closed())
    }

    #[test]
    fn the_one_where_done_comes_once_last_and_then_silence() {
        let (the_outcome, the_events, the_channel_closed) = produce_all(a_csv(&[
            the_header_line(),
            a_line_without_a_city("1"),
            a_good_line("2"),
            a_good_line("3.5"),
            a_line_without_a_city("4"),
        ]));

        assert!(the_outcome.is_ok());
        assert!(the_channel_closed, "the sender is dropped after Done");
        assert_eq!(the_events.len(), 5);
        assert!(matches!(the_events[0], PipelineEvent::Diagnostic(_)));
        assert!(matches!(&the_events[1], PipelineEvent::Valid(a) if a.number() == 2));
        assert!(matches!(&the_events[2], PipelineEvent::Valid(a) if a.number() == 3));
        assert!(matches!(the_events[3], PipelineEvent::Diagnostic(_)));
        assert_eq!(the_events[4], PipelineEvent::Done);
        assert_eq!(
            the_events
                .iter()
                .filter(|e| matches!(e, PipelineEvent::Done))
                .count(),
            1
        );
    }

    #[test]
    fn the_one_where_a_header_only_file_is_just_done() {
        let (the_outcome, the_events, _) = produce_all(a_csv(&[the_header_line()]));
        assert!(the_outcome.is_ok());
        assert_eq!(the_events, vec![PipelineEvent::Done]);
    }

    #[test]
    fn the_one_where_a_bad_header_sends_nothing_at_all() {
        let mut the_header = the_header_line();
        the_header = the_header.replace("ZIP4", "ZIP_PLUS_FOUR");
        let (the_outcome, the_events, the_channel_closed) =
            produce_all(a_csv(&[the_header, a_good_line("1")]));

        assert!(the_outcome.is_err());
        assert!(the_events.is_empty(), "no Done, no rows");
        assert!(the_channel_closed);
    }

    #[test]
    fn the_one_where_the_header_is_checked_and_the_file_rewound() -> Result<()> {
        let the_csv = a_csv(&[the_header_line(), a_good_line("1")]);
        let the_source = check_source_header(std::io::Cursor::new(the_csv))?;
        assert_eq!(the_source.position(), 0);

        let (the_outcome, the_events, _) = produce_all(the_source.into_inner());
        assert!(the_outcome.is_ok());
        assert_eq!(the_events.len(), 2, "one valid row and Done");

        let the_headless = a_csv(&[a_good_line("1")]);
        assert!(check_source_header(std::io::Cursor::new(the_headless)).is_err());
        assert!(check_source_header(std::io::Cursor::new(Vec::new())).is_err());
        Ok(())
    }

    #[test]
    fn the_one_where_progress_tracks_rows() {
        let (tx, rx) = async_channel::bounded(64);
        let the_csv = a_csv(&[the_header_line(), a_good_line("1"), a_line_without_a_city("2")]);
        let the_outcome = RowProducer::new(std::io::Cursor::new(the_csv), tx)
            .with_progress(Some(ProgressMetrics::hidden("test.csv".into(), 0)), 1)
            .produce();
        assert!(the_outcome.is_ok());
        assert_eq!(rx.len(), 3);
    }
}
