//! # 🚰 THE PIPELINE
//!
//! 🎬 *[one reader. one drain. one narrow hallway between them.]*
//!
//! The producer reads the CSV on a blocking thread: header check first, then
//! every data row goes map → validate → normalize. Whatever comes out, a clean
//! address or a diagnostic, goes down a single bounded channel as a
//! [`PipelineEvent`], in row order. After the last row it sends exactly one
//! [`PipelineEvent::Done`] and hangs up.
//!
//! The consumer drains that channel on the async side. Valid addresses go to an
//! [`AddressSink`] (in production: straight into the bulk indexer). Diagnostics
//! go to the error sink the moment they arrive. A channel that closes without a
//! `Done` means the producer died mid-file, and that's an error for the run.
//!
//! The channel holds one event. When the consumer is busy the producer waits.
//! When the producer is busy the consumer waits. Nobody buffers a county in RAM. 🦆

mod consumer;
mod producer;

use std::io::Read;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

pub use consumer::drain;
pub use producer::{ConsumerHungUp, RowProducer, check_source_header};

use crate::backends::Sink;
use crate::common::{CanonicalAddress, Diagnostic};
use crate::progress::ProgressMetrics;
use crate::workers::Worker;

/// 📨 What the producer says, one row at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Valid(CanonicalAddress),
    Diagnostic(Diagnostic),
    /// 🏁 Sent once, after the last row, right before the channel closes.
    Done,
}

/// 🧾 The consumer's tally. `rows_read` is every data row, header excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub rows_read: u64,
    pub valid: u64,
    pub diagnostics: u64,
}

/// 📥 Where valid addresses go.
#[async_trait]
pub trait AddressSink: Send {
    async fn accept(&mut self, address: CanonicalAddress) -> Result<()>;
}

/// 🗃️ Keeps every address it's handed. Tests and dry runs.
#[async_trait]
impl AddressSink for Vec<CanonicalAddress> {
    async fn accept(&mut self, address: CanonicalAddress) -> Result<()> {
        self.push(address);
        Ok(())
    }
}

#[derive(Debug)]
pub struct PipelineOptions {
    pub channel_capacity: usize,
    pub progress: Option<ProgressMetrics>,
    pub progress_every_rows: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 1,
            progress: None,
            progress_every_rows: 10_000,
        }
    }
}

/// 🚀 Run producer and consumer to completion over `source`.
///
/// Whoever failed first is the one reported. A producer failure (unreadable input,
/// bad header, ragged row) wins over the consumer's "no `Done`" echo of it. A consumer
/// failure (address sink or error sink refused a write) wins over the producer's
/// [`ConsumerHungUp`] echo of that.
pub async fn run<R, A, S>(
    source: R,
    options: PipelineOptions,
    addresses: &mut A,
    diagnostics: &mut S,
) -> Result<PipelineSummary>
where
    R: Read + Send + 'static,
    A: AddressSink + ?Sized,
    S: Sink + ?Sized,
{
    let (tx, rx) = async_channel::bounded(options.channel_capacity.max(1));
    let producer = RowProducer::new(source, tx)
        .with_progress(options.progress, options.progress_every_rows)
        .start();

    let drained = drain(rx, addresses, diagnostics).await;
    let produced = producer
        .await
        .context("💀 The row producer panicked. The CSV reader's thread went down with the ship.")?;
    let summary = match (produced, drained) {
        (Ok(()), drained) => drained?,
        (Err(hung_up), Err(root_cause)) if hung_up.is::<ConsumerHungUp>() => return Err(root_cause),
        (Err(produce_err), _) => return Err(produce_err),
    };

    info!(
        "🧾 pipeline drained: {} rows, {} valid, {} diagnostics",
        summary.rows_read, summary.valid, summary.diagnostics
    );
    Ok(summary)
}
