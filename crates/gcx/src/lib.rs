//! # 📍 gcx — a county's worth of doorsteps, bulk loaded.
//!
//! 🎬 *Previously, on gcx...*
//!
//! Two million address points sat in a CSV. Some had house numbers like "123 1/2".
//! Some had latitudes that would put them somewhere past the North Pole. One had no
//! city at all, which is a lifestyle choice. They all wanted to be searchable.
//!
//! [`run`] is the whole story in one call:
//! 1. open the CSV and check its header, before anything with side effects
//! 2. build the Elasticsearch client and make sure the cluster answers
//! 3. get the target index into shape (require it, create it, or recreate it)
//! 4. open the error report
//! 5. start the bulk indexer
//! 6. run the pipeline: every valid row is streamed into the indexer as it's read,
//!    every bad row becomes one line in the error report
//! 7. close everything, flush everything, and hand back a [`RunReport`]
//!
//! Whether a run with failed documents should end the process is the caller's call.
//! The CLI says yes by default. 🦆

pub mod app_config;
pub mod backends;
pub mod common;
pub mod indexer;
pub mod pipeline;
pub mod progress;
pub mod records;
pub mod transforms;
pub mod workers;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub use app_config::{AppConfig, load_config};

use crate::backends::{ElasticsearchClient, Sink, SinkBackend};
use crate::indexer::{BulkIndexer, BulkIndexerConfig, BulkStats};
use crate::pipeline::{PipelineOptions, PipelineSummary};
use crate::progress::ProgressMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// ⚠️ The run finished, but at least one document was not indexed.
    PartialFailure,
}

/// 🧾 Everything worth knowing once the dust settles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub stats: BulkStats,
    pub pipeline: PipelineSummary,
    pub outcome: RunOutcome,
}

impl RunReport {
    fn from_parts(stats: BulkStats, pipeline: PipelineSummary) -> Self {
        let outcome = if stats.num_failed > 0 {
            RunOutcome::PartialFailure
        } else {
            RunOutcome::Success
        };
        Self {
            stats,
            pipeline,
            outcome,
        }
    }

    pub fn summary_line(&self) -> String {
        self.stats.summary_line()
    }
}

/// 🚀 Load one CSV into one index. See the module docs for the sequence.
///
/// Configuration problems, a bad header, an unreadable file, or a missing index are
/// errors. Per-row problems end up in the error report. Per-document indexing
/// failures end up in the [`RunReport`].
pub async fn run(config: AppConfig) -> Result<RunReport> {
    // -- 🚪 the file and its header first. a bad CSV must not cost anyone their index.
    let source_path = config.source_config.file_name;
    let opened = tokio::fs::File::open(&source_path).await.context(format!(
        "💀 The address file '{}' could not be opened. It's either not there, not ours, or not a file.",
        source_path
    ))?;
    let total_size = opened.metadata().await.map(|m| m.len()).unwrap_or(0);
    let opened = opened.into_std().await;
    let source = tokio::task::spawn_blocking(move || pipeline::check_source_header(opened))
        .await
        .context("💀 The header check panicked. One line. It had one line to read.")?
        .context(format!("💀 '{}' failed the header check, nothing was touched.", source_path))?;

    let index = config.sink_config.index.clone();
    let setup = config.sink_config.index_setup.clone();
    let client = ElasticsearchClient::new(config.sink_config)?;
    client.ping().await?;
    client.prepare_index(&index, &setup).await?;

    let mut diagnostics = SinkBackend::from_config(&config.error_sink_config).await?;

    let mut indexer = BulkIndexer::new(
        client,
        BulkIndexerConfig {
            index,
            num_workers: config.runtime.num_workers,
            flush_bytes: config.runtime.flush_bytes,
            flush_interval: config.runtime.flush_interval(),
            queue_capacity: config.runtime.queue_capacity(),
        },
    )?;

    info!("📖 reading '{}' ({} bytes)", source_path, total_size);
    let options = PipelineOptions {
        channel_capacity: config.runtime.pipeline_channel_capacity,
        progress: Some(ProgressMetrics::new(source_path, total_size)),
        progress_every_rows: config.source_config.progress_every_rows,
    };
    let drained = pipeline::run(source, options, &mut indexer, &mut diagnostics).await;

    // -- 🏁 close both ends even when the pipeline failed: whatever made it this far gets flushed.
    let closed = diagnostics.close().await;
    let stats = indexer.close().await?;
    let summary = drained?;
    closed?;

    let report = RunReport::from_parts(stats, summary);
    match report.outcome {
        RunOutcome::Success => info!("✅ {}", report.summary_line()),
        RunOutcome::PartialFailure => warn!("⚠️ {}", report.summary_line()),
    }
    Ok(report)
}
