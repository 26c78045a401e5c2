//! 🚰 The consumer. Drains the channel, sorts the good news from the bad.

use anyhow::{Context, Result};
use async_channel::Receiver;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{AddressSink, PipelineEvent, PipelineSummary};
use crate::backends::Sink;
use crate::common::{CanonicalAddress, IndexDocument};
use crate::indexer::{BulkIndexer, BulkItem};

/// 📡 Straight from the pipeline into the bulk queue. No staging area, no global buffer.
#[async_trait]
impl AddressSink for BulkIndexer {
    async fn accept(&mut self, address: CanonicalAddress) -> Result<()> {
        let document = IndexDocument::from(address);
        self.add(BulkItem::index(&document)?).await
    }
}

/// 🚰 Drain every event until the channel closes.
///
/// `Done` is the producer's promise that the file was read to the end. The consumer
/// keeps receiving after it until the channel reports closed, and a close without one
/// is an error: somewhere upstream a read failed or a thread died.
pub async fn drain<A, S>(
    rx: Receiver<PipelineEvent>,
    addresses: &mut A,
    diagnostics: &mut S,
) -> Result<PipelineSummary>
where
    A: AddressSink + ?Sized,
    S: Sink + ?Sized,
{
    let mut summary = PipelineSummary::default();
    let mut done = false;

    while let Ok(event) = rx.recv().await {
        match event {
            PipelineEvent::Valid(address) => {
                if done {
                    warn!("⚠️ a valid address arrived after the completion signal");
                }
                summary.valid += 1;
                addresses
                    .accept(address)
                    .await
                    .context("💀 A valid address had nowhere to go. The bulk queue slammed the door.")?;
            }
            PipelineEvent::Diagnostic(diagnostic) => {
                if done {
                    warn!("⚠️ a diagnostic arrived after the completion signal");
                }
                summary.diagnostics += 1;
                diagnostics
                    .send(diagnostic.to_string())
                    .await
                    .context("💀 Could not write a diagnostic to the error sink. The bad news has nowhere to go.")?;
            }
            PipelineEvent::Done => {
                if done {
                    warn!("⚠️ the completion signal arrived twice");
                }
                debug!("🏁 completion signal received, draining to close");
                done = true;
            }
        }
    }

    if !done {
        anyhow::bail!(
            "💀 The pipeline channel closed without a completion signal after {} valid rows and {} diagnostics. The producer left without saying goodbye.",
            summary.valid,
            summary.diagnostics
        );
    }
    summary.rows_read = summary.valid + summary.diagnostics;
    Ok(summary)
}
