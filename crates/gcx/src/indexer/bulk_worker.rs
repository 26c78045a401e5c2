//! 🎬 *[a queue fills with documents. somewhere, a cluster waits.]*
//! *[the clock on the wall reads 2:47am.]*
//!
//! 🗑️ The BulkWorker: patient, tireless, and deeply unbothered by the chaos upstream.
//! It buffers items. It ships them as `_bulk` requests. It tallies the verdicts.
//! It never stops a batch over one bad document.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_channel::Receiver;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, trace};

use super::bulk_item::BulkItem;
use super::bulk_stats::BulkCounters;
use crate::backends::ElasticsearchClient;
use crate::workers::Worker;

#[derive(Debug)]
pub(crate) struct BulkWorker {
    id: usize,
    rx: Receiver<BulkItem>,
    client: ElasticsearchClient,
    action_line: String,
    flush_bytes: usize,
    flush_interval: Duration,
    counters: Arc<BulkCounters>,
    buffer: Vec<BulkItem>,
    buffered_bytes: usize,
}

impl BulkWorker {
    pub(crate) fn new(
        id: usize,
        rx: Receiver<BulkItem>,
        client: ElasticsearchClient,
        action_line: String,
        flush_bytes: usize,
        flush_interval: Duration,
        counters: Arc<BulkCounters>,
    ) -> Self {
        Self {
            id,
            rx,
            client,
            action_line,
            flush_bytes,
            flush_interval,
            counters,
            buffer: Vec::new(),
            buffered_bytes: 0,
        }
    }

    /// 📥 Buffer one item, flushing first if this item would push the batch to `flush_bytes`.
    /// An item bigger than `flush_bytes` on its own still goes out, alone.
    async fn accept(&mut self, item: BulkItem) {
        let item_bytes = item.encoded_len(&self.action_line);
        if !self.buffer.is_empty() && self.buffered_bytes + item_bytes >= self.flush_bytes {
            self.flush().await;
        }
        self.buffered_bytes += item_bytes;
        self.buffer.push(item);
    }

    /// 📡 Turn the buffer into one `_bulk` request and settle every item's fate.
    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.buffer);
        let mut body = String::with_capacity(self.buffered_bytes);
        self.buffered_bytes = 0;
        for item in &batch {
            body.push_str(&self.action_line);
            body.push('\n');
            body.push_str(item.document());
            body.push('\n');
        }

        let batch_len = batch.len() as u64;
        debug!(
            "📡 worker {} flushing {} items ({} bytes)",
            self.id,
            batch_len,
            body.len()
        );
        BulkCounters::bump(&self.counters.requests, 1);

        match self.client.bulk(body).await {
            Err(err) => {
                error!(
                    "💀 worker {} lost a batch of {} items: {:#}",
                    self.id, batch_len, err
                );
                BulkCounters::bump(&self.counters.failed, batch_len);
                for item in batch {
                    item.fail(None, Some(&err));
                }
            }
            Ok(response) => {
                BulkCounters::bump(&self.counters.flushed, batch_len);
                let mut verdicts = response.into_items().into_iter();
                for item in batch {
                    match verdicts.next().flatten() {
                        Some(verdict) if verdict.succeeded() => {
                            BulkCounters::bump(&self.counters.indexed, 1);
                            item.succeed(&verdict);
                        }
                        Some(verdict) => {
                            BulkCounters::bump(&self.counters.failed, 1);
                            item.fail(Some(&verdict), None);
                        }
                        None => {
                            BulkCounters::bump(&self.counters.failed, 1);
                            let missing = anyhow::anyhow!(
                                "💀 Elasticsearch answered the bulk request but forgot to mention this document. No verdict, no index, no closure."
                            );
                            item.fail(None, Some(&missing));
                        }
                    }
                }
                trace!("✅ worker {} settled a batch of {}", self.id, batch_len);
            }
        }
    }
}

impl Worker for BulkWorker {
    fn start(mut self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            debug!("📥 bulk worker {} started draining the queue", self.id);
            let mut ticker = tokio::time::interval(self.flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // -- ⏰ the first tick is instant. swallow it so the clock starts now.
            ticker.tick().await;

            loop {
                tokio::select! {
                    received = self.rx.recv() => match received {
                        Ok(item) => self.accept(item).await,
                        Err(_) => {
                            // -- 🏁 queue empty and closed. last call for the partial batch.
                            self.flush().await;
                            debug!("🏁 bulk worker {} clocking out", self.id);
                            return Ok(());
                        }
                    },
                    _ = ticker.tick() => {
                        if !self.buffer.is_empty() {
                            trace!("⏰ worker {} flushing on the interval", self.id);
                            self.flush().await;
                        }
                    }
                }
            }
        })
    }
}
