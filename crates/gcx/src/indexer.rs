//! # 🏭 THE BULK INDEXER
//!
//! 🎬 COLD OPEN — INT. LOADING DOCK — NIGHT SHIFT
//!
//! Documents arrive one at a time. The dock has a handful of forklifts and one
//! rule: nobody drives to the cluster with a half-empty pallet unless the clock
//! says so or the shift is over.
//!
//! [`BulkIndexer`] is the dock manager. It owns a bounded MPMC queue and a small
//! pool of [`BulkWorker`](bulk_worker::BulkWorker)s. `add` puts a document on the
//! queue and waits if the queue is full. Each worker packs items into `_bulk`
//! requests, flushing when the next item would reach `flush_bytes`, when the flush
//! interval ticks, or when the queue closes. `close` waits for every worker to ship
//! its last pallet and hands back the final [`BulkStats`].
//!
//! Transient cluster trouble is retried underneath, in the client transport.
//! By the time a verdict reaches a worker it is final. 🦆

mod bulk_item;
mod bulk_stats;
mod bulk_worker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_channel::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub use bulk_item::{BulkItem, FailureCallback, SuccessCallback};
pub use bulk_stats::BulkStats;

use crate::backends::ElasticsearchClient;
use crate::workers::Worker;
use bulk_stats::BulkCounters;
use bulk_worker::BulkWorker;

#[derive(Debug, Clone)]
pub struct BulkIndexerConfig {
    pub index: String,
    pub num_workers: usize,
    pub flush_bytes: usize,
    pub flush_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for BulkIndexerConfig {
    fn default() -> Self {
        Self {
            index: "address".to_string(),
            num_workers: 5,
            flush_bytes: 5 * 1024 * 1024,
            flush_interval: Duration::from_secs(30),
            queue_capacity: 5,
        }
    }
}

#[derive(Debug)]
pub struct BulkIndexer {
    tx: Sender<BulkItem>,
    workers: Vec<JoinHandle<Result<()>>>,
    counters: Arc<BulkCounters>,
    started_at: Instant,
}

impl BulkIndexer {
    /// 🚀 Spawn the worker pool. Must be called from inside a tokio runtime.
    pub fn new(client: ElasticsearchClient, config: BulkIndexerConfig) -> Result<Self> {
        let num_workers = config.num_workers.max(1);
        let (tx, rx) = async_channel::bounded(config.queue_capacity.max(1));
        let counters = Arc::new(BulkCounters::default());
        let action_line = serde_json::json!({ "index": { "_index": config.index } }).to_string();
        // -- ⏰ tokio refuses a zero-length interval. so do we.
        let flush_interval = config.flush_interval.max(Duration::from_millis(1));

        let workers = (0..num_workers)
            .map(|id| {
                BulkWorker::new(
                    id,
                    rx.clone(),
                    client.clone(),
                    action_line.clone(),
                    config.flush_bytes,
                    flush_interval,
                    Arc::clone(&counters),
                )
                .start()
            })
            .collect();

        info!(
            "🏭 bulk indexer open: {} workers, {} byte batches, flushing every {:?} into '{}'",
            num_workers, config.flush_bytes, flush_interval, config.index
        );
        Ok(Self {
            tx,
            workers,
            counters,
            started_at: Instant::now(),
        })
    }

    /// 📥 Queue one item. Waits for room when every worker is busy and the queue is full.
    pub async fn add(&self, item: BulkItem) -> Result<()> {
        self.tx.send(item).await.map_err(|_| {
            anyhow::anyhow!(
                "💀 Every bulk worker has left the building, so the queue has nobody to hand documents to. Check the logs above for whoever quit first."
            )
        })?;
        BulkCounters::bump(&self.counters.added, 1);
        Ok(())
    }

    /// 📊 The numbers right now. Still moving while workers are busy.
    pub fn stats(&self) -> BulkStats {
        self.counters.snapshot(self.started_at.elapsed())
    }

    /// 🏁 Close the queue, let every worker flush what it holds, and return the final tally.
    pub async fn close(self) -> Result<BulkStats> {
        self.tx.close();
        debug!("🏁 bulk queue closed, waiting on {} workers", self.workers.len());
        let outcomes = futures::future::try_join_all(self.workers)
            .await
            .context("💀 A bulk worker panicked or was cancelled before finishing its shift.")?;
        for outcome in outcomes {
            outcome.context("💀 A bulk worker clocked out with an error.")?;
        }
        let stats = self.counters.snapshot(self.started_at.elapsed());
        info!(
            "🏁 bulk indexer closed: {} added, {} flushed, {} indexed, {} failed over {} requests",
            stats.num_added, stats.num_flushed, stats.num_indexed, stats.num_failed, stats.num_requests
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// 🎭 Reads the NDJSON it was sent and answers one verdict per document.
    /// Documents containing `reject` get a 400 mapper error; everything else is created.
    struct VerdictPerDocument {
        reject: Option<&'static str>,
    }

    impl Respond for VerdictPerDocument {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body = String::from_utf8_lossy(&request.body);
            let items: Vec<serde_json::Value> = body
                .lines()
                .skip(1)
                .step_by(2)
                .map(|doc| match self.reject {
                    Some(marker) if doc.contains(marker) => serde_json::json!({"index": {
                        "_index": "address", "status": 400,
                        "error": {"type": "mapper_parsing_exception", "reason": "failed to parse"}
                    }}),
                    _ => serde_json::json!({"index": {"_index": "address", "status": 201, "result": "created"}}),
                })
                .collect();
            let errors = items.iter().any(|i| i["index"]["status"] != 201);
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"took": 1, "errors": errors, "items": items}))
        }
    }

    fn a_config(num_workers: usize) -> BulkIndexerConfig {
        BulkIndexerConfig {
            num_workers,
            queue_capacity: num_workers,
            flush_interval: Duration::from_secs(3600),
            ..Default::default()
        }
    }

    async fn add_numbered(indexer: &BulkIndexer, count: u64) -> Result<()> {
        for n in 1..=count {
            indexer.add(BulkItem::index(&serde_json::json!({ "n": n }))?).await?;
        }
        Ok(())
    }

    async fn requests_seen(server: &MockServer) -> usize {
        server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }

    #[tokio::test]
    async fn the_one_where_the_cluster_accepts_everything() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(VerdictPerDocument { reject: None })
            .mount(&the_server)
            .await;

        let the_successes = Arc::new(AtomicU64::new(0));
        let the_indexer =
            BulkIndexer::new(ElasticsearchClient::impatient(the_server.uri()), a_config(3))?;
        for n in 0..25 {
            let the_witness = Arc::clone(&the_successes);
            let the_item = BulkItem::index(&serde_json::json!({ "n": n }))?
                .with_on_success(move |_| {
                    the_witness.fetch_add(1, Ordering::SeqCst);
                });
            the_indexer.add(the_item).await?;
        }
        let the_stats = the_indexer.close().await?;

        assert_eq!(the_stats.num_added, 25);
        assert_eq!(the_stats.num_flushed, 25);
        assert_eq!(the_stats.num_indexed, 25);
        assert_eq!(the_stats.num_failed, 0);
        assert_eq!(the_successes.load(Ordering::SeqCst), 25);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_close_ships_the_half_empty_pallet() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(VerdictPerDocument { reject: None })
            .expect(1)
            .mount(&the_server)
            .await;

        let the_indexer =
            BulkIndexer::new(ElasticsearchClient::impatient(the_server.uri()), a_config(1))?;
        add_numbered(&the_indexer, 3).await?;
        assert_eq!(requests_seen(&the_server).await, 0, "nothing ships before close");

        let the_stats = the_indexer.close().await?;
        assert_eq!(the_stats.num_requests, 1);
        assert_eq!(the_stats.num_indexed, 3);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_flush_bytes_splits_the_batch() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(VerdictPerDocument { reject: None })
            .expect(2)
            .mount(&the_server)
            .await;

        // -- 📏 each item is 31 bytes of action line + 8 bytes of {"n":N} = 39.
        // -- two fit under 80, the third would reach it.
        let the_indexer = BulkIndexer::new(
            ElasticsearchClient::impatient(the_server.uri()),
            BulkIndexerConfig {
                flush_bytes: 80,
                ..a_config(1)
            },
        )?;
        add_numbered(&the_indexer, 4).await?;
        let the_stats = the_indexer.close().await?;

        assert_eq!(the_stats.num_requests, 2);
        assert_eq!(the_stats.num_indexed, 4);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_interval_flushes_without_waiting_for_close() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(VerdictPerDocument { reject: None })
            .mount(&the_server)
            .await;

        let the_indexer = BulkIndexer::new(
            ElasticsearchClient::impatient(the_server.uri()),
            BulkIndexerConfig {
                flush_interval: Duration::from_millis(20),
                ..a_config(1)
            },
        )?;
        add_numbered(&the_indexer, 2).await?;
        for _ in 0..100 {
            if the_indexer.stats().num_indexed == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(the_indexer.stats().num_indexed, 2);
        assert_eq!(the_indexer.close().await?.num_requests, 1);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_two_503s_are_forgiven() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&the_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(VerdictPerDocument { reject: None })
            .expect(1)
            .mount(&the_server)
            .await;

        let the_indexer =
            BulkIndexer::new(ElasticsearchClient::impatient(the_server.uri()), a_config(1))?;
        add_numbered(&the_indexer, 3).await?;
        let the_stats = the_indexer.close().await?;

        assert_eq!(the_stats.num_failed, 0);
        assert_eq!(the_stats.num_indexed, 3);
        assert_eq!(the_stats.num_requests, 1, "retries are transport business");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_permanent_503_fails_every_item() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(503))
            .expect(5)
            .mount(&the_server)
            .await;

        let the_local_errors = Arc::new(AtomicU64::new(0));
        let the_indexer =
            BulkIndexer::new(ElasticsearchClient::impatient(the_server.uri()), a_config(1))?;
        for n in 0..4 {
            let the_witness = Arc::clone(&the_local_errors);
            let the_item = BulkItem::index(&serde_json::json!({ "n": n }))?.with_on_failure(
                move |verdict, err| {
                    if verdict.is_none() && err.is_some() {
                        the_witness.fetch_add(1, Ordering::SeqCst);
                    }
                },
            );
            the_indexer.add(the_item).await?;
        }
        let the_stats = the_indexer.close().await?;

        assert_eq!(the_stats.num_added, 4);
        assert_eq!(the_stats.num_failed, 4);
        assert_eq!(the_stats.num_flushed, 0);
        assert_eq!(the_stats.num_indexed, 0);
        assert_eq!(the_local_errors.load(Ordering::SeqCst), 4);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_one_rejected_document_stays_alone_in_its_failure() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(VerdictPerDocument {
                reject: Some("reject-me"),
            })
            .mount(&the_server)
            .await;

        let the_rejection = Arc::new(std::sync::Mutex::new(String::new()));
        let the_indexer =
            BulkIndexer::new(ElasticsearchClient::impatient(the_server.uri()), a_config(1))?;
        add_numbered(&the_indexer, 2).await?;
        let the_witness = Arc::clone(&the_rejection);
        the_indexer
            .add(
                BulkItem::index(&serde_json::json!({ "city": "reject-me" }))?.with_on_failure(
                    move |verdict, _| {
                        if let Some(kind) = verdict.and_then(|v| v.error.as_ref()).map(|e| e.kind.clone()) {
                            *the_witness.lock().expect("not poisoned") = kind;
                        }
                    },
                ),
            )
            .await?;
        add_numbered(&the_indexer, 2).await?;
        let the_stats = the_indexer.close().await?;

        assert_eq!(the_stats.num_flushed, 5);
        assert_eq!(the_stats.num_indexed, 4);
        assert_eq!(the_stats.num_failed, 1);
        assert_eq!(
            *the_rejection.lock().expect("not poisoned"),
            "mapper_parsing_exception"
        );
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_forgotten_verdict_counts_as_a_failure() -> Result<()> {
        let the_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"took":1,"errors":false,"items":[{"index":{"_index":"address","status":201}}]}"#,
            ))
            .mount(&the_server)
            .await;

        let the_indexer =
            BulkIndexer::new(ElasticsearchClient::impatient(the_server.uri()), a_config(1))?;
        add_numbered(&the_indexer, 2).await?;
        let the_stats = the_indexer.close().await?;

        assert_eq!(the_stats.num_flushed, 2);
        assert_eq!(the_stats.num_indexed, 1);
        assert_eq!(the_stats.num_failed, 1);
        Ok(())
    }
}
