use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::progress::format_number;

/// 🔢 The live tally, shared by the indexer handle and every worker.
#[derive(Debug, Default)]
pub(crate) struct BulkCounters {
    pub(crate) added: AtomicU64,
    pub(crate) flushed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) indexed: AtomicU64,
    pub(crate) requests: AtomicU64,
}

impl BulkCounters {
    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, elapsed: Duration) -> BulkStats {
        BulkStats {
            num_added: self.added.load(Ordering::Relaxed),
            num_flushed: self.flushed.load(Ordering::Relaxed),
            num_failed: self.failed.load(Ordering::Relaxed),
            num_indexed: self.indexed.load(Ordering::Relaxed),
            num_requests: self.requests.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// 📊 How the load went, in numbers. Final once `BulkIndexer::close` returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkStats {
    /// 📥 Items accepted by `add`.
    pub num_added: u64,
    /// 📡 Items whose bulk request came back with a parsable response.
    pub num_flushed: u64,
    pub num_failed: u64,
    pub num_indexed: u64,
    pub num_requests: u64,
    pub elapsed: Duration,
}

impl BulkStats {
    pub fn docs_per_second(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.num_flushed as f64 / seconds
    }

    /// 📣 The one line the run is remembered by. The count is what got indexed;
    /// the rate is what got flushed.
    pub fn summary_line(&self) -> String {
        let took = Duration::from_millis(self.elapsed.as_millis() as u64);
        let rate = format_number(self.docs_per_second() as u64);
        if self.num_failed > 0 {
            format!(
                "Indexed [{}] documents with [{}] errors in {:?} ({} docs/sec)",
                format_number(self.num_indexed),
                format_number(self.num_failed),
                took,
                rate
            )
        } else {
            format!(
                "Successfully indexed [{}] documents in {:?} ({} docs/sec)",
                format_number(self.num_indexed),
                took,
                rate
            )
        }
    }
}
