//! 🧵 Workers: the ones who actually do the work while the job driver takes all the
//! credit in the sprint retro.
//!
//! Two kinds clock in during a run. The row producer reads the CSV on a blocking
//! thread. The bulk workers ship batches to the cluster on the async runtime.
//! Both hand back a `JoinHandle` so whoever started them can find out how it went. 🦆

use anyhow::Result;
use tokio::task::JoinHandle;

/// 🏗️ A background worker, that does work. duh.
///
/// `start` consumes the worker and spawns it. The handle resolves when the worker is
/// done, with whatever error stopped it early.
pub trait Worker {
    fn start(self) -> JoinHandle<Result<()>>;
}
