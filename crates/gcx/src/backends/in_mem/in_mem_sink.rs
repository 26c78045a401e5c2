use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::Sink;

/// 📦 A sink that never forgets. Unlike my dad, who forgot my soccer game in 1998.
///
/// `InMemorySink` hoards diagnostic lines in a shared Vec wrapped in a Mutex wrapped
/// in an Arc. It's types all the way down.
///
/// Clone-able because tests need to peek inside after handing `self` off to the
/// pipeline. The `Arc` means every clone shares the same Vec.
#[derive(Debug, Default, Clone)]
pub struct InMemorySink {
    /// 🔒 The evidence locker. Each entry = one line, in the order it arrived.
    pub received: Arc<Mutex<Vec<String>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📋 Snapshot of everything received so far.
    pub async fn lines(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn send(&mut self, line: String) -> Result<()> {
        // 🔒 The Mutex is load-bearing. Do not remove. I know it looks optional. It isn't.
        self.received.lock().await.push(line);
        Ok(())
    }

    /// 🗑️ Nothing to flush. We live in RAM. Why did the in-memory sink go to therapy?
    /// It had trouble letting go. (The Arc kept bumping the ref count.)
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
