use anyhow::Result;
use async_trait::async_trait;

use crate::app_config::ErrorSinkConfig;
use crate::backends::{file, in_mem};

/// 🕳️ A sink for diagnostic lines — pure I/O, zero logic.
///
/// The drain at the bottom of the "this row didn't make it" tub.
/// One `send` = one line. The sink adds the line terminator if its medium needs one.
///
/// # Contract 📜
/// - `send` accepts one rendered line, without a trailing newline, and writes it.
/// - `close` flushes and finalizes. MUST be called. Skipping `close` is a bug.
///   It is also considered rude.
/// - Formatting happens upstream (see `common::Diagnostic`), NOT here.
#[async_trait]
pub trait Sink: std::fmt::Debug + Send {
    /// 📡 Write one line to the destination. I/O only. No questions asked.
    async fn send(&mut self, line: String) -> Result<()>;
    /// 🗑️ Flush, finalize, and release. Call this. Always. No exceptions. Not even on Fridays.
    async fn close(&mut self) -> Result<()>;
}

/// 🎭 The many faces of a diagnostic sink.
///
/// The enum dispatches `send` and `close` to the inner concrete type, keeping the
/// pipeline consumer blissfully ignorant of where the bad news lands.
#[derive(Debug)]
pub enum SinkBackend {
    InMemory(in_mem::InMemorySink),
    File(file::FileSink),
}

impl SinkBackend {
    /// 🔧 Resolve and open the sink named by the config.
    pub async fn from_config(config: &ErrorSinkConfig) -> Result<Self> {
        match config {
            ErrorSinkConfig::File(file_config) => {
                Ok(Self::File(file::FileSink::new(file_config.clone()).await?))
            }
            ErrorSinkConfig::InMemory => Ok(Self::InMemory(in_mem::InMemorySink::new())),
        }
    }
}

#[async_trait]
impl Sink for SinkBackend {
    async fn send(&mut self, line: String) -> Result<()> {
        match self {
            SinkBackend::InMemory(sink) => sink.send(line).await,
            SinkBackend::File(sink) => sink.send(line).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            SinkBackend::InMemory(sink) => sink.close().await,
            SinkBackend::File(sink) => sink.close().await,
        }
    }
}
