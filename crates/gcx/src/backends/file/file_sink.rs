use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    fs::File,
    io::{self, AsyncWriteExt},
};
use tracing::trace;

use crate::backends::Sink;

// -- 🚰 FileSinkConfig — lives right next to the FileSink that uses it.
// -- One backend = one config = one file. No "where is that config defined" scavenger hunt at 2am.
#[derive(Debug, Deserialize, Clone)]
pub struct FileSinkConfig {
    pub file_name: String,
}

/// 🚰 FileSink — one diagnostic per line, appended to a freshly truncated file.
///
/// It's a BufWriter around a tokio `File`. Simple. Honest. Does not complain.
/// Does not retry. Does not have opinions about your data format.
///
/// ⚠️ `File::create` truncates if the file exists. Each run starts with a clean error
/// report. Last run's sins are forgiven (and deleted).
#[derive(Debug)]
pub struct FileSink {
    file_buf: io::BufWriter<File>,
    sink_config: FileSinkConfig,
    lines_written: u64,
}

impl FileSink {
    /// 🚀 Creates (or obliterates and recreates) the sink file and wraps it in a BufWriter.
    pub async fn new(sink_config: FileSinkConfig) -> Result<Self> {
        // -- 💀 The file refused to be born. Perhaps the directory didn't exist. Perhaps permissions
        // -- were set by someone who really, truly, did not want this file to exist.
        let file_handle = File::create(&sink_config.file_name).await.context(format!(
            "💀 The error report '{}' could not be conjured into existence. \
                We stared at the path. The path stared back. \
                One of us was wrong about whether the parent directory existed. \
                It was us. It was always us.",
            &sink_config.file_name
        ))?;
        // -- 📦 BufWriter: because one syscall per bad row is a war crime on a county-sized file.
        let file_buf = io::BufWriter::new(file_handle);
        Ok(Self {
            file_buf,
            sink_config,
            lines_written: 0,
        })
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn send(&mut self, line: String) -> Result<()> {
        self.file_buf.write_all(line.as_bytes()).await?;
        self.file_buf.write_all(b"\n").await?;
        self.lines_written += 1;
        Ok(())
    }

    /// 🗑️ Flush the BufWriter and close up shop.
    ///
    /// `flush()` is called explicitly here rather than relying on Drop because async
    /// Drop is not a thing in Rust yet. Without it, the last few diagnostics sit in the
    /// buffer, warm and cozy, never making it to disk.
    async fn close(&mut self) -> Result<()> {
        trace!(
            "🎬 final flush of '{}' — {} diagnostics written down for posterity",
            self.sink_config.file_name,
            self.lines_written
        );
        self.file_buf.flush().await.context(
            // -- 💀 The data was SO CLOSE. It was in the buffer. It could SEE the disk.
            "💀 Error flushing the error report — the buffer held its diagnostics to the very end, \
            like a hoarder who finally agreed to let go, only for the storage unit to be locked.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_each_send_becomes_one_line_on_disk() -> Result<()> {
        let the_dir = tempfile::tempdir()?;
        let the_path = the_dir.path().join("normalize_errors.txt");
        let mut the_sink = FileSink::new(FileSinkConfig {
            file_name: the_path.to_string_lossy().into_owned(),
        })
        .await?;

        the_sink.send("Error: first | Original line: a,b".into()).await?;
        the_sink.send("Error: second | Original line: c,d".into()).await?;
        the_sink.close().await?;

        let the_contents = tokio::fs::read_to_string(&the_path).await?;
        assert_eq!(
            the_contents,
            "Error: first | Original line: a,b\nError: second | Original line: c,d\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_missing_directory_is_a_loud_error() {
        let the_result = FileSink::new(FileSinkConfig {
            file_name: "/definitely/not/a/real/dir/errors.txt".into(),
        })
        .await;
        assert!(the_result.is_err());
    }
}
