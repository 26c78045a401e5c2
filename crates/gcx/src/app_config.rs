//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! Env vars use the `GCX_` prefix and `__` between nesting levels:
//! `GCX_SINK_CONFIG__URL`, `GCX_RUNTIME__NUM_WORKERS`, `GCX_SINK_CONFIG__RETRY__MAX_ATTEMPTS`.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::{ElasticsearchSinkConfig, FileSinkConfig};

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📄 Where the addresses come from.
    pub source_config: CsvSourceConfig,
    /// 💀 Where the rows that didn't make it get written down.
    pub error_sink_config: ErrorSinkConfig,
    /// 📡 Where the rows that did make it get sent.
    pub sink_config: ElasticsearchSinkConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsvSourceConfig {
    pub file_name: String,
    /// 📊 How often (in data rows) the progress display gets redrawn.
    #[serde(default = "default_progress_every_rows")]
    pub progress_every_rows: u64,
}

fn default_progress_every_rows() -> u64 {
    10_000
}

/// 🎭 The error report's destination. `[error_sink_config.File]` with a `file_name`,
/// or `error_sink_config = "InMemory"` to keep the bad news in RAM.
#[derive(Debug, Deserialize, Clone)]
pub enum ErrorSinkConfig {
    File(FileSinkConfig),
    InMemory,
}

/// 🎛️ How hard to work and how much to hold at once.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// 🧵 Bulk workers running concurrently.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// 📦 Slots in the bulk queue. Unset means one per worker.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    /// 📏 A worker flushes before the next document would bring its batch to this size.
    #[serde(default = "default_flush_bytes")]
    pub flush_bytes: usize,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// 🚰 Events the producer may get ahead of the consumer. 1 is the floor.
    #[serde(default = "default_pipeline_channel_capacity")]
    pub pipeline_channel_capacity: usize,
    /// 🚨 Exit non-zero when any document fails to index.
    #[serde(default = "default_fail_on_partial_failure")]
    pub fail_on_partial_failure: bool,
}

fn default_num_workers() -> usize {
    5
}

// -- 📏 5 MiB. big enough to be worth the round trip, small enough not to upset the cluster.
fn default_flush_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_flush_interval_ms() -> u64 {
    30_000
}

fn default_pipeline_channel_capacity() -> usize {
    1
}

fn default_fail_on_partial_failure() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            queue_capacity: None,
            flush_bytes: default_flush_bytes(),
            flush_interval_ms: default_flush_interval_ms(),
            pipeline_channel_capacity: default_pipeline_channel_capacity(),
            fail_on_partial_failure: default_fail_on_partial_failure(),
        }
    }
}

impl RuntimeConfig {
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.num_workers)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of hoping.
///
/// 📐 DESIGN NOTE (no cap, this is tribal knowledge):
///   - If `config_file_name` is None  → env vars only. No file. No assumptions.
///   - If `config_file_name` is Some  → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Returns an error if config is unparseable, or if a required key (the CSV path,
/// the error sink, the cluster url) is missing from every layer.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    // -- 💀 Toml::file shrugs at a missing file. we don't: a path you named is a path you meant.
    if let Some(path) = config_file_name {
        if !path.exists() {
            anyhow::bail!(
                "💀 Config file '{}' does not exist. We looked everywhere. Under the couch. Behind the fridge. Nothing.",
                path.display()
            );
        }
    }

    let config = Figment::new().merge(Env::prefixed("GCX_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (GCX_*). \
             The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (GCX_*). \
                 No file was provided — this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
