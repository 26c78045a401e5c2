//! 🔌 Backends — where the real I/O happens.
//!
//! 🚰 Diagnostic sinks catch the rows that didn't make it. The Elasticsearch client
//! catches the ones that did. And in between, we panic! (kidding, we use anyhow)
//!
//! 🎭 This module is the casting agency. Need the bad news on disk? In RAM for a test?
//! Need documents shipped to a cluster with retries and a healthy fear of 503s?
//! We've got a backend for that.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

pub mod elasticsearch;
pub mod file;
pub mod in_mem;
mod sink;

pub use elasticsearch::{
    BulkItemError, BulkResponse, BulkResponseItem, ElasticsearchClient, ElasticsearchSinkConfig,
    ExponentialBackoff, IndexSetupConfig, IndexSetupMode, RetryConfig,
};
pub use file::{FileSink, FileSinkConfig};
pub use in_mem::InMemorySink;
pub use sink::{Sink, SinkBackend};
