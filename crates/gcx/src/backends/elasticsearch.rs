//! # 📡 THE ELASTICSEARCH BACKEND
//!
//! *Previously, on gcx...*
//!
//! 🎬 COLD OPEN — INT. SERVER ROOM — 3:47 AM
//!
//! The monitoring dashboard glows amber in the dark. One engineer, alone,
//! stares at a county's worth of addresses and a cluster that just said 429.
//! "I'll just reload it," they whispered. "It'll be fast," they said.
//! "Elasticsearch scales horizontally," someone lied, once, at a conference.
//!
//! 🚀 This module is everything gcx says to a cluster:
//! - [`ElasticsearchClient`]: one shared HTTP handle, auth, and the transport retry policy
//! - `_bulk` submission and the per-item verdicts in [`BulkResponse`]
//! - index lifecycle: exists, create from a mapping, delete, and the setup modes
//!
//! ⚠️ If you are reading this at 3am during an incident, take a breath.
//! The data is fine. Probably. The cluster is fine. Mostly. You are fine. Debatable.
//!
//! 🦆 (mandatory duck, no context provided, none shall be requested)

mod bulk_response;
mod elasticsearch_client;
mod index_lifecycle;
mod retry;

pub use bulk_response::{BulkItemError, BulkResponse, BulkResponseItem};
pub use elasticsearch_client::{ElasticsearchClient, ElasticsearchSinkConfig};
pub use index_lifecycle::{IndexSetupConfig, IndexSetupMode};
pub use retry::{ExponentialBackoff, RetryConfig};
