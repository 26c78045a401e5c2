//! # Previously, on gcx...
//!
//! 🎬 The diagnostics needed somewhere to go that wasn't a disk. Somewhere
//! a test could peek at afterwards. Somewhere gone the moment you blink.
//!
//! `in_mem` provides an in-memory [`Sink`](crate::backends::Sink) for tests and
//! dry runs. No network calls. No disk I/O. Just vibes and heap memory. 🦆

mod in_mem_sink;

pub use in_mem_sink::InMemorySink;
