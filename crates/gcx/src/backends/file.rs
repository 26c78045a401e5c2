//! 📂 Previously, on "Things That Could Go Wrong With A File"...
//!
//! The disk was quiet. Too quiet. A lone process had been tasked with writing
//! down every address that didn't make the cut. Simple, they said.
//! The directory didn't exist. The disk was full. The rest is history.
//!
//! 🚰 Diagnostic → BufWriter → one line per row that didn't make it
//! 💀 Disk full → your problem now
//! 🦆 (mandatory, no notes)

mod file_sink;

pub use file_sink::{FileSink, FileSinkConfig};
