//! 🔄 Transforms — the Rosetta Stone of address normalization 🎭🚀
//!
//! ```text
//!   RawRecord ──IngestTransform──▶ CanonicalAddress ──From──▶ IndexDocument
//!   (strings)   (may fail per row)  (typed, trusted)   (total)  (wire shape)
//! ```
//!
//! Ingest transforms are zero-sized marker types, one per data source. Today
//! there is exactly one source, so today there is exactly one marker. When a
//! second county shows up with its own creative interpretation of "house
//! number", it gets its own marker and nobody else's cleansing rules change.
//!
//! The egress side is a plain `From` impl because mapping a validated address
//! into a document cannot fail. If it could fail, the validator upstream has
//! a bug, and the fix belongs there. 🦆

use crate::common::CanonicalAddress;
use crate::records::{RawRecord, RecordError};

pub mod document;
pub mod normalize;

pub use normalize::{CountyAddressPoints, cleanse_address_number};

/// 📥 Turns one validated raw record into a canonical address for a specific source.
///
/// # Contract 📜
/// - Input has already passed `records::check_required_fields`
/// - Each step fails independently; the first failure is returned
/// - No partial addresses. Ever. It's all or nothing, like a group project grade.
pub trait IngestTransform {
    fn transform_record(raw: &RawRecord) -> Result<CanonicalAddress, RecordError>;
}
