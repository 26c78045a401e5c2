//! 📦 Common data structures — the building blocks of gcx
//!
//! 🎬 COLD OPEN — EXT. A CUL-DE-SAC IN COOK COUNTY — 3:47 AM
//!
//! Somewhere a mailbox leans slightly to the left. Its number is "123 1/2".
//! Nobody knows what half a house is. The CSV certainly doesn't. And yet,
//! by the end of this pipeline, that mailbox will be a tidy `i64` with a
//! latitude and a longitude and a place in the index. Redemption arc. 🦆
//!
//! This module holds the structs that ferry an address from "string soup"
//! to "document the cluster will accept":
//! - [`CanonicalAddress`] — validated, typed, immutable. Earned its stripes.
//! - [`IndexDocument`] + [`LatLong`] — the wire shape the index expects.
//! - [`Diagnostic`] — the postcard we write when a row didn't make it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 🏠 A fully validated address. If you're holding one of these, every required
/// field was present, the house number survived cleansing, and both coordinates
/// landed inside [-90, 90].
///
/// 🔒 Fields are crate-private: outside this crate the only way to get one is
/// through the normalizer, which is the whole point. Read accessors are public.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalAddress {
    pub(crate) number: i64,
    pub(crate) street_prefix: String,
    pub(crate) street: String,
    pub(crate) street_suffix: String,
    pub(crate) city: String,
    pub(crate) state: String,
    pub(crate) zip5: String,
    pub(crate) zip_last_4: String,
    pub(crate) longitude: f64,
    pub(crate) latitude: f64,
}

impl CanonicalAddress {
    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn street_prefix(&self) -> &str {
        &self.street_prefix
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn street_suffix(&self) -> &str {
        &self.street_suffix
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn zip5(&self) -> &str {
        &self.zip5
    }

    pub fn zip_last_4(&self) -> &str {
        &self.zip_last_4
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

/// 📡 The document shape the index actually stores. One-to-one with
/// [`CanonicalAddress`], except the coordinates move into their own little
/// apartment under `lat_long` so the mapping can call it a `geo_point`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub number: i64,
    pub street_prefix: String,
    pub street: String,
    pub street_suffix: String,
    pub city: String,
    pub state: String,
    pub zip_5: String,
    pub zip_last_4: String,
    pub lat_long: LatLong,
}

/// 🌐 lon first, lat second. Same order as the CSV. Same order as GeoJSON.
/// Not the same order as every human who has ever said "lat/long". Sorry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLong {
    pub lon: f64,
    pub lat: f64,
}

/// 💀 A row that didn't make it, written as one line for the error sink.
///
/// Format: `Error: <message> | Original line: <comma-joined raw fields>`.
/// It's a string. It stays a string. Nobody downstream parses it, and if they
/// do, that's between them and their regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic(String);

impl Diagnostic {
    /// 🔧 Pair an error with the row that caused it. The row is joined with plain
    /// commas, no quoting, so a cell that had a comma in it will look ambiguous.
    /// It's a diagnostic, not a round-trip format.
    pub fn new(error: &impl fmt::Display, row: &[&str]) -> Self {
        Self(format!("Error: {} | Original line: {}", error, row.join(",")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
