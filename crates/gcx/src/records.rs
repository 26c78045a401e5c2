//! 📄 Records — from "a row of strings" to "a row of strings with names".
//!
//! 🎬 *[a CSV row enters. it has 25 columns. we care about 10.]*
//! *[the other 15 sit in the back, unmapped, unloved, unindexed.]*
//!
//! This module owns the column-position contract for the county address points
//! export, the header check that proves the contract still holds, and the
//! required-field validator. It does NOT parse numbers. That's the normalizer's
//! job, over in `transforms::normalize`. Division of labor. Very corporate. 🦆
//!
//! ⚠️ The same mapper runs on the header row and on data rows. If the county
//! ever shuffles its columns, the header check catches it before a single
//! street name ends up in the `city` field.

use std::fmt;

use thiserror::Error;

// 📍 Zero-based column positions in the county export. Change one, change the header too.
const NUMBER_COLUMN: usize = 3;
const STREET_PREFIX_COLUMN: usize = 4;
const STREET_COLUMN: usize = 5;
const STREET_SUFFIX_COLUMN: usize = 6;
const CITY_COLUMN: usize = 10;
const STATE_COLUMN: usize = 12;
const ZIP5_COLUMN: usize = 13;
const ZIP_LAST_4_COLUMN: usize = 14;
const LONGITUDE_COLUMN: usize = 21;
const LATITUDE_COLUMN: usize = 22;

/// 🏷️ Header names expected at the mapped positions, in field order.
pub const EXPECTED_HEADER: [&str; 10] = [
    "ADDRNOCOM",
    "STNAMEPRD",
    "STNAME",
    "STNAMEPOT",
    "USPSPN",
    "USPSST",
    "ZIP5",
    "ZIP4",
    "XPOSITION",
    "YPOSITION",
];

/// 📦 One unvalidated row, fields pulled by position. Strings all the way down.
///
/// Lives for exactly as long as validation + normalization takes, then it's gone.
/// Like a mayfly. A mayfly made of `String`s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub number: String,
    pub street_prefix: String,
    pub street: String,
    pub street_suffix: String,
    pub city: String,
    pub state: String,
    pub zip5: String,
    pub zip_last_4: String,
    pub longitude: String,
    pub latitude: String,
}

impl RawRecord {
    /// 🔧 Map a row by fixed column positions. No validation, no trimming, no opinions.
    ///
    /// A row that's too short yields empty strings for the missing positions,
    /// which the validator will then happily report as missing. No panics here.
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Self {
        let cell = |idx: usize| {
            row.get(idx)
                .map(|c| c.as_ref().to_string())
                .unwrap_or_default()
        };
        Self {
            number: cell(NUMBER_COLUMN),
            street_prefix: cell(STREET_PREFIX_COLUMN),
            street: cell(STREET_COLUMN),
            street_suffix: cell(STREET_SUFFIX_COLUMN),
            city: cell(CITY_COLUMN),
            state: cell(STATE_COLUMN),
            zip5: cell(ZIP5_COLUMN),
            zip_last_4: cell(ZIP_LAST_4_COLUMN),
            longitude: cell(LONGITUDE_COLUMN),
            latitude: cell(LATITUDE_COLUMN),
        }
    }

    /// 📋 The ten fields in declaration order. Handy for comparing against headers.
    pub fn fields(&self) -> [&str; 10] {
        [
            &self.number,
            &self.street_prefix,
            &self.street,
            &self.street_suffix,
            &self.city,
            &self.state,
            &self.zip5,
            &self.zip_last_4,
            &self.longitude,
            &self.latitude,
        ]
    }
}

impl fmt::Display for RawRecord {
    /// `{number street_prefix ... latitude}` — compact enough for a one-line diagnostic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.fields().join(" "))
    }
}

/// 💀 Everything that can go wrong with one row (plus the header, which is one row
/// with delusions of grandeur).
///
/// Every variant carries the full raw record, because "could not parse" without
/// the input is a riddle, and we are not in the riddle business.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("error mapping header columns. expected: {expected} actual: {actual}")]
    HeaderMismatch {
        expected: RawRecord,
        actual: RawRecord,
    },

    #[error("missing required fields- {} raw data struct- {raw}", .fields.join(","))]
    MissingFields {
        fields: Vec<&'static str>,
        raw: RawRecord,
    },

    #[error(
        "could not parse address number to int. cleansed number- {cleansed} raw number- {} full struct- {raw}",
        .raw.number
    )]
    UnparsableNumber { cleansed: String, raw: RawRecord },

    #[error("could not parse address {axis} to float64. {axis}- {value} full struct- {raw}")]
    UnparsableCoordinate {
        axis: &'static str,
        value: String,
        raw: RawRecord,
    },

    // -- 📏 six decimals, always. "123.5" reads back as "123.500000" in the error report.
    #[error("{axis} is outside of logical range. {axis}- {value:.6} full struct- {raw}")]
    CoordinateOutOfRange {
        axis: &'static str,
        value: f64,
        raw: RawRecord,
    },
}

/// 🏷️ The header tuple as a record, so it can be compared field for field.
pub fn expected_header() -> RawRecord {
    let [number, street_prefix, street, street_suffix, city, state, zip5, zip_last_4, longitude, latitude] =
        EXPECTED_HEADER.map(str::to_string);
    RawRecord {
        number,
        street_prefix,
        street,
        street_suffix,
        city,
        state,
        zip5,
        zip_last_4,
        longitude,
        latitude,
    }
}

/// 🔒 Prove the column contract still holds. Call it on the mapped header row.
///
/// Any difference at all is fatal for the run. Positions that are wrong for the
/// header are wrong for every row below it, just quieter about it.
pub fn check_header(header: &RawRecord) -> Result<(), RecordError> {
    let expected = expected_header();
    if *header == expected {
        Ok(())
    } else {
        Err(RecordError::HeaderMismatch {
            expected,
            actual: header.clone(),
        })
    }
}

/// ✅ Check every required field at once and report all the missing ones together.
///
/// Not fail-fast on purpose: one diagnostic that says "number,city,zip5" beats three
/// separate reruns. Optional fields (street_prefix, street_suffix, zip_last_4) are
/// allowed to be empty.
pub fn check_required_fields(raw: &RawRecord) -> Result<(), RecordError> {
    let is_blank = |s: &str| s.trim().is_empty();

    let required: [(&'static str, &str); 7] = [
        ("number", &raw.number),
        ("street", &raw.street),
        ("city", &raw.city),
        ("state", &raw.state),
        ("zip5", &raw.zip5),
        ("longitude", &raw.longitude),
        ("latitude", &raw.latitude),
    ];

    let missing: Vec<&'static str> = required
        .iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(RecordError::MissingFields {
            fields: missing,
            raw: raw.clone(),
        })
    }
}
