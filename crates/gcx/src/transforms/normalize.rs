//! 🧼 Normalize — where a RawRecord goes in with string soup and comes out with types.
//!
//! 🎬 COLD OPEN — INT. COUNTY RECORDS OFFICE — SOMETIME IN 1987
//!
//! A clerk types "123 1/2" into the house number field. Another types "123-A".
//! A third, feeling adventurous, types "123.5". Thirty years later all three
//! land in our CSV, and every one of them wants to be an integer. This module
//! makes that happen, or writes a very specific note explaining why it couldn't.
//!
//! Three steps, each a place where a row can bow out:
//! 1. number: first token, letters and hyphens stripped, parsed as `i64`
//! 2. longitude: parsed as `f64`, must sit in [-90, 90]
//! 3. latitude: same deal
//!
//! ⚠️ Yes, the longitude bound is ±90 and not ±180. The county fits comfortably
//! inside it. Widening it is a decision, not a bugfix. 🦆

use super::IngestTransform;
use crate::common::CanonicalAddress;
use crate::records::{RawRecord, RecordError};

/// 📏 Coordinate sanity bounds, inclusive, applied to both axes.
pub const MIN_COORDINATE: f64 = -90.0;
pub const MAX_COORDINATE: f64 = 90.0;

/// 🏛️ The county address points export. The only source we speak today.
///
/// The house-number cleansing rules are tuned to this export's known quirks,
/// which is why they live on a source-specific marker type instead of a free fn
/// that pretends to be universal.
pub struct CountyAddressPoints;

impl IngestTransform for CountyAddressPoints {
    fn transform_record(raw: &RawRecord) -> Result<CanonicalAddress, RecordError> {
        let cleansed = cleanse_address_number(&raw.number);
        let number: i64 = cleansed
            .parse()
            .map_err(|_| RecordError::UnparsableNumber {
                cleansed: cleansed.clone(),
                raw: raw.clone(),
            })?;

        let longitude = parse_coordinate("longitude", &raw.longitude, raw)?;
        let latitude = parse_coordinate("latitude", &raw.latitude, raw)?;

        Ok(CanonicalAddress {
            number,
            street_prefix: raw.street_prefix.clone(),
            street: raw.street.clone(),
            street_suffix: raw.street_suffix.clone(),
            city: raw.city.clone(),
            state: raw.state.clone(),
            zip5: raw.zip5.clone(),
            zip_last_4: raw.zip_last_4.clone(),
            longitude,
            latitude,
        })
    }
}

/// 🔧 Squeeze a house number down to something `parse::<i64>()` can stomach.
///
/// - `"123.5"`   → `"123"` (decimals are lot numbers wearing a disguise)
/// - `"123 1/2"` → `"123"` (half a house is still a house)
/// - `"123A"`    → `"123"`
/// - `"123-A"`   → `"123"`
///
/// Input with no token at all (`""`, `"..."`) cleanses to `""`, which then fails to
/// parse. That's the correct outcome: there was no number.
pub fn cleanse_address_number(input: &str) -> String {
    let head = input
        .split(|c: char| c == '.' || c.is_whitespace())
        .find(|token| !token.is_empty())
        .unwrap_or_default();

    head.chars()
        .filter(|c| !c.is_ascii_alphabetic() && *c != '-')
        .collect::<String>()
        .trim()
        .to_string()
}

/// 📡 Parse one coordinate and check it lands inside the bounds.
///
/// `contains` on the inclusive range rejects NaN and both infinities too, since
/// none of them are "inside" anything.
fn parse_coordinate(
    axis: &'static str,
    value: &str,
    raw: &RawRecord,
) -> Result<f64, RecordError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| RecordError::UnparsableCoordinate {
            axis,
            value: value.to_string(),
            raw: raw.clone(),
        })?;

    if !(MIN_COORDINATE..=MAX_COORDINATE).contains(&parsed) {
        return Err(RecordError::CoordinateOutOfRange {
            axis,
            value: parsed,
            raw: raw.clone(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a_record(number: &str, longitude: &str, latitude: &str) -> RawRecord {
        RawRecord {
            number: number.into(),
            street_prefix: "streetPrefix".into(),
            street: "street".into(),
            street_suffix: "streetSuffix".into(),
            city: "city".into(),
            state: "state".into(),
            zip5: "zip5".into(),
            zip_last_4: "zipLast4".into(),
            longitude: longitude.into(),
            latitude: latitude.into(),
        }
    }

    #[test]
    fn the_one_where_a_clean_row_becomes_a_canonical_address() -> anyhow::Result<()> {
        let the_address =
            CountyAddressPoints::transform_record(&a_record("1234", "57.684512", "-15.24568"))?;
        assert_eq!(
            the_address,
            CanonicalAddress {
                number: 1234,
                street_prefix: "streetPrefix".into(),
                street: "street".into(),
                street_suffix: "streetSuffix".into(),
                city: "city".into(),
                state: "state".into(),
                zip5: "zip5".into(),
                zip_last_4: "zipLast4".into(),
                longitude: 57.684512,
                latitude: -15.24568,
            }
        );
        Ok(())
    }

    #[test]
    fn the_one_where_garbage_numbers_get_no_address() {
        let the_error = CountyAddressPoints::transform_record(&a_record(
            "number",
            "57.684512",
            "-15.24568",
        ))
        .unwrap_err();
        assert!(matches!(the_error, RecordError::UnparsableNumber { .. }));
        assert!(the_error.to_string().contains("raw number- number"));
    }

    #[test]
    fn the_one_where_garbage_coordinates_get_no_address() {
        let the_bad_longitude =
            CountyAddressPoints::transform_record(&a_record("1234", "longitude", "-15.24568"));
        assert!(matches!(
            the_bad_longitude,
            Err(RecordError::UnparsableCoordinate { axis: "longitude", .. })
        ));

        let the_bad_latitude =
            CountyAddressPoints::transform_record(&a_record("1234", "57.684512", "latitude"));
        assert!(matches!(
            the_bad_latitude,
            Err(RecordError::UnparsableCoordinate { axis: "latitude", .. })
        ));
    }

    #[test]
    fn the_one_where_coordinates_past_ninety_are_turned_away_at_the_door() {
        for (lon, lat, axis) in [
            ("90.0001", "0", "longitude"),
            ("-90.0001", "0", "longitude"),
            ("0", "95", "latitude"),
            ("0", "-180", "latitude"),
            ("NaN", "0", "longitude"),
            ("0", "inf", "latitude"),
        ] {
            match CountyAddressPoints::transform_record(&a_record("1", lon, lat)) {
                Err(RecordError::CoordinateOutOfRange { axis: the_axis, .. }) => {
                    assert_eq!(the_axis, axis, "lon={lon} lat={lat}")
                }
                other => panic!("💀 expected {axis} out of range for ({lon}, {lat}), got {:?}", other),
            }
        }
    }

    #[test]
    fn the_one_where_an_out_of_range_coordinate_shows_all_six_decimals() {
        let the_error = CountyAddressPoints::transform_record(&a_record("1", "12.0", "123.5"))
            .expect_err("123.5 is past the pole");
        assert!(
            the_error
                .to_string()
                .starts_with("latitude is outside of logical range. latitude- 123.500000 full struct- {"),
            "{}",
            the_error
        );
    }

    #[test]
    fn the_one_where_the_edges_of_the_world_are_still_inside_it() -> anyhow::Result<()> {
        let the_corner = CountyAddressPoints::transform_record(&a_record("7", "-90", "90"))?;
        assert_eq!(the_corner.longitude(), -90.0);
        assert_eq!(the_corner.latitude(), 90.0);
        Ok(())
    }

    #[test]
    fn the_one_where_house_numbers_lose_their_fractions_and_letters() {
        assert_eq!(cleanse_address_number("123.5"), "123");
        assert_eq!(cleanse_address_number("123 1/2"), "123");
        assert_eq!(cleanse_address_number("123A"), "123");
        assert_eq!(cleanse_address_number("123-A"), "123");
        assert_eq!(cleanse_address_number(" 42"), "42");
        assert_eq!(cleanse_address_number("..."), "");
    }

    #[test]
    fn the_one_where_cleansed_numbers_parse_end_to_end() -> anyhow::Result<()> {
        for (raw, expected) in [("123.5", 123), ("123 1/2", 123), ("123A", 123), ("123-A", 123)] {
            let the_address = CountyAddressPoints::transform_record(&a_record(raw, "1", "1"))?;
            assert_eq!(the_address.number(), expected, "raw number {raw}");
        }
        Ok(())
    }
}
