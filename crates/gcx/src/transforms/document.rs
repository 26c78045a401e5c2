//! 📤 Document — CanonicalAddress in, IndexDocument out. Nothing can go wrong here.
//! (Famous last words, but in this case the types agree with us.)

use crate::common::{CanonicalAddress, IndexDocument, LatLong};

impl From<&CanonicalAddress> for IndexDocument {
    fn from(address: &CanonicalAddress) -> Self {
        IndexDocument {
            number: address.number,
            street_prefix: address.street_prefix.clone(),
            street: address.street.clone(),
            street_suffix: address.street_suffix.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            zip_5: address.zip5.clone(),
            zip_last_4: address.zip_last_4.clone(),
            lat_long: LatLong {
                lon: address.longitude,
                lat: address.latitude,
            },
        }
    }
}

impl From<CanonicalAddress> for IndexDocument {
    // -- 📦 owned variant moves the strings instead of cloning them. the consumer hands us
    // -- each address exactly once, so this is the one it actually calls.
    fn from(address: CanonicalAddress) -> Self {
        IndexDocument {
            number: address.number,
            street_prefix: address.street_prefix,
            street: address.street,
            street_suffix: address.street_suffix,
            city: address.city,
            state: address.state,
            zip_5: address.zip5,
            zip_last_4: address.zip_last_4,
            lat_long: LatLong {
                lon: address.longitude,
                lat: address.latitude,
            },
        }
    }
}
