//! Exact transformation between two spatial references

use log::debug;

use crate::coordinate::{is_same_reference, Coordinates, CoordinateSystemFactory, CoordinateTransformer};

/// Closed-form conversion between two spatial references
///
/// When both references are the same system the transformation is the
/// identity and every point passes through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactCoordinatesTransformation {
    source_wkt: String,
    destination_wkt: String,
    // None means identity
    converter: Option<CoordinateTransformer>,
}

impl ExactCoordinatesTransformation {
    /// Create the transformation, or `None` if the pair is not supported
    pub fn new(source_wkt: &str, destination_wkt: &str) -> Option<Self> {
        let converter = if is_same_reference(source_wkt, destination_wkt) {
            debug!("Source and destination references match, using identity");
            None
        } else {
            let from = CoordinateSystemFactory::from_wkt(source_wkt);
            let to = CoordinateSystemFactory::from_wkt(destination_wkt);
            match CoordinateTransformer::new(from, to) {
                Some(converter) => Some(converter),
                None => {
                    debug!("No exact conversion from {} to {}", from.description(), to.description());
                    return None;
                }
            }
        };

        Some(ExactCoordinatesTransformation {
            source_wkt: source_wkt.to_string(),
            destination_wkt: destination_wkt.to_string(),
            converter,
        })
    }

    /// True when source and destination are the same reference
    pub fn is_identity(&self) -> bool {
        self.converter.is_none()
    }

    /// WKT of the source reference
    pub fn source_wkt(&self) -> &str {
        &self.source_wkt
    }

    /// WKT of the destination reference
    pub fn destination_wkt(&self) -> &str {
        &self.destination_wkt
    }

    /// Transform a point in place; `false` leaves it unchanged
    pub fn transform(&self, point: &mut Coordinates, inverse: bool) -> bool {
        let converter = match &self.converter {
            None => return true,
            Some(converter) if inverse => converter.inverse(),
            Some(converter) => *converter,
        };

        match converter.transform(point) {
            Some(result) => {
                *point = result;
                true
            }
            None => false,
        }
    }
}
