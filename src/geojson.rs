//! GeoJSON-backed feature source.
//!
//! Reads a FeatureCollection of road features in the Geofabrik column
//! convention: `fclass` for the road class, `oneway` as b/t/f, `maxspeed`
//! in km/h, and a stable `osm_id`. This is the file sibling of the road
//! tables those extracts ship.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::road::{FeatureSource, Road};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    // "properties": null is valid GeoJSON, hence the Option.
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
    geometry: Option<Geometry>,
}

/// Only line geometries carry runs; anything else is a valid feature with
/// no geometry to import.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    LineString { coordinates: Vec<Vec<f64>> },
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
    #[serde(other)]
    Other,
}

/// Reads road features from a GeoJSON FeatureCollection file.
///
/// The whole file is parsed on every [`open`](FeatureSource::open), so both
/// import passes see identical roads in identical order. Every feature must
/// carry an integer `osm_id` property; properties are stringified into road
/// attributes (numbers in their canonical decimal form, nulls skipped).
#[derive(Debug, Clone)]
pub struct GeoJsonSource {
    path: PathBuf,
}

impl GeoJsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        GeoJsonSource { path: path.into() }
    }
}

impl FeatureSource for GeoJsonSource {
    type Iter = std::vec::IntoIter<Result<Road>>;

    fn open(&self) -> Result<Self::Iter> {
        let text = fs::read_to_string(&self.path)?;
        let collection: FeatureCollection = serde_json::from_str(&text)
            .map_err(|e| Error::parse(self.path.display().to_string(), e))?;

        let roads: Vec<Result<Road>> = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| convert_feature(index, feature))
            .collect();
        Ok(roads.into_iter())
    }

    fn describe(&self) -> String {
        format!("roads file {}", self.path.display())
    }
}

fn convert_feature(index: usize, feature: Feature) -> Result<Road> {
    let properties = feature.properties.unwrap_or_default();
    let mut attributes = HashMap::with_capacity(properties.len());
    for (key, value) in &properties {
        if let Some(text) = value_to_string(value) {
            attributes.insert(key.clone(), text);
        }
    }

    let id = match attributes.get("osm_id") {
        Some(raw) => raw.parse::<i64>().map_err(|_| Error::InvalidRoad {
            index,
            reason: format!("osm_id '{raw}' is not an integer"),
        })?,
        None => {
            return Err(Error::InvalidRoad {
                index,
                reason: "missing osm_id property".to_string(),
            })
        }
    };

    let runs = match feature.geometry {
        Some(Geometry::LineString { coordinates }) => vec![convert_run(index, &coordinates)?],
        Some(Geometry::MultiLineString { coordinates }) => coordinates
            .iter()
            .map(|run| convert_run(index, run))
            .collect::<Result<Vec<_>>>()?,
        Some(Geometry::Other) | None => Vec::new(),
    };

    Ok(Road {
        id,
        runs,
        attributes,
    })
}

fn convert_run(index: usize, positions: &[Vec<f64>]) -> Result<Vec<Coordinate>> {
    positions
        .iter()
        .map(|pos| match pos.as_slice() {
            [lon, lat] => Ok(Coordinate::new(*lon, *lat)),
            [lon, lat, ele, ..] => Ok(Coordinate::with_ele(*lon, *lat, *ele)),
            _ => Err(Error::InvalidRoad {
                index,
                reason: "position with fewer than 2 values".to_string(),
            }),
        })
        .collect()
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
