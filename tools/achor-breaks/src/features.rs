//! Input features: polygons with a numeric attribute
//!
//! A [`FeatureSet`] is the immutable snapshot every later stage reads from.
//! GeoJSON loading is a thin convenience for the CLI; library callers can
//! build features directly from `geo` polygons.

use achor_common::{Error, Result};
use geo::{Coord, LineString, Polygon};
use rustc_hash::FxHashSet;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

/// Single polygon with its attribute value
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: String,
    /// Attribute value; `None` when the field is null for this feature
    pub value: Option<f64>,
    pub geometry: Polygon<f64>,
    /// External category label (cluster id, nesting group)
    pub category: Option<String>,
    /// External Getis-Ord `Gi_Bin` code in `-3..=3`
    pub hotspot_bin: Option<i32>,
}

impl Feature {
    pub fn new(id: impl Into<String>, value: Option<f64>, geometry: Polygon<f64>) -> Self {
        Self {
            id: id.into(),
            value,
            geometry,
            category: None,
            hotspot_bin: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_hotspot_bin(mut self, bin: i32) -> Self {
        self.hotspot_bin = Some(bin);
        self
    }
}

/// Field names used when reading features from GeoJSON properties
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Unique id property (falls back to the feature's position)
    pub id_field: String,
    /// Attribute to classify
    pub value_field: String,
    /// Category property for cluster / nested methods
    pub category_field: Option<String>,
    /// Getis-Ord bin property for the hotspot method
    pub hotspot_field: Option<String>,
}

impl LoadOptions {
    pub fn new(value_field: impl Into<String>) -> Self {
        Self {
            value_field: value_field.into(),
            ..Default::default()
        }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            id_field: "UNISTR".to_string(),
            value_field: String::new(),
            category_field: None,
            hotspot_field: Some("Gi_Bin".to_string()),
        }
    }
}

/// Immutable, ordered collection of features for one classification run
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    /// Build a feature set, rejecting duplicate ids
    pub fn new(features: Vec<Feature>) -> Result<Self> {
        let mut seen = FxHashSet::default();
        for feature in &features {
            if !seen.insert(feature.id.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate feature id '{}'",
                    feature.id
                )));
            }
        }
        Ok(Self { features })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn get(&self, idx: usize) -> Option<&Feature> {
        self.features.get(idx)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Global (min, max) over all non-null finite values
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.features
            .iter()
            .filter_map(|f| f.value)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn has_categories(&self) -> bool {
        self.features.iter().any(|f| f.category.is_some())
    }

    pub fn has_hotspot_bins(&self) -> bool {
        self.features.iter().any(|f| f.hotspot_bin.is_some())
    }

    /// Read a GeoJSON `FeatureCollection` from disk
    pub fn from_geojson_path(path: &Path, options: &LoadOptions) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Input file not found: {}", path.display()),
            )));
        }
        let text = std::fs::read_to_string(path)?;
        let set = Self::from_geojson_str(&text, options)?;
        info!(
            path = %path.display(),
            features = set.len(),
            "loaded feature collection"
        );
        Ok(set)
    }

    /// Parse a GeoJSON `FeatureCollection`
    ///
    /// Only `Polygon` geometries are accepted. Features with a null geometry
    /// are skipped with a warning; any other geometry type is rejected.
    pub fn from_geojson_str(text: &str, options: &LoadOptions) -> Result<Self> {
        let root: Value = serde_json::from_str(text)?;
        let items = root
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::InvalidInput("expected a GeoJSON FeatureCollection".to_string())
            })?;

        let empty = Map::new();
        let mut field_seen = false;
        let mut features = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            let props = item
                .get("properties")
                .and_then(Value::as_object)
                .unwrap_or(&empty);

            let geometry = match item.get("geometry") {
                None | Some(Value::Null) => {
                    warn!(feature = idx, "feature without geometry skipped");
                    continue;
                }
                Some(geom) => parse_polygon(geom, idx)?,
            };

            let value = match props.get(&options.value_field) {
                Some(v) => {
                    field_seen = true;
                    number_of(v)
                }
                None => None,
            };

            let id = props
                .get(&options.id_field)
                .or_else(|| item.get("id"))
                .and_then(label_of)
                .unwrap_or_else(|| idx.to_string());

            let category = options
                .category_field
                .as_ref()
                .and_then(|field| props.get(field))
                .and_then(label_of);

            let hotspot_bin = options
                .hotspot_field
                .as_ref()
                .and_then(|field| props.get(field))
                .and_then(number_of)
                .map(|bin| bin.round() as i32);

            features.push(Feature {
                id,
                value,
                geometry,
                category,
                hotspot_bin,
            });
        }

        if !field_seen && !items.is_empty() {
            let available: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("properties").and_then(Value::as_object))
                .flat_map(|props| props.keys().map(String::as_str))
                .collect::<FxHashSet<_>>()
                .into_iter()
                .collect();
            return Err(Error::missing_field(&options.value_field, available));
        }

        Self::new(features)
    }
}

/// Numeric property; numeric strings are accepted (dBase-backed sources)
fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// String-ish property used for ids and categories
fn label_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_polygon(geom: &Value, idx: usize) -> Result<Polygon<f64>> {
    let kind = geom.get("type").and_then(Value::as_str).unwrap_or("");
    if kind != "Polygon" {
        return Err(Error::InvalidInput(format!(
            "feature {idx}: expected Polygon geometry, found '{kind}' (split multi-part geometries first)"
        )));
    }

    let rings = geom
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidInput(format!("feature {idx}: polygon without coordinates")))?;

    let mut parsed = Vec::with_capacity(rings.len());
    for ring in rings {
        let points = ring
            .as_array()
            .ok_or_else(|| Error::InvalidInput(format!("feature {idx}: malformed ring")))?;
        let mut coords = Vec::with_capacity(points.len());
        for point in points {
            let xy = point.as_array().filter(|xy| xy.len() >= 2).ok_or_else(|| {
                Error::InvalidInput(format!("feature {idx}: malformed coordinate"))
            })?;
            match (xy[0].as_f64(), xy[1].as_f64()) {
                (Some(x), Some(y)) => coords.push(Coord { x, y }),
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "feature {idx}: non-numeric coordinate"
                    )))
                }
            }
        }
        parsed.push(LineString::from(coords));
    }

    let mut rings = parsed.into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString::new(vec![]));
    Ok(Polygon::new(exterior, rings.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, y: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
        ]
    }

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "properties": {"UNISTR": "a", "density": 10.5, "dbscan": -1, "Gi_Bin": "3"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature",
             "properties": {"UNISTR": "b", "density": null, "dbscan": 2, "Gi_Bin": "0"},
             "geometry": {"type": "Polygon", "coordinates": [[[1,0],[2,0],[2,1],[1,1],[1,0]]]}},
            {"type": "Feature",
             "properties": {"UNISTR": "c", "density": "7"},
             "geometry": null}
        ]
    }"#;

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = FeatureSet::new(vec![
            Feature::new("a", Some(1.0), square(0.0, 0.0)),
            Feature::new("a", Some(2.0), square(1.0, 0.0)),
        ]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_value_range_ignores_nulls() {
        let set = FeatureSet::new(vec![
            Feature::new("a", Some(4.0), square(0.0, 0.0)),
            Feature::new("b", None, square(1.0, 0.0)),
            Feature::new("c", Some(-2.5), square(2.0, 0.0)),
        ])
        .unwrap();
        assert_eq!(set.value_range(), Some((-2.5, 4.0)));
        assert_eq!(FeatureSet::default().value_range(), None);
    }

    #[test]
    fn test_geojson_properties() {
        let options = LoadOptions {
            category_field: Some("dbscan".to_string()),
            ..LoadOptions::new("density")
        };
        let set = FeatureSet::from_geojson_str(COLLECTION, &options).unwrap();

        // the null-geometry feature is skipped
        assert_eq!(set.len(), 2);
        let a = set.get(0).unwrap();
        assert_eq!(a.id, "a");
        assert_eq!(a.value, Some(10.5));
        assert_eq!(a.category.as_deref(), Some("-1"));
        assert_eq!(a.hotspot_bin, Some(3));

        let b = set.get(1).unwrap();
        assert_eq!(b.value, None);
        assert_eq!(b.category.as_deref(), Some("2"));
        assert_eq!(b.hotspot_bin, Some(0));
    }

    #[test]
    fn test_geojson_missing_field_suggests() {
        let err = FeatureSet::from_geojson_str(COLLECTION, &LoadOptions::new("densty"))
            .unwrap_err();
        assert!(err.to_string().contains("did you mean 'density'"), "{err}");
    }

    #[test]
    fn test_geojson_rejects_non_polygon() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"v": 1},
             "geometry": {"type": "Point", "coordinates": [0, 0]}}
        ]}"#;
        let err = FeatureSet::from_geojson_str(text, &LoadOptions::new("v")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_geojson_positional_ids() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"v": 1},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type": "Feature", "properties": {"v": 2},
             "geometry": {"type": "Polygon", "coordinates": [[[1,0],[2,0],[2,1],[1,0]]]}}
        ]}"#;
        let set = FeatureSet::from_geojson_str(text, &LoadOptions::new("v")).unwrap();
        let ids: Vec<&str> = set.features().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = Path::new("/nonexistent/layer.geojson");
        let err = FeatureSet::from_geojson_path(path, &LoadOptions::new("v")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("Input file not found"), "{err}");
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let err = FeatureSet::from_geojson_str("{not json", &LoadOptions::new("v")).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
