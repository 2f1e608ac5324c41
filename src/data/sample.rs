use geojson::{FeatureCollection, JsonObject, JsonValue};

use super::model::{feature_collection, point_feature};

/// `(name, lon, lat)` of the fallback cities, in output order.
const CITIES: [(&str, f64, f64); 5] = [
    ("New York", -74.006, 40.7128),
    ("London", -0.1276, 51.5074),
    ("Tokyo", 139.6917, 35.6895),
    ("Beijing", 116.4074, 39.9042),
    ("Sydney", 151.2093, -33.8688),
];

/// The fixed five-city dataset shown whenever nothing usable was extracted.
///
/// Never fails.
pub fn sample_collection() -> FeatureCollection {
    let features = CITIES
        .iter()
        .map(|&(name, lon, lat)| {
            let mut props = JsonObject::new();
            props.insert("name".to_string(), JsonValue::from(name));
            props.insert("type".to_string(), JsonValue::from("sample"));
            point_feature(lon, lat, props)
        })
        .collect();
    feature_collection(features)
}
