use csv::{ReaderBuilder, StringRecord, Trim};
use geojson::{FeatureCollection, JsonObject, JsonValue};

use super::columns;
use super::model::{feature_collection, point_feature};
use super::sample::sample_collection;
use crate::error::ConvertError;

// ---------------------------------------------------------------------------
// CSV → GeoJSON points
// ---------------------------------------------------------------------------

/// Convert CSV text into point features, falling back to the sample dataset
/// when no coordinate columns can be found.
///
/// Never returns an empty-handed error: rows with unparsable coordinates are
/// dropped, and a file without a usable header yields the sample cities.
pub fn csv_to_geojson(text: &str) -> FeatureCollection {
    match points_from_csv(text) {
        Ok(fc) => fc,
        Err(err) => {
            log::warn!("{err}; showing sample data instead");
            sample_collection()
        }
    }
}

/// Strict variant of [`csv_to_geojson`]: reports a missing header or missing
/// coordinate columns as [`ConvertError::MalformedInput`].
///
/// Layout:
/// * the first non-blank line is the header row; it is never emitted as data
/// * every later non-blank line becomes one `Point` at `[lon, lat]`
/// * properties hold every header's trimmed cell text, in header order,
///   coordinate columns included; cells are not type-converted
pub fn points_from_csv(text: &str) -> Result<FeatureCollection, ConvertError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = reader
        .records()
        .filter_map(|result| match result {
            Ok(record) => Some(record),
            Err(err) => {
                log::debug!("skipping unreadable CSV line: {err}");
                None
            }
        })
        .filter(|record| !is_blank(record));

    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| ConvertError::MalformedInput("CSV has no header row".into()))?
        .iter()
        .map(str::to_string)
        .collect();

    let (lat_idx, lon_idx) = columns::detect(&headers).both().ok_or_else(|| {
        ConvertError::MalformedInput(format!(
            "no latitude/longitude columns among {headers:?}"
        ))
    })?;

    let mut features = Vec::new();
    let mut dropped = 0usize;

    for record in rows {
        let (Some(lat), Some(lon)) = (
            parse_coordinate(record.get(lat_idx)),
            parse_coordinate(record.get(lon_idx)),
        ) else {
            dropped += 1;
            continue;
        };

        let mut props = JsonObject::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(value) = record.get(idx) {
                props.insert(header.clone(), JsonValue::from(value));
            }
        }
        features.push(point_feature(lon, lat, props));
    }

    if dropped > 0 {
        log::debug!("dropped {dropped} CSV row(s) with non-numeric coordinates");
    }
    log::info!("CSV converted to {} point feature(s)", features.len());

    Ok(feature_collection(features))
}

/// A line with nothing but whitespace.
fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty) && record.len() <= 1
}

fn parse_coordinate(cell: Option<&str>) -> Option<f64> {
    cell?.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Value;

    fn coords(fc: &FeatureCollection) -> Vec<Vec<f64>> {
        fc.features
            .iter()
            .map(|f| match &f.geometry.as_ref().unwrap().value {
                Value::Point(p) => p.clone(),
                other => panic!("unexpected geometry {other:?}"),
            })
            .collect()
    }

    #[test]
    fn single_row_becomes_lon_lat_point() {
        let fc = csv_to_geojson("name,lat,lon\nNYC,40.7128,-74.006\n");
        assert_eq!(coords(&fc), vec![vec![-74.006, 40.7128]]);

        let props = fc.features[0].properties.as_ref().unwrap();
        let keys: Vec<&str> = props.keys().map(String::as_str).collect();
        assert_eq!(keys, ["name", "lat", "lon"]);
        assert_eq!(props["name"], JsonValue::from("NYC"));
        assert_eq!(props["lat"], JsonValue::from("40.7128"));
        assert_eq!(props["lon"], JsonValue::from("-74.006"));
    }

    #[test]
    fn non_numeric_coordinates_drop_the_row() {
        let fc = csv_to_geojson("name,lat,lon\nBad,notanumber,-74.006\n");
        assert!(fc.features.is_empty());

        let fc = csv_to_geojson("name,lat,lon\nBad,NaN,1\nGood,1,2\nEmpty,,3\n");
        assert_eq!(coords(&fc), vec![vec![2.0, 1.0]]);
    }

    #[test]
    fn missing_coordinate_columns_yield_sample_data() {
        let fc = csv_to_geojson("city,value\nParis,3\n");
        assert_eq!(fc, sample_collection());
        assert!(matches!(
            points_from_csv("city,value\nParis,3\n"),
            Err(ConvertError::MalformedInput(_))
        ));
    }

    #[test]
    fn empty_text_yields_sample_data() {
        assert_eq!(csv_to_geojson(""), sample_collection());
        assert_eq!(csv_to_geojson("  \n\n \n"), sample_collection());
    }

    #[test]
    fn header_only_file_has_no_features() {
        let fc = csv_to_geojson("name,lat,lon\n");
        assert!(fc.features.is_empty());
    }

    #[test]
    fn blank_lines_and_padding_are_ignored() {
        let text = "\n  name , latitude , longitude \r\n\n  A , 10.5 , 20.25 \r\n   \nB,-1,-2\n";
        let fc = csv_to_geojson(text);
        assert_eq!(coords(&fc), vec![vec![20.25, 10.5], vec![-2.0, -1.0]]);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["name"], JsonValue::from("A"));
        assert_eq!(props["latitude"], JsonValue::from("10.5"));
    }

    #[test]
    fn quoted_commas_keep_columns_aligned() {
        let fc = csv_to_geojson("name,lat,lng\n\"Washington, D.C.\",38.9,-77.04\n");
        assert_eq!(coords(&fc), vec![vec![-77.04, 38.9]]);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["name"], JsonValue::from("Washington, D.C."));
    }

    #[test]
    fn short_rows_omit_missing_properties() {
        let fc = csv_to_geojson("lat,lon,note\n1,2\n");
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props.len(), 2);
        assert!(props.get("note").is_none());
    }

    #[test]
    fn creation_order_is_preserved() {
        let fc = csv_to_geojson("id,lat,lon\n3,3,3\n1,1,1\n2,2,2\n");
        let ids: Vec<&str> = fc
            .features
            .iter()
            .map(|f| f.property("id").and_then(|v| v.as_str()).unwrap())
            .collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }
}
