use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use super::model::{feature_collection, Conversion, FileFormat, ProcessingMode, RasterProduct, RawFile};
use super::sample::sample_collection;
use super::shp::ShapefileParser;
use super::tabular::csv_to_geojson;
use crate::config::GatewayConfig;
use crate::engine::{EngineError, GeoEngine};
use crate::error::ConvertError;

/// Creation options for the cloud-optimised raster export.
pub const COG_OPTIONS: [&str; 2] = ["COMPRESS=DEFLATE", "TILING_SCHEME=GoogleMapsCompatible"];

// ---------------------------------------------------------------------------
// Format dispatcher
// ---------------------------------------------------------------------------

/// Routes a file to the converter for its extension and processing mode.
///
/// | extension | primary                                | fallback                    |
/// |-----------|----------------------------------------|-----------------------------|
/// | gpkg      | first layer, bounded query, reproject  | sample data                 |
/// | zip       | layer 0, bounded query, reproject      | shapefile parser or sample  |
/// | tif/tiff  | COG export + WGS84 extent              | sample data                 |
/// | geojson   | –                                      | parsed as-is                |
/// | csv       | –                                      | CSV point converter         |
/// | other     | –                                      | sample data                 |
pub struct Dispatcher<'a> {
    engine: Option<&'a dyn GeoEngine>,
    shapefile: Option<&'a dyn ShapefileParser>,
    config: &'a GatewayConfig,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        engine: Option<&'a dyn GeoEngine>,
        shapefile: Option<&'a dyn ShapefileParser>,
        config: &'a GatewayConfig,
    ) -> Self {
        Self {
            engine,
            shapefile,
            config,
        }
    }

    pub fn convert(&self, file: &RawFile, mode: ProcessingMode) -> Result<Conversion, ConvertError> {
        match mode {
            ProcessingMode::Primary => self.primary(file),
            ProcessingMode::Fallback => self.fallback(file),
        }
    }

    // -- Primary path (geospatial engine) --

    fn primary(&self, file: &RawFile) -> Result<Conversion, ConvertError> {
        let engine = self
            .engine
            .ok_or_else(|| ConvertError::EngineUnavailable("no engine in this session".into()))?;

        match file.format() {
            FileFormat::GeoPackage | FileFormat::ShapefileZip => {
                self.primary_vector(engine, file).map(Conversion::Vector)
            }
            FileFormat::GeoTiff => self.primary_raster(engine, file).map(Conversion::Raster),
            _ => Err(ConvertError::UnsupportedFormat(file.extension())),
        }
    }

    fn primary_vector(&self, engine: &dyn GeoEngine, file: &RawFile) -> Result<FeatureCollection, ConvertError> {
        let dataset = engine
            .open(file.bytes())
            .map_err(|e| ConvertError::engine("open", e))?;
        let layers = dataset
            .layers()
            .map_err(|e| ConvertError::engine("layer listing", e))?;
        let layer = layers.first().ok_or_else(|| {
            ConvertError::engine("layer listing", EngineError::new("dataset has no layers"))
        })?;
        log::info!("{}: {} layer(s), reading {:?}", file.name(), layers.len(), layer.name);

        let rows = dataset
            .execute_sql(&layer_query(&layer.name, self.config.row_limit))
            .map_err(|e| ConvertError::engine("query", e))?;
        dataset
            .to_geojson(rows, &self.config.target_srs)
            .map_err(|e| ConvertError::engine("reprojection", e))
    }

    fn primary_raster(&self, engine: &dyn GeoEngine, file: &RawFile) -> Result<RasterProduct, ConvertError> {
        let dataset = engine
            .open(file.bytes())
            .map_err(|e| ConvertError::engine("open", e))?;
        let cog = engine
            .export(dataset.as_ref(), "COG", &COG_OPTIONS)
            .map_err(|e| ConvertError::engine("COG export", e))?;
        let info = dataset.info().map_err(|e| ConvertError::engine("info", e))?;
        Ok(RasterProduct {
            cog,
            wgs84_extent: info.wgs84_extent,
        })
    }

    // -- Fallback path (hand-written converters) --

    fn fallback(&self, file: &RawFile) -> Result<Conversion, ConvertError> {
        let fc = match file.format() {
            FileFormat::ShapefileZip => match self.shapefile {
                Some(parser) => parser
                    .parse(file.bytes())?
                    .into_iter()
                    .next()
                    .ok_or_else(|| ConvertError::Shapefile("archive held no layers".into()))?,
                None => {
                    log::info!("no shapefile parser available; showing sample data");
                    sample_collection()
                }
            },
            FileFormat::GeoJson => parse_geojson(&file.text()).unwrap_or_else(|err| {
                log::warn!("{}: {err}; showing sample data instead", file.name());
                sample_collection()
            }),
            FileFormat::Csv => csv_to_geojson(&file.text()),
            other => {
                log::debug!("no fallback converter for {other}; showing sample data");
                sample_collection()
            }
        };
        Ok(Conversion::Vector(fc))
    }
}

/// Bounded attribute + geometry query over one layer.
pub fn layer_query(layer: &str, limit: u32) -> String {
    format!("SELECT *, geom FROM \"{}\" LIMIT {limit}", layer.replace('"', "\"\""))
}

/// Parse GeoJSON text leniently.
///
/// Only text that is not JSON at all is rejected. A lone Feature or Geometry
/// is wrapped into a collection, a collection without `features` is empty,
/// and a feature whose geometry does not convert keeps its properties with
/// no geometry.
pub fn parse_geojson(text: &str) -> Result<FeatureCollection, ConvertError> {
    let value: JsonValue = serde_json::from_str(text)
        .map_err(|e| ConvertError::MalformedInput(format!("invalid JSON: {e}")))?;
    let JsonValue::Object(mut object) = value else {
        return Err(ConvertError::MalformedInput(
            "GeoJSON must be a JSON object".into(),
        ));
    };

    let kind = object.get("type").and_then(JsonValue::as_str).map(str::to_string);
    match kind.as_deref() {
        Some("Feature") => Ok(feature_collection(vec![lenient_feature(object)])),
        Some("FeatureCollection") | None => {
            object.remove("type");
            let features = match object.remove("features") {
                Some(JsonValue::Array(items)) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        JsonValue::Object(feature) => Some(lenient_feature(feature)),
                        other => {
                            log::debug!("dropping non-object feature entry {other}");
                            None
                        }
                    })
                    .collect(),
                _ => Vec::new(),
            };
            Ok(FeatureCollection {
                bbox: take_bbox(&mut object),
                features,
                foreign_members: non_empty(object),
            })
        }
        Some(_) => {
            let geometry = lenient_geometry(JsonValue::Object(object));
            Ok(feature_collection(vec![Feature {
                bbox: None,
                geometry,
                id: None,
                properties: None,
                foreign_members: None,
            }]))
        }
    }
}

fn lenient_feature(mut object: JsonObject) -> Feature {
    object.remove("type");
    let geometry = object
        .remove("geometry")
        .filter(|g| !g.is_null())
        .and_then(lenient_geometry);
    let properties = match object.remove("properties") {
        Some(JsonValue::Object(props)) => Some(props),
        _ => None,
    };
    let id = match object.remove("id") {
        Some(JsonValue::String(s)) => Some(Id::String(s)),
        Some(JsonValue::Number(n)) => Some(Id::Number(n)),
        _ => None,
    };
    Feature {
        bbox: take_bbox(&mut object),
        geometry,
        id,
        properties,
        foreign_members: non_empty(object),
    }
}

fn lenient_geometry(value: JsonValue) -> Option<Geometry> {
    Geometry::from_json_value(value)
        .map_err(|err| log::debug!("keeping feature without geometry: {err}"))
        .ok()
}

fn take_bbox(object: &mut JsonObject) -> Option<Vec<f64>> {
    object
        .remove("bbox")
        .and_then(|bbox| serde_json::from_value(bbox).ok())
}

fn non_empty(object: JsonObject) -> Option<JsonObject> {
    (!object.is_empty()).then_some(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::shp::ZipShapefileParser;

    fn fallback(file: &RawFile, shapefile: Option<&dyn ShapefileParser>) -> Result<Conversion, ConvertError> {
        let config = GatewayConfig::default();
        Dispatcher::new(None, shapefile, &config).convert(file, ProcessingMode::Fallback)
    }

    #[test]
    fn query_quotes_layer_name() {
        assert_eq!(
            layer_query("roads", 5000),
            "SELECT *, geom FROM \"roads\" LIMIT 5000"
        );
        assert_eq!(
            layer_query("a\"b", 10),
            "SELECT *, geom FROM \"a\"\"b\" LIMIT 10"
        );
    }

    #[test]
    fn primary_without_engine_is_unavailable() {
        let config = GatewayConfig::default();
        let file = RawFile::new("parcels.gpkg", vec![1, 2, 3]);
        let err = Dispatcher::new(None, None, &config)
            .convert(&file, ProcessingMode::Primary)
            .unwrap_err();
        assert!(matches!(err, ConvertError::EngineUnavailable(_)));
    }

    #[test]
    fn unknown_extension_yields_sample_data() {
        let file = RawFile::new("blob.xyz", Vec::new());
        let out = fallback(&file, None).unwrap();
        assert_eq!(out, Conversion::Vector(sample_collection()));
    }

    #[test]
    fn engine_only_formats_yield_sample_data_in_fallback() {
        for name in ["parcels.gpkg", "dem.tif", "dem.TIFF"] {
            let out = fallback(&RawFile::new(name, vec![0u8; 8]), None).unwrap();
            assert_eq!(out, Conversion::Vector(sample_collection()), "{name}");
        }
    }

    #[test]
    fn zip_without_parser_yields_sample_data() {
        let out = fallback(&RawFile::new("roads.zip", vec![0u8; 4]), None).unwrap();
        assert_eq!(out, Conversion::Vector(sample_collection()));
    }

    #[test]
    fn zip_parser_failure_is_an_error() {
        let parser = ZipShapefileParser;
        let err = fallback(&RawFile::new("roads.zip", b"junk".to_vec()), Some(&parser)).unwrap_err();
        assert!(matches!(err, ConvertError::Shapefile(_)));
    }

    #[test]
    fn geojson_is_taken_verbatim() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]},
             "properties":{"kind":"road","lanes":2}}]}"#;
        let out = fallback(&RawFile::new("roads.GeoJSON", text.as_bytes().to_vec()), None).unwrap();
        let fc = out.features().unwrap();
        assert_eq!(fc.features.len(), 1);
        assert_eq!(fc.features[0].property("lanes"), Some(&geojson::JsonValue::from(2)));
    }

    #[test]
    fn lone_geometry_is_wrapped() {
        let fc = parse_geojson(r#"{"type":"Point","coordinates":[3,4]}"#).unwrap();
        assert_eq!(fc.features.len(), 1);
        assert!(fc.features[0].properties.is_none());
    }

    #[test]
    fn feature_without_geometry_key_is_kept() {
        let fc = parse_geojson(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"name":"depot"},"style":"red"}]}"#,
        )
        .unwrap();
        assert_eq!(fc.features.len(), 1);
        let feature = &fc.features[0];
        assert!(feature.geometry.is_none());
        assert_eq!(feature.property("name"), Some(&JsonValue::from("depot")));
        assert_eq!(
            feature.foreign_members.as_ref().and_then(|m| m.get("style")),
            Some(&JsonValue::from("red"))
        );
    }

    #[test]
    fn unconvertible_geometry_drops_only_the_geometry() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","id":7,"geometry":{"type":"Point","coordinates":[1]},"properties":{"name":"short"}},
            {"type":"Feature","geometry":{"type":"Point","coordinates":[3,4]},"properties":null}]}"#;
        let out = fallback(&RawFile::new("pts.geojson", text.as_bytes().to_vec()), None).unwrap();
        let fc = out.features().unwrap();
        assert_eq!(fc.features.len(), 2);
        assert!(fc.features[0].geometry.is_none());
        assert_eq!(fc.features[0].property("name"), Some(&JsonValue::from("short")));
        assert_eq!(fc.features[0].id, Some(Id::Number(7.into())));
        assert_eq!(
            fc.features[1].geometry.as_ref().map(|g| &g.value),
            Some(&geojson::Value::Point(vec![3.0, 4.0]))
        );
    }

    #[test]
    fn collection_without_features_is_empty_not_sample() {
        let out = fallback(
            &RawFile::new("empty.geojson", br#"{"type":"FeatureCollection"}"#.to_vec()),
            None,
        )
        .unwrap();
        assert_eq!(out.feature_count(), 0);
    }

    #[test]
    fn non_object_json_yields_sample_data() {
        let out = fallback(&RawFile::new("list.geojson", b"[1, 2, 3]".to_vec()), None).unwrap();
        assert_eq!(out, Conversion::Vector(sample_collection()));
    }

    #[test]
    fn invalid_geojson_yields_sample_data() {
        let out = fallback(&RawFile::new("broken.geojson", b"{not json".to_vec()), None).unwrap();
        assert_eq!(out, Conversion::Vector(sample_collection()));
    }

    #[test]
    fn csv_routes_to_point_converter() {
        let file = RawFile::new("cities.CSV", b"name,lat,lon\nNYC,40.7128,-74.006\n".to_vec());
        let out = fallback(&file, None).unwrap();
        assert_eq!(out.feature_count(), 1);
    }
}
