use std::cell::RefCell;
use std::rc::Rc;

use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue, Value};

use geogate::data::model::{feature_collection, point_feature};
use geogate::data::sample::sample_collection;
use geogate::engine::{
    DatasetInfo, EngineDataset, EngineError, EngineResult, EngineStatus, GeoEngine, LayerInfo,
    QueryFeatures,
};
use geogate::{Conversion, ConvertError, GatewayConfig, ProcessingMode, RawFile, Session, Stage};

// ---------------------------------------------------------------------------
// Scripted engine
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Script {
    fail_open: bool,
    layers: Vec<&'static str>,
    extent: Option<[f64; 4]>,
    /// Every call the engine saw, for assertions.
    calls: Rc<RefCell<Vec<String>>>,
}

struct MockEngine(Script);
struct MockDataset(Script);

impl GeoEngine for MockEngine {
    fn version(&self) -> String {
        "mock-3.8".into()
    }
    fn can_open(&self) -> bool {
        true
    }
    fn open(&self, _bytes: &[u8]) -> EngineResult<Box<dyn EngineDataset>> {
        self.0.calls.borrow_mut().push("open".into());
        if self.0.fail_open {
            return Err(EngineError::new("unrecognised format"));
        }
        Ok(Box::new(MockDataset(self.0.clone())))
    }
    fn export(&self, _: &dyn EngineDataset, format: &str, options: &[&str]) -> EngineResult<Vec<u8>> {
        self.0
            .calls
            .borrow_mut()
            .push(format!("export {format} {}", options.join(" ")));
        Ok(b"II*\0cog".to_vec())
    }
}

impl EngineDataset for MockDataset {
    fn layers(&self) -> EngineResult<Vec<LayerInfo>> {
        Ok(self
            .0
            .layers
            .iter()
            .map(|name| LayerInfo {
                name: name.to_string(),
            })
            .collect())
    }
    fn execute_sql(&self, query: &str) -> EngineResult<QueryFeatures> {
        self.0.calls.borrow_mut().push(query.to_string());
        let mut props = JsonObject::new();
        props.insert("parcel".into(), JsonValue::from(17));
        Ok(QueryFeatures(vec![point_feature(600_000.0, 5_000_000.0, props)]))
    }
    fn to_geojson(&self, features: QueryFeatures, target_srs: &str) -> EngineResult<FeatureCollection> {
        self.0.calls.borrow_mut().push(format!("to_geojson {target_srs}"));
        let reprojected = features
            .0
            .into_iter()
            .map(|f| point_feature(9.0, 45.0, f.properties.unwrap_or_default()))
            .collect();
        Ok(feature_collection(reprojected))
    }
    fn info(&self) -> EngineResult<DatasetInfo> {
        Ok(DatasetInfo {
            wgs84_extent: self.0.extent,
        })
    }
}

fn session_with(script: &Script) -> Session {
    Session::new(
        GatewayConfig::default(),
        EngineStatus::Ready(Box::new(MockEngine(script.clone()))),
    )
}

fn offline() -> Session {
    Session::new(GatewayConfig::default(), EngineStatus::unavailable("not linked"))
}

fn vector(session: &Session) -> &FeatureCollection {
    session.current().unwrap().conversion.features().unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_single_csv_row() {
    let mut session = offline();
    session
        .process(RawFile::new("nyc.csv", b"name,lat,lon\nNYC,40.7128,-74.006\n".to_vec()))
        .unwrap();
    let fc = vector(&session);
    assert_eq!(fc.features.len(), 1);
    let feature = &fc.features[0];
    assert_eq!(
        feature.geometry.as_ref().unwrap().value,
        Value::Point(vec![-74.006, 40.7128])
    );
    let props = feature.properties.as_ref().unwrap();
    assert_eq!(props["name"], "NYC");
    assert_eq!(props["lat"], "40.7128");
    assert_eq!(props["lon"], "-74.006");
}

#[test]
fn scenario_b_bad_coordinate_yields_nothing() {
    let mut session = offline();
    session
        .process(RawFile::new("bad.csv", b"name,lat,lon\nBad,notanumber,-74.006\n".to_vec()))
        .unwrap();
    assert!(vector(&session).features.is_empty());
}

#[test]
fn scenario_c_no_coordinate_columns_yields_sample() {
    let mut session = offline();
    session
        .process(RawFile::new("values.csv", b"city,value\nParis,1\n".to_vec()))
        .unwrap();
    assert_eq!(vector(&session), &sample_collection());
}

#[test]
fn scenario_d_unknown_empty_file_yields_sample() {
    let mut session = offline();
    session.process(RawFile::new("blob.xyz", Vec::new())).unwrap();
    assert_eq!(vector(&session), &sample_collection());
    assert_eq!(session.stage(), Stage::Success);
}

#[test]
fn scenario_e_engine_throws_on_zip_without_shapefile_parser() {
    let script = Script {
        fail_open: true,
        ..Script::default()
    };
    let mut session = session_with(&script).with_shapefile_parser(None);
    let current = session
        .process(RawFile::new("roads.zip", b"PK\x03\x04".to_vec()))
        .unwrap();
    assert_eq!(current.mode, ProcessingMode::Fallback);
    assert_eq!(current.conversion, Conversion::Vector(sample_collection()));
    assert!(session.progress().message.contains("fallback mode"));
    assert_eq!(*script.calls.borrow(), ["open"]);
}

// ---------------------------------------------------------------------------
// Primary path
// ---------------------------------------------------------------------------

#[test]
fn geopackage_reads_first_layer_with_bounded_query() {
    let script = Script {
        layers: vec!["parcels", "roads"],
        ..Script::default()
    };
    let mut session = session_with(&script);
    let current = session
        .process(RawFile::new("county.gpkg", vec![0u8; 16]))
        .unwrap();
    assert_eq!(current.mode, ProcessingMode::Primary);
    assert_eq!(current.base_name, "county");
    assert_eq!(
        *script.calls.borrow(),
        [
            "open",
            "SELECT *, geom FROM \"parcels\" LIMIT 5000",
            "to_geojson EPSG:4326"
        ]
    );
    let fc = vector(&session);
    assert_eq!(fc.features[0].property("parcel"), Some(&JsonValue::from(17)));
}

#[test]
fn dataset_without_layers_falls_back() {
    let script = Script::default();
    let mut session = session_with(&script);
    let current = session.process(RawFile::new("empty.gpkg", vec![1])).unwrap();
    assert_eq!(current.mode, ProcessingMode::Fallback);
    assert_eq!(current.conversion, Conversion::Vector(sample_collection()));
}

#[test]
fn geotiff_becomes_cog_with_extent() {
    let script = Script {
        extent: Some([5.9, 45.8, 10.5, 47.8]),
        ..Script::default()
    };
    let mut session = session_with(&script);
    session.map_mut().mark_ready();
    let current = session.process(RawFile::new("alps.tif", vec![0u8; 8])).unwrap();

    match &current.conversion {
        Conversion::Raster(product) => {
            assert_eq!(product.cog, b"II*\0cog");
            assert_eq!(product.wgs84_extent, Some([5.9, 45.8, 10.5, 47.8]));
        }
        other => panic!("expected raster, got {other:?}"),
    }
    assert_eq!(current.exports.len(), 1);
    assert_eq!(current.exports[0].filename, "alps.cog.tif");
    assert!(script
        .calls
        .borrow()
        .contains(&"export COG COMPRESS=DEFLATE TILING_SCHEME=GoogleMapsCompatible".to_string()));

    let layer = session.map().layer().unwrap();
    assert!(layer.points.is_empty());
    assert!(layer.bounds.is_some());
}

#[test]
fn csv_never_touches_engine() {
    let script = Script::default();
    let mut session = session_with(&script);
    session
        .process(RawFile::new("pts.csv", b"lat,lon\n1,2\n".to_vec()))
        .unwrap();
    assert!(script.calls.borrow().is_empty());
}

// ---------------------------------------------------------------------------
// Failure and properties
// ---------------------------------------------------------------------------

#[test]
fn both_paths_failing_reports_each_stage() {
    let script = Script {
        fail_open: true,
        ..Script::default()
    };
    let mut session = session_with(&script);
    let err = session
        .process(RawFile::new("roads.zip", b"not really a zip".to_vec()))
        .unwrap_err();
    match err {
        ConvertError::BothPathsFailed { primary, fallback } => {
            assert!(matches!(*primary, ConvertError::EngineOperationFailed { stage: "open", .. }));
            assert!(matches!(*fallback, ConvertError::Shapefile(_)));
        }
        other => panic!("expected BothPathsFailed, got {other:?}"),
    }
    assert_eq!(session.stage(), Stage::Failed);
    assert!(session.progress().message.starts_with("Both methods failed"));
}

#[test]
fn converting_twice_is_idempotent() {
    let text = b"name,lat,lon\nA,1.5,2.5\nB,x,1\nC,-3,4\n".to_vec();
    let mut session = offline();
    let first = session
        .process(RawFile::new("pts.csv", text.clone()))
        .unwrap()
        .clone();
    let second = session.process(RawFile::new("pts.csv", text)).unwrap();
    assert_eq!(&first, second);
}

#[test]
fn exported_geojson_parses_back_to_the_result() {
    let mut session = offline();
    session
        .process(RawFile::new("pts.csv", b"name,lat,lon\nA,1.5,2.5\nC,-3,4\n".to_vec()))
        .unwrap();
    let current = session.current().unwrap();
    let geojson = current
        .exports
        .iter()
        .find(|a| a.filename == "pts.geojson")
        .unwrap();
    let parsed: GeoJson = std::str::from_utf8(&geojson.bytes).unwrap().parse().unwrap();
    assert_eq!(parsed, GeoJson::FeatureCollection(vector(&session).clone()));
}
