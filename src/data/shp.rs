use std::io::Cursor;
use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Position, Value};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Point, PointM, PointZ, PolygonRing, Reader, Shape};
use zip::ZipArchive;

use super::model::feature_collection;
use crate::error::ConvertError;

// ---------------------------------------------------------------------------
// Shapefile-parsing collaborator
// ---------------------------------------------------------------------------

/// Parses a zipped Shapefile into one collection per `.shp` member.
///
/// Callers use the first collection when several come back.
pub trait ShapefileParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<FeatureCollection>, ConvertError>;
}

/// Native reader: extracts the archive to a scratch directory and reads each
/// `.shp` with its sibling `.dbf`. Coordinates are passed through as stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipShapefileParser;

impl ShapefileParser for ZipShapefileParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<FeatureCollection>, ConvertError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ConvertError::Shapefile(format!("not a zip archive: {e}")))?;

        let mut members: Vec<String> = archive
            .file_names()
            .filter(|name| is_shp_member(name))
            .map(str::to_string)
            .collect();
        if members.is_empty() {
            return Err(ConvertError::Shapefile("archive has no .shp member".into()));
        }
        members.sort();

        let scratch = tempfile::tempdir()?;
        archive
            .extract(scratch.path())
            .map_err(|e| ConvertError::Shapefile(format!("extracting archive: {e}")))?;

        // An unreadable member is skipped as long as another one reads.
        let mut collections = Vec::new();
        let mut first_err = None;
        for member in &members {
            match read_shapefile(&scratch.path().join(member)) {
                Ok(fc) => collections.push(fc),
                Err(err) => {
                    log::warn!("skipping {member}: {err}");
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) if collections.is_empty() => Err(err),
            _ => Ok(collections),
        }
    }
}

/// A `.shp` entry, excluding macOS resource forks (`__MACOSX/`, `._*`).
fn is_shp_member(name: &str) -> bool {
    let file = name.rsplit('/').next().unwrap_or(name);
    name.to_ascii_lowercase().ends_with(".shp")
        && !name.starts_with("__MACOSX/")
        && !file.starts_with("._")
}

fn read_shapefile(path: &Path) -> Result<FeatureCollection, ConvertError> {
    let mut reader = Reader::from_path(path)
        .map_err(|e| ConvertError::Shapefile(format!("opening {}: {e}", path.display())))?;

    let mut features = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) =
            result.map_err(|e| ConvertError::Shapefile(format!("reading record: {e}")))?;
        features.push(Feature {
            bbox: None,
            geometry: shape_to_geometry(&shape),
            id: None,
            properties: Some(record_to_properties(record)),
            foreign_members: None,
        });
    }
    log::info!(
        "read {} feature(s) from {}",
        features.len(),
        path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
    );
    Ok(feature_collection(features))
}

// -- Shape conversion --

trait Xy {
    fn position(&self) -> Position;
}

impl Xy for Point {
    fn position(&self) -> Position {
        vec![self.x, self.y]
    }
}

impl Xy for PointM {
    fn position(&self) -> Position {
        vec![self.x, self.y]
    }
}

impl Xy for PointZ {
    fn position(&self) -> Position {
        vec![self.x, self.y, self.z]
    }
}

fn shape_to_geometry(shape: &Shape) -> Option<Geometry> {
    let value = match shape {
        Shape::Point(p) => Value::Point(p.position()),
        Shape::PointM(p) => Value::Point(p.position()),
        Shape::PointZ(p) => Value::Point(p.position()),
        Shape::Multipoint(m) => multipoint(m.points()),
        Shape::MultipointM(m) => multipoint(m.points()),
        Shape::MultipointZ(m) => multipoint(m.points()),
        Shape::Polyline(l) => lines(l.parts()),
        Shape::PolylineM(l) => lines(l.parts()),
        Shape::PolylineZ(l) => lines(l.parts()),
        Shape::Polygon(p) => polygons(p.rings()),
        Shape::PolygonM(p) => polygons(p.rings()),
        Shape::PolygonZ(p) => polygons(p.rings()),
        // Null shapes and multipatches carry no drawable geometry.
        _ => return None,
    };
    Some(Geometry::new(value))
}

fn ring<P: Xy>(points: &[P]) -> Vec<Position> {
    points.iter().map(Xy::position).collect()
}

fn multipoint<P: Xy>(points: &[P]) -> Value {
    Value::MultiPoint(ring(points))
}

fn lines<P: Xy>(parts: &[Vec<P>]) -> Value {
    match parts {
        [single] => Value::LineString(ring(single)),
        _ => Value::MultiLineString(parts.iter().map(|p| ring(p)).collect()),
    }
}

/// Each outer ring opens a new polygon; inner rings attach to the latest one.
fn polygons<P: Xy>(rings: &[PolygonRing<P>]) -> Value {
    let mut polygons: Vec<Vec<Vec<Position>>> = Vec::new();
    for r in rings {
        match r {
            PolygonRing::Outer(points) => polygons.push(vec![ring(points)]),
            PolygonRing::Inner(points) => match polygons.last_mut() {
                Some(polygon) => polygon.push(ring(points)),
                None => polygons.push(vec![ring(points)]),
            },
        }
    }
    if polygons.len() == 1 {
        Value::Polygon(polygons.remove(0))
    } else {
        Value::MultiPolygon(polygons)
    }
}

// -- Attribute conversion --

fn record_to_properties(record: Record) -> JsonObject {
    let mut props = JsonObject::new();
    for (field, value) in record {
        props.insert(field, field_to_json(value));
    }
    props
}

fn field_to_json(value: FieldValue) -> JsonValue {
    match value {
        FieldValue::Character(Some(s)) => JsonValue::from(s.trim_end()),
        FieldValue::Memo(s) => JsonValue::from(s),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => {
            JsonValue::from(n)
        }
        FieldValue::Float(Some(f)) => JsonValue::from(f as f64),
        FieldValue::Integer(i) => JsonValue::from(i),
        FieldValue::Logical(Some(b)) => JsonValue::from(b),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => JsonValue::Null,
        other => JsonValue::from(format!("{other:?}")),
    }
}
