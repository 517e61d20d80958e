//! GPX 1.1 reading and writing with typed models, lossless extension
//! passthrough, statistics, and GeoJSON/KML/WKT/WKB conversion.
//!
//! ```
//! use gpxkit::Gpx;
//!
//! let gpx = Gpx::from_string(r#"<gpx xmlns="http://www.topografix.com/GPX/1/1"
//!     version="1.1" creator="demo"><wpt lat="52.52" lon="13.405"/></gpx>"#)?;
//! assert_eq!(gpx.waypoints[0].lat.to_string(), "52.52");
//! # Ok::<(), gpxkit::GpxError>(())
//! ```

pub mod converter;
pub mod edit;
pub mod error;
pub mod extensions;
pub mod io;
pub mod kml;
pub mod marshal;
pub mod models;
pub mod namespace;
pub mod options;
pub mod serializer;
pub mod stats;
pub mod types;
pub mod validate;
pub mod wkb;
pub mod wkt;
pub mod xml;

use geojson::GeoJson;
use wasm_bindgen::prelude::*;

pub use error::{GpxError, Result, ValueError};
pub use extensions::Extensions;
pub use marshal::Model;
pub use models::{
    Bounds, Copyright, DEFAULT_CREATOR, Email, GPX_VERSION, Gpx, Link, Metadata, Person, Route,
    Track, TrackSegment, Waypoint,
};
pub use namespace::NamespaceMap;
pub use options::{ConvertOptions, GpxElementType};
pub use serializer::WriteOptions;
pub use stats::PathStatistics;
pub use types::{Decimal, Degrees, DgpsStation, Fix, Latitude, Longitude};
pub use wkb::ByteOrder;
pub use xml::Element;

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let gpx = Gpx::from_string(gpx_string)?;
    let fc = converter::to_feature_collection(&gpx, &opts);
    serde_wasm_bindgen::to_value(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert GPX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(
    gpx_string: &str,
    options: JsValue,
) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let gpx = Gpx::from_string(gpx_string)?;
    let fc = converter::to_feature_collection(&gpx, &opts);
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert a GeoJSON string to GPX text.
#[wasm_bindgen(js_name = geoJsonToGpx)]
pub fn geojson_to_gpx(
    geojson_string: &str,
    creator: Option<String>,
) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let geojson: GeoJson = geojson_string.parse().map_err(GpxError::from)?;
    let creator = creator.as_deref().unwrap_or(DEFAULT_CREATOR);
    let gpx = converter::from_geojson(&geojson, creator)?;
    Ok(gpx.to_xml_string()?)
}

#[wasm_bindgen(js_name = gpxToKml)]
pub fn gpx_to_kml(gpx_string: &str) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let gpx = Gpx::from_string(gpx_string)?;
    Ok(kml::to_kml(&gpx)?)
}

#[wasm_bindgen(js_name = gpxToWkt)]
pub fn gpx_to_wkt(gpx_string: &str) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let gpx = Gpx::from_string(gpx_string)?;
    Ok(wkt::to_wkt(&gpx))
}

/// Little-endian unless `big_endian` is true.
#[wasm_bindgen(js_name = gpxToWkb)]
pub fn gpx_to_wkb(
    gpx_string: &str,
    big_endian: Option<bool>,
) -> std::result::Result<js_sys::Uint8Array, JsValue> {
    console_error_panic_hook::set_once();

    let gpx = Gpx::from_string(gpx_string)?;
    let order = if big_endian.unwrap_or(false) {
        ByteOrder::BigEndian
    } else {
        ByteOrder::LittleEndian
    };
    Ok(js_sys::Uint8Array::from(wkb::to_wkb(&gpx, order).as_slice()))
}

/// Throws with a path to the first structural problem.
#[wasm_bindgen(js_name = validateGpx)]
pub fn validate_gpx(gpx_string: &str) -> std::result::Result<(), JsValue> {
    console_error_panic_hook::set_once();

    validate::validate_str(gpx_string)?;
    Ok(())
}

fn parse_options(options: JsValue) -> std::result::Result<ConvertOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ConvertOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
