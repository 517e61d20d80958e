//! Reading and writing GPX, GeoJSON and KML files.
//!
//! Files are always read as UTF-8; any `encoding` pseudo-attribute in the XML
//! declaration is dropped before parsing.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use geojson::GeoJson;
use regex::Regex;

use crate::converter;
use crate::error::Result;
use crate::kml;
use crate::models::Gpx;
use crate::options::ConvertOptions;

static ENCODING_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*<\?xml[^>]*?)\s+encoding=["'][^"']+["']"#).expect("valid regex")
});

/// Removes the encoding from a leading XML declaration, if present.
pub fn strip_encoding(xml: &str) -> Cow<'_, str> {
    ENCODING_DECLARATION.replace(xml, "$1")
}

fn read_xml(path: &Path) -> Result<String> {
    log::debug!("reading {}", path.display());
    let text = fs::read_to_string(path)?;
    Ok(strip_encoding(&text).into_owned())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    log::debug!("writing {} bytes to {}", text.len(), path.display());
    fs::write(path, text)?;
    Ok(())
}

/// Reads a GPX file, keeping the namespace prefixes it declares.
pub fn read_gpx(path: impl AsRef<Path>) -> Result<Gpx> {
    Gpx::from_string(&read_xml(path.as_ref())?)
}

pub fn write_gpx(path: impl AsRef<Path>, gpx: &Gpx) -> Result<()> {
    write_text(path.as_ref(), &gpx.to_xml_string()?)
}

pub fn read_geojson(path: impl AsRef<Path>, creator: &str) -> Result<Gpx> {
    let path = path.as_ref();
    log::debug!("reading {}", path.display());
    let geojson: GeoJson = fs::read_to_string(path)?.parse()?;
    converter::from_geojson(&geojson, creator)
}

/// Writes the features of [`converter::to_feature_collection`] as pretty JSON.
pub fn write_geojson(path: impl AsRef<Path>, gpx: &Gpx, options: &ConvertOptions) -> Result<()> {
    let fc = converter::to_feature_collection(gpx, options);
    write_text(path.as_ref(), &serde_json::to_string_pretty(&fc)?)
}

pub fn read_kml(path: impl AsRef<Path>, creator: &str) -> Result<Gpx> {
    kml::from_kml(&read_xml(path.as_ref())?, creator)
}

pub fn write_kml(path: impl AsRef<Path>, gpx: &Gpx) -> Result<()> {
    write_text(path.as_ref(), &kml::to_kml(gpx)?)
}
