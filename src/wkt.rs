//! Well-Known Text output and input.
//!
//! Input is decoded into GeoJSON geometry values and handed to
//! [`converter::from_geojson`], so WKT follows the same mapping rules as
//! GeoJSON.

use std::fmt::Write as _;

use geojson::{GeoJson, Geometry, Value};

use crate::converter;
use crate::error::{GpxError, Result};
use crate::models::{Gpx, Route, Track, Waypoint};

/// Waypoints as points, routes as line strings, and tracks as multi line
/// strings, wrapped in a collection when there is more than one.
pub fn to_wkt(gpx: &Gpx) -> String {
    let mut geometries: Vec<String> = Vec::new();
    geometries.extend(gpx.waypoints.iter().map(point_wkt));
    geometries.extend(gpx.routes.iter().map(route_wkt));
    geometries.extend(gpx.tracks.iter().map(track_wkt));

    match geometries.len() {
        0 => "GEOMETRYCOLLECTION EMPTY".to_string(),
        1 => geometries.remove(0),
        _ => format!("GEOMETRYCOLLECTION ({})", geometries.join(", ")),
    }
}

fn coord(p: &Waypoint, with_z: bool) -> String {
    let mut out = format!("{} {}", p.lon, p.lat);
    if with_z {
        if let Some(ele) = &p.ele {
            let _ = write!(out, " {ele}");
        }
    }
    out
}

/// Z is written only when every point carries an elevation.
fn has_z<'a>(points: impl IntoIterator<Item = &'a Waypoint>) -> bool {
    let mut any = false;
    for p in points {
        if p.ele.is_none() {
            return false;
        }
        any = true;
    }
    any
}

fn line(points: &[Waypoint], with_z: bool) -> String {
    let coords: Vec<String> = points.iter().map(|p| coord(p, with_z)).collect();
    format!("({})", coords.join(", "))
}

fn tagged(keyword: &str, with_z: bool, body: &str) -> String {
    if with_z {
        format!("{keyword} Z {body}")
    } else {
        format!("{keyword} {body}")
    }
}

fn point_wkt(p: &Waypoint) -> String {
    let with_z = p.ele.is_some();
    tagged("POINT", with_z, &format!("({})", coord(p, with_z)))
}

fn route_wkt(r: &Route) -> String {
    if r.points.is_empty() {
        return "LINESTRING EMPTY".to_string();
    }
    let with_z = has_z(&r.points);
    tagged("LINESTRING", with_z, &line(&r.points, with_z))
}

fn track_wkt(t: &Track) -> String {
    if t.segments.is_empty() {
        return "MULTILINESTRING EMPTY".to_string();
    }
    let with_z = has_z(t.points());
    let lines: Vec<String> = t.segments.iter().map(|s| line(&s.points, with_z)).collect();
    tagged("MULTILINESTRING", with_z, &format!("({})", lines.join(", ")))
}

/// Parses WKT into a GPX document.
///
/// Polygons inside a collection are skipped; a lone polygon fails with
/// [`GpxError::UnsupportedGeometry`].
pub fn from_wkt(wkt: &str, creator: &str) -> Result<Gpx> {
    let mut parser = Parser::new(wkt)?;
    let value = parser.geometry()?;
    if let Some(token) = parser.peek() {
        return Err(GpxError::InvalidWkt(format!(
            "unexpected {token:?} after geometry"
        )));
    }
    match value {
        Some(value) => converter::from_geojson(&GeoJson::Geometry(Geometry::new(value)), creator),
        None => Ok(Gpx::new(creator)),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(f64),
    Open,
    Close,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            c if c.is_ascii_alphabetic() => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if !c.is_ascii_alphabetic() {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Word(input[start..end].to_ascii_uppercase()));
            }
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if !(c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.')) {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                let text = &input[start..end];
                let number = text
                    .parse()
                    .map_err(|_| GpxError::InvalidWkt(format!("invalid number '{text}'")))?;
                tokens.push(Token::Number(number));
            }
            other => {
                return Err(GpxError::InvalidWkt(format!(
                    "unexpected character '{other}'"
                )));
            }
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy)]
struct Dims {
    z: bool,
    m: bool,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| GpxError::InvalidWkt("unexpected end of input".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(GpxError::InvalidWkt(format!(
                "expected {expected:?}, found {token:?}"
            )))
        }
    }

    /// Parses `item` repeatedly between parentheses, separated by commas.
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        self.expect(Token::Open)?;
        let mut items = vec![item(self)?];
        loop {
            match self.next()? {
                Token::Comma => items.push(item(self)?),
                Token::Close => return Ok(items),
                token => {
                    return Err(GpxError::InvalidWkt(format!(
                        "expected ',' or ')', found {token:?}"
                    )));
                }
            }
        }
    }

    /// `None` for `EMPTY` geometries.
    fn geometry(&mut self) -> Result<Option<Value>> {
        let keyword = match self.next()? {
            Token::Word(word) => word,
            token => {
                return Err(GpxError::InvalidWkt(format!(
                    "expected geometry keyword, found {token:?}"
                )));
            }
        };
        let dims = self.dimensions();
        if matches!(self.peek(), Some(Token::Word(w)) if w == "EMPTY") {
            self.pos += 1;
            return Ok(None);
        }

        let value = match keyword.as_str() {
            "POINT" => {
                let mut coords = self.list(|p| p.coord(dims))?;
                Value::Point(coords.remove(0))
            }
            "LINESTRING" => Value::LineString(self.line(dims)?),
            "POLYGON" => Value::Polygon(self.list(|p| p.line(dims))?),
            "MULTIPOINT" => Value::MultiPoint(self.list(|p| p.multipoint_member(dims))?),
            "MULTILINESTRING" => Value::MultiLineString(self.list(|p| p.line(dims))?),
            "MULTIPOLYGON" => {
                Value::MultiPolygon(self.list(|p| p.list(|p| p.line(dims)))?)
            }
            "GEOMETRYCOLLECTION" => {
                let members = self.list(Self::geometry)?;
                Value::GeometryCollection(members.into_iter().flatten().map(Geometry::new).collect())
            }
            other => {
                return Err(GpxError::InvalidWkt(format!(
                    "unknown geometry type '{other}'"
                )));
            }
        };
        Ok(Some(value))
    }

    fn dimensions(&mut self) -> Dims {
        let dims = match self.peek() {
            Some(Token::Word(w)) if w == "Z" => Dims { z: true, m: false },
            Some(Token::Word(w)) if w == "M" => Dims { z: false, m: true },
            Some(Token::Word(w)) if w == "ZM" => Dims { z: true, m: true },
            _ => return Dims { z: false, m: false },
        };
        self.pos += 1;
        dims
    }

    fn line(&mut self, dims: Dims) -> Result<Vec<Vec<f64>>> {
        self.list(|p| p.coord(dims))
    }

    /// Members may be bare coordinates or parenthesised.
    fn multipoint_member(&mut self, dims: Dims) -> Result<Vec<f64>> {
        if self.peek() == Some(&Token::Open) {
            let mut coords = self.list(|p| p.coord(dims))?;
            Ok(coords.remove(0))
        } else {
            self.coord(dims)
        }
    }

    /// Reads one position, keeping `x y` and the Z value but never M.
    fn coord(&mut self, dims: Dims) -> Result<Vec<f64>> {
        let mut numbers = Vec::with_capacity(4);
        while let Some(Token::Number(n)) = self.peek() {
            numbers.push(*n);
            self.pos += 1;
        }
        let keep = match (numbers.len(), dims.z, dims.m) {
            (n, _, _) if n < 2 => {
                return Err(GpxError::InvalidWkt(format!(
                    "coordinate needs at least two values, got {n}"
                )));
            }
            (_, false, true) => 2,
            (n, _, _) => n.min(3),
        };
        numbers.truncate(keep);
        Ok(numbers)
    }
}
