//! `gpxkit`: inspect, validate, edit, merge and convert GPX files.
//!
//! ```bash
//! gpxkit validate ride.gpx
//! gpxkit info ride.gpx --json
//! gpxkit edit ride.gpx -o small.gpx --precision 5 --strip-time
//! gpxkit merge a.gpx b.gpx -o both.gpx
//! gpxkit convert ride.gpx -o ride.geojson --join-segments
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use gpxkit::edit::{self, MetadataFields};
use gpxkit::{
    Bounds, ConvertOptions, DEFAULT_CREATOR, Gpx, GpxElementType, Latitude, Longitude,
    PathStatistics, Route, Track, io, validate,
};

#[derive(Parser, Debug)]
#[command(name = "gpxkit")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log progress to stderr (RUST_LOG overrides the level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a file against the GPX 1.1 structure
    Validate { file: PathBuf },

    /// Print contents and statistics
    Info {
        file: PathBuf,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Crop, trim, reverse, strip or round a file
    Edit(EditArgs),

    /// Merge several GPX files into one
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,

        /// Creator of the merged file
        #[arg(long, default_value = DEFAULT_CREATOR)]
        creator: String,
    },

    /// Convert between GPX, GeoJSON and KML
    Convert(ConvertArgs),
}

#[derive(clap::Args, Debug)]
struct EditArgs {
    input: PathBuf,

    /// Output file (default: overwrite the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true)]
    min_lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    max_lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    min_lon: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    max_lon: Option<f64>,

    /// Drop points before this time (ISO 8601, UTC when no offset is given)
    #[arg(long)]
    start: Option<String>,
    /// Drop points after this time
    #[arg(long)]
    end: Option<String>,

    /// Reverse routes and tracks
    #[arg(long)]
    reverse: bool,
    #[arg(long)]
    reverse_routes: bool,
    #[arg(long)]
    reverse_tracks: bool,

    #[arg(long)]
    strip_name: bool,
    #[arg(long)]
    strip_desc: bool,
    #[arg(long)]
    strip_author: bool,
    #[arg(long)]
    strip_copyright: bool,
    #[arg(long)]
    strip_time: bool,
    #[arg(long)]
    strip_keywords: bool,
    #[arg(long)]
    strip_links: bool,
    #[arg(long)]
    strip_all_metadata: bool,

    /// Decimal places kept for latitude and longitude
    #[arg(long)]
    precision: Option<u32>,
    /// Decimal places kept for elevation
    #[arg(long)]
    elevation_precision: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Gpx,
    Geojson,
    Kml,
}

impl Format {
    fn detect(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gpx" => Some(Format::Gpx),
            "geojson" | "json" => Some(Format::Geojson),
            "kml" => Some(Format::Kml),
            _ => None,
        }
    }
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    input: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    /// Input format (default: from the file extension)
    #[arg(long, value_enum)]
    from: Option<Format>,

    /// Output format (default: from the file extension)
    #[arg(long, value_enum)]
    to: Option<Format>,

    /// Creator for documents built from GeoJSON or KML
    #[arg(long, default_value = DEFAULT_CREATOR)]
    creator: String,

    /// GeoJSON: leave elevation out of coordinates
    #[arg(long)]
    no_elevation: bool,
    /// GeoJSON: leave out coordinateProperties.times
    #[arg(long)]
    no_time: bool,
    /// GeoJSON: leave out names, descriptions and links
    #[arg(long)]
    no_metadata: bool,
    /// GeoJSON: one MultiLineString per track instead of one feature per segment
    #[arg(long)]
    join_segments: bool,
    /// GeoJSON: element types to include (default: all)
    #[arg(long, value_enum, value_delimiter = ',')]
    types: Vec<GpxElementType>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match args.command {
        Command::Validate { file } => cmd_validate(&file),
        Command::Info { file, json } => cmd_info(&file, json),
        Command::Edit(edit_args) => cmd_edit(edit_args),
        Command::Merge {
            files,
            output,
            creator,
        } => cmd_merge(&files, &output, &creator),
        Command::Convert(convert_args) => cmd_convert(convert_args),
    }
}

fn read_gpx(path: &Path) -> Result<Gpx> {
    io::read_gpx(path).with_context(|| format!("Failed to read GPX file: {}", path.display()))
}

fn write_gpx(path: &Path, gpx: &Gpx) -> Result<()> {
    io::write_gpx(path, gpx).with_context(|| format!("Failed to write {}", path.display()))
}

fn cmd_validate(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    validate::validate_str(&io::strip_encoding(&text))
        .with_context(|| format!("{} is not valid GPX 1.1", file.display()))?;
    println!("{}: valid GPX 1.1", file.display());
    Ok(())
}

#[derive(Serialize)]
struct Info {
    creator: String,
    waypoints: usize,
    routes: usize,
    tracks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<MetadataInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    track_statistics: Vec<TrackInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    route_statistics: Vec<RouteInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundsInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_duration_s: Option<f64>,
}

#[derive(Serialize)]
struct MetadataInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keywords: Option<String>,
}

#[derive(Serialize)]
struct ElevationInfo {
    min_m: f64,
    max_m: f64,
    avg_m: f64,
    total_ascent_m: f64,
    total_descent_m: f64,
}

#[derive(Serialize)]
struct TrackInfo {
    index: usize,
    name: Option<String>,
    segments: usize,
    points: usize,
    distance_m: f64,
    duration_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    avg_speed_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avg_speed_kmh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elevation: Option<ElevationInfo>,
}

#[derive(Serialize)]
struct RouteInfo {
    index: usize,
    name: Option<String>,
    points: usize,
    distance_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    elevation: Option<ElevationInfo>,
}

#[derive(Serialize)]
struct BoundsInfo {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

fn seconds(delta: chrono::TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / 1000.0
}

/// `None` when the path has no elevation data.
fn elevation_info(path: &impl PathStatistics) -> Option<ElevationInfo> {
    Some(ElevationInfo {
        min_m: path.min_elevation().ok()?,
        max_m: path.max_elevation().ok()?,
        avg_m: path.avg_elevation().ok()?,
        total_ascent_m: path.total_ascent(),
        total_descent_m: path.total_descent(),
    })
}

fn track_info(index: usize, track: &Track) -> TrackInfo {
    let duration_s = seconds(track.total_duration());
    let avg_speed = (duration_s > 0.0).then(|| track.avg_speed());
    TrackInfo {
        index,
        name: track.name.clone(),
        segments: track.segments.len(),
        points: track.points().count(),
        distance_m: track.total_distance(),
        duration_s,
        avg_speed_ms: avg_speed,
        avg_speed_kmh: avg_speed.map(|s| s * 3.6),
        elevation: elevation_info(track),
    }
}

fn route_info(index: usize, route: &Route) -> RouteInfo {
    RouteInfo {
        index,
        name: route.name.clone(),
        points: route.points.len(),
        distance_m: route.total_distance(),
        elevation: elevation_info(route),
    }
}

fn gather_info(gpx: &Gpx) -> Info {
    let metadata = gpx.metadata.as_ref().map(|m| MetadataInfo {
        name: m.name.clone(),
        description: m.desc.clone(),
        author: m.author.as_ref().and_then(|a| a.name.clone()),
        time: m.time.as_ref().map(|t| t.to_rfc3339()),
        keywords: m.keywords.clone(),
    });

    let bounds = gpx.points().fold(None, |acc: Option<BoundsInfo>, p| {
        let (lat, lon) = (p.lat.value(), p.lon.value());
        Some(match acc {
            None => BoundsInfo {
                min_lat: lat,
                max_lat: lat,
                min_lon: lon,
                max_lon: lon,
            },
            Some(b) => BoundsInfo {
                min_lat: b.min_lat.min(lat),
                max_lat: b.max_lat.max(lat),
                min_lon: b.min_lon.min(lon),
                max_lon: b.max_lon.max(lon),
            },
        })
    });

    let has_tracks = !gpx.tracks.is_empty();
    Info {
        creator: gpx.creator.clone(),
        waypoints: gpx.waypoints.len(),
        routes: gpx.routes.len(),
        tracks: gpx.tracks.len(),
        metadata,
        track_statistics: gpx.tracks.iter().enumerate().map(|(i, t)| track_info(i, t)).collect(),
        route_statistics: gpx.routes.iter().enumerate().map(|(i, r)| route_info(i, r)).collect(),
        bounds,
        total_distance_m: has_tracks.then(|| gpx.tracks.iter().map(|t| t.total_distance()).sum()),
        total_duration_s: has_tracks
            .then(|| gpx.tracks.iter().map(|t| seconds(t.total_duration())).sum()),
    }
}

fn hms(secs: f64) -> String {
    let secs = secs as u64;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn print_info(file: &Path, info: &Info) {
    println!("GPX File: {}", file.display());
    println!("Creator: {}", info.creator);
    println!();

    if let Some(meta) = &info.metadata {
        println!("Metadata:");
        let fields = [
            ("Name", &meta.name),
            ("Description", &meta.description),
            ("Author", &meta.author),
            ("Time", &meta.time),
            ("Keywords", &meta.keywords),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {label}: {value}");
            }
        }
        println!();
    }

    println!("Contents:");
    println!("  Waypoints: {}", info.waypoints);
    println!("  Routes: {}", info.routes);
    println!("  Tracks: {}", info.tracks);
    println!();

    if !info.track_statistics.is_empty() {
        println!("Track Statistics:");
        for track in &info.track_statistics {
            let fallback = format!("Track {}", track.index + 1);
            println!("  {}:", track.name.as_deref().unwrap_or(&fallback));
            println!("    Segments: {}", track.segments);
            println!("    Points: {}", track.points);
            println!(
                "    Distance: {:.2} m ({:.2} km)",
                track.distance_m,
                track.distance_m / 1000.0
            );
            if track.duration_s > 0.0 {
                println!("    Duration: {}", hms(track.duration_s));
            }
            if let Some(kmh) = track.avg_speed_kmh {
                println!("    Avg Speed: {kmh:.2} km/h");
            }
            if let Some(ele) = &track.elevation {
                println!(
                    "    Elevation: {:.1}m - {:.1}m (avg: {:.1}m)",
                    ele.min_m, ele.max_m, ele.avg_m
                );
                println!(
                    "    Ascent/Descent: +{:.1}m / -{:.1}m",
                    ele.total_ascent_m, ele.total_descent_m
                );
            }
        }
        println!();
    }

    if !info.route_statistics.is_empty() {
        println!("Route Statistics:");
        for route in &info.route_statistics {
            let fallback = format!("Route {}", route.index + 1);
            println!("  {}:", route.name.as_deref().unwrap_or(&fallback));
            println!("    Points: {}", route.points);
            println!(
                "    Distance: {:.2} m ({:.2} km)",
                route.distance_m,
                route.distance_m / 1000.0
            );
            if let Some(ele) = &route.elevation {
                println!("    Elevation: {:.1}m - {:.1}m", ele.min_m, ele.max_m);
                println!(
                    "    Ascent/Descent: +{:.1}m / -{:.1}m",
                    ele.total_ascent_m, ele.total_descent_m
                );
            }
        }
        println!();
    }

    if let Some(b) = &info.bounds {
        println!("Bounds:");
        println!("  Latitude: {:.6} to {:.6}", b.min_lat, b.max_lat);
        println!("  Longitude: {:.6} to {:.6}", b.min_lon, b.max_lon);
    }

    if let (Some(distance), Some(duration)) = (info.total_distance_m, info.total_duration_s) {
        println!();
        println!("Overall:");
        println!(
            "  Total Distance: {distance:.2} m ({:.2} km)",
            distance / 1000.0
        );
        if duration > 0.0 {
            println!("  Total Duration: {}", hms(duration));
        }
    }
}

fn cmd_info(file: &Path, json: bool) -> Result<()> {
    let gpx = read_gpx(file)?;
    let info = gather_info(&gpx);
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print_info(file, &info);
    }
    Ok(())
}

fn crop_bounds(args: &EditArgs) -> Result<Option<Bounds>> {
    if args.min_lat.is_none()
        && args.max_lat.is_none()
        && args.min_lon.is_none()
        && args.max_lon.is_none()
    {
        return Ok(None);
    }
    let bounds = Bounds::new(
        Latitude::try_from(args.min_lat.unwrap_or(-90.0)).context("Invalid --min-lat")?,
        Longitude::try_from(args.min_lon.unwrap_or(-180.0)).context("Invalid --min-lon")?,
        Latitude::try_from(args.max_lat.unwrap_or(90.0)).context("Invalid --max-lat")?,
        Longitude::try_from(args.max_lon.unwrap_or(180.0)).context("Invalid --max-lon")?,
    );
    Ok(Some(bounds))
}

fn cmd_edit(args: EditArgs) -> Result<()> {
    let mut gpx = read_gpx(&args.input)?;

    if let Some(bounds) = crop_bounds(&args)? {
        edit::crop(&mut gpx, &bounds);
    }

    if args.start.is_some() || args.end.is_some() {
        let start = args
            .start
            .as_deref()
            .map(edit::parse_time_bound)
            .transpose()
            .context("Invalid --start")?;
        let end = args
            .end
            .as_deref()
            .map(edit::parse_time_bound)
            .transpose()
            .context("Invalid --end")?;
        edit::trim(&mut gpx, start, end);
    }

    if args.reverse || args.reverse_routes {
        edit::reverse_routes(&mut gpx);
    }
    if args.reverse || args.reverse_tracks {
        edit::reverse_tracks(&mut gpx);
    }

    let strip = if args.strip_all_metadata {
        MetadataFields::ALL
    } else {
        MetadataFields {
            name: args.strip_name,
            desc: args.strip_desc,
            author: args.strip_author,
            copyright: args.strip_copyright,
            time: args.strip_time,
            keywords: args.strip_keywords,
            links: args.strip_links,
        }
    };
    if strip != MetadataFields::default() {
        edit::strip_metadata(&mut gpx, strip);
    }

    if args.precision.is_some() || args.elevation_precision.is_some() {
        edit::round_precision(&mut gpx, args.precision, args.elevation_precision);
    }

    let output = args.output.as_deref().unwrap_or(&args.input);
    write_gpx(output, &gpx)?;
    println!("Written to: {}", output.display());
    Ok(())
}

fn cmd_merge(files: &[PathBuf], output: &Path, creator: &str) -> Result<()> {
    let documents = files
        .iter()
        .map(|f| read_gpx(f))
        .collect::<Result<Vec<_>>>()?;
    let merged = edit::merge(documents, creator);
    write_gpx(output, &merged)?;
    println!("Merged {} files into: {}", files.len(), output.display());
    println!("  Waypoints: {}", merged.waypoints.len());
    println!("  Routes: {}", merged.routes.len());
    println!("  Tracks: {}", merged.tracks.len());
    Ok(())
}

fn cmd_convert(args: ConvertArgs) -> Result<()> {
    let from = args
        .from
        .or_else(|| Format::detect(&args.input))
        .with_context(|| format!("Cannot detect format of {}; use --from", args.input.display()))?;
    let to = args
        .to
        .or_else(|| Format::detect(&args.output))
        .with_context(|| format!("Cannot detect format of {}; use --to", args.output.display()))?;

    let input = &args.input;
    let gpx = match from {
        Format::Gpx => read_gpx(input)?,
        Format::Geojson => io::read_geojson(input, &args.creator)
            .with_context(|| format!("Failed to read GeoJSON file: {}", input.display()))?,
        Format::Kml => io::read_kml(input, &args.creator)
            .with_context(|| format!("Failed to read KML file: {}", input.display()))?,
    };

    let output = &args.output;
    match to {
        Format::Gpx => write_gpx(output, &gpx)?,
        Format::Geojson => {
            let options = ConvertOptions {
                include_elevation: !args.no_elevation,
                include_time: !args.no_time,
                include_metadata: !args.no_metadata,
                types: (!args.types.is_empty()).then(|| args.types.clone()),
                join_track_segments: args.join_segments,
            };
            io::write_geojson(output, &gpx, &options)
                .with_context(|| format!("Failed to write {}", output.display()))?
        }
        Format::Kml => io::write_kml(output, &gpx)
            .with_context(|| format!("Failed to write {}", output.display()))?,
    }
    println!("Converted {} to {}", input.display(), output.display());
    Ok(())
}
