use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use geogate::engine::EngineStatus;
use geogate::export::ExportArtifact;
use geogate::{GatewayConfig, RawFile, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Geojson,
    Fgb,
    Pmtiles,
    Html,
    All,
}

/// Convert a geospatial file to GeoJSON and write the export artifacts.
#[derive(Debug, Parser)]
#[command(name = "geogate-convert", version, about)]
struct Args {
    /// GeoPackage, zipped Shapefile, GeoTIFF, GeoJSON or CSV file
    input: PathBuf,

    /// Directory the artifacts are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Which artifact(s) to write
    #[arg(short, long, value_enum, default_value_t = Format::Geojson)]
    format: Format,

    /// Skip the shapefile reader; zips resolve to sample data
    #[arg(long)]
    no_shapefile: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(written) => {
            for path in written {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<Vec<PathBuf>> {
    let file = RawFile::from_path(&args.input)?;

    // The command line build links no engine.
    let engine = EngineStatus::unavailable("no geospatial engine linked into this build");
    let mut session = Session::new(GatewayConfig::from_env(), engine);
    if args.no_shapefile {
        session = session.with_shapefile_parser(None);
    }

    let current = session
        .process(file)
        .with_context(|| format!("converting {}", args.input.display()))?;
    log::info!(
        "{} feature(s) via {:?} path",
        current.conversion.feature_count(),
        current.mode
    );

    let mut artifacts: Vec<ExportArtifact> = current
        .exports
        .iter()
        .filter(|a| wanted(args.format, &a.filename))
        .cloned()
        .collect();
    if matches!(args.format, Format::Html | Format::All) {
        artifacts.push(session.html_map().context("building HTML map")?);
    }

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    artifacts
        .iter()
        .map(|a| {
            a.write_to(&args.out_dir)
                .with_context(|| format!("writing {}", a.filename))
        })
        .collect()
}

/// Whether an attached export matches the requested format.
fn wanted(format: Format, filename: &str) -> bool {
    match format {
        Format::All => true,
        Format::Html => false,
        Format::Geojson => filename.ends_with(".geojson") || filename.ends_with(".cog.tif"),
        Format::Fgb => filename.ends_with(".fgb"),
        Format::Pmtiles => filename.ends_with(".pmtiles"),
    }
}
