//! nmview-cli: Command-line interface for nmview.
//!
//! Reads scans and wavefronts as JSON, builds interpolated maps and
//! near-field propagation stacks, and writes the results as JSON.
#![allow(clippy::uninlined_format_args, clippy::needless_pass_by_value)]

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use nmview_algorithms::{
    interpolate, reduce_full, reduce_window, InterpolationConfig, MapOrigin, PropagationConfig,
    PropagationKernel, WavefrontPropagator,
};
use nmview_core::{Complex64, ScanPositions};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] nmview_core::Error),

    #[error("Invalid input: {0}")]
    Input(String),
}

/// Row order of the written map.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Origin {
    /// Row 0 holds the largest y
    UpperLeft,
    /// Row 0 holds the smallest y
    LowerLeft,
}

impl From<Origin> for MapOrigin {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::UpperLeft => MapOrigin::UpperLeft,
            Origin::LowerLeft => MapOrigin::LowerLeft,
        }
    }
}

/// Propagation kernel selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kernel {
    /// Exact angular spectrum transfer function
    Angular,
    /// Paraxial Fresnel approximation
    Fresnel,
}

impl From<Kernel> for PropagationKernel {
    fn from(kernel: Kernel) -> Self {
        match kernel {
            Kernel::Angular => PropagationKernel::AngularSpectrum,
            Kernel::Fresnel => PropagationKernel::Fresnel,
        }
    }
}

/// Scanning X-ray microscopy map and wavefront tools.
#[derive(Parser)]
#[command(name = "nmview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpolate scan data onto a regular grid
    Map(MapArgs),

    /// Propagate a wavefront to one or more distances
    Propagate(PropagateArgs),
}

#[derive(clap::Args, Debug)]
struct MapArgs {
    /// Scan file with positions and per-position data
    input: PathBuf,

    /// Output map file
    #[arg(short, long)]
    output: PathBuf,

    /// Grid nodes per typical scan step
    #[arg(long, default_value = "1")]
    oversampling: u32,

    /// Row order of the map
    #[arg(long, value_enum, default_value = "upper-left")]
    origin: Origin,

    /// Spectral window on the axis, lower and upper value
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"], allow_negative_numbers = true)]
    roi: Option<Vec<f64>>,

    /// Fill grid rows in parallel
    #[arg(long)]
    parallel: bool,
}

#[derive(clap::Args, Debug)]
struct PropagateArgs {
    /// Wavefront file with real and imaginary parts
    input: PathBuf,

    /// Output stack file
    #[arg(short, long)]
    output: PathBuf,

    /// Pixel size (m)
    #[arg(long)]
    pixel_size: f64,

    /// Photon energy (keV)
    #[arg(long)]
    energy: f64,

    /// Propagation distance (m), repeatable
    #[arg(short, long = "distance", required = true, allow_negative_numbers = true)]
    distances: Vec<f64>,

    /// Transfer function
    #[arg(long, value_enum, default_value = "angular")]
    kernel: Kernel,
}

/// Scan file: positions plus either spectra with their axis, or one
/// value per position.
#[derive(Debug, Deserialize, Serialize)]
struct ScanFile {
    positions: Vec<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    axis: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize, Serialize)]
struct MapFile {
    x: Vec<f64>,
    y: Vec<f64>,
    spacing: f64,
    values: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize, Serialize)]
struct FieldFile {
    re: Vec<Vec<f64>>,
    im: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize, Serialize)]
struct StackFile {
    distances: Vec<f64>,
    re: Vec<Vec<Vec<f64>>>,
    im: Vec<Vec<Vec<f64>>>,
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli.command) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    let start = Instant::now();
    match command {
        Commands::Map(args) => {
            let map = run_map(&args)?;
            write_json(&args.output, &map)?;
            println!(
                "Wrote {}x{} map to {} in {:.2}s",
                map.y.len(),
                map.x.len(),
                args.output.display(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Propagate(args) => {
            let stack = run_propagate(&args)?;
            write_json(&args.output, &stack)?;
            println!(
                "Wrote {} planes to {} in {:.2}s",
                stack.distances.len(),
                args.output.display(),
                start.elapsed().as_secs_f64()
            );
        }
    }
    Ok(())
}

fn run_map(args: &MapArgs) -> Result<MapFile> {
    let scan: ScanFile = read_json(&args.input)?;
    let positions = ScanPositions::new(scan.positions)?;
    info!("Read {} positions from {}", positions.len(), args.input.display());

    let signal = match (scan.values, scan.data) {
        (Some(values), None) => {
            if args.roi.is_some() {
                return Err(CliError::Input(
                    "--roi needs spectra (\"data\" and \"axis\"), not \"values\"".to_string(),
                ));
            }
            values
        }
        (None, Some(rows)) => {
            let data = to_array(rows, "data")?;
            match args.roi.as_deref() {
                Some(&[lower, upper]) => {
                    let axis = scan.axis.ok_or_else(|| {
                        CliError::Input("--roi needs an \"axis\" in the scan file".to_string())
                    })?;
                    reduce_window(&data.view(), &axis, lower, upper)?
                }
                Some(_) => return Err(CliError::Input("--roi takes two values".to_string())),
                None => reduce_full(&data.view())?,
            }
        }
        (Some(_), Some(_)) => {
            return Err(CliError::Input(
                "scan file has both \"values\" and \"data\"".to_string(),
            ))
        }
        (None, None) => {
            return Err(CliError::Input(
                "scan file needs \"values\" or \"data\"".to_string(),
            ))
        }
    };

    let config = InterpolationConfig::default()
        .with_oversampling(args.oversampling)
        .with_origin(args.origin.into())
        .with_parallel(args.parallel);
    debug!("Interpolation config: {:?}", config);
    let grid = interpolate(&positions, &signal, &config)?;

    Ok(MapFile {
        x: grid.x_coords().to_vec(),
        y: grid.y_coords().to_vec(),
        spacing: grid.spacing(),
        values: from_array(&grid.values().view()),
    })
}

fn run_propagate(args: &PropagateArgs) -> Result<StackFile> {
    let file: FieldFile = read_json(&args.input)?;
    let re = to_array(file.re, "re")?;
    let im = to_array(file.im, "im")?;
    if re.dim() != im.dim() {
        return Err(CliError::Input(format!(
            "real part is {:?} but imaginary part is {:?}",
            re.dim(),
            im.dim()
        )));
    }
    let field = ndarray::Zip::from(&re)
        .and(&im)
        .map_collect(|&r, &i| Complex64::new(r, i));
    info!("Read {:?} wavefront from {}", field.dim(), args.input.display());

    let config = PropagationConfig::default().with_kernel(args.kernel.into());
    let stack = WavefrontPropagator::new(config).propagate(
        &field.view(),
        args.pixel_size,
        &args.distances,
        args.energy,
    )?;

    let mut re = Vec::with_capacity(stack.len());
    let mut im = Vec::with_capacity(stack.len());
    for (_, plane) in stack.iter() {
        re.push(from_array(&plane.mapv(|c| c.re).view()));
        im.push(from_array(&plane.mapv(|c| c.im).view()));
    }
    Ok(StackFile {
        distances: stack.distances().to_vec(),
        re,
        im,
    })
}

fn to_array(rows: Vec<Vec<f64>>, what: &str) -> Result<Array2<f64>> {
    let cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != cols) {
        return Err(CliError::Input(format!("rows of \"{what}\" differ in length")));
    }
    let shape = (rows.len(), cols);
    Array2::from_shape_vec(shape, rows.into_iter().flatten().collect())
        .map_err(|e| CliError::Input(format!("\"{what}\": {e}")))
}

fn from_array(array: &ArrayView2<'_, f64>) -> Vec<Vec<f64>> {
    array.rows().into_iter().map(|row| row.to_vec()).collect()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
