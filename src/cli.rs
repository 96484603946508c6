//
// cli.rs
// medimage-utils
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::{batch, extract, models, resize};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "medimage-utils")]
#[command(about = "Utilities for 3D medical images (NIfTI)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resize images preserving physical extent; pass a *_resized_meta.json path
    /// as --imagePath to reverse a prior resize
    Resize {
        /// Path to a single input image (or metadata record, for reverse mode)
        #[arg(long = "imagePath")]
        image_path: Option<PathBuf>,
        /// Path to a folder of input images
        #[arg(long = "folderPath", conflicts_with = "image_path")]
        folder_path: Option<PathBuf>,
        /// Target size as x,y,z (required unless reversing)
        #[arg(long = "newSize", value_parser = parse_size_triple)]
        new_size: Option<[usize; 3]>,
        /// Output directory
        #[arg(long = "outputPath")]
        output_path: PathBuf,
        /// Output format (defaults to each input's own format)
        #[arg(long = "outputFormat", value_enum)]
        output_format: Option<OutputFormat>,
    },
    /// Extract 2D slices from 3D images along the three orthogonal views
    #[command(name = "extract2D")]
    Extract2d {
        /// Path to a single input image
        #[arg(long = "imagePath")]
        image_path: Option<PathBuf>,
        /// Path to a folder of input images
        #[arg(long = "folderPath", conflicts_with = "image_path")]
        folder_path: Option<PathBuf>,
        /// Voxel location as x,y,z (defaults to the volume center)
        #[arg(long, value_parser = parse_location_triple)]
        location: Option<[usize; 3]>,
        /// Number of slices per view
        #[arg(long = "N", default_value_t = 1)]
        n: usize,
        /// Output directory
        #[arg(long = "outputPath")]
        output_path: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Nii,
    #[value(name = "nii.gz")]
    NiiGz,
}

impl From<OutputFormat> for models::OutputFormat {
    fn from(value: OutputFormat) -> Self {
        match value {
            OutputFormat::Nii => models::OutputFormat::Nii,
            OutputFormat::NiiGz => models::OutputFormat::NiiGz,
        }
    }
}

enum Input {
    Image(PathBuf),
    Folder(PathBuf),
}

pub fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resize {
            image_path,
            folder_path,
            new_size,
            output_path,
            output_format,
        } => {
            let options = models::ResizeOptions {
                output_format: output_format.map(Into::into),
            };
            match select_input(image_path, folder_path)? {
                Input::Image(path) => run_resize(&path, new_size, &output_path, &options)?,
                Input::Folder(dir) => batch::process_folder(&dir, |path| {
                    run_resize(path, new_size, &output_path, &options)
                })?,
            }
        }
        Commands::Extract2d {
            image_path,
            folder_path,
            location,
            n,
            output_path,
        } => {
            if n == 0 {
                bail!("--N must be greater than zero");
            }
            let options = models::ExtractOptions {
                location,
                slices_per_view: n,
            };
            match select_input(image_path, folder_path)? {
                Input::Image(path) => {
                    extract::extract_slices(&path, &output_path, &options)?;
                }
                Input::Folder(dir) => batch::process_folder(&dir, |path| {
                    extract::extract_slices(path, &output_path, &options).map(|_| ())
                })?,
            }
        }
    }

    Ok(())
}

fn run_resize(
    path: &Path,
    new_size: Option<[usize; 3]>,
    output_path: &Path,
    options: &models::ResizeOptions,
) -> Result<()> {
    if resize::is_metadata_path(path) {
        if new_size.is_some() {
            warn!("--newSize is ignored when reversing from a metadata record");
        }
        resize::reverse_resize(path, output_path, options)?;
    } else {
        let Some(size) = new_size else {
            bail!("--newSize is required when resizing an image");
        };
        resize::resize_image(path, size, output_path, options)?;
    }
    Ok(())
}

fn select_input(image_path: Option<PathBuf>, folder_path: Option<PathBuf>) -> Result<Input> {
    // Clap already rejects passing both; reject passing neither here.
    match (image_path, folder_path) {
        (Some(path), None) => Ok(Input::Image(path)),
        (None, Some(dir)) => Ok(Input::Folder(dir)),
        _ => bail!("Provide either --imagePath or --folderPath"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // try_init so embedding in tests or other binaries cannot panic on double init.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn parse_size_triple(raw: &str) -> Result<[usize; 3], String> {
    let triple = parse_triple(raw)?;
    if triple.contains(&0) {
        return Err("size components must be positive integers".to_string());
    }
    Ok(triple)
}

fn parse_location_triple(raw: &str) -> Result<[usize; 3], String> {
    parse_triple(raw)
}

/// Parses "x,y,z" (optionally bracketed, as in the original tool) into three
/// non-negative integers.
fn parse_triple(raw: &str) -> Result<[usize; 3], String> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected three comma-separated values, got {:?}", raw));
    }
    let mut triple = [0usize; 3];
    for (slot, part) in triple.iter_mut().zip(&parts) {
        *slot = part
            .parse::<usize>()
            .map_err(|_| format!("components must be non-negative integers, got {:?}", part))?;
    }
    Ok(triple)
}
