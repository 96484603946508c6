//
// extract.rs
// medimage-utils
//
// Extracts centered 2D slices along the three orthogonal views and writes them as
// min-max normalized grayscale PNGs.
//

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::{GrayImage, Luma};
use ndarray::{s, ArrayView2};

use crate::models::ExtractOptions;
use crate::nifti_io;
use crate::volume::Volume;

/// The three orthogonal views of a 3D volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Axial,
    Coronal,
    Sagittal,
}

impl View {
    pub const ALL: [View; 3] = [View::Axial, View::Coronal, View::Sagittal];

    pub fn label(self) -> &'static str {
        match self {
            View::Axial => "axial",
            View::Coronal => "coronal",
            View::Sagittal => "sagittal",
        }
    }

    /// Volume axis held fixed by this view (volume is indexed x, y, z).
    pub fn axis(self) -> usize {
        match self {
            View::Sagittal => 0,
            View::Coronal => 1,
            View::Axial => 2,
        }
    }
}

/// Writes `slices_per_view` slices per orthogonal view, centered on the configured
/// location (volume center by default). Returns the written file paths.
pub fn extract_slices(
    input: &Path,
    output_dir: &Path,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>> {
    if options.slices_per_view == 0 {
        bail!("Slice count must be greater than zero");
    }

    let volume = nifti_io::read_volume(input)?;
    let size = volume.size();
    let location = options
        .location
        .unwrap_or([size[0] / 2, size[1] / 2, size[2] / 2]);
    for axis in 0..3 {
        if location[axis] >= size[axis] {
            bail!(
                "Location component {} on axis {} is outside the volume (size {})",
                location[axis],
                axis,
                size[axis]
            );
        }
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
    let base = nifti_io::base_stem(input);

    let mut written = Vec::new();
    for view in View::ALL {
        let axis = view.axis();
        for index in centered_window(location[axis], options.slices_per_view, size[axis]) {
            let slice = slice_view(&volume, view, index);
            let path = output_dir.join(format!("{}_{}_{}.png", base, view.label(), index));
            normalize_to_gray(slice)
                .save(&path)
                .with_context(|| format!("Failed to save slice to {:?}", path))?;
            written.push(path);
        }
    }

    println!("Wrote {} slice(s) to {:?}", written.len(), output_dir);
    Ok(written)
}

fn slice_view(volume: &Volume, view: View, index: usize) -> ArrayView2<'_, f32> {
    match view {
        View::Sagittal => volume.data.slice(s![index, .., ..]),
        View::Coronal => volume.data.slice(s![.., index, ..]),
        View::Axial => volume.data.slice(s![.., .., index]),
    }
}

/// Indices of exactly `count` consecutive slices centered on `center`, shifted to stay
/// in bounds; the whole axis when `count` exceeds its length.
fn centered_window(center: usize, count: usize, len: usize) -> Range<usize> {
    if count >= len {
        return 0..len;
    }
    let half = (count - 1) / 2;
    let start = center.saturating_sub(half).min(len - count);
    start..start + count
}

/// Min-max normalizes a slice to 8-bit grayscale, flat slices mapping to black.
fn normalize_to_gray(slice: ArrayView2<'_, f32>) -> GrayImage {
    let min = slice.iter().copied().fold(f32::INFINITY, f32::min);
    let max = slice.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let scale = if max > min { 255.0 / (max - min) } else { 0.0 };

    let (rows, cols) = slice.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let value = (slice[[y as usize, x as usize]] - min) * scale;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
