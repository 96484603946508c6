//
// resize.rs
// medimage-utils
//
// Forward resize with a reversible sidecar metadata record, and the reverse operation that
// restores the original grid from that record.
//

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use crate::models::{OutputFormat, ResizeMetadata, ResizeOptions};
use crate::nifti_io;
use crate::resample;
use crate::volume::Geometry;

/// Suffix appended to the stem of resized images.
const RESIZED_SUFFIX: &str = "_resized";
/// Full metadata file suffix; also how reverse mode is recognized.
const META_SUFFIX: &str = "_resized_meta.json";
/// Suffix appended to the stem of reverse-resized images.
const RESTORED_SUFFIX: &str = "_restored";

/// Failure modes of the metadata record itself, as opposed to plain I/O errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Malformed metadata record {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Metadata record {path:?} has a zero-sized axis")]
    InvalidSize { path: PathBuf },
    #[error("Image {path:?} referenced by the metadata record is missing")]
    MissingImage { path: PathBuf },
}

/// True when a path names a resize metadata record rather than an image.
pub fn is_metadata_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.ends_with(META_SUFFIX))
}

/// Resizes an image to `new_size`, preserving physical extent, and writes the resampled
/// image plus a metadata record capturing the original geometry.
///
/// Returns the paths of the written image and record.
pub fn resize_image(
    input: &Path,
    new_size: [usize; 3],
    output_dir: &Path,
    options: &ResizeOptions,
) -> Result<(PathBuf, PathBuf)> {
    if new_size.contains(&0) {
        bail!("Target size components must be positive, got {:?}", new_size);
    }

    let volume = nifti_io::read_volume(input)?;
    let original_size = volume.size();
    let original = volume.geometry.clone();

    // Physical extent is preserved: spacing scales by size_old / size_new per axis.
    let mut spacing = [0.0; 3];
    for axis in 0..3 {
        spacing[axis] =
            original.spacing[axis] * original_size[axis] as f64 / new_size[axis] as f64;
    }
    let target = Geometry {
        spacing,
        origin: original.origin,
        direction: original.direction,
    };
    let resized = resample::resample_to_grid(&volume, new_size, target);

    let format = output_format_for(input, options)?;
    let base = nifti_io::base_stem(input);
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    let image_name = format!("{}{}.{}", base, RESIZED_SUFFIX, format.extension());
    let image_path = output_dir.join(&image_name);
    let meta_path = output_dir.join(format!("{}{}", base, META_SUFFIX));

    nifti_io::write_volume(&image_path, &resized)?;

    let record = ResizeMetadata {
        image_file: image_name,
        image_sha256: sha256_of(&image_path)?,
        original_size,
        original_spacing: original.spacing,
        original_origin: original.origin,
        original_direction: original.direction,
    };
    let json = serde_json::to_string_pretty(&record).context("Failed to encode metadata record")?;
    fs::write(&meta_path, json)
        .with_context(|| format!("Failed to write metadata record {:?}", meta_path))?;

    println!("Resized image saved to: {:?}", image_path);
    println!("Metadata record saved to: {:?}", meta_path);
    Ok((image_path, meta_path))
}

/// Inverts a prior resize using its metadata record, restoring the original size, spacing,
/// origin, and direction. Returns the path of the restored image.
pub fn reverse_resize(
    meta_path: &Path,
    output_dir: &Path,
    options: &ResizeOptions,
) -> Result<PathBuf> {
    let record = read_metadata(meta_path)?;

    let parent = meta_path.parent().unwrap_or_else(|| Path::new("."));
    let image_path = parent.join(&record.image_file);
    if !image_path.is_file() {
        return Err(MetadataError::MissingImage { path: image_path }.into());
    }

    match sha256_of(&image_path) {
        Ok(digest) if digest != record.image_sha256 => {
            warn!(
                "Checksum of {:?} does not match its metadata record; the image may have been replaced",
                image_path
            );
        }
        Ok(_) => {}
        Err(e) => warn!("Could not verify checksum of {:?}: {:#}", image_path, e),
    }

    let volume = nifti_io::read_volume(&image_path)?;
    let target = Geometry {
        spacing: record.original_spacing,
        origin: record.original_origin,
        direction: record.original_direction,
    };
    let restored = resample::resample_to_grid(&volume, record.original_size, target);

    let format = output_format_for(&image_path, options)?;
    let base = nifti_io::base_stem(&image_path);
    let base = base.strip_suffix(RESIZED_SUFFIX).unwrap_or(&base);
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    let output_path = output_dir.join(format!("{}{}.{}", base, RESTORED_SUFFIX, format.extension()));
    nifti_io::write_volume(&output_path, &restored)?;

    println!("Restored image saved to: {:?}", output_path);
    Ok(output_path)
}

/// Parses and sanity-checks a metadata record.
pub fn read_metadata(path: &Path) -> Result<ResizeMetadata> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read metadata record {:?}", path))?;
    let record: ResizeMetadata =
        serde_json::from_str(&text).map_err(|source| MetadataError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    if record.original_size.contains(&0) {
        return Err(MetadataError::InvalidSize {
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(record)
}

fn output_format_for(input: &Path, options: &ResizeOptions) -> Result<OutputFormat> {
    match options.output_format {
        Some(format) => Ok(format),
        None => OutputFormat::from_path(input)
            .with_context(|| format!("Cannot infer output format from {:?}", input)),
    }
}

fn sha256_of(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_paths_are_recognized_by_suffix() {
        assert!(is_metadata_path(Path::new("/out/scan_resized_meta.json")));
        assert!(!is_metadata_path(Path::new("/out/scan_resized.nii")));
        assert!(!is_metadata_path(Path::new("/out/meta.json")));
    }
}
