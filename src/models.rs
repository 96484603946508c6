//
// models.rs
// medimage-utils
//
// Defines the serializable resize metadata record and the option structs with documented defaults.
//

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::volume::Direction;

/// Sidecar record written beside a resized image. Captures the pre-resize geometry so the
/// resize can be inverted later; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeMetadata {
    /// File name of the resized image this record describes, relative to the record itself.
    pub image_file: String,
    /// Hex-encoded SHA-256 of the resized image file, for detecting a swapped image.
    pub image_sha256: String,
    /// Per-axis sample counts before the resize.
    pub original_size: [usize; 3],
    /// Per-axis spacing before the resize.
    pub original_spacing: [f64; 3],
    /// Origin before the resize.
    pub original_origin: [f64; 3],
    /// Direction matrix before the resize.
    pub original_direction: Direction,
}

/// On-disk volume formats the tool can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Nii,
    NiiGz,
}

impl OutputFormat {
    /// File extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Nii => "nii",
            OutputFormat::NiiGz => "nii.gz",
        }
    }

    /// Format implied by a file name, if it carries a recognized NIfTI extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".nii.gz") {
            Some(OutputFormat::NiiGz)
        } else if name.ends_with(".nii") {
            Some(OutputFormat::Nii)
        } else {
            None
        }
    }
}

/// Options shared by forward and reverse resize runs.
#[derive(Debug, Clone, Default)]
pub struct ResizeOptions {
    /// Output format. Default (`None`): each input keeps its own format.
    pub output_format: Option<OutputFormat>,
}

/// Options for 2D slice extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Voxel location (x, y, z) the slice windows are centered on.
    /// Default (`None`): the volume center, `size[axis] / 2` per axis.
    pub location: Option<[usize; 3]>,
    /// Number of slices written per view. Default: 1.
    pub slices_per_view: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            location: None,
            slices_per_view: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_is_inferred_from_extensions() {
        assert_eq!(
            OutputFormat::from_path(&PathBuf::from("/tmp/scan.nii")),
            Some(OutputFormat::Nii)
        );
        assert_eq!(
            OutputFormat::from_path(&PathBuf::from("scan.nii.gz")),
            Some(OutputFormat::NiiGz)
        );
        assert_eq!(OutputFormat::from_path(&PathBuf::from("scan.mha")), None);
        assert_eq!(OutputFormat::from_path(&PathBuf::from("scan")), None);
    }
}
