//
// nifti_io.rs
// medimage-utils
//
// Reads and writes NIfTI-1 volumes, translating between header fields (sform/qform/pixdim)
// and the in-memory geometry representation.
//

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use ndarray::Ix3;
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use tracing::warn;

use crate::volume::{Geometry, Volume, IDENTITY_DIRECTION};

/// Reads a 3D NIfTI volume (.nii or .nii.gz) together with its physical geometry.
pub fn read_volume(path: &Path) -> Result<Volume> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {:?}", path))?;
    let geometry = geometry_from_header(obj.header());

    let data = obj
        .into_volume()
        .into_ndarray::<f32>()
        .with_context(|| format!("Failed to decode voxel data of {:?}", path))?;
    if data.ndim() != 3 {
        bail!(
            "Expected a 3D volume in {:?}, found {} dimensions",
            path,
            data.ndim()
        );
    }
    let data = data
        .into_dimensionality::<Ix3>()
        .context("Failed to view volume as 3D array")?;

    if !geometry.has_orthonormal_direction() {
        warn!(
            "Direction matrix of {:?} is not orthonormal; world coordinates may be inexact",
            path
        );
    }

    Ok(Volume::new(data, geometry))
}

/// Writes a volume as NIfTI; the format (plain or gzipped) follows the path's extension.
pub fn write_volume(path: &Path, volume: &Volume) -> Result<()> {
    let header = header_for_geometry(&volume.geometry);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&volume.data)
        .map_err(|e| anyhow!("Failed to write NIfTI file {:?}: {}", path, e))
}

/// File name without its NIfTI extension, for deriving output names.
pub fn base_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_suffix(".nii.gz")
        .or_else(|| name.strip_suffix(".nii"))
        .map(str::to_owned)
        .unwrap_or(name)
}

/// Decodes geometry from the header, preferring sform, then qform, then bare pixdim.
fn geometry_from_header(header: &NiftiHeader) -> Geometry {
    let affine: [[f64; 4]; 3] = if header.sform_code > 0 {
        [
            row_to_f64(header.srow_x),
            row_to_f64(header.srow_y),
            row_to_f64(header.srow_z),
        ]
    } else if header.qform_code > 0 {
        qform_affine(header)
    } else {
        let dx = f64::from(header.pixdim[1]);
        let dy = f64::from(header.pixdim[2]);
        let dz = f64::from(header.pixdim[3]);
        [
            [dx, 0.0, 0.0, 0.0],
            [0.0, dy, 0.0, 0.0],
            [0.0, 0.0, dz, 0.0],
        ]
    };

    let origin = [affine[0][3], affine[1][3], affine[2][3]];

    let mut spacing = [0.0; 3];
    let mut direction = IDENTITY_DIRECTION;
    for c in 0..3 {
        let norm = (affine[0][c] * affine[0][c]
            + affine[1][c] * affine[1][c]
            + affine[2][c] * affine[2][c])
            .sqrt();
        if norm > 1e-9 {
            spacing[c] = norm;
            for r in 0..3 {
                direction[r][c] = affine[r][c] / norm;
            }
        } else {
            // Degenerate column: keep the identity axis and unit spacing.
            spacing[c] = 1.0;
        }
    }

    Geometry {
        spacing,
        origin,
        direction,
    }
}

/// Quaternion form of the orientation, per the NIfTI-1 standard.
fn qform_affine(header: &NiftiHeader) -> [[f64; 4]; 3] {
    let b = f64::from(header.quatern_b);
    let c = f64::from(header.quatern_c);
    let d = f64::from(header.quatern_d);
    let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();

    let qfac = if header.pixdim[0] == 0.0 {
        1.0
    } else {
        f64::from(header.pixdim[0])
    };
    let dx = f64::from(header.pixdim[1]);
    let dy = f64::from(header.pixdim[2]);
    let dz = f64::from(header.pixdim[3]) * qfac;

    let qx = f64::from(header.quatern_x);
    let qy = f64::from(header.quatern_y);
    let qz = f64::from(header.quatern_z);

    [
        [
            (a * a + b * b - c * c - d * d) * dx,
            (2.0 * b * c - 2.0 * a * d) * dy,
            (2.0 * b * d + 2.0 * a * c) * dz,
            qx,
        ],
        [
            (2.0 * b * c + 2.0 * a * d) * dx,
            (a * a + c * c - b * b - d * d) * dy,
            (2.0 * c * d - 2.0 * a * b) * dz,
            qy,
        ],
        [
            (2.0 * b * d - 2.0 * a * c) * dx,
            (2.0 * c * d + 2.0 * a * b) * dy,
            (a * a + d * d - c * c - b * b) * dz,
            qz,
        ],
    ]
}

/// Builds a reference header carrying the geometry as an sform affine plus pixdim.
fn header_for_geometry(geometry: &Geometry) -> NiftiHeader {
    let mut pixdim = [1.0f32; 8];
    for axis in 0..3 {
        pixdim[axis + 1] = geometry.spacing[axis] as f32;
    }

    let srow = |r: usize| -> [f32; 4] {
        [
            (geometry.direction[r][0] * geometry.spacing[0]) as f32,
            (geometry.direction[r][1] * geometry.spacing[1]) as f32,
            (geometry.direction[r][2] * geometry.spacing[2]) as f32,
            geometry.origin[r] as f32,
        ]
    };

    NiftiHeader {
        pixdim,
        srow_x: srow(0),
        srow_y: srow(1),
        srow_z: srow(2),
        sform_code: 1,
        qform_code: 0,
        ..NiftiHeader::default()
    }
}

fn row_to_f64(row: [f32; 4]) -> [f64; 4] {
    [
        f64::from(row[0]),
        f64::from(row[1]),
        f64::from(row[2]),
        f64::from(row[3]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_stem_strips_both_nifti_extensions() {
        assert_eq!(base_stem(Path::new("/data/brain.nii")), "brain");
        assert_eq!(base_stem(Path::new("brain.nii.gz")), "brain");
        assert_eq!(base_stem(Path::new("brain.tar")), "brain.tar");
    }

    #[test]
    fn header_geometry_roundtrips_through_sform() {
        let geometry = Geometry {
            spacing: [0.5, 1.0, 2.5],
            origin: [-12.0, 4.5, 80.0],
            direction: [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        };
        let header = header_for_geometry(&geometry);
        let decoded = geometry_from_header(&header);
        for axis in 0..3 {
            assert!((decoded.spacing[axis] - geometry.spacing[axis]).abs() < 1e-5);
            assert!((decoded.origin[axis] - geometry.origin[axis]).abs() < 1e-5);
        }
        for r in 0..3 {
            for c in 0..3 {
                assert!((decoded.direction[r][c] - geometry.direction[r][c]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn pixdim_fallback_yields_axis_aligned_geometry() {
        let header = NiftiHeader {
            pixdim: [1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 1.0],
            sform_code: 0,
            qform_code: 0,
            ..NiftiHeader::default()
        };
        let geometry = geometry_from_header(&header);
        assert_eq!(geometry.spacing, [2.0, 3.0, 4.0]);
        assert_eq!(geometry.origin, [0.0, 0.0, 0.0]);
        assert_eq!(geometry.direction, IDENTITY_DIRECTION);
    }
}
