//
// volume.rs
// medimage-utils
//
// In-memory 3D volume: sample array plus the physical geometry (spacing, origin, direction)
// needed to map voxel indices to world coordinates and back.
//

use ndarray::Array3;

/// Row-major 3x3 direction cosine matrix; column `c` is the physical direction of image axis `c`.
pub type Direction = [[f64; 3]; 3];

pub const IDENTITY_DIRECTION: Direction = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Physical-space description of a sample grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Physical distance between adjacent samples along each axis.
    pub spacing: [f64; 3],
    /// Physical coordinate of the sample at index (0, 0, 0).
    pub origin: [f64; 3],
    /// Orientation of the image axes in physical space. Invariant: orthonormal.
    pub direction: Direction,
}

impl Geometry {
    pub fn identity() -> Self {
        Self {
            spacing: [1.0; 3],
            origin: [0.0; 3],
            direction: IDENTITY_DIRECTION,
        }
    }

    /// Physical coordinate of the (possibly fractional) voxel `index`.
    pub fn index_to_world(&self, index: [f64; 3]) -> [f64; 3] {
        let scaled = [
            index[0] * self.spacing[0],
            index[1] * self.spacing[1],
            index[2] * self.spacing[2],
        ];
        let mut world = self.origin;
        for (r, w) in world.iter_mut().enumerate() {
            for c in 0..3 {
                *w += self.direction[r][c] * scaled[c];
            }
        }
        world
    }

    /// Continuous voxel index of the physical point `world`.
    ///
    /// Relies on the direction matrix being orthonormal, so its transpose is its inverse.
    pub fn world_to_index(&self, world: [f64; 3]) -> [f64; 3] {
        let rel = [
            world[0] - self.origin[0],
            world[1] - self.origin[1],
            world[2] - self.origin[2],
        ];
        let mut index = [0.0; 3];
        for (c, i) in index.iter_mut().enumerate() {
            let mut rotated = 0.0;
            for r in 0..3 {
                rotated += self.direction[r][c] * rel[r];
            }
            *i = rotated / self.spacing[c];
        }
        index
    }

    /// Checks the orthonormality invariant within a loose tolerance (headers are f32).
    pub fn has_orthonormal_direction(&self) -> bool {
        for c1 in 0..3 {
            for c2 in 0..3 {
                let dot: f64 = (0..3)
                    .map(|r| self.direction[r][c1] * self.direction[r][c2])
                    .sum();
                let expected = if c1 == c2 { 1.0 } else { 0.0 };
                if (dot - expected).abs() > 1e-3 {
                    return false;
                }
            }
        }
        true
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::identity()
    }
}

/// A 3D scalar image. Samples are indexed (x, y, z), matching NIfTI axis order.
#[derive(Debug, Clone)]
pub struct Volume {
    pub data: Array3<f32>,
    pub geometry: Geometry,
}

impl Volume {
    pub fn new(data: Array3<f32>, geometry: Geometry) -> Self {
        Self { data, geometry }
    }

    /// Size in voxels (x, y, z).
    pub fn size(&self) -> [usize; 3] {
        let (x, y, z) = self.data.dim();
        [x, y, z]
    }
}
