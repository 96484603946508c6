//
// resample.rs
// medimage-utils
//
// Resamples a volume onto a target grid by mapping each output voxel through physical space
// and interpolating the input trilinearly.
//

use ndarray::Array3;

use crate::volume::{Geometry, Volume};

/// Value used for output voxels that fall outside the input field of view.
const OUTSIDE_VALUE: f32 = 0.0;

/// Resamples `input` onto a grid of `size` voxels described by `geometry`.
///
/// Each output index is converted to a physical point with the output geometry, then to a
/// continuous index in the input, where the value is interpolated trilinearly.
pub fn resample_to_grid(input: &Volume, size: [usize; 3], geometry: Geometry) -> Volume {
    let mut output = Array3::<f32>::zeros(size);
    for ((x, y, z), value) in output.indexed_iter_mut() {
        let world = geometry.index_to_world([x as f64, y as f64, z as f64]);
        let index = input.geometry.world_to_index(world);
        *value = sample_trilinear(&input.data, index);
    }
    Volume::new(output, geometry)
}

/// Trilinear interpolation at a continuous index; corners outside the array contribute
/// the outside value.
fn sample_trilinear(data: &Array3<f32>, index: [f64; 3]) -> f32 {
    let x0 = index[0].floor();
    let y0 = index[1].floor();
    let z0 = index[2].floor();
    let fx = index[0] - x0;
    let fy = index[1] - y0;
    let fz = index[2] - z0;

    let mut accum = 0.0f64;
    for dz in 0..2 {
        for dy in 0..2 {
            for dx in 0..2 {
                let weight = (if dx == 0 { 1.0 - fx } else { fx })
                    * (if dy == 0 { 1.0 - fy } else { fy })
                    * (if dz == 0 { 1.0 - fz } else { fz });
                if weight == 0.0 {
                    continue;
                }
                let corner = corner_value(
                    data,
                    x0 as i64 + dx as i64,
                    y0 as i64 + dy as i64,
                    z0 as i64 + dz as i64,
                );
                accum += weight * f64::from(corner);
            }
        }
    }
    accum as f32
}

fn corner_value(data: &Array3<f32>, x: i64, y: i64, z: i64) -> f32 {
    let (nx, ny, nz) = data.dim();
    if x < 0 || y < 0 || z < 0 || x >= nx as i64 || y >= ny as i64 || z >= nz as i64 {
        return OUTSIDE_VALUE;
    }
    data[[x as usize, y as usize, z as usize]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn ramp_volume(n: usize) -> Volume {
        let data = Array3::from_shape_fn((n, n, n), |(x, y, z)| (x + 10 * y + 100 * z) as f32);
        Volume::new(data, Geometry::identity())
    }

    #[test]
    fn sampling_at_integer_indices_is_exact() {
        let volume = ramp_volume(4);
        assert_eq!(sample_trilinear(&volume.data, [2.0, 1.0, 3.0]), 312.0);
    }

    #[test]
    fn sampling_between_samples_interpolates_linearly() {
        let volume = ramp_volume(4);
        let value = sample_trilinear(&volume.data, [1.5, 0.0, 0.0]);
        assert!((value - 1.5).abs() < 1e-6);
    }

    #[test]
    fn resampling_to_the_same_grid_is_identity() {
        let volume = ramp_volume(3);
        let resampled = resample_to_grid(&volume, [3, 3, 3], volume.geometry.clone());
        assert_eq!(resampled.data, volume.data);
    }

    #[test]
    fn downsampling_halves_the_grid_and_keeps_physical_positions() {
        let volume = ramp_volume(4);
        let target = Geometry {
            spacing: [2.0, 2.0, 2.0],
            ..Geometry::identity()
        };
        let resampled = resample_to_grid(&volume, [2, 2, 2], target);
        // Output voxel (1, 0, 0) sits at world x = 2.0, which is input index x = 2.
        assert_eq!(resampled.data[[1, 0, 0]], 2.0);
        assert_eq!(resampled.data[[0, 1, 1]], 220.0);
    }

    #[test]
    fn points_outside_the_input_read_as_zero() {
        let volume = ramp_volume(2);
        assert_eq!(sample_trilinear(&volume.data, [-2.0, 0.0, 0.0]), 0.0);
        assert_eq!(sample_trilinear(&volume.data, [0.0, 5.0, 0.0]), 0.0);
    }
}
