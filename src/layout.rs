//! Four dimensional shape of chunks and images

use crate::error::{ImageError, Result};
use crate::geometry::Vector3;
use crate::types::Dimension;
use serde::{Deserialize, Serialize};

/// Number of axes every shape has (row, column, slice, time)
pub const DIMS: usize = 4;

/// Extent of a block of voxels along row, column, slice and time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NDimensional {
    size: [usize; DIMS],
}

impl NDimensional {
    /// Create a shape, every extent must be at least 1
    pub fn new(size: [usize; DIMS]) -> Result<Self> {
        if size.iter().any(|&s| s == 0) {
            return Err(ImageError::InvalidDimensions(format!(
                "All extents must be non-zero, got {:?}",
                size
            )));
        }
        Ok(Self { size })
    }

    /// Create a shape from up to four extents, missing axes are 1
    pub fn from_slice(extents: &[usize]) -> Result<Self> {
        if extents.len() > DIMS {
            return Err(ImageError::InvalidDimensions(format!(
                "At most {} extents allowed, got {}",
                DIMS,
                extents.len()
            )));
        }
        let mut size = [1; DIMS];
        size[..extents.len()].copy_from_slice(extents);
        Self::new(size)
    }

    pub fn size(&self) -> [usize; DIMS] {
        self.size
    }

    /// Extent along one axis
    pub fn dim_size(&self, dim: Dimension) -> usize {
        self.size[dim.to_index()]
    }

    /// Total number of voxels
    pub fn volume(&self) -> usize {
        self.size.iter().product()
    }

    /// Number of axes up to and including the last one with extent > 1, at least 1
    pub fn relevant_dims(&self) -> usize {
        self.size
            .iter()
            .rposition(|&s| s > 1)
            .map(|i| i + 1)
            .unwrap_or(1)
    }

    pub fn is_in_range(&self, coords: [usize; DIMS]) -> bool {
        coords.iter().zip(self.size.iter()).all(|(&c, &s)| c < s)
    }

    /// Linear index of `coords`, row fastest
    pub fn linear_index(&self, coords: [usize; DIMS]) -> usize {
        let mut index = 0;
        let mut stride = 1;
        for (c, s) in coords.iter().zip(self.size.iter()) {
            index += c * stride;
            stride *= s;
        }
        index
    }

    /// Coordinates of a linear index
    pub fn coords(&self, index: usize) -> [usize; DIMS] {
        let mut coords = [0; DIMS];
        let mut remaining = index;
        for (c, s) in coords.iter_mut().zip(self.size.iter()) {
            *c = remaining % s;
            remaining /= s;
        }
        coords
    }

    /// Physical extent covered by the first three axes
    ///
    /// Unknown (non finite) gaps count as zero.
    pub fn fov(&self, voxel_size: Vector3, voxel_gap: Vector3) -> Vector3 {
        let mut fov = [0.0; 3];
        for i in 0..3 {
            let gap = if voxel_gap[i].is_finite() { voxel_gap[i] } else { 0.0 };
            let n = self.size[i] as f64;
            fov[i] = voxel_size[i] * n + gap * (n - 1.0);
        }
        fov
    }

    /// Extents joined like `4x4x3x1`
    pub fn size_string(&self) -> String {
        self.size
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("x")
    }
}

impl Default for NDimensional {
    fn default() -> Self {
        Self { size: [1; DIMS] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_creation() {
        let shape = NDimensional::from_slice(&[4, 4, 3]).unwrap();
        assert_eq!(shape.size(), [4, 4, 3, 1]);
        assert_eq!(shape.volume(), 48);
        assert_eq!(shape.dim_size(Dimension::Slice), 3);
        assert!(NDimensional::new([4, 0, 1, 1]).is_err());
        assert!(NDimensional::from_slice(&[1, 1, 1, 1, 1]).is_err());
    }

    #[test]
    fn test_relevant_dims() {
        assert_eq!(NDimensional::new([1, 1, 1, 1]).unwrap().relevant_dims(), 1);
        assert_eq!(NDimensional::new([4, 4, 1, 1]).unwrap().relevant_dims(), 2);
        assert_eq!(NDimensional::new([4, 1, 1, 3]).unwrap().relevant_dims(), 4);
    }

    #[test]
    fn test_index_conversion() {
        let shape = NDimensional::new([5, 7, 3, 2]).unwrap();
        let coords = [4, 2, 1, 1];
        let index = shape.linear_index(coords);
        assert_eq!(index, 4 + 2 * 5 + 35 + 105);
        assert_eq!(shape.coords(index), coords);
        assert!(shape.is_in_range(coords));
        assert!(!shape.is_in_range([5, 0, 0, 0]));
    }

    #[test]
    fn test_fov() {
        let shape = NDimensional::new([10, 10, 5, 1]).unwrap();
        let fov = shape.fov([1.0, 1.0, 2.0], [0.0, 0.0, 0.5]);
        assert_eq!(fov, [10.0, 10.0, 12.0]);
        let fov = shape.fov([1.0, 1.0, 2.0], [0.0, 0.0, f64::NEG_INFINITY]);
        assert_eq!(fov[2], 10.0);
        assert_eq!(shape.size_string(), "10x10x5x1");
    }
}
