//! chunkimage - assembly of medical image chunks
//!
//! A pure Rust library turning a stream of loosely ordered voxel blocks
//! ("chunks": slices, volumes or whole time series, each carrying its own
//! metadata) into a sorted, randomly addressable four dimensional image.
//!
//! # Features
//!
//! - Chunks with typed, shared pixel buffers and hierarchical metadata
//! - Two level sorting by position and acquisition order
//! - Detection of the slice/time structure from chunk geometry
//! - Hoisting of metadata common to all chunks into the image
//! - Splicing of images back into slices or volumes for writers
//! - Type unification and conversion with automatic scaling
//!
//! # Example
//!
//! ```rust
//! use chunkimage::{Chunk, Image};
//!
//! # fn main() -> chunkimage::Result<()> {
//! let slices = (0..3).map(|z| {
//!     Chunk::new(vec![z as u8; 16], [4, 4, 1, 1])?
//!         .with_property("indexOrigin", [0.0, 0.0, z as f64])?
//!         .with_property("acquisitionNumber", z as u32)?
//!         .with_property("voxelSize", [1.0, 1.0, 1.0])?
//!         .with_property("rowVec", [1.0, 0.0, 0.0])?
//!         .with_property("columnVec", [0.0, 1.0, 0.0])
//! });
//! let image = Image::from_chunks(slices.collect::<chunkimage::Result<Vec<_>>>()?)?;
//! assert_eq!(image.size_as_vector(), [4, 4, 3, 1]);
//! assert_eq!(image.voxel::<u8>(0, 0, 2, 0)?, 2);
//! # Ok(())
//! # }
//! ```

pub mod chunk;
pub mod error;
pub mod geometry;
pub mod image;
pub mod layout;
pub mod metadata;
pub mod options;
pub mod sorted_chunk_list;
pub mod types;
pub mod utils;
pub mod value;
pub mod value_array;

// Re-exports
pub use chunk::{Chunk, CHUNK_NEEDED};
pub use error::{ImageError, Result};
pub use image::{Image, Orientation, IMAGE_NEEDED};
pub use layout::NDimensional;
pub use metadata::{PropPath, PropertyMap, PropertyValue};
pub use options::ImageOptions;
pub use sorted_chunk_list::SortedChunkList;
pub use types::{Color, DataType, Dimension, Scaling, ScalingOption};
pub use value::{FromValue, Value};
pub use value_array::{Pixel, ValueArray};

/// Version of the chunkimage library
pub const CHUNKIMAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!CHUNKIMAGE_VERSION.is_empty());
    }
}
