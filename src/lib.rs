//! # DICOM-stack library
//!
//! This crate turns a directory of DICOM slices into a stack of display-ready
//! images.
//!
//! Every file whose name ends in `.dcm` is decoded with the dicom-rs
//! ecosystem, passed through its rescale (modality LUT) and windowing
//! (VOI LUT), and min-max normalized into `[0, 1]`. The normalized slices are
//! stacked along the first axis of a [`Volume`], in file name order, next to a
//! table holding a few header attributes of every slice. Slices are decoded in
//! parallel using rayon, or on tokio's blocking pool with a timeout per slice.
//!
//! DICOM files are assumed to have the following attributes:
//!  - One image per slice (only the first frame is used)
//!  - Grayscale pixels (only the first sample of color images is used)
//!  - File names that sort in slice order; no header attribute is used for
//!    ordering
//!
//! Pixel data that cannot be read with the transfer syntax declared in the
//! file is read once more as Implicit VR Little Endian.
//!
//! # Examples
//!
//! ## Reading a directory into a volume
//!
//! Load all slices from the dicom/ directory and save the middle one as an
//! 8-bit image, with its title.
//!
//! ```no_run
//! # use dicom_stack::{LoaderConfig, TitleStyle, VolumeLoader};
//! let loader = VolumeLoader::new(LoaderConfig::new().with_concurrency(4))
//!     .expect("should have started the decoding threads");
//! let (volume, metadata) = loader
//!     .build_volume("dicom")
//!     .expect("should have loaded files from directory");
//! let index = volume.len() / 2;
//! println!("{}", metadata[index].title(index + 1, TitleStyle::SingleLine));
//! let image = volume
//!     .slice_image(index)
//!     .expect("should have returned image at center of volume");
//! image.save("result.png").expect("should have saved the image");
//! ```
//!
//! ## Reading one slice
//!
//! ```no_run
//! # use dicom_stack::VolumeLoader;
//! // 1-based position in file name order
//! let (pixels, metadata) = VolumeLoader::default()
//!     .build_slice("dicom", 3)
//!     .expect("should have loaded the third slice");
//! println!("{:?} {}", pixels.dim(), metadata);
//! ```

pub mod config;
pub mod decoder;
pub mod enumerator;
pub mod enums;
pub mod lut;
pub mod metadata;
pub mod scaler;
pub mod volume;
pub mod volume_loader;

pub use config::LoaderConfig;
pub use decoder::{DecodeError, DecodedSlice, SliceDecoder};
pub use enumerator::{EnumerationError, list_slices};
pub use enums::{DegeneratePolicy, TitleStyle};
pub use metadata::{MISSING_METADATA, MetadataField, SliceMetadata};
pub use scaler::{DegenerateImageError, normalize};
pub use volume::Volume;
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
