use crate::{
    config::LoaderConfig,
    decoder::{DecodeError, DecodedSlice, SliceDecoder},
    enumerator::{EnumerationError, list_slices},
    enums::DegeneratePolicy,
    metadata::SliceMetadata,
    scaler::{DegenerateImageError, normalize},
    volume::Volume,
};

use futures::{StreamExt, stream};
use log::info;
use ndarray::Array2;
use rayon::prelude::*;
use std::{
    path::{Path, PathBuf},
    pin::pin,
    time::Duration,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    #[error("Slice {index} could not be decoded: {source}")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },

    #[error("Slice {index} ({}) cannot be normalized: {source}", .path.display())]
    DegenerateImage {
        index: usize,
        path: PathBuf,
        #[source]
        source: DegenerateImageError,
    },

    #[error("Slice {index} ({}) has shape {found:?}, expected {expected:?}", .path.display())]
    ShapeMismatch {
        index: usize,
        path: PathBuf,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Slice position {position} is out of range, {count} slices available")]
    SliceOutOfRange { position: usize, count: usize },

    #[error("Decoding slice {index} ({}) took longer than {timeout:?}", .path.display())]
    Timeout {
        index: usize,
        path: PathBuf,
        timeout: Duration,
    },

    #[error("Decoding task of slice {index} failed: {source}")]
    Join {
        index: usize,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("Could not start decoding threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// One decoded, normalized slice and the metadata read from its header
struct LoadedSlice {
    pixels: Array2<f32>,
    metadata: SliceMetadata,
}

/// Stacks slices in index order, checking every shape against the first one.
#[derive(Default)]
struct StackBuilder {
    images: Vec<Array2<f32>>,
    metadata: Vec<SliceMetadata>,
}

impl StackBuilder {
    fn push(
        &mut self,
        path: &Path,
        result: Result<LoadedSlice, VolumeLoaderError>,
    ) -> Result<(), VolumeLoaderError> {
        let slice = result?;
        if let Some(first) = self.images.first() {
            let (expected, found) = (first.dim(), slice.pixels.dim());
            if found != expected {
                return Err(VolumeLoaderError::ShapeMismatch {
                    index: self.images.len(),
                    path: path.to_path_buf(),
                    expected,
                    found,
                });
            }
        }
        self.images.push(slice.pixels);
        self.metadata.push(slice.metadata);
        Ok(())
    }

    fn finish(self) -> (Volume, Vec<SliceMetadata>) {
        let volume = Volume::from_slices(&self.images);
        info!("Built volume of shape {:?}", volume.dim());
        (volume, self.metadata)
    }
}

pub struct VolumeLoader {
    config: LoaderConfig,
    /// Decoding threads of `build_volume`, rayon's global pool when `None`
    pool: Option<rayon::ThreadPool>,
}

impl Default for VolumeLoader {
    fn default() -> Self {
        Self {
            config: LoaderConfig::default(),
            pool: None,
        }
    }
}

impl VolumeLoader {
    /// Create a loader, starting its own decoding threads when the
    /// configuration sets a concurrency limit.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeLoaderError::ThreadPool`] if the threads cannot be
    /// started.
    pub fn new(config: LoaderConfig) -> Result<Self, VolumeLoaderError> {
        let pool = match config.concurrency {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?,
            ),
            None => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load every `.dcm` file of a directory into a volume
    ///
    /// The directory is enumerated on every call. Slices are decoded in
    /// parallel; the volume and the metadata table are both in file name
    /// order, index for index.
    ///
    /// # Errors
    ///
    /// Fails as a whole if the directory cannot be listed or any slice fails.
    /// When several slices fail, the error of the lowest index is returned.
    pub fn build_volume(
        &self,
        directory: impl AsRef<Path>,
    ) -> Result<(Volume, Vec<SliceMetadata>), VolumeLoaderError> {
        let paths = list_slices(directory)?;
        self.load_from_file_paths(&paths)
    }

    /// Load a volume from file paths, kept in the given order
    pub fn load_from_file_paths(
        &self,
        paths: &[impl AsRef<Path> + Sync],
    ) -> Result<(Volume, Vec<SliceMetadata>), VolumeLoaderError> {
        let policy = self.config.degenerate_policy;
        let results: Vec<_> = self.install(|| {
            paths
                .par_iter()
                .enumerate()
                .map(|(index, path)| Self::load_slice(index, path.as_ref(), policy))
                .collect()
        });

        let mut stack = StackBuilder::default();
        for (path, result) in paths.iter().zip(results) {
            stack.push(path.as_ref(), result)?;
        }
        Ok(stack.finish())
    }

    /// Async variant of [`build_volume`](Self::build_volume)
    ///
    /// Each slice is decoded on tokio's blocking pool and must finish within
    /// the configured decode timeout. At most the configured number of slices
    /// are decoded at once. A timed out decode is not interrupted, its result
    /// is dropped. Its blocking thread stays busy, so a runtime dropped after
    /// a [`VolumeLoaderError::Timeout`] waits for it; shut the runtime down
    /// with `Runtime::shutdown_background` instead.
    pub async fn build_volume_async(
        &self,
        directory: impl AsRef<Path>,
    ) -> Result<(Volume, Vec<SliceMetadata>), VolumeLoaderError> {
        let paths = list_slices(directory)?;
        let policy = self.config.degenerate_policy;
        let timeout = self.config.decode_timeout;

        let mut results = pin!(
            stream::iter(paths.iter().cloned().enumerate())
                .map(|(index, path)| Self::load_slice_with_timeout(index, path, policy, timeout))
                .buffered(self.config.concurrency_limit())
        );

        let mut stack = StackBuilder::default();
        for path in &paths {
            if let Some(result) = results.next().await {
                stack.push(path, result)?;
            }
        }
        Ok(stack.finish())
    }

    /// Load the slice at 1-based `position` of a directory, without decoding
    /// any other slice
    pub fn build_slice(
        &self,
        directory: impl AsRef<Path>,
        position: usize,
    ) -> Result<(Array2<f32>, SliceMetadata), VolumeLoaderError> {
        let paths = list_slices(directory)?;
        let index = position
            .checked_sub(1)
            .filter(|&index| index < paths.len())
            .ok_or(VolumeLoaderError::SliceOutOfRange {
                position,
                count: paths.len(),
            })?;

        let slice = Self::load_slice(index, &paths[index], self.config.degenerate_policy)?;
        Ok((slice.pixels, slice.metadata))
    }

    fn load_slice(
        index: usize,
        path: &Path,
        policy: DegeneratePolicy,
    ) -> Result<LoadedSlice, VolumeLoaderError> {
        let DecodedSlice { pixels, header } = SliceDecoder::decode(path)
            .map_err(|source| VolumeLoaderError::Decode { index, source })?;
        let metadata = SliceMetadata::extract(&header);
        let pixels =
            normalize(&pixels, policy).map_err(|source| VolumeLoaderError::DegenerateImage {
                index,
                path: path.to_path_buf(),
                source,
            })?;

        Ok(LoadedSlice { pixels, metadata })
    }

    async fn load_slice_with_timeout(
        index: usize,
        path: PathBuf,
        policy: DegeneratePolicy,
        timeout: Duration,
    ) -> Result<LoadedSlice, VolumeLoaderError> {
        let task = tokio::task::spawn_blocking({
            let path = path.clone();
            move || Self::load_slice(index, &path, policy)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(source)) => Err(VolumeLoaderError::Join { index, source }),
            Err(_) => Err(VolumeLoaderError::Timeout {
                index,
                path,
                timeout,
            }),
        }
    }

    /// Run `op` on the loader's own pool, or on rayon's global pool
    fn install<T, F>(&self, op: F) -> T
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
