use image::{GrayImage, ImageBuffer};
use ndarray::{Array2, Array3, ArrayView2, s};
use rayon::prelude::*;

/// Normalized slices stacked along the first axis, in enumeration order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Volume {
    data: Array3<f32>,
}

impl Volume {
    /// Stack equally shaped slices into one volume
    ///
    /// Callers check the shapes first; the rows and columns of the first slice
    /// set the shape of the volume.
    pub(crate) fn from_slices(slices: &[Array2<f32>]) -> Self {
        let Some(first) = slices.first() else {
            return Self::default();
        };
        let (height, width) = first.dim();
        let mut data = Array3::<f32>::zeros((slices.len(), height, width));

        for (i, slice) in slices.iter().enumerate() {
            data.slice_mut(s![i, .., ..]).assign(slice);
        }

        Self { data }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of slices
    pub fn len(&self) -> usize {
        self.data.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Slice at 0-based `index`, `None` when out of range
    pub fn slice(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.len()).then(|| self.data.slice(s![index, .., ..]))
    }

    #[inline]
    fn to_u8(value: f32) -> u8 {
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Render the slice at 0-based `index` as an 8-bit grayscale image
    pub fn slice_image(&self, index: usize) -> Option<GrayImage> {
        let slice = self.slice(index)?;
        let (height, width) = slice.dim();
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .map(|&v| Self::to_u8(v))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }
}
