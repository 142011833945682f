//! Value-of-interest (VOI) transforms applied after the modality rescale.
//!
//! A header can declare the VOI step either as an explicit lookup table
//! (VOI LUT Sequence) or as one or more window center/width pairs. The lookup
//! table wins when both are present, and only the first definition of either
//! kind is used.

use dicom::core::Tag;
use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;
use log::warn;
use ndarray::Array2;

/// VOILUTFunction attribute
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum VoiLutFunction {
    #[default]
    Linear,
    LinearExact,
    Sigmoid,
}

impl VoiLutFunction {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_uppercase().as_str() {
            "LINEAR" => Some(VoiLutFunction::Linear),
            "LINEAR_EXACT" => Some(VoiLutFunction::LinearExact),
            "SIGMOID" => Some(VoiLutFunction::Sigmoid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub center: f64,
    pub width: f64,
    pub function: VoiLutFunction,
    /// Output range, lowest and highest value
    pub output: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    /// Input value mapped to the first entry
    pub first_mapped: f64,
    pub entries: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoiTransform {
    Window(Window),
    Table(LookupTable),
}

impl VoiTransform {
    /// The first VOI definition declared by a header, if any
    pub fn from_header(header: &InMemDicomObject) -> Option<Self> {
        if let Some(table) = first_lookup_table(header) {
            return Some(VoiTransform::Table(table));
        }
        first_window(header).map(VoiTransform::Window)
    }

    pub fn apply(&self, pixels: &mut Array2<f32>) {
        match self {
            VoiTransform::Window(window) => {
                pixels.par_mapv_inplace(|v| window.map(f64::from(v)) as f32)
            }
            VoiTransform::Table(table) => {
                pixels.par_mapv_inplace(|v| table.map(f64::from(v)) as f32)
            }
        }
    }
}

impl Window {
    pub fn map(&self, value: f64) -> f64 {
        let (y_min, y_max) = self.output;
        let y_range = y_max - y_min;

        match self.function {
            VoiLutFunction::Linear => {
                let center = self.center - 0.5;
                let width = self.width - 1.0;
                if value <= center - width / 2.0 {
                    y_min
                } else if value > center + width / 2.0 {
                    y_max
                } else {
                    ((value - center) / width + 0.5) * y_range + y_min
                }
            }
            VoiLutFunction::LinearExact => {
                if value <= self.center - self.width / 2.0 {
                    y_min
                } else if value > self.center + self.width / 2.0 {
                    y_max
                } else {
                    ((value - self.center) / self.width + 0.5) * y_range + y_min
                }
            }
            VoiLutFunction::Sigmoid => {
                y_range / (1.0 + (-4.0 * (value - self.center) / self.width).exp()) + y_min
            }
        }
    }

    fn is_valid(&self) -> bool {
        match self.function {
            VoiLutFunction::Linear => self.width >= 1.0,
            VoiLutFunction::LinearExact | VoiLutFunction::Sigmoid => self.width > 0.0,
        }
    }
}

impl LookupTable {
    pub fn map(&self, value: f64) -> f64 {
        let last = self.entries.len().saturating_sub(1);
        let offset = (value - self.first_mapped).clamp(0.0, last as f64);
        self.entries[offset as usize]
    }
}

fn first_lookup_table(header: &InMemDicomObject) -> Option<LookupTable> {
    let items = header.element(tags::VOILUT_SEQUENCE).ok()?.items()?;
    let item = items.first()?;

    let descriptor = item
        .element(tags::LUT_DESCRIPTOR)
        .ok()?
        .to_multi_int::<i64>()
        .ok()?;
    let mut entries = item
        .element(tags::LUT_DATA)
        .ok()?
        .to_multi_float64()
        .ok()?;

    let (&declared, &first_mapped) = (descriptor.first()?, descriptor.get(1)?);
    // 0 stands for 2^16 entries
    let declared = if declared == 0 { 1 << 16 } else { declared as usize };
    // signed pixel data keeps the first mapped value in two's complement
    let first_mapped = if is_signed(header) {
        i64::from(first_mapped as u16 as i16)
    } else {
        first_mapped
    };
    entries.truncate(declared);
    if entries.is_empty() {
        warn!("Ignoring VOI LUT Sequence without LUT data");
        return None;
    }

    Some(LookupTable {
        first_mapped: first_mapped as f64,
        entries,
    })
}

fn first_window(header: &InMemDicomObject) -> Option<Window> {
    let center = first_float(header, tags::WINDOW_CENTER)?;
    let width = first_float(header, tags::WINDOW_WIDTH)?;
    let function = header
        .element(tags::VOILUT_FUNCTION)
        .ok()
        .and_then(|e| e.to_str().ok().and_then(|s| VoiLutFunction::from_keyword(&s)))
        .unwrap_or_default();

    let window = Window {
        center,
        width,
        function,
        output: output_range(header),
    };
    if !window.is_valid() {
        warn!("Ignoring window with invalid width {width} for {function:?}");
        return None;
    }
    Some(window)
}

/// Range of the windowed values: the stored value range, through the rescale
/// when one is declared.
fn output_range(header: &InMemDicomObject) -> (f64, f64) {
    let bits_stored = header
        .element(tags::BITS_STORED)
        .ok()
        .and_then(|e| e.to_int::<u32>().ok())
        .unwrap_or(16)
        .clamp(1, 32);
    let (y_min, y_max) = if is_signed(header) {
        let half = 2f64.powi(bits_stored as i32 - 1);
        (-half, half - 1.0)
    } else {
        (0.0, 2f64.powi(bits_stored as i32) - 1.0)
    };

    match first_float(header, tags::RESCALE_SLOPE) {
        Some(slope) => {
            let intercept = first_float(header, tags::RESCALE_INTERCEPT).unwrap_or(0.0);
            (y_min * slope + intercept, y_max * slope + intercept)
        }
        None => (y_min, y_max),
    }
}

fn is_signed(header: &InMemDicomObject) -> bool {
    header
        .element(tags::PIXEL_REPRESENTATION)
        .ok()
        .and_then(|e| e.to_int::<u16>().ok())
        == Some(1)
}

fn first_float(header: &InMemDicomObject, tag: Tag) -> Option<f64> {
    header
        .element(tag)
        .ok()?
        .to_multi_float64()
        .ok()?
        .first()
        .copied()
}
