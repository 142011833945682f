use crate::enums::TitleStyle;

use dicom::core::Tag;
use dicom::object::InMemDicomObject;
use dicom_dictionary_std::tags;
use std::fmt;

/// Text shown in place of an attribute the header does not carry.
pub const MISSING_METADATA: &str = "This DICOM has no target metadata.";

/// The header attributes reported for every slice, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    InstanceNumber,
    ImagePositionPatient,
    SliceLocation,
    SeriesInstanceUid,
    SeriesNumber,
    ImageOrientationPatient,
}

impl MetadataField {
    pub const ALL: [MetadataField; 6] = [
        MetadataField::InstanceNumber,
        MetadataField::ImagePositionPatient,
        MetadataField::SliceLocation,
        MetadataField::SeriesInstanceUid,
        MetadataField::SeriesNumber,
        MetadataField::ImageOrientationPatient,
    ];

    /// DICOM keyword of the attribute
    pub fn keyword(self) -> &'static str {
        match self {
            MetadataField::InstanceNumber => "InstanceNumber",
            MetadataField::ImagePositionPatient => "ImagePositionPatient",
            MetadataField::SliceLocation => "SliceLocation",
            MetadataField::SeriesInstanceUid => "SeriesInstanceUID",
            MetadataField::SeriesNumber => "SeriesNumber",
            MetadataField::ImageOrientationPatient => "ImageOrientationPatient",
        }
    }

    pub fn tag(self) -> Tag {
        match self {
            MetadataField::InstanceNumber => tags::INSTANCE_NUMBER,
            MetadataField::ImagePositionPatient => tags::IMAGE_POSITION_PATIENT,
            MetadataField::SliceLocation => tags::SLICE_LOCATION,
            MetadataField::SeriesInstanceUid => tags::SERIES_INSTANCE_UID,
            MetadataField::SeriesNumber => tags::SERIES_NUMBER,
            MetadataField::ImageOrientationPatient => tags::IMAGE_ORIENTATION_PATIENT,
        }
    }
}

/// Per-slice attributes, each one absent when the header lacks it or its
/// value cannot be read as the expected type.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SliceMetadata {
    pub instance_number: Option<i32>,
    pub image_position_patient: Option<Vec<f64>>,
    pub slice_location: Option<f64>,
    pub series_instance_uid: Option<String>,
    pub series_number: Option<i32>,
    pub image_orientation_patient: Option<Vec<f64>>,
}

impl SliceMetadata {
    /// Read the reported attributes off a header. Never fails: every attribute
    /// is looked up on its own.
    pub fn extract(header: &InMemDicomObject) -> Self {
        Self {
            instance_number: read_int(header, tags::INSTANCE_NUMBER),
            image_position_patient: read_floats(header, tags::IMAGE_POSITION_PATIENT),
            slice_location: read_float(header, tags::SLICE_LOCATION),
            series_instance_uid: read_text(header, tags::SERIES_INSTANCE_UID),
            series_number: read_int(header, tags::SERIES_NUMBER),
            image_orientation_patient: read_floats(header, tags::IMAGE_ORIENTATION_PATIENT),
        }
    }

    pub fn is_present(&self, field: MetadataField) -> bool {
        match field {
            MetadataField::InstanceNumber => self.instance_number.is_some(),
            MetadataField::ImagePositionPatient => self.image_position_patient.is_some(),
            MetadataField::SliceLocation => self.slice_location.is_some(),
            MetadataField::SeriesInstanceUid => self.series_instance_uid.is_some(),
            MetadataField::SeriesNumber => self.series_number.is_some(),
            MetadataField::ImageOrientationPatient => self.image_orientation_patient.is_some(),
        }
    }

    /// Value of a field as display text, [`MISSING_METADATA`] when absent.
    pub fn field_text(&self, field: MetadataField) -> String {
        let text = match field {
            MetadataField::InstanceNumber => self.instance_number.map(|n| n.to_string()),
            MetadataField::ImagePositionPatient => {
                self.image_position_patient.as_deref().map(format_list)
            }
            MetadataField::SliceLocation => self.slice_location.map(format_decimal),
            MetadataField::SeriesInstanceUid => self.series_instance_uid.clone(),
            MetadataField::SeriesNumber => self.series_number.map(|n| n.to_string()),
            MetadataField::ImageOrientationPatient => {
                self.image_orientation_patient.as_deref().map(format_list)
            }
        };
        text.unwrap_or_else(|| MISSING_METADATA.to_owned())
    }

    /// Display title for the slice at 1-based `slide_number`
    ///
    /// Fields come in the order `Slide Number, InstanceNumber,
    /// ImagePositionPatient, SliceLocation, SeriesInstanceUID, SeriesNumber,
    /// ImageOrientationPatient`.
    pub fn title(&self, slide_number: usize, style: TitleStyle) -> String {
        let separator = match style {
            TitleStyle::MultiLine => "\n",
            TitleStyle::SingleLine => ", ",
        };
        std::iter::once(format!("Slide Number: {slide_number}"))
            .chain(
                MetadataField::ALL
                    .iter()
                    .map(|&field| format!("{}: {}", field.keyword(), self.field_text(field))),
            )
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl fmt::Display for SliceMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in MetadataField::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.keyword(), self.field_text(*field))?;
        }
        Ok(())
    }
}

fn format_list(values: &[f64]) -> String {
    let items: Vec<_> = values.iter().copied().map(format_decimal).collect();
    format!("[{}]", items.join(", "))
}

/// Decimal strings keep a fractional part, `-125` shows as `-125.0`
fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn read_int(header: &InMemDicomObject, tag: Tag) -> Option<i32> {
    header.element(tag).ok()?.to_int::<i32>().ok()
}

fn read_float(header: &InMemDicomObject, tag: Tag) -> Option<f64> {
    header.element(tag).ok()?.to_float64().ok()
}

fn read_floats(header: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
    header.element(tag).ok()?.to_multi_float64().ok()
}

fn read_text(header: &InMemDicomObject, tag: Tag) -> Option<String> {
    header
        .element(tag)
        .ok()?
        .to_str()
        .ok()
        .map(|value| value.trim_end_matches(['\0', ' ']).to_owned())
}
