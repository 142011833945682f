#![allow(dead_code)]

use dicom::core::value::DataSetSequence;
use dicom::core::{DataElement, PrimitiveValue, VR, dicom_value};
use dicom::object::{
    FileMetaTableBuilder, IMPLEMENTATION_CLASS_UID, InMemDicomObject, mem::InMemElement,
};
use dicom::transfer_syntax::entries::IMPLICIT_VR_LITTLE_ENDIAN;
use dicom_dictionary_std::{tags, uids};
use std::path::{Path, PathBuf};

/// Transfer syntax known to the registry without any pixel decoder behind it
pub const UNDECODABLE_TS: &str = "1.2.840.10008.1.2.4.100";

/// Builds a single-frame, 16-bit grayscale DICOM file.
pub struct SliceFixture {
    object: InMemDicomObject,
    transfer_syntax: String,
    sop_instance_uid: String,
}

impl SliceFixture {
    pub fn new(rows: u16, columns: u16, pixels: Vec<u16>) -> Self {
        assert_eq!(pixels.len(), rows as usize * columns as usize);
        let sop_instance_uid = "2.25.1234".to_owned();

        let object = InMemDicomObject::from_element_iter([
            DataElement::new(
                tags::SOP_CLASS_UID,
                VR::UI,
                PrimitiveValue::from(uids::CT_IMAGE_STORAGE),
            ),
            DataElement::new(
                tags::SOP_INSTANCE_UID,
                VR::UI,
                PrimitiveValue::from(sop_instance_uid.as_str()),
            ),
            DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)),
            DataElement::new(
                tags::PHOTOMETRIC_INTERPRETATION,
                VR::CS,
                PrimitiveValue::from("MONOCHROME2"),
            ),
            DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(rows)),
            DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(columns)),
            DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)),
            DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(12_u16)),
            DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(11_u16)),
            DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16)),
            DataElement::new(tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(pixels.into())),
        ]);

        Self {
            object,
            transfer_syntax: uids::EXPLICIT_VR_LITTLE_ENDIAN.to_owned(),
            sop_instance_uid,
        }
    }

    /// Pixels counting up from `offset`, wrapping at 4096
    pub fn ramp(rows: u16, columns: u16, offset: u16) -> Self {
        let pixels = (0..rows as usize * columns as usize)
            .map(|i| ((i + offset as usize) % 4096) as u16)
            .collect();
        Self::new(rows, columns, pixels)
    }

    pub fn constant(rows: u16, columns: u16, value: u16) -> Self {
        Self::new(rows, columns, vec![value; rows as usize * columns as usize])
    }

    /// `count` frames, frame `f` holding `1000 * f + i` at pixel `i`
    pub fn multi_frame(rows: u16, columns: u16, count: u16) -> Self {
        let size = rows as usize * columns as usize;
        let pixels: Vec<u16> = (0..count as usize)
            .flat_map(|frame| (0..size).map(move |i| (1000 * frame + i) as u16))
            .collect();

        Self::new(rows, columns, vec![0; size])
            .with(DataElement::new(tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(pixels.into())))
            .with(DataElement::new(
                tags::NUMBER_OF_FRAMES,
                VR::IS,
                PrimitiveValue::from(count.to_string()),
            ))
    }

    /// 8-bit RGB pixels, interleaved
    pub fn rgb(rows: u16, columns: u16, pixels: &[[u8; 3]]) -> Self {
        assert_eq!(pixels.len(), rows as usize * columns as usize);
        let samples: Vec<u8> = pixels.iter().flatten().copied().collect();

        Self::new(rows, columns, vec![0; pixels.len()])
            .with(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(3_u16)))
            .with(DataElement::new(
                tags::PHOTOMETRIC_INTERPRETATION,
                VR::CS,
                PrimitiveValue::from("RGB"),
            ))
            .with(DataElement::new(
                tags::PLANAR_CONFIGURATION,
                VR::US,
                PrimitiveValue::from(0_u16),
            ))
            .with(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(8_u16)))
            .with(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(8_u16)))
            .with(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(7_u16)))
            .with(DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::U8(samples.into())))
    }

    pub fn with(mut self, element: InMemElement) -> Self {
        self.object.put(element);
        self
    }

    pub fn without(mut self, tag: dicom::core::Tag) -> Self {
        self.object.remove_element(tag);
        self
    }

    pub fn instance_number(self, number: i32) -> Self {
        self.with(DataElement::new(
            tags::INSTANCE_NUMBER,
            VR::IS,
            PrimitiveValue::from(number.to_string()),
        ))
    }

    pub fn series(self, uid: &str, number: i32) -> Self {
        self.with(DataElement::new(tags::SERIES_INSTANCE_UID, VR::UI, PrimitiveValue::from(uid)))
            .with(DataElement::new(
                tags::SERIES_NUMBER,
                VR::IS,
                PrimitiveValue::from(number.to_string()),
            ))
    }

    pub fn position(self, z: &str) -> Self {
        self.with(DataElement::new(
            tags::IMAGE_POSITION_PATIENT,
            VR::DS,
            dicom_value!(Strs, ["-100", "-100", z]),
        ))
        .with(DataElement::new(tags::SLICE_LOCATION, VR::DS, PrimitiveValue::from(z)))
        .with(DataElement::new(
            tags::IMAGE_ORIENTATION_PATIENT,
            VR::DS,
            dicom_value!(Strs, ["1", "0", "0", "0", "1", "0"]),
        ))
    }

    pub fn rescale(self, slope: &str, intercept: &str) -> Self {
        self.with(DataElement::new(tags::RESCALE_SLOPE, VR::DS, PrimitiveValue::from(slope)))
            .with(DataElement::new(
                tags::RESCALE_INTERCEPT,
                VR::DS,
                PrimitiveValue::from(intercept),
            ))
    }

    pub fn window(self, center: &str, width: &str) -> Self {
        self.with(DataElement::new(tags::WINDOW_CENTER, VR::DS, PrimitiveValue::from(center)))
            .with(DataElement::new(tags::WINDOW_WIDTH, VR::DS, PrimitiveValue::from(width)))
    }

    /// VOI LUT Sequence with one 16-bit table starting at `first_mapped`
    pub fn voi_lut(self, first_mapped: u16, data: &[u16]) -> Self {
        let item = InMemDicomObject::from_element_iter([
            DataElement::new(
                tags::LUT_DESCRIPTOR,
                VR::US,
                dicom_value!(U16, [data.len() as u16, first_mapped, 16]),
            ),
            DataElement::new(tags::LUT_DATA, VR::US, PrimitiveValue::U16(data.into())),
        ]);
        self.with(DataElement::new(
            tags::VOILUT_SEQUENCE,
            VR::SQ,
            DataSetSequence::from(vec![item]),
        ))
    }

    pub fn transfer_syntax(mut self, uid: &str) -> Self {
        self.transfer_syntax = uid.to_owned();
        self
    }

    pub fn write(self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref().to_path_buf();
        let file = self
            .object
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(self.transfer_syntax)
                    .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid(self.sop_instance_uid)
                    .implementation_class_uid(IMPLEMENTATION_CLASS_UID),
            )
            .unwrap();
        file.write_to_file(&path).unwrap();
        path
    }

    /// Write the data set as Implicit VR Little Endian behind a hand-encoded
    /// file meta group whose Transfer Syntax UID is `transfer_syntax`, left
    /// out entirely when `None`.
    pub fn write_with_meta_transfer_syntax(
        self,
        path: impl AsRef<Path>,
        transfer_syntax: Option<&str>,
    ) -> PathBuf {
        let path = path.as_ref().to_path_buf();

        let mut group = Vec::new();
        group.extend_from_slice(&[0x02, 0x00, 0x01, 0x00]);
        group.extend_from_slice(b"OB\0\0");
        group.extend_from_slice(&2_u32.to_le_bytes());
        group.extend_from_slice(&[0x00, 0x01]);
        put_meta_uid(&mut group, 0x0002, uids::CT_IMAGE_STORAGE);
        put_meta_uid(&mut group, 0x0003, &self.sop_instance_uid);
        if let Some(uid) = transfer_syntax {
            put_meta_uid(&mut group, 0x0010, uid);
        }
        put_meta_uid(&mut group, 0x0012, IMPLEMENTATION_CLASS_UID);

        let mut bytes = vec![0; 128];
        bytes.extend_from_slice(b"DICM");
        bytes.extend_from_slice(&[0x02, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(b"UL");
        bytes.extend_from_slice(&4_u16.to_le_bytes());
        bytes.extend_from_slice(&(group.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&group);
        self.object
            .write_dataset_with_ts(&mut bytes, &IMPLICIT_VR_LITTLE_ENDIAN.erased())
            .unwrap();

        std::fs::write(&path, bytes).unwrap();
        path
    }
}

/// Explicit VR little endian UI element of group 0002, padded to even length
fn put_meta_uid(group: &mut Vec<u8>, element: u16, uid: &str) {
    let mut value = uid.as_bytes().to_vec();
    if value.len() % 2 == 1 {
        value.push(0);
    }
    group.extend_from_slice(&0x0002_u16.to_le_bytes());
    group.extend_from_slice(&element.to_le_bytes());
    group.extend_from_slice(b"UI");
    group.extend_from_slice(&(value.len() as u16).to_le_bytes());
    group.extend_from_slice(&value);
}
