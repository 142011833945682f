use crate::lut::VoiTransform;

use dicom::core::Tag;
use dicom::object::{
    DefaultDicomObject, FileMetaTableBuilder, IMPLEMENTATION_CLASS_UID, InMemDicomObject,
    ReadError, open_file,
};
use dicom::pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption};
use dicom::transfer_syntax::entries::IMPLICIT_VR_LITTLE_ENDIAN;
use dicom_dictionary_std::{tags, uids};
use log::{debug, warn};
use ndarray::{Array2, Array4, s};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Preamble plus the `DICM` magic code
const PREAMBLE_LENGTH: usize = 132;

/// (0002,0000) UL with a 4 byte value, explicit VR little endian
const GROUP_LENGTH_HEADER: [u8; 8] = [0x02, 0x00, 0x00, 0x00, b'U', b'L', 0x04, 0x00];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Could not read DICOM file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    #[error("Could not decode pixel data of {}: {source}", .path.display())]
    PixelData {
        path: PathBuf,
        #[source]
        source: dicom::pixeldata::Error,
    },

    #[error("No pixels in {}", .path.display())]
    EmptyPixelData { path: PathBuf },
}

/// Displayable pixels of one DICOM file together with its parsed header
pub struct DecodedSlice {
    /// Rows x columns, after the modality and VOI transforms
    pub pixels: Array2<f32>,
    pub header: DefaultDicomObject,
}

pub struct SliceDecoder;

impl SliceDecoder {
    /// Decode the first frame of a DICOM file
    ///
    /// Pixel data is read with the transfer syntax declared in the file meta
    /// group. If that fails, the data is read one more time as Implicit VR
    /// Little Endian. A file whose meta group declares no usable transfer
    /// syntax cannot be opened normally; its data set is then read as
    /// Implicit VR Little Endian right away, and that read is the one retry.
    /// The stored values then go through the rescale (modality LUT) and the
    /// first VOI definition of the header, if any.
    ///
    /// Only the first sample of multi-sample (color) images is kept.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the file cannot be parsed, if it declares no
    /// pixels, or if the pixel data cannot be decoded with either transfer
    /// syntax.
    pub fn decode(path: impl AsRef<Path>) -> Result<DecodedSlice, DecodeError> {
        let path = path.as_ref();
        let (mut header, retried) = match open_file(path) {
            Ok(header) => (header, false),
            Err(source) => match read_as_implicit_little_endian(path) {
                Ok(header) => {
                    warn!(
                        "{} has no usable transfer syntax ({source}), read as implicit VR LE",
                        path.display(),
                    );
                    (header, true)
                }
                Err(err) => {
                    debug!("{} not readable past its file meta group: {err}", path.display());
                    return Err(DecodeError::Open {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            },
        };

        if declares_no_pixels(&header) {
            return Err(DecodeError::EmptyPixelData {
                path: path.to_path_buf(),
            });
        }

        let frames = match Self::rescaled_frames(&header) {
            Ok(frames) => frames,
            Err(err) if !retried => {
                warn!(
                    "Pixel data of {} not readable as {} ({err}), retrying as implicit VR LE",
                    path.display(),
                    header.meta().transfer_syntax(),
                );
                header.meta_mut().transfer_syntax = uids::IMPLICIT_VR_LITTLE_ENDIAN.to_owned();
                Self::rescaled_frames(&header).map_err(|source| DecodeError::PixelData {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(source) => {
                return Err(DecodeError::PixelData {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if frames.is_empty() {
            return Err(DecodeError::EmptyPixelData {
                path: path.to_path_buf(),
            });
        }
        let mut pixels = frames.slice_move(s![0, .., .., 0]);

        if let Some(voi) = VoiTransform::from_header(&header) {
            voi.apply(&mut pixels);
        }

        debug!("Decoded {} as {:?} pixels", path.display(), pixels.dim());
        Ok(DecodedSlice { pixels, header })
    }

    /// All frames as (frames, rows, columns, samples), rescaled
    fn rescaled_frames(
        header: &DefaultDicomObject,
    ) -> Result<Array4<f32>, dicom::pixeldata::Error> {
        let pixel_data = header.decode_pixel_data()?;
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::Default)
            .with_voi_lut(VoiLutOption::Identity);
        pixel_data.to_ndarray_with_options::<f32>(&options)
    }
}

/// Rows, Columns or NumberOfFrames explicitly set to zero
fn declares_no_pixels(header: &InMemDicomObject) -> bool {
    [tags::ROWS, tags::COLUMNS, tags::NUMBER_OF_FRAMES]
        .into_iter()
        .any(|tag| read_u32(header, tag) == Some(0))
}

fn read_u32(header: &InMemDicomObject, tag: Tag) -> Option<u32> {
    header.element(tag).ok()?.to_int::<u32>().ok()
}

/// Read a file past its meta group, whatever the group declares, and decode
/// the data set as Implicit VR Little Endian.
fn read_as_implicit_little_endian(
    path: &Path,
) -> Result<DefaultDicomObject, Box<dyn std::error::Error + Send + Sync>> {
    let mut file = BufReader::new(File::open(path)?);

    let mut preamble = [0; PREAMBLE_LENGTH];
    file.read_exact(&mut preamble)?;
    if &preamble[128..] != b"DICM" {
        return Err("missing DICM magic code".into());
    }

    let mut group_length = [0; 12];
    file.read_exact(&mut group_length)?;
    if group_length[..8] != GROUP_LENGTH_HEADER {
        return Err("file meta group does not start with its group length".into());
    }
    let length = u32::from_le_bytes([
        group_length[8],
        group_length[9],
        group_length[10],
        group_length[11],
    ]);
    io::copy(&mut (&mut file).take(u64::from(length)), &mut io::sink())?;

    let dataset =
        InMemDicomObject::read_dataset_with_ts(file, &IMPLICIT_VR_LITTLE_ENDIAN.erased())?;
    let sop_class_uid = uid_or_empty(&dataset, tags::SOP_CLASS_UID);
    let sop_instance_uid = uid_or_empty(&dataset, tags::SOP_INSTANCE_UID);

    Ok(dataset.with_meta(
        FileMetaTableBuilder::new()
            .transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(sop_class_uid)
            .media_storage_sop_instance_uid(sop_instance_uid)
            .implementation_class_uid(IMPLEMENTATION_CLASS_UID),
    )?)
}

fn uid_or_empty(dataset: &InMemDicomObject, tag: Tag) -> String {
    dataset
        .element(tag)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|uid| uid.trim_end_matches(['\0', ' ']).to_owned())
        .unwrap_or_default()
}
