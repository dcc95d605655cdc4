// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reading task sources and turning them into stageable image data.

use super::ktx;
use super::UploadError;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use strata_core::math::{Extent3D, Origin3D};
use strata_core::renderer::api::{
    BufferImageCopy, Format, ImageAspect, ImageDimension, ImageSubresourceLayers,
};
use strata_data::graph::{ImageEncoding, UploadSource};

/// Reads the bytes of a source. Memory sources are borrowed, file ranges are
/// read into a fresh host allocation.
pub fn read_source(source: &UploadSource) -> Result<Cow<'_, [u8]>, UploadError> {
    match source {
        UploadSource::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
        UploadSource::File {
            path,
            offset,
            length,
        } => {
            let io_error = |source| UploadError::Source {
                path: path.clone(),
                source,
            };
            let mut file = File::open(path).map_err(io_error)?;
            file.seek(SeekFrom::Start(*offset)).map_err(io_error)?;
            let mut bytes = Vec::new();
            match length {
                Some(length) => {
                    // Checked before allocating: the declared length is untrusted.
                    let available = file
                        .metadata()
                        .map_err(io_error)?
                        .len()
                        .saturating_sub(*offset);
                    if *length > available {
                        return Err(io_error(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("{length} bytes requested, {available} available at offset {offset}"),
                        )));
                    }
                    let capacity = usize::try_from(*length)
                        .map_err(|e| io_error(io::Error::new(io::ErrorKind::OutOfMemory, e)))?;
                    bytes
                        .try_reserve_exact(capacity)
                        .map_err(|e| io_error(io::Error::new(io::ErrorKind::OutOfMemory, e)))?;
                    let read = file.take(*length).read_to_end(&mut bytes).map_err(io_error)?;
                    if read as u64 != *length {
                        return Err(io_error(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("{length} bytes requested, {read} read"),
                        )));
                    }
                }
                None => {
                    file.read_to_end(&mut bytes).map_err(io_error)?;
                }
            }
            log::trace!("Read {} bytes from {}", bytes.len(), source.describe());
            Ok(Cow::Owned(bytes))
        }
    }
}

/// Image data laid out for staging, with its discovered shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Texel format.
    pub format: Format,
    /// Dimensionality.
    pub dimension: ImageDimension,
    /// Extent of level 0.
    pub extent: Extent3D,
    /// Mip levels present in the data.
    pub mip_levels: u32,
    /// Array layers present in the data.
    pub array_layers: u32,
    /// Packed texels.
    pub data: Vec<u8>,
    /// Copy regions, offsets relative to the start of `data`.
    pub regions: Vec<BufferImageCopy>,
}

impl ImagePayload {
    fn single(format: Format, extent: Extent3D, data: Vec<u8>) -> Self {
        Self {
            format,
            dimension: if extent.depth > 1 {
                ImageDimension::D3
            } else {
                ImageDimension::D2
            },
            extent,
            mip_levels: 1,
            array_layers: 1,
            data,
            regions: vec![BufferImageCopy {
                buffer_offset: 0,
                subresource: ImageSubresourceLayers {
                    aspect: ImageAspect::Color,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                image_offset: Origin3D::default(),
                image_extent: extent,
            }],
        }
    }
}

/// Decodes source bytes into an [`ImagePayload`].
///
/// Without an explicit encoding, KTX containers are recognized by their
/// identifier and everything else is decoded as a picture.
pub fn decode_image(
    bytes: &[u8],
    encoding: Option<ImageEncoding>,
) -> Result<ImagePayload, UploadError> {
    let encoding = encoding.unwrap_or(if ktx::is_ktx(bytes) {
        ImageEncoding::Ktx
    } else {
        ImageEncoding::Encoded
    });
    match encoding {
        ImageEncoding::Raw { format, extent } => {
            let expected = format.data_size(extent.width, extent.height, extent.depth);
            if (bytes.len() as u64) < expected {
                return Err(UploadError::ContractViolation(format!(
                    "raw {format:?} image of {}x{}x{} needs {expected} bytes, source has {}",
                    extent.width,
                    extent.height,
                    extent.depth,
                    bytes.len()
                )));
            }
            Ok(ImagePayload::single(
                format,
                extent,
                bytes[..expected as usize].to_vec(),
            ))
        }
        ImageEncoding::Ktx => {
            let image = ktx::parse(bytes).map_err(UploadError::Decode)?;
            Ok(ImagePayload {
                format: image.format,
                dimension: image.dimension,
                extent: image.extent,
                mip_levels: image.mip_levels,
                array_layers: image.array_layers,
                data: image.data,
                regions: image.regions,
            })
        }
        ImageEncoding::Encoded => {
            let img = image::load_from_memory(bytes)
                .map_err(|e| UploadError::Decode(e.to_string()))?;
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            Ok(ImagePayload::single(
                Format::Rgba8Srgb,
                Extent3D::new(width, height, 1),
                rgba.into_raw(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_ranges_are_read_exactly() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"0123456789").expect("write");
        let source = UploadSource::File {
            path: file.path().to_path_buf(),
            offset: 2,
            length: Some(4),
        };
        assert_eq!(read_source(&source).expect("read").as_ref(), b"2345");

        let tail = UploadSource::File {
            path: file.path().to_path_buf(),
            offset: 7,
            length: None,
        };
        assert_eq!(read_source(&tail).expect("read").as_ref(), b"789");
    }

    #[test]
    fn lengths_past_the_end_of_the_file_fail_before_allocating() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[7; 8]).expect("write");
        for (offset, length) in [(0, 1u64 << 60), (4, 5)] {
            let source = UploadSource::File {
                path: file.path().to_path_buf(),
                offset,
                length: Some(length),
            };
            match read_source(&source) {
                Err(UploadError::Source { source, .. }) => {
                    assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof)
                }
                other => panic!("expected a source error, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_files_name_the_path() {
        let source = UploadSource::File {
            path: "/definitely/not/here.bin".into(),
            offset: 0,
            length: None,
        };
        let err = read_source(&source).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.bin"));
    }

    #[test]
    fn pictures_decode_to_rgba8() {
        let picture = image::RgbaImage::from_pixel(3, 2, image::Rgba([9, 8, 7, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        picture
            .write_to(&mut png, image::ImageFormat::Png)
            .expect("encode png");

        let payload = decode_image(png.get_ref(), None).expect("decode");
        assert_eq!(payload.format, Format::Rgba8Srgb);
        assert_eq!(payload.extent, Extent3D::new(3, 2, 1));
        assert_eq!(payload.data.len(), 24);
        assert_eq!(payload.regions.len(), 1);
    }

    #[test]
    fn short_raw_sources_violate_the_contract() {
        let err = decode_image(
            &[0; 15],
            Some(ImageEncoding::Raw {
                format: Format::Rgba8Unorm,
                extent: Extent3D::new(2, 2, 1),
            }),
        )
        .unwrap_err();
        assert!(err.is_contract_violation());
    }
}
