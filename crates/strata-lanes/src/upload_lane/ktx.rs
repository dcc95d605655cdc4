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

//! KTX (version 1) containers.
//!
//! Only little-endian files are accepted. Texel data is repacked without the
//! container's cube and mip padding, and one copy region is produced per
//! mip level, array element and face, in that nesting order.

use strata_core::math::{Extent3D, Origin3D};
use strata_core::renderer::api::{
    BufferImageCopy, Format, ImageAspect, ImageDimension, ImageSubresourceLayers,
};

/// The 12-byte file identifier.
pub const KTX1_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];

const HEADER_SIZE: usize = 12 + 13 * 4;
const LITTLE_ENDIAN: u32 = 0x0403_0201;

/// A decoded container, ready to be staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KtxImage {
    /// Texel format.
    pub format: Format,
    /// Dimensionality. Six faces make a cube.
    pub dimension: ImageDimension,
    /// Extent of level 0.
    pub extent: Extent3D,
    /// Mip levels.
    pub mip_levels: u32,
    /// Array layers as the device sees them: elements times faces.
    pub array_layers: u32,
    /// Tightly packed texels.
    pub data: Vec<u8>,
    /// One region per level, element and face, with offsets into `data`.
    pub regions: Vec<BufferImageCopy>,
}

/// Returns `true` if `bytes` starts with the KTX 1 identifier.
pub fn is_ktx(bytes: &[u8]) -> bool {
    bytes.starts_with(&KTX1_IDENTIFIER)
}

/// Maps an OpenGL internal format to a [`Format`].
pub fn format_from_gl(internal_format: u32) -> Option<Format> {
    Some(match internal_format {
        0x8229 => Format::R8Unorm,
        0x822B => Format::Rg8Unorm,
        0x8058 => Format::Rgba8Unorm,
        0x8C43 => Format::Rgba8Srgb,
        0x93A1 => Format::Bgra8Unorm,
        0x822D => Format::R16Float,
        0x881A => Format::Rgba16Float,
        0x822E => Format::R32Float,
        0x8230 => Format::Rg32Float,
        0x8814 => Format::Rgba32Float,
        0x83F1 => Format::Bc1RgbaUnorm,
        0x83F3 => Format::Bc3RgbaUnorm,
        0x8E8C => Format::Bc7RgbaUnorm,
        _ => return None,
    })
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn u32(&mut self) -> Result<u32, String> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], String> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                format!(
                    "truncated container: needed {len} bytes at offset {}, file has {}",
                    self.offset,
                    self.bytes.len()
                )
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn align4(&mut self) {
        self.offset = (self.offset + 3) & !3;
    }
}

/// Parses a KTX 1 container.
///
/// Errors are descriptions suitable for [`UploadError::Decode`](super::UploadError::Decode).
pub fn parse(bytes: &[u8]) -> Result<KtxImage, String> {
    if !is_ktx(bytes) {
        return Err("missing KTX 1 identifier".to_string());
    }
    if bytes.len() < HEADER_SIZE {
        return Err(format!("header is {} bytes, expected {HEADER_SIZE}", bytes.len()));
    }
    let mut reader = Reader { bytes, offset: 12 };
    let endianness = reader.u32()?;
    if endianness != LITTLE_ENDIAN {
        return Err(format!("unsupported endianness marker {endianness:#010x}"));
    }
    let _gl_type = reader.u32()?;
    let _gl_type_size = reader.u32()?;
    let _gl_format = reader.u32()?;
    let gl_internal_format = reader.u32()?;
    let _gl_base_internal_format = reader.u32()?;
    let width = reader.u32()?;
    let raw_height = reader.u32()?;
    let height = raw_height.max(1);
    let depth = reader.u32()?.max(1);
    let elements = reader.u32()?;
    let faces = reader.u32()?;
    let mip_levels = reader.u32()?.max(1);
    let key_value_bytes = reader.u32()?;

    let format = format_from_gl(gl_internal_format)
        .ok_or_else(|| format!("unsupported internal format {gl_internal_format:#06x}"))?;
    if width == 0 {
        return Err("zero width".to_string());
    }
    if faces != 1 && faces != 6 {
        return Err(format!("{faces} faces; expected 1 or 6"));
    }
    reader.take(key_value_bytes as usize)?;

    let layers = elements.max(1);
    let extent = Extent3D::new(width, height, depth);
    let non_array_cube = faces == 6 && elements == 0;
    let mut data = Vec::new();
    let mut regions = Vec::new();

    for level in 0..mip_levels {
        let image_size = reader.u32()? as u64;
        let level_extent = extent.mip_level(level);
        let face_size =
            format.data_size(level_extent.width, level_extent.height, level_extent.depth);
        let expected = if non_array_cube {
            face_size
        } else {
            face_size * (layers * faces) as u64
        };
        if image_size != expected {
            return Err(format!(
                "level {level} holds {image_size} bytes, expected {expected} (row padding is not supported)"
            ));
        }
        for element in 0..layers {
            for face in 0..faces {
                let texels = reader.take(face_size as usize)?;
                regions.push(BufferImageCopy {
                    buffer_offset: data.len() as u64,
                    subresource: ImageSubresourceLayers {
                        aspect: ImageAspect::Color,
                        mip_level: level,
                        base_array_layer: element * faces + face,
                        layer_count: 1,
                    },
                    image_offset: Origin3D::default(),
                    image_extent: level_extent,
                });
                data.extend_from_slice(texels);
                if non_array_cube {
                    reader.align4();
                }
            }
        }
        reader.align4();
    }

    let dimension = if faces == 6 {
        ImageDimension::Cube
    } else if depth > 1 {
        ImageDimension::D3
    } else if raw_height == 0 {
        ImageDimension::D1
    } else {
        ImageDimension::D2
    };

    Ok(KtxImage {
        format,
        dimension,
        extent,
        mip_levels,
        array_layers: layers * faces,
        data,
        regions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(
        internal_format: u32,
        extent: (u32, u32),
        elements: u32,
        faces: u32,
        levels: &[Vec<u8>],
    ) -> Vec<u8> {
        let mut out = KTX1_IDENTIFIER.to_vec();
        let header = [
            LITTLE_ENDIAN,
            0x1401,
            1,
            0x1908,
            internal_format,
            0x1908,
            extent.0,
            extent.1,
            0,
            elements,
            faces,
            levels.len() as u32,
            8,
        ];
        for value in header {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.extend_from_slice(&[0xEE; 8]);
        for level in levels {
            out.extend_from_slice(&(level.len() as u32).to_le_bytes());
            out.extend_from_slice(level);
            while out.len() % 4 != 0 {
                out.push(0);
            }
        }
        out
    }

    #[test]
    fn mip_chain_yields_one_region_per_level() {
        let bytes = container(
            0x8058,
            (4, 2),
            0,
            1,
            &[vec![1; 32], vec![2; 8], vec![3; 4]],
        );
        let image = parse(&bytes).expect("valid container");
        assert_eq!(image.format, Format::Rgba8Unorm);
        assert_eq!(image.dimension, ImageDimension::D2);
        assert_eq!(image.mip_levels, 3);
        assert_eq!(image.array_layers, 1);
        assert_eq!(image.data.len(), 44);

        let offsets: Vec<u64> = image.regions.iter().map(|r| r.buffer_offset).collect();
        assert_eq!(offsets, vec![0, 32, 40]);
        assert_eq!(image.regions[1].image_extent, Extent3D::new(2, 1, 1));
        assert_eq!(image.regions[2].subresource.mip_level, 2);
        assert_eq!(image.data[40..], [3, 3, 3, 3]);
    }

    #[test]
    fn array_layers_and_faces_are_addressed_separately() {
        // Two elements of a cube array: 12 faces of one R8 texel, imageSize covers all.
        let level: Vec<u8> = (0..12).collect();
        let bytes = container(0x8229, (1, 1), 2, 6, &[level]);
        let image = parse(&bytes).expect("valid container");
        assert_eq!(image.dimension, ImageDimension::Cube);
        assert_eq!(image.array_layers, 12);
        assert_eq!(image.regions.len(), 12);
        let layers: Vec<u32> = image
            .regions
            .iter()
            .map(|r| r.subresource.base_array_layer)
            .collect();
        assert_eq!(layers, (0..12).collect::<Vec<_>>());
        assert_eq!(image.regions[7].buffer_offset, 7);
        assert_eq!(image.data, (0..12).collect::<Vec<u8>>());
    }

    #[test]
    fn non_array_cubes_skip_face_padding() {
        // imageSize is per face; each 2-byte RG8 face is padded to 4 bytes.
        let mut bytes = container(0x822B, (1, 1), 0, 6, &[]);
        // Patch the level count to 1 and append the level by hand.
        let levels_at = 12 + 11 * 4;
        bytes[levels_at..levels_at + 4].copy_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for face in 0..6u8 {
            bytes.extend_from_slice(&[face, face, 0, 0]);
        }
        let image = parse(&bytes).expect("valid container");
        assert_eq!(image.regions.len(), 6);
        assert_eq!(image.data, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
        assert_eq!(image.regions[5].buffer_offset, 10);
    }

    #[test]
    fn malformed_containers_are_rejected() {
        assert!(parse(b"not a texture").is_err());

        let mut truncated = container(0x8058, (4, 4), 0, 1, &[vec![0; 64]]);
        truncated.truncate(truncated.len() - 10);
        assert!(parse(&truncated).unwrap_err().contains("truncated"));

        let unknown = container(0x1234, (1, 1), 0, 1, &[vec![0; 4]]);
        assert!(parse(&unknown).unwrap_err().contains("internal format"));

        let short = container(0x8058, (2, 2), 0, 1, &[vec![0; 12]]);
        assert!(parse(&short).unwrap_err().contains("expected 16"));
    }
}
