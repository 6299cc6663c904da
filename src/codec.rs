//! Image Codec Adapter (component B). Reads/writes 8- and 16-bit grayscale
//! images and reports their bit depth, grounded in `lib_optimized.rs`'s
//! `to_luma_preserve_depth`/`read_luma_preserve_depth`/`write_tiff_preserve_depth`
//! but stricter: that code silently converts RGB, RGBA, indexed and float
//! images down to grayscale, whereas this adapter rejects those as
//! `UnsupportedFormat` rather than transcoding without the caller's
//! knowledge.

use std::path::Path;

use image::{ColorType, DynamicImage, ImageBuffer, ImageDecoder, ImageFormat, ImageReader, Luma};

use crate::error::CodecError;

/// Native bit depth of a grayscale slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
}

/// A decoded grayscale image at its native bit depth.
#[derive(Debug, Clone)]
pub enum GrayImage {
    U8(ImageBuffer<Luma<u8>, Vec<u8>>),
    U16(ImageBuffer<Luma<u16>, Vec<u16>>),
}

impl GrayImage {
    pub fn width(&self) -> u32 {
        match self {
            GrayImage::U8(b) => b.width(),
            GrayImage::U16(b) => b.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            GrayImage::U8(b) => b.height(),
            GrayImage::U16(b) => b.height(),
        }
    }

    pub fn bit_depth(&self) -> BitDepth {
        match self {
            GrayImage::U8(_) => BitDepth::Eight,
            GrayImage::U16(_) => BitDepth::Sixteen,
        }
    }
}

fn open_decoded(path: &Path) -> Result<DynamicImage, CodecError> {
    let reader = ImageReader::open(path)
        .map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    reader.decode().map_err(|source| CodecError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn reason_for(img: &DynamicImage) -> String {
    format!("{:?} is not an 8- or 16-bit grayscale image", img.color())
}

/// Opens the image header and classifies its bit depth from the decoder's
/// color type, without decoding any pixel data. Rejects anything that isn't
/// pure 8- or 16-bit grayscale.
pub fn detect_bit_depth(path: &Path) -> Result<BitDepth, CodecError> {
    let reader = ImageReader::open(path)
        .map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let decoder = reader.into_decoder().map_err(|source| CodecError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    match decoder.color_type() {
        ColorType::L8 => Ok(BitDepth::Eight),
        ColorType::L16 => Ok(BitDepth::Sixteen),
        other => Err(CodecError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: format!("{other:?} is not an 8- or 16-bit grayscale image"),
        }),
    }
}

/// Returns `(width, height)` without decoding pixel data, where the
/// underlying decoder supports it.
pub fn dimensions(path: &Path) -> Result<(u32, u32), CodecError> {
    let reader = ImageReader::open(path)
        .map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    reader.into_dimensions().map_err(|source| CodecError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes the image at its native bit depth. Fails with
/// `UnsupportedFormat` for anything that isn't pure 8- or 16-bit grayscale
/// (indexed, RGB, RGBA, floating point).
pub fn load_gray(path: &Path) -> Result<GrayImage, CodecError> {
    let img = open_decoded(path)?;
    match img {
        DynamicImage::ImageLuma8(buf) => Ok(GrayImage::U8(buf)),
        DynamicImage::ImageLuma16(buf) => Ok(GrayImage::U16(buf)),
        other => Err(CodecError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: reason_for(&other),
        }),
    }
}

/// Writes an uncompressed TIFF at the matrix's native bit depth. Output
/// format is always TIFF regardless of the source format.
pub fn save_gray_tiff(path: &Path, image: &GrayImage) -> Result<(), CodecError> {
    let result = match image {
        GrayImage::U8(buf) => buf.save_with_format(path, ImageFormat::Tiff),
        GrayImage::U16(buf) => buf.save_with_format(path, ImageFormat::Tiff),
    };
    result.map_err(|source| CodecError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_u8(path: &Path, w: u32, h: u32, value: u8) {
        let buf = ImageBuffer::<Luma<u8>, Vec<u8>>::from_pixel(w, h, Luma([value]));
        buf.save(path).unwrap();
    }

    fn write_u16(path: &Path, w: u32, h: u32, value: u16) {
        let buf = ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(w, h, Luma([value]));
        buf.save(path).unwrap();
    }

    #[test]
    fn detects_8_bit_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tif");
        write_u8(&path, 4, 4, 100);
        assert_eq!(detect_bit_depth(&path).unwrap(), BitDepth::Eight);
    }

    #[test]
    fn detects_16_bit_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tif");
        write_u16(&path, 4, 4, 40000);
        assert_eq!(detect_bit_depth(&path).unwrap(), BitDepth::Sixteen);
    }

    #[test]
    fn rejects_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tif");
        let buf = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        buf.save(&path).unwrap();
        assert!(matches!(
            detect_bit_depth(&path),
            Err(CodecError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            load_gray(&path),
            Err(CodecError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn round_trips_bit_depth_through_save() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.tif");
        write_u16(&src, 8, 8, 12345);
        let img = load_gray(&src).unwrap();
        assert_eq!(img.bit_depth(), BitDepth::Sixteen);

        let dst = dir.path().join("dst.tif");
        save_gray_tiff(&dst, &img).unwrap();
        assert_eq!(detect_bit_depth(&dst).unwrap(), BitDepth::Sixteen);
        assert_eq!(dimensions(&dst).unwrap(), (8, 8));
    }
}
