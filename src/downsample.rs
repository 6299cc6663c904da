//! Pair Downsampler (component C). Given two equal-sized grayscale matrices,
//! averages them pixel-wise and then 2x2 box-averages the result down to
//! half resolution; given one (the odd-trailing case), only the box average
//! applies.
//!
//! The row-parallel box average is grounded in `lib_optimized.rs`'s
//! `downscale_half_u8`/`downscale_half_u16`, which uses `rayon`'s
//! `par_chunks_mut` over output rows. That code rounds
//! (`(a+b+c+d+2) >> 2`, `(a+b+1) >> 1`); this implementation truncates
//! instead (`(A+B+0)/2`, `floor(sum/4)`), with no added rounding bias.
//! See DESIGN.md.

use image::{ImageBuffer, Luma};
use rayon::prelude::*;

use crate::codec::GrayImage;
use crate::error::DownsampleError;

type Gray8 = ImageBuffer<Luma<u8>, Vec<u8>>;
type Gray16 = ImageBuffer<Luma<u16>, Vec<u16>>;

fn check_same_size(a_w: u32, a_h: u32, b_w: u32, b_h: u32) -> Result<(), DownsampleError> {
    if a_w != b_w || a_h != b_h {
        return Err(DownsampleError::DimensionMismatch {
            expected_w: a_w,
            expected_h: a_h,
            got_w: b_w,
            got_h: b_h,
        });
    }
    Ok(())
}

/// Step 1-3: promote to a wider accumulator, truncating-average the two
/// same-sized buffers, cast back to the native width.
fn average_same_size_u8(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.par_iter()
        .zip(b.par_iter())
        .map(|(&x, &y)| (((x as u16) + (y as u16)) / 2) as u8)
        .collect()
}

fn average_same_size_u16(a: &[u16], b: &[u16]) -> Vec<u16> {
    a.par_iter()
        .zip(b.par_iter())
        .map(|(&x, &y)| (((x as u32) + (y as u32)) / 2) as u16)
        .collect()
}

/// Step 4: 2x2 box average, dropping a trailing odd row/column.
fn box_downsample_u8(src: &[u8], w: usize, h: usize) -> (Vec<u8>, usize, usize) {
    let dw = w / 2;
    let dh = h / 2;
    let mut dst = vec![0u8; dw * dh];
    dst.par_chunks_mut(dw).enumerate().for_each(|(y, row)| {
        let sy0 = y * 2;
        let sy1 = sy0 + 1;
        let base0 = sy0 * w;
        let base1 = sy1 * w;
        for x in 0..dw {
            let sx0 = x * 2;
            let sx1 = sx0 + 1;
            let sum = src[base0 + sx0] as u32
                + src[base0 + sx1] as u32
                + src[base1 + sx0] as u32
                + src[base1 + sx1] as u32;
            row[x] = (sum / 4) as u8;
        }
    });
    (dst, dw, dh)
}

fn box_downsample_u16(src: &[u16], w: usize, h: usize) -> (Vec<u16>, usize, usize) {
    let dw = w / 2;
    let dh = h / 2;
    let mut dst = vec![0u16; dw * dh];
    dst.par_chunks_mut(dw).enumerate().for_each(|(y, row)| {
        let sy0 = y * 2;
        let sy1 = sy0 + 1;
        let base0 = sy0 * w;
        let base1 = sy1 * w;
        for x in 0..dw {
            let sx0 = x * 2;
            let sx1 = sx0 + 1;
            let sum = src[base0 + sx0] as u32
                + src[base0 + sx1] as u32
                + src[base1 + sx0] as u32
                + src[base1 + sx1] as u32;
            row[x] = (sum / 4) as u16;
        }
    });
    (dst, dw, dh)
}

fn to_buffer_u8(data: Vec<u8>, w: usize, h: usize) -> Result<Gray8, DownsampleError> {
    ImageBuffer::from_raw(w as u32, h as u32, data).ok_or(DownsampleError::TooSmall {
        w: w as u32,
        h: h as u32,
    })
}

fn to_buffer_u16(data: Vec<u16>, w: usize, h: usize) -> Result<Gray16, DownsampleError> {
    ImageBuffer::from_raw(w as u32, h as u32, data).ok_or(DownsampleError::TooSmall {
        w: w as u32,
        h: h as u32,
    })
}

/// Average two equal-sized images at indices (2i, 2i+1), then box-downsample
/// the average. Both inputs must share bit depth and dimensions.
pub fn pair_downsample(a: &GrayImage, b: &GrayImage) -> Result<GrayImage, DownsampleError> {
    if a.width() < 2 || a.height() < 2 {
        return Err(DownsampleError::TooSmall {
            w: a.width(),
            h: a.height(),
        });
    }
    match (a, b) {
        (GrayImage::U8(a), GrayImage::U8(b)) => {
            check_same_size(a.width(), a.height(), b.width(), b.height())?;
            let averaged = average_same_size_u8(a.as_raw(), b.as_raw());
            let (data, w, h) = box_downsample_u8(&averaged, a.width() as usize, a.height() as usize);
            Ok(GrayImage::U8(to_buffer_u8(data, w, h)?))
        }
        (GrayImage::U16(a), GrayImage::U16(b)) => {
            check_same_size(a.width(), a.height(), b.width(), b.height())?;
            let averaged = average_same_size_u16(a.as_raw(), b.as_raw());
            let (data, w, h) = box_downsample_u16(&averaged, a.width() as usize, a.height() as usize);
            Ok(GrayImage::U16(to_buffer_u16(data, w, h)?))
        }
        _ => Err(DownsampleError::BitDepthMismatch),
    }
}

/// Box-downsample a single trailing image (odd input count at this level).
pub fn single_downsample(a: &GrayImage) -> Result<GrayImage, DownsampleError> {
    if a.width() < 2 || a.height() < 2 {
        return Err(DownsampleError::TooSmall {
            w: a.width(),
            h: a.height(),
        });
    }
    match a {
        GrayImage::U8(buf) => {
            let (data, w, h) = box_downsample_u8(buf.as_raw(), buf.width() as usize, buf.height() as usize);
            Ok(GrayImage::U8(to_buffer_u8(data, w, h)?))
        }
        GrayImage::U16(buf) => {
            let (data, w, h) = box_downsample_u16(buf.as_raw(), buf.width() as usize, buf.height() as usize);
            Ok(GrayImage::U16(to_buffer_u16(data, w, h)?))
        }
    }
}
