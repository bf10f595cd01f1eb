use std::convert::TryFrom;

use anyhow::{Result, anyhow};
use image::RgbaImage;
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

/// Pixel layouts a camera may hand us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceLayout {
    Nv12,
    Yuyv,
    Mjpeg,
    Rgb,
    Bgr,
    Gray,
}

#[cfg(feature = "camera-nokhwa")]
pub fn convert_camera_frame(frame: &nokhwa::Buffer) -> Result<RgbaImage> {
    use nokhwa::utils::FrameFormat;

    let resolution = frame.resolution();
    let layout = match frame.source_frame_format() {
        FrameFormat::NV12 => SourceLayout::Nv12,
        FrameFormat::YUYV => SourceLayout::Yuyv,
        FrameFormat::MJPEG => SourceLayout::Mjpeg,
        FrameFormat::RAWRGB => SourceLayout::Rgb,
        FrameFormat::RAWBGR => SourceLayout::Bgr,
        FrameFormat::GRAY => SourceLayout::Gray,
    };

    to_rgba_image(
        frame.buffer(),
        resolution.width_x,
        resolution.height_y,
        layout,
    )
}

pub fn to_rgba_image(data: &[u8], width: u32, height: u32, layout: SourceLayout) -> Result<RgbaImage> {
    let (rgba, width, height) = match layout {
        SourceLayout::Nv12 => (nv12_to_rgba(data, width, height)?, width, height),
        SourceLayout::Yuyv => (yuyv_to_rgba(data, width, height)?, width, height),
        SourceLayout::Mjpeg => mjpeg_to_rgba(data)?,
        SourceLayout::Rgb => (rgb_like_to_rgba(data, width, height, false)?, width, height),
        SourceLayout::Bgr => (rgb_like_to_rgba(data, width, height, true)?, width, height),
        SourceLayout::Gray => (gray_to_rgba(data, width, height)?, width, height),
    };

    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| anyhow!("decoded {layout:?} frame does not fill {width}x{height}"))
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_plane_len = width as usize * height as usize;
    let uv_plane_len = y_plane_len / 2;

    if data.len() < y_plane_len + uv_plane_len {
        return Err(anyhow!(
            "NV12 buffer too small: got {}, expected {}",
            data.len(),
            y_plane_len + uv_plane_len
        ));
    }

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_plane_len],
        y_stride: width,
        uv_plane: &data[y_plane_len..y_plane_len + uv_plane_len],
        uv_stride: width,
        width,
        height,
    };

    let mut rgba = vec![0u8; y_plane_len * 4];
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 to RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected_len = width as usize * height as usize * 2;
    if data.len() < expected_len {
        return Err(anyhow!(
            "YUYV buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    let mut rgba = vec![0u8; (width as usize * height as usize) * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422 to RGBA failed: {err:?}"))?;

    Ok(rgba)
}

/// MJPEG frames carry their own size, which may differ from the negotiated one.
fn mjpeg_to_rgba(data: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("MJPEG decoder reported no image info"))?;
    let width = u32::try_from(info.width).map_err(|_| anyhow!("MJPEG width out of range"))?;
    let height = u32::try_from(info.height).map_err(|_| anyhow!("MJPEG height out of range"))?;

    Ok((rgba, width, height))
}

fn rgb_like_to_rgba(data: &[u8], width: u32, height: u32, swap_rb: bool) -> Result<Vec<u8>> {
    let expected_len = width as usize * height as usize * 3;
    if data.len() < expected_len {
        return Err(anyhow!(
            "RGB buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    let mut rgba = vec![0u8; (width as usize * height as usize) * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            let (r, b) = if swap_rb { (src[2], src[0]) } else { (src[0], src[2]) };
            dst.copy_from_slice(&[r, src[1], b, 255]);
        });

    Ok(rgba)
}

fn gray_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected_len = width as usize * height as usize;
    if data.len() < expected_len {
        return Err(anyhow!(
            "GRAY buffer too small: got {}, expected {}",
            data.len(),
            expected_len
        ));
    }

    let mut rgba = vec![0u8; expected_len * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_iter().copied())
        .for_each(|(dst, value)| dst.copy_from_slice(&[value, value, value, 255]));

    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn rgb_and_bgr_produce_same_image() {
        let rgb = [10u8, 20, 30, 40, 50, 60];
        let bgr = [30u8, 20, 10, 60, 50, 40];
        let a = to_rgba_image(&rgb, 2, 1, SourceLayout::Rgb).unwrap();
        let b = to_rgba_image(&bgr, 2, 1, SourceLayout::Bgr).unwrap();
        assert_eq!(a, b);
        assert_eq!(*a.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*a.get_pixel(1, 0), Rgba([40, 50, 60, 255]));
    }

    #[test]
    fn gray_is_replicated_to_all_channels() {
        let image = to_rgba_image(&[7, 200], 1, 2, SourceLayout::Gray).unwrap();
        assert_eq!(*image.get_pixel(0, 0), Rgba([7, 7, 7, 255]));
        assert_eq!(*image.get_pixel(0, 1), Rgba([200, 200, 200, 255]));
    }

    #[test]
    fn short_buffers_are_rejected() {
        assert!(to_rgba_image(&[0; 5], 2, 1, SourceLayout::Rgb).is_err());
        assert!(to_rgba_image(&[0; 3], 2, 2, SourceLayout::Gray).is_err());
        assert!(to_rgba_image(&[0; 7], 2, 2, SourceLayout::Yuyv).is_err());
        assert!(to_rgba_image(&[0; 5], 2, 2, SourceLayout::Nv12).is_err());
    }

    #[test]
    fn garbage_mjpeg_is_an_error() {
        assert!(to_rgba_image(&[0xde, 0xad, 0xbe, 0xef], 2, 2, SourceLayout::Mjpeg).is_err());
    }
}
