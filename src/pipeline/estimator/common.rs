use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use image::RgbaImage;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{HandLandmarks, Landmark, NUM_LANDMARKS};

pub const HANDPOSE_INPUT_SIZE: u32 = 224;
pub const PALM_INPUT_SIZE: u32 = 192;

/// Maps letterboxed model-input coordinates back to the source frame.
#[derive(Clone, Debug)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Maps coordinates inside a rotated square crop back to the source frame.
#[derive(Clone, Debug)]
pub struct CropTransform {
    pub center: (f32, f32),
    pub side: f32,
    pub angle: f32,
    pub output_size: u32,
    pub orig_w: u32,
    pub orig_h: u32,
}

impl CropTransform {
    pub fn project(&self, x: f32, y: f32) -> (f32, f32) {
        let half = self.output_size as f32 / 2.0;
        let scale = self.side / self.output_size as f32;
        let dx = (x - half) * scale;
        let dy = (y - half) * scale;
        let (sin, cos) = self.angle.sin_cos();
        let ox = self.center.0 + dx * cos - dy * sin;
        let oy = self.center.1 + dx * sin + dy * cos;
        (
            ox.clamp(0.0, (self.orig_w.saturating_sub(1)) as f32),
            oy.clamp(0.0, (self.orig_h.saturating_sub(1)) as f32),
        )
    }
}

/// Resizes the frame to fit a `target_size` square, pads it with black and
/// returns an NHWC tensor scaled to `[0, 1]`.
pub fn letterbox_tensor(image: &RgbaImage, target_size: u32) -> Result<(Array4<f32>, LetterboxInfo)> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("cannot letterbox an empty {width}x{height} frame"));
    }

    let scale = target_size as f32 / (width.max(height) as f32);
    let new_w = (width as f32 * scale).round().max(1.0) as u32;
    let new_h = (height as f32 * scale).round().max(1.0) as u32;

    let src_image =
        fir::images::Image::from_vec_u8(width, height, image.as_raw().clone(), fir::PixelType::U8x4)?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = ((target_size as i64 - new_w as i64) / 2).max(0) as usize;
    let pad_y = ((target_size as i64 - new_h as i64) / 2).max(0) as usize;
    let mut canvas = vec![0u8; (target_size as usize) * (target_size as usize) * 4];
    let dst_stride = target_size as usize * 4;
    let src_stride = new_w as usize * 4;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 4;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    let normalized: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| {
            [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]
        })
        .collect();
    let input = Array4::<f32>::from_shape_vec(
        (1, target_size as usize, target_size as usize, 3),
        normalized,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: width,
        orig_h: height,
    };

    Ok((input, letterbox))
}

/// Samples a rotated square of side `side` around `center` into an
/// `output_size` NHWC tensor.
pub fn rotated_crop_tensor(
    image: &RgbaImage,
    center: (f32, f32),
    side: f32,
    angle: f32,
    output_size: u32,
) -> Result<(Array4<f32>, CropTransform)> {
    let half = output_size as f32 / 2.0;
    let scale = side / output_size as f32;
    let (sin, cos) = angle.sin_cos();

    let data: Vec<f32> = (0..output_size)
        .into_par_iter()
        .flat_map_iter(|y| {
            let dy = (y as f32 + 0.5 - half) * scale;
            (0..output_size).flat_map(move |x| {
                let dx = (x as f32 + 0.5 - half) * scale;
                let src_x = center.0 + dx * cos - dy * sin;
                let src_y = center.1 + dx * sin + dy * cos;
                sample_rgb(image, src_x, src_y)
            })
        })
        .collect();

    let array =
        Array4::<f32>::from_shape_vec((1, output_size as usize, output_size as usize, 3), data)
            .map_err(|err| anyhow!("failed to build rotated crop tensor: {err}"))?;

    let transform = CropTransform {
        center,
        side,
        angle,
        output_size,
        orig_w: image.width(),
        orig_h: image.height(),
    };

    Ok((array, transform))
}

/// Reads the first 21 `(x, y, z)` triples of a flat model output.
pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; 3]>> {
    if flat.len() < NUM_LANDMARKS * 3 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_LANDMARKS * 3
        ));
    }

    Ok(flat
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}

/// Projects crop-space landmarks into the frame and normalizes them by the
/// frame size. Depth is dropped.
pub fn normalized_hand(landmarks: &[[f32; 3]], transform: &CropTransform) -> Result<HandLandmarks> {
    let width = transform.orig_w.max(1) as f32;
    let height = transform.orig_h.max(1) as f32;
    let points: Vec<Landmark> = landmarks
        .iter()
        .map(|[x, y, _z]| {
            let (px, py) = transform.project(*x, *y);
            Landmark::new(px / width, py / height)
        })
        .collect();

    Ok(HandLandmarks::from_points(&points)?)
}

fn sample_rgb(image: &RgbaImage, x: f32, y: f32) -> [f32; 3] {
    if x.is_nan() || y.is_nan() {
        return [0.0, 0.0, 0.0];
    }
    let x0 = x.floor();
    let y0 = y.floor();

    let (w, h) = (image.width() as i32, image.height() as i32);
    let fetch = |cx: f32, cy: f32| -> [f32; 3] {
        let (ix, iy) = (cx as i32, cy as i32);
        if ix < 0 || iy < 0 || ix >= w || iy >= h {
            return [0.0, 0.0, 0.0];
        }
        let px = image.get_pixel(ix as u32, iy as u32).0;
        [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ]
    };

    let fx = x - x0;
    let fy = y - y0;
    let c00 = fetch(x0, y0);
    let c10 = fetch(x0 + 1.0, y0);
    let c01 = fetch(x0, y0 + 1.0);
    let c11 = fetch(x0 + 1.0, y0 + 1.0);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    std::array::from_fn(|c| lerp(lerp(c00[c], c10[c], fx), lerp(c01[c], c11[c], fx), fy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Rgba;

    #[test]
    fn letterbox_pads_the_short_side() {
        let image = RgbaImage::from_pixel(384, 192, Rgba([255, 0, 0, 255]));
        let (tensor, info) = letterbox_tensor(&image, PALM_INPUT_SIZE).unwrap();

        assert_eq!(tensor.shape(), &[1, 192, 192, 3]);
        assert_abs_diff_eq!(info.scale, 0.5);
        assert_abs_diff_eq!(info.pad_x, 0.0);
        assert_abs_diff_eq!(info.pad_y, 48.0);
        // padding stays black, image area is red
        assert_abs_diff_eq!(tensor[[0, 10, 96, 0]], 0.0);
        assert_abs_diff_eq!(tensor[[0, 96, 96, 0]], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(tensor[[0, 96, 96, 1]], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn letterbox_rejects_empty_frames() {
        assert!(letterbox_tensor(&RgbaImage::new(0, 10), PALM_INPUT_SIZE).is_err());
    }

    #[test]
    fn unrotated_crop_projects_center_to_center() {
        let transform = CropTransform {
            center: (320.0, 240.0),
            side: 224.0,
            angle: 0.0,
            output_size: 224,
            orig_w: 640,
            orig_h: 480,
        };
        let (x, y) = transform.project(112.0, 112.0);
        assert_abs_diff_eq!(x, 320.0, epsilon = 1e-4);
        assert_abs_diff_eq!(y, 240.0, epsilon = 1e-4);

        let (x, y) = transform.project(0.0, 0.0);
        assert_abs_diff_eq!(x, 208.0, epsilon = 1e-4);
        assert_abs_diff_eq!(y, 128.0, epsilon = 1e-4);
    }

    #[test]
    fn projection_clamps_into_the_frame() {
        let transform = CropTransform {
            center: (10.0, 10.0),
            side: 448.0,
            angle: 0.0,
            output_size: 224,
            orig_w: 100,
            orig_h: 50,
        };
        let (x, y) = transform.project(0.0, 224.0);
        assert_abs_diff_eq!(x, 0.0);
        assert_abs_diff_eq!(y, 49.0);
    }

    #[test]
    fn normalized_hand_divides_by_frame_size() {
        let transform = CropTransform {
            center: (100.0, 50.0),
            side: 224.0,
            angle: 0.0,
            output_size: 224,
            orig_w: 200,
            orig_h: 100,
        };
        let raw = vec![[112.0, 112.0, 0.3]; NUM_LANDMARKS];
        let hand = normalized_hand(&raw, &transform).unwrap();
        for p in hand.iter() {
            assert_abs_diff_eq!(p.x, 0.5, epsilon = 1e-5);
            assert_abs_diff_eq!(p.y, 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn decode_landmarks_needs_63_values() {
        assert!(decode_landmarks(&[0.0; 62]).is_err());
        let flat: Vec<f32> = (0..70).map(|v| v as f32).collect();
        let points = decode_landmarks(&flat).unwrap();
        assert_eq!(points.len(), NUM_LANDMARKS);
        assert_eq!(points[20], [60.0, 61.0, 62.0]);
    }

    #[test]
    fn crop_of_uniform_image_is_uniform() {
        let image = RgbaImage::from_pixel(64, 64, Rgba([0, 255, 0, 255]));
        let (tensor, transform) =
            rotated_crop_tensor(&image, (32.0, 32.0), 32.0, 0.7, 16).unwrap();
        assert_eq!(tensor.shape(), &[1, 16, 16, 3]);
        assert_eq!(transform.output_size, 16);
        assert_abs_diff_eq!(tensor[[0, 8, 8, 1]], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(tensor[[0, 8, 8, 0]], 0.0, epsilon = 1e-5);
    }
}
