//! Drawing of hand skeletons, bounding boxes and the info panel onto frames.
//!
//! All writes are bounds-checked, so landmarks near or past the frame border
//! are clipped instead of panicking.

use std::convert::Infallible;

use embedded_graphics::{
    mono_font::{
        MonoTextStyle,
        ascii::{FONT_9X15, FONT_10X20},
    },
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle},
    text::Text,
};
use image::{Rgba, RgbaImage};

use crate::types::{Finger, GestureKind, HandLandmarks, landmark};

pub const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

pub const NO_HAND_LABEL: &str = "No hand";
pub const BOX_MARGIN: i32 = 20;

const SKELETON_LINE_THICKNESS: i32 = 3;
const BOX_LINE_THICKNESS: i32 = 2;
const POINT_RADIUS: i32 = 5;
const POINT_RING_RADIUS: i32 = 7;
const POINT_RING_THICKNESS: i32 = 2;

const LINE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const WRIST_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const RING_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

const PANEL_TOP_LEFT: Point = Point::new(10, 10);
const PANEL_BOTTOM_RIGHT: Point = Point::new(400, 100);

fn finger_color(finger: Finger) -> Rgba<u8> {
    match finger {
        Finger::Thumb => Rgba([255, 0, 0, 255]),
        Finger::Index => Rgba([0, 255, 0, 255]),
        Finger::Middle => Rgba([0, 0, 255, 255]),
        Finger::Ring => Rgba([255, 255, 0, 255]),
        Finger::Pinky => Rgba([255, 0, 255, 255]),
    }
}

fn finger_of(index: usize) -> Option<Finger> {
    match index {
        landmark::THUMB_CMC..=landmark::THUMB_TIP => Some(Finger::Thumb),
        landmark::INDEX_MCP..=landmark::INDEX_TIP => Some(Finger::Index),
        landmark::MIDDLE_MCP..=landmark::MIDDLE_TIP => Some(Finger::Middle),
        landmark::RING_MCP..=landmark::RING_TIP => Some(Finger::Ring),
        landmark::PINKY_MCP..=landmark::PINKY_TIP => Some(Finger::Pinky),
        _ => None,
    }
}

/// Pixel-space box around a hand, already expanded and clamped to the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

pub fn hand_bounds(hand: &HandLandmarks, width: u32, height: u32) -> BoundingBox {
    let (min_x, max_x, min_y, max_y) = hand.iter().fold(
        (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
        |acc, p| (acc.0.min(p.x), acc.1.max(p.x), acc.2.min(p.y), acc.3.max(p.y)),
    );
    let (w, h) = (width as i32, height as i32);

    BoundingBox {
        x_min: ((min_x * width as f32) as i32 - BOX_MARGIN).clamp(0, w),
        y_min: ((min_y * height as f32) as i32 - BOX_MARGIN).clamp(0, h),
        x_max: ((max_x * width as f32) as i32 + BOX_MARGIN).clamp(0, w),
        y_max: ((max_y * height as f32) as i32 + BOX_MARGIN).clamp(0, h),
    }
}

/// Draws the skeleton lines, then one colored dot per landmark.
pub fn draw_hand(image: &mut RgbaImage, hand: &HandLandmarks) {
    let (width, height) = image.dimensions();

    for &(a, b) in CONNECTIONS {
        let start = hand[a].to_pixel(width, height);
        let end = hand[b].to_pixel(width, height);
        draw_line(image, start, end, LINE_COLOR, SKELETON_LINE_THICKNESS);
    }

    for (idx, point) in hand.iter().enumerate() {
        let center = point.to_pixel(width, height);
        let color = finger_of(idx).map(finger_color).unwrap_or(WRIST_COLOR);
        draw_circle(image, center, POINT_RADIUS, color);
        draw_ring(image, center, POINT_RING_RADIUS, POINT_RING_THICKNESS, RING_COLOR);
    }
}

pub fn draw_bounding_box(image: &mut RgbaImage, bounds: &BoundingBox) {
    let BoundingBox {
        x_min,
        y_min,
        x_max,
        y_max,
    } = *bounds;
    let corners = [
        (x_min, y_min),
        (x_max, y_min),
        (x_max, y_max),
        (x_min, y_max),
    ];
    for i in 0..corners.len() {
        let next = corners[(i + 1) % corners.len()];
        draw_line(image, corners[i], next, BOX_COLOR, BOX_LINE_THICKNESS);
    }
}

/// Hand count and gesture in the top-left corner, quit hint at the bottom.
pub fn draw_info_panel(image: &mut RgbaImage, gesture_label: &str, hand_count: usize) {
    let height = image.height() as i32;
    let panel_style = PrimitiveStyleBuilder::new()
        .fill_color(Rgb888::BLACK)
        .stroke_color(Rgb888::WHITE)
        .stroke_width(2)
        .build();
    render(
        image,
        &Rectangle::with_corners(PANEL_TOP_LEFT, PANEL_BOTTOM_RIGHT).into_styled(panel_style),
    );

    let count_text = format!("Hands: {hand_count}");
    let count_style = MonoTextStyle::new(&FONT_9X15, Rgb888::WHITE);
    render(image, &Text::new(&count_text, Point::new(20, 35), count_style));

    let gesture_text = format!("Gesture: {gesture_label}");
    let gesture_style = MonoTextStyle::new(&FONT_10X20, Rgb888::YELLOW);
    render(image, &Text::new(&gesture_text, Point::new(20, 70), gesture_style));

    let hint_style = MonoTextStyle::new(&FONT_9X15, Rgb888::WHITE);
    render(
        image,
        &Text::new("Press 'q' to quit", Point::new(20, height - 20), hint_style),
    );
}

/// Draws every hand with its box and the info panel. Returns the label shown
/// in the panel: the gesture of the last hand, or [`NO_HAND_LABEL`].
pub fn annotate_frame(
    image: &mut RgbaImage,
    hands: &[HandLandmarks],
    gestures: &[GestureKind],
) -> String {
    let (width, height) = image.dimensions();
    for hand in hands {
        draw_hand(image, hand);
        let bounds = hand_bounds(hand, width, height);
        draw_bounding_box(image, &bounds);
    }

    let label = gestures
        .last()
        .map(|g| g.to_string())
        .unwrap_or_else(|| NO_HAND_LABEL.to_string());
    draw_info_panel(image, &label, hands.len());
    label
}

fn draw_line(
    image: &mut RgbaImage,
    p0: (i32, i32),
    p1: (i32, i32),
    color: Rgba<u8>,
    thickness: i32,
) {
    let (mut x0, mut y0) = p0;
    let (x1, y1) = p1;
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let thickness = thickness.max(1);
    let brush = -(thickness - 1) / 2..=thickness / 2;

    loop {
        for ox in brush.clone() {
            for oy in brush.clone() {
                put_pixel_safe(image, x0 + ox, y0 + oy, color);
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(image: &mut RgbaImage, center: (i32, i32), radius: i32, color: Rgba<u8>) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(image, cx + dx, cy + dy, color);
            }
        }
    }
}

fn draw_ring(
    image: &mut RgbaImage,
    center: (i32, i32),
    radius: i32,
    thickness: i32,
    color: Rgba<u8>,
) {
    let (cx, cy) = center;
    let inner = (radius - thickness / 2).max(0);
    let outer = radius + thickness / 2;
    for dy in -outer..=outer {
        for dx in -outer..=outer {
            let d2 = dx * dx + dy * dy;
            if d2 >= inner * inner && d2 <= outer * outer {
                put_pixel_safe(image, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(image: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux < image.width() && uy < image.height() {
        image.put_pixel(ux, uy, color);
    }
}

/// embedded-graphics target over an RGBA frame, used for text and the panel.
struct Canvas<'a>(&'a mut RgbaImage);

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            put_pixel_safe(
                self.0,
                point.x,
                point.y,
                Rgba([color.r(), color.g(), color.b(), 255]),
            );
        }
        Ok(())
    }
}

fn render<T>(image: &mut RgbaImage, item: &T)
where
    T: Drawable<Color = Rgb888>,
{
    match item.draw(&mut Canvas(image)) {
        Ok(_) => {}
        Err(infallible) => match infallible {},
    }
}
