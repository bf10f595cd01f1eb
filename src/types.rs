use std::{fmt, time::Instant};

use image::RgbaImage;
use thiserror::Error;

pub const NUM_LANDMARKS: usize = 21;

/// Landmark indices of the 21-point hand skeleton.
#[allow(dead_code)]
pub mod landmark {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// A camera frame after decoding to RGBA.
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbaImage,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            timestamp: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A keypoint normalized to the frame: `x` and `y` are fractions of the image
/// width and height, with `y` growing downward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        (
            (self.x * width as f32) as i32,
            (self.y * height as f32) as i32,
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LandmarkError {
    #[error("hand landmark set needs exactly 21 points, got {0}")]
    WrongCount(usize),
}

/// One detected hand: exactly 21 landmarks in the standard index order.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; NUM_LANDMARKS],
}

impl HandLandmarks {
    pub const fn new(points: [Landmark; NUM_LANDMARKS]) -> Self {
        Self { points }
    }

    pub fn from_points(points: &[Landmark]) -> Result<Self, LandmarkError> {
        let points: [Landmark; NUM_LANDMARKS] = points
            .try_into()
            .map_err(|_| LandmarkError::WrongCount(points.len()))?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.points.iter()
    }
}

impl std::ops::Index<usize> for HandLandmarks {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Landmark {
        &self.points[index]
    }
}

impl std::ops::IndexMut<usize> for HandLandmarks {
    fn index_mut(&mut self, index: usize) -> &mut Landmark {
        &mut self.points[index]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn tip(&self) -> usize {
        match self {
            Finger::Thumb => landmark::THUMB_TIP,
            Finger::Index => landmark::INDEX_TIP,
            Finger::Middle => landmark::MIDDLE_TIP,
            Finger::Ring => landmark::RING_TIP,
            Finger::Pinky => landmark::PINKY_TIP,
        }
    }

    /// Joint the tip is compared against: IP for the thumb, PIP otherwise.
    pub fn reference_joint(&self) -> usize {
        match self {
            Finger::Thumb => landmark::THUMB_IP,
            Finger::Index => landmark::INDEX_PIP,
            Finger::Middle => landmark::MIDDLE_PIP,
            Finger::Ring => landmark::RING_PIP,
            Finger::Pinky => landmark::PINKY_PIP,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FingerState {
    Extended,
    Curled,
}

impl FingerState {
    pub fn from_extended(extended: bool) -> Self {
        if extended {
            FingerState::Extended
        } else {
            FingerState::Curled
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, FingerState::Extended)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FingerState::Extended => "extended",
            FingerState::Curled => "curled",
        }
    }
}

/// Per-finger state, thumb first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FingerStates(pub [FingerState; 5]);

impl FingerStates {
    pub fn get(&self, finger: Finger) -> FingerState {
        self.0[finger as usize]
    }

    pub fn is_extended(&self, finger: Finger) -> bool {
        self.get(finger).is_extended()
    }

    pub fn extended_count(&self) -> usize {
        self.0.iter().filter(|s| s.is_extended()).count()
    }

    pub fn summary(&self) -> String {
        Finger::ALL
            .iter()
            .zip(self.0.iter())
            .map(|(finger, state)| format!("{} {}", finger.label(), state.label()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    Peace,
    HiFive,
    Fist,
    ThumbsUp,
    Ok,
    /// No named gesture matched; carries the number of extended fingers.
    OpenCount(u8),
}

impl GestureKind {
    pub fn emoji(&self) -> &'static str {
        match self {
            GestureKind::Peace => "✌️ ",
            GestureKind::HiFive => "🖐️ ",
            GestureKind::Fist => "✊ ",
            GestureKind::ThumbsUp => "👍 ",
            GestureKind::Ok => "👌 ",
            GestureKind::OpenCount(_) => "",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureKind::Peace => f.write_str("Peace"),
            GestureKind::HiFive => f.write_str("Hi Five"),
            GestureKind::Fist => f.write_str("Fist"),
            GestureKind::ThumbsUp => f.write_str("Thumbs Up"),
            GestureKind::Ok => f.write_str("OK"),
            GestureKind::OpenCount(n) => write!(f, "{n} fingers open"),
        }
    }
}

/// Palm detector output in frame pixel coordinates.
#[derive(Clone, Debug)]
pub struct PalmRegion {
    pub bbox: [f32; 4],
    pub landmarks: Vec<(f32, f32)>,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_rejects_wrong_length() {
        let points = vec![Landmark::default(); 20];
        assert_eq!(
            HandLandmarks::from_points(&points),
            Err(LandmarkError::WrongCount(20))
        );
        let points = vec![Landmark::default(); 21];
        assert!(HandLandmarks::from_points(&points).is_ok());
    }

    #[test]
    fn open_count_label() {
        assert_eq!(GestureKind::OpenCount(3).to_string(), "3 fingers open");
        assert_eq!(GestureKind::HiFive.to_string(), "Hi Five");
    }

    #[test]
    fn finger_states_count_and_lookup() {
        let states = FingerStates([
            FingerState::Extended,
            FingerState::Curled,
            FingerState::Extended,
            FingerState::Curled,
            FingerState::Curled,
        ]);
        assert_eq!(states.extended_count(), 2);
        assert!(states.is_extended(Finger::Thumb));
        assert!(!states.is_extended(Finger::Index));
        assert!(states.is_extended(Finger::Middle));
        assert_eq!(
            states.summary(),
            "thumb extended, index curled, middle extended, ring curled, pinky curled"
        );
    }

    #[test]
    fn landmark_to_pixel_truncates() {
        let lm = Landmark::new(0.5, 0.25);
        assert_eq!(lm.to_pixel(641, 480), (320, 120));
    }
}
