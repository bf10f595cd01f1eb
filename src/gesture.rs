//! Rule-based classification of a single hand pose.
//!
//! Everything here is a pure function of one [`HandLandmarks`] set; there is no
//! history and no model. The rules assume an upright hand facing the camera in
//! a mirrored (selfie) view.

use rayon::prelude::*;

use crate::types::{
    Finger, FingerState, FingerStates, GestureKind, HandLandmarks, landmark,
};

/// Thumb tip and index tip closer than this (in normalized frame units) form
/// the OK circle.
pub const OK_TOUCH_DISTANCE: f32 = 0.05;

/// A finger counts as extended when its tip sits strictly above the joint
/// below it in image coordinates.
pub fn is_finger_extended(landmarks: &HandLandmarks, tip: usize, pip: usize) -> bool {
    landmarks[tip].y < landmarks[pip].y
}

/// Extension state of all five fingers, thumb first.
///
/// The thumb is judged horizontally: extended when its tip lies to the right of
/// the IP joint. That only holds for a right hand seen mirrored; a left hand
/// (or a right hand seen unmirrored) reports the opposite thumb state.
pub fn finger_states(landmarks: &HandLandmarks) -> FingerStates {
    let thumb = landmarks[landmark::THUMB_TIP].x > landmarks[landmark::THUMB_IP].x;

    let mut states = [FingerState::Curled; 5];
    for (slot, finger) in states.iter_mut().zip(Finger::ALL) {
        *slot = FingerState::from_extended(match finger {
            Finger::Thumb => thumb,
            _ => is_finger_extended(landmarks, finger.tip(), finger.reference_joint()),
        });
    }

    FingerStates(states)
}

/// Maps finger states (plus the thumb/index distance for OK) to a gesture.
/// Rules are checked in order and the first match wins.
pub fn classify(landmarks: &HandLandmarks) -> GestureKind {
    let states = finger_states(landmarks);
    let total = states.extended_count();
    let thumb = states.is_extended(Finger::Thumb);
    let index = states.is_extended(Finger::Index);
    let middle = states.is_extended(Finger::Middle);

    if total == 2 && index && middle {
        return GestureKind::Peace;
    }
    if total == 5 {
        return GestureKind::HiFive;
    }
    if total == 0 {
        return GestureKind::Fist;
    }
    if total == 1 && thumb {
        return GestureKind::ThumbsUp;
    }
    if total == 3 && thumb && !index {
        let distance =
            landmarks[landmark::THUMB_TIP].distance(&landmarks[landmark::INDEX_TIP]);
        if distance < OK_TOUCH_DISTANCE {
            return GestureKind::Ok;
        }
        // Too far apart for OK: reported by count like any other pose.
    }

    GestureKind::OpenCount(total as u8)
}

/// Classifies every detected hand, keeping the input order.
pub fn classify_hands(hands: &[HandLandmarks]) -> Vec<GestureKind> {
    hands.par_iter().map(classify).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Landmark, NUM_LANDMARKS};

    /// Builds an upright hand with every finger curled; tests then flip
    /// individual fingers.
    fn curled_hand() -> HandLandmarks {
        let mut points = [Landmark::new(0.5, 0.8); NUM_LANDMARKS];
        // thumb: tip left of IP
        points[landmark::THUMB_IP] = Landmark::new(0.40, 0.60);
        points[landmark::THUMB_TIP] = Landmark::new(0.35, 0.60);
        for (i, finger) in Finger::ALL.iter().enumerate().skip(1) {
            let x = 0.40 + 0.05 * i as f32;
            points[finger.reference_joint()] = Landmark::new(x, 0.50);
            points[finger.tip()] = Landmark::new(x, 0.60);
        }
        HandLandmarks::new(points)
    }

    fn extend(hand: &mut HandLandmarks, finger: Finger) {
        match finger {
            Finger::Thumb => {
                let ip = hand[landmark::THUMB_IP];
                hand[landmark::THUMB_TIP] = Landmark::new(ip.x + 0.05, ip.y);
            }
            _ => {
                let pip = hand[finger.reference_joint()];
                hand[finger.tip()] = Landmark::new(pip.x, pip.y - 0.15);
            }
        }
    }

    fn hand_with(fingers: &[Finger]) -> HandLandmarks {
        let mut hand = curled_hand();
        for &finger in fingers {
            extend(&mut hand, finger);
        }
        hand
    }

    #[test]
    fn tip_above_pip_is_extended() {
        let hand = hand_with(&[Finger::Index]);
        assert!(is_finger_extended(&hand, 8, 6));
        assert!(!is_finger_extended(&hand, 12, 10));
    }

    #[test]
    fn equal_heights_are_not_extended() {
        let mut hand = curled_hand();
        hand[landmark::INDEX_TIP] = hand[landmark::INDEX_PIP];
        assert!(!is_finger_extended(&hand, 8, 6));
    }

    #[test]
    fn thumb_uses_horizontal_test() {
        let mut hand = curled_hand();
        // tip far above the IP joint but to its left: still curled
        hand[landmark::THUMB_TIP] = Landmark::new(0.30, 0.10);
        assert!(!finger_states(&hand).is_extended(Finger::Thumb));

        hand[landmark::THUMB_TIP] = Landmark::new(0.45, 0.90);
        assert!(finger_states(&hand).is_extended(Finger::Thumb));
    }

    #[test]
    fn thumb_rule_assumes_mirrored_right_hand() {
        // A left hand showing thumbs up points its thumb tip left in the
        // mirrored view; the fixed rule reads that as curled.
        let mut hand = curled_hand();
        hand[landmark::THUMB_IP] = Landmark::new(0.40, 0.60);
        hand[landmark::THUMB_TIP] = Landmark::new(0.32, 0.55);
        assert_eq!(classify(&hand), GestureKind::Fist);
    }

    #[test]
    fn finger_states_always_has_five_entries_in_order() {
        let hand = hand_with(&[Finger::Middle, Finger::Pinky]);
        let states = finger_states(&hand);
        assert_eq!(states.0.len(), 5);
        assert_eq!(
            states.0,
            [
                FingerState::Curled,
                FingerState::Curled,
                FingerState::Extended,
                FingerState::Curled,
                FingerState::Extended,
            ]
        );
    }

    #[test]
    fn no_fingers_is_fist() {
        assert_eq!(classify(&curled_hand()), GestureKind::Fist);
    }

    #[test]
    fn all_fingers_is_hi_five() {
        assert_eq!(classify(&hand_with(&Finger::ALL)), GestureKind::HiFive);
    }

    #[test]
    fn index_and_middle_is_peace() {
        let hand = hand_with(&[Finger::Index, Finger::Middle]);
        assert_eq!(classify(&hand), GestureKind::Peace);
    }

    #[test]
    fn other_pairs_are_counted() {
        let pairs = [
            [Finger::Thumb, Finger::Pinky],
            [Finger::Index, Finger::Ring],
            [Finger::Middle, Finger::Ring],
            [Finger::Thumb, Finger::Index],
        ];
        for pair in pairs {
            assert_eq!(
                classify(&hand_with(&pair)),
                GestureKind::OpenCount(2),
                "{pair:?}"
            );
        }
    }

    #[test]
    fn lone_thumb_is_thumbs_up() {
        assert_eq!(classify(&hand_with(&[Finger::Thumb])), GestureKind::ThumbsUp);
    }

    #[test]
    fn lone_other_finger_is_counted() {
        for finger in &Finger::ALL[1..] {
            assert_eq!(
                classify(&hand_with(&[*finger])),
                GestureKind::OpenCount(1),
                "{finger:?}"
            );
        }
    }

    fn ok_candidate(index_tip: Landmark) -> HandLandmarks {
        let mut hand = hand_with(&[Finger::Middle, Finger::Ring]);
        hand[landmark::THUMB_IP] = Landmark::new(0.45, 0.50);
        hand[landmark::THUMB_TIP] = Landmark::new(0.50, 0.50);
        // index curled: tip below its PIP
        hand[landmark::INDEX_PIP] = Landmark::new(0.52, 0.45);
        hand[landmark::INDEX_TIP] = index_tip;
        hand
    }

    #[test]
    fn touching_thumb_and_index_is_ok() {
        let hand = ok_candidate(Landmark::new(0.52, 0.50));
        let states = finger_states(&hand);
        assert!(states.is_extended(Finger::Thumb));
        assert!(!states.is_extended(Finger::Index));
        assert_eq!(states.extended_count(), 3);
        assert_eq!(classify(&hand), GestureKind::Ok);
    }

    #[test]
    fn ok_candidate_too_far_apart_falls_back_to_count() {
        let hand = ok_candidate(Landmark::new(0.60, 0.50));
        assert_eq!(classify(&hand), GestureKind::OpenCount(3));
        assert_eq!(classify(&hand).to_string(), "3 fingers open");
    }

    #[test]
    fn ok_distance_is_strict() {
        // at the threshold (within f32 rounding): not OK
        let hand = ok_candidate(Landmark::new(0.50, 0.55));
        let d = hand[landmark::THUMB_TIP].distance(&hand[landmark::INDEX_TIP]);
        approx::assert_abs_diff_eq!(d, 0.05, epsilon = 1e-6);
        assert!(d >= OK_TOUCH_DISTANCE);
        assert_eq!(classify(&hand), GestureKind::OpenCount(3));
    }

    #[test]
    fn index_extended_blocks_ok() {
        let mut hand = curled_hand();
        hand[landmark::THUMB_IP] = Landmark::new(0.55, 0.50);
        hand[landmark::THUMB_TIP] = Landmark::new(0.60, 0.50);
        hand[landmark::INDEX_PIP] = Landmark::new(0.30, 0.40);
        hand[landmark::INDEX_TIP] = Landmark::new(0.30, 0.20);
        hand[landmark::MIDDLE_PIP] = Landmark::new(0.40, 0.40);
        hand[landmark::MIDDLE_TIP] = Landmark::new(0.40, 0.20);

        let states = finger_states(&hand);
        assert_eq!(
            states.0,
            [
                FingerState::Extended,
                FingerState::Extended,
                FingerState::Extended,
                FingerState::Curled,
                FingerState::Curled,
            ]
        );
        let gesture = classify(&hand);
        assert_eq!(gesture, GestureKind::OpenCount(3));
        assert_eq!(gesture.to_string(), "3 fingers open");
    }

    #[test]
    fn four_fingers_are_counted() {
        let hand = hand_with(&[Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky]);
        assert_eq!(classify(&hand), GestureKind::OpenCount(4));
    }

    #[test]
    fn classify_is_idempotent() {
        let hand = ok_candidate(Landmark::new(0.52, 0.50));
        assert_eq!(classify(&hand), classify(&hand));
    }

    #[test]
    fn classify_hands_keeps_order() {
        let hands = vec![
            hand_with(&Finger::ALL),
            curled_hand(),
            hand_with(&[Finger::Thumb]),
        ];
        assert_eq!(
            classify_hands(&hands),
            vec![GestureKind::HiFive, GestureKind::Fist, GestureKind::ThumbsUp]
        );
        assert!(classify_hands(&[]).is_empty());
    }
}
