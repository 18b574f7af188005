use crate::domain::models::{
    ActionKind, GestureEvent, HandLandmarks, Handedness, LandmarkFrame, Point, BUTTON_LEFT,
    INDEX_MCP, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, THUMB_IP, THUMB_MCP, THUMB_TIP,
};
use std::collections::VecDeque;
use tracing::debug;

/// Tuning parameters for gesture recognition.
///
/// All debounce values are consecutive-frame counts, so recognition is
/// deterministic for a given frame sequence regardless of capture timing.
#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Scale from normalized camera units to pointer counts.
    pub pointer_sensitivity: f64,
    /// Thumb-index distance below which a pinch is considered closed.
    pub pinch_press_threshold: f64,
    /// Distance above which a held pinch is considered released (hysteresis).
    pub pinch_release_threshold: f64,
    /// Consecutive frames a pinch state must hold before an edge fires.
    pub pinch_debounce_frames: usize,
    /// Consecutive frames the two-hand pose must hold before triggering.
    pub frame_hold_frames: usize,
    /// Frames after a trigger during which the action cannot refire.
    pub frame_cooldown_frames: usize,
    /// How far a fingertip must sit above its PIP joint to count as raised.
    pub scroll_raise_threshold: f64,
    /// Scale from normalized vertical motion to wheel counts.
    pub scroll_sensitivity: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pointer_sensitivity: 1200.0,
            pinch_press_threshold: 0.045,
            pinch_release_threshold: 0.060,
            pinch_debounce_frames: 3,
            frame_hold_frames: 30,
            frame_cooldown_frames: 60,
            scroll_raise_threshold: 0.015,
            scroll_sensitivity: 100.0,
        }
    }
}

/// Per-frame summary retained in the observation window.
#[derive(Debug, Clone, Copy)]
struct Observation {
    /// Thumb-index pinch distance, when exactly one hand was tracked.
    pinch_distance: Option<f64>,
    /// Both hands held the picture-frame pose.
    frame_pose: bool,
}

/// Turns landmark frames into semantic input events.
///
/// Holds a bounded window of recent per-frame observations; every debounce
/// decision reads that window, so the detectors can be exercised frame by
/// frame in tests. Pointer and scroll tracking keep only a one-frame anchor
/// plus a fractional carry.
pub struct GestureInterpreter {
    config: GestureConfig,
    window: VecDeque<Observation>,
    capacity: usize,

    pointer_anchor: Option<Point>,
    pointer_residual: (f64, f64),
    scroll_anchor: Option<f64>,
    scroll_residual: f64,

    button_held: bool,
    cooldown: usize,
}

impl GestureInterpreter {
    pub fn new(config: GestureConfig) -> Self {
        let capacity = config
            .frame_hold_frames
            .max(config.pinch_debounce_frames)
            .max(1);
        Self {
            config,
            window: VecDeque::with_capacity(capacity),
            capacity,
            pointer_anchor: None,
            pointer_residual: (0.0, 0.0),
            scroll_anchor: None,
            scroll_residual: 0.0,
            button_held: false,
            cooldown: 0,
        }
    }

    /// Drop all gesture state. Called on session (re)entry so nothing from a
    /// previous connection leaks into the first post-reconnect report.
    pub fn reset(&mut self) {
        self.window.clear();
        self.pointer_anchor = None;
        self.pointer_residual = (0.0, 0.0);
        self.scroll_anchor = None;
        self.scroll_residual = 0.0;
        self.button_held = false;
        self.cooldown = 0;
    }

    /// Consume one frame, emitting zero or more events.
    pub fn push_frame(&mut self, frame: &LandmarkFrame) -> Vec<GestureEvent> {
        let hands: Vec<&HandLandmarks> = frame.well_formed_hands().collect();
        let mut events = Vec::new();

        let observation = match hands.as_slice() {
            [hand] => self.observe_single_hand(hand, &mut events),
            [first, second] => self.observe_two_hands(first, second),
            _ => self.observe_no_hand(),
        };
        self.push_observation(observation);

        self.update_pinch(&mut events);
        self.update_frame_gesture(&mut events);
        events
    }

    fn observe_single_hand(
        &mut self,
        hand: &HandLandmarks,
        events: &mut Vec<GestureEvent>,
    ) -> Observation {
        if self.fingers_raised(hand) {
            // Scroll mode: the cursor holds position while the two raised
            // fingers drive the wheel.
            self.pointer_anchor = None;
            self.pointer_residual = (0.0, 0.0);
            if let Some(delta) = self.track_scroll(hand) {
                events.push(GestureEvent::Scroll { delta });
            }
        } else {
            self.scroll_anchor = None;
            self.scroll_residual = 0.0;
            if let Some((dx, dy)) = self.track_pointer(hand) {
                events.push(GestureEvent::PointerDelta { dx, dy });
            }
        }

        let distance = hand.point(THUMB_TIP).dist3(&hand.point(INDEX_TIP));
        Observation {
            pinch_distance: Some(distance),
            frame_pose: false,
        }
    }

    fn observe_two_hands(&mut self, first: &HandLandmarks, second: &HandLandmarks) -> Observation {
        // Two hands never move the cursor; clearing the anchors means the
        // next single-hand frame re-anchors instead of jumping.
        self.clear_motion_anchors();

        let left = [first, second]
            .into_iter()
            .find(|h| h.handedness == Handedness::Left);
        let right = [first, second]
            .into_iter()
            .find(|h| h.handedness == Handedness::Right);
        let frame_pose = match (left, right) {
            (Some(l), Some(r)) => is_left_frame_pose(l) && is_right_frame_pose(r),
            _ => false,
        };
        Observation {
            pinch_distance: None,
            frame_pose,
        }
    }

    fn observe_no_hand(&mut self) -> Observation {
        self.clear_motion_anchors();
        Observation {
            pinch_distance: None,
            frame_pose: false,
        }
    }

    fn clear_motion_anchors(&mut self) {
        self.pointer_anchor = None;
        self.pointer_residual = (0.0, 0.0);
        self.scroll_anchor = None;
        self.scroll_residual = 0.0;
    }

    fn push_observation(&mut self, observation: Observation) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(observation);
    }

    /// True when the newest `count` observations all satisfy the predicate.
    fn last_n_all(&self, count: usize, predicate: impl Fn(&Observation) -> bool) -> bool {
        self.window.len() >= count && self.window.iter().rev().take(count).all(|o| predicate(o))
    }

    fn track_pointer(&mut self, hand: &HandLandmarks) -> Option<(i32, i32)> {
        let tip = hand.point(INDEX_TIP);
        let anchor = match self.pointer_anchor.replace(tip) {
            Some(anchor) => anchor,
            None => return None,
        };

        let raw_x = (tip.x - anchor.x) * self.config.pointer_sensitivity + self.pointer_residual.0;
        let raw_y = (tip.y - anchor.y) * self.config.pointer_sensitivity + self.pointer_residual.1;
        let dx = raw_x.round() as i32;
        let dy = raw_y.round() as i32;
        self.pointer_residual = (raw_x - dx as f64, raw_y - dy as f64);

        if dx != 0 || dy != 0 {
            Some((dx, dy))
        } else {
            None
        }
    }

    fn fingers_raised(&self, hand: &HandLandmarks) -> bool {
        let raised = |tip: usize, pip: usize| {
            (hand.point(pip).y - hand.point(tip).y) > self.config.scroll_raise_threshold
        };
        raised(INDEX_TIP, INDEX_PIP) && raised(MIDDLE_TIP, MIDDLE_PIP)
    }

    fn track_scroll(&mut self, hand: &HandLandmarks) -> Option<i32> {
        let mean_y = (hand.point(INDEX_TIP).y + hand.point(MIDDLE_TIP).y) / 2.0;
        let anchor = match self.scroll_anchor.replace(mean_y) {
            Some(anchor) => anchor,
            None => return None,
        };

        // Fingers moving up (y shrinking) scroll up (positive wheel).
        let raw = (anchor - mean_y) * self.config.scroll_sensitivity + self.scroll_residual;
        let delta = raw.round() as i32;
        self.scroll_residual = raw - delta as f64;

        if delta != 0 {
            Some(delta)
        } else {
            None
        }
    }

    fn update_pinch(&mut self, events: &mut Vec<GestureEvent>) {
        let frames = self.config.pinch_debounce_frames;
        if !self.button_held {
            let press = self.config.pinch_press_threshold;
            if self.last_n_all(frames, |o| matches!(o.pinch_distance, Some(d) if d < press)) {
                self.button_held = true;
                debug!("pinch press");
                events.push(GestureEvent::Button {
                    button: BUTTON_LEFT,
                    pressed: true,
                });
            }
        } else {
            // A vanished hand counts toward release so a lost track never
            // leaves the button stuck down.
            let release = self.config.pinch_release_threshold;
            if self.last_n_all(frames, |o| o.pinch_distance.map_or(true, |d| d > release)) {
                self.button_held = false;
                debug!("pinch release");
                events.push(GestureEvent::Button {
                    button: BUTTON_LEFT,
                    pressed: false,
                });
            }
        }
    }

    fn update_frame_gesture(&mut self, events: &mut Vec<GestureEvent>) {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return;
        }
        if self.last_n_all(self.config.frame_hold_frames, |o| o.frame_pose) {
            debug!("picture-frame gesture triggered");
            events.push(GestureEvent::ActionTrigger {
                action: ActionKind::Screenshot,
            });
            self.cooldown = self.config.frame_cooldown_frames;
        }
    }
}

/// Left hand: thumb pointing up, index pointing right.
fn is_left_frame_pose(hand: &HandLandmarks) -> bool {
    let thumb_up = hand.point(THUMB_TIP).y < hand.point(THUMB_IP).y
        && hand.point(THUMB_IP).y < hand.point(THUMB_MCP).y;
    let index_right = hand.point(INDEX_TIP).x > hand.point(INDEX_PIP).x
        && hand.point(INDEX_PIP).x > hand.point(INDEX_MCP).x;
    thumb_up && index_right
}

/// Right hand: thumb pointing down, index pointing left.
fn is_right_frame_pose(hand: &HandLandmarks) -> bool {
    let thumb_down = hand.point(THUMB_TIP).y > hand.point(THUMB_IP).y
        && hand.point(THUMB_IP).y > hand.point(THUMB_MCP).y;
    let index_left = hand.point(INDEX_TIP).x < hand.point(INDEX_PIP).x
        && hand.point(INDEX_PIP).x < hand.point(INDEX_MCP).x;
    thumb_down && index_left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::LANDMARKS_PER_HAND;

    fn test_config() -> GestureConfig {
        GestureConfig {
            pointer_sensitivity: 1000.0,
            pinch_debounce_frames: 3,
            frame_hold_frames: 5,
            frame_cooldown_frames: 10,
            ..GestureConfig::default()
        }
    }

    /// A neutral hand at `(x, y)`: index tip at the given spot, thumb far
    /// away (no pinch), fingers curled (no scroll).
    fn hand_at(handedness: Handedness, x: f64, y: f64) -> HandLandmarks {
        let mut points = vec![Point::new(0.5, 0.8); LANDMARKS_PER_HAND];
        points[INDEX_TIP] = Point::new(x, y);
        points[INDEX_PIP] = Point::new(x, y + 0.05);
        points[MIDDLE_TIP] = Point::new(x + 0.02, y + 0.06);
        points[MIDDLE_PIP] = Point::new(x + 0.02, y + 0.05);
        points[THUMB_TIP] = Point::new(x - 0.2, y + 0.2);
        HandLandmarks { handedness, points }
    }

    fn pinched_hand(x: f64, y: f64) -> HandLandmarks {
        let mut hand = hand_at(Handedness::Right, x, y);
        hand.points[THUMB_TIP] = Point::new(x + 0.01, y);
        hand
    }

    fn scroll_hand(y: f64) -> HandLandmarks {
        let mut hand = hand_at(Handedness::Right, 0.5, y);
        hand.points[INDEX_TIP] = Point::new(0.5, y);
        hand.points[INDEX_PIP] = Point::new(0.5, y + 0.05);
        hand.points[MIDDLE_TIP] = Point::new(0.55, y);
        hand.points[MIDDLE_PIP] = Point::new(0.55, y + 0.05);
        hand
    }

    fn frame_pose_hands() -> Vec<HandLandmarks> {
        let mut left = hand_at(Handedness::Left, 0.3, 0.6);
        left.points[THUMB_TIP] = Point::new(0.25, 0.40);
        left.points[THUMB_IP] = Point::new(0.25, 0.45);
        left.points[THUMB_MCP] = Point::new(0.25, 0.50);
        left.points[INDEX_TIP] = Point::new(0.45, 0.55);
        left.points[INDEX_PIP] = Point::new(0.40, 0.55);
        left.points[INDEX_MCP] = Point::new(0.35, 0.55);

        let mut right = hand_at(Handedness::Right, 0.7, 0.4);
        right.points[THUMB_TIP] = Point::new(0.75, 0.60);
        right.points[THUMB_IP] = Point::new(0.75, 0.55);
        right.points[THUMB_MCP] = Point::new(0.75, 0.50);
        right.points[INDEX_TIP] = Point::new(0.55, 0.45);
        right.points[INDEX_PIP] = Point::new(0.60, 0.45);
        right.points[INDEX_MCP] = Point::new(0.65, 0.45);

        vec![left, right]
    }

    fn frame(hands: Vec<HandLandmarks>) -> LandmarkFrame {
        LandmarkFrame {
            timestamp_ms: 0,
            hands,
        }
    }

    #[test]
    fn pointer_emits_frame_to_frame_deltas() {
        let mut interpreter = GestureInterpreter::new(test_config());

        // First frame anchors silently.
        let events = interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, 0.5, 0.5)]));
        assert!(events.is_empty());

        for step in 1..=10 {
            let x = 0.5 + 0.005 * step as f64;
            let y = 0.5 - 0.003 * step as f64;
            let events = interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, x, y)]));
            assert_eq!(events, vec![GestureEvent::PointerDelta { dx: 5, dy: -3 }]);
        }
    }

    #[test]
    fn no_hand_emits_nothing_and_reanchors() {
        let mut interpreter = GestureInterpreter::new(test_config());
        interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, 0.5, 0.5)]));

        assert!(interpreter.push_frame(&frame(vec![])).is_empty());

        // Hand reappears far away: no jump, just a fresh anchor.
        let events = interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, 0.9, 0.9)]));
        assert!(events.is_empty());
    }

    #[test]
    fn malformed_hand_is_treated_as_absent() {
        let mut interpreter = GestureInterpreter::new(test_config());
        interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, 0.5, 0.5)]));

        let malformed = HandLandmarks {
            handedness: Handedness::Right,
            points: vec![Point::new(0.5, 0.5); 7],
        };
        assert!(interpreter.push_frame(&frame(vec![malformed])).is_empty());

        let mut nan_hand = hand_at(Handedness::Right, 0.5, 0.5);
        nan_hand.points[INDEX_TIP] = Point::new(f64::NAN, 0.5);
        assert!(interpreter.push_frame(&frame(vec![nan_hand])).is_empty());
    }

    #[test]
    fn pinch_fires_single_edge_after_debounce() {
        let mut interpreter = GestureInterpreter::new(test_config());

        // Two pinched frames: below the debounce count, nothing fires.
        for _ in 0..2 {
            let events = interpreter.push_frame(&frame(vec![pinched_hand(0.5, 0.5)]));
            assert!(!events
                .iter()
                .any(|e| matches!(e, GestureEvent::Button { .. })));
        }

        // Third frame crosses the debounce count: exactly one press.
        let events = interpreter.push_frame(&frame(vec![pinched_hand(0.5, 0.5)]));
        assert!(events.contains(&GestureEvent::Button {
            button: BUTTON_LEFT,
            pressed: true,
        }));

        // Holding the pinch never repeats the press.
        for _ in 0..20 {
            let events = interpreter.push_frame(&frame(vec![pinched_hand(0.5, 0.5)]));
            assert!(!events
                .iter()
                .any(|e| matches!(e, GestureEvent::Button { .. })));
        }

        // Opening the hand releases once, after the same debounce.
        let mut releases = Vec::new();
        for _ in 0..5 {
            releases.extend(interpreter.push_frame(&frame(vec![hand_at(
                Handedness::Right,
                0.5,
                0.5,
            )])));
        }
        let edges: Vec<_> = releases
            .iter()
            .filter(|e| matches!(e, GestureEvent::Button { .. }))
            .collect();
        assert_eq!(
            edges,
            vec![&GestureEvent::Button {
                button: BUTTON_LEFT,
                pressed: false,
            }]
        );
    }

    #[test]
    fn pinch_releases_when_hand_vanishes() {
        let mut interpreter = GestureInterpreter::new(test_config());
        for _ in 0..3 {
            interpreter.push_frame(&frame(vec![pinched_hand(0.5, 0.5)]));
        }

        let mut events = Vec::new();
        for _ in 0..3 {
            events.extend(interpreter.push_frame(&frame(vec![])));
        }
        assert!(events.contains(&GestureEvent::Button {
            button: BUTTON_LEFT,
            pressed: false,
        }));
    }

    #[test]
    fn frame_gesture_below_hold_count_fires_nothing() {
        let mut interpreter = GestureInterpreter::new(test_config());
        for _ in 0..2 {
            let events = interpreter.push_frame(&frame(frame_pose_hands()));
            assert!(events.is_empty());
        }
    }

    #[test]
    fn frame_gesture_fires_once_per_cooldown_window() {
        let mut interpreter = GestureInterpreter::new(test_config());

        let mut triggers = 0;
        for _ in 0..15 {
            triggers += interpreter
                .push_frame(&frame(frame_pose_hands()))
                .iter()
                .filter(|e| matches!(e, GestureEvent::ActionTrigger { .. }))
                .count();
        }
        // 5-frame hold then a 10-frame cooldown: a continuous 15-frame hold
        // can only have fired the first trigger.
        assert_eq!(triggers, 1);
    }

    #[test]
    fn two_hands_do_not_move_pointer() {
        let mut interpreter = GestureInterpreter::new(test_config());
        interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, 0.5, 0.5)]));

        let events = interpreter.push_frame(&frame(frame_pose_hands()));
        assert!(!events
            .iter()
            .any(|e| matches!(e, GestureEvent::PointerDelta { .. })));
    }

    #[test]
    fn scroll_tracks_vertical_finger_motion() {
        let mut interpreter = GestureInterpreter::new(test_config());

        // Anchor frame.
        assert!(interpreter
            .push_frame(&frame(vec![scroll_hand(0.50)]))
            .is_empty());

        // Fingers move up by 0.02 normalized units: wheel up 2 counts.
        let events = interpreter.push_frame(&frame(vec![scroll_hand(0.48)]));
        assert_eq!(events, vec![GestureEvent::Scroll { delta: 2 }]);

        // Sub-count motion accumulates via the residual carry.
        let events = interpreter.push_frame(&frame(vec![scroll_hand(0.476)]));
        assert!(events.is_empty());
        let events = interpreter.push_frame(&frame(vec![scroll_hand(0.470)]));
        assert_eq!(events, vec![GestureEvent::Scroll { delta: 1 }]);
    }

    #[test]
    fn reset_clears_held_button_and_anchor() {
        let mut interpreter = GestureInterpreter::new(test_config());
        for _ in 0..3 {
            interpreter.push_frame(&frame(vec![pinched_hand(0.5, 0.5)]));
        }

        interpreter.reset();

        // After reset the old anchor is gone and the pinch must re-debounce.
        let events = interpreter.push_frame(&frame(vec![pinched_hand(0.9, 0.9)]));
        assert!(events.is_empty());
    }
}
