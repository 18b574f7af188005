//! End-to-end scenarios: landmark frames through the gesture interpreter
//! and report encoder, checking the wire bytes a host would receive.

use hovermouse::domain::gestures::{GestureConfig, GestureInterpreter};
use hovermouse::domain::models::{
    HandLandmarks, Handedness, LandmarkFrame, Point, INDEX_MCP, INDEX_PIP, INDEX_TIP,
    LANDMARKS_PER_HAND, MIDDLE_PIP, MIDDLE_TIP, THUMB_IP, THUMB_MCP, THUMB_TIP,
};
use hovermouse::hid::encoder::ReportEncoder;
use hovermouse::hid::mouse::MouseReport;
use hovermouse::hid::InputReport;

fn config() -> GestureConfig {
    GestureConfig {
        pointer_sensitivity: 1000.0,
        pinch_debounce_frames: 3,
        frame_hold_frames: 5,
        frame_cooldown_frames: 10,
        ..GestureConfig::default()
    }
}

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
fn linear_motion_yields_one_report_per_frame() {
    let mut interpreter = GestureInterpreter::new(config());
    let mut encoder = ReportEncoder::new();

    // Anchor frame, then ten frames each moving by (5, -3) counts.
    interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, 0.4, 0.6)]));

    let mut reports = Vec::new();
    for step in 1..=10 {
        let x = 0.4 + 0.005 * step as f64;
        let y = 0.6 - 0.003 * step as f64;
        let events = interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, x, y)]));
        reports.extend(encoder.encode(&events).unwrap());
    }

    assert_eq!(reports.len(), 10);
    for report in reports {
        assert_eq!(
            report,
            InputReport::Mouse(MouseReport {
                buttons: 0,
                x: 5,
                y: -3,
                wheel: 0,
            })
        );
        assert_eq!(report.to_bytes(), vec![0xA1, 0x01, 0x00, 0x05, 0xFD, 0x00]);
    }
}

#[test]
fn short_picture_frame_hold_produces_no_reports() {
    let mut interpreter = GestureInterpreter::new(config());
    let mut encoder = ReportEncoder::new();

    // Two qualifying frames with a five-frame minimum: nothing fires.
    for _ in 0..2 {
        let events = interpreter.push_frame(&frame(frame_pose_hands()));
        assert!(encoder.encode(&events).unwrap().is_empty());
    }
}

#[test]
fn sustained_picture_frame_emits_keyboard_chord_once() {
    let mut interpreter = GestureInterpreter::new(config());
    let mut encoder = ReportEncoder::new();

    let mut reports = Vec::new();
    for _ in 0..12 {
        let events = interpreter.push_frame(&frame(frame_pose_hands()));
        reports.extend(encoder.encode(&events).unwrap());
    }

    // Exactly one press/release pair: Meta+Shift+3 then all keys up.
    assert_eq!(reports.len(), 2);
    assert_eq!(
        reports[0].to_bytes(),
        vec![0xA1, 0x02, 0x0A, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(
        reports[1].to_bytes(),
        vec![0xA1, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
}

#[test]
fn pinch_click_sets_and_clears_button_bit() {
    let mut interpreter = GestureInterpreter::new(config());
    let mut encoder = ReportEncoder::new();

    let mut reports = Vec::new();
    for _ in 0..3 {
        let events = interpreter.push_frame(&frame(vec![pinched_hand(0.5, 0.5)]));
        reports.extend(encoder.encode(&events).unwrap());
    }
    for _ in 0..3 {
        let events = interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, 0.5, 0.5)]));
        reports.extend(encoder.encode(&events).unwrap());
    }

    let button_bytes: Vec<u8> = reports
        .iter()
        .filter_map(|r| match r {
            InputReport::Mouse(m) => Some(m.buttons),
            InputReport::Keyboard(_) => None,
        })
        .collect();
    assert_eq!(button_bytes, vec![0x01, 0x00]);
}

#[test]
fn session_reset_drops_pre_disconnect_state() {
    let mut interpreter = GestureInterpreter::new(config());
    let mut encoder = ReportEncoder::new();

    // Motion and a held pinch before the "disconnect". The reports these
    // produce stand in for writes that failed when the channel dropped.
    interpreter.push_frame(&frame(vec![pinched_hand(0.5, 0.5)]));
    for step in 1..=3 {
        let events =
            interpreter.push_frame(&frame(vec![pinched_hand(0.5 + 0.01 * step as f64, 0.5)]));
        let _ = encoder.encode(&events).unwrap();
    }
    assert_eq!(encoder.buttons(), 0x01);

    // What the supervisor does on re-entering Active.
    interpreter.reset();
    encoder.reset();

    // First post-reconnect frame only anchors; the next one moves.
    let events = interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, 0.7, 0.7)]));
    assert!(events.is_empty());
    let events = interpreter.push_frame(&frame(vec![hand_at(Handedness::Right, 0.702, 0.701)]));
    let reports = encoder.encode(&events).unwrap();

    assert_eq!(reports.len(), 1);
    let InputReport::Mouse(report) = reports[0] else {
        panic!("expected mouse report");
    };
    // Only post-reconnect deltas, and no leaked button bit.
    assert_eq!((report.x, report.y, report.buttons), (2, 1, 0));
}
