use serde::{Deserialize, Serialize};

/// Number of landmarks the hand-tracking model reports per hand.
pub const LANDMARKS_PER_HAND: usize = 21;

// Landmark indices (hand-tracking model layout)
pub const WRIST: usize = 0;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;

// Mouse button ids (bit position in the report bitmask)
pub const BUTTON_LEFT: u8 = 0;
pub const BUTTON_RIGHT: u8 = 1;
pub const BUTTON_MIDDLE: u8 = 2;

/// A single landmark in normalized camera coordinates.
///
/// `x` and `y` are in `[0, 1]` relative to the frame; `z` is the model's
/// relative depth estimate and may be zero when the pipeline only emits 2-D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn dist3(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// One tracked hand: handedness label plus the ordered landmark set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandLandmarks {
    pub handedness: Handedness,
    pub points: Vec<Point>,
}

impl HandLandmarks {
    /// A hand with the wrong landmark count or non-finite coordinates is
    /// treated as absent, never as an error.
    pub fn is_well_formed(&self) -> bool {
        self.points.len() == LANDMARKS_PER_HAND && self.points.iter().all(Point::is_finite)
    }

    pub fn point(&self, index: usize) -> Point {
        self.points[index]
    }
}

/// One frame from the external vision pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Capture timestamp (Unix milliseconds), assigned by the pipeline.
    pub timestamp_ms: u64,
    /// Zero, one, or two hands.
    #[serde(default)]
    pub hands: Vec<HandLandmarks>,
}

impl LandmarkFrame {
    pub fn empty(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            hands: Vec::new(),
        }
    }

    pub fn well_formed_hands(&self) -> impl Iterator<Item = &HandLandmarks> {
        self.hands.iter().filter(|h| h.is_well_formed())
    }
}

/// Non-pointer action fired by a dedicated gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Screenshot,
}

/// Semantic input event produced by the gesture interpreter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Relative pointer motion in report counts.
    PointerDelta { dx: i32, dy: i32 },
    /// Logical button state transition (`button` is a bit position, 0..=2).
    Button { button: u8, pressed: bool },
    /// Wheel motion in report counts (positive scrolls up).
    Scroll { delta: i32 },
    ActionTrigger { action: ActionKind },
}
