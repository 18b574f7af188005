//! HID report types and the gesture-event → report translation layer.

pub mod descriptor;
pub mod encoder;
pub mod keyboard;
pub mod mouse;


use descriptor::{HEADER_DATA_INPUT, REPORT_ID_KEYBOARD, REPORT_ID_MOUSE};
use keyboard::KeyboardReport;
use mouse::MouseReport;

/// One input report ready for the interrupt channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputReport {
    Mouse(MouseReport),
    Keyboard(KeyboardReport),
}

impl InputReport {
    pub fn report_id(&self) -> u8 {
        match self {
            InputReport::Mouse(_) => REPORT_ID_MOUSE,
            InputReport::Keyboard(_) => REPORT_ID_KEYBOARD,
        }
    }

    /// Full wire image: DATA|INPUT header, report id, payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![HEADER_DATA_INPUT, self.report_id()];
        match self {
            InputReport::Mouse(report) => {
                let mut payload = [0u8; mouse::MOUSE_REPORT_SIZE];
                report.serialize(&mut payload);
                bytes.extend_from_slice(&payload);
            }
            InputReport::Keyboard(report) => {
                let mut payload = [0u8; keyboard::KEYBOARD_REPORT_SIZE];
                report.serialize(&mut payload);
                bytes.extend_from_slice(&payload);
            }
        }
        bytes
    }
}
