//! Bluetooth HID mouse+keyboard peripheral driven by hand gestures.
//!
//! An external vision pipeline streams hand-landmark frames into this
//! process; the gesture interpreter turns them into semantic input events,
//! the encoder packs those into boot-protocol HID reports, and the
//! supervisor ships them to the connected host over the L2CAP interrupt
//! channel.

pub mod domain;
pub mod hid;
pub mod infrastructure;
pub mod supervisor;
