//! Bluetooth Module
//!
//! Turns the local adapter into a discoverable HID peripheral.
//!
//! ## Modules
//!
//! - [`profile`] - service descriptor, SDP record, registration with bluetoothd
//! - [`transport`] - L2CAP listeners and channels for the two HID PSMs

pub mod profile;
pub mod transport;

pub use profile::{ProfileRegistrar, RegistrationHandle, ServiceDescriptor};
pub use transport::{Channel, ChannelRole, L2capListener};
