pub mod bluetooth;
pub mod frames;
pub mod logging;
