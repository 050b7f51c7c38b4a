//! Audio subsystem module

pub mod capture;
pub mod device;
pub mod file;
pub mod recorder;
pub mod sample;
pub mod source;

pub use capture::{CaptureDevice, CpalCapture, LiveSource};
pub use device::{list_input_devices, open_input_device, InputDevice};
pub use file::WavFileSource;
pub use recorder::RecordingSource;
pub use source::ChunkSource;
