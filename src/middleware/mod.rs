mod device;
mod error_handler;

pub use device::{DEVICE_ID_HEADER, device_context};
pub use error_handler::log_errors;
