//! Small helpers shared by the transports.

pub mod log_sanitizer;
