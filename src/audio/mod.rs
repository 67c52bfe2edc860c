//! Audio capture and encoding.

pub mod capture;
pub mod recorder;
pub mod wav;
