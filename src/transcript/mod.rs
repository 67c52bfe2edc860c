//! Rolling transcript state.

pub mod window;

pub use window::UtteranceAccumulator;
