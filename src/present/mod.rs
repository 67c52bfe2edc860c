//! Answer presentation: lifecycle state machine and display surfaces.

pub mod state;
pub mod surface;

pub use state::{PresentationState, Presenter};
pub use surface::{DisplaySurface, RecordingSurface, SurfaceEvent, SurfaceEvents, TerminalSurface};
