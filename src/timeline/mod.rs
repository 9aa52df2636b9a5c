pub mod phase;
pub mod presets;
pub mod resume;
pub mod scheduler;

pub use phase::{Phase, PhaseKind, Timeline, TimelineBuilder};
pub use resume::{PauseSnapshot, ResumeStrategy};
pub use scheduler::{PhasePosition, PhaseScheduler};
