pub mod controller;
pub mod exercise;
pub mod state;
pub mod tick;
pub mod view;

pub use controller::{SessionController, SessionControllerBuilder};
pub use exercise::{Exercise, SessionPlan};
pub use state::{SessionMode, SessionState, SessionStatus};
pub use tick::{LocalTicker, NarrationTicker, Tick, TickSource};
pub use view::{ScriptHistory, SessionView};
