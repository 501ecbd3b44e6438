//! System orchestration, startup, and shutdown logic.

pub mod progress;
pub mod shop_system;
pub mod status_saver;
pub mod telemetry;

pub use progress::*;
pub use shop_system::*;
pub use status_saver::*;
pub use telemetry::*;
