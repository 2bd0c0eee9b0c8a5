pub mod app;
pub mod settings;
pub mod telemetry;

pub use app::run as run_app;
