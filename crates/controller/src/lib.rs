pub mod app_state;
pub mod config;
pub mod controller;
pub mod driver;
pub mod state;

pub use app_state::*;
pub use config::*;
pub use controller::*;
pub use state::*;
