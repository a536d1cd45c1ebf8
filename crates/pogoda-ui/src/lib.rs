//! Weather screen logic: UI state, formatting, and the view model that
//! drives location resolution and weather loading.

pub mod app_services;
pub mod error_mapping;
pub mod format;
pub mod render;
pub mod state;
pub mod view_model;

pub use app_services::{AppServices, LaunchOptions};
pub use render::render;
pub use state::{StateCell, WeatherContent, WeatherUi};
pub use view_model::{WeatherViewModel, FALLBACK_LABEL};
