pub mod anki;
pub mod core;
pub mod immersion;
pub mod persistence;
pub mod render;
pub mod review;
pub mod session;
pub mod settings;

pub use crate::core::CompanionError;
pub use settings::Settings;
