pub mod errors;
pub mod http;
pub mod models;
pub mod tasks;
pub mod utils;

pub use errors::CompanionError;
pub use models::{
    CurrentItem,
    Sentence,
    SessionMode,
    VocabAudio,
};
