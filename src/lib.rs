pub mod api;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod locate;
pub mod manifest;
pub mod patch;
