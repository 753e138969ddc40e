pub mod audio;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod life;
pub mod ui;
