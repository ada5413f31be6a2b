pub mod app;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod handler;
pub mod transcript;
pub mod tui;
pub mod ui;
