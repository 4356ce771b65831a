// ABOUTME: Library crate for socket-term exposing public API for testing and external use

pub mod app;
pub mod components;
pub mod config;
pub mod session;
pub mod terminal;
