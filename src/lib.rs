pub mod api;
pub mod app;
pub mod chat;
pub mod config;
pub mod event;
pub mod reveal;
pub mod session;
pub mod ui;
