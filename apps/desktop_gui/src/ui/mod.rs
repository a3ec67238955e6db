//! UI layer for the desktop GUI: app shell, page views and shared widgets.

pub mod app;
pub mod pages;
pub mod widgets;

pub use app::VmoneyApp;
