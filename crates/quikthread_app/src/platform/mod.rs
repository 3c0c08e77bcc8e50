mod app;
mod config;
mod notifier;
mod render;

pub use app::run;
