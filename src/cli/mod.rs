pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod output;
pub mod presets;
pub mod replay;
pub mod runtime;
