//! CLI command modules

pub mod serve;

pub use serve::{execute_serve_command, init_tracing, ServeArgs};
