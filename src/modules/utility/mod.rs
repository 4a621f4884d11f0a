pub mod commands;

pub use commands::{moveall, say};
