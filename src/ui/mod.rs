pub mod commands;
pub mod render;

pub use commands::{parse, ParseError, UserCommand, HELP};
pub use render::{render, status_line};
