//! Typed application messages and the macros that print or log them.

pub mod display;
pub mod macros;
pub mod types;

pub use types::Message;
