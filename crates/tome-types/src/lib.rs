pub mod api;
pub mod models;

pub use models::{ContentKind, ContentMode, InactiveReason, ParseError};
