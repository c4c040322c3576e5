// Utility functions

pub mod logger;
pub mod path;

pub use logger::*;
pub use path::*;
