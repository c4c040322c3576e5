// Middleware for CORS, request logging and panic recovery

pub mod cors;
pub mod logging;
pub mod panic;

pub use cors::*;
pub use logging::*;
pub use panic::*;
