// Last-resort handler: a panicking request still gets the uniform 500 body

use std::any::Any;

use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use crate::types::AppError;

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error!(panic = %detail, "Request handler panicked");
    AppError::Internal(detail).into_response()
}

pub fn apply_catch_panic(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(handle_panic))
}
