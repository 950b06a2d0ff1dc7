//! HTTP middleware: CORS configuration applied ahead of the handlers.

pub mod cors;

pub use cors::cors_layer;
