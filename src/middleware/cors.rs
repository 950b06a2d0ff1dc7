//! Cross-origin request policy.
//!
//! Game clients are served from a different origin than this API, so
//! every route goes through the CORS layer built here before a browser
//! will let the responses through.

use tower_http::cors::{Any, CorsLayer};

/// Builds the CORS layer applied to the whole router.
///
/// Wide open on purpose: any origin, method, and header may call the
/// API, which is what local development and the trusted-gateway
/// deployment want. A directly exposed deployment should pin the
/// origin instead:
///
/// ```rust,ignore
/// let origin = "https://play.wordpool.example".parse::<HeaderValue>().unwrap();
/// CorsLayer::new().allow_origin(origin)
/// ```
///
/// # Returns
/// A `CorsLayer` ready to hand to `Router::layer`.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
