//! API middleware.
//!
//! Only request logging runs on every route; CORS and the body limit are
//! `tower-http`/axum layers applied in the router.

pub mod audit;
