//! HTTP surface of the triage service.
//!
//! `GET /health` plus one `POST /predict/*` route per pathway. Handlers
//! validate input, then run the pathway on the blocking pool and return
//! the unified `RiskAssessment` JSON.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::triage_router;
pub use server::{start_triage_server, TriageServer};
pub use types::{ApiContext, ModelState};
