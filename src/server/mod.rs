//! HTTP REST API over the match cache.
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Protected Endpoints (API Key Required)
//!
//! - `GET /api/v1/matches/{subject_id}?limit=&refresh=` - Ranked mentors
//! - `DELETE /api/v1/matches/{subject_id}` - Invalidate one subject
//! - `DELETE /api/v1/matches` - Clear the fast tier
//! - `POST /api/v1/matches/{subject_id}/warm` - Reload from the durable tier
//! - `GET /api/v1/cache/stats` - Cache counters
//! - `PUT /api/v1/subjects/{subject_id}` - Upsert a student, invalidating its entry
//! - `PUT /api/v1/candidates/{candidate_id}` - Upsert a mentor
//! - `GET /api/v1/metadata` - Server metadata
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mentormatch::server::{self, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use app::{build_router, start_server};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use state::AppState;
