//! # Progdata - Program-Management Data Backend
//!
//! REST backend for program-management data: programs, WBS structures,
//! part catalogs, inventory positions, and spreadsheet ingestion.
//!
//! ## Features
//!
//! - **Generic dispatch**: one CRUD surface over a registry of resources
//! - **Projections**: clients select a registered output shape per request
//!   via the `projection` query parameter; unknown keys are rejected
//! - **Filters**: per-resource filter functions applied all-or-nothing
//! - **Ordering**: comma-separated `ordering` parameter, `-` for descending
//! - **Ingestion**: CSV uploads reconciled against persisted data by set
//!   diff, atomically
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Progdata API Server                 │
//! ├─────────────────────────────────────────────────────┤
//! │  ┌───────────────────┐  ┌────────────────────────┐  │
//! │  │  Generic CRUD     │  │  Upload endpoints      │  │
//! │  │  /api/v1/{res}    │  │  /api/v1/*_uploads     │  │
//! │  └─────────┬─────────┘  └───────────┬────────────┘  │
//! │            │                        │               │
//! │  ┌─────────▼────────────────────────▼────────────┐  │
//! │  │   Dispatch: shape resolution + filter layer   │  │
//! │  └─────────┬────────────────────────┬────────────┘  │
//! │            │                        │               │
//! │  ┌─────────▼─────────┐  ┌───────────▼────────────┐  │
//! │  │  Resource registry│  │  Ingestion (diff/apply)│  │
//! │  └─────────┬─────────┘  └───────────┬────────────┘  │
//! │            │                        │               │
//! │  ┌─────────▼────────────────────────▼────────────┐  │
//! │  │        Datastore (transactional tables)       │  │
//! │  └───────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use progdata::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Start server on localhost:8080
//!     let config = ServerConfig::default();
//!     let server = Server::new(config)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## REST API Examples
//!
//! ### List programs with the detail projection
//!
//! ```bash
//! curl "http://localhost:8080/api/v1/programs?projection=detail&name=Apollo"
//! ```
//!
//! ### Ingest an alt/sub report
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/alt_sub_uploads \
//!   -H "x-progdata-user: jsmith" \
//!   -F "sector=1" \
//!   -F "data_file=@report.csv"
//! ```

pub mod dispatch;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod query;
pub mod resource;
pub mod resources;
pub mod rest;
pub mod serialize;
pub mod server;
pub mod shape;
pub mod state;
pub mod store;

pub use error::{Error, Result};
pub use server::{Server, ServerConfig};
pub use state::AppState;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::dispatch::{Method, Principal, RequestContext};
    pub use crate::error::{Error, Result};
    pub use crate::filter::FilterOutcome;
    pub use crate::query::{OrderKey, Query, Relation};
    pub use crate::resource::{Registry, ResourceDefinition};
    pub use crate::server::{Server, ServerConfig};
    pub use crate::shape::ShapeContract;
    pub use crate::state::AppState;
}
