//! # velo-ingest
//!
//! The data ingestion pipeline: converts two columnar source datasets —
//! road-link geometries and time-stamped speed measurements — into validated,
//! referentially-consistent rows in the [`velo_store::Store`].
//!
//! Control flow, per run:
//! 1. Open both sources (missing file aborts before anything is touched)
//! 2. Destructive clear of the destination tables (fatal on failure)
//! 3. Link phase: chunk → normalize geometry → transform → batched write
//! 4. Referential index: one query loading all persisted link ids
//! 5. Speed phase: chunk → transform against the index → batched write
//! 6. Optional verification (diagnostic, never corrective)
//!
//! The pipeline is strictly single-threaded; one store session is used
//! serially for the whole run.

pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod source;
pub mod transform;
pub mod verify;

pub use error::IngestError;
pub use pipeline::{PipelineConfig, RunReport, run};
pub use source::{LinkSource, RawLinkRow, RawSpeedRow, SpeedSource};
pub use verify::{Finding, Verification};
