//! gf-core: shared foundation for gridflow.
//!
//! Contains:
//! - units (uom SI types + constructors for electrical quantities)
//! - numeric (Real + finiteness guards + inf_norm)
//! - ids (compact bus/line IDs)
//! - timing (solve timers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{GfError, GfResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
