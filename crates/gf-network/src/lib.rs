//! gf-network: topology layer for gridflow.
//!
//! Provides:
//! - Line and base-quantity data (`Line`, `BaseQuantities`)
//! - An immutable, validated `Network` with bus -> line adjacency
//! - An incremental builder that rejects malformed topologies
//!
//! # Example
//!
//! ```
//! use gf_network::NetworkBuilder;
//!
//! let mut builder = NetworkBuilder::new();
//! builder.add_line(0, 1, 0.05, 0.02, 0.0);
//! builder.add_line(1, 2, 0.05, 0.02, 0.0);
//! let network = builder.build().unwrap();
//!
//! assert_eq!(network.bus_count(), 3);
//! assert_eq!(network.lines().len(), 2);
//! ```

pub mod base;
pub mod builder;
pub mod error;
pub mod network;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use base::BaseQuantities;
pub use builder::NetworkBuilder;
pub use error::{NetworkError, NetworkResult};
pub use network::{Line, Network};
