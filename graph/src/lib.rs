//! Tessera Graph
//!
//! A mutable property graph API over an append-only, versioned fact store.
//!
//! Responsibilities:
//! - Vertex and edge handles with stable external identity
//! - Explicit per-transaction contexts (stage, commit, roll back)
//! - Read-your-writes through a speculative live view
//! - Navigation across element versions
//! - Fact-level differences between points in time

mod config;
mod context;
mod diff;
mod element;
mod error;
mod graph;
mod temporal;

pub use config::GraphConfig;
pub use context::{MutationTarget, TxContext};
pub use diff::{diff, diff_elements, facts, DerivedGraph, WorkingSet};
pub use element::{Element, Kind};
pub use error::{GraphError, GraphResult};
pub use graph::Graph;
pub use temporal::{
    next_version, previous_version, time_id, version_interval, version_sequence, TimeDirection,
    TxFilter, TxStamp, VersionInterval, VersionSequence,
};
