//! Catalog module: the entities a run produces and who owns them
//!
//! - `Category` / `Product`: the persisted records
//! - `CategoryTree`: id-keyed tree built by discovery, with an explicit merge
//! - `Accumulator`: run-scoped admission tables and admission-ordered storage

mod accumulator;
mod model;
mod tree;

pub use accumulator::{Accumulator, FlushReport, Snapshot};
pub use model::{Category, Product};
pub use tree::{CategoryTree, FieldConflict, Leaf, MergeOutcome};
