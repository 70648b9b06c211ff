//! Batching, grouping and result assembly.
//!
//! A batch is split into [`QueryGroup`]s of pairs sharing a query, each group is
//! scored with one backend call, and the raw [`ScoreResult`]s are put back in
//! submission order (or sorted, in query-rerank mode) by the assembler. Sigmoid
//! normalization happens only there.

pub mod assemble;
pub mod grouping;
pub mod normalize;
pub mod service;
pub mod types;


pub use assemble::{assemble_pairs, assemble_ranked};
pub use grouping::{group_by_query, passages_at};
pub use normalize::{Normalization, sigmoid};
pub use service::RerankService;
pub use types::{
    BatchRequest, BatchScores, QueryGroup, QueryRequest, RerankPair, RerankedItem, ScoreResult,
};
