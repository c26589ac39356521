//! # bias-graph: Follow Graph Bias Propagation
//!
//! Models a directed "who follows whom" graph and derives two structures:
//! a per-user ideological bias distribution propagated from pinned seed
//! users, and the strongly connected components of the raw graph.
//!
//! ## Design Principles
//!
//! 1. **Index-based storage**: users live in one `Vec`, edges are index sets
//!    in two mirrored relations, so snapshots are plain clones
//! 2. **Transient cycle breaking**: propagation cuts cycles on a scratch copy;
//!    components are always computed on the true graph
//! 3. **Explicit stacks**: no traversal recurses on the call stack
//! 4. **Injected tracing**: the trace sink is a constructor argument, never a global
//!
//! ## Quick Start
//!
//! ```rust
//! use bias_graph::{Bias, Category, FollowGraph, User};
//!
//! # fn example() -> bias_graph::Result<()> {
//! let mut graph = FollowGraph::new();
//! graph.add_user(User::new("paper").with_bias(Bias::pinned(Category::Center)))?;
//! graph.add_user(User::new("reader").with_activity(2, 40))?;
//! graph.connect("paper", "reader")?;
//!
//! graph.compute_bias(&["paper"]);
//! assert_eq!(graph.user_by_name("reader").unwrap().bias, Bias::pinned(Category::Center));
//!
//! for component in graph.strongly_connected_components() {
//!     println!("{:?}", component.iter().map(|u| &u.name).collect::<Vec<_>>());
//! }
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod algo;
pub mod trace;
pub mod config;
pub mod ingest;
pub mod export;
pub mod ranking;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Bias, Category, User, UserId, BIAS_CATEGORIES};
pub use storage::{Adjacency, FollowGraph};
pub use algo::{PropagationSummary, Refinement};
pub use trace::{FileTraceSink, NoopSink, RecordingSink, TraceEvent, TraceSink, TracingSink};
pub use config::{EngineConfig, SeedPreset};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown user: {0}")]
    UnknownName(String),

    #[error("Duplicate user: {0}")]
    DuplicateName(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
