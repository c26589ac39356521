//! # Graph Algorithms
//!
//! Everything here works on index-based [`Adjacency`](crate::storage::Adjacency)
//! values with explicit work stacks, so traversal depth is bounded by heap,
//! not by the call stack.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `cycles` | Greedy cycle breaking before propagation |
//! | `propagation` | Impact-weighted bias propagation from seeds |
//! | `scc` | Kosaraju strongly connected components |

pub mod cycles;
pub mod propagation;
pub mod scc;

pub use cycles::{is_acyclic, remove_cycles};
pub use propagation::{propagate, PropagationSummary, Refinement};
pub use scc::strongly_connected_components;
