//! # Follow Graph Model
//!
//! Plain data carried across every boundary: storage ↔ algorithms ↔ reports.
//!
//! Design rule: no adjacency, no I/O, no trace sinks here.

pub mod bias;
pub mod user;

pub use bias::{Bias, Category, BIAS_CATEGORIES, NORMALIZATION_TOLERANCE};
pub use user::{User, UserId};
