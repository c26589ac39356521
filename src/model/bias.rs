//! Bias vector: a probability distribution over the ideological categories.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Number of ideological categories.
pub const BIAS_CATEGORIES: usize = 4;

/// Tolerance for `Σ bias == 1`.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-10;

/// Ideological category, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Left,
    Right,
    Center,
    Libertarian,
}

impl Category {
    pub const ALL: [Category; BIAS_CATEGORIES] = [
        Category::Left,
        Category::Right,
        Category::Center,
        Category::Libertarian,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Left => "LEFT",
            Category::Right => "RIGHT",
            Category::Center => "CENTER",
            Category::Libertarian => "LIBERTARIAN",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Non-negative weights over [`Category::ALL`] summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bias(pub [f64; BIAS_CATEGORIES]);

impl Bias {
    /// `1/K` in every category.
    pub fn uniform() -> Self {
        Self([1.0 / BIAS_CATEGORIES as f64; BIAS_CATEGORIES])
    }

    /// All weight on a single category.
    pub fn pinned(category: Category) -> Self {
        let mut weights = [0.0; BIAS_CATEGORIES];
        weights[category.index()] = 1.0;
        Self(weights)
    }

    pub fn weights(&self) -> &[f64; BIAS_CATEGORIES] {
        &self.0
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// True when all weights are non-negative and they sum to 1.
    pub fn is_normalized(&self) -> bool {
        self.0.iter().all(|w| *w >= 0.0 && w.is_finite())
            && (1.0 - self.sum()).abs() <= NORMALIZATION_TOLERANCE
    }

    /// Infinity norm of the difference between two vectors.
    pub fn max_abs_diff(&self, other: &Bias) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Category with the largest weight; first one wins on ties.
    pub fn dominant(&self) -> Category {
        let mut best = Category::Left;
        for category in Category::ALL {
            if self[category] > self[best] {
                best = category;
            }
        }
        best
    }
}

impl Default for Bias {
    fn default() -> Self {
        Self::uniform()
    }
}

impl Index<Category> for Bias {
    type Output = f64;

    fn index(&self, category: Category) -> &f64 {
        &self.0[category.index()]
    }
}

impl From<[f64; BIAS_CATEGORIES]> for Bias {
    fn from(weights: [f64; BIAS_CATEGORIES]) -> Self {
        Self(weights)
    }
}
