//! User (node) in the follow graph.

use serde::{Deserialize, Serialize};
use super::Bias;

/// Stable index of a user inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub usize);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user of the social network.
///
/// Counters start at zero and are only touched by the graph when a new
/// follow edge is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub years_active: u32,
    pub tweet_count: u64,
    pub follower_count: u64,
    pub followee_count: u64,
    pub bias: Bias,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            years_active: 0,
            tweet_count: 0,
            follower_count: 0,
            followee_count: 0,
            bias: Bias::uniform(),
        }
    }

    pub fn with_activity(mut self, years_active: u32, tweet_count: u64) -> Self {
        self.years_active = years_active;
        self.tweet_count = tweet_count;
        self
    }

    pub fn with_bias(mut self, bias: impl Into<Bias>) -> Self {
        self.bias = bias.into();
        self
    }

    /// `1 + tweets * log2(1 + years)`.
    ///
    /// Derived from immutable attributes; callers recompute instead of caching.
    pub fn impact(&self) -> f64 {
        1.0 + self.tweet_count as f64 * (1.0 + self.years_active as f64).log2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("Ada");
        assert_eq!(user.follower_count, 0);
        assert_eq!(user.followee_count, 0);
        assert_eq!(user.bias, Bias::uniform());
    }

    #[test]
    fn test_impact() {
        assert_eq!(User::new("idle").impact(), 1.0);
        assert_eq!(User::new("a").with_activity(1, 1).impact(), 2.0);
        assert_eq!(User::new("b").with_activity(1, 4).impact(), 5.0);
        assert_eq!(User::new("c").with_activity(3, 10).impact(), 21.0);
    }
}
