//! Bias propagation along follow edges.
//!
//! A user's bias is the impact-weighted mean of the biases of the users it
//! follows. Seeds are fixed inputs. Propagation runs on a scratch copy of
//! the follow relations:
//!
//! 1. seeds are detached from their followees (they depend on nobody),
//! 2. remaining cycles are cut by [`remove_cycles`](super::cycles::remove_cycles),
//! 3. every other user is computed in DFS post-order over followees,
//! 4. optionally, a worklist pass refines biases on the cyclic relation.
//!
//! The caller's relations are never touched.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::model::{Bias, User, UserId, BIAS_CATEGORIES, NORMALIZATION_TOLERANCE};
use crate::storage::Adjacency;
use crate::trace::{TraceEvent, TraceSink};

use super::cycles::remove_cycles;

// ============================================================================
// Options and summary
// ============================================================================

/// Worklist refinement over the cyclic relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Refinement {
    /// Infinity-norm change above which dependants are re-queued.
    pub epsilon: f64,
    /// Update budget, multiplied by the number of users.
    pub max_updates_per_node: usize,
}

impl Default for Refinement {
    fn default() -> Self {
        Self { epsilon: 1e-3, max_updates_per_node: 64 }
    }
}

/// What a propagation run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropagationSummary {
    /// Users visited by the post-order pass (seeds excluded).
    pub computed: usize,
    /// Seeds resolved to users.
    pub seeds: usize,
    /// Seed names not present in the graph.
    pub ignored_seeds: Vec<String>,
    /// Seed follow edges dropped before cycle reduction, `(followee, follower)`.
    pub detached_edges: Vec<(UserId, UserId)>,
    /// Edges cut to break cycles, `(followee, follower)`.
    pub removed_edges: Vec<(UserId, UserId)>,
    /// Bias updates made by the refinement pass.
    pub refinement_updates: usize,
}

// ============================================================================
// Propagation
// ============================================================================

/// Recompute every non-seed bias in `users`.
///
/// `adjacency` is read only; all edge removal happens on private copies.
/// Seed ids outside `users` are skipped.
pub fn propagate(
    users: &mut [User],
    adjacency: &Adjacency,
    seeds: &[UserId],
    refinement: Option<&Refinement>,
    trace: &dyn TraceSink,
) -> PropagationSummary {
    let n = users.len();
    let mut summary = PropagationSummary::default();
    let mut processed = vec![false; n];
    let mut is_seed = vec![false; n];

    let mut scratch = adjacency.clone();
    for &UserId(seed) in seeds {
        if seed >= n {
            tracing::debug!(seed, users = n, "seed id out of range, skipped");
            continue;
        }
        if is_seed[seed] {
            continue;
        }
        is_seed[seed] = true;
        processed[seed] = true;
        summary.seeds += 1;

        for followee in scratch.detach_followees(seed) {
            trace.record(TraceEvent::EdgeRemoved {
                followee: users[followee].name.clone(),
                follower: users[seed].name.clone(),
            });
            summary.detached_edges.push((UserId(followee), UserId(seed)));
        }
    }

    let detached = refinement.map(|_| scratch.clone());

    summary.removed_edges = remove_cycles(users, &mut scratch, trace)
        .into_iter()
        .map(|(followee, follower)| (UserId(followee), UserId(follower)))
        .collect();

    summary.computed = post_order_pass(users, &scratch, &mut processed, trace);

    if let (Some(options), Some(cyclic)) = (refinement, detached.as_ref()) {
        summary.refinement_updates = refine(users, cyclic, &is_seed, options);
    }

    tracing::info!(
        users = n,
        seeds = summary.seeds,
        computed = summary.computed,
        detached = summary.detached_edges.len(),
        removed = summary.removed_edges.len(),
        refinement_updates = summary.refinement_updates,
        "bias propagation finished"
    );
    summary
}

/// DFS post-order over followees; each user is computed after everyone it
/// follows. Returns the number of users computed.
///
/// The trace is a balanced call tree: `EnterBias`/`ExitBias` pairs are
/// recorded only for users computed here, never for seeds or revisits.
fn post_order_pass(users: &mut [User], dag: &Adjacency, processed: &mut [bool], trace: &dyn TraceSink) -> usize {
    let mut computed = 0;
    let mut stack: Vec<(usize, std::collections::btree_set::Iter<'_, usize>)> = Vec::new();

    for root in 0..users.len() {
        if processed[root] {
            continue;
        }
        processed[root] = true;
        trace.record(TraceEvent::EnterBias(users[root].name.clone()));
        stack.push((root, dag.followees(root).iter()));

        while let Some((node, followees)) = stack.last_mut() {
            let node = *node;
            match followees.next().copied() {
                Some(followee) => {
                    if !processed[followee] {
                        processed[followee] = true;
                        trace.record(TraceEvent::EnterBias(users[followee].name.clone()));
                        stack.push((followee, dag.followees(followee).iter()));
                    }
                }
                None => {
                    stack.pop();
                    if let Some(bias) = weighted_mean(users, dag, node) {
                        users[node].bias = bias;
                    }
                    trace.record(TraceEvent::ExitBias(users[node].name.clone()));
                    computed += 1;
                }
            }
        }
    }
    computed
}

/// Impact-weighted mean of the followees' biases, or `None` when the total
/// followee impact is zero.
///
/// Panics if the result is not normalized: that is a defect, not input.
fn weighted_mean(users: &[User], adjacency: &Adjacency, node: usize) -> Option<Bias> {
    let mut total = 0.0;
    let mut exposure = [0.0; BIAS_CATEGORIES];

    for &followee in adjacency.followees(node) {
        let impact = users[followee].impact();
        for (acc, weight) in exposure.iter_mut().zip(users[followee].bias.weights()) {
            *acc += impact * weight;
        }
        total += impact;
    }

    if total == 0.0 {
        return None;
    }

    for acc in exposure.iter_mut() {
        *acc /= total;
    }
    let bias = Bias(exposure);
    assert!(
        (1.0 - bias.sum()).abs() <= NORMALIZATION_TOLERANCE,
        "bias of '{}' sums to {} after propagation",
        users[node].name,
        bias.sum()
    );
    Some(bias)
}

// ============================================================================
// Refinement
// ============================================================================

/// Max-heap entry: largest change first, then highest index.
#[derive(Debug, Clone, Copy)]
struct Pending {
    delta: f64,
    node: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.delta
            .total_cmp(&other.delta)
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Re-average users over the cyclic relation until no bias moves by more
/// than `epsilon`, or the update budget runs out.
fn refine(users: &mut [User], cyclic: &Adjacency, is_seed: &[bool], options: &Refinement) -> usize {
    let n = users.len();
    let budget = options.max_updates_per_node.saturating_mul(n).max(n);
    let mut queue: BinaryHeap<Pending> = (0..n).map(|node| Pending { delta: 0.0, node }).collect();
    let mut updates = 0;

    while let Some(Pending { node, .. }) = queue.pop() {
        if is_seed[node] {
            continue;
        }
        if updates == budget {
            tracing::warn!(budget, pending = queue.len() + 1, "bias refinement stopped at update budget");
            break;
        }
        let Some(next) = weighted_mean(users, cyclic, node) else {
            continue;
        };
        updates += 1;

        let delta = users[node].bias.max_abs_diff(&next);
        users[node].bias = next;
        if delta > options.epsilon {
            for &follower in cyclic.followers(node) {
                queue.push(Pending { delta, node: follower });
            }
        }
    }
    updates
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use crate::trace::{NoopSink, RecordingSink};
    use pretty_assertions::assert_eq;

    fn adjacency(n: usize, edges: &[(usize, usize)]) -> Adjacency {
        let mut adj = Adjacency::with_len(n);
        for &(followee, follower) in edges {
            adj.insert(followee, follower);
        }
        adj
    }

    #[test]
    fn test_weighted_mean_uses_impact() {
        // 2 follows 0 (impact 1) and 1 (impact 3).
        let users = vec![
            User::new("left").with_bias(Bias::pinned(Category::Left)),
            User::new("right").with_activity(1, 2).with_bias(Bias::pinned(Category::Right)),
            User::new("reader"),
        ];
        let adj = adjacency(3, &[(0, 2), (1, 2)]);

        let bias = weighted_mean(&users, &adj, 2).unwrap();
        assert_eq!(bias.0, [0.25, 0.75, 0.0, 0.0]);
        assert!(weighted_mean(&users, &adj, 0).is_none());
    }

    #[test]
    fn test_post_order_trace() {
        // 0 follows 1, 1 follows 2.
        let mut users = vec![User::new("a"), User::new("b"), User::new("c")];
        let adj = adjacency(3, &[(1, 0), (2, 1)]);
        let sink = RecordingSink::new();

        let summary = propagate(&mut users, &adj, &[], None, &sink);

        assert_eq!(summary.computed, 3);
        let trace: Vec<String> = sink.events().iter().map(ToString::to_string).collect();
        assert_eq!(trace, vec!["=> a", "=> b", "=> c", "<= c", "<= b", "<= a"]);
    }

    #[test]
    fn test_seed_detached_and_unchanged() {
        // seed 0 follows 1; 1 follows 0.
        let seed = Bias::from([0.1, 0.2, 0.3, 0.4]);
        let mut users = vec![User::new("seed").with_bias(seed), User::new("fan")];
        let adj = adjacency(2, &[(1, 0), (0, 1)]);

        let summary = propagate(&mut users, &adj, &[UserId(0)], None, &NoopSink);

        assert_eq!(summary.detached_edges, vec![(UserId(1), UserId(0))]);
        assert!(summary.removed_edges.is_empty());
        assert_eq!(users[0].bias, seed);
        assert_eq!(users[1].bias, seed);
    }

    #[test]
    fn test_out_of_range_seed_skipped() {
        let mut users = vec![User::new("seed").with_bias(Bias::pinned(Category::Center)), User::new("fan")];
        let adj = adjacency(2, &[(0, 1)]);

        let summary = propagate(&mut users, &adj, &[UserId(7), UserId(0), UserId(0)], None, &NoopSink);

        assert_eq!(summary.seeds, 1);
        assert_eq!(summary.computed, 1);
        assert_eq!(users[1].bias, Bias::pinned(Category::Center));
    }

    #[test]
    fn test_refinement_reaches_cycle_members() {
        // seed 0; 1 and 2 follow each other, 1 also follows the seed.
        let mut users = vec![
            User::new("seed").with_bias(Bias::pinned(Category::Libertarian)),
            User::new("x"),
            User::new("y"),
        ];
        let adj = adjacency(3, &[(0, 1), (2, 1), (1, 2)]);
        let options = Refinement { epsilon: 1e-9, max_updates_per_node: 1000 };

        let summary = propagate(&mut users, &adj, &[UserId(0)], Some(&options), &NoopSink);

        assert!(summary.refinement_updates > 0);
        for user in &users {
            assert!(user.bias.is_normalized());
        }
        // The 2-cycle converges towards the only source of opinion.
        assert!(users[1].bias[Category::Libertarian] > 0.99);
        assert!(users[2].bias[Category::Libertarian] > 0.99);
    }

    #[test]
    fn test_refinement_budget_is_respected() {
        let mut users = vec![
            User::new("seed").with_bias(Bias::pinned(Category::Left)),
            User::new("x"),
            User::new("y"),
        ];
        let adj = adjacency(3, &[(0, 1), (2, 1), (1, 2)]);
        let options = Refinement { epsilon: 0.0, max_updates_per_node: 1 };

        let summary = propagate(&mut users, &adj, &[UserId(0)], Some(&options), &NoopSink);
        assert!(summary.refinement_updates <= 3);
    }

    #[test]
    fn test_pending_order() {
        let mut heap = BinaryHeap::new();
        heap.push(Pending { delta: 0.0, node: 1 });
        heap.push(Pending { delta: 0.5, node: 0 });
        heap.push(Pending { delta: 0.0, node: 2 });
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|p| p.node)).collect();
        assert_eq!(order, vec![0, 2, 1]);
    }
}
