//! Greedy feedback-arc-set reduction.
//!
//! A DFS over the followee relation detects every back edge. Each detected
//! cycle costs exactly one edge: the one whose followee has the lowest
//! impact. This is order-dependent and not minimal; results are
//! reproducible because nodes are visited by index and neighbours in
//! ascending order.

use crate::model::User;
use crate::storage::Adjacency;
use crate::trace::{TraceEvent, TraceSink};

/// A DFS frame: the node and a snapshot of its followees taken on entry.
struct Frame {
    node: usize,
    followees: Vec<usize>,
    cursor: usize,
}

impl Frame {
    fn enter(node: usize, adjacency: &Adjacency) -> Self {
        Self {
            node,
            followees: adjacency.followees(node).iter().copied().collect(),
            cursor: 0,
        }
    }
}

/// Remove edges from `adjacency` until it is acyclic.
///
/// Returns the removed edges as `(followee, follower)` in removal order.
/// Passes are repeated until one finds no cycle: removing a tree edge can
/// leave a cycle behind that the same pass has already walked past.
pub fn remove_cycles(users: &[User], adjacency: &mut Adjacency, trace: &dyn TraceSink) -> Vec<(usize, usize)> {
    let mut removed = Vec::new();
    let mut passes = 0usize;
    loop {
        passes += 1;
        let before = removed.len();
        reduce_pass(users, adjacency, trace, &mut removed);
        if removed.len() == before {
            break;
        }
    }
    tracing::debug!(removed = removed.len(), passes, "cycle reduction finished");
    removed
}

fn reduce_pass(users: &[User], adjacency: &mut Adjacency, trace: &dyn TraceSink, removed: &mut Vec<(usize, usize)>) {
    let n = adjacency.len();
    let mut seen = vec![false; n];
    let mut on_path = vec![false; n];
    let mut path: Vec<usize> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for root in 0..n {
        if seen[root] {
            continue;
        }
        seen[root] = true;
        on_path[root] = true;
        path.push(root);
        stack.push(Frame::enter(root, adjacency));

        while let Some(frame) = stack.last_mut() {
            let Some(&child) = frame.followees.get(frame.cursor) else {
                let node = frame.node;
                stack.pop();
                path.pop();
                on_path[node] = false;
                continue;
            };
            frame.cursor += 1;

            if on_path[child] {
                let (followee, follower) = weakest_edge(users, &path, child);
                if adjacency.remove(followee, follower) {
                    tracing::debug!(
                        followee = %users[followee].name,
                        follower = %users[follower].name,
                        "breaking follow cycle"
                    );
                    trace.record(TraceEvent::EdgeRemoved {
                        followee: users[followee].name.clone(),
                        follower: users[follower].name.clone(),
                    });
                    removed.push((followee, follower));
                }
            }
            if seen[child] {
                continue;
            }

            seen[child] = true;
            on_path[child] = true;
            path.push(child);
            stack.push(Frame::enter(child, adjacency));
        }
    }
}

/// Walk the cycle closed by `path.last() -> closing`, starting at the
/// closing edge and moving back along the path. The edge whose followee has
/// the lowest impact wins; the first minimum is kept.
fn weakest_edge(users: &[User], path: &[usize], closing: usize) -> (usize, usize) {
    let mut prev = closing;
    let mut best = (closing, closing);
    let mut best_impact = f64::INFINITY;

    for &curr in path.iter().rev() {
        let impact = users[prev].impact();
        if impact < best_impact {
            best = (prev, curr);
            best_impact = impact;
        }
        if curr == closing {
            break;
        }
        prev = curr;
    }
    best
}

/// True if the followee relation has no directed cycle (Kahn's algorithm).
pub fn is_acyclic(adjacency: &Adjacency) -> bool {
    let n = adjacency.len();
    let mut pending: Vec<usize> = (0..n).map(|node| adjacency.followees(node).len()).collect();
    let mut ready: Vec<usize> = (0..n).filter(|&node| pending[node] == 0).collect();
    let mut resolved = 0;

    while let Some(node) = ready.pop() {
        resolved += 1;
        for &follower in adjacency.followers(node) {
            pending[follower] -= 1;
            if pending[follower] == 0 {
                ready.push(follower);
            }
        }
    }
    resolved == n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{NoopSink, RecordingSink};
    use pretty_assertions::assert_eq;

    fn users(impacts: &[(u32, u64)]) -> Vec<User> {
        impacts
            .iter()
            .enumerate()
            .map(|(i, &(years, tweets))| User::new(format!("u{i}")).with_activity(years, tweets))
            .collect()
    }

    fn adjacency(n: usize, edges: &[(usize, usize)]) -> Adjacency {
        let mut adj = Adjacency::with_len(n);
        for &(followee, follower) in edges {
            adj.insert(followee, follower);
        }
        adj
    }

    #[test]
    fn test_dag_untouched() {
        let users = users(&[(0, 0); 4]);
        let mut adj = adjacency(4, &[(1, 0), (2, 0), (3, 1), (3, 2)]);
        let before = adj.clone();

        assert!(remove_cycles(&users, &mut adj, &NoopSink).is_empty());
        assert_eq!(adj, before);
    }

    #[test]
    fn test_two_cycle_drops_lower_impact_followee() {
        // 0 has impact 2, 1 has impact 5; each follows the other.
        let users = users(&[(1, 1), (1, 4)]);
        let mut adj = adjacency(2, &[(0, 1), (1, 0)]);
        let sink = RecordingSink::new();

        let removed = remove_cycles(&users, &mut adj, &sink);

        assert_eq!(removed, vec![(0, 1)]);
        assert!(adj.contains(1, 0));
        assert!(is_acyclic(&adj));
        assert_eq!(sink.removed_edges(), vec![("u0".to_string(), "u1".to_string())]);
    }

    #[test]
    fn test_self_loop_removed() {
        let users = users(&[(0, 0)]);
        let mut adj = adjacency(1, &[(0, 0)]);
        assert_eq!(remove_cycles(&users, &mut adj, &NoopSink), vec![(0, 0)]);
        assert_eq!(adj.edge_count(), 0);
    }

    #[test]
    fn test_equal_impact_keeps_first_minimum() {
        // 0 follows 1, 1 follows 2, 2 follows 0. The closing edge is
        // examined first, so it is the one removed.
        let users = users(&[(0, 0); 3]);
        let mut adj = adjacency(3, &[(1, 0), (2, 1), (0, 2)]);
        assert_eq!(remove_cycles(&users, &mut adj, &NoopSink), vec![(0, 2)]);
        assert!(is_acyclic(&adj));
    }

    #[test]
    fn test_tree_edge_removal_needs_second_pass() {
        // a=0 follows b=1 and c=2; b and c follow d=3; d follows a.
        // d has the lowest impact, so the first pass cuts b -> d and walks
        // past the a -> c -> d -> a cycle.
        let users = users(&[(1, 1), (1, 1), (1, 1), (0, 0)]);
        let mut adj = adjacency(4, &[(1, 0), (2, 0), (3, 1), (3, 2), (0, 3)]);

        let removed = remove_cycles(&users, &mut adj, &NoopSink);

        assert_eq!(removed, vec![(3, 1), (3, 2)]);
        assert!(is_acyclic(&adj));
        assert!(adj.is_mirrored());
    }

    #[test]
    fn test_is_acyclic() {
        assert!(is_acyclic(&adjacency(3, &[(1, 0), (2, 1)])));
        assert!(!is_acyclic(&adjacency(3, &[(1, 0), (2, 1), (0, 2)])));
        assert!(is_acyclic(&Adjacency::default()));
    }
}
