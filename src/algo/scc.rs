//! Strongly connected components (Kosaraju).
//!
//! Pass 1 walks the follower relation (the reverse graph) and records finish
//! order. Pass 2 pops that order and floods the followee relation, so every
//! flood stays inside one component.

use std::collections::btree_set;

use crate::storage::Adjacency;

/// Finish order of a DFS over followers, visiting roots by index.
///
/// The last element is the first to be processed by [`collect_components`].
pub fn reverse_postorder(adjacency: &Adjacency) -> Vec<usize> {
    let n = adjacency.len();
    let mut seen = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut stack: Vec<(usize, btree_set::Iter<'_, usize>)> = Vec::new();

    for root in 0..n {
        if seen[root] {
            continue;
        }
        seen[root] = true;
        stack.push((root, adjacency.followers(root).iter()));

        while let Some((node, followers)) = stack.last_mut() {
            let node = *node;
            match followers.next().copied() {
                Some(next) if !seen[next] => {
                    seen[next] = true;
                    stack.push((next, adjacency.followers(next).iter()));
                }
                Some(_) => {}
                None => {
                    stack.pop();
                    order.push(node);
                }
            }
        }
    }
    order
}

/// Pass 2: one component per unassigned node popped from `order`, members
/// in DFS pre-order over followees.
pub fn collect_components(adjacency: &Adjacency, order: &[usize]) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut assigned = vec![false; n];
    let mut components = Vec::new();
    let mut stack: Vec<btree_set::Iter<'_, usize>> = Vec::new();

    for &root in order.iter().rev() {
        if assigned[root] {
            continue;
        }
        assigned[root] = true;
        let mut component = vec![root];
        stack.push(adjacency.followees(root).iter());

        while let Some(followees) = stack.last_mut() {
            match followees.next().copied() {
                Some(next) if !assigned[next] => {
                    assigned[next] = true;
                    component.push(next);
                    stack.push(adjacency.followees(next).iter());
                }
                Some(_) => {}
                None => {
                    stack.pop();
                }
            }
        }
        components.push(component);
    }

    tracing::debug!(users = n, components = components.len(), "strongly connected components computed");
    components
}

/// Both passes in one call.
pub fn strongly_connected_components(adjacency: &Adjacency) -> Vec<Vec<usize>> {
    collect_components(adjacency, &reverse_postorder(adjacency))
}
