//! Top-k users by raw follow counters.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::model::User;

/// The `k` users with the largest `key`, largest first. Ties go to the
/// earlier user.
pub fn top_by<F>(users: &[User], k: usize, key: F) -> Vec<&User>
where
    F: Fn(&User) -> u64,
{
    if k == 0 {
        return Vec::new();
    }

    // Min-heap of (key, Reverse(index)): the root is the weakest keeper.
    let mut heap: BinaryHeap<Reverse<(u64, Reverse<usize>)>> = BinaryHeap::with_capacity(k + 1);
    for (index, user) in users.iter().enumerate() {
        heap.push(Reverse((key(user), Reverse(index))));
        if heap.len() > k {
            heap.pop();
        }
    }

    let mut ranked: Vec<(u64, Reverse<usize>)> = heap.into_iter().map(|Reverse(entry)| entry).collect();
    ranked.sort_unstable_by(|a, b| b.cmp(a));
    ranked.into_iter().map(|(_, Reverse(index))| &users[index]).collect()
}

/// Most followed users.
pub fn top_influential(users: &[User], k: usize) -> Vec<&User> {
    top_by(users, k, |user| user.follower_count)
}

/// Users following the most accounts.
pub fn top_influenceable(users: &[User], k: usize) -> Vec<&User> {
    top_by(users, k, |user| user.followee_count)
}
