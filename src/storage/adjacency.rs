//! Mirrored follow relations.
//!
//! `followees[x]` holds the users `x` follows, `followers[y]` the users that
//! follow `y`. Both are index sets, so the whole relation can be cloned as a
//! snapshot and compared for set-equality.

use std::collections::BTreeSet;

/// The two follow relations of a graph, kept mirror-consistent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Adjacency {
    followers: Vec<BTreeSet<usize>>,
    followees: Vec<BTreeSet<usize>>,
}

impl Adjacency {
    pub fn with_len(len: usize) -> Self {
        Self {
            followers: vec![BTreeSet::new(); len],
            followees: vec![BTreeSet::new(); len],
        }
    }

    /// Number of users covered.
    pub fn len(&self) -> usize {
        self.followees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.followees.is_empty()
    }

    pub(crate) fn push_user(&mut self) {
        self.followers.push(BTreeSet::new());
        self.followees.push(BTreeSet::new());
    }

    /// Adds `follower -> followee`. Returns false if the edge already existed.
    pub(crate) fn insert(&mut self, followee: usize, follower: usize) -> bool {
        let added = self.followers[followee].insert(follower);
        let mirrored = self.followees[follower].insert(followee);
        assert_eq!(added, mirrored, "follow relations out of sync at {follower} -> {followee}");
        added
    }

    /// Removes `follower -> followee` from both relations.
    pub(crate) fn remove(&mut self, followee: usize, follower: usize) -> bool {
        let removed = self.followers[followee].remove(&follower);
        let mirrored = self.followees[follower].remove(&followee);
        assert_eq!(removed, mirrored, "follow relations out of sync at {follower} -> {followee}");
        removed
    }

    /// Drops every edge leaving `follower`, returning the former followees in order.
    pub(crate) fn detach_followees(&mut self, follower: usize) -> Vec<usize> {
        let detached: Vec<usize> = std::mem::take(&mut self.followees[follower]).into_iter().collect();
        for &followee in &detached {
            let removed = self.followers[followee].remove(&follower);
            assert!(removed, "follow relations out of sync at {follower} -> {followee}");
        }
        detached
    }

    pub fn contains(&self, followee: usize, follower: usize) -> bool {
        self.followees
            .get(follower)
            .is_some_and(|set| set.contains(&followee))
    }

    /// Users `user` follows, ascending.
    pub fn followees(&self, user: usize) -> &BTreeSet<usize> {
        &self.followees[user]
    }

    /// Users following `user`, ascending.
    pub fn followers(&self, user: usize) -> &BTreeSet<usize> {
        &self.followers[user]
    }

    pub fn edge_count(&self) -> usize {
        self.followees.iter().map(BTreeSet::len).sum()
    }

    /// Every edge as `(followee, follower)`, ordered by follower then followee.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.followees
            .iter()
            .enumerate()
            .flat_map(|(follower, set)| set.iter().map(move |&followee| (followee, follower)))
    }

    /// `y ∈ followees[x] ⇔ x ∈ followers[y]` for every pair.
    pub fn is_mirrored(&self) -> bool {
        self.followers.len() == self.followees.len()
            && self.edges().all(|(followee, follower)| self.followers[followee].contains(&follower))
            && self.followers.iter().map(BTreeSet::len).sum::<usize>() == self.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_mirrored() {
        let mut adj = Adjacency::with_len(3);
        assert!(adj.insert(1, 0));
        assert!(!adj.insert(1, 0));
        assert!(adj.insert(2, 0));

        assert!(adj.contains(1, 0));
        assert!(!adj.contains(0, 1));
        assert_eq!(adj.followers(1).iter().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(adj.edge_count(), 2);
        assert!(adj.is_mirrored());
    }

    #[test]
    fn test_remove_and_detach() {
        let mut adj = Adjacency::with_len(3);
        adj.insert(1, 0);
        adj.insert(2, 0);
        adj.insert(0, 2);

        assert!(adj.remove(0, 2));
        assert!(!adj.remove(0, 2));
        assert_eq!(adj.detach_followees(0), vec![1, 2]);
        assert_eq!(adj.edge_count(), 0);
        assert!(adj.followers(1).is_empty());
        assert!(adj.is_mirrored());
    }

    #[test]
    fn test_edges_order() {
        let mut adj = Adjacency::with_len(3);
        adj.insert(2, 1);
        adj.insert(0, 1);
        adj.insert(1, 0);
        assert_eq!(adj.edges().collect::<Vec<_>>(), vec![(1, 0), (0, 1), (2, 1)]);
    }
}
