//! # Follow Graph Storage
//!
//! `FollowGraph` owns every [`User`] and the mirrored follow relations.
//! It holds no algorithmic logic beyond bookkeeping; bias propagation and
//! component decomposition live in [`crate::algo`] and are exposed here as
//! thin methods.
//!
//! ## Limitations
//!
//! - **Append-only**: users are never removed and indices are never reused.
//! - **Single-owner**: analysis takes `&mut self` or `&self`; callers that
//!   share a graph across threads must serialize access themselves.

pub mod adjacency;

use std::cell::OnceCell;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::algo::{self, PropagationSummary, Refinement};
use crate::model::*;
use crate::trace::{NoopSink, TraceSink};
use crate::{Error, Result};

pub use adjacency::Adjacency;

// ============================================================================
// FollowGraph
// ============================================================================

/// Directed follow graph: "follower follows followee".
pub struct FollowGraph {
    users: Vec<User>,
    adjacency: Adjacency,
    name_to_id: HashMap<String, usize>,
    /// Kosaraju pass-1 finish order; reset on every mutation.
    reverse_postorder: OnceCell<Vec<usize>>,
    trace: Arc<dyn TraceSink>,
}

impl FollowGraph {
    pub fn new() -> Self {
        Self::with_trace(Arc::new(NoopSink))
    }

    /// Graph reporting bias computation and edge removals to `trace`.
    pub fn with_trace(trace: Arc<dyn TraceSink>) -> Self {
        Self {
            users: Vec::new(),
            adjacency: Adjacency::default(),
            name_to_id: HashMap::new(),
            reverse_postorder: OnceCell::new(),
            trace,
        }
    }

    /// Build a graph from users without edges.
    pub fn from_users(users: impl IntoIterator<Item = User>, trace: Arc<dyn TraceSink>) -> Result<Self> {
        let mut graph = Self::with_trace(trace);
        for user in users {
            graph.add_user(user)?;
        }
        Ok(graph)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Insert a user, returning its index. Names are unique and the bias
    /// must be normalized.
    pub fn add_user(&mut self, user: User) -> Result<UserId> {
        if self.name_to_id.contains_key(&user.name) {
            return Err(Error::DuplicateName(user.name));
        }
        if !user.bias.is_normalized() {
            return Err(Error::Config(format!(
                "bias for '{}' must be non-negative and sum to 1, got {:?}",
                user.name,
                user.bias.weights()
            )));
        }
        let id = self.users.len();
        self.name_to_id.insert(user.name.clone(), id);
        self.users.push(user);
        self.adjacency.push_user();
        self.reverse_postorder.take();
        Ok(UserId(id))
    }

    /// Record that `follower` follows `followee`.
    ///
    /// Returns `Ok(false)` when the edge already existed; counters only move
    /// for new edges. Fails without touching the graph if either name is
    /// unknown.
    pub fn connect(&mut self, followee: &str, follower: &str) -> Result<bool> {
        let followee_id = self.resolve(followee)?;
        let follower_id = self.resolve(follower)?;

        if !self.adjacency.insert(followee_id, follower_id) {
            return Ok(false);
        }

        self.users[followee_id].follower_count += 1;
        self.users[follower_id].followee_count += 1;
        self.reverse_postorder.take();
        Ok(true)
    }

    /// Overwrite a user's bias, typically to pin a seed before propagation.
    pub fn set_bias(&mut self, name: &str, bias: impl Into<Bias>) -> Result<()> {
        let bias = bias.into();
        if !bias.is_normalized() {
            return Err(Error::Config(format!(
                "bias for '{name}' must be non-negative and sum to 1, got {:?}",
                bias.weights()
            )));
        }
        let id = self.resolve(name)?;
        self.users[id].bias = bias;
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(id.0)
    }

    pub fn user_by_name(&self, name: &str) -> Option<&User> {
        self.name_to_id.get(name).map(|&id| &self.users[id])
    }

    pub fn id_of(&self, name: &str) -> Option<UserId> {
        self.name_to_id.get(name).copied().map(UserId)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.edge_count()
    }

    /// Users `id` follows, ascending by index.
    pub fn followees(&self, id: UserId) -> impl Iterator<Item = UserId> + '_ {
        self.adjacency.followees(id.0).iter().copied().map(UserId)
    }

    /// Users following `id`, ascending by index.
    pub fn followers(&self, id: UserId) -> impl Iterator<Item = UserId> + '_ {
        self.adjacency.followers(id.0).iter().copied().map(UserId)
    }

    /// Read-only view of both follow relations.
    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    pub fn trace(&self) -> &dyn TraceSink {
        self.trace.as_ref()
    }

    fn resolve(&self, name: &str) -> Result<usize> {
        self.name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownName(name.to_string()))
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Propagate bias from `seeds` to every other user.
    ///
    /// Unknown seed names are ignored. The follow relations seen by callers
    /// are identical before and after.
    pub fn compute_bias<S: AsRef<str>>(&mut self, seeds: &[S]) -> PropagationSummary {
        self.compute_bias_with(seeds, None)
    }

    /// [`compute_bias`](Self::compute_bias) followed by an optional
    /// worklist refinement over the cyclic relation.
    pub fn compute_bias_with<S: AsRef<str>>(
        &mut self,
        seeds: &[S],
        refinement: Option<&Refinement>,
    ) -> PropagationSummary {
        let seed_ids: Vec<UserId> = seeds
            .iter()
            .filter_map(|name| self.name_to_id.get(name.as_ref()).copied().map(UserId))
            .collect();
        let ignored: Vec<String> = seeds
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.name_to_id.contains_key(*name))
            .map(str::to_string)
            .collect();

        let mut summary = algo::propagation::propagate(
            &mut self.users,
            &self.adjacency,
            &seed_ids,
            refinement,
            self.trace.as_ref(),
        );
        summary.ignored_seeds = ignored;

        assert!(self.adjacency.is_mirrored(), "follow relations lost mirror consistency");
        summary
    }

    /// Strongly connected components of the follow relation, as indices.
    pub fn component_ids(&self) -> Vec<Vec<UserId>> {
        let order = self
            .reverse_postorder
            .get_or_init(|| algo::scc::reverse_postorder(&self.adjacency));
        algo::scc::collect_components(&self.adjacency, order)
            .into_iter()
            .map(|component| component.into_iter().map(UserId).collect())
            .collect()
    }

    /// Strongly connected components, each in discovery order.
    pub fn strongly_connected_components(&self) -> Vec<Vec<&User>> {
        self.component_ids()
            .into_iter()
            .map(|component| component.into_iter().map(|id| &self.users[id.0]).collect())
            .collect()
    }
}

impl Default for FollowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FollowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowGraph")
            .field("users", &self.users.len())
            .field("edges", &self.adjacency.edge_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
