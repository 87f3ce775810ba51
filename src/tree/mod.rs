//! Lazy tree model with diff-based refresh
//!
//! The tree is split into the owning node store ([`node::Forest`]) and the
//! controller ([`state::TreeState`]) that maintains the flattened visible
//! projection, the cursor and search state. Children are produced on demand
//! by [`node::ChildSource`] implementations; refreshing reconciles fresh
//! fetches against loaded nodes by label identity so unchanged subtrees
//! (and their open state) survive.

pub mod node;
pub mod state;

pub use node::{
    ChildSource, ConnTarget, Forest, Label, NamedCommand, Node, NodeCommand, NodeId, NodeKind,
    NodeSpec,
};
pub use state::{FlatLine, TreeEvent, TreeState};
