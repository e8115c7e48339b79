//! In-memory device tree and the schema-directed operations over it.
//!
//! A tree is a plain value. Mutation happens on a clone, which is diffed
//! against the original to produce the notification that gets published.

mod diff;
mod mutator;
mod node;
mod validate;
mod value;


pub use diff::*;
pub use mutator::*;
pub use node::*;
pub use validate::*;
pub use value::leaf_from_json;
pub use value::leaf_from_typed;
