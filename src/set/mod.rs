//! Transactional handling of gNMI Set requests.
//!
//! A Set request is applied to a private copy of the target's tree. The copy
//! is validated against the schema and diffed against the committed tree;
//! the diff is mirrored from `state` into `config` containers and published
//! to the cache before the copy replaces the committed tree.

mod engine;
mod mirror;


pub use engine::*;
pub use mirror::*;
