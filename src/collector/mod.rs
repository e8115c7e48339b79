//! Collector wiring: target, cache, ingestion loop, Set engine and the gNMI
//! server, plus their shared lifecycle.

mod builder;
mod collector;
mod ingest;
mod target;


pub use builder::*;
pub use collector::*;
pub use ingest::*;
pub use target::*;
