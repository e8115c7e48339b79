//! Protocol Buffer definitions and generated code for the gNMI service.
//!
//! The `gnmi` module is generated by [`tonic-build`] from `proto/gnmi.proto`;
//! `exts` adds helper methods on the generated types.

pub mod gnmi {
    tonic::include_proto!("gnmi");
}

pub mod exts;

pub use gnmi::*;
