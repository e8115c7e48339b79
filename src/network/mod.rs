//! Network surface of the collector: the gNMI gRPC service.
pub mod grpc;
