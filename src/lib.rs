pub mod config;
pub mod discovery;
pub mod error;
pub mod grpc;
pub mod net;
pub mod node;
pub mod peers;
pub mod scheduler;
pub mod shutdown;
pub mod status;
pub mod worker;

// Re-export generated protobuf types
pub mod proto {
    tonic::include_proto!("forage");
}
