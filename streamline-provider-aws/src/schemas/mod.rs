//! AWS resource schema definitions

pub mod access;
pub mod autoscaling;
pub mod elb;
pub mod iam;
pub mod network;
pub mod types;
