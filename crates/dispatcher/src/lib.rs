pub mod assignment;
pub mod call_controller;
pub mod distributor;
pub mod requeue;

pub use assignment::{AssignmentEngine, AssignmentPair};
pub use call_controller::{CallController, EndCallRequest};
pub use distributor::{AssignmentOutcome, AssignmentResult, DistributionStats, LeadDistributor};
pub use requeue::{LeadTransition, RequeuePolicy};
