pub mod agent;
pub mod call;
pub mod lead;

pub use agent::{Agent, AgentStats};
pub use call::{Call, CallHistoryRecord, CallOutcome, CallQuality, CallStatus, MeetingDetails};
pub use lead::{Lead, LeadFilter, LeadStatus};
