pub mod repository;

pub use repository::{
    AgentAvailabilitySummary, AgentRepository, AssignmentStore, CallCompletion, CallRepository,
    CallStatsDelta, LeadRepository, LeadStatusCount,
};
