pub mod database;

pub use database::sqlite::{
    create_embedded_pool, SqliteAgentRepository, SqliteAssignmentStore, SqliteCallRepository,
    SqliteLeadRepository,
};
