//! CLI command implementations.

pub mod init_db;
pub mod run;
pub mod schedule;

pub use init_db::InitDbCommand;
pub use run::RunCommand;
pub use schedule::ScheduleCommand;
