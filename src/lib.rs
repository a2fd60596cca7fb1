pub mod achievements;
pub mod backup;
pub mod cli;
pub mod config;
pub mod database;
pub mod models;
pub mod schedule;
pub mod stats;
pub mod store;
pub mod utils;

pub use config::Config;
pub use database::Database;
pub use models::{NewStudyInput, RecordPatch, SettingsPatch, StudyRecord};
pub use stats::RecordFilter;
pub use store::Store;
pub use utils::Profile;
