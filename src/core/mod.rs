pub mod backup;
pub mod db;
pub mod error;
pub mod lock;
pub mod media;
pub mod migrator;
pub mod orchestrator;
pub mod relocate;
pub mod store;
pub mod time;
pub mod verify;
