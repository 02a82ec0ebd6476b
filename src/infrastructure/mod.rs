pub mod database;
pub mod remote_storage;
