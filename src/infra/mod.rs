pub mod db;
pub mod memory;
pub mod pg_store;
pub mod store;
