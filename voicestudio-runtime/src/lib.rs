pub mod config_store;
pub mod defaults;
pub mod ipc;
pub mod passthrough;
