pub mod commands;
pub mod errors;
pub mod service;
mod session;

pub use service::StudioService;
