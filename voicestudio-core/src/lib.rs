pub mod config;
pub mod error;
pub mod fsutil;
pub mod gallery;
pub mod naming;
pub mod types;

// Keep the public surface small and intentional.
pub use config::*;
pub use error::*;
pub use gallery::*;
pub use naming::*;
pub use types::*;
