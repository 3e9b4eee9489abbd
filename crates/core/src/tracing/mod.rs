//! Tracing setup shared by Keystone binaries
//!
//! The library crates only emit events through `tracing`; installing a
//! subscriber is left to the host, which can use [`init::init_tracing`].

pub mod config;
#[cfg(all(feature = "subscriber", not(target_arch = "wasm32")))]
pub mod init;

pub use config::InstrumentationConfig;
