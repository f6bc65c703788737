pub mod config;

#[cfg(feature = "live")]
pub mod logging;
