//! Aphid Runtime - Orchestration layer for the Aphid bot framework.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `AphidConfig`)
//! - Logging configuration (`LoggingBuilder`)
//! - The message loop (`AphidRuntime`)
//!
//! ```ignore
//! use aphid_runtime::AphidRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = AphidRuntime::builder()?
//!         .module::<Greeter>(ModuleInfo::new("Greeter", "Says hello"))?
//!         .command::<Greeter, _>("greet", CommandInfo::new("greet", ["greet"]), greet)?
//!         .build()?;
//!
//!     // Run until the stream ends or Ctrl+C
//!     runtime.run(messages).await?;
//!     runtime.teardown()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{AphidConfig, BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{AphidRuntime, RuntimeBuilder, RuntimeStats};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
