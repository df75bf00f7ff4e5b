//! `pkgdeploy` library.
//!
//! Builds versioned packages from JSON manifests and wraps them, together with
//! tool binaries and a rendered rollout script, into deployment bundles for a
//! primary feed and an alternate package ecosystem.

pub mod assemble;
pub mod channel;
pub mod commands;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod manifest;
pub mod properties;
pub mod script;
pub mod styles;
pub mod tasks;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use assemble::*;
pub use channel::*;
pub use commands::*;
pub use config::*;
pub use constants::*;
pub use deploy::*;
pub use diagnostics::*;
pub use error::*;
pub use manifest::*;
pub use properties::*;
pub use script::*;
pub use tasks::*;
