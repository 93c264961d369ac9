//! GPS Common Library
//!
//! Shared constants, state enums, fault flags and configuration sources
//! for the GPS actuator controller workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Workspace-wide limits and defaults
//! - [`config`] - TOML loading and key/value configuration sources
//! - [`fault`] - Per-tick sensor/controller fault flags
//! - [`state`] - Lifecycle enums and joint/group identifiers
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod fault;
pub mod prelude;
pub mod state;
