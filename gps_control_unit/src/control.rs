//! Controllers.
//!
//! Two [`position::PositionController`]s (base group on the active chain,
//! right group on the passive chain) run every control step. An optional
//! [`trial::TrialController`] overrides or blends the active chain output.

pub mod effort;
pub mod filters;
pub mod lin_gauss;
pub mod pid;
pub mod position;
pub mod trial;
