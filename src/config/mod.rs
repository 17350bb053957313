// src/config/mod.rs

//! Build manifest loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a manifest from disk (`loader.rs`).
//! - Validate basic invariants like unique outputs (`validate.rs`).
//! - Turn a validated manifest into genrule actions (`actions.rs`).

pub mod actions;
pub mod loader;
pub mod model;
pub mod validate;

pub use actions::build_actions;
pub use loader::{load_and_validate, load_from_path, DEFAULT_MANIFEST};
pub use model::{ConfigSection, Manifest, RawManifest, ResourcesSection, RuleConfig};
