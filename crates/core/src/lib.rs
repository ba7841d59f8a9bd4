//! Core types for jadep: Bazel labels, rules and packages, class names,
//! configuration, and the error taxonomy shared by every crate in the
//! workspace.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod class_name;
pub mod config;
pub mod error;
pub mod label;
pub mod rules;
pub mod sync;

pub use class_name::ClassName;
pub use config::PkgLoaderConfig;
pub use error::{Error, Result};
pub use label::Label;
pub use rules::{AttrValue, Package, PackageGroup, Rule};
pub use sync::FutureValue;

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
