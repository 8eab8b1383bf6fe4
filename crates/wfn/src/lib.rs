#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`attributes`]: 11-field attribute model (`Attributes`, `Component`) and
//!   the matching relation
//! - [`uri`]: CPE 2.2 URI binding (`parse_uri`, `bind_uri`)
//! - [`formatted`]: CPE 2.3 formatted-string binding (`parse_formatted`,
//!   `bind_formatted`)
//! - [`quoting`]: WFN quoting helpers (`wfnize`, `strip_slashes`)
//! - [`error`]: domain error type (`CpeError`)

pub mod attributes;
pub mod error;
pub mod formatted;
pub mod quoting;
pub mod uri;

// --- 주요 타입 re-export ---

pub use attributes::{Attributes, Component};
pub use error::CpeError;
pub use formatted::{bind_formatted, parse_formatted};
pub use quoting::{strip_slashes, wfnize};
pub use uri::{bind_uri, parse_uri};
