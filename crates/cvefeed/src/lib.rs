#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`schema`]: NVD JSON 1.0 feed subset (serde)
//! - [`vuln`]: `VulnRecord`, the `Vulnerability` projection trait
//! - [`node`]: configuration tree (`LogicalNode`, `CpeMatch`)
//! - [`version`]: `smart_version_cmp` total order over version strings
//! - [`matcher`]: tree evaluation against an inventory
//! - [`index`]: product-name inverted index (`ProductIndex`)
//! - [`cache`]: single-flight result cache (`MatchCache`, `MatchResult`)
//! - [`dictionary`]: feed loading and override application (`Dictionary`)
//! - [`error`]: domain error type (`CveFeedError`)

pub mod cache;
pub mod dictionary;
pub mod error;
pub mod index;
pub mod matcher;
mod merge;
pub mod node;
pub mod schema;
pub mod version;
pub mod vuln;

// --- 주요 타입 re-export ---

pub use cache::{CacheStats, MatchCache, MatchResult};
pub use dictionary::Dictionary;
pub use error::CveFeedError;
pub use index::ProductIndex;
pub use matcher::match_inventory;
pub use node::{CpeMatch, LogicalNode, Operator};
pub use version::smart_version_cmp;
pub use vuln::{CvssMetric, VulnRecord, Vulnerability};
