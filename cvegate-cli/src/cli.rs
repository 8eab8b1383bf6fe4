//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line surface and its translation
//! into a validated [`ProcessorConfig`]. It is purely declarative with
//! no side effects or I/O.

use std::path::PathBuf;

use clap::Parser;

use crate::columns::DropColumns;
use crate::error::CliError;
use crate::processor::ProcessorConfig;

/// cvegate -- match CPE inventories in delimited records against NVD
/// vulnerability feeds and emit one output record per matching CVE.
///
/// Reads records from stdin and writes results to stdout. All column
/// positions are 1-based.
#[derive(Parser, Debug)]
#[command(name = "cvegate", version, about, long_about = None)]
pub struct Cli {
    /// NVD JSON feed files (plain or gzip'ed).
    #[arg(required = true, value_name = "FEED")]
    pub feeds: Vec<PathBuf>,

    /// Number of concurrent matcher workers.
    #[arg(long, default_value_t = 1)]
    pub nproc: usize,

    /// Input column containing the CPE list.
    #[arg(long)]
    pub cpe: usize,

    /// Output column for the CVE identifier.
    #[arg(long)]
    pub cve: usize,

    /// Output column for the matching-CPE list; 0 disables the column.
    #[arg(long, default_value_t = 0)]
    pub matches: usize,

    /// Output column for the CWE list.
    #[arg(long)]
    pub cwe: Option<usize>,

    /// Output column for max(CVSS v2, CVSS v3) base score.
    #[arg(long)]
    pub cvss: Option<usize>,

    /// Output column for the CVSS v2 base score.
    #[arg(long)]
    pub cvss2: Option<usize>,

    /// Output column for the CVSS v3 base score.
    #[arg(long)]
    pub cvss3: Option<usize>,

    /// Provider tag inserted at the provider-field column.
    #[arg(long)]
    pub provider: Option<String>,

    /// Output column for the provider tag.
    #[arg(long = "provider-field")]
    pub provider_field: Option<usize>,

    /// Cache byte budget: 0 removes the limit, negative disables caching.
    #[arg(long = "cache-size", default_value_t = 0, allow_negative_numbers = true)]
    pub cache_size: i64,

    /// Build and use the product index: faster, but a record whose only
    /// product terms are wildcards is reachable solely through the
    /// wildcard bucket.
    #[arg(long)]
    pub idxd: bool,

    /// Reject matches of rules whose version is ANY.
    #[arg(long = "require-version")]
    pub require_version: bool,

    /// Input field delimiter.
    #[arg(short = 'd', default_value_t = '\t')]
    pub in_field_sep: char,

    /// Inner input delimiter separating list elements within a column.
    #[arg(long = "d2", default_value_t = ',')]
    pub in_list_sep: char,

    /// Output field delimiter.
    #[arg(short = 'o', default_value_t = '\t')]
    pub out_field_sep: char,

    /// Inner output delimiter separating list elements within a column.
    #[arg(long = "o2", default_value_t = ',')]
    pub out_list_sep: char,

    /// Comma-separated columns to erase before inserting output columns,
    /// e.g. `1,3` or `2-4`.
    #[arg(short = 'e', value_name = "RANGES")]
    pub erase: Option<String>,

    /// Override feed applied on top of the dictionary; repeatable.
    #[arg(long = "override", value_name = "FEED")]
    pub overrides: Vec<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Build the validated processor configuration.
    pub fn processor_config(&self) -> Result<ProcessorConfig, CliError> {
        let provider = match (&self.provider, self.provider_field) {
            (Some(tag), Some(at)) => Some((tag.clone(), at)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(CliError::Config(
                    "--provider requires --provider-field".to_owned(),
                ));
            }
            (None, Some(_)) => {
                return Err(CliError::Config(
                    "--provider-field requires --provider".to_owned(),
                ));
            }
        };
        let drop = match &self.erase {
            Some(spec) => DropColumns::parse(spec)?,
            None => DropColumns::default(),
        };
        let config = ProcessorConfig {
            workers: self.nproc,
            cpes_at: self.cpe,
            cves_at: self.cve,
            matches_at: self.matches,
            cwes_at: self.cwe,
            cvss_at: self.cvss,
            cvss2_at: self.cvss2,
            cvss3_at: self.cvss3,
            provider,
            drop,
            in_field_sep: self.in_field_sep,
            in_list_sep: self.in_list_sep,
            out_field_sep: self.out_field_sep,
            out_list_sep: self.out_list_sep,
        };
        config.validate()?;
        Ok(config)
    }
}
