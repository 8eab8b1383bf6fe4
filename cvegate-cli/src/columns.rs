//! Column surgery on delimited records: dropping and splicing.
//!
//! External column positions are 1-based; this module converts once at
//! parse time and works with 0-based indices internally.

use std::collections::BTreeSet;

use crate::error::CliError;

/// Set of input columns to erase before output columns are injected.
#[derive(Debug, Clone, Default)]
pub struct DropColumns(BTreeSet<usize>);

impl DropColumns {
    /// Parse a range list such as `1,3` or `2-4,7`. Positions are 1-based.
    pub fn parse(spec: &str) -> Result<Self, CliError> {
        let mut set = BTreeSet::new();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let parse_pos = |s: &str| -> Result<usize, CliError> {
                let n: usize = s
                    .parse()
                    .map_err(|_| CliError::Config(format!("invalid column index {s:?}")))?;
                if n < 1 {
                    return Err(CliError::Config(format!("illegal column index {n}")));
                }
                Ok(n - 1)
            };
            match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (parse_pos(start)?, parse_pos(end)?);
                    if end < start {
                        return Err(CliError::Config(format!("inverted range {part:?}")));
                    }
                    set.extend(start..=end);
                }
                None => {
                    set.insert(parse_pos(part)?);
                }
            }
        }
        Ok(Self(set))
    }

    /// Remove the configured columns from a record.
    pub fn apply(&self, fields: Vec<String>) -> Vec<String> {
        fields
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !self.0.contains(i))
            .map(|(_, field)| field)
            .collect()
    }

    /// Drop configured columns, then insert values at the given 0-based
    /// positions.
    ///
    /// Positions address the record *after* the erase step. Insertions
    /// are performed in ascending position order so earlier insertions
    /// do not shift later targets; out-of-range positions clamp to the
    /// end of the record.
    pub fn splice(
        &self,
        fields: &[String],
        mut insertions: Vec<(usize, String)>,
    ) -> Vec<String> {
        let mut out = self.apply(fields.to_vec());
        insertions.sort_by_key(|(at, _)| *at);
        for (at, value) in insertions {
            let at = at.min(out.len());
            out.insert(at, value);
        }
        out
    }
}
