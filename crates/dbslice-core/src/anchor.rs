//! Anchor selection.
//!
//! An anchor is the seed table/row selection a sampling run grows from.
//! The text format is the CLI's `--anchor` value: a bare table name means
//! "pick a random handful of rows", `table#column=v1,v2` means "exactly
//! the rows where column matches one of these values".

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DbSliceError, Result};

/// Rows fetched by a random anchor when no explicit selection is given.
pub const DEFAULT_RANDOM_LIMIT: u32 = 5;

/// How the starting row-set of a run is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorMode {
    /// Order-randomized fetch of up to `limit` whole rows.
    Random { limit: u32 },
    /// All rows where `column` equals any of `values`.
    Explicit { column: String, values: Vec<String> },
}

/// The seed selection for one sampling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub table: String,
    pub mode: AnchorMode,
}

impl AnchorSpec {
    pub fn random(table: &str) -> Self {
        Self {
            table: table.to_string(),
            mode: AnchorMode::Random {
                limit: DEFAULT_RANDOM_LIMIT,
            },
        }
    }

    pub fn explicit(table: &str, column: &str, values: Vec<String>) -> Self {
        Self {
            table: table.to_string(),
            mode: AnchorMode::Explicit {
                column: column.to_string(),
                values,
            },
        }
    }

    /// Parse the `table` / `table#column=v1,v2,...` text format.
    ///
    /// `table#column=` with no values degrades to a random anchor, matching
    /// the flag's documented behavior.
    pub fn parse(input: &str) -> Result<Self> {
        let re = Regex::new(r"^(?P<table>\w+)(?:#(?P<column>\w+)=(?P<values>[\w,]*))?$")
            .expect("anchor regex is valid");
        let caps = re.captures(input.trim()).ok_or_else(|| DbSliceError::AnchorSpec {
            input: input.to_string(),
        })?;

        let table = caps["table"].to_string();
        let column = caps.name("column").map(|m| m.as_str().to_string());
        let values: Vec<String> = caps
            .name("values")
            .map(|m| {
                m.as_str()
                    .split(',')
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        match column {
            Some(column) if !values.is_empty() => Ok(Self::explicit(&table, &column, values)),
            _ => Ok(Self::random(&table)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_table_is_random() {
        let spec = AnchorSpec::parse("orders").unwrap();
        assert_eq!(spec.table, "orders");
        assert_eq!(spec.mode, AnchorMode::Random { limit: 5 });
    }

    #[test]
    fn test_parse_explicit_values() {
        let spec = AnchorSpec::parse("orders#id=7,12").unwrap();
        assert_eq!(
            spec.mode,
            AnchorMode::Explicit {
                column: "id".to_string(),
                values: vec!["7".to_string(), "12".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_single_value() {
        let spec = AnchorSpec::parse("customers#id=3").unwrap();
        assert_eq!(spec.table, "customers");
        assert_eq!(
            spec.mode,
            AnchorMode::Explicit {
                column: "id".to_string(),
                values: vec!["3".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_empty_value_list_falls_back_to_random() {
        let spec = AnchorSpec::parse("orders#id=").unwrap();
        assert_eq!(spec.mode, AnchorMode::Random { limit: 5 });
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(AnchorSpec::parse("orders#id").is_err());
        assert!(AnchorSpec::parse("ord ers").is_err());
        assert!(AnchorSpec::parse("orders;drop").is_err());
        assert!(AnchorSpec::parse("").is_err());
    }

    #[test]
    fn test_parse_trailing_comma_ignored() {
        let spec = AnchorSpec::parse("t#c=1,").unwrap();
        assert_eq!(
            spec.mode,
            AnchorMode::Explicit {
                column: "c".to_string(),
                values: vec!["1".to_string()],
            }
        );
    }
}
