use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::adaptive::connector::error::{ConnectorError, Result};
use crate::adaptive::connector::io::warehouse::AllowListQuery;

/// Compensation fields removed from personnel exports before loading.
pub const COMPENSATION_COLUMNS: [&str; 8] = [
    "Salary",
    "Annual Salary",
    "Hourly Rate",
    "Stipend",
    "Bonus",
    "Benefits",
    "Total Compensation",
    "Pay Rate",
];

/// Name under which [`COMPENSATION_COLUMNS`] is published.
pub const COMPENSATION_EXCLUSION_NAME: &str = "compensation-v2";

/// Decides what happens to the remaining flows once one of them failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failed flow.
    Abort,
    /// Run every flow; the run still fails if any flow did.
    #[default]
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = ConnectorError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(ConnectorError::Config(format!(
                "FAILURE_POLICY must be 'abort' or 'continue', found '{other}'"
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

/// A named list of column identifiers to drop from an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnExclusion {
    pub name: String,
    pub columns: Vec<String>,
}

impl ColumnExclusion {
    /// The compensation list shipped with this release.
    pub fn compensation() -> Self {
        Self {
            name: COMPENSATION_EXCLUSION_NAME.to_string(),
            columns: COMPENSATION_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Credentials sent in every request envelope.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings for one connector run, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub credentials: Credentials,
    pub caller_name: String,
    pub version: String,
    pub start_year: i32,
    pub end_year: i32,
    pub personnel_start: String,
    pub personnel_end: String,
    pub accounts_table: String,
    pub personnel_table: String,
    pub levels_table: String,
    pub personnel_exclusion: ColumnExclusion,
    pub failure_policy: FailurePolicy,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConnectorError::Config(format!("{key} is not set")))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let year = |key: &str| -> Result<i32> {
            let raw = required(key)?;
            raw.trim().parse::<i32>().map_err(|_| {
                ConnectorError::Config(format!("{key} must be a year, found '{raw}'"))
            })
        };

        let start_year = year("START_YEAR")?;
        let end_year = year("END_YEAR")?;
        if start_year > end_year {
            return Err(ConnectorError::Config(format!(
                "START_YEAR ({start_year}) is after END_YEAR ({end_year})"
            )));
        }

        let personnel_exclusion = match lookup("PERSONNEL_EXCLUDED_COLUMNS") {
            Some(list) if !list.trim().is_empty() => ColumnExclusion {
                name: "PERSONNEL_EXCLUDED_COLUMNS".to_string(),
                columns: list
                    .split(',')
                    .map(str::trim)
                    .filter(|column| !column.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            _ => ColumnExclusion::compensation(),
        };

        let failure_policy = match lookup("FAILURE_POLICY") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => FailurePolicy::default(),
        };

        Ok(Self {
            api_url: required("API_URL")?,
            credentials: Credentials {
                login: required("API_USER")?,
                password: required("API_PWD")?,
            },
            caller_name: required("CALLER_NAME")?,
            version: required("VERSION")?,
            start_year,
            end_year,
            personnel_start: required("PERSONNEL_START")?,
            personnel_end: required("PERSONNEL_END")?,
            accounts_table: optional("ACCOUNTS_TABLE", "Adaptive_Data"),
            personnel_table: optional("PERSONNEL_TABLE", "Adaptive_Personnel"),
            levels_table: optional("LEVELS_TABLE", "custom.Adaptive_Levels"),
            personnel_exclusion,
            failure_policy,
        })
    }

    /// Query returning the levels whose account values may be exported.
    pub fn accounts_levels_query(&self) -> AllowListQuery {
        AllowListQuery::new(&self.levels_table, "Export")
    }

    /// Query returning the levels whose personnel records may be exported.
    pub fn personnel_levels_query(&self) -> AllowListQuery {
        AllowListQuery::new(&self.levels_table, "ExportPersonnel")
    }
}
