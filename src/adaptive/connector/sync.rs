use std::collections::HashSet;
use std::error::Error as _;
use std::fmt;

use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adaptive::connector::config::{Config, FailurePolicy};
use crate::adaptive::connector::error::{ConnectorError, Result};
use crate::adaptive::connector::io::csv_table;
use crate::adaptive::connector::io::notify::{Notification, Notifier};
use crate::adaptive::connector::io::request::ApiMethod;
use crate::adaptive::connector::io::response::extract_required_payload;
use crate::adaptive::connector::io::transport::{AdaptiveClient, ApiTransport};
use crate::adaptive::connector::io::warehouse::{Warehouse, allowed_levels};
use crate::adaptive::connector::model::{ACCOUNT_ID_COLUMNS, Table};
use crate::adaptive::connector::personnel::aggregate_personnel;
use crate::adaptive::connector::reshape::{filter_and_clean, wide_to_long};

/// The independent load flows of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Accounts,
    Personnel,
}

impl Flow {
    pub const ALL: [Flow; 2] = [Flow::Accounts, Flow::Personnel];
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Accounts => write!(f, "accounts"),
            Flow::Personnel => write!(f, "personnel"),
        }
    }
}

/// Converts an `exportData` response into the filtered long table.
///
/// Pure: the same response and allow-list always yield the same table.
pub fn parse_accounts_export(
    xml: &str,
    allowed: &HashSet<String>,
    start_year: i32,
    end_year: i32,
) -> Result<Table> {
    let text = extract_required_payload(ApiMethod::ExportData, xml)?;
    let wide = csv_table::decode(&text)?;
    let long = wide_to_long(&wide, &ACCOUNT_ID_COLUMNS, start_year, end_year)?;
    let cleaned = filter_and_clean(&long, allowed)?;
    info!(
        rows = cleaned.len(),
        "retrieved {} filtered and reshaped records",
        cleaned.len()
    );
    Ok(cleaned)
}

/// Exports account values, reshapes them, and replaces the accounts table.
///
/// Returns the number of rows loaded.
#[instrument(level = "info", skip_all, fields(table = %client.config().accounts_table))]
pub fn sync_accounts<T, W>(client: &AdaptiveClient<'_, T>, warehouse: &mut W) -> Result<usize>
where
    T: ApiTransport,
    W: Warehouse + ?Sized,
{
    let config = client.config();
    let allowed: HashSet<String> =
        allowed_levels(warehouse, &config.accounts_levels_query())?
            .into_iter()
            .collect();
    let xml = client.export_data()?;
    let table = parse_accounts_export(&xml, &allowed, config.start_year, config.end_year)?;
    warehouse.bulk_replace(&config.accounts_table, &table)?;
    info!(
        rows = table.len(),
        "inserted {} records to {}",
        table.len(),
        config.accounts_table
    );
    Ok(table.len())
}

/// Exports personnel records for every allow-listed level and replaces the
/// personnel table with their concatenation, even when it is empty.
#[instrument(level = "info", skip_all, fields(table = %client.config().personnel_table))]
pub fn sync_personnel<T, W>(client: &AdaptiveClient<'_, T>, warehouse: &mut W) -> Result<usize>
where
    T: ApiTransport,
    W: Warehouse + ?Sized,
{
    let config = client.config();
    let levels = allowed_levels(warehouse, &config.personnel_levels_query())?;
    let table = aggregate_personnel(&levels, &config.personnel_exclusion, |level| {
        client.export_configurable_model_data(level)
    })?;
    warehouse.bulk_replace(&config.personnel_table, &table)?;
    info!(
        rows = table.len(),
        "inserted {} records to {}",
        table.len(),
        config.personnel_table
    );
    Ok(table.len())
}

/// Result of one flow within a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowOutcome {
    pub flow: Flow,
    pub table: String,
    /// Rows loaded, when the flow succeeded.
    pub rows: Option<usize>,
    /// Failure description including its causes, when the flow failed.
    pub error: Option<String>,
}

/// Everything a run reports back: per-flow outcomes and the diagnostic text
/// handed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub policy: FailurePolicy,
    pub outcomes: Vec<FlowOutcome>,
    /// Flows not attempted because an earlier flow failed under
    /// [`FailurePolicy::Abort`].
    pub skipped: Vec<Flow>,
    pub diagnostics: Vec<String>,
}

impl RunReport {
    /// True when every attempted flow succeeded and none was skipped.
    pub fn success(&self) -> bool {
        self.skipped.is_empty() && self.outcomes.iter().all(|outcome| outcome.error.is_none())
    }

    pub fn diagnostic_text(&self) -> String {
        self.diagnostics.join("\n")
    }

    pub fn notification(&self) -> Notification {
        Notification::job_status(self.success(), &self.diagnostic_text())
    }
}

/// Renders an error together with its chain of causes.
///
/// The immediate source is already part of the error message, so the chain
/// starts one level below it.
pub fn describe_error(err: &ConnectorError) -> String {
    let mut text = err.to_string();
    let mut source = err.source().and_then(|inner| inner.source());
    while let Some(cause) = source {
        text.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    text
}

/// Runs the requested flows in order and collects their outcomes.
///
/// Under [`FailurePolicy::Continue`] a failed flow does not prevent the next
/// one from running; under [`FailurePolicy::Abort`] the remaining flows are
/// skipped.
#[instrument(level = "info", skip_all, fields(%policy))]
pub fn run<T, W>(
    client: &AdaptiveClient<'_, T>,
    warehouse: &mut W,
    flows: &[Flow],
    policy: FailurePolicy,
) -> RunReport
where
    T: ApiTransport,
    W: Warehouse + ?Sized,
{
    let config: &Config = client.config();
    let mut report = RunReport {
        run_id: Uuid::new_v4(),
        policy,
        outcomes: Vec::new(),
        skipped: Vec::new(),
        diagnostics: Vec::new(),
    };
    info!(run_id = %report.run_id, "starting Adaptive sync run");

    for (position, flow) in flows.iter().enumerate() {
        let (table, result) = match flow {
            Flow::Accounts => (&config.accounts_table, sync_accounts(client, warehouse)),
            Flow::Personnel => (&config.personnel_table, sync_personnel(client, warehouse)),
        };

        match result {
            Ok(rows) => {
                report
                    .diagnostics
                    .push(format!("Inserted {rows} records to {table}."));
                report.outcomes.push(FlowOutcome {
                    flow: *flow,
                    table: table.clone(),
                    rows: Some(rows),
                    error: None,
                });
            }
            Err(err) => {
                let description = describe_error(&err);
                error!(%flow, error = %description, "sync flow failed");
                report
                    .diagnostics
                    .push(format!("The {flow} sync failed: {description}"));
                report.outcomes.push(FlowOutcome {
                    flow: *flow,
                    table: table.clone(),
                    rows: None,
                    error: Some(description),
                });
                if policy == FailurePolicy::Abort {
                    report.skipped.extend_from_slice(&flows[position + 1..]);
                    for skipped in &report.skipped {
                        warn!(flow = %skipped, "skipping flow after earlier failure");
                        report
                            .diagnostics
                            .push(format!("The {skipped} sync was skipped."));
                    }
                    break;
                }
            }
        }
    }

    report
}

/// Runs the flows and always hands the outcome to the notifier.
///
/// Only a failure to deliver the notification is returned as an error; a
/// failed flow is reported through the [`RunReport`].
pub fn run_and_notify<T, W, N>(
    client: &AdaptiveClient<'_, T>,
    warehouse: &mut W,
    notifier: &mut N,
    flows: &[Flow],
    policy: FailurePolicy,
) -> Result<RunReport>
where
    T: ApiTransport,
    W: Warehouse + ?Sized,
    N: Notifier + ?Sized,
{
    let report = run(client, warehouse, flows, policy);
    notifier.notify(&report.notification())?;
    Ok(report)
}
