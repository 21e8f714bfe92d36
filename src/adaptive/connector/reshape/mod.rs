//! Table transforms applied between extraction and loading.
//!
//! Every function takes its input by reference and returns a fresh table.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::adaptive::connector::config::ColumnExclusion;
use crate::adaptive::connector::error::{ConnectorError, Result};
use crate::adaptive::connector::model::{Cell, LEVEL_COLUMN, Table, VALUE_COLUMN, YEAR_COLUMN};

/// Removes every whitespace character from a column name.
pub fn normalize_column_name(name: &str) -> String {
    name.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// Returns a copy of `table` whose header names carry no whitespace.
pub fn normalize_column_names(table: &Table) -> Table {
    Table {
        columns: table
            .columns
            .iter()
            .map(|column| normalize_column_name(column))
            .collect(),
        rows: table.rows.clone(),
    }
}

fn require_column(table: &Table, column: &str) -> Result<usize> {
    table
        .column_index(column)
        .ok_or_else(|| ConnectorError::SchemaMismatch {
            column: column.to_string(),
        })
}

/// Melts the yearly rollup columns of a wide export into one row per
/// (identity, year).
///
/// Only the identity columns and the columns labelled `start_year..=end_year`
/// are kept; month and quarter columns are discarded. Output rows are grouped
/// by year, and within a year follow the input order. `Value` keeps the raw
/// cell; coercion happens in [`filter_and_clean`].
#[instrument(level = "debug", skip(table, id_columns), fields(rows = table.len()))]
pub fn wide_to_long(
    table: &Table,
    id_columns: &[&str],
    start_year: i32,
    end_year: i32,
) -> Result<Table> {
    let table = normalize_column_names(table);

    let id_indices: Vec<usize> = id_columns
        .iter()
        .map(|column| require_column(&table, column))
        .collect::<Result<_>>()?;
    let year_columns: Vec<(String, usize)> = (start_year..=end_year)
        .map(|year| {
            let label = year.to_string();
            require_column(&table, &label).map(|index| (label, index))
        })
        .collect::<Result<_>>()?;

    let mut columns: Vec<String> = id_columns.iter().map(|c| c.to_string()).collect();
    columns.push(YEAR_COLUMN.to_string());
    columns.push(VALUE_COLUMN.to_string());

    let mut long = Table::new(columns);
    long.rows.reserve(table.len() * year_columns.len());
    for (label, year_index) in &year_columns {
        for row in &table.rows {
            let mut cells: Vec<Cell> = id_indices.iter().map(|index| row[*index].clone()).collect();
            cells.push(Cell::Text(label.clone()));
            cells.push(row[*year_index].clone());
            long.rows.push(cells);
        }
    }

    debug!(long_rows = long.len(), years = year_columns.len(), "melted year columns");
    Ok(long)
}

/// Keeps rows whose `LevelName` is allow-listed and whose `Value` coerces to
/// a finite number; the kept values are stored as numbers.
///
/// Rows with non-numeric values (such as `N/A` placeholders for suppressed
/// cells) are dropped without error. Duplicates are passed through.
#[instrument(level = "debug", skip_all, fields(rows = table.len(), allowed = allowed_levels.len()))]
pub fn filter_and_clean(table: &Table, allowed_levels: &HashSet<String>) -> Result<Table> {
    let level_index = require_column(table, LEVEL_COLUMN)?;
    let value_index = require_column(table, VALUE_COLUMN)?;

    let mut cleaned = Table::new(table.columns.clone());
    let mut dropped_levels = 0usize;
    let mut dropped_values = 0usize;
    for row in &table.rows {
        let allowed = row[level_index]
            .as_text()
            .is_some_and(|level| allowed_levels.contains(level));
        if !allowed {
            dropped_levels += 1;
            continue;
        }
        let Some(value) = row[value_index].to_number() else {
            dropped_values += 1;
            continue;
        };
        let mut cells = row.clone();
        cells[value_index] = Cell::Number(value);
        cleaned.rows.push(cells);
    }

    debug!(
        kept = cleaned.len(),
        dropped_levels, dropped_values, "filtered long table"
    );
    Ok(cleaned)
}

/// Drops the columns named by `exclusion`, ignoring names the table lacks.
///
/// Names are compared with whitespace removed, so `Annual Salary` also
/// removes `AnnualSalary`.
pub fn drop_columns(table: &Table, exclusion: &ColumnExclusion) -> Table {
    let excluded: HashSet<String> = exclusion
        .columns
        .iter()
        .map(|column| normalize_column_name(column))
        .collect();
    let keep: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| !excluded.contains(&normalize_column_name(column)))
        .map(|(index, _)| index)
        .collect();

    Table {
        columns: keep.iter().map(|index| table.columns[*index].clone()).collect(),
        rows: table
            .rows
            .iter()
            .map(|row| keep.iter().map(|index| row[*index].clone()).collect())
            .collect(),
    }
}
