use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity columns shared by the account export and its long form.
pub const ACCOUNT_ID_COLUMNS: [&str; 3] = ["AccountName", "AccountCode", "LevelName"];
/// Column holding the level a row belongs to.
pub const LEVEL_COLUMN: &str = "LevelName";
/// Column produced by melting the year columns.
pub const YEAR_COLUMN: &str = "Year";
/// Column carrying the melted value.
pub const VALUE_COLUMN: &str = "Value";

/// A single cell of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Cell {
    /// Raw text as delivered by the export.
    Text(String),
    /// Coerced numeric value.
    Number(f64),
    /// Missing value.
    Null,
}

impl Cell {
    /// Builds a cell from a raw CSV field; empty fields become [`Cell::Null`].
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Cell::Null
        } else {
            Cell::Text(field.to_string())
        }
    }

    /// Returns the textual content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Coerces the cell into a finite number.
    ///
    /// Placeholders such as `N/A`, blanks, and non-finite spellings (`nan`,
    /// `inf`) yield `None`.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) if value.is_finite() => Some(*value),
            Cell::Text(value) => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite()),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(value) => f.write_str(value),
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Null => Ok(()),
        }
    }
}

/// In-memory tabular data passed between the pipeline stages.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates an empty table with the given header.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Cells of the named column, top to bottom.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Cell> + 'a> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Row-wise concatenation of several tables.
    ///
    /// The resulting header is the union of all headers in first-seen order;
    /// cells a source table does not carry are filled with [`Cell::Null`].
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for table in &tables {
            for column in &table.columns {
                if !positions.contains_key(column) {
                    positions.insert(column.clone(), columns.len());
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(Table::len).sum());
        for table in tables {
            let targets: Vec<usize> = table
                .columns
                .iter()
                .map(|column| positions[column])
                .collect();
            for row in table.rows {
                let mut cells = vec![Cell::Null; columns.len()];
                for (cell, target) in row.into_iter().zip(&targets) {
                    cells[*target] = cell;
                }
                rows.push(cells);
            }
        }

        Table { columns, rows }
    }
}
