use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sqlparser::ast::{BinaryOperator, Expr, SelectItem, SetExpr, Statement, TableFactor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::{debug, info, instrument};

use crate::adaptive::connector::error::{ConnectorError, Result};
use crate::adaptive::connector::io::csv_table;
use crate::adaptive::connector::model::{Cell, LEVEL_COLUMN, Table};

/// Destination of the sync flows and source of the level allow-lists.
pub trait Warehouse {
    /// Runs a read query and returns its result set.
    fn query(&mut self, sql: &str) -> Result<Table>;

    /// Replaces the content of `table_name` with `rows` in one step.
    fn bulk_replace(&mut self, table_name: &str, rows: &Table) -> Result<()>;

    /// Appends `rows` to `table_name`, creating it when missing.
    fn bulk_insert(&mut self, table_name: &str, rows: &Table) -> Result<()>;
}

/// Query selecting the levels flagged for export in the configuration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListQuery {
    pub table: String,
    pub level_column: String,
    pub flag_column: String,
}

impl AllowListQuery {
    pub fn new(table: &str, flag_column: &str) -> Self {
        Self {
            table: table.to_string(),
            level_column: LEVEL_COLUMN.to_string(),
            flag_column: flag_column.to_string(),
        }
    }

    pub fn to_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}=1",
            self.level_column, self.table, self.flag_column
        )
    }
}

/// Reads an allow-list: the first column of the result, in result order,
/// without blanks or repeats.
#[instrument(level = "debug", skip_all, fields(table = %query.table, flag = %query.flag_column))]
pub fn allowed_levels<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    query: &AllowListQuery,
) -> Result<Vec<String>> {
    let result = warehouse.query(&query.to_sql())?;
    if result.columns.is_empty() {
        return Ok(Vec::new());
    }
    let index = result.column_index(&query.level_column).unwrap_or(0);

    let mut seen = HashSet::new();
    let levels: Vec<String> = result
        .rows
        .iter()
        .map(|row| row[index].to_string())
        .filter(|level| !level.is_empty())
        .filter(|level| seen.insert(level.clone()))
        .collect();
    debug!(level_count = levels.len(), "read allow-listed levels");
    Ok(levels)
}

/// `SELECT <columns> FROM <table> [WHERE <column> = <literal>]`, the only
/// query shape the file-backed warehouses answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleSelect {
    pub table: String,
    /// `None` selects every column.
    pub columns: Option<Vec<String>>,
    pub filter: Option<(String, String)>,
}

impl SimpleSelect {
    pub fn parse(sql: &str) -> Result<Self> {
        let unsupported = |detail: &str| {
            ConnectorError::Warehouse(format!("unsupported query ({detail}): {sql}"))
        };

        let statements = Parser::parse_sql(&GenericDialect {}, sql)?;
        let [Statement::Query(query)] = statements.as_slice() else {
            return Err(unsupported("expected a single SELECT"));
        };
        let SetExpr::Select(select) = query.body.as_ref() else {
            return Err(unsupported("expected a plain SELECT"));
        };
        let [from] = select.from.as_slice() else {
            return Err(unsupported("expected exactly one table"));
        };
        if !from.joins.is_empty() {
            return Err(unsupported("joins are not supported"));
        }
        let TableFactor::Table { name, .. } = &from.relation else {
            return Err(unsupported("expected a table name"));
        };

        let mut columns = Vec::new();
        let mut wildcard = false;
        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) => columns.push(unquote(&expr.to_string())),
                SelectItem::Wildcard(_) => wildcard = true,
                _ => return Err(unsupported("expected column names or *")),
            }
        }

        let filter = match &select.selection {
            None => None,
            Some(Expr::BinaryOp {
                left,
                op: BinaryOperator::Eq,
                right,
            }) => Some((unquote(&left.to_string()), unquote(&right.to_string()))),
            Some(_) => return Err(unsupported("expected a single equality filter")),
        };

        Ok(Self {
            table: unquote(&name.to_string()),
            columns: if wildcard { None } else { Some(columns) },
            filter,
        })
    }

    /// Applies the selection to a stored table.
    pub fn evaluate(&self, table: &Table) -> Result<Table> {
        let lookup = |column: &str| {
            table.column_index(column).ok_or_else(|| {
                ConnectorError::Warehouse(format!(
                    "column '{column}' does not exist in {}",
                    self.table
                ))
            })
        };

        let projection: Vec<usize> = match &self.columns {
            Some(columns) => columns
                .iter()
                .map(|column| lookup(column.as_str()))
                .collect::<Result<_>>()?,
            None => (0..table.columns.len()).collect(),
        };
        let filter = match &self.filter {
            Some((column, literal)) => Some((lookup(column.as_str())?, literal.as_str())),
            None => None,
        };

        let mut result = Table::new(
            projection
                .iter()
                .map(|index| table.columns[*index].clone())
                .collect(),
        );
        for row in &table.rows {
            if let Some((index, literal)) = filter {
                if !cell_matches(&row[index], literal) {
                    continue;
                }
            }
            result
                .rows
                .push(projection.iter().map(|index| row[*index].clone()).collect());
        }
        Ok(result)
    }
}

fn unquote(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !matches!(ch, '"' | '\'' | '`' | '[' | ']'))
        .collect()
}

fn cell_matches(cell: &Cell, literal: &str) -> bool {
    let text = cell.to_string();
    let as_number = |value: &str| match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(1.0),
        "false" => Some(0.0),
        other => other.parse::<f64>().ok(),
    };
    match (as_number(&text), as_number(literal)) {
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => text.eq_ignore_ascii_case(literal),
    }
}

/// A load recorded by [`MemoryWarehouse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRecord {
    pub table: String,
    pub replace: bool,
    pub rows: usize,
}

/// Warehouse kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    tables: BTreeMap<String, Table>,
    pub queries: Vec<String>,
    pub loads: Vec<LoadRecord>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table, replacing any previous content.
    pub fn with_table(mut self, name: &str, table: Table) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

impl Warehouse for MemoryWarehouse {
    fn query(&mut self, sql: &str) -> Result<Table> {
        self.queries.push(sql.to_string());
        let select = SimpleSelect::parse(sql)?;
        let table = self.tables.get(&select.table).ok_or_else(|| {
            ConnectorError::Warehouse(format!("table {} does not exist", select.table))
        })?;
        select.evaluate(table)
    }

    fn bulk_replace(&mut self, table_name: &str, rows: &Table) -> Result<()> {
        self.tables.insert(table_name.to_string(), rows.clone());
        self.loads.push(LoadRecord {
            table: table_name.to_string(),
            replace: true,
            rows: rows.len(),
        });
        Ok(())
    }

    fn bulk_insert(&mut self, table_name: &str, rows: &Table) -> Result<()> {
        match self.tables.get_mut(table_name) {
            Some(existing) => {
                ensure_same_columns(table_name, &existing.columns, &rows.columns)?;
                existing.rows.extend(rows.rows.iter().cloned());
            }
            None => {
                self.tables.insert(table_name.to_string(), rows.clone());
            }
        }
        self.loads.push(LoadRecord {
            table: table_name.to_string(),
            replace: false,
            rows: rows.len(),
        });
        Ok(())
    }
}

fn ensure_same_columns(table_name: &str, existing: &[String], incoming: &[String]) -> Result<()> {
    if existing == incoming {
        Ok(())
    } else {
        Err(ConnectorError::Warehouse(format!(
            "cannot append to {table_name}: columns [{}] do not match [{}]",
            incoming.join(", "),
            existing.join(", ")
        )))
    }
}

/// Warehouse stored as one `<table>.csv` file per table in a directory.
#[derive(Debug, Clone)]
pub struct CsvWarehouse {
    root: PathBuf,
}

impl CsvWarehouse {
    /// Opens (and creates when needed) the warehouse directory.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// File backing the given table.
    pub fn path_for(&self, table_name: &str) -> Result<PathBuf> {
        if table_name.is_empty()
            || table_name.contains(['/', '\\'])
            || table_name.starts_with('.')
        {
            return Err(ConnectorError::Warehouse(format!(
                "invalid table name '{table_name}'"
            )));
        }
        Ok(self.root.join(format!("{table_name}.csv")))
    }

    fn read(&self, table_name: &str) -> Result<Table> {
        let path = self.path_for(table_name)?;
        if !path.exists() {
            return Err(ConnectorError::Warehouse(format!(
                "table {table_name} does not exist in {}",
                self.root.display()
            )));
        }
        csv_table::read_table(File::open(path)?)
    }
}

impl Warehouse for CsvWarehouse {
    fn query(&mut self, sql: &str) -> Result<Table> {
        let select = SimpleSelect::parse(sql)?;
        let table = self.read(&select.table)?;
        select.evaluate(&table)
    }

    #[instrument(level = "debug", skip(self, rows), fields(rows = rows.len()))]
    fn bulk_replace(&mut self, table_name: &str, rows: &Table) -> Result<()> {
        let path = self.path_for(table_name)?;
        let staging = path.with_extension("csv.partial");
        csv_table::write_table(File::create(&staging)?, rows, true)?;
        fs::rename(&staging, &path)?;
        info!(path = %path.display(), "replaced table file");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, rows), fields(rows = rows.len()))]
    fn bulk_insert(&mut self, table_name: &str, rows: &Table) -> Result<()> {
        let path = self.path_for(table_name)?;
        if !path.exists() {
            return self.bulk_replace(table_name, rows);
        }

        let existing = self.read(table_name)?;
        ensure_same_columns(table_name, &existing.columns, &rows.columns)?;
        let file = OpenOptions::new().append(true).open(&path)?;
        csv_table::write_table(file, rows, false)?;
        Ok(())
    }
}
