use tracing::{debug, info, instrument};

use crate::adaptive::connector::config::ColumnExclusion;
use crate::adaptive::connector::error::Result;
use crate::adaptive::connector::io::csv_table;
use crate::adaptive::connector::io::request::ApiMethod;
use crate::adaptive::connector::io::response::extract_payload;
use crate::adaptive::connector::model::Table;
use crate::adaptive::connector::reshape::{drop_columns, normalize_column_names};

/// Exports personnel records level by level and concatenates the results.
///
/// `export` performs one `exportConfigurableModelData` call and returns the
/// raw response. Levels without personnel contribute no rows; when no level
/// has data the result is an empty table. Excluded columns are removed before
/// header whitespace is normalized.
#[instrument(level = "info", skip_all, fields(levels = levels.len(), exclusion = %exclusion.name))]
pub fn aggregate_personnel<F>(
    levels: &[String],
    exclusion: &ColumnExclusion,
    mut export: F,
) -> Result<Table>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut frames = Vec::new();
    for level in levels {
        let xml = export(level)?;
        let Some(text) = extract_payload(ApiMethod::ExportConfigurableModelData, &xml)?.into_text()
        else {
            debug!(%level, "no personnel data for level");
            continue;
        };

        let frame = csv_table::decode(&text)?;
        let frame = normalize_column_names(&drop_columns(&frame, exclusion));
        debug!(%level, rows = frame.len(), "collected personnel records");
        frames.push(frame);
    }

    let contributing = frames.len();
    let combined = Table::concat(frames);
    info!(
        rows = combined.len(),
        contributing_levels = contributing,
        "aggregated personnel records"
    );
    Ok(combined)
}
