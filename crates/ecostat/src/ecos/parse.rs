//! Decoding of ECOS JSON bodies into domain types.
//!
//! A body carries either the requested table (`{"StatisticSearch": {"row": [...]}}`)
//! or a `RESULT` object with a provider code and message.

use serde_json::{Map, Value};
use tracing::debug;

use crate::stats::{Cycle, ProviderFailure, SeriesData, StatisticItem};

pub const ITEM_LIST_TABLE: &str = "StatisticItemList";
pub const SERIES_TABLE: &str = "StatisticSearch";

/// Label used when a row carries no hierarchical item names.
const TOTAL_LABEL: &str = "Total";

type Row = Map<String, Value>;

/// Reads a column as text; numbers are rendered as-is, null and missing are `None`.
fn text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn provider_result(body: &Value) -> Option<ProviderFailure> {
    let result = body.get("RESULT")?;
    let code = result.get("CODE").and_then(Value::as_str).unwrap_or("UNKNOWN");
    let message = result
        .get("MESSAGE")
        .and_then(Value::as_str)
        .unwrap_or("Provider returned an error without a message");
    Some(ProviderFailure::new(code, message))
}

/// Returns the rows of `table`, the provider's `RESULT` failure, or `MALFORMED`.
fn table_rows<'a>(body: &'a Value, table: &str) -> Result<Vec<&'a Row>, ProviderFailure> {
    if let Some(rows) = body.get(table).and_then(|t| t.get("row")) {
        return match rows {
            Value::Array(rows) => Ok(rows.iter().filter_map(Value::as_object).collect()),
            Value::Object(row) => Ok(vec![row]),
            _ => Err(ProviderFailure::new(
                ProviderFailure::MALFORMED,
                format!("{} rows are not a list", table),
            )),
        };
    }

    if let Some(failure) = provider_result(body) {
        return Err(failure);
    }

    Err(ProviderFailure::new(
        ProviderFailure::MALFORMED,
        "Unknown response format",
    ))
}

/// Parses a `StatisticItemList` body. Rows with an unknown cycle are skipped.
pub fn parse_item_list(body: &Value) -> Result<Vec<StatisticItem>, ProviderFailure> {
    let rows = table_rows(body, ITEM_LIST_TABLE)?;
    let mut items = Vec::with_capacity(rows.len());

    for row in rows {
        let (Some(code), Some(cycle)) = (text(row, "ITEM_CODE"), text(row, "CYCLE")) else {
            debug!("Skipping item row without code or cycle");
            continue;
        };
        let Ok(cycle) = cycle.parse::<Cycle>() else {
            debug!(item_code = %code, cycle = %cycle, "Skipping item row with unknown cycle");
            continue;
        };

        items.push(StatisticItem {
            name: text(row, "ITEM_NAME").unwrap_or_else(|| code.clone()),
            code,
            cycle,
            start_time: text(row, "START_TIME").unwrap_or_default(),
            end_time: text(row, "END_TIME").unwrap_or_default(),
            unit: text(row, "UNIT_NAME").filter(|u| !u.is_empty()),
        });
    }

    Ok(items)
}

/// Joins the up-to-four hierarchical item names of a series row.
fn series_label(row: &Row) -> String {
    let label = ["ITEM_NAME1", "ITEM_NAME2", "ITEM_NAME3", "ITEM_NAME4"]
        .iter()
        .filter_map(|column| text(row, column))
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(" > ");

    if label.is_empty() {
        TOTAL_LABEL.to_string()
    } else {
        label
    }
}

/// Parses a `StatisticSearch` body, grouping rows by their joined item label.
pub fn parse_series(body: &Value) -> Result<SeriesData, ProviderFailure> {
    let rows = table_rows(body, SERIES_TABLE)?;

    let mut data = SeriesData {
        unit: rows
            .first()
            .and_then(|row| text(row, "UNIT_NAME"))
            .unwrap_or_default(),
        ..SeriesData::default()
    };

    for row in rows {
        let (Some(time), Some(value)) = (text(row, "TIME"), text(row, "DATA_VALUE")) else {
            continue;
        };
        data.insert(&series_label(row), &time, &value);
    }

    Ok(data)
}
