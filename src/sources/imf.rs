//! IMF SDMX-JSON 3.0 (COFER currency composition of reserves).

use crate::calendar::parse_quarter_label;
use crate::error::FetchError;
use crate::series::SeriesTable;
use serde_json::Value;

/// Series key of the single series the COFER USD-share query returns
const COFER_SERIES_KEY: &str = "0:0:0:0:0";

/// Extracts the observations of the COFER USD-share series into a table
/// with one column named `column`.
///
/// Observation keys are positions into the time dimension's value list;
/// labels such as `"2024-Q3"` become quarter-end dates.
pub fn parse_cofer(payload: &Value, column: &str) -> Result<SeriesTable, FetchError> {
    let observations = payload
        .pointer(&format!("/data/dataSets/0/series/{}/observations", COFER_SERIES_KEY))
        .and_then(Value::as_object)
        .ok_or_else(|| FetchError::Parse("COFER payload has no observations".to_string()))?;

    let labels = payload
        .pointer("/data/structures/0/dimensions/observation/0/values")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse("COFER payload has no time dimension".to_string()))?;

    let mut rows = Vec::with_capacity(observations.len());
    for (key, cell) in observations {
        let position: usize = key
            .parse()
            .map_err(|_| FetchError::Parse(format!("COFER observation key '{}'", key)))?;
        let label = labels
            .get(position)
            .and_then(|v| v.get("value"))
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::Parse(format!("COFER has no period for position {}", position)))?;
        let date = parse_quarter_label(label)
            .ok_or_else(|| FetchError::Parse(format!("COFER period '{}'", label)))?;
        rows.push((date, vec![observation_value(cell)]));
    }

    if rows.is_empty() {
        return Err(FetchError::EmptyPayload("COFER".to_string()));
    }

    Ok(SeriesTable::from_rows(vec![column.to_string()], rows))
}

/// First element of an observation array, numeric or numeric string.
fn observation_value(cell: &Value) -> Option<f64> {
    match cell.get(0)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
