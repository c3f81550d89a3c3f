use std::io::Write;

use error_stack::{Report, ResultExt};
use serde_json::{Map, Value};

use crate::error::ExportError;
use crate::table::{CLOSE, Column, DATE, HIGH, IndicatorTable, LOW, OPEN, VOLUME};

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn cell(column: &Column, row: usize) -> Value {
    match column {
        Column::Numeric(values) => number(values[row]),
        Column::Flag(values) => Value::from(values[row]),
        Column::Label(values) => values[row].map_or(Value::Null, Value::from),
    }
}

/// One JSON object per bar: the bar columns, then every derived column in
/// insertion order. Undefined cells become `null`.
pub fn to_rows(table: &IndicatorTable) -> Vec<Map<String, Value>> {
    (0..table.len())
        .map(|row| {
            let mut object = Map::new();
            object.insert(DATE.into(), Value::from(table.timestamps()[row].to_rfc3339()));
            object.insert(OPEN.into(), number(table.open()[row]));
            object.insert(HIGH.into(), number(table.high()[row]));
            object.insert(LOW.into(), number(table.low()[row]));
            object.insert(CLOSE.into(), number(table.close()[row]));
            object.insert(VOLUME.into(), number(table.volume()[row]));
            for (name, column) in table.columns() {
                object.insert(name.clone(), cell(column, row));
            }
            object
        })
        .collect()
}

/// Write the table as a pretty-printed JSON array of row objects.
pub fn write_json<W: Write>(table: &IndicatorTable, mut writer: W) -> Result<(), Report<ExportError>> {
    serde_json::to_writer_pretty(&mut writer, &to_rows(table))
        .change_context(ExportError::Write)
        .attach_with(|| format!("symbol: {}", table.symbol()))?;
    writeln!(writer).change_context(ExportError::Write)?;
    writer.flush().change_context(ExportError::Write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::label::NextBarLabel;
    use crate::indicator::ma::Sma;
    use crate::indicator::pattern::Candlestick;
    use crate::table::test_support::table_from_closes;

    #[test]
    fn rows_keep_column_order_and_nulls() {
        let mut table = table_from_closes(&[1.0, 2.0, 3.0]);
        table.apply(&Sma::new(2).unwrap()).unwrap();
        table.apply(&NextBarLabel).unwrap();

        let rows = to_rows(&table);
        let keys: Vec<_> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Date", "Open", "High", "Low", "Close", "Volume", "MA_2", "Label"]);
        assert_eq!(rows[0]["MA_2"], Value::Null);
        assert_eq!(rows[1]["MA_2"], Value::from(1.5));
        assert_eq!(rows[0]["Label"], Value::from("Positive"));
        assert_eq!(rows[2]["Label"], Value::Null);
        assert_eq!(rows[0]["Date"], Value::from("2024-01-01T00:00:00+00:00"));
    }

    #[test]
    fn flags_export_as_integers() {
        let mut table = table_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        table.apply(&Candlestick).unwrap();
        let rows = to_rows(&table);
        assert_eq!(rows[3]["Doji"], Value::from(0u8));
    }

    #[test]
    fn write_json_emits_array() {
        let mut table = table_from_closes(&[1.0, 2.0]);
        table.apply(&Sma::new(2).unwrap()).unwrap();
        let mut buffer = Vec::new();
        write_json(&table, &mut buffer).unwrap();
        let parsed: Value = serde_json::from_slice(&buffer).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["MA_2"], Value::from(1.5));
    }
}
