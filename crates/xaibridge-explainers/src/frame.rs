//! Time-series framing of host tables.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use ndarray::{s, Array2, ArrayView2, Axis};
use xaibridge_core::{ModelInput, Table, Value};

use crate::ExplainError;

const FALLBACK_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Rows of numeric observations indexed by timestamp, oldest first.
///
/// The timestamp column is kept apart from the values, so `values()` is
/// exactly what a forecaster sees: `[rows, value columns]`, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct TsFrame {
    timestamp_column: String,
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl TsFrame {
    /// Every column other than `timestamp_column` must be numeric. Rows are
    /// reordered by timestamp (stable for equal timestamps).
    pub fn from_table(
        table: &Table,
        timestamp_column: &str,
        format: Option<&str>,
    ) -> Result<Self, ExplainError> {
        let raw = table.column(timestamp_column).ok_or_else(|| {
            ExplainError::InvalidInput(format!("missing timestamp column `{timestamp_column}`"))
        })?;
        let timestamps = raw
            .iter()
            .enumerate()
            .map(|(row, value)| {
                timestamp_value(value, format).map_err(|e| match e {
                    ExplainError::InvalidInput(msg) => {
                        ExplainError::InvalidInput(format!("row {row}: {msg}"))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rest = table.without(timestamp_column);
        let columns = rest.column_names().to_vec();
        let values = if columns.is_empty() {
            Array2::zeros((timestamps.len(), 0))
        } else {
            rest.to_array()?
        };

        let mut order: Vec<usize> = (0..timestamps.len()).collect();
        order.sort_by_key(|&i| timestamps[i]);
        let sorted = order.windows(2).all(|w| w[0] < w[1]);

        let (timestamps, values) = if sorted {
            (timestamps, values)
        } else {
            (
                order.iter().map(|&i| timestamps[i]).collect(),
                values.select(Axis(0), &order),
            )
        };

        Ok(Self {
            timestamp_column: timestamp_column.to_string(),
            timestamps,
            columns,
            values,
        })
    }

    /// Column-oriented host data: `names[i]` labels `columns[i]`.
    pub fn from_columns<S: AsRef<str>>(
        names: &[S],
        columns: Vec<Vec<Value>>,
        timestamp_column: &str,
        format: Option<&str>,
    ) -> Result<Self, ExplainError> {
        if names.len() != columns.len() {
            return Err(ExplainError::InvalidInput(format!(
                "{} column names given for {} columns",
                names.len(),
                columns.len()
            )));
        }
        let table = Table::from_columns(
            names
                .iter()
                .map(|n| n.as_ref().to_string())
                .zip(columns),
        )?;
        Self::from_table(&table, timestamp_column, format)
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn n_rows(&self) -> usize {
        self.timestamps.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Last `n` rows (all rows if shorter).
    pub fn tail(&self, n: usize) -> TsFrame {
        let start = self.n_rows().saturating_sub(n);
        self.slice_rows(start, self.n_rows())
    }

    pub fn window(&self, start: usize, len: usize) -> Result<TsFrame, ExplainError> {
        let end = start.checked_add(len).filter(|&end| end <= self.n_rows()).ok_or_else(|| {
            ExplainError::InvalidInput(format!(
                "window [{start}, {start}+{len}) exceeds {} rows",
                self.n_rows()
            ))
        })?;
        Ok(self.slice_rows(start, end))
    }

    /// Same timestamps and columns with replaced observations.
    pub fn with_values(&self, values: Array2<f64>) -> Result<TsFrame, ExplainError> {
        if values.dim() != self.values.dim() {
            return Err(ExplainError::InvalidInput(format!(
                "replacement values are {:?}, frame is {:?}",
                values.dim(),
                self.values.dim()
            )));
        }
        Ok(TsFrame {
            values,
            ..self.clone()
        })
    }

    /// What the forecaster callback sends to the model.
    pub fn to_input(&self) -> ModelInput {
        ModelInput::F64(self.values.clone())
    }

    /// Back to a host table, timestamps rendered as ISO 8601 text.
    pub fn to_table(&self) -> Result<Table, ExplainError> {
        let mut columns: Vec<(String, Vec<Value>)> = Vec::with_capacity(self.n_cols() + 1);
        columns.push((
            self.timestamp_column.clone(),
            self.timestamps
                .iter()
                .map(|t| Value::Text(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
                .collect(),
        ));
        for (name, column) in self.columns.iter().zip(self.values.columns()) {
            columns.push((name.clone(), column.iter().map(|v| Value::Number(*v)).collect()));
        }
        Ok(Table::from_columns(columns)?)
    }

    fn slice_rows(&self, start: usize, end: usize) -> TsFrame {
        TsFrame {
            timestamp_column: self.timestamp_column.clone(),
            timestamps: self.timestamps[start..end].to_vec(),
            columns: self.columns.clone(),
            values: self.values.slice(s![start..end, ..]).to_owned(),
        }
    }
}

/// Parses one timestamp.
///
/// With a `format`, the text must match it (as a date-time, or as a bare
/// date at midnight). Without one, RFC 3339 is tried first, then ISO-like
/// date-times with `T` or a space, then a bare `YYYY-MM-DD`. Offsets are
/// normalized to UTC.
pub fn parse_timestamp(raw: &str, format: Option<&str>) -> Result<NaiveDateTime, ExplainError> {
    let raw = raw.trim();
    if let Some(format) = format {
        return NaiveDateTime::parse_from_str(raw, format)
            .or_else(|_| NaiveDate::parse_from_str(raw, format).map(|d| d.and_time(NaiveTime::MIN)))
            .map_err(|e| {
                ExplainError::InvalidInput(format!("`{raw}` does not match `{format}`: {e}"))
            });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    for format in FALLBACK_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| ExplainError::InvalidInput(format!("unrecognized timestamp `{raw}`")))
}

fn timestamp_value(value: &Value, format: Option<&str>) -> Result<NaiveDateTime, ExplainError> {
    match (value, format) {
        (Value::Text(s), _) => parse_timestamp(s, format),
        // Unformatted numbers are seconds since the Unix epoch.
        (Value::Number(n), None) => {
            if !n.is_finite() {
                return Err(ExplainError::InvalidInput(format!("epoch {n} is not a finite number")));
            }
            let secs = n.floor();
            let nanos = ((n - secs) * 1e9).round() as u32;
            DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| ExplainError::InvalidInput(format!("epoch {n} is out of range")))
        }
        (Value::Number(n), Some(_)) => parse_timestamp(&n.to_string(), format),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn default_parsing_accepts_common_iso_shapes() {
        assert_eq!(parse_timestamp("2024-03-01T05:00:00Z", None).unwrap(), at(2024, 3, 1, 5));
        assert_eq!(
            parse_timestamp("2024-03-01T07:00:00+02:00", None).unwrap(),
            at(2024, 3, 1, 5)
        );
        assert_eq!(parse_timestamp("2024-03-01T05:00:00", None).unwrap(), at(2024, 3, 1, 5));
        assert_eq!(parse_timestamp("2024-03-01 05:00:00.000", None).unwrap(), at(2024, 3, 1, 5));
        assert_eq!(parse_timestamp("2024-03-01", None).unwrap(), at(2024, 3, 1, 0));
        assert!(matches!(
            parse_timestamp("yesterday", None),
            Err(ExplainError::InvalidInput(_))
        ));
    }

    #[test]
    fn explicit_format_is_honored() {
        assert_eq!(
            parse_timestamp("01/03/2024 05:00", Some("%d/%m/%Y %H:%M")).unwrap(),
            at(2024, 3, 1, 5)
        );
        assert_eq!(parse_timestamp("01.03.2024", Some("%d.%m.%Y")).unwrap(), at(2024, 3, 1, 0));
        assert!(parse_timestamp("2024-03-01", Some("%d.%m.%Y")).is_err());
    }

    #[test]
    fn numeric_timestamps_are_epoch_seconds() {
        let table = Table::from_columns(vec![
            ("t", vec![Value::Number(3600.0), Value::Number(0.0)]),
            ("v", vec![Value::Number(2.0), Value::Number(1.0)]),
        ])
        .unwrap();
        let frame = TsFrame::from_table(&table, "t", None).unwrap();
        assert_eq!(frame.timestamps()[0], at(1970, 1, 1, 0));
        assert_eq!(frame.values(), array![[1.0], [2.0]]);
    }

    #[test]
    fn non_finite_epochs_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let table = Table::from_columns(vec![
                ("t", vec![Value::Number(bad)]),
                ("v", vec![Value::Number(1.0)]),
            ])
            .unwrap();
            assert!(matches!(
                TsFrame::from_table(&table, "t", None),
                Err(ExplainError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn rows_are_sorted_by_timestamp() {
        let frame = TsFrame::from_columns(
            &["v", "t", "w"],
            vec![
                vec![3.0.into(), 1.0.into(), 2.0.into()],
                vec!["2024-01-03".into(), "2024-01-01".into(), "2024-01-02".into()],
                vec![30.0.into(), 10.0.into(), 20.0.into()],
            ],
            "t",
            None,
        )
        .unwrap();
        assert_eq!(frame.columns(), &["v".to_string(), "w".to_string()]);
        assert_eq!(frame.values(), array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]);
        assert_eq!(frame.timestamps()[2], at(2024, 1, 3, 0));
    }

    #[test]
    fn missing_timestamp_column_and_text_values_are_rejected() {
        let table = Table::from_columns(vec![("v", vec![1.0, 2.0])]).unwrap();
        assert!(matches!(
            TsFrame::from_table(&table, "t", None),
            Err(ExplainError::InvalidInput(_))
        ));

        let table = Table::from_columns(vec![
            ("t", vec!["2024-01-01", "2024-01-02"]),
            ("label", vec!["a", "b"]),
        ])
        .unwrap();
        assert!(matches!(
            TsFrame::from_table(&table, "t", None),
            Err(ExplainError::Frame(xaibridge_core::Error::UnsupportedType(_)))
        ));
    }

    #[test]
    fn windows_tails_and_replacements() {
        let days: Vec<Value> = (1..=5).map(|d| Value::from(format!("2024-01-0{d}"))).collect();
        let values: Vec<Value> = (1..=5).map(|v| Value::Number(v as f64)).collect();
        let frame = TsFrame::from_columns(&["t", "v"], vec![days, values], "t", None).unwrap();

        assert_eq!(frame.tail(2).values(), array![[4.0], [5.0]]);
        assert_eq!(frame.tail(10).n_rows(), 5);
        assert_eq!(frame.window(1, 3).unwrap().values(), array![[2.0], [3.0], [4.0]]);
        assert!(frame.window(3, 3).is_err());

        let replaced = frame.with_values(Array2::zeros((5, 1))).unwrap();
        assert_eq!(replaced.timestamps(), frame.timestamps());
        assert!(frame.with_values(Array2::zeros((4, 1))).is_err());
    }

    #[test]
    fn to_table_renders_timestamps_first() {
        let frame = TsFrame::from_columns(
            &["t", "v"],
            vec![vec!["2024-01-01T00:00:00".into()], vec![1.5.into()]],
            "t",
            None,
        )
        .unwrap();
        let table = frame.to_table().unwrap();
        assert_eq!(table.column_names(), &["t".to_string(), "v".to_string()]);
        assert_eq!(table.column("t").unwrap()[0], Value::from("2024-01-01T00:00:00"));
        assert_eq!(TsFrame::from_table(&table, "t", None).unwrap(), frame);
    }
}
