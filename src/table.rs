use chrono::{DateTime, Utc};
use error_stack::{Report, bail};
use tracing::{debug, warn};

use crate::error::{IndicatorError, TableError};
use crate::indicator::Indicator;
use crate::model::{Bar, Period};
use crate::series;

pub const DATE: &str = "Date";
pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const VOLUME: &str = "Volume";

/// Names of the bar columns. These are never replaced by derived columns.
pub const BAR_COLUMNS: &[&str] = &[DATE, OPEN, HIGH, LOW, CLOSE, VOLUME];

/// A derived column, one cell per bar.
///
/// `NaN` (numeric) and `None` (label) mark cells that could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Flag(Vec<u8>),
    Label(Vec<Option<&'static str>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Flag(values) => values.len(),
            Self::Label(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&[u8]> {
        match self {
            Self::Flag(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_labels(&self) -> Option<&[Option<&'static str>]> {
        match self {
            Self::Label(values) => Some(values),
            _ => None,
        }
    }
}

/// Price bars for one symbol plus the columns derived from them.
///
/// Bars are fixed at construction. Indicators only append columns; the one
/// destructive operation is [`IndicatorTable::rescale`].
#[derive(Debug, Clone)]
pub struct IndicatorTable {
    symbol: String,
    period: Period,
    bars: Vec<Bar>,
    timestamps: Vec<DateTime<Utc>>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    columns: Vec<(String, Column)>,
}

impl IndicatorTable {
    /// Build a table from bars sorted by ascending timestamp.
    pub fn new(
        symbol: impl Into<String>,
        period: Period,
        bars: Vec<Bar>,
    ) -> Result<Self, Report<TableError>> {
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp == pair[0].timestamp {
                bail!(TableError::DuplicateTimestamp { index: index + 1 });
            }
            if pair[1].timestamp < pair[0].timestamp {
                bail!(TableError::Unordered { index: index + 1 });
            }
        }

        Ok(Self {
            symbol: symbol.into(),
            period,
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            open: bars.iter().map(|b| b.open).collect(),
            high: bars.iter().map(|b| b.high).collect(),
            low: bars.iter().map(|b| b.low).collect(),
            close: bars.iter().map(|b| b.close).collect(),
            volume: bars.iter().map(|b| b.volume).collect(),
            bars,
            columns: Vec::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    /// Derived columns in insertion order.
    pub fn columns(&self) -> &[(String, Column)] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, column)| column)
    }

    pub fn has_column(&self, name: &str) -> bool {
        (BAR_COLUMNS.contains(&name) && name != DATE) || self.column(name).is_some()
    }

    /// Look up a numeric column by name, bar columns included.
    pub fn numeric(&self, name: &str) -> Result<&[f64], Report<IndicatorError>> {
        let values = match name {
            OPEN => Some(self.open.as_slice()),
            HIGH => Some(self.high.as_slice()),
            LOW => Some(self.low.as_slice()),
            CLOSE => Some(self.close.as_slice()),
            VOLUME => Some(self.volume.as_slice()),
            _ => self.column(name).and_then(Column::as_numeric),
        };
        values.ok_or_else(|| {
            Report::new(IndicatorError::MissingColumn {
                name: name.to_string(),
            })
        })
    }

    /// Write a derived column. An existing column with the same name is
    /// replaced in place (last write wins).
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), Report<IndicatorError>> {
        let name = name.into();
        if BAR_COLUMNS.contains(&name.as_str()) {
            bail!(IndicatorError::ProtectedColumn { name });
        }
        if column.len() != self.len() {
            bail!(IndicatorError::LengthMismatch {
                column: name,
                expected: self.len(),
                actual: column.len(),
            });
        }

        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => {
                warn!(column = %name, "overwriting existing column");
                *slot = column;
            }
            None => self.columns.push((name, column)),
        }
        Ok(())
    }

    /// Run `indicator` against the current table and append its columns.
    ///
    /// Named dependencies are checked before anything is computed, and no
    /// column is written unless the whole computation succeeds.
    pub fn apply(&mut self, indicator: &dyn Indicator) -> Result<(), Report<IndicatorError>> {
        for required in indicator.requires() {
            if !self.has_column(&required) {
                return Err(Report::new(IndicatorError::MissingColumn { name: required })
                    .attach(format!("required by {}", indicator.name())));
            }
        }

        let produced = indicator.compute(self)?;
        for (name, column) in &produced {
            if column.len() != self.len() {
                bail!(IndicatorError::LengthMismatch {
                    column: name.clone(),
                    expected: self.len(),
                    actual: column.len(),
                });
            }
        }

        debug!(
            indicator = indicator.name(),
            columns = produced.len(),
            "indicator applied"
        );
        for (name, column) in produced {
            self.insert(name, column)?;
        }
        Ok(())
    }

    /// Replace numeric column `name` with `{name}_Scaled_{window}`, scaled
    /// against its trailing high/low, and drop the original.
    ///
    /// Returns the name of the new column.
    pub fn rescale(&mut self, name: &str, window: usize) -> Result<String, Report<IndicatorError>> {
        if BAR_COLUMNS.contains(&name) {
            bail!(IndicatorError::ProtectedColumn {
                name: name.to_string(),
            });
        }
        if window == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "rescale window must be > 0".into(),
            });
        }
        let Some(position) = self.columns.iter().position(|(existing, _)| existing == name) else {
            bail!(IndicatorError::MissingColumn {
                name: name.to_string(),
            });
        };
        let Some(values) = self.columns[position].1.as_numeric() else {
            return Err(Report::new(IndicatorError::InvalidParameter {
                name: format!("column {name} is not numeric"),
            }));
        };

        let scaled = series::rescale(values, window);
        let scaled_name = format!("{name}_Scaled_{window}");
        self.columns.remove(position);
        self.insert(scaled_name.clone(), Column::Numeric(scaled))?;
        debug!(source = name, column = %scaled_name, "column rescaled");
        Ok(scaled_name)
    }
}
