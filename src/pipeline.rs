use error_stack::{Report, ResultExt};
use tracing::info;

use crate::config::{AppConfig, RescaleConfig};
use crate::error::IndicatorError;
use crate::registry::{self, BoxedIndicator};
use crate::table::IndicatorTable;

/// An ordered list of indicators followed by column rescales.
pub struct Pipeline {
    indicators: Vec<BoxedIndicator>,
    rescales: Vec<RescaleConfig>,
}

impl Pipeline {
    pub fn new(indicators: Vec<BoxedIndicator>, rescales: Vec<RescaleConfig>) -> Self {
        Self {
            indicators,
            rescales,
        }
    }

    /// Build from config; an empty `[[indicators]]` list selects the
    /// default set.
    pub fn from_config(config: &AppConfig) -> Result<Self, Report<IndicatorError>> {
        let indicators = if config.indicators.is_empty() {
            registry::default_indicators(&config.swing)?
        } else {
            registry::build_indicators(&config.indicators, &config.swing)?
        };
        Ok(Self::new(indicators, config.rescale.clone()))
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Apply every indicator in order, then every rescale. Stops at the
    /// first failure.
    pub fn run(&self, table: &mut IndicatorTable) -> Result<(), Report<IndicatorError>> {
        for indicator in &self.indicators {
            table
                .apply(indicator.as_ref())
                .attach_with(|| format!("indicator: {}", indicator.name()))?;
        }
        for rescale in &self.rescales {
            table
                .rescale(&rescale.column, rescale.window)
                .attach_with(|| format!("rescale: {}", rescale.column))?;
        }
        info!(
            symbol = table.symbol(),
            bars = table.len(),
            indicators = self.indicators.len(),
            columns = table.columns().len(),
            "pipeline finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwingConfig;
    use crate::indicator::ma::Sma;
    use crate::indicator::volume::{AccumulationDistribution, ChaikinOscillator, Obv};
    use crate::table::test_support::sample_table;

    #[test]
    fn runs_indicators_then_rescales() {
        let pipeline = Pipeline::new(
            vec![Box::new(Sma::new(5).unwrap()), Box::new(Obv)],
            vec![RescaleConfig {
                column: "OBV".into(),
                window: 10,
            }],
        );
        let mut table = sample_table(30);
        pipeline.run(&mut table).unwrap();
        assert!(table.has_column("MA_5"));
        assert!(table.has_column("OBV_Scaled_10"));
        assert!(!table.has_column("OBV"));
    }

    #[test]
    fn missing_dependency_fails_fast() {
        let pipeline = Pipeline::new(vec![Box::new(ChaikinOscillator::new(3, 10).unwrap())], vec![]);
        let mut table = sample_table(30);
        let err = pipeline.run(&mut table).unwrap_err();
        assert!(matches!(
            err.current_context(),
            IndicatorError::MissingColumn { name } if name == "ADL"
        ));
        assert!(table.columns().is_empty());
    }

    #[test]
    fn dependency_satisfied_in_order() {
        let pipeline = Pipeline::new(
            vec![
                Box::new(AccumulationDistribution),
                Box::new(ChaikinOscillator::new(3, 10).unwrap()),
            ],
            vec![],
        );
        let mut table = sample_table(30);
        pipeline.run(&mut table).unwrap();
        assert!(table.has_column("Chaikin_Oscillator_3_10"));
    }

    #[test]
    fn default_set_runs_end_to_end() {
        let indicators = registry::default_indicators(&SwingConfig::default()).unwrap();
        let pipeline = Pipeline::new(indicators, vec![]);
        let mut table = sample_table(250);
        pipeline.run(&mut table).unwrap();
        assert!(table.has_column("MA_200"));
        assert!(table.has_column("High_Low_lag_5"));
        assert!(table.has_column("Doji"));
    }
}
