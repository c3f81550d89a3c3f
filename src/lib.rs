//! Technical-analysis feature tables over OHLCV price history.
//!
//! An [`table::IndicatorTable`] holds the bars of one symbol; indicators
//! from [`indicator`] read it and append derived columns, run in order by a
//! [`pipeline::Pipeline`]. Bars come from a [`source::PriceSource`].

pub mod config;
pub mod error;
pub mod export;
pub mod indicator;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod series;
pub mod source;
pub mod table;
