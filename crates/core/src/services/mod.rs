pub mod chart_series;
pub mod correction;
pub mod gap_fill;
pub mod indicators;
pub mod series_cache;
