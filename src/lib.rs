// Library exports for tablechart

pub mod csv_reader;
pub mod data;
pub mod error;
pub mod value;

// Pipeline stages
pub mod aggregate;
pub mod filter;
pub mod mapping;
pub mod project;
pub mod sort;
pub mod timebucket;

// Presentation
pub mod chart;
pub mod dashboard;
pub mod palette;
pub mod series;
pub mod visibility;

use serde::Deserialize;

use palette::Palette;
use series::BACKGROUND_ALPHA;
use timebucket::Granularity;

#[derive(Debug, Clone, Deserialize)]
pub struct ChartOptions {
    /// Bucket size a datetime chart starts with.
    #[serde(default)]
    pub default_level: Granularity,
    #[serde(default = "default_series_label")]
    pub series_label: String,
    #[serde(default = "default_background_alpha")]
    pub background_alpha: f64,
    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: u64,
    #[serde(default)]
    pub palette: Palette,
}

fn default_series_label() -> String { "Activity Events".to_string() }
fn default_background_alpha() -> f64 { BACKGROUND_ALPHA }
fn default_double_click_ms() -> u64 { 300 }

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            default_level: Granularity::default(),
            series_label: default_series_label(),
            background_alpha: default_background_alpha(),
            double_click_ms: default_double_click_ms(),
            palette: Palette::default(),
        }
    }
}
