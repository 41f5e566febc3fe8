use crate::error::{RfmError, RfmResult};
use crate::types::{Metric, SCORE_LEVELS};
use serde::Deserialize;
use std::path::Path;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `RFM_SEGMENT__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Lower bounds of the fallback bins per metric. The population maximum
/// closes the last bin.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_recency_edges")]
    pub recency_fallback_edges: Vec<f64>,
    #[serde(default = "default_frequency_edges")]
    pub frequency_fallback_edges: Vec<f64>,
    #[serde(default = "default_monetary_edges")]
    pub monetary_fallback_edges: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_output_formats")]
    pub formats: Vec<String>,
    /// Also write one `<segment>_details.csv` per segment present.
    #[serde(default)]
    pub segment_details: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_top_segments")]
    pub top_segments: usize,
    #[serde(default = "default_top_states")]
    pub top_states: usize,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

// Default functions
fn default_recency_edges() -> Vec<f64> {
    Metric::Recency.default_fallback_edges().to_vec()
}
fn default_frequency_edges() -> Vec<f64> {
    Metric::Frequency.default_fallback_edges().to_vec()
}
fn default_monetary_edges() -> Vec<f64> {
    Metric::Monetary.default_fallback_edges().to_vec()
}
fn default_input_path() -> String {
    "data/customer_metrics.csv".to_string()
}
fn default_output_dir() -> String {
    "reports".to_string()
}
fn default_output_formats() -> Vec<String> {
    vec!["csv".to_string(), "json".to_string()]
}
fn default_top_segments() -> usize {
    3
}
fn default_top_states() -> usize {
    5
}
fn default_currency_symbol() -> String {
    "R$".to_string()
}
fn default_log_filter() -> String {
    "rfm_segment=info,rfm_segmentation=info,rfm_reporting=info".to_string()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recency_fallback_edges: default_recency_edges(),
            frequency_fallback_edges: default_frequency_edges(),
            monetary_fallback_edges: default_monetary_edges(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            formats: default_output_formats(),
            segment_details: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_segments: default_top_segments(),
            top_states: default_top_states(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl ScoringConfig {
    pub fn fallback_edges(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Recency => &self.recency_fallback_edges,
            Metric::Frequency => &self.frequency_fallback_edges,
            Metric::Monetary => &self.monetary_fallback_edges,
        }
    }

    /// Fallback edges as a fixed array, validated.
    pub fn edges_for(&self, metric: Metric) -> RfmResult<[f64; SCORE_LEVELS]> {
        let edges = self.fallback_edges(metric);
        let fixed: [f64; SCORE_LEVELS] = edges.try_into().map_err(|_| {
            RfmError::Config(format!(
                "{metric} fallback edges must have exactly {SCORE_LEVELS} entries, got {}",
                edges.len()
            ))
        })?;
        if fixed.iter().any(|e| !e.is_finite()) || fixed[0] < 0.0 {
            return Err(RfmError::Config(format!(
                "{metric} fallback edges must be finite and start at a non-negative value"
            )));
        }
        if fixed.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RfmError::Config(format!(
                "{metric} fallback edges must be strictly increasing: {fixed:?}"
            )));
        }
        Ok(fixed)
    }

    pub fn validate(&self) -> RfmResult<()> {
        for metric in Metric::ALL {
            self.edges_for(metric)?;
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> RfmResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an optional TOML file, then environment
    /// variables, which take precedence.
    pub fn load_from(path: Option<&Path>) -> RfmResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("RFM_SEGMENT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("scoring.recency_fallback_edges")
                .with_list_parse_key("scoring.frequency_fallback_edges")
                .with_list_parse_key("scoring.monetary_fallback_edges")
                .with_list_parse_key("output.formats"),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RfmResult<()> {
        self.scoring.validate()?;
        for format in &self.output.formats {
            if !matches!(format.as_str(), "csv" | "json") {
                return Err(RfmError::Config(format!(
                    "unsupported output format: {format:?}"
                )));
            }
        }
        Ok(())
    }
}
