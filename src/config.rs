use crate::error::{CostReportError, Result};
use crate::resolver::{AliasTable, CodeResolver};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a report needs that is not source data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportConfig {
    #[schemars(description = "Divisor applied to raw amounts for display. 1,000,000 reports in millions (백만원).")]
    pub unit_divisor: f64,

    #[schemars(description = "Unit name used in generated change descriptions, matching unit_divisor.")]
    pub unit_label: String,

    #[schemars(description = "Label substituted for blank category or GL cells so the amount is never dropped.")]
    pub placeholder: String,

    #[schemars(description = "Label of the synthetic root node of every hierarchy.")]
    pub total_label: String,

    #[schemars(description = "L1 categories excluded from KPI totals (shared costs). They still appear in the hierarchy.")]
    pub excluded_l1: Vec<String>,

    #[schemars(description = "Store channels counted toward the store total. Other channels (online, shop-in-shop, ...) are ignored.")]
    pub store_channels: Vec<String>,

    #[schemars(description = "L3 category holding salaries, used for salary per person.")]
    pub salary_l3: String,

    #[schemars(description = "Multiplier applied to cost / sales when computing the cost-to-sales ratio (sales are reported net of VAT).")]
    pub vat_factor: f64,

    #[schemars(description = "Brand alias and category coalescing tables.")]
    pub aliases: AliasTable,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            unit_divisor: 1_000_000.0,
            unit_label: "백만원".to_string(),
            placeholder: "미분류".to_string(),
            total_label: "사업부 합계".to_string(),
            excluded_l1: vec!["공통비".to_string()],
            store_channels: ["백화점", "대리점", "면세점", "직영점", "아울렛"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            salary_l3: "급료와 임금".to_string(),
            vat_factor: 1.1,
            aliases: AliasTable::default(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ReportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.unit_divisor.is_finite() && self.unit_divisor > 0.0) {
            return Err(CostReportError::ConfigError(format!(
                "unit_divisor must be a positive number, got {}",
                self.unit_divisor
            )));
        }
        if !(self.vat_factor.is_finite() && self.vat_factor > 0.0) {
            return Err(CostReportError::ConfigError(format!(
                "vat_factor must be a positive number, got {}",
                self.vat_factor
            )));
        }
        if self.placeholder.trim().is_empty() {
            return Err(CostReportError::ConfigError(
                "placeholder label must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolver(&self) -> CodeResolver {
        CodeResolver::new(&self.aliases)
    }

    pub fn is_excluded_l1(&self, category_l1: &str) -> bool {
        self.excluded_l1.iter().any(|c| c == category_l1)
    }

    pub fn is_counted_channel(&self, channel: &str) -> bool {
        self.store_channels.iter().any(|c| c == channel)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}
