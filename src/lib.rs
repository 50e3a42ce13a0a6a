//! # Cost Rollup
//!
//! Turns flat ledger records (cost, sales, headcount, store counts) into
//! multi-level year-over-year cost breakdowns for a closed set of brands.
//!
//! ## Core Concepts
//!
//! - **Category tree**: costs fold into `L1 > L2 > L3 > GL account`; every
//!   node carries a current and a prior total and always equals the sum of
//!   its children.
//! - **Windows**: `monthly` compares the target month with the same month a
//!   year earlier; `ytd` compares January through the target month.
//! - **YoY**: current as a percentage of prior (100 = flat), with a `"new"`
//!   sentinel when there was nothing the year before. Ratio metrics compare in
//!   percentage points instead.
//! - **Drill-down**: a pure state machine over the tree that skips levels
//!   whose only child repeats the parent's name.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cost_rollup::*;
//!
//! let dataset = LedgerDataset::new().with_costs(vec![CostRecord {
//!     month: "202410".to_string(),
//!     brand_code: "MLB".to_string(),
//!     cost_center_code: "F100".to_string(),
//!     cost_center_name: "영업팀".to_string(),
//!     cost_center_type: None,
//!     category_l1: "인건비".to_string(),
//!     category_l2: "급여".to_string(),
//!     category_l3: "정규직".to_string(),
//!     gl_code: "G1".to_string(),
//!     gl_name: "급료".to_string(),
//!     amount: 100_000_000.0,
//! }]);
//!
//! let tree = build_cost_hierarchy(&dataset, "MLB", "202410", "monthly").unwrap();
//! assert_eq!(tree.find(&["인건비"]).unwrap().current_amount, 100_000_000.0);
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod hierarchy;
pub mod ingestion;
pub mod kpi;
pub mod navigator;
pub mod period;
pub mod report;
pub mod resolver;
pub mod schema;
pub mod utils;
pub mod yoy;

#[cfg(feature = "loader")]
pub mod loader;

pub use config::ReportConfig;
pub use dataset::{DataSourceFlags, LedgerDataset, RawSources};
pub use error::{CostReportError, Result};
pub use hierarchy::{CategorizedAmount, HierarchyBuilder, HierarchyDepth, HierarchyNode};
pub use ingestion::*;
pub use kpi::{
    brand_overview, category_breakdown, monthly_trend, BrandKpi, CategoryAmount, KpiMetric,
    KpiSnapshot, MonthlyPoint,
};
pub use navigator::{
    pass_through, reduce, ChildLookup, DrillAction, DrillDepth, DrillNavigator, DrillRow,
    DrillState, ViewRow,
};
pub use period::*;
pub use report::{describe_change, CostTable, CostTableRow, RowLevel};
pub use resolver::{AliasTable, BrandCode, CodeResolver};
pub use schema::*;
pub use utils::*;
pub use yoy::{compare, point_diff, yoy_ratio, CostTrend, MetricKind, YoyChange, YoyRatio};

#[cfg(feature = "loader")]
pub use loader::{DatasetLoader, SourceFiles};

use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Everything shown for one (brand, month, mode) query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub brand_code: String,
    pub target_month: YearMonth,
    pub mode: ViewMode,
    pub tree: HierarchyNode,
    pub table: CostTable,
    pub kpi: BrandKpi,
    pub categories: Vec<CategoryAmount>,
    pub data_source: DataSourceFlags,
}

/// A parsed and resolved query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub brand_code: String,
    pub target_month: YearMonth,
    pub mode: ViewMode,
    pub windows: ComparisonWindows,
}

pub struct CostReportProcessor {
    config: ReportConfig,
    depth: HierarchyDepth,
}

impl Default for CostReportProcessor {
    fn default() -> Self {
        Self {
            config: ReportConfig::default(),
            depth: HierarchyDepth::default(),
        }
    }
}

impl CostReportProcessor {
    pub fn new(config: ReportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            depth: HierarchyDepth::default(),
        })
    }

    pub fn with_depth(mut self, depth: HierarchyDepth) -> Self {
        self.depth = depth;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Parses the month and mode and resolves the brand alias. Only the month
    /// and mode can fail; an unknown brand passes through and simply matches
    /// no records.
    pub fn parse_query(&self, brand_code: &str, target_month: &str, mode: &str) -> Result<ReportQuery> {
        let target_month = parse_year_month(target_month)?;
        let mode: ViewMode = mode.parse()?;

        Ok(ReportQuery {
            brand_code: self.config.resolver().canonical_brand_code(brand_code),
            target_month,
            mode,
            windows: comparison_windows(target_month, mode),
        })
    }

    pub fn period_costs(&self, dataset: &LedgerDataset, query: &ReportQuery) -> PeriodSet<CostRecord> {
        select_period(dataset.costs(), &query.brand_code, &query.windows)
    }

    pub fn build_tree(&self, dataset: &LedgerDataset, query: &ReportQuery) -> HierarchyNode {
        let combined = self.period_costs(dataset, query).combined();
        HierarchyBuilder::from_config(&self.config, self.depth).build(&combined.current, &combined.prior)
    }

    pub fn query(
        &self,
        dataset: &LedgerDataset,
        brand_code: &str,
        target_month: &str,
        mode: &str,
    ) -> Result<CostReport> {
        let query = self.parse_query(brand_code, target_month, mode)?;

        info!(
            "Building cost report for {} {} ({})",
            query.brand_code, query.target_month, query.mode
        );

        let costs = self.period_costs(dataset, &query);
        debug!(
            "Selected {} current / {} prior cost rows",
            costs.current.len(),
            costs.prior.len()
        );

        let combined = costs.combined();
        let tree = HierarchyBuilder::from_config(&self.config, self.depth)
            .build(&combined.current, &combined.prior);
        let table = CostTable::from_tree(&tree, &self.config);
        let kpi = BrandKpi::compute(&query.brand_code, dataset, &query.windows, &self.config);
        let categories = category_breakdown(&costs, &self.config);

        Ok(CostReport {
            brand_code: query.brand_code,
            target_month: query.target_month,
            mode: query.mode,
            tree,
            table,
            kpi,
            categories,
            data_source: dataset.data_source(),
        })
    }

    /// Like [`query`](Self::query), then checks the rollup invariant on the tree.
    pub fn query_with_verification(
        &self,
        dataset: &LedgerDataset,
        brand_code: &str,
        target_month: &str,
        mode: &str,
        tolerance: f64,
    ) -> Result<CostReport> {
        let report = self.query(dataset, brand_code, target_month, mode)?;
        report.tree.verify_rollup(tolerance)?;
        Ok(report)
    }

    /// A drill-down session over the brand's records for the query windows.
    pub fn navigator(
        &self,
        dataset: &LedgerDataset,
        brand_code: &str,
        target_month: &str,
        mode: &str,
    ) -> Result<DrillNavigator> {
        let query = self.parse_query(brand_code, target_month, mode)?;
        Ok(DrillNavigator::new(self.period_costs(dataset, &query), &self.config))
    }

    /// KPIs for every brand.
    pub fn overview(&self, dataset: &LedgerDataset, target_month: &str, mode: &str) -> Result<Vec<BrandKpi>> {
        let target = parse_year_month(target_month)?;
        let mode: ViewMode = mode.parse()?;
        Ok(brand_overview(dataset, &comparison_windows(target, mode), &self.config))
    }
}

/// Category tree (L1 > L2 > L3) for one brand and window with the default
/// configuration. Fails only for an unparseable month or mode.
pub fn build_cost_hierarchy(
    dataset: &LedgerDataset,
    brand_code: &str,
    target_month: &str,
    mode: &str,
) -> Result<HierarchyNode> {
    let processor = CostReportProcessor::default();
    let query = processor.parse_query(brand_code, target_month, mode)?;
    Ok(processor.build_tree(dataset, &query))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(month: &str, brand: &str, cctr: &str, l1: &str, l3: &str, amount: f64) -> CostRecord {
        CostRecord {
            month: month.to_string(),
            brand_code: brand.to_string(),
            cost_center_code: cctr.to_string(),
            cost_center_name: cctr.to_string(),
            cost_center_type: None,
            category_l1: l1.to_string(),
            category_l2: "급여".to_string(),
            category_l3: l3.to_string(),
            gl_code: String::new(),
            gl_name: "급료".to_string(),
            amount,
        }
    }

    #[test]
    fn test_build_cost_hierarchy_rejects_bad_parameters() {
        let dataset = LedgerDataset::new();
        assert!(matches!(
            build_cost_hierarchy(&dataset, "MLB", "2024-13", "monthly"),
            Err(CostReportError::InvalidMonth(_))
        ));
        assert!(matches!(
            build_cost_hierarchy(&dataset, "MLB", "202410", "weekly"),
            Err(CostReportError::InvalidMode(_))
        ));
        let empty = build_cost_hierarchy(&dataset, "NOPE", "202410", "ytd").unwrap();
        assert!(empty.is_leaf());
    }

    #[test]
    fn test_brand_alias_in_query() {
        let dataset = LedgerDataset::new().with_costs(vec![
            record("202410", "MLB_KIDS", "F1", "인건비", "정규직", 10.0),
            record("202410", "MLB", "F1", "인건비", "정규직", 99.0),
        ]);
        let tree = build_cost_hierarchy(&dataset, "i", "202410", "monthly").unwrap();
        assert_eq!(tree.current_amount, 10.0);
    }

    #[test]
    fn test_query_assembles_report() {
        let dataset = LedgerDataset::new().with_costs(vec![
            record("202410", "MLB", "F1", "인건비", "정규직", 100.0),
            record("202410", "MLB", "Z9", "인건비", "정규직", 20.0),
            record("202310", "MLB", "F1", "인건비", "정규직", 80.0),
        ]);

        let processor = CostReportProcessor::new(ReportConfig {
            unit_divisor: 1.0,
            ..ReportConfig::default()
        })
        .unwrap();
        let report = processor
            .query_with_verification(&dataset, "M", "2024-10", "Monthly", 1e-9)
            .unwrap();

        assert_eq!(report.brand_code, "MLB");
        assert_eq!(report.mode, ViewMode::Monthly);
        assert_eq!(report.tree.current_amount, 120.0);
        assert_eq!(report.table.total().unwrap().current, 120.0);
        assert_eq!(report.kpi.total_cost.current, 120.0);
        assert_eq!(report.categories.len(), 1);
        assert!(report.data_source.costs);
        assert!(!report.data_source.sales);
    }

    #[test]
    fn test_processor_rejects_invalid_config() {
        let config = ReportConfig {
            unit_divisor: -1.0,
            ..ReportConfig::default()
        };
        assert!(matches!(
            CostReportProcessor::new(config),
            Err(CostReportError::ConfigError(_))
        ));
    }
}
