//! Brand-level KPIs: total cost, cost-to-sales ratio and per-person /
//! per-store efficiency, each against the prior window.
//!
//! Amounts are computed raw and scaled to reporting units only at the end, so
//! YoY ratios are never distorted by rounding. Headcount and store count are
//! levels and are averaged over the months present; when the prior window has
//! none, the current value stands in for it.

use crate::config::ReportConfig;
use crate::dataset::LedgerDataset;
use crate::period::{
    comparison_windows, mean_headcount, mean_over_present_months, mean_store_count,
    select_period, sum_costs, sum_salary, sum_sales, ComparisonWindows, PeriodSet,
};
use crate::schema::{Brand, CostRecord, ViewMode};
use crate::utils::{round1, to_reporting_unit, to_reporting_unit_1dp, YearMonth};
use crate::yoy::{compare, yoy_ratio, MetricKind, YoyChange, YoyRatio};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Unscaled KPI inputs for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub total_cost: f64,
    pub sales: f64,
    pub salary_cost: f64,
    pub headcount: f64,
    pub store_count: f64,
}

impl KpiSnapshot {
    /// Cost as a percentage of VAT-inclusive sales.
    pub fn cost_ratio(&self, vat_factor: f64) -> f64 {
        if self.sales > 0.0 {
            self.total_cost / self.sales * vat_factor * 100.0
        } else {
            0.0
        }
    }

    pub fn cost_per_person(&self) -> f64 {
        per_unit(self.total_cost, self.headcount)
    }

    pub fn cost_per_store(&self) -> f64 {
        per_unit(self.total_cost, self.store_count)
    }

    pub fn salary_per_person(&self) -> f64 {
        per_unit(self.salary_cost, self.headcount)
    }
}

fn per_unit(amount: f64, count: f64) -> f64 {
    if count > 0.0 {
        amount / count
    } else {
        0.0
    }
}

/// A metric in display form plus its comparison against the prior window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiMetric {
    pub current: f64,
    pub prior: f64,
    pub change: YoyChange,
}

impl KpiMetric {
    fn amount(current: f64, prior: f64, scale: impl Fn(f64) -> f64) -> Self {
        Self {
            current: scale(current),
            prior: scale(prior),
            change: YoyChange::Ratio {
                diff: scale(current - prior),
                ratio: yoy_ratio(current, prior),
            },
        }
    }

    fn ratio(current: f64, prior: f64) -> Self {
        Self {
            current: round1(current),
            prior: round1(prior),
            change: compare(MetricKind::Ratio, current, prior),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandKpi {
    pub brand_code: String,
    pub current: KpiSnapshot,
    pub prior: KpiSnapshot,
    /// Reporting units.
    pub total_cost: KpiMetric,
    /// Percent; compared in percentage points.
    pub cost_ratio: KpiMetric,
    /// Reporting units, one decimal.
    pub cost_per_person: KpiMetric,
    /// Reporting units.
    pub cost_per_store: KpiMetric,
    /// Reporting units, one decimal.
    pub salary_per_person: KpiMetric,
}

impl BrandKpi {
    pub fn compute(
        brand_code: &str,
        dataset: &LedgerDataset,
        windows: &ComparisonWindows,
        config: &ReportConfig,
    ) -> Self {
        let costs = select_period(dataset.costs(), brand_code, windows);
        let sales = select_period(dataset.sales(), brand_code, windows);
        let headcount = select_period(dataset.headcount(), brand_code, windows);
        let stores = select_period(dataset.stores(), brand_code, windows);

        let current_headcount = mean_headcount(&headcount.current);
        let current_stores = mean_store_count(&stores.current, config);

        let current = KpiSnapshot {
            total_cost: sum_costs(&costs.current, config),
            sales: sum_sales(&sales.current),
            salary_cost: sum_salary(&costs.current, config),
            headcount: current_headcount.unwrap_or(0.0),
            store_count: current_stores.unwrap_or(0.0),
        };

        let prior = KpiSnapshot {
            total_cost: sum_costs(&costs.prior, config),
            sales: sum_sales(&sales.prior),
            salary_cost: sum_salary(&costs.prior, config),
            headcount: mean_headcount(&headcount.prior).unwrap_or(current.headcount),
            store_count: mean_store_count(&stores.prior, config).unwrap_or(current.store_count),
        };

        debug!(
            "KPI inputs for {}: current {:?}, prior {:?}",
            brand_code, current, prior
        );

        Self::from_snapshots(brand_code, current, prior, config)
    }

    pub fn from_snapshots(
        brand_code: &str,
        current: KpiSnapshot,
        prior: KpiSnapshot,
        config: &ReportConfig,
    ) -> Self {
        let whole = |v: f64| to_reporting_unit(v, config.unit_divisor);
        let one_decimal = |v: f64| to_reporting_unit_1dp(v, config.unit_divisor);

        Self {
            brand_code: brand_code.to_string(),
            total_cost: KpiMetric::amount(current.total_cost, prior.total_cost, whole),
            cost_ratio: KpiMetric::ratio(
                current.cost_ratio(config.vat_factor),
                prior.cost_ratio(config.vat_factor),
            ),
            cost_per_person: KpiMetric::amount(
                current.cost_per_person(),
                prior.cost_per_person(),
                one_decimal,
            ),
            cost_per_store: KpiMetric::amount(current.cost_per_store(), prior.cost_per_store(), whole),
            salary_per_person: KpiMetric::amount(
                current.salary_per_person(),
                prior.salary_per_person(),
                one_decimal,
            ),
            current,
            prior,
        }
    }
}

/// KPIs for every brand over the same windows.
pub fn brand_overview(
    dataset: &LedgerDataset,
    windows: &ComparisonWindows,
    config: &ReportConfig,
) -> Vec<BrandKpi> {
    Brand::ALL
        .iter()
        .map(|brand| BrandKpi::compute(brand.as_str(), dataset, windows, config))
        .collect()
}

/// One L1 category's share of a brand's cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAmount {
    pub category: String,
    /// Reporting units.
    pub current: f64,
    pub prior: f64,
    pub yoy: YoyRatio,
    /// Percent of the current total.
    pub share: f64,
}

/// L1 totals, largest first, without the excluded shared-cost categories.
pub fn category_breakdown(costs: &PeriodSet<CostRecord>, config: &ReportConfig) -> Vec<CategoryAmount> {
    let mut totals: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for r in costs.current.iter().filter(|r| !config.is_excluded_l1(&r.category_l1)) {
        totals.entry(r.category_l1.as_str()).or_default().0 += r.amount;
    }
    for r in costs.prior.iter().filter(|r| !config.is_excluded_l1(&r.category_l1)) {
        totals.entry(r.category_l1.as_str()).or_default().1 += r.amount;
    }

    let grand_total: f64 = totals.values().map(|(current, _)| current).sum();

    let mut rows: Vec<CategoryAmount> = totals
        .into_iter()
        .map(|(category, (current, prior))| CategoryAmount {
            category: category.to_string(),
            current: to_reporting_unit(current, config.unit_divisor),
            prior: to_reporting_unit(prior, config.unit_divisor),
            yoy: yoy_ratio(current, prior),
            share: if grand_total > 0.0 {
                round1(current / grand_total * 100.0)
            } else {
                0.0
            },
        })
        .collect();

    rows.sort_by(|a, b| {
        b.current
            .partial_cmp(&a.current)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    rows
}

/// One month and L1 category of the trend series. Amounts are raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub category_l1: String,
    pub cost: f64,
    pub sales: f64,
    pub headcount: f64,
    pub store_count: f64,
}

/// Per-month, per-L1 cost from January through the target month of the prior
/// year and then of the target year. Months without cost rows are omitted;
/// a month without headcount or store rows uses the target month's value.
pub fn monthly_trend(
    dataset: &LedgerDataset,
    brand_code: &str,
    target: YearMonth,
    config: &ReportConfig,
) -> Vec<MonthlyPoint> {
    let windows = comparison_windows(target, ViewMode::Ytd);
    let costs = select_period(dataset.costs(), brand_code, &windows);
    let sales = select_period(dataset.sales(), brand_code, &windows);
    let headcount = select_period(dataset.headcount(), brand_code, &windows);
    let stores = select_period(dataset.stores(), brand_code, &windows);

    let target_key = target.to_string();
    let fallback_headcount = mean_over_present_months(
        headcount
            .current
            .iter()
            .filter(|r| r.month == target_key)
            .map(|r| (r.month.as_str(), r.value)),
    )
    .unwrap_or(0.0);
    let fallback_stores = mean_over_present_months(
        stores
            .current
            .iter()
            .filter(|r| r.month == target_key && config.is_counted_channel(&r.channel))
            .map(|r| (r.month.as_str(), r.value)),
    )
    .unwrap_or(0.0);

    let mut points = Vec::new();
    let passes = [
        (windows.prior, &costs.prior, &sales.prior, &headcount.prior, &stores.prior),
        (windows.current, &costs.current, &sales.current, &headcount.current, &stores.current),
    ];

    for (window, cost_rows, sales_rows, headcount_rows, store_rows) in passes {
        for month in window.months() {
            let key = month.to_string();

            let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
            for r in cost_rows
                .iter()
                .filter(|r| r.month == key && !config.is_excluded_l1(&r.category_l1))
            {
                *by_category.entry(r.category_l1.as_str()).or_default() += r.amount;
            }
            if by_category.is_empty() {
                continue;
            }

            let month_sales: f64 = sales_rows
                .iter()
                .filter(|r| r.month == key)
                .map(|r| r.total_sales)
                .sum();
            let month_headcount = mean_over_present_months(
                headcount_rows
                    .iter()
                    .filter(|r| r.month == key)
                    .map(|r| (r.month.as_str(), r.value)),
            )
            .unwrap_or(fallback_headcount);
            let month_stores = mean_over_present_months(
                store_rows
                    .iter()
                    .filter(|r| r.month == key && config.is_counted_channel(&r.channel))
                    .map(|r| (r.month.as_str(), r.value)),
            )
            .unwrap_or(fallback_stores);

            for (category, cost) in by_category {
                points.push(MonthlyPoint {
                    month: key.clone(),
                    category_l1: category.to_string(),
                    cost,
                    sales: month_sales,
                    headcount: month_headcount,
                    store_count: month_stores,
                });
            }
        }
    }

    points
}
