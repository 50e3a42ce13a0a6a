use crate::config::ReportConfig;
use crate::schema::{CostRecord, HeadcountRecord, SalesRecord, StoreRecord, ViewMode};
use crate::utils::{months_between, parse_year_month, YearMonth};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive span of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl PeriodWindow {
    pub fn contains(&self, month: &str) -> bool {
        match parse_year_month(month) {
            Ok(ym) => self.start <= ym && ym <= self.end,
            Err(_) => false,
        }
    }

    pub fn months(&self) -> Vec<YearMonth> {
        months_between(self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonWindows {
    pub current: PeriodWindow,
    pub prior: PeriodWindow,
}

pub fn comparison_windows(target: YearMonth, mode: ViewMode) -> ComparisonWindows {
    let prior_target = target.prior_year();
    match mode {
        ViewMode::Monthly => ComparisonWindows {
            current: PeriodWindow {
                start: target,
                end: target,
            },
            prior: PeriodWindow {
                start: prior_target,
                end: prior_target,
            },
        },
        ViewMode::Ytd => ComparisonWindows {
            current: PeriodWindow {
                start: target.year_start(),
                end: target,
            },
            prior: PeriodWindow {
                start: prior_target.year_start(),
                end: prior_target,
            },
        },
    }
}

/// Anything carrying a month and a brand that can be windowed.
pub trait MonthlyRecord {
    fn month(&self) -> &str;
    fn brand_code(&self) -> &str;
}

macro_rules! impl_monthly_record {
    ($($ty:ty),*) => {
        $(
            impl MonthlyRecord for $ty {
                fn month(&self) -> &str {
                    &self.month
                }

                fn brand_code(&self) -> &str {
                    &self.brand_code
                }
            }
        )*
    };
}

impl_monthly_record!(CostRecord, SalesRecord, HeadcountRecord, StoreRecord);

/// The two record subsets a comparison is made from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSet<T> {
    pub current: Vec<T>,
    pub prior: Vec<T>,
}

impl<T> Default for PeriodSet<T> {
    fn default() -> Self {
        Self {
            current: Vec::new(),
            prior: Vec::new(),
        }
    }
}

impl<T> PeriodSet<T> {
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.prior.is_empty()
    }

    pub fn len(&self) -> usize {
        self.current.len() + self.prior.len()
    }
}

/// Splits `records` of one brand into the current and prior windows.
/// Records outside both windows are dropped.
pub fn select_period<T: MonthlyRecord + Clone>(
    records: &[T],
    brand_code: &str,
    windows: &ComparisonWindows,
) -> PeriodSet<T> {
    let mut set = PeriodSet::default();

    for record in records.iter().filter(|r| r.brand_code() == brand_code) {
        if windows.current.contains(record.month()) {
            set.current.push(record.clone());
        } else if windows.prior.contains(record.month()) {
            set.prior.push(record.clone());
        }
    }

    set
}

/// Cost rows summed over cost centers for one (month, category path) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub month: String,
    pub category_l1: String,
    pub category_l2: String,
    pub category_l3: String,
    pub gl_name: String,
    pub amount: f64,
}

/// Sums rows that share a (month, L1, L2, L3, GL) key, whatever cost center
/// they were booked under.
pub fn combine_cost_centers(records: &[CostRecord]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<(&str, &str, &str, &str, &str), f64> = BTreeMap::new();

    for r in records {
        *totals
            .entry((
                r.month.as_str(),
                r.category_l1.as_str(),
                r.category_l2.as_str(),
                r.category_l3.as_str(),
                r.gl_name.as_str(),
            ))
            .or_default() += r.amount;
    }

    totals
        .into_iter()
        .map(|((month, l1, l2, l3, gl), amount)| CategoryTotal {
            month: month.to_string(),
            category_l1: l1.to_string(),
            category_l2: l2.to_string(),
            category_l3: l3.to_string(),
            gl_name: gl.to_string(),
            amount,
        })
        .collect()
}

impl PeriodSet<CostRecord> {
    pub fn combined(&self) -> PeriodSet<CategoryTotal> {
        PeriodSet {
            current: combine_cost_centers(&self.current),
            prior: combine_cost_centers(&self.prior),
        }
    }
}

/// Total cost, leaving out the configured shared-cost L1 categories.
pub fn sum_costs(records: &[CostRecord], config: &ReportConfig) -> f64 {
    records
        .iter()
        .filter(|r| !config.is_excluded_l1(&r.category_l1))
        .map(|r| r.amount)
        .sum()
}

/// Cost booked under the salary L3 category.
pub fn sum_salary(records: &[CostRecord], config: &ReportConfig) -> f64 {
    records
        .iter()
        .filter(|r| r.category_l3 == config.salary_l3)
        .map(|r| r.amount)
        .sum()
}

pub fn sum_sales(records: &[SalesRecord]) -> f64 {
    records.iter().map(|r| r.total_sales).sum()
}

/// Mean of per-month totals over the months that actually have data.
/// Headcount and store counts are levels, not flows, so a window averages them.
pub fn mean_over_present_months<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut per_month: BTreeMap<&str, f64> = BTreeMap::new();
    for (month, value) in values {
        *per_month.entry(month).or_default() += value;
    }

    if per_month.is_empty() {
        return None;
    }

    Some(per_month.values().sum::<f64>() / per_month.len() as f64)
}

pub fn mean_headcount(records: &[HeadcountRecord]) -> Option<f64> {
    mean_over_present_months(records.iter().map(|r| (r.month.as_str(), r.value)))
}

/// Store count averaged over months, counting only allow-listed channels.
pub fn mean_store_count(records: &[StoreRecord], config: &ReportConfig) -> Option<f64> {
    mean_over_present_months(
        records
            .iter()
            .filter(|r| config.is_counted_channel(&r.channel))
            .map(|r| (r.month.as_str(), r.value)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(s: &str) -> YearMonth {
        parse_year_month(s).unwrap()
    }

    fn cost(month: &str, cctr: &str, l1: &str, l3: &str, amount: f64) -> CostRecord {
        CostRecord {
            month: month.to_string(),
            brand_code: "MLB".to_string(),
            cost_center_code: cctr.to_string(),
            cost_center_name: cctr.to_string(),
            cost_center_type: None,
            category_l1: l1.to_string(),
            category_l2: "L2".to_string(),
            category_l3: l3.to_string(),
            gl_code: String::new(),
            gl_name: "GL".to_string(),
            amount,
        }
    }

    #[test]
    fn test_monthly_windows() {
        let w = comparison_windows(ym("202410"), ViewMode::Monthly);
        assert!(w.current.contains("202410"));
        assert!(!w.current.contains("202409"));
        assert!(w.prior.contains("202310"));
        assert!(!w.prior.contains("202309"));
        assert_eq!(w.current.months().len(), 1);
    }

    #[test]
    fn test_ytd_windows() {
        let w = comparison_windows(ym("202406"), ViewMode::Ytd);
        assert!(w.current.contains("202401"));
        assert!(w.current.contains("202406"));
        assert!(!w.current.contains("202407"));
        assert!(!w.current.contains("202312"));
        assert!(w.prior.contains("202301"));
        assert!(w.prior.contains("202306"));
        assert!(!w.prior.contains("202307"));
        assert_eq!(w.prior.months().len(), 6);
        assert!(!w.current.contains("garbage"));
    }

    #[test]
    fn test_select_period_filters_brand_and_window() {
        let mut other_brand = cost("202410", "A", "인건비", "정규직", 7.0);
        other_brand.brand_code = "DISCOVERY".to_string();

        let records = vec![
            cost("202410", "A", "인건비", "정규직", 100.0),
            cost("202310", "A", "인건비", "정규직", 80.0),
            cost("202409", "A", "인건비", "정규직", 999.0),
            other_brand,
        ];

        let windows = comparison_windows(ym("202410"), ViewMode::Monthly);
        let set = select_period(&records, "MLB", &windows);
        assert_eq!(set.current.len(), 1);
        assert_eq!(set.prior.len(), 1);
        assert_eq!(set.current[0].amount, 100.0);
        assert_eq!(set.prior[0].amount, 80.0);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_cost_centers_are_summed_not_overwritten() {
        let records = vec![
            cost("202410", "F100", "인건비", "정규직", 100.0),
            cost("202410", "Z200", "인건비", "정규직", 40.0),
            cost("202410", "Z200", "인건비", "계약직", 5.0),
        ];
        let combined = combine_cost_centers(&records);
        assert_eq!(combined.len(), 2);
        let regular = combined
            .iter()
            .find(|c| c.category_l3 == "정규직")
            .unwrap();
        assert_eq!(regular.amount, 140.0);
    }

    #[test]
    fn test_ytd_equals_sum_of_monthly() {
        let categories = ["인건비", "임차료", "광고선전비"];
        let mut records = Vec::new();
        for m in 1..=6 {
            for (i, cat) in categories.iter().enumerate() {
                let amount = (m * 10 + i) as f64;
                records.push(cost(&format!("2024{:02}", m), "A", cat, "x", amount));
            }
        }

        let ytd = select_period(&records, "MLB", &comparison_windows(ym("202406"), ViewMode::Ytd));

        for cat in categories {
            let ytd_total: f64 = ytd
                .current
                .iter()
                .filter(|r| r.category_l1 == cat)
                .map(|r| r.amount)
                .sum();

            let monthly_total: f64 = (1..=6)
                .map(|m| {
                    let target = ym(&format!("2024{:02}", m));
                    select_period(&records, "MLB", &comparison_windows(target, ViewMode::Monthly))
                        .current
                        .iter()
                        .filter(|r| r.category_l1 == cat)
                        .map(|r| r.amount)
                        .sum::<f64>()
                })
                .sum();

            assert!((ytd_total - monthly_total).abs() < 1e-9, "category {}", cat);
        }
    }

    #[test]
    fn test_scalar_metrics_average_levels_and_sum_flows() {
        let headcount = vec![
            HeadcountRecord {
                brand_code: "MLB".into(),
                month: "202401".into(),
                value: 100.0,
            },
            HeadcountRecord {
                brand_code: "MLB".into(),
                month: "202403".into(),
                value: 110.0,
            },
        ];
        assert_eq!(mean_headcount(&headcount), Some(105.0));
        assert_eq!(mean_headcount(&[]), None);

        let config = ReportConfig::default();
        let stores = vec![
            StoreRecord {
                brand_code: "MLB".into(),
                month: "202401".into(),
                channel: "백화점".into(),
                value: 10.0,
            },
            StoreRecord {
                brand_code: "MLB".into(),
                month: "202401".into(),
                channel: "아울렛".into(),
                value: 4.0,
            },
            StoreRecord {
                brand_code: "MLB".into(),
                month: "202401".into(),
                channel: "온라인".into(),
                value: 99.0,
            },
            StoreRecord {
                brand_code: "MLB".into(),
                month: "202402".into(),
                channel: "백화점".into(),
                value: 12.0,
            },
        ];
        assert_eq!(mean_store_count(&stores, &config), Some(13.0));

        let sales = vec![
            SalesRecord {
                month: "202401".into(),
                brand_code: "MLB".into(),
                total_sales: 500.0,
            },
            SalesRecord {
                month: "202402".into(),
                brand_code: "MLB".into(),
                total_sales: 700.0,
            },
        ];
        assert_eq!(sum_sales(&sales), 1200.0);
    }

    #[test]
    fn test_shared_costs_excluded_from_totals() {
        let config = ReportConfig::default();
        let records = vec![
            cost("202410", "A", "인건비", "급료와 임금", 100.0),
            cost("202410", "A", "공통비", "배부", 30.0),
        ];
        assert_eq!(sum_costs(&records, &config), 100.0);
        assert_eq!(sum_salary(&records, &config), 100.0);
    }
}
