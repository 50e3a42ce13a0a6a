//! Flattened cost table: one row per node down to L3, in display order.

use crate::config::ReportConfig;
use crate::hierarchy::HierarchyNode;
use crate::utils::to_reporting_unit;
use crate::yoy::{CostTrend, YoyRatio};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Children listed in a change description when a node has more than
/// [`BREAKDOWN_MIN_CHILDREN`] of them.
const BREAKDOWN_TOP_N: usize = 4;
const BREAKDOWN_MIN_CHILDREN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLevel {
    Total,
    L1,
    L2,
    L3,
}

impl RowLevel {
    fn below(self) -> Option<Self> {
        match self {
            RowLevel::Total => Some(RowLevel::L1),
            RowLevel::L1 => Some(RowLevel::L2),
            RowLevel::L2 => Some(RowLevel::L3),
            RowLevel::L3 => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTableRow {
    pub level: RowLevel,
    /// Category names from L1 down to this row; empty for the total row.
    pub path: Vec<String>,
    pub name: String,
    /// Amounts in reporting units.
    pub current: f64,
    pub prior: f64,
    pub diff: f64,
    pub yoy: YoyRatio,
    pub trend: CostTrend,
    pub description: String,
    pub has_children: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTable {
    pub unit_label: String,
    pub rows: Vec<CostTableRow>,
}

impl CostTable {
    /// Total row first, then each L1 followed by its L2 rows and their L3
    /// rows, siblings largest first. Deeper levels of the tree are ignored.
    pub fn from_tree(tree: &HierarchyNode, config: &ReportConfig) -> Self {
        let mut rows = Vec::new();
        push_rows(tree, RowLevel::Total, &mut Vec::new(), config, &mut rows);
        Self {
            unit_label: config.unit_label.clone(),
            rows,
        }
    }

    pub fn total(&self) -> Option<&CostTableRow> {
        self.rows.first().filter(|r| r.level == RowLevel::Total)
    }

    pub fn rows_at(&self, level: RowLevel) -> impl Iterator<Item = &CostTableRow> {
        self.rows.iter().filter(move |r| r.level == level)
    }

    /// Direct children of the row addressed by `path`.
    pub fn children_of(&self, path: &[&str]) -> Vec<&CostTableRow> {
        self.rows
            .iter()
            .filter(|r| {
                r.path.len() == path.len() + 1
                    && r.path.iter().zip(path).all(|(a, b)| a.as_str() == *b)
            })
            .collect()
    }
}

fn push_rows(
    node: &HierarchyNode,
    level: RowLevel,
    path: &mut Vec<String>,
    config: &ReportConfig,
    rows: &mut Vec<CostTableRow>,
) {
    let yoy = node.yoy();
    let child_level = level.below();

    rows.push(CostTableRow {
        level,
        path: path.clone(),
        name: node.name.clone(),
        current: to_reporting_unit(node.current_amount, config.unit_divisor),
        prior: to_reporting_unit(node.prior_amount, config.unit_divisor),
        diff: to_reporting_unit(node.diff(), config.unit_divisor),
        yoy,
        trend: yoy.trend(),
        description: describe_change(node, config),
        has_children: child_level.is_some() && !node.is_leaf(),
    });

    let Some(child_level) = child_level else {
        return;
    };

    for child in node.sorted_children() {
        path.push(child.name.clone());
        push_rows(child, child_level, path, config, rows);
        path.pop();
    }
}

/// One-line Korean summary of a node's year-over-year change, e.g.
/// `전년 대비 87.5% 증가, 전년대비 +70백만원 증가`. Nodes with more than three
/// children get the four largest movers appended.
pub fn describe_change(node: &HierarchyNode, config: &ReportConfig) -> String {
    let diff = node.diff();
    let amount = signed_amount(diff, config.unit_divisor);

    let mut text = if node.current_amount == 0.0 && node.prior_amount == 0.0 {
        "전년 대비 변동 없음".to_string()
    } else {
        match node.yoy() {
            YoyRatio::New => format!("전년 대비 신규, 전년대비 {}{} 증가", amount, config.unit_label),
            YoyRatio::Percent(pct) => format!(
                "전년 대비 {:.1}% {}, 전년대비 {}{} {}",
                (pct - 100.0).abs(),
                direction(pct >= 100.0),
                amount,
                config.unit_label,
                direction(diff >= 0.0)
            ),
        }
    };

    if node.children.len() > BREAKDOWN_MIN_CHILDREN {
        let mut movers: Vec<&HierarchyNode> = node.children.values().collect();
        movers.sort_by(|a, b| {
            b.diff()
                .abs()
                .partial_cmp(&a.diff().abs())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        let changes: Vec<String> = movers
            .iter()
            .take(BREAKDOWN_TOP_N)
            .map(|c| {
                format!(
                    "{} {}{}",
                    c.name,
                    signed_amount(c.diff(), config.unit_divisor),
                    config.unit_label
                )
            })
            .collect();

        text.push_str(". 주요 증감: ");
        text.push_str(&changes.join(", "));
    }

    text
}

fn direction(increase: bool) -> &'static str {
    if increase {
        "증가"
    } else {
        "감소"
    }
}

fn signed_amount(raw: f64, unit_divisor: f64) -> String {
    let units = group_thousands(to_reporting_unit(raw, unit_divisor));
    if raw >= 0.0 {
        format!("+{}", units)
    } else {
        units
    }
}

/// Whole number with comma thousands separators.
pub fn group_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
