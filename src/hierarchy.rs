use crate::config::ReportConfig;
use crate::error::{CostReportError, Result};
use crate::period::CategoryTotal;
use crate::schema::CostRecord;
use crate::yoy::{diff, yoy_ratio, YoyRatio};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A row that can be placed in the category tree.
pub trait CategorizedAmount {
    /// `[L1, L2, L3, GL account]`
    fn category_path(&self) -> [&str; 4];
    fn amount(&self) -> f64;
}

impl CategorizedAmount for CostRecord {
    fn category_path(&self) -> [&str; 4] {
        [
            &self.category_l1,
            &self.category_l2,
            &self.category_l3,
            &self.gl_name,
        ]
    }

    fn amount(&self) -> f64 {
        self.amount
    }
}

impl CategorizedAmount for CategoryTotal {
    fn category_path(&self) -> [&str; 4] {
        [
            &self.category_l1,
            &self.category_l2,
            &self.category_l3,
            &self.gl_name,
        ]
    }

    fn amount(&self) -> f64 {
        self.amount
    }
}

/// How deep a tree is materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyDepth {
    /// L1 > L2 > L3
    #[default]
    Category,
    /// L1 > L2 > L3 > GL account
    GlAccount,
}

impl HierarchyDepth {
    pub fn levels(&self) -> usize {
        match self {
            HierarchyDepth::Category => 3,
            HierarchyDepth::GlAccount => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub name: String,
    pub current_amount: f64,
    pub prior_amount: f64,
    pub children: BTreeMap<String, HierarchyNode>,
}

impl HierarchyNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current_amount: 0.0,
            prior_amount: 0.0,
            children: BTreeMap::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&HierarchyNode> {
        self.children.get(name)
    }

    /// Walks `path` from this node; an empty path returns `self`.
    pub fn find(&self, path: &[&str]) -> Option<&HierarchyNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    pub fn diff(&self) -> f64 {
        diff(self.current_amount, self.prior_amount)
    }

    pub fn yoy(&self) -> YoyRatio {
        yoy_ratio(self.current_amount, self.prior_amount)
    }

    /// Children by current amount, largest first, ties broken by name.
    pub fn sorted_children(&self) -> Vec<&HierarchyNode> {
        let mut children: Vec<&HierarchyNode> = self.children.values().collect();
        children.sort_by(|a, b| {
            b.current_amount
                .partial_cmp(&a.current_amount)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        children
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.children.keys().map(|k| k.as_str()).collect()
    }

    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.values().map(|c| c.leaf_count()).sum()
        }
    }

    /// Number of levels below this node.
    pub fn height(&self) -> usize {
        self.children
            .values()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Checks that every internal node equals the sum of its children, for
    /// both periods, all the way down.
    pub fn verify_rollup(&self, tolerance: f64) -> Result<()> {
        self.verify_rollup_at(&self.name, tolerance)
    }

    fn verify_rollup_at(&self, path: &str, tolerance: f64) -> Result<()> {
        if self.is_leaf() {
            return Ok(());
        }

        let current: f64 = self.children.values().map(|c| c.current_amount).sum();
        let prior: f64 = self.children.values().map(|c| c.prior_amount).sum();

        for (side, node_total, children_total) in [
            ("current", self.current_amount, current),
            ("prior", self.prior_amount, prior),
        ] {
            if (node_total - children_total).abs() > tolerance {
                return Err(CostReportError::RollupViolation {
                    path: path.to_string(),
                    side,
                    node_total,
                    children_total,
                });
            }
        }

        for child in self.children.values() {
            child.verify_rollup_at(&format!("{} > {}", path, child.name), tolerance)?;
        }

        Ok(())
    }

    fn insert_leaf(&mut self, path: &[String], current: f64, prior: f64) {
        let Some((head, rest)) = path.split_first() else {
            self.current_amount += current;
            self.prior_amount += prior;
            return;
        };

        self.children
            .entry(head.clone())
            .or_insert_with(|| HierarchyNode::new(head.clone()))
            .insert_leaf(rest, current, prior);
    }

    fn roll_up(&mut self) {
        if self.is_leaf() {
            return;
        }

        let mut current = 0.0;
        let mut prior = 0.0;
        for child in self.children.values_mut() {
            child.roll_up();
            current += child.current_amount;
            prior += child.prior_amount;
        }
        self.current_amount = current;
        self.prior_amount = prior;
    }
}

/// Folds current and prior rows into one tree.
///
/// Leaf totals are accumulated in a path-keyed map first, then placed into an
/// owned tree and rolled up, so a parent is always exactly the sum of its
/// children regardless of input order.
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    depth: HierarchyDepth,
    placeholder: String,
    root_label: String,
}

impl HierarchyBuilder {
    pub fn new(depth: HierarchyDepth) -> Self {
        Self::from_config(&ReportConfig::default(), depth)
    }

    pub fn from_config(config: &ReportConfig, depth: HierarchyDepth) -> Self {
        Self {
            depth,
            placeholder: config.placeholder.clone(),
            root_label: config.total_label.clone(),
        }
    }

    pub fn depth(&self) -> HierarchyDepth {
        self.depth
    }

    pub fn build<T: CategorizedAmount>(&self, current: &[T], prior: &[T]) -> HierarchyNode {
        let mut leaves: BTreeMap<Vec<String>, (f64, f64)> = BTreeMap::new();

        for row in current {
            leaves.entry(self.key(row)).or_default().0 += row.amount();
        }
        for row in prior {
            leaves.entry(self.key(row)).or_default().1 += row.amount();
        }

        let mut root = HierarchyNode::new(self.root_label.clone());
        for (path, (cur, prev)) in &leaves {
            root.insert_leaf(path, *cur, *prev);
        }
        root.roll_up();

        debug!(
            "Built {:?} hierarchy: {} leaves from {} current / {} prior rows",
            self.depth,
            leaves.len(),
            current.len(),
            prior.len()
        );

        root
    }

    fn key<T: CategorizedAmount>(&self, row: &T) -> Vec<String> {
        row.category_path()
            .iter()
            .take(self.depth.levels())
            .map(|segment| label_or(segment, &self.placeholder).to_string())
            .collect()
    }
}

/// Trimmed `value`, or `placeholder` when blank.
pub(crate) fn label_or<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(l1: &str, l2: &str, l3: &str, gl: &str, amount: f64) -> CategoryTotal {
        CategoryTotal {
            month: "202410".to_string(),
            category_l1: l1.to_string(),
            category_l2: l2.to_string(),
            category_l3: l3.to_string(),
            gl_name: gl.to_string(),
            amount,
        }
    }

    #[test]
    fn test_concrete_scenario() {
        let current = vec![
            row("인건비", "급여", "정규직", "급료", 100.0),
            row("인건비", "급여", "계약직", "급료", 50.0),
        ];
        let prior = vec![row("인건비", "급여", "정규직", "급료", 80.0)];

        let tree = HierarchyBuilder::new(HierarchyDepth::Category).build(&current, &prior);

        let l1 = tree.find(&["인건비"]).unwrap();
        assert_eq!(l1.current_amount, 150.0);
        assert_eq!(l1.prior_amount, 80.0);
        assert_eq!(l1.yoy(), YoyRatio::Percent(187.5));

        let l2 = tree.find(&["인건비", "급여"]).unwrap();
        assert_eq!(l2.current_amount, 150.0);
        assert_eq!(l2.prior_amount, 80.0);

        let contract = tree.find(&["인건비", "급여", "계약직"]).unwrap();
        assert_eq!(contract.prior_amount, 0.0);
        assert_eq!(contract.current_amount, 50.0);
        assert_eq!(contract.yoy(), YoyRatio::New);

        assert_eq!(tree.height(), 3);
        tree.verify_rollup(1e-9).unwrap();
    }

    #[test]
    fn test_node_exists_when_touched_by_either_pass() {
        let current = vec![row("임차료", "매장", "보증금", "임차", 10.0)];
        let prior = vec![row("물류비", "운반", "택배", "운반비", 4.0)];
        let tree = HierarchyBuilder::new(HierarchyDepth::Category).build(&current, &prior);

        let gone = tree.find(&["물류비", "운반", "택배"]).unwrap();
        assert_eq!(gone.current_amount, 0.0);
        assert_eq!(gone.prior_amount, 4.0);
        assert_eq!(gone.yoy(), YoyRatio::Percent(0.0));
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn test_gl_level_only_when_requested() {
        let current = vec![
            row("마케팅비", "광고", "매체", "TV광고", 30.0),
            row("마케팅비", "광고", "매체", "디지털광고", 20.0),
        ];

        let shallow = HierarchyBuilder::new(HierarchyDepth::Category).build(&current, &[]);
        assert_eq!(shallow.height(), 3);
        assert!(shallow.find(&["마케팅비", "광고", "매체"]).unwrap().is_leaf());

        let deep = HierarchyBuilder::new(HierarchyDepth::GlAccount).build(&current, &[]);
        assert_eq!(deep.height(), 4);
        assert_eq!(deep.leaf_count(), 2);
        assert_eq!(
            deep.find(&["마케팅비", "광고", "매체", "TV광고"])
                .unwrap()
                .current_amount,
            30.0
        );
        deep.verify_rollup(1e-9).unwrap();
    }

    #[test]
    fn test_blank_segments_use_placeholder() {
        let current = vec![row("", " ", "정규직", "", 7.0)];
        let tree = HierarchyBuilder::new(HierarchyDepth::GlAccount).build(&current, &[]);
        let node = tree.find(&["미분류", "미분류", "정규직", "미분류"]).unwrap();
        assert_eq!(node.current_amount, 7.0);
        assert_eq!(tree.current_amount, 7.0);
    }

    #[test]
    fn test_order_does_not_matter() {
        let mut rows = vec![
            row("A", "a", "1", "g", 1.5),
            row("B", "b", "2", "g", 2.25),
            row("A", "a", "1", "g", 3.0),
            row("A", "c", "3", "g", -0.5),
        ];
        let forward = HierarchyBuilder::new(HierarchyDepth::Category).build(&rows, &rows);
        rows.reverse();
        let backward = HierarchyBuilder::new(HierarchyDepth::Category).build(&rows, &rows);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_sorted_children_by_current_desc() {
        let current = vec![
            row("작음", "x", "x", "x", 1.0),
            row("큼", "x", "x", "x", 9.0),
            row("중간", "x", "x", "x", 5.0),
        ];
        let tree = HierarchyBuilder::new(HierarchyDepth::Category).build(&current, &[]);
        let names: Vec<&str> = tree
            .sorted_children()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["큼", "중간", "작음"]);
    }

    #[test]
    fn test_verify_rollup_reports_violation() {
        let mut tree = HierarchyBuilder::new(HierarchyDepth::Category)
            .build(&[row("A", "a", "1", "g", 10.0)], &[]);
        tree.children.get_mut("A").unwrap().current_amount = 11.0;

        match tree.verify_rollup(1e-9) {
            Err(CostReportError::RollupViolation { path, side, .. }) => {
                assert_eq!(side, "current");
                assert_eq!(path, "사업부 합계");
            }
            other => panic!("expected rollup violation, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_builds_empty_root() {
        let tree = HierarchyBuilder::new(HierarchyDepth::Category).build::<CategoryTotal>(&[], &[]);
        assert!(tree.is_leaf());
        assert_eq!(tree.current_amount, 0.0);
        assert_eq!(tree.yoy(), YoyRatio::Percent(0.0));
        tree.verify_rollup(0.0).unwrap();
    }
}
