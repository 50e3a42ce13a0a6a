//! Drill-down navigation over the category tree.
//!
//! [`reduce`] is the whole state machine: a pure function of the current
//! [`DrillState`], an action and a [`ChildLookup`] that answers "what is shown
//! under this path". [`DrillNavigator`] wraps it for an interactive session,
//! memoizing the per-path aggregates and firing the L1 selection callback.

use crate::config::ReportConfig;
use crate::hierarchy::{label_or, HierarchyNode};
use crate::period::PeriodSet;
use crate::schema::CostRecord;
use crate::utils::to_reporting_unit;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum DrillDepth {
    #[default]
    L1,
    L2,
    L3,
    /// GL accounts.
    L4,
}

impl DrillDepth {
    pub fn next(self) -> Option<Self> {
        match self {
            DrillDepth::L1 => Some(DrillDepth::L2),
            DrillDepth::L2 => Some(DrillDepth::L3),
            DrillDepth::L3 => Some(DrillDepth::L4),
            DrillDepth::L4 => None,
        }
    }

    pub fn prev(self) -> Option<Self> {
        match self {
            DrillDepth::L1 => None,
            DrillDepth::L2 => Some(DrillDepth::L1),
            DrillDepth::L3 => Some(DrillDepth::L2),
            DrillDepth::L4 => Some(DrillDepth::L3),
        }
    }

    /// Number of selections that address a view at this depth.
    pub fn index(self) -> usize {
        match self {
            DrillDepth::L1 => 0,
            DrillDepth::L2 => 1,
            DrillDepth::L3 => 2,
            DrillDepth::L4 => 3,
        }
    }

    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(DrillDepth::L1),
            1 => Some(DrillDepth::L2),
            2 => Some(DrillDepth::L3),
            3 => Some(DrillDepth::L4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DrillState {
    pub depth: DrillDepth,
    pub selected_l1: Option<String>,
    pub selected_l2: Option<String>,
    pub selected_l3: Option<String>,
    /// GL account pivoted to its cost-center breakdown. Only meaningful at L4.
    pub selected_leaf: Option<String>,
}

impl DrillState {
    /// Selected names that address the view at the current depth.
    pub fn path(&self) -> Vec<&str> {
        [&self.selected_l1, &self.selected_l2, &self.selected_l3]
            .into_iter()
            .take(self.depth.index())
            .filter_map(|s| s.as_deref())
            .collect()
    }

    pub fn selection(&self, level: DrillDepth) -> Option<&str> {
        match level {
            DrillDepth::L1 => self.selected_l1.as_deref(),
            DrillDepth::L2 => self.selected_l2.as_deref(),
            DrillDepth::L3 => self.selected_l3.as_deref(),
            DrillDepth::L4 => self.selected_leaf.as_deref(),
        }
    }

    fn set_selection(&mut self, level: DrillDepth, value: Option<String>) {
        match level {
            DrillDepth::L1 => self.selected_l1 = value,
            DrillDepth::L2 => self.selected_l2 = value,
            DrillDepth::L3 => self.selected_l3 = value,
            DrillDepth::L4 => self.selected_leaf = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum DrillAction {
    /// Pick an entry of the current view.
    Select(String),
    Back,
    Reset,
}

/// Answers which entries are shown under a path of selected names
/// (empty path = the L1 list).
pub trait ChildLookup {
    fn children(&self, path: &[&str]) -> Vec<String>;
}

impl ChildLookup for HierarchyNode {
    fn children(&self, path: &[&str]) -> Vec<String> {
        self.find(path)
            .map(|node| node.children.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// A level is transparent when its only entry repeats the parent's name.
pub fn pass_through(parent: &str, children: &[String]) -> bool {
    matches!(children, [only] if only == parent)
}

/// The drill state machine. Unknown names and `Back` at L1 leave the state
/// unchanged.
pub fn reduce<L: ChildLookup + ?Sized>(
    state: &DrillState,
    action: &DrillAction,
    lookup: &L,
) -> DrillState {
    match action {
        DrillAction::Reset => DrillState::default(),
        DrillAction::Select(name) => descend(state, name, lookup),
        DrillAction::Back => ascend(state, lookup),
    }
}

fn descend<L: ChildLookup + ?Sized>(state: &DrillState, name: &str, lookup: &L) -> DrillState {
    let path = state.path();
    if !lookup.children(&path).iter().any(|c| c == name) {
        return state.clone();
    }

    let mut next = state.clone();

    let Some(child_depth) = state.depth.next() else {
        // At L4 a selection toggles the cost-center pivot.
        next.selected_leaf = match state.selected_leaf.as_deref() {
            Some(active) if active == name => None,
            _ => Some(name.to_string()),
        };
        return next;
    };

    next.set_selection(state.depth, Some(name.to_string()));
    next.depth = child_depth;

    // The GL level is never skipped.
    let mut view_path = path;
    view_path.push(name);
    while let Some(after) = next.depth.next() {
        if !pass_through(name, &lookup.children(&view_path)) {
            break;
        }
        next.set_selection(next.depth, Some(name.to_string()));
        next.depth = after;
        view_path.push(name);
    }

    next
}

fn ascend<L: ChildLookup + ?Sized>(state: &DrillState, lookup: &L) -> DrillState {
    let Some(target) = state.depth.prev() else {
        return state.clone();
    };

    let mut next = state.clone();
    next.selected_leaf = None;
    next.set_selection(target, None);
    next.depth = target;

    while let Some(parent_level) = next.depth.prev() {
        let collapsed = next
            .selection(parent_level)
            .map(|parent| pass_through(parent, &lookup.children(&next.path())))
            .unwrap_or(false);

        if !collapsed {
            break;
        }
        next.set_selection(parent_level, None);
        next.depth = parent_level;
    }

    next
}

/// Raw per-entry totals of one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    pub name: String,
    pub current: f64,
    pub prior: f64,
}

/// Rendering row: amounts in reporting units, rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillRow {
    pub category: String,
    pub current: f64,
    pub previous: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ViewKey {
    depth: DrillDepth,
    l1: Option<String>,
    l2: Option<String>,
    l3: Option<String>,
    leaf: Option<String>,
}

impl ViewKey {
    fn from_path(path: &[&str], leaf: Option<&str>) -> Option<Self> {
        let depth = DrillDepth::from_index(path.len())?;
        let at = |i: usize| path.get(i).map(|s| s.to_string());
        Some(Self {
            depth,
            l1: at(0),
            l2: at(1),
            l3: at(2),
            leaf: if depth == DrillDepth::L4 {
                leaf.map(|s| s.to_string())
            } else {
                None
            },
        })
    }

    fn prefix(&self) -> Vec<&str> {
        [&self.l1, &self.l2, &self.l3]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .collect()
    }
}

/// Scans the period records for one view, with a per-session memo.
struct ViewCache {
    records: PeriodSet<CostRecord>,
    placeholder: String,
    memo: RefCell<HashMap<ViewKey, Rc<Vec<ViewRow>>>>,
    scans: Cell<usize>,
}

impl ViewCache {
    fn rows(&self, key: ViewKey) -> Rc<Vec<ViewRow>> {
        if let Some(hit) = self.memo.borrow().get(&key) {
            return Rc::clone(hit);
        }

        let rows = Rc::new(self.scan(&key));
        self.memo.borrow_mut().insert(key, Rc::clone(&rows));
        rows
    }

    fn scan(&self, key: &ViewKey) -> Vec<ViewRow> {
        self.scans.set(self.scans.get() + 1);

        let prefix = key.prefix();
        let level = key.depth.index();
        let mut groups: BTreeMap<String, (f64, f64)> = BTreeMap::new();

        let tagged = self
            .records
            .current
            .iter()
            .map(|r| (r, true))
            .chain(self.records.prior.iter().map(|r| (r, false)));

        for (record, is_current) in tagged {
            let segments = [
                label_or(&record.category_l1, &self.placeholder),
                label_or(&record.category_l2, &self.placeholder),
                label_or(&record.category_l3, &self.placeholder),
                label_or(&record.gl_name, &self.placeholder),
            ];

            if segments[..prefix.len()] != prefix[..] {
                continue;
            }

            let name = match key.leaf.as_deref() {
                Some(leaf) => {
                    if segments[3] != leaf {
                        continue;
                    }
                    cost_center_label(record, &self.placeholder)
                }
                None => segments[level],
            };

            let entry = groups.entry(name.to_string()).or_default();
            if is_current {
                entry.0 += record.amount;
            } else {
                entry.1 += record.amount;
            }
        }

        let mut rows: Vec<ViewRow> = groups
            .into_iter()
            .map(|(name, (current, prior))| ViewRow {
                name,
                current,
                prior,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.current
                .partial_cmp(&a.current)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        debug!("Drill view {:?} scanned: {} rows", key, rows.len());
        rows
    }
}

impl ChildLookup for ViewCache {
    fn children(&self, path: &[&str]) -> Vec<String> {
        match ViewKey::from_path(path, None) {
            Some(key) => self.rows(key).iter().map(|r| r.name.clone()).collect(),
            None => Vec::new(),
        }
    }
}

fn cost_center_label<'a>(record: &'a CostRecord, placeholder: &'a str) -> &'a str {
    let name = record.cost_center_name.trim();
    if !name.is_empty() {
        return name;
    }
    label_or(&record.cost_center_code, placeholder)
}

/// An interactive drill-down session over one (brand, period, mode) record set.
pub struct DrillNavigator {
    views: ViewCache,
    state: DrillState,
    unit_divisor: f64,
    on_category_selected: Option<Box<dyn FnMut(&str)>>,
}

impl DrillNavigator {
    pub fn new(records: PeriodSet<CostRecord>, config: &ReportConfig) -> Self {
        Self {
            views: ViewCache {
                records,
                placeholder: config.placeholder.clone(),
                memo: RefCell::new(HashMap::new()),
                scans: Cell::new(0),
            },
            state: DrillState::default(),
            unit_divisor: config.unit_divisor,
            on_category_selected: None,
        }
    }

    /// Registers the callback fired with the L1 name whenever an L1 entry is
    /// selected.
    pub fn with_category_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        self.on_category_selected = Some(Box::new(listener));
        self
    }

    pub fn state(&self) -> &DrillState {
        &self.state
    }

    pub fn dispatch(&mut self, action: DrillAction) -> &DrillState {
        let next = reduce(&self.state, &action, &self.views);

        if let DrillAction::Select(name) = &action {
            let selected_l1 = self.state.depth == DrillDepth::L1
                && next.selected_l1.as_deref() == Some(name.as_str());
            if selected_l1 {
                if let Some(listener) = self.on_category_selected.as_mut() {
                    listener(name.as_str());
                }
            }
        }

        self.state = next;
        &self.state
    }

    pub fn select(&mut self, name: &str) -> &DrillState {
        self.dispatch(DrillAction::Select(name.to_string()))
    }

    pub fn back(&mut self) -> &DrillState {
        self.dispatch(DrillAction::Back)
    }

    pub fn reset(&mut self) -> &DrillState {
        self.dispatch(DrillAction::Reset)
    }

    /// Raw totals of the current view.
    pub fn view(&self) -> Rc<Vec<ViewRow>> {
        let path = self.state.path();
        match ViewKey::from_path(&path, self.state.selected_leaf.as_deref()) {
            Some(key) => self.views.rows(key),
            None => Rc::new(Vec::new()),
        }
    }

    /// The current view in reporting units.
    pub fn rows(&self) -> Vec<DrillRow> {
        self.view()
            .iter()
            .map(|r| DrillRow {
                category: r.name.clone(),
                current: to_reporting_unit(r.current, self.unit_divisor),
                previous: to_reporting_unit(r.prior, self.unit_divisor),
            })
            .collect()
    }

    /// How many full record scans the session has needed so far.
    pub fn scan_count(&self) -> usize {
        self.views.scans.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{HierarchyBuilder, HierarchyDepth};

    fn record(l1: &str, l2: &str, l3: &str, gl: &str, cctr: &str, amount: f64) -> CostRecord {
        CostRecord {
            month: "202410".to_string(),
            brand_code: "MLB".to_string(),
            cost_center_code: cctr.to_string(),
            cost_center_name: cctr.to_string(),
            cost_center_type: None,
            category_l1: l1.to_string(),
            category_l2: l2.to_string(),
            category_l3: l3.to_string(),
            gl_code: String::new(),
            gl_name: gl.to_string(),
            amount,
        }
    }

    fn sample_records() -> PeriodSet<CostRecord> {
        PeriodSet {
            current: vec![
                record("인건비", "인건비", "정규직", "급료", "영업팀", 100.0),
                record("인건비", "인건비", "계약직", "잡급", "영업팀", 50.0),
                record("마케팅비", "광고", "매체", "TV광고", "마케팅팀", 30.0),
                record("마케팅비", "광고", "매체", "디지털광고", "마케팅팀", 20.0),
                record("마케팅비", "판촉", "판촉물", "판촉비", "매장A", 10.0),
                record("임차료", "임차료", "임차료", "임차료", "매장A", 70.0),
            ],
            prior: vec![
                record("인건비", "인건비", "정규직", "급료", "영업팀", 80.0),
                record("마케팅비", "광고", "매체", "TV광고", "본사", 25.0),
            ],
        }
    }

    fn sample_tree() -> HierarchyNode {
        let records = sample_records();
        HierarchyBuilder::new(HierarchyDepth::GlAccount).build(&records.current, &records.prior)
    }

    fn select(name: &str) -> DrillAction {
        DrillAction::Select(name.to_string())
    }

    #[test]
    fn test_skip_level_round_trip() {
        let tree = sample_tree();
        let start = DrillState::default();

        let down = reduce(&start, &select("인건비"), &tree);
        assert_eq!(down.depth, DrillDepth::L3);
        assert_eq!(down.selected_l1.as_deref(), Some("인건비"));
        assert_eq!(down.selected_l2.as_deref(), Some("인건비"));

        let up = reduce(&down, &DrillAction::Back, &tree);
        assert_eq!(up, start);
    }

    #[test]
    fn test_plain_descend_and_ascend() {
        let tree = sample_tree();
        let l2 = reduce(&DrillState::default(), &select("마케팅비"), &tree);
        assert_eq!(l2.depth, DrillDepth::L2);
        assert_eq!(l2.path(), vec!["마케팅비"]);

        let l3 = reduce(&l2, &select("광고"), &tree);
        assert_eq!(l3.depth, DrillDepth::L3);

        let back = reduce(&l3, &DrillAction::Back, &tree);
        assert_eq!(back, l2);
        let home = reduce(&back, &DrillAction::Back, &tree);
        assert_eq!(home, DrillState::default());
    }

    #[test]
    fn test_stacked_pass_through_levels_collapse_together() {
        let tree = sample_tree();
        // 임차료 > 임차료 > 임차료 > 임차료
        let l4 = reduce(&DrillState::default(), &select("임차료"), &tree);
        assert_eq!(l4.depth, DrillDepth::L4);
        assert_eq!(l4.selected_l2.as_deref(), Some("임차료"));
        assert_eq!(l4.selected_l3.as_deref(), Some("임차료"));
        assert_eq!(tree.children(&l4.path()), vec!["임차료".to_string()]);

        let home = reduce(&l4, &DrillAction::Back, &tree);
        assert_eq!(home, DrillState::default());
    }

    #[test]
    fn test_leaf_toggle_at_l4() {
        let tree = sample_tree();
        let mut state = DrillState::default();
        for name in ["마케팅비", "광고", "매체"] {
            state = reduce(&state, &select(name), &tree);
        }
        assert_eq!(state.depth, DrillDepth::L4);

        let pivot = reduce(&state, &select("TV광고"), &tree);
        assert_eq!(pivot.depth, DrillDepth::L4);
        assert_eq!(pivot.selected_leaf.as_deref(), Some("TV광고"));

        let other = reduce(&pivot, &select("디지털광고"), &tree);
        assert_eq!(other.selected_leaf.as_deref(), Some("디지털광고"));

        let off = reduce(&other, &select("디지털광고"), &tree);
        assert_eq!(off.selected_leaf, None);
        assert_eq!(off.depth, DrillDepth::L4);

        let back = reduce(&pivot, &DrillAction::Back, &tree);
        assert_eq!(back.depth, DrillDepth::L3);
        assert_eq!(back.selected_leaf, None);
        assert_eq!(back.selected_l3, None);
    }

    #[test]
    fn test_unknown_selection_and_root_back_are_noops() {
        let tree = sample_tree();
        let start = DrillState::default();
        assert_eq!(reduce(&start, &select("없는항목"), &tree), start);
        assert_eq!(reduce(&start, &DrillAction::Back, &tree), start);

        let deep = reduce(&start, &select("마케팅비"), &tree);
        assert_eq!(reduce(&deep, &DrillAction::Reset, &tree), start);
    }

    #[test]
    fn test_empty_child_set_renders_empty() {
        // Category-depth tree has no GL level, so L4 is empty.
        let records = sample_records();
        let tree = HierarchyBuilder::new(HierarchyDepth::Category).build(&records.current, &records.prior);
        let mut state = DrillState::default();
        for name in ["마케팅비", "광고", "매체"] {
            state = reduce(&state, &select(name), &tree);
        }
        assert_eq!(state.depth, DrillDepth::L4);
        assert!(tree.children(&state.path()).is_empty());
    }

    #[test]
    fn test_pass_through_rule() {
        assert!(pass_through("a", &["a".to_string()]));
        assert!(!pass_through("a", &["b".to_string()]));
        assert!(!pass_through("a", &["a".to_string(), "b".to_string()]));
        assert!(!pass_through("a", &[]));
    }

    #[test]
    fn test_navigator_rows_and_memo() {
        let config = ReportConfig {
            unit_divisor: 10.0,
            ..ReportConfig::default()
        };
        let mut nav = DrillNavigator::new(sample_records(), &config);

        let top = nav.rows();
        assert_eq!(top[0].category, "인건비");
        assert_eq!(top[0].current, 15.0);
        assert_eq!(top[0].previous, 8.0);
        assert_eq!(top.len(), 3);
        let scans_after_first = nav.scan_count();

        nav.select("마케팅비");
        let l2 = nav.rows();
        assert_eq!(l2.iter().map(|r| r.category.as_str()).collect::<Vec<_>>(), vec!["광고", "판촉"]);

        nav.back();
        let again = nav.rows();
        assert_eq!(again, top);

        nav.select("마케팅비");
        nav.rows();
        nav.back();
        // Revisiting known views does not rescan.
        let scans = nav.scan_count();
        nav.select("마케팅비");
        nav.rows();
        nav.back();
        nav.rows();
        assert_eq!(nav.scan_count(), scans);
        assert!(scans > scans_after_first);
    }

    #[test]
    fn test_navigator_cost_center_pivot() {
        let mut nav = DrillNavigator::new(sample_records(), &ReportConfig {
            unit_divisor: 1.0,
            ..ReportConfig::default()
        });
        for name in ["마케팅비", "광고", "매체"] {
            nav.select(name);
        }
        let gl: Vec<String> = nav.rows().into_iter().map(|r| r.category).collect();
        assert_eq!(gl, vec!["TV광고", "디지털광고"]);

        nav.select("TV광고");
        let centers = nav.rows();
        assert_eq!(centers.len(), 2);
        assert_eq!(centers[0].category, "마케팅팀");
        assert_eq!(centers[0].current, 30.0);
        assert_eq!(centers[1].category, "본사");
        assert_eq!(centers[1].previous, 25.0);

        nav.select("TV광고");
        assert_eq!(nav.state().selected_leaf, None);
        assert_eq!(nav.rows().len(), 2);
    }

    #[test]
    fn test_category_listener_fires_on_l1_only() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut nav = DrillNavigator::new(sample_records(), &ReportConfig::default())
            .with_category_listener(move |name| sink.borrow_mut().push(name.to_string()));

        nav.select("없는항목");
        nav.select("마케팅비");
        nav.select("광고");
        nav.back();
        nav.back();
        nav.select("인건비");

        assert_eq!(*seen.borrow(), vec!["마케팅비".to_string(), "인건비".to_string()]);
        assert_eq!(nav.state().depth, DrillDepth::L3);
    }

    #[test]
    fn test_action_serde_shape() {
        let json = serde_json::to_string(&DrillAction::Select("인건비".into())).unwrap();
        assert_eq!(json, r#"{"type":"select","name":"인건비"}"#);
        let back: DrillAction = serde_json::from_str(r#"{"type":"back"}"#).unwrap();
        assert_eq!(back, DrillAction::Back);
    }
}
