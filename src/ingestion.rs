//! Record normalization: raw tokenized rows in, typed records out.
//!
//! Nothing in here returns an error for a bad row. Short rows are skipped and
//! counted, unparseable numbers become `0.0`, blank categories become the
//! configured placeholder. Only the tokenizer adapter can fail, and only when
//! the underlying reader does.

use crate::config::ReportConfig;
use crate::error::Result;
use crate::resolver::CodeResolver;
use crate::schema::{CostCenterType, CostRecord, HeadcountRecord, SalesRecord, StoreRecord};
use crate::utils::normalize_month;
use log::debug;
use std::collections::HashMap;

const BOM: char = '\u{feff}';

/// A header row plus data rows, already split into cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Quote-aware tokenizer over the `csv` crate. The first record is the header;
/// ragged rows are kept as-is so the normalizer can decide what to drop.
pub fn tokenize_csv(text: &str) -> Result<RawTable> {
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(first) => first?.iter().map(|c| c.to_string()).collect(),
        None => return Ok(RawTable::default()),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(RawTable { header, rows })
}

/// Trims whitespace, a stray BOM and surrounding quote characters.
pub fn clean_cell(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(BOM)
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Parses a numeric cell, accepting thousands separators. Anything that does
/// not yield a finite number is `0.0`.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = clean_cell(raw)
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: &'static str,
    /// Header name looked up case-insensitively.
    pub header: String,
    /// Column index used when the header does not name the column.
    pub position: usize,
    pub required: bool,
}

impl ColumnSpec {
    fn new(field: &'static str, header: &str, position: usize, required: bool) -> Self {
        Self {
            field,
            header: header.to_string(),
            position,
            required,
        }
    }
}

/// Describes where each typed field lives in a raw table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Warehouse cost export layout.
    pub fn costs() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new("month", "YYYYMM", 0, true),
                ColumnSpec::new("brand_code", "BRD_CD", 1, true),
                ColumnSpec::new("cost_center_code", "CCTR_CD", 3, false),
                ColumnSpec::new("cost_center_name", "CCTR_NM", 4, false),
                ColumnSpec::new("cost_center_type", "CCTR_TYPE", 5, false),
                ColumnSpec::new("category_l1", "CATEGORY_L1", 6, true),
                ColumnSpec::new("category_l2", "CATEGORY_L2", 7, false),
                ColumnSpec::new("category_l3", "CATEGORY_L3", 8, false),
                ColumnSpec::new("gl_code", "GL_CD", 9, false),
                ColumnSpec::new("gl_name", "GL_NM", 10, false),
                ColumnSpec::new("amount", "COST_AMT", 11, true),
            ],
        }
    }

    pub fn sales() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new("month", "YYYYMM", 0, true),
                ColumnSpec::new("brand_code", "BRD_CD", 1, true),
                ColumnSpec::new("total_sales", "TOTAL_SALES", 3, true),
            ],
        }
    }

    pub fn headcount() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new("brand_code", "BRD_CD", 0, true),
                ColumnSpec::new("month", "YYYYMM", 1, true),
                ColumnSpec::new("value", "HEADCOUNT", 2, true),
            ],
        }
    }

    pub fn stores() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new("brand_code", "BRD_CD", 0, true),
                ColumnSpec::new("channel", "CHANNEL", 1, true),
                ColumnSpec::new("value", "STORE_CNT", 2, true),
                ColumnSpec::new("month", "YYYYMM", 3, true),
            ],
        }
    }

    fn resolve(&self, header: &[String]) -> ColumnMap {
        let cleaned: Vec<String> = header.iter().map(|h| clean_cell(h).to_uppercase()).collect();

        let mut indices = HashMap::new();
        let mut min_columns = 0;
        for column in &self.columns {
            let wanted = column.header.to_uppercase();
            let index = cleaned
                .iter()
                .position(|h| *h == wanted)
                .unwrap_or(column.position);
            indices.insert(column.field, index);
            if column.required {
                min_columns = min_columns.max(index + 1);
            }
        }

        ColumnMap {
            indices,
            min_columns,
        }
    }
}

struct ColumnMap {
    indices: HashMap<&'static str, usize>,
    min_columns: usize,
}

struct RowView<'a> {
    cells: &'a [String],
    map: &'a ColumnMap,
}

impl RowView<'_> {
    fn text(&self, field: &str) -> String {
        self.map
            .indices
            .get(field)
            .and_then(|i| self.cells.get(*i))
            .map(|c| clean_cell(c))
            .unwrap_or_default()
    }

    fn number(&self, field: &str) -> f64 {
        self.map
            .indices
            .get(field)
            .and_then(|i| self.cells.get(*i))
            .map(|c| parse_amount(c))
            .unwrap_or(0.0)
    }
}

/// Normalized records plus what happened to the rows that did not make it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeReport<T> {
    pub records: Vec<T>,
    pub accepted: usize,
    pub skipped: usize,
}

impl<T> NormalizeReport<T> {
    pub fn into_records(self) -> Vec<T> {
        self.records
    }
}

/// Turns raw tables into typed, resolved records.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    resolver: CodeResolver,
    placeholder: String,
}

impl RecordNormalizer {
    pub fn new(resolver: CodeResolver, placeholder: impl Into<String>) -> Self {
        Self {
            resolver,
            placeholder: placeholder.into(),
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.resolver(), config.placeholder.clone())
    }

    pub fn resolver(&self) -> &CodeResolver {
        &self.resolver
    }

    fn category(&self, value: String) -> String {
        if value.is_empty() {
            self.placeholder.clone()
        } else {
            value
        }
    }

    pub fn costs(&self, table: &RawTable, schema: &TableSchema) -> NormalizeReport<CostRecord> {
        normalize_rows(table, schema, "cost", |row| {
            let cost_center_code = row.text("cost_center_code");
            let cost_center_type =
                CostCenterType::infer(&row.text("cost_center_type"), &cost_center_code);
            let l1 = self.category(row.text("category_l1"));

            CostRecord {
                month: normalize_month(&row.text("month")),
                brand_code: self.resolver.canonical_brand_code(&row.text("brand_code")),
                cost_center_code,
                cost_center_name: row.text("cost_center_name"),
                cost_center_type,
                category_l1: self.resolver.coalesce_category(&l1),
                category_l2: self.category(row.text("category_l2")),
                category_l3: self.category(row.text("category_l3")),
                gl_code: row.text("gl_code"),
                gl_name: self.category(row.text("gl_name")),
                amount: row.number("amount"),
            }
        })
    }

    pub fn sales(&self, table: &RawTable, schema: &TableSchema) -> NormalizeReport<SalesRecord> {
        normalize_rows(table, schema, "sales", |row| SalesRecord {
            month: normalize_month(&row.text("month")),
            brand_code: self.resolver.canonical_brand_code(&row.text("brand_code")),
            total_sales: row.number("total_sales"),
        })
    }

    pub fn headcount(
        &self,
        table: &RawTable,
        schema: &TableSchema,
    ) -> NormalizeReport<HeadcountRecord> {
        normalize_rows(table, schema, "headcount", |row| HeadcountRecord {
            brand_code: self.resolver.canonical_brand_code(&row.text("brand_code")),
            month: normalize_month(&row.text("month")),
            value: row.number("value"),
        })
    }

    pub fn stores(&self, table: &RawTable, schema: &TableSchema) -> NormalizeReport<StoreRecord> {
        normalize_rows(table, schema, "store", |row| StoreRecord {
            brand_code: self.resolver.canonical_brand_code(&row.text("brand_code")),
            month: normalize_month(&row.text("month")),
            channel: row.text("channel"),
            value: row.number("value"),
        })
    }
}

fn normalize_rows<T, F>(
    table: &RawTable,
    schema: &TableSchema,
    kind: &str,
    mut convert: F,
) -> NormalizeReport<T>
where
    F: FnMut(&RowView<'_>) -> T,
{
    let map = schema.resolve(&table.header);
    let mut records = Vec::with_capacity(table.rows.len());
    let mut skipped = 0;

    for (idx, cells) in table.rows.iter().enumerate() {
        if cells.iter().all(|c| clean_cell(c).is_empty()) {
            continue;
        }

        if cells.len() < map.min_columns {
            debug!(
                "Skipping {} row {}: {} columns, need at least {}",
                kind,
                idx + 1,
                cells.len(),
                map.min_columns
            );
            skipped += 1;
            continue;
        }

        records.push(convert(&RowView { cells, map: &map }));
    }

    if skipped > 0 {
        debug!("Normalized {} {} rows, skipped {}", records.len(), kind, skipped);
    }

    NormalizeReport {
        accepted: records.len(),
        records,
        skipped,
    }
}
