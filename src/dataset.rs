use crate::config::ReportConfig;
use crate::ingestion::{tokenize_csv, NormalizeReport, RawTable, RecordNormalizer, TableSchema};
use crate::schema::{CostRecord, HeadcountRecord, SalesRecord, StoreRecord};
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which sources were available when the dataset was assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DataSourceFlags {
    pub costs: bool,
    pub sales: bool,
    pub headcount: bool,
    pub stores: bool,
}

impl DataSourceFlags {
    pub fn all(&self) -> bool {
        self.costs && self.sales && self.headcount && self.stores
    }
}

/// Raw text of each source, `None` when it could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSources {
    pub costs: Option<String>,
    pub sales: Option<String>,
    pub headcount: Option<String>,
    pub stores: Option<String>,
}

/// All normalized records a report can draw from. An absent source is `None`
/// and reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDataset {
    pub costs: Option<Vec<CostRecord>>,
    pub sales: Option<Vec<SalesRecord>>,
    pub headcount: Option<Vec<HeadcountRecord>>,
    pub stores: Option<Vec<StoreRecord>>,
}

impl LedgerDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_costs(mut self, records: Vec<CostRecord>) -> Self {
        self.costs = Some(records);
        self
    }

    pub fn with_sales(mut self, records: Vec<SalesRecord>) -> Self {
        self.sales = Some(records);
        self
    }

    pub fn with_headcount(mut self, records: Vec<HeadcountRecord>) -> Self {
        self.headcount = Some(records);
        self
    }

    pub fn with_stores(mut self, records: Vec<StoreRecord>) -> Self {
        self.stores = Some(records);
        self
    }

    pub fn costs(&self) -> &[CostRecord] {
        self.costs.as_deref().unwrap_or_default()
    }

    pub fn sales(&self) -> &[SalesRecord] {
        self.sales.as_deref().unwrap_or_default()
    }

    pub fn headcount(&self) -> &[HeadcountRecord] {
        self.headcount.as_deref().unwrap_or_default()
    }

    pub fn stores(&self) -> &[StoreRecord] {
        self.stores.as_deref().unwrap_or_default()
    }

    pub fn data_source(&self) -> DataSourceFlags {
        DataSourceFlags {
            costs: self.costs.is_some(),
            sales: self.sales.is_some(),
            headcount: self.headcount.is_some(),
            stores: self.stores.is_some(),
        }
    }

    /// Tokenizes and normalizes whatever sources are present. A source whose
    /// text cannot be tokenized is treated as absent.
    pub fn from_raw(sources: &RawSources, config: &ReportConfig) -> Self {
        let normalizer = RecordNormalizer::from_config(config);

        let dataset = Self {
            costs: normalize_source("costs", sources.costs.as_deref(), |table| {
                normalizer.costs(table, &TableSchema::costs())
            }),
            sales: normalize_source("sales", sources.sales.as_deref(), |table| {
                normalizer.sales(table, &TableSchema::sales())
            }),
            headcount: normalize_source("headcount", sources.headcount.as_deref(), |table| {
                normalizer.headcount(table, &TableSchema::headcount())
            }),
            stores: normalize_source("stores", sources.stores.as_deref(), |table| {
                normalizer.stores(table, &TableSchema::stores())
            }),
        };

        info!("Dataset assembled, sources present: {:?}", dataset.data_source());
        dataset
    }
}

fn normalize_source<T, F>(name: &str, text: Option<&str>, normalize: F) -> Option<Vec<T>>
where
    F: FnOnce(&RawTable) -> NormalizeReport<T>,
{
    let text = text?;

    let table = match tokenize_csv(text) {
        Ok(table) => table,
        Err(e) => {
            warn!("Source '{}' could not be tokenized, treating as absent: {}", name, e);
            return None;
        }
    };

    let report = normalize(&table);
    info!(
        "Source '{}': {} rows accepted, {} skipped",
        name, report.accepted, report.skipped
    );
    Some(report.into_records())
}
