//! Async loading of the four source files.
//!
//! The reads run concurrently and are joined before anything is parsed. A
//! file that cannot be read is logged and marked absent in the resulting
//! [`DataSourceFlags`](crate::dataset::DataSourceFlags); it never fails the load.

use crate::config::ReportConfig;
use crate::dataset::{LedgerDataset, RawSources};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFiles {
    pub costs: PathBuf,
    pub sales: PathBuf,
    pub headcount: PathBuf,
    pub stores: PathBuf,
}

impl SourceFiles {
    /// `costs.csv`, `sales.csv`, `headcount.csv` and `stores.csv` under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            costs: dir.join("costs.csv"),
            sales: dir.join("sales.csv"),
            headcount: dir.join("headcount.csv"),
            stores: dir.join("stores.csv"),
        }
    }
}

pub struct DatasetLoader {
    config: ReportConfig,
}

impl DatasetLoader {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub async fn read_sources(files: &SourceFiles) -> RawSources {
        let (costs, sales, headcount, stores) = futures::join!(
            read_optional(&files.costs),
            read_optional(&files.sales),
            read_optional(&files.headcount),
            read_optional(&files.stores),
        );

        RawSources {
            costs,
            sales,
            headcount,
            stores,
        }
    }

    pub async fn load(&self, files: &SourceFiles) -> LedgerDataset {
        let sources = Self::read_sources(files).await;
        LedgerDataset::from_raw(&sources, &self.config)
    }

    pub async fn load_dir(&self, dir: impl AsRef<Path>) -> LedgerDataset {
        self.load(&SourceFiles::in_dir(dir)).await
    }
}

async fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path).await {
        Ok(text) => {
            debug!("Read {} bytes from {:?}", text.len(), path);
            Some(text)
        }
        Err(e) => {
            warn!("Source {:?} unavailable: {}", path, e);
            None
        }
    }
}
