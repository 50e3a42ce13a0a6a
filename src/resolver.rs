use crate::schema::Brand;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Alias configuration injected into the resolver.
///
/// The default table carries the union of both known integration paths
/// (the CSV export uses `I`/`X`/`V`, the warehouse connector `MK`/`D`/`DV`);
/// none of their aliases collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AliasTable {
    #[schemars(description = "External brand code -> canonical brand. Matched case-insensitively after trimming.")]
    #[serde(default)]
    pub brands: BTreeMap<String, Brand>,

    #[schemars(description = "Legacy L1 category label -> surviving label. Applied once, at ingestion.")]
    #[serde(default)]
    pub category_merges: BTreeMap<String, String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let brands = [
            ("M", Brand::Mlb),
            ("I", Brand::MlbKids),
            ("MK", Brand::MlbKids),
            ("X", Brand::Discovery),
            ("D", Brand::Discovery),
            ("V", Brand::Duvetica),
            ("DV", Brand::Duvetica),
            ("ST", Brand::SergioTacchini),
        ]
        .into_iter()
        .map(|(alias, brand)| (alias.to_string(), brand))
        .collect();

        let category_merges = [("제간비", "지급수수료")]
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        Self {
            brands,
            category_merges,
        }
    }
}

/// Outcome of resolving an external brand code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrandCode {
    Known(Brand),
    /// Unrecognized codes pass through untouched.
    Unknown(String),
}

impl BrandCode {
    pub fn as_str(&self) -> &str {
        match self {
            BrandCode::Known(brand) => brand.as_str(),
            BrandCode::Unknown(raw) => raw,
        }
    }

    pub fn brand(&self) -> Option<Brand> {
        match self {
            BrandCode::Known(brand) => Some(*brand),
            BrandCode::Unknown(_) => None,
        }
    }
}

impl fmt::Display for BrandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CodeResolver {
    brand_aliases: BTreeMap<String, Brand>,
    category_merges: BTreeMap<String, String>,
}

impl CodeResolver {
    pub fn new(table: &AliasTable) -> Self {
        let mut brand_aliases: BTreeMap<String, Brand> = table
            .brands
            .iter()
            .map(|(alias, brand)| (alias.trim().to_uppercase(), *brand))
            .collect();

        for brand in Brand::ALL {
            brand_aliases.insert(brand.as_str().to_string(), brand);
        }

        Self {
            brand_aliases,
            category_merges: table.category_merges.clone(),
        }
    }

    pub fn resolve_brand(&self, code: &str) -> BrandCode {
        match self.brand_aliases.get(&code.trim().to_uppercase()) {
            Some(brand) => BrandCode::Known(*brand),
            None => BrandCode::Unknown(code.to_string()),
        }
    }

    /// Canonical id for `code`, or `code` itself when it is not in the table.
    pub fn canonical_brand_code(&self, code: &str) -> String {
        self.resolve_brand(code).as_str().to_string()
    }

    /// Folds a legacy L1 label into its surviving label. Single step, so a
    /// surviving label is never remapped again.
    pub fn coalesce_category(&self, label: &str) -> String {
        self.category_merges
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }
}

impl Default for CodeResolver {
    fn default() -> Self {
        Self::new(&AliasTable::default())
    }
}
