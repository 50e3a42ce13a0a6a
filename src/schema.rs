use crate::error::CostReportError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of canonical brands the reports are produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Brand {
    Mlb,
    MlbKids,
    Discovery,
    Duvetica,
    SergioTacchini,
}

impl Brand {
    pub const ALL: [Brand; 5] = [
        Brand::Mlb,
        Brand::MlbKids,
        Brand::Discovery,
        Brand::Duvetica,
        Brand::SergioTacchini,
    ];

    /// Canonical identifier, e.g. `MLB_KIDS`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Brand::Mlb => "MLB",
            Brand::MlbKids => "MLB_KIDS",
            Brand::Discovery => "DISCOVERY",
            Brand::Duvetica => "DUVETICA",
            Brand::SergioTacchini => "SERGIO_TACCHINI",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Brand::Mlb => "MLB",
            Brand::MlbKids => "MLB KIDS",
            Brand::Discovery => "DISCOVERY",
            Brand::Duvetica => "DUVETICA",
            Brand::SergioTacchini => "SERGIO TACCHINI",
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Brand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Brand::ALL
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("not a canonical brand: {}", s))
    }
}

/// Aggregation window for a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Target month against the same month one year earlier.
    #[default]
    Monthly,
    /// January through the target month against the same span one year earlier.
    Ytd,
}

impl FromStr for ViewMode {
    type Err = CostReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(ViewMode::Monthly),
            "ytd" => Ok(ViewMode::Ytd),
            _ => Err(CostReportError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Monthly => f.write_str("monthly"),
            ViewMode::Ytd => f.write_str("ytd"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CostCenterType {
    Dept,
    Store,
}

impl CostCenterType {
    /// Reads the type column, falling back to the cost-center code prefix
    /// (`F...` departments, `Z...` stores).
    pub fn infer(type_cell: &str, cost_center_code: &str) -> Option<Self> {
        match type_cell.trim().to_ascii_lowercase().as_str() {
            "부서" | "dept" | "department" => return Some(CostCenterType::Dept),
            "매장" | "store" => return Some(CostCenterType::Store),
            _ => {}
        }

        match cost_center_code.trim().chars().next() {
            Some('F') | Some('f') => Some(CostCenterType::Dept),
            Some('Z') | Some('z') => Some(CostCenterType::Store),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CostRecord {
    /// `YYYYMM`
    pub month: String,
    /// Canonical brand id, or the raw code when it could not be resolved.
    pub brand_code: String,
    pub cost_center_code: String,
    pub cost_center_name: String,
    pub cost_center_type: Option<CostCenterType>,
    pub category_l1: String,
    pub category_l2: String,
    pub category_l3: String,
    pub gl_code: String,
    pub gl_name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SalesRecord {
    pub month: String,
    pub brand_code: String,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HeadcountRecord {
    pub brand_code: String,
    pub month: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoreRecord {
    pub brand_code: String,
    pub month: String,
    pub channel: String,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brand_round_trip_names() {
        for brand in Brand::ALL {
            assert_eq!(brand.as_str().parse::<Brand>().unwrap(), brand);
        }
        assert_eq!("mlb_kids".parse::<Brand>().unwrap(), Brand::MlbKids);
        assert!("MK".parse::<Brand>().is_err());

        let json = serde_json::to_string(&Brand::SergioTacchini).unwrap();
        assert_eq!(json, "\"SERGIO_TACCHINI\"");
    }

    #[test]
    fn test_view_mode_parse() {
        assert_eq!("YTD".parse::<ViewMode>().unwrap(), ViewMode::Ytd);
        assert_eq!(" monthly".parse::<ViewMode>().unwrap(), ViewMode::Monthly);
        assert!("quarterly".parse::<ViewMode>().is_err());
        assert_eq!(ViewMode::default(), ViewMode::Monthly);
    }

    #[test]
    fn test_cost_center_type_inference() {
        assert_eq!(CostCenterType::infer("부서", "Z100"), Some(CostCenterType::Dept));
        assert_eq!(CostCenterType::infer("", "Z100"), Some(CostCenterType::Store));
        assert_eq!(CostCenterType::infer("", "F200"), Some(CostCenterType::Dept));
        assert_eq!(CostCenterType::infer("기타", "K1"), None);
    }
}
