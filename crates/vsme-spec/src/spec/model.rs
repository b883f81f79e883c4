use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::datapoint::DatapointSpec;

/// Reporting tier a module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModuleTier {
    Basic,
    Comprehensive,
}

impl fmt::Display for ModuleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleTier::Basic => f.write_str("basic"),
            ModuleTier::Comprehensive => f.write_str("comprehensive"),
        }
    }
}

/// Regulatory sub-section grouping related datapoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclosure_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub datapoints: Vec<DatapointSpec>,
}

/// Top-level reporting module such as `B1` or `C3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    pub module_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(default)]
    pub disclosures: Vec<DisclosureSpec>,
}

impl ModuleSpec {
    /// Datapoints of every disclosure, in declaration order.
    pub fn datapoints(&self) -> impl Iterator<Item = &DatapointSpec> {
        self.disclosures
            .iter()
            .flat_map(|disclosure| disclosure.datapoints.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoreReport {
    #[serde(default)]
    pub basic_modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub comprehensive_modules: Vec<ModuleSpec>,
}

/// The data model description consumed by the schema generator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataModel {
    #[serde(default)]
    pub core_report: CoreReport,
}

impl DataModel {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// All modules, basic tier first, each in declaration order.
    pub fn modules(&self) -> impl Iterator<Item = (ModuleTier, &ModuleSpec)> {
        let basic = self
            .core_report
            .basic_modules
            .iter()
            .map(|module| (ModuleTier::Basic, module));
        let comprehensive = self
            .core_report
            .comprehensive_modules
            .iter()
            .map(|module| (ModuleTier::Comprehensive, module));
        basic.chain(comprehensive)
    }

    pub fn module_count(&self) -> usize {
        self.core_report.basic_modules.len() + self.core_report.comprehensive_modules.len()
    }
}
