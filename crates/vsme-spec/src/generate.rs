use std::collections::HashMap;
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::{debug, warn};

use crate::schema::{Pattern, Rule, Schema, SchemaKind, TableSchema};
use crate::spec::{DataModel, DataType, DatapointSpec, ModuleTier};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("datapoint '{datapoint_id}' has an invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        datapoint_id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("datapoint '{datapoint_id}' declares unknown type '{data_type}'")]
    UnknownType {
        datapoint_id: String,
        data_type: String,
    },
    #[error("invalid module filter '{pattern}': {source}")]
    ModuleFilter {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Generation switches.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Fail on unknown datapoint types instead of degrading to `Any`.
    pub strict: bool,
    /// Glob patterns over module codes; empty keeps every module.
    pub modules: Vec<String>,
}

/// A datapoint whose declared type was not recognised and which was given a
/// permissive schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTypeWarning {
    pub datapoint_id: String,
    pub data_type: String,
}

/// Identifier paired with its shared schema.
#[derive(Debug, Clone)]
pub struct DatapointSchema {
    pub id: String,
    pub schema: Arc<Schema>,
}

/// Aggregate schema of one module: its datapoints in declaration order.
#[derive(Debug, Clone)]
pub struct ModuleSchema {
    pub code: String,
    pub tier: ModuleTier,
    pub fields: Vec<DatapointSchema>,
}

impl ModuleSchema {
    pub fn field(&self, id: &str) -> Option<&Arc<Schema>> {
        self.fields
            .iter()
            .find(|field| field.id == id)
            .map(|field| &field.schema)
    }
}

/// Output of the generator: one schema per distinct datapoint identifier, in
/// first-occurrence order, plus the per-module aggregates.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    datapoints: Vec<DatapointSchema>,
    index: HashMap<String, usize>,
    modules: Vec<ModuleSchema>,
    warnings: Vec<UnknownTypeWarning>,
}

impl SchemaSet {
    pub fn datapoints(&self) -> &[DatapointSchema] {
        &self.datapoints
    }

    pub fn datapoint(&self, id: &str) -> Option<&Arc<Schema>> {
        self.index.get(id).map(|position| &self.datapoints[*position].schema)
    }

    pub fn modules(&self) -> &[ModuleSchema] {
        &self.modules
    }

    pub fn module(&self, code: &str) -> Option<&ModuleSchema> {
        self.modules.iter().find(|module| module.code == code)
    }

    pub fn warnings(&self) -> &[UnknownTypeWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.datapoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datapoints.is_empty()
    }

    /// Returns the stored schema for `id`, inserting `build()` on first sight.
    fn intern(
        &mut self,
        id: &str,
        build: impl FnOnce() -> Result<Schema, GenerateError>,
    ) -> Result<Arc<Schema>, GenerateError> {
        if let Some(existing) = self.datapoint(id) {
            debug!(datapoint = id, "reusing first declared schema");
            return Ok(Arc::clone(existing));
        }
        let schema = Arc::new(build()?);
        self.index.insert(id.to_string(), self.datapoints.len());
        self.datapoints.push(DatapointSchema {
            id: id.to_string(),
            schema: Arc::clone(&schema),
        });
        Ok(schema)
    }
}

/// Builds the full schema set for a data model description.
pub fn generate(model: &DataModel, options: &GenerateOptions) -> Result<SchemaSet, GenerateError> {
    let filter = module_filter(&options.modules)?;
    let mut builder = SchemaBuilder::new(options.strict);
    let mut set = SchemaSet::default();

    for (tier, module) in model.modules() {
        if let Some(filter) = &filter
            && !filter.is_match(&module.module_code)
        {
            debug!(module = %module.module_code, "module excluded by filter");
            continue;
        }

        let mut fields: Vec<DatapointSchema> = Vec::new();
        for datapoint in module.datapoints() {
            let id = datapoint.datapoint_id.as_str();
            let schema = set.intern(id, || builder.build(datapoint))?;
            if fields.iter().any(|field| field.id == id) {
                continue;
            }
            fields.push(DatapointSchema {
                id: id.to_string(),
                schema,
            });
        }

        set.modules.push(ModuleSchema {
            code: module.module_code.clone(),
            tier,
            fields,
        });
    }

    set.warnings = builder.warnings;
    Ok(set)
}

/// Builds the validator for one datapoint definition. Unknown types degrade
/// to a permissive schema and are logged.
pub fn datapoint_schema(datapoint: &DatapointSpec) -> Result<Schema, GenerateError> {
    SchemaBuilder::new(false).build(datapoint)
}

fn module_filter(patterns: &[String]) -> Result<Option<GlobSet>, GenerateError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| GenerateError::ModuleFilter {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|source| GenerateError::ModuleFilter {
            pattern: patterns.join(","),
            source,
        })
}

struct SchemaBuilder {
    strict: bool,
    warnings: Vec<UnknownTypeWarning>,
}

impl SchemaBuilder {
    fn new(strict: bool) -> Self {
        Self {
            strict,
            warnings: Vec::new(),
        }
    }

    fn build(&mut self, datapoint: &DatapointSpec) -> Result<Schema, GenerateError> {
        let kind = self.base_kind(datapoint)?;
        let mut schema = Schema::new(kind);
        schema.rules = validation_rules(datapoint)?;

        if !datapoint.required {
            schema.optional = true;
        } else if datapoint.data_type.is_text() {
            schema.rules.push(Rule::NonEmpty);
        }
        Ok(schema)
    }

    fn base_kind(&mut self, datapoint: &DatapointSpec) -> Result<SchemaKind, GenerateError> {
        let kind = match &datapoint.data_type {
            DataType::Text | DataType::Textarea => SchemaKind::Text,
            DataType::Number => SchemaKind::Number,
            DataType::Date => SchemaKind::Date,
            DataType::Boolean => SchemaKind::Boolean,
            DataType::Select => {
                let values = datapoint
                    .options
                    .iter()
                    .map(|option| option.value.clone())
                    .collect::<Vec<_>>();
                if values.is_empty() {
                    SchemaKind::Text
                } else {
                    SchemaKind::Choice(values)
                }
            }
            DataType::Url => SchemaKind::Url,
            DataType::Email => SchemaKind::Email,
            DataType::Table => {
                let mut columns = Vec::with_capacity(datapoint.columns.len());
                for column in &datapoint.columns {
                    columns.push((column.datapoint_id.clone(), self.build(column)?));
                }
                SchemaKind::Table(TableSchema {
                    columns,
                    min_rows: datapoint.min_rows.unwrap_or(0),
                    max_rows: datapoint.max_rows,
                })
            }
            DataType::Other(name) => {
                if self.strict {
                    return Err(GenerateError::UnknownType {
                        datapoint_id: datapoint.datapoint_id.clone(),
                        data_type: name.clone(),
                    });
                }
                warn!(
                    datapoint = %datapoint.datapoint_id,
                    data_type = %name,
                    "unknown datapoint type, accepting any value"
                );
                self.warnings.push(UnknownTypeWarning {
                    datapoint_id: datapoint.datapoint_id.clone(),
                    data_type: name.clone(),
                });
                SchemaKind::Any
            }
        };
        Ok(kind)
    }
}

fn validation_rules(datapoint: &DatapointSpec) -> Result<Vec<Rule>, GenerateError> {
    let mut rules = Vec::new();
    let Some(validation) = &datapoint.validation else {
        return Ok(rules);
    };
    if let Some(min) = validation.min {
        rules.push(Rule::Min(min));
    }
    if let Some(max) = validation.max {
        rules.push(Rule::Max(max));
    }
    if let Some(pattern) = validation.pattern.as_deref().filter(|pattern| !pattern.is_empty()) {
        let compiled = Pattern::new(pattern).map_err(|source| GenerateError::InvalidPattern {
            datapoint_id: datapoint.datapoint_id.clone(),
            pattern: pattern.to_string(),
            source,
        })?;
        rules.push(Rule::Pattern(compiled));
    }
    Ok(rules)
}
