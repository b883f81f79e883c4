use handlebars::Handlebars;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::generate::SchemaSet;
use crate::schema::{DATE_MESSAGE, REQUIRED_MESSAGE, Rule, Schema, SchemaKind, TableSchema, escape_pointer};

/// Name written into generated file headers.
pub const GENERATOR_NAME: &str = "vsme-report generate";

const ZOD_DATE_REGEX: &str = r"/^\d{4}-\d{2}-\d{2}$/";
const JSON_SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";
const JSON_DATE_PATTERN: &str = "^[0-9]{4}-[0-9]{2}-[0-9]{2}$";

const ZOD_TEMPLATE: &str = "// AUTO-GENERATED BY {{generator}}. DO NOT EDIT MANUALLY.
// Total datapoints: {{total}}
import { z } from 'zod'

export const datapointSchemas = {
{{datapoints}}
} as const

export const moduleSchemas = {
{{modules}}
} as const

export type ModuleCode = keyof typeof moduleSchemas
export type ModuleSchema = {
  [K in ModuleCode]: z.infer<(typeof moduleSchemas)[K]>
}
";

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),
    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Artifact flavours the generator can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// TypeScript module exporting zod validators.
    Zod,
    /// JSON Schema 2020-12 document.
    JsonSchema,
}

pub fn render(set: &SchemaSet, format: ArtifactFormat) -> Result<String, EmitError> {
    match format {
        ArtifactFormat::Zod => render_zod(set),
        ArtifactFormat::JsonSchema => {
            let mut rendered = serde_json::to_string_pretty(&render_json_schema(set))?;
            rendered.push('\n');
            Ok(rendered)
        }
    }
}

/// Render the schema set as a TypeScript module of zod validators.
pub fn render_zod(set: &SchemaSet) -> Result<String, EmitError> {
    let datapoints = set
        .datapoints()
        .iter()
        .map(|entry| format!("  {}: {}", quote(&entry.id), zod_expr(&entry.schema)))
        .collect::<Vec<_>>()
        .join(",\n");

    let modules = set
        .modules()
        .iter()
        .map(|module| {
            let fields = module
                .fields
                .iter()
                .map(|field| {
                    format!(
                        "      {}: datapointSchemas[{}]",
                        quote(&field.id),
                        quote(&field.id)
                    )
                })
                .collect::<Vec<_>>();
            let shape = if fields.is_empty() {
                "{}".to_string()
            } else {
                format!("{{\n{}\n    }}", fields.join(",\n"))
            };
            format!("  {}: z.object({})", quote(&module.code), shape)
        })
        .collect::<Vec<_>>()
        .join(",\n");

    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.register_template_string("zod", ZOD_TEMPLATE)?;

    let rendered = handlebars.render(
        "zod",
        &json!({
            "generator": GENERATOR_NAME,
            "total": set.len(),
            "datapoints": datapoints,
            "modules": modules,
        }),
    )?;
    Ok(rendered)
}

/// Zod expression for one schema: base, then rules, then the required or
/// optional wrapper.
pub fn zod_expr(schema: &Schema) -> String {
    let mut expr = zod_base(&schema.kind);
    for rule in &schema.rules {
        match rule {
            Rule::Min(min) => expr.push_str(&format!(".min({})", min)),
            Rule::Max(max) => expr.push_str(&format!(".max({})", max)),
            Rule::Pattern(pattern) => expr.push_str(&format!(
                ".regex(new RegExp(\"{}\"))",
                escape_js(pattern.source())
            )),
            Rule::NonEmpty => expr.push_str(&format!(".min(1, \"{}\")", REQUIRED_MESSAGE)),
        }
    }
    if schema.optional {
        expr.push_str(".optional()");
    }
    expr
}

fn zod_base(kind: &SchemaKind) -> String {
    match kind {
        SchemaKind::Any => "z.any()".into(),
        SchemaKind::Text => "z.string()".into(),
        SchemaKind::Number => "z.coerce.number()".into(),
        SchemaKind::Boolean => "z.boolean()".into(),
        SchemaKind::Date => format!("z.string().regex({}, \"{}\")", ZOD_DATE_REGEX, DATE_MESSAGE),
        SchemaKind::Url => "z.string().url()".into(),
        SchemaKind::Email => "z.string().email()".into(),
        SchemaKind::Choice(options) => {
            let values = options
                .iter()
                .map(|value| format!("\"{}\"", escape_js(value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("z.enum([{}] as const)", values)
        }
        SchemaKind::Table(table) => zod_table(table),
    }
}

fn zod_table(table: &TableSchema) -> String {
    let columns = table
        .columns
        .iter()
        .map(|(id, column)| format!("        {}: {}", quote(id), zod_expr(column)))
        .collect::<Vec<_>>()
        .join(",\n");
    let mut expr = format!("z.array(z.object({{\n{}\n      }}))", columns);
    if table.min_rows > 0 {
        expr.push_str(&format!(".min({})", table.min_rows));
    }
    if let Some(max_rows) = table.max_rows {
        expr.push_str(&format!(".max({})", max_rows));
    }
    expr
}

fn escape_js(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '`' => escaped.push_str("\\`"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{2028}' | '\u{2029}' => escaped.push_str(&format!("\\u{:04x}", ch as u32)),
            ch if ch.is_control() => escaped.push_str(&format!("\\u{:04x}", ch as u32)),
            ch => escaped.push(ch),
        }
    }
    escaped
}

fn quote(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Render the schema set as a JSON Schema document. Datapoints live under
/// `$defs`; modules are object schemas referencing them.
pub fn render_json_schema(set: &SchemaSet) -> Value {
    let mut defs = Map::new();
    for entry in set.datapoints() {
        defs.insert(entry.id.clone(), json_schema_for(&entry.schema));
    }

    let mut modules = Map::new();
    for module in set.modules() {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &module.fields {
            properties.insert(
                field.id.clone(),
                json!({ "$ref": format!("#/$defs/{}", escape_pointer(&field.id)) }),
            );
            if !field.schema.accepts_absent() {
                required.push(Value::String(field.id.clone()));
            }
        }
        modules.insert(
            module.code.clone(),
            json!({
                "type": "object",
                "x-tier": module.tier.to_string(),
                "properties": properties,
                "required": required,
            }),
        );
    }

    json!({
        "$schema": JSON_SCHEMA_DIALECT,
        "$comment": format!("AUTO-GENERATED BY {}. DO NOT EDIT MANUALLY.", GENERATOR_NAME),
        "title": "VSME datapoint schemas",
        "type": "object",
        "x-total-datapoints": set.len(),
        "properties": modules,
        "$defs": defs,
    })
}

/// JSON Schema fragment for a single generated schema.
pub fn json_schema_for(schema: &Schema) -> Value {
    let mut map = match &schema.kind {
        SchemaKind::Any => Map::new(),
        SchemaKind::Text => type_only("string"),
        SchemaKind::Number => type_only("number"),
        SchemaKind::Boolean => type_only("boolean"),
        SchemaKind::Date => {
            let mut map = type_only("string");
            map.insert("pattern".into(), Value::String(JSON_DATE_PATTERN.into()));
            map
        }
        SchemaKind::Url => string_format("uri"),
        SchemaKind::Email => string_format("email"),
        SchemaKind::Choice(options) => {
            let mut map = type_only("string");
            map.insert(
                "enum".into(),
                Value::Array(options.iter().cloned().map(Value::String).collect()),
            );
            map
        }
        SchemaKind::Table(table) => table_json_schema(table),
    };

    let (min_key, max_key) = match schema.kind {
        SchemaKind::Number => ("minimum", "maximum"),
        SchemaKind::Table(_) => ("minItems", "maxItems"),
        _ => ("minLength", "maxLength"),
    };

    for rule in &schema.rules {
        match rule {
            Rule::Min(min) => {
                let bound = if min_key == "minimum" {
                    json!(min)
                } else {
                    json!(min.ceil().max(0.0) as u64)
                };
                tighten(&mut map, min_key, bound, true);
            }
            Rule::Max(max) => {
                let bound = if max_key == "maximum" {
                    json!(max)
                } else {
                    json!(max.floor().max(0.0) as u64)
                };
                tighten(&mut map, max_key, bound, false);
            }
            Rule::Pattern(pattern) => {
                if map.contains_key("pattern") {
                    let all_of = map
                        .entry("allOf")
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(items) = all_of {
                        items.push(json!({ "pattern": pattern.source() }));
                    }
                } else {
                    map.insert("pattern".into(), Value::String(pattern.source().into()));
                }
            }
            Rule::NonEmpty => tighten(&mut map, "minLength", json!(1), true),
        }
    }

    Value::Object(map)
}

fn table_json_schema(table: &TableSchema) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (id, column) in &table.columns {
        properties.insert(id.clone(), json_schema_for(column));
        if !column.accepts_absent() {
            required.push(Value::String(id.clone()));
        }
    }
    let mut map = type_only("array");
    map.insert(
        "items".into(),
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    );
    if table.min_rows > 0 {
        map.insert("minItems".into(), json!(table.min_rows));
    }
    if let Some(max_rows) = table.max_rows {
        map.insert("maxItems".into(), json!(max_rows));
    }
    map
}

fn type_only(kind: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("type".into(), Value::String(kind.into()));
    map
}

fn string_format(format: &str) -> Map<String, Value> {
    let mut map = type_only("string");
    map.insert("format".into(), Value::String(format.into()));
    map
}

/// Inserts a bound, keeping the stricter one when the key already exists.
fn tighten(map: &mut Map<String, Value>, key: &str, bound: Value, lower: bool) {
    let stricter = match (map.get(key).and_then(Value::as_f64), bound.as_f64()) {
        (Some(existing), Some(candidate)) if lower => candidate > existing,
        (Some(existing), Some(candidate)) => candidate < existing,
        _ => true,
    };
    if stricter {
        map.insert(key.to_string(), bound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Pattern;

    #[test]
    fn zod_required_text_gets_trailing_min() {
        let mut schema = Schema::new(SchemaKind::Text);
        schema.rules.push(Rule::Max(120.0));
        schema.rules.push(Rule::NonEmpty);
        assert_eq!(zod_expr(&schema), "z.string().max(120).min(1, \"Required\")");
    }

    #[test]
    fn zod_escapes_patterns_and_options() {
        let mut schema = Schema::new(SchemaKind::Choice(vec!["Say \"hi\"".into()]));
        schema.rules.push(Rule::Pattern(Pattern::new(r"^\w+$").unwrap()));
        schema.optional = true;
        assert_eq!(
            zod_expr(&schema),
            r#"z.enum(["Say \"hi\""] as const).regex(new RegExp("^\\w+$")).optional()"#
        );
    }

    #[test]
    fn zod_escapes_line_breaks_in_options() {
        let schema = Schema::new(SchemaKind::Choice(vec!["Line\nbreak\u{2028}end".into()]));
        assert_eq!(
            zod_expr(&schema),
            r#"z.enum(["Line\nbreak\u2028end"] as const)"#
        );
    }

    #[test]
    fn json_schema_keeps_stricter_min_length() {
        let mut schema = Schema::new(SchemaKind::Text);
        schema.rules.push(Rule::Min(3.0));
        schema.rules.push(Rule::NonEmpty);
        let fragment = json_schema_for(&schema);
        assert_eq!(fragment["minLength"], 3);
    }
}
