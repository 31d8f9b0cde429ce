//! Schema capability. Describes the shape the LLM is expected to return and
//! validates/coerces a JSON mapping against it.
//!
//! The same `Schema` drives all three extraction paths (tool call, content JSON,
//! tag fallback), so a value is accepted or rejected identically regardless of
//! how it was recovered from the backend response.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Number, Value};

/// Declared type of a single schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// Accepts any JSON value unchanged.
    Any,
    Null,
    List(Box<FieldType>),
    Optional(Box<FieldType>),
    /// Variants are tried in declaration order; the first that accepts the value wins.
    Union(Vec<FieldType>),
    Object(Schema),
}

impl FieldType {
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    /// True when the field may be absent or `null`.
    pub fn is_nullable(&self) -> bool {
        match self {
            FieldType::Null | FieldType::Any | FieldType::Optional(_) => true,
            FieldType::Union(variants) => variants.iter().any(FieldType::is_nullable),
            _ => false,
        }
    }

    /// Strips `Optional` / `Union` wrappers down to the first non-null concrete type.
    /// `Optional(List(String))` and `Union([List(String), Null])` both yield `List(String)`.
    pub fn concrete(&self) -> &FieldType {
        match self {
            FieldType::Optional(inner) => inner.concrete(),
            FieldType::Union(variants) => variants
                .iter()
                .find(|v| !matches!(v, FieldType::Null))
                .map(FieldType::concrete)
                .unwrap_or(self),
            other => other,
        }
    }

    /// Validates `value` against this type, applying lax scalar coercion
    /// (`"5"` → `5`, `"true"` → `true`) the way LLM output usually needs.
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        match self {
            FieldType::Any => Ok(value),
            FieldType::Null => match value {
                Value::Null => Ok(Value::Null),
                other => Err(format!("expected null, got {}", kind(&other))),
            },
            FieldType::String => match value {
                Value::String(_) => Ok(value),
                other => Err(format!("expected string, got {}", kind(&other))),
            },
            FieldType::Integer => coerce_integer(value),
            FieldType::Float => coerce_float(value),
            FieldType::Boolean => coerce_bool(value),
            FieldType::List(inner) => match value {
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| inner.coerce(item).map_err(|e| format!("item {i}: {e}")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                other => Err(format!("expected array, got {}", kind(&other))),
            },
            FieldType::Optional(inner) => match value {
                Value::Null => Ok(Value::Null),
                other => inner.coerce(other),
            },
            FieldType::Union(variants) => {
                let mut reasons = Vec::with_capacity(variants.len());
                for variant in variants {
                    match variant.coerce(value.clone()) {
                        Ok(v) => return Ok(v),
                        Err(reason) => reasons.push(reason),
                    }
                }
                Err(format!("no union variant matched ({})", reasons.join("; ")))
            }
            FieldType::Object(schema) => schema.validate(value),
        }
    }

    /// JSON Schema fragment used when advertising the schema as a tool.
    pub fn json_schema(&self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Float => json!({ "type": "number" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::Any => json!({}),
            FieldType::Null => json!({ "type": "null" }),
            FieldType::List(inner) => json!({ "type": "array", "items": inner.json_schema() }),
            FieldType::Optional(inner) => {
                json!({ "anyOf": [inner.json_schema(), { "type": "null" }] })
            }
            FieldType::Union(variants) => json!({
                "anyOf": variants.iter().map(FieldType::json_schema).collect::<Vec<_>>()
            }),
            FieldType::Object(schema) => schema.json_schema(),
        }
    }
}

/// A named field in a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

impl Field {
    pub fn is_required(&self) -> bool {
        !self.ty.is_nullable()
    }
}

/// Record description: a name (for diagnostics) plus ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Validates a JSON object against the declared fields.
    ///
    /// Required fields must be present and non-null; a null optional field is
    /// dropped. Declared fields are coerced to their types; undeclared keys pass
    /// through untouched.
    pub fn validate(&self, value: Value) -> Result<Value, String> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(format!(
                    "{}: expected an object, got {}",
                    self.name,
                    kind(&other)
                ))
            }
        };

        for field in &self.fields {
            match map.remove(&field.name) {
                None | Some(Value::Null) if field.is_required() => {
                    return Err(format!(
                        "{}: missing required field `{}`",
                        self.name, field.name
                    ));
                }
                // Absent and null are the same for optional fields.
                None | Some(Value::Null) => {}
                Some(raw) => {
                    let coerced = field
                        .ty
                        .coerce(raw)
                        .map_err(|e| format!("{}: field `{}`: {e}", self.name, field.name))?;
                    map.insert(field.name.clone(), coerced);
                }
            }
        }

        Ok(Value::Object(map))
    }

    /// Validates `value` and builds the typed record from it. A serde construction
    /// failure is reported the same way as a schema violation.
    pub fn instantiate<T: DeserializeOwned>(&self, value: Value) -> Result<T, String> {
        let validated = self.validate(value)?;
        serde_json::from_value(validated).map_err(|e| format!("{}: {e}", self.name))
    }

    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.ty.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.is_required())
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A typed LLM output: a serde-deserializable record that can describe itself.
pub trait StructuredOutput: DeserializeOwned {
    fn schema() -> Schema;
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn coerce_integer(value: Value) -> Result<Value, String> {
    match value {
        Value::Number(ref n) if n.is_i64() || n.is_u64() => Ok(value),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Value::Number(Number::from(f as i64)))
            }
            _ => Err(format!("expected integer, got {n}")),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(|i| Value::Number(Number::from(i)))
            .map_err(|_| format!("expected integer, got string {s:?}")),
        other => Err(format!("expected integer, got {}", kind(&other))),
    }
}

fn coerce_float(value: Value) -> Result<Value, String> {
    match value {
        Value::Number(_) => Ok(value),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("expected number, got string {s:?}")),
        other => Err(format!("expected number, got {}", kind(&other))),
    }
}

fn coerce_bool(value: Value) -> Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
            "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
            _ => Err(format!("expected boolean, got string {s:?}")),
        },
        other => Err(format!("expected boolean, got {}", kind(&other))),
    }
}
