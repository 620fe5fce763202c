//! Declarative per-entity validation configuration

use super::validators;
use crate::core::error::FieldViolation;
use serde_json::{Map, Value};
use std::sync::Arc;

type FilterFn = Arc<dyn Fn(&str, Value) -> anyhow::Result<Value> + Send + Sync>;
type ValidatorFn = Arc<dyn Fn(&str, &Value) -> Result<(), String> + Send + Sync>;

/// Which write a payload is validated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
}

impl Operation {
    /// POST creates, PUT and PATCH update
    pub fn from_method(method: &axum::http::Method) -> Self {
        match method.as_str() {
            "PUT" | "PATCH" => Operation::Update,
            _ => Operation::Create,
        }
    }
}

#[derive(Clone, Default)]
enum FieldShape {
    #[default]
    Scalar,
    Object(Box<EntityValidationConfig>),
    Array(Box<EntityValidationConfig>),
}

#[derive(Clone, Default)]
struct FieldRules {
    name: String,
    required: bool,
    default: Option<Value>,
    filters: Vec<FilterFn>,
    validators: Vec<ValidatorFn>,
    shape: FieldShape,
}

#[derive(Clone)]
struct OneOfRule {
    fields: Vec<String>,
    message: String,
}

/// Ordered field rules for one entity and one operation
///
/// For every configured field the raw value is run through its filters, then
/// its validators. The first failing validator of a field yields that field's
/// violation; all fields are checked so the caller gets the complete list.
/// Fields not configured are dropped from the output.
#[derive(Clone)]
pub struct EntityValidationConfig {
    entity_type: String,
    fields: Vec<FieldRules>,
    one_of: Vec<OneOfRule>,
}

impl EntityValidationConfig {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: Vec::new(),
            one_of: Vec::new(),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn field_mut(&mut self, field: &str) -> &mut FieldRules {
        let index = match self.fields.iter().position(|f| f.name == field) {
            Some(index) => index,
            None => {
                self.fields.push(FieldRules {
                    name: field.to_string(),
                    ..FieldRules::default()
                });
                self.fields.len() - 1
            }
        };
        &mut self.fields[index]
    }

    /// Declare a field that must be present and non-null
    pub fn require(&mut self, field: &str) -> &mut Self {
        self.field_mut(field).required = true;
        self
    }

    /// Declare a field that may be absent; its rules apply only when present
    pub fn optional(&mut self, field: &str) -> &mut Self {
        self.field_mut(field).required = false;
        self
    }

    /// Value used when an optional field is absent
    pub fn default_value(&mut self, field: &str, value: Value) -> &mut Self {
        self.field_mut(field).default = Some(value);
        self
    }

    pub fn add_filter<F>(&mut self, field: &str, filter: F) -> &mut Self
    where
        F: Fn(&str, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.field_mut(field).filters.push(Arc::new(filter));
        self
    }

    pub fn add_validator<F>(&mut self, field: &str, validator: F) -> &mut Self
    where
        F: Fn(&str, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.field_mut(field).validators.push(Arc::new(validator));
        self
    }

    /// Validate an object-valued field with its own configuration
    pub fn nested(&mut self, field: &str, config: EntityValidationConfig) -> &mut Self {
        self.field_mut(field).shape = FieldShape::Object(Box::new(config));
        self
    }

    /// Validate every element of an array-valued field with `config`
    pub fn each(&mut self, field: &str, config: EntityValidationConfig) -> &mut Self {
        self.field_mut(field).shape = FieldShape::Array(Box::new(config));
        self
    }

    /// At least one of `fields` must be present
    pub fn require_one_of(&mut self, fields: &[&str], message: impl Into<String>) -> &mut Self {
        self.one_of.push(OneOfRule {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            message: message.into(),
        });
        self
    }

    /// Filter and validate `payload`, returning the normalized object
    ///
    /// Normalization happens on a fresh output object; on failure nothing of
    /// it is returned.
    pub fn validate_and_filter(&self, payload: Value) -> Result<Value, Vec<FieldViolation>> {
        let mut violations = Vec::new();
        let output = self.apply(payload, "", &mut violations);
        if violations.is_empty() {
            Ok(output)
        } else {
            Err(violations)
        }
    }

    fn apply(&self, payload: Value, prefix: &str, violations: &mut Vec<FieldViolation>) -> Value {
        let Value::Object(mut input) = payload else {
            let target = if prefix.is_empty() { "body" } else { prefix };
            violations.push(FieldViolation::new(
                target,
                format!("'{}' must be a JSON object", target),
            ));
            return Value::Null;
        };

        let mut output = Map::new();
        for rules in &self.fields {
            let path = join_path(prefix, &rules.name);
            let raw = input.remove(&rules.name).unwrap_or(Value::Null);

            if raw.is_null() {
                if rules.required {
                    violations.push(FieldViolation::new(
                        &path,
                        format!("'{}' is required", rules.name),
                    ));
                } else if let Some(default) = &rules.default {
                    output.insert(rules.name.clone(), default.clone());
                }
                continue;
            }

            if let Some(value) = rules.check(raw, &path, violations) {
                output.insert(rules.name.clone(), value);
            }
        }

        for rule in &self.one_of {
            if !rule.fields.iter().any(|f| output.contains_key(f)) {
                let target = if prefix.is_empty() { "body" } else { prefix };
                violations.push(FieldViolation::new(target, rule.message.clone()));
            }
        }

        Value::Object(output)
    }
}

impl FieldRules {
    fn check(&self, raw: Value, path: &str, violations: &mut Vec<FieldViolation>) -> Option<Value> {
        let mut value = raw;
        for filter in &self.filters {
            match filter(&self.name, value) {
                Ok(filtered) => value = filtered,
                Err(e) => {
                    violations.push(FieldViolation::new(path, e.to_string()));
                    return None;
                }
            }
        }

        for validator in &self.validators {
            if let Err(message) = validator(&self.name, &value) {
                violations.push(FieldViolation::new(path, message));
                return None;
            }
        }

        match &self.shape {
            FieldShape::Scalar => Some(value),
            FieldShape::Object(config) => {
                let before = violations.len();
                let nested = config.apply(value, path, violations);
                (violations.len() == before).then_some(nested)
            }
            FieldShape::Array(config) => {
                let Value::Array(elements) = value else {
                    violations.push(FieldViolation::new(
                        path,
                        validators::must_be_array_message(&self.name),
                    ));
                    return None;
                };
                let before = violations.len();
                let checked: Vec<Value> = elements
                    .into_iter()
                    .enumerate()
                    .map(|(i, element)| {
                        config.apply(element, &format!("{}[{}]", path, i), violations)
                    })
                    .collect();
                (violations.len() == before).then_some(Value::Array(checked))
            }
        }
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}
