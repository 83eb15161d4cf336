use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{StoreError, StoreResult};

/// A metadata record: field name to JSON value.
pub type Document = Map<String, Value>;

/// Directive assigning field values.
pub const SET: &str = "$set";
/// Directive removing fields.
pub const UNSET: &str = "$unset";
/// Directive adding to numeric fields.
pub const INC: &str = "$inc";

/// An update-modifier document: `{"$set": {...}, "$unset": {...}, ...}`.
///
/// Every top-level key is a `$`-prefixed directive whose value is a map of
/// field names to operands. Which directives take effect is up to the
/// backend; [`Patch::apply_to`] implements `$set`, `$unset` and `$inc`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Patch {
    directives: BTreeMap<String, Document>,
}

impl Patch {
    /// An empty patch (touches no fields).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a modifier document.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        let top = match value {
            Value::Object(top) => top,
            other => {
                return Err(StoreError::InvalidPatch(format!(
                    "expected an object of directives, got {}",
                    kind_of(&other)
                )))
            }
        };

        let mut directives = BTreeMap::new();
        for (name, operand) in top {
            if !name.starts_with('$') {
                return Err(StoreError::InvalidPatch(format!(
                    "top-level key '{name}' is not a $-directive"
                )));
            }
            let fields = match operand {
                Value::Object(fields) => fields,
                other => {
                    return Err(StoreError::InvalidPatch(format!(
                        "{name} must map field names to values, got {}",
                        kind_of(&other)
                    )))
                }
            };
            directives.insert(name, fields);
        }
        Ok(Self { directives })
    }

    /// Builder: assign `field = value` under `$set`.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_fields_mut().insert(field.into(), value.into());
        self
    }

    /// Builder: remove `field` via `$unset`.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.directive_mut(UNSET)
            .insert(field.into(), Value::String(String::new()));
        self
    }

    /// Builder: add `delta` to numeric `field` via `$inc`.
    pub fn inc(mut self, field: impl Into<String>, delta: impl Into<Number>) -> Self {
        self.directive_mut(INC)
            .insert(field.into(), Value::Number(delta.into()));
        self
    }

    /// Field map of a directive, if present.
    pub fn directive(&self, name: &str) -> Option<&Document> {
        self.directives.get(name)
    }

    /// Field map of a directive, created empty if absent.
    pub fn directive_mut(&mut self, name: &str) -> &mut Document {
        self.directives.entry(name.to_string()).or_default()
    }

    /// The `$set` field map, if present.
    pub fn set_fields(&self) -> Option<&Document> {
        self.directive(SET)
    }

    /// The `$set` field map, created empty if absent.
    pub fn set_fields_mut(&mut self) -> &mut Document {
        self.directive_mut(SET)
    }

    /// Directive names in sorted order.
    pub fn directive_names(&self) -> impl Iterator<Item = &str> {
        self.directives.keys().map(String::as_str)
    }

    /// `true` if no directive touches any field.
    pub fn is_empty(&self) -> bool {
        self.directives.values().all(Map::is_empty)
    }

    /// Apply this patch to `doc` in place.
    ///
    /// Nothing is modified unless the whole patch is applicable: unknown
    /// directives, fields targeted by two directives, and `$inc` on
    /// non-numeric values are rejected up front.
    pub fn apply_to(&self, doc: &mut Document) -> StoreResult<()> {
        self.check_applicable(doc)?;

        if let Some(fields) = self.directive(SET) {
            for (field, value) in fields {
                doc.insert(field.clone(), value.clone());
            }
        }
        if let Some(fields) = self.directive(UNSET) {
            for field in fields.keys() {
                doc.remove(field);
            }
        }
        if let Some(fields) = self.directive(INC) {
            for (field, delta) in fields {
                let current = doc.get(field).cloned().unwrap_or(Value::from(0));
                doc.insert(field.clone(), add_numbers(field, &current, delta)?);
            }
        }
        Ok(())
    }

    fn check_applicable(&self, doc: &Document) -> StoreResult<()> {
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for (name, fields) in &self.directives {
            if ![SET, UNSET, INC].contains(&name.as_str()) {
                return Err(StoreError::UnsupportedDirective(name.clone()));
            }
            for field in fields.keys() {
                if let Some(first) = owners.insert(field, name) {
                    return Err(StoreError::ConflictingField {
                        field: field.clone(),
                        first: first.to_string(),
                        second: name.clone(),
                    });
                }
            }
        }

        if let Some(fields) = self.directive(INC) {
            for (field, delta) in fields {
                let current = doc.get(field).cloned().unwrap_or(Value::from(0));
                add_numbers(field, &current, delta)?;
            }
        }
        Ok(())
    }
}

impl TryFrom<Value> for Patch {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Patch> for Value {
    fn from(patch: Patch) -> Self {
        Value::Object(
            patch
                .directives
                .into_iter()
                .map(|(name, fields)| (name, Value::Object(fields)))
                .collect(),
        )
    }
}

fn add_numbers(field: &str, current: &Value, delta: &Value) -> StoreResult<Value> {
    let mismatch = |reason: String| StoreError::FieldTypeMismatch {
        directive: INC.to_string(),
        field: field.to_string(),
        reason,
    };

    let (Value::Number(a), Value::Number(b)) = (current, delta) else {
        return Err(mismatch(format!(
            "cannot add {} to {}",
            kind_of(delta),
            kind_of(current)
        )));
    };

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x
            .checked_add(y)
            .map(Value::from)
            .ok_or_else(|| mismatch("integer overflow".to_string()));
    }

    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Number::from_f64(x + y)
            .map(Value::Number)
            .ok_or_else(|| mismatch("result is not a finite number".to_string())),
        _ => Err(mismatch("operands out of range".to_string())),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
