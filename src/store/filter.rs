use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::{Bson, Document, doc};
use serde_json::Value;
use uuid::Uuid;

/// Scalar (or list-of-scalar) operand for filter clauses and patch sets.
/// Dates are carried as RFC 3339 strings, matching how chrono serializes
/// through serde into both backends.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<FieldValue>),
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::String(value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl<V: Into<FieldValue>> From<Vec<V>> for FieldValue {
    fn from(values: Vec<V>) -> Self {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl FieldValue {
    fn to_bson(&self) -> Bson {
        match self {
            FieldValue::Null => Bson::Null,
            FieldValue::Bool(b) => Bson::Boolean(*b),
            FieldValue::Int(i) => Bson::Int64(*i),
            FieldValue::String(s) => Bson::String(s.clone()),
            FieldValue::List(items) => Bson::Array(items.iter().map(Self::to_bson).collect()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::from(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::String(s) => Value::from(s.clone()),
            FieldValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            FieldValue::Null => actual.is_none_or(Value::is_null),
            FieldValue::Bool(b) => actual.and_then(Value::as_bool) == Some(*b),
            FieldValue::Int(i) => actual.and_then(Value::as_i64) == Some(*i),
            FieldValue::String(s) => actual.and_then(Value::as_str) == Some(s.as_str()),
            FieldValue::List(_) => false,
        }
    }

    fn compare(&self, actual: Option<&Value>) -> Option<std::cmp::Ordering> {
        match self {
            FieldValue::Int(i) => actual.and_then(Value::as_i64).map(|a| a.cmp(i)),
            FieldValue::String(s) => actual.and_then(Value::as_str).map(|a| a.cmp(s.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Prefix,
}

#[derive(Debug, Clone)]
struct Clause {
    field: String,
    op: Op,
    value: FieldValue,
}

/// Conjunction of per-field clauses, translated to a bson document for the
/// Mongo backend and evaluated against serialized JSON for the memory one.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, field: impl Into<String>, op: Op, value: FieldValue) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            op,
            value,
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Eq, value.into())
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Ne, value.into())
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Gt, value.into())
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Gte, value.into())
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Lt, value.into())
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Lte, value.into())
    }

    pub fn is_in(self, field: impl Into<String>, values: impl Into<FieldValue>) -> Self {
        self.push(field, Op::In, values.into())
    }

    pub fn not_in(self, field: impl Into<String>, values: impl Into<FieldValue>) -> Self {
        self.push(field, Op::NotIn, values.into())
    }

    /// String prefix match on `field`.
    pub fn prefix(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, Op::Prefix, FieldValue::String(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub(crate) fn to_document(&self) -> Document {
        if self.clauses.is_empty() {
            return Document::new();
        }
        let parts: Vec<Document> = self
            .clauses
            .iter()
            .map(|clause| {
                let value = clause.value.to_bson();
                let condition: Bson = match clause.op {
                    Op::Eq => value,
                    Op::Ne => doc! { "$ne": value }.into(),
                    Op::Gt => doc! { "$gt": value }.into(),
                    Op::Gte => doc! { "$gte": value }.into(),
                    Op::Lt => doc! { "$lt": value }.into(),
                    Op::Lte => doc! { "$lte": value }.into(),
                    Op::In => doc! { "$in": value }.into(),
                    Op::NotIn => doc! { "$nin": value }.into(),
                    Op::Prefix => match &clause.value {
                        FieldValue::String(s) => {
                            doc! { "$regex": format!("^{}", escape_regex(s)) }.into()
                        }
                        _ => value,
                    },
                };
                let mut part = Document::new();
                part.insert(&clause.field, condition);
                part
            })
            .collect();
        doc! { "$and": parts }
    }

    pub(crate) fn matches(&self, document: &Value) -> bool {
        self.clauses.iter().all(|clause| {
            let actual = document.get(&clause.field);
            match clause.op {
                Op::Eq => clause.value.matches(actual),
                Op::Ne => !clause.value.matches(actual),
                Op::Gt => clause.value.compare(actual) == Some(std::cmp::Ordering::Greater),
                Op::Gte => matches!(
                    clause.value.compare(actual),
                    Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                ),
                Op::Lt => clause.value.compare(actual) == Some(std::cmp::Ordering::Less),
                Op::Lte => matches!(
                    clause.value.compare(actual),
                    Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
                ),
                Op::In => match &clause.value {
                    FieldValue::List(items) => items.iter().any(|item| item.matches(actual)),
                    _ => false,
                },
                Op::NotIn => match &clause.value {
                    FieldValue::List(items) => !items.iter().any(|item| item.matches(actual)),
                    _ => true,
                },
                Op::Prefix => match (&clause.value, actual.and_then(Value::as_str)) {
                    (FieldValue::String(prefix), Some(s)) => s.starts_with(prefix.as_str()),
                    _ => false,
                },
            }
        })
    }
}

/// `$set` / `$inc` update document.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    sets: Vec<(String, FieldValue)>,
    incs: Vec<(String, i64)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.sets.push((field.into(), value.into()));
        self
    }

    pub fn inc(mut self, field: impl Into<String>, by: i64) -> Self {
        self.incs.push((field.into(), by));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.incs.is_empty()
    }

    pub(crate) fn to_document(&self) -> Document {
        let mut update = Document::new();
        if !self.sets.is_empty() {
            let mut sets = Document::new();
            for (field, value) in &self.sets {
                sets.insert(field, value.to_bson());
            }
            update.insert("$set", sets);
        }
        if !self.incs.is_empty() {
            let mut incs = Document::new();
            for (field, by) in &self.incs {
                incs.insert(field, Bson::Int64(*by));
            }
            update.insert("$inc", incs);
        }
        update
    }

    pub(crate) fn apply(&self, document: &mut Value) {
        let Value::Object(map) = document else {
            return;
        };
        for (field, value) in &self.sets {
            map.insert(field.clone(), value.to_json());
        }
        for (field, by) in &self.incs {
            let current = map.get(field).and_then(Value::as_i64).unwrap_or(0);
            map.insert(field.clone(), Value::from(current + by));
        }
    }
}

fn escape_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
