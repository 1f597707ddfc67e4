//! Search parameter model.

use crate::date_range::DateRange;
use crate::model::value::{ParamValue, Params, Value};
use serde::Serialize;

/// Comparison operator for custom conditions and relation count checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "not like")]
    NotLike,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Some(Self::Eq),
            "<>" | "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "like" => Some(Self::Like),
            "not like" => Some(Self::NotLike),
            _ => None,
        }
    }
}

/// `column op value`, always bound as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Condition {
    pub fn new(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, CompareOp::Eq, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Filters plus reserved directives for one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchParams {
    /// Field filters, matched per the entity's field rules.
    pub filters: Params,
    pub where_custom: Vec<Condition>,
    pub where_custom_in: Vec<(String, Vec<Value>)>,
    pub where_raw: Vec<String>,
    pub order: Vec<(String, Direction)>,
    pub select: Vec<String>,
    pub select_raw: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.filters.insert(field, value);
        self
    }

    pub fn where_custom(mut self, condition: Condition) -> Self {
        self.where_custom.push(condition);
        self
    }

    /// Adds `column >= start` and `column <= end` as text timestamps.
    pub fn within(mut self, column: &str, range: &DateRange) -> Self {
        self.where_custom
            .push(Condition::new(column, CompareOp::Ge, range.start_text()));
        self.where_custom
            .push(Condition::new(column, CompareOp::Le, range.end_text()));
        self
    }

    pub fn where_in(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.where_custom_in.push((column.into(), values));
        self
    }

    pub fn where_raw(mut self, fragment: impl Into<String>) -> Self {
        self.where_raw.push(fragment.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order.push((field.into(), direction));
        self
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.select
            .extend(columns.iter().map(|column| (*column).to_string()));
        self
    }

    pub fn select_raw(mut self, expression: impl Into<String>) -> Self {
        self.select_raw = Some(expression.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}
