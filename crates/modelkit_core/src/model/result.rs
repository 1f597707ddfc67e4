//! Structured outcome of mutating operations.
//!
//! Serialized shape: `{"code": 200, "msg": "...", "insertId": 7}`.

use crate::model::value::Value;
use serde::Serialize;

/// Status codes carried by [`UpdateResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    /// Create/update input could not be persisted.
    Rejected,
    NotFound,
    /// Validation or business-rule failure.
    Invalid,
    Internal,
}

impl ResultCode {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Rejected => 302,
            Self::NotFound => 404,
            Self::Invalid => 456,
            Self::Internal => 500,
        }
    }
}

impl Serialize for ResultCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateResult {
    pub code: ResultCode,
    pub msg: String,
    #[serde(rename = "insertId", skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<Value>,
    #[serde(rename = "updateId", skip_serializing_if = "Option::is_none")]
    pub update_id: Option<Value>,
}

impl UpdateResult {
    pub fn new(code: ResultCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            insert_id: None,
            update_id: None,
        }
    }

    pub fn ok(msg: impl Into<String>) -> Self {
        Self::new(ResultCode::Ok, msg)
    }

    pub fn inserted(msg: impl Into<String>, id: Value) -> Self {
        Self {
            insert_id: Some(id),
            ..Self::ok(msg)
        }
    }

    pub fn updated(msg: impl Into<String>, id: Value) -> Self {
        Self {
            update_id: Some(id),
            ..Self::ok(msg)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ResultCode::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::{ResultCode, UpdateResult};
    use crate::model::value::Value;

    #[test]
    fn serializes_numeric_code_and_optional_ids() {
        let created = UpdateResult::inserted("created", Value::Integer(7));
        assert_eq!(
            serde_json::to_value(&created).unwrap(),
            serde_json::json!({"code": 200, "msg": "created", "insertId": 7})
        );

        let failed = UpdateResult::new(ResultCode::Invalid, "record already deleted");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"code": 456, "msg": "record already deleted"})
        );
    }
}
