use std::fmt;

use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{LibError, Result};

/// Opaque department identifier. The server owns the format; this crate only
/// ever compares ids for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DepartmentId(pub String);

impl DepartmentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DepartmentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DepartmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Flat server-sourced department row. `parent_id` is `None` for roots; the
/// wire form may carry `null` or omit the key entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRecord {
    pub id: DepartmentId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<DepartmentId>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Derived render tree. Rebuilt wholesale from the flat list on every
/// refresh, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentNode {
    pub id: DepartmentId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DepartmentId>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub children: Vec<DepartmentNode>,
}

/// Create/update payload handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDraft {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<DepartmentId>,
}

impl DepartmentDraft {
    pub fn new(name: impl Into<String>, parent_id: Option<DepartmentId>) -> Self {
        Self {
            name: name.into(),
            parent_id,
        }
    }

    /// Store-side name policy: surrounding whitespace is dropped and a blank
    /// name is rejected. The editor forwards names verbatim; this is the
    /// collaborator's check.
    pub fn normalized(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(LibError::invalid(
                "Department name is required",
                anyhow!("empty department name"),
            ));
        }

        Ok(Self {
            name,
            parent_id: self.parent_id,
        })
    }
}

/// Mutation emitted by the editor and handed to the collaborator. The tree
/// itself only changes once the collaborator reports success and the flat
/// list is re-fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DepartmentIntent {
    Create {
        name: String,
        parent_id: Option<DepartmentId>,
    },
    Update {
        id: DepartmentId,
        name: String,
        parent_id: Option<DepartmentId>,
    },
    Delete {
        id: DepartmentId,
    },
}

/// Structural problem in a fetched flat list. Reported for logging only;
/// the builder stays total and handles all of these by policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StructureAnomaly {
    DuplicateId {
        id: DepartmentId,
    },
    DanglingParent {
        id: DepartmentId,
        parent_id: DepartmentId,
    },
    SelfParent {
        id: DepartmentId,
    },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{DepartmentDraft, DepartmentId, DepartmentIntent, DepartmentRecord};

    #[test]
    fn record_parent_id_defaults_to_none_when_absent() {
        let record: DepartmentRecord = serde_json::from_value(json!({
            "id": "d-1",
            "name": "Engineering",
            "createdAt": "2026-01-01T00:00:00",
            "updatedAt": "2026-01-01T00:00:00"
        }))
        .expect("record without parentId should deserialize");
        assert_eq!(record.parent_id, None);
    }

    #[test]
    fn record_parent_id_accepts_explicit_null() {
        let record: DepartmentRecord = serde_json::from_value(json!({
            "id": "d-1",
            "name": "Engineering",
            "parentId": null,
            "createdAt": "2026-01-01T00:00:00",
            "updatedAt": "2026-01-01T00:00:00"
        }))
        .expect("record with null parentId should deserialize");
        assert_eq!(record.parent_id, None);
    }

    #[test]
    fn intent_wire_shape_is_tagged() {
        let intent = DepartmentIntent::Update {
            id: DepartmentId::from("d-2"),
            name: "Platform".to_string(),
            parent_id: Some(DepartmentId::from("d-1")),
        };
        let value = serde_json::to_value(&intent).expect("intent should serialize");
        assert_eq!(
            value,
            json!({
                "intent": "update",
                "id": "d-2",
                "name": "Platform",
                "parentId": "d-1"
            })
        );
    }

    #[test]
    fn create_intent_serializes_missing_parent_as_null() {
        let intent = DepartmentIntent::Create {
            name: "People".to_string(),
            parent_id: None,
        };
        let value = serde_json::to_value(&intent).expect("intent should serialize");
        assert_eq!(value["parentId"], json!(null));
    }

    #[test]
    fn draft_normalization_trims_name() {
        let draft = DepartmentDraft::new("  Design  ", None)
            .normalized()
            .expect("non-empty name should pass");
        assert_eq!(draft.name, "Design");
    }

    #[test]
    fn draft_normalization_rejects_blank_name() {
        let err = DepartmentDraft::new("   ", None)
            .normalized()
            .expect_err("blank name should fail");
        assert_eq!(err.public, "Department name is required");
    }
}
