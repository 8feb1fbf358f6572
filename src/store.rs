use std::future::Future;
use std::sync::Mutex;

use anyhow::anyhow;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{LibError, Result};
use crate::models::{DepartmentDraft, DepartmentId, DepartmentRecord};

/// Port to the data-fetch/store collaborator. Network, retry, and timeout
/// policy all live behind this boundary; the tree subsystem only sees the
/// flat list and success/failure per intent.
pub trait DepartmentStore {
    fn fetch_departments(&self) -> impl Future<Output = Result<Vec<DepartmentRecord>>> + Send;

    fn create_department(
        &self,
        draft: DepartmentDraft,
    ) -> impl Future<Output = Result<DepartmentRecord>> + Send;

    fn update_department(
        &self,
        id: DepartmentId,
        draft: DepartmentDraft,
    ) -> impl Future<Output = Result<DepartmentRecord>> + Send;

    fn delete_department(
        &self,
        id: DepartmentId,
    ) -> impl Future<Output = Result<DepartmentId>> + Send;
}

/// In-memory reference adapter. Holds the server-side validation the editor
/// deliberately leaves out: blank names, unknown parents, and self-parenting
/// are rejected here. Deleting a department leaves its children in place
/// with a dangling parent reference; they demote to roots on the next
/// rebuild.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    records: Mutex<Vec<DepartmentRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<DepartmentRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<DepartmentRecord>>> {
        self.records.lock().map_err(|_| {
            LibError::store(
                "Department store is unavailable",
                anyhow!("directory mutex poisoned"),
            )
        })
    }
}

impl DepartmentStore for MemoryDirectory {
    fn fetch_departments(&self) -> impl Future<Output = Result<Vec<DepartmentRecord>>> + Send {
        async move { Ok(self.lock()?.clone()) }
    }

    fn create_department(
        &self,
        draft: DepartmentDraft,
    ) -> impl Future<Output = Result<DepartmentRecord>> + Send {
        async move {
            let draft = draft.normalized()?;
            let mut records = self.lock()?;
            ensure_parent_exists(&records, draft.parent_id.as_ref())?;

            let now = Utc::now().naive_utc();
            let record = DepartmentRecord {
                id: DepartmentId(Uuid::new_v4().to_string()),
                name: draft.name,
                parent_id: draft.parent_id,
                created_at: now,
                updated_at: now,
            };
            records.push(record.clone());
            Ok(record)
        }
    }

    fn update_department(
        &self,
        id: DepartmentId,
        draft: DepartmentDraft,
    ) -> impl Future<Output = Result<DepartmentRecord>> + Send {
        async move {
            let draft = draft.normalized()?;
            if draft.parent_id.as_ref() == Some(&id) {
                return Err(LibError::invalid_with_code(
                    "self_parent",
                    "A department cannot be its own parent",
                    anyhow!("department {} named itself as parent", id),
                ));
            }

            let mut records = self.lock()?;
            ensure_parent_exists(&records, draft.parent_id.as_ref())?;
            let record = records
                .iter_mut()
                .find(|record| record.id == id)
                .ok_or_else(|| {
                    LibError::not_found(
                        "Department not found",
                        anyhow!("update for unknown department {}", id),
                    )
                })?;

            record.name = draft.name;
            record.parent_id = draft.parent_id;
            record.updated_at = Utc::now().naive_utc();
            Ok(record.clone())
        }
    }

    fn delete_department(
        &self,
        id: DepartmentId,
    ) -> impl Future<Output = Result<DepartmentId>> + Send {
        async move {
            let mut records = self.lock()?;
            let position = records
                .iter()
                .position(|record| record.id == id)
                .ok_or_else(|| {
                    LibError::not_found(
                        "Department not found",
                        anyhow!("delete for unknown department {}", id),
                    )
                })?;

            records.remove(position);
            Ok(id)
        }
    }
}

fn ensure_parent_exists(
    records: &[DepartmentRecord],
    parent_id: Option<&DepartmentId>,
) -> Result<()> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };
    if records.iter().any(|record| &record.id == parent_id) {
        Ok(())
    } else {
        Err(LibError::not_found(
            "Parent department not found",
            anyhow!("unknown parent department {}", parent_id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_forest;

    async fn seeded() -> (MemoryDirectory, DepartmentId, DepartmentId) {
        let store = MemoryDirectory::new();
        let root = store
            .create_department(DepartmentDraft::new("Engineering", None))
            .await
            .expect("root should create");
        let child = store
            .create_department(DepartmentDraft::new("Platform", Some(root.id.clone())))
            .await
            .expect("child should create");
        (store, root.id, child.id)
    }

    #[tokio::test]
    async fn create_and_fetch_preserve_insertion_order() {
        let (store, root_id, child_id) = seeded().await;

        let records = store.fetch_departments().await.expect("fetch should work");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, root_id);
        assert_eq!(records[1].id, child_id);
        assert_eq!(records[1].parent_id, Some(root_id));
    }

    #[tokio::test]
    async fn create_trims_names_and_rejects_blank_ones() {
        let store = MemoryDirectory::new();
        let record = store
            .create_department(DepartmentDraft::new("  People Ops  ", None))
            .await
            .expect("trimmed name should create");
        assert_eq!(record.name, "People Ops");

        let err = store
            .create_department(DepartmentDraft::new("   ", None))
            .await
            .expect_err("blank name should fail");
        assert_eq!(err.public, "Department name is required");
    }

    #[tokio::test]
    async fn create_rejects_unknown_parent() {
        let store = MemoryDirectory::new();
        let err = store
            .create_department(DepartmentDraft::new(
                "Design",
                Some(DepartmentId::from("missing")),
            ))
            .await
            .expect_err("unknown parent should fail");
        assert_eq!(err.public, "Parent department not found");
    }

    #[tokio::test]
    async fn update_rewrites_name_and_parent() {
        let (store, _root_id, child_id) = seeded().await;

        let updated = store
            .update_department(
                child_id.clone(),
                DepartmentDraft::new("Platform Engineering", None),
            )
            .await
            .expect("update should work");
        assert_eq!(updated.name, "Platform Engineering");
        assert_eq!(updated.parent_id, None);

        let records = store.fetch_departments().await.expect("fetch should work");
        let stored = records
            .iter()
            .find(|record| record.id == child_id)
            .expect("record should still exist");
        assert_eq!(stored.name, "Platform Engineering");
    }

    #[tokio::test]
    async fn update_rejects_self_parent() {
        let (store, root_id, _child_id) = seeded().await;

        let err = store
            .update_department(
                root_id.clone(),
                DepartmentDraft::new("Engineering", Some(root_id)),
            )
            .await
            .expect_err("self parent should fail");
        assert_eq!(err.code, "self_parent");
    }

    #[tokio::test]
    async fn update_of_unknown_department_is_not_found() {
        let store = MemoryDirectory::new();
        let err = store
            .update_department(
                DepartmentId::from("missing"),
                DepartmentDraft::new("Ghost", None),
            )
            .await
            .expect_err("unknown id should fail");
        assert_eq!(err.code, "not_found");
    }

    #[tokio::test]
    async fn delete_leaves_children_dangling_for_demotion() {
        let (store, root_id, child_id) = seeded().await;

        let deleted = store
            .delete_department(root_id.clone())
            .await
            .expect("delete should work");
        assert_eq!(deleted, root_id);

        let records = store.fetch_departments().await.expect("fetch should work");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].parent_id, Some(root_id));

        // The orphaned child renders as a root on the next rebuild.
        let forest = build_forest(&records);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, child_id);
    }

    #[tokio::test]
    async fn delete_of_unknown_department_is_not_found() {
        let store = MemoryDirectory::new();
        let err = store
            .delete_department(DepartmentId::from("missing"))
            .await
            .expect_err("unknown id should fail");
        assert_eq!(err.code, "not_found");
    }
}
