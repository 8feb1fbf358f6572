use anyhow::anyhow;
use tracing::{error, info, warn};

use crate::editor::TreeEditor;
use crate::error::{LibError, Result};
use crate::models::{
    DepartmentDraft, DepartmentId, DepartmentIntent, DepartmentNode, DepartmentRecord,
};
use crate::store::DepartmentStore;
use crate::tree::structure_anomalies;

/// What a dispatched intent produced. `Rejected` means the collaborator
/// failed; the message is on the editor and the session stayed open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    Saved(DepartmentRecord),
    Deleted(DepartmentId),
    Rejected,
}

/// Glue between the tree editor and the store collaborator: fetch on load,
/// dispatch emitted intents, resolve the session, re-fetch on success.
///
/// `can_manage` is the permission boolean consumed as given; evaluating
/// permissions is the caller's problem.
pub struct DirectoryService<S> {
    store: S,
    editor: TreeEditor,
    can_manage: bool,
}

impl<S: DepartmentStore> DirectoryService<S> {
    pub fn new(store: S) -> Self {
        Self::with_permission(store, true)
    }

    pub fn with_permission(store: S, can_manage: bool) -> Self {
        Self {
            store,
            editor: TreeEditor::new(),
            can_manage,
        }
    }

    pub fn editor(&self) -> &TreeEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut TreeEditor {
        &mut self.editor
    }

    pub fn can_manage(&self) -> bool {
        self.can_manage
    }

    /// Current render forest, rebuilt from the latest fetched list.
    pub fn forest(&self) -> Vec<DepartmentNode> {
        self.editor.forest()
    }

    /// Fetches the flat list and hands it to the editor. Structural
    /// anomalies are logged and otherwise left to the builder's policies.
    pub async fn load(&mut self) -> Result<()> {
        let records = self.store.fetch_departments().await?;
        for anomaly in structure_anomalies(&records) {
            warn!(?anomaly, "department list has a structural anomaly");
        }
        info!(count = records.len(), "department list refreshed");
        self.editor.set_records(records);
        Ok(())
    }

    /// Submits the open edit session: emits the intent, dispatches it, and
    /// resolves the session with the outcome.
    pub async fn submit(&mut self) -> Result<DirectoryEvent> {
        self.ensure_can_manage()?;
        let intent = self.editor.submit()?;
        self.settle(intent).await
    }

    /// Confirms the armed delete and dispatches it. Declining is a pure
    /// editor operation and never reaches the store.
    pub async fn confirm_delete(&mut self) -> Result<DirectoryEvent> {
        self.ensure_can_manage()?;
        let intent = self.editor.confirm_delete()?;
        self.settle(intent).await
    }

    async fn settle(&mut self, intent: DepartmentIntent) -> Result<DirectoryEvent> {
        match self.dispatch(intent).await {
            Ok(event) => {
                self.editor.resolve_success();
                self.load().await?;
                Ok(event)
            }
            Err(err) => {
                error!(code = err.code, error = %err.source, "department intent failed");
                self.editor.resolve_failure(err.public);
                Ok(DirectoryEvent::Rejected)
            }
        }
    }

    async fn dispatch(&self, intent: DepartmentIntent) -> Result<DirectoryEvent> {
        match intent {
            DepartmentIntent::Create { name, parent_id } => {
                let record = self
                    .store
                    .create_department(DepartmentDraft::new(name, parent_id))
                    .await?;
                info!(id = %record.id, "department created");
                Ok(DirectoryEvent::Saved(record))
            }
            DepartmentIntent::Update {
                id,
                name,
                parent_id,
            } => {
                let record = self
                    .store
                    .update_department(id, DepartmentDraft::new(name, parent_id))
                    .await?;
                info!(id = %record.id, "department updated");
                Ok(DirectoryEvent::Saved(record))
            }
            DepartmentIntent::Delete { id } => {
                let id = self.store.delete_department(id).await?;
                info!(%id, "department deleted");
                Ok(DirectoryEvent::Deleted(id))
            }
        }
    }

    fn ensure_can_manage(&self) -> Result<()> {
        if self.can_manage {
            Ok(())
        } else {
            Err(LibError::forbidden(
                "You do not have permission to manage departments",
                anyhow!("department mutation without manage permission"),
            ))
        }
    }
}
