use std::collections::HashSet;

use anyhow::anyhow;

use crate::error::{LibError, Result};
use crate::models::{DepartmentId, DepartmentIntent, DepartmentNode, DepartmentRecord};
use crate::tree::{build_forest, has_children};

/// Form state backing the create/edit surface. `parent_id` holds the raw
/// select value; the empty string means "no parent".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DepartmentForm {
    pub name: String,
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    CreateRoot,
    CreateChild { parent_id: DepartmentId },
    Edit { target_id: DepartmentId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSession {
    pub mode: SessionMode,
    pub form: DepartmentForm,
}

/// The single shared edit session. One surface for the whole tree view, so
/// only one mode can be active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditSession {
    #[default]
    Closed,
    Open(OpenSession),
}

impl EditSession {
    pub fn is_open(&self) -> bool {
        matches!(self, EditSession::Open(_))
    }
}

/// Interactive controller for the department tree: per-node expand state
/// plus the shared edit session, delete confirmation, and in-flight intent
/// tracking. Mutations never touch the tree locally; they are emitted as
/// [`DepartmentIntent`]s and the flat list is replaced once the collaborator
/// reports success.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeEditor {
    records: Vec<DepartmentRecord>,
    expanded: HashSet<DepartmentId>,
    session: EditSession,
    pending_delete: Option<DepartmentId>,
    in_flight: bool,
    last_error: Option<String>,
}

impl TreeEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<DepartmentRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn records(&self) -> &[DepartmentRecord] {
        &self.records
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn pending_delete(&self) -> Option<&DepartmentId> {
        self.pending_delete.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replaces the flat list after a refresh. Expand state survives for ids
    /// still present and resets with the node otherwise; a pending delete
    /// confirmation for a vanished node is dropped.
    pub fn set_records(&mut self, records: Vec<DepartmentRecord>) {
        self.records = records;
        let known: HashSet<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        self.expanded.retain(|id| known.contains(id.as_str()));
        let stale_pending = self
            .pending_delete
            .as_ref()
            .is_some_and(|pending| !known.contains(pending.as_str()));
        if stale_pending {
            self.pending_delete = None;
        }
    }

    /// Current render forest, rebuilt from the flat list on every call.
    pub fn forest(&self) -> Vec<DepartmentNode> {
        build_forest(&self.records)
    }

    pub fn is_expanded(&self, id: &DepartmentId) -> bool {
        self.expanded.contains(id)
    }

    /// Flips expand state for one node. Leaves have no toggle control, so a
    /// childless id is a no-op.
    pub fn toggle(&mut self, id: &DepartmentId) {
        if !has_children(&self.records, id) {
            return;
        }
        if !self.expanded.remove(id) {
            self.expanded.insert(id.clone());
        }
    }

    /// Opens a create session for a new root department. Replaces any open
    /// session; the surface is singular, so last writer wins.
    pub fn open_create_root(&mut self) {
        self.last_error = None;
        self.session = EditSession::Open(OpenSession {
            mode: SessionMode::CreateRoot,
            form: DepartmentForm::default(),
        });
    }

    /// Opens a create session prefilled with `parent` as the parent choice.
    pub fn open_create_child(&mut self, parent: DepartmentId) -> Result<()> {
        if self.find(&parent).is_none() {
            return Err(LibError::not_found(
                "Parent department not found",
                anyhow!("unknown parent department {}", parent),
            ));
        }
        self.last_error = None;
        self.session = EditSession::Open(OpenSession {
            mode: SessionMode::CreateChild {
                parent_id: parent.clone(),
            },
            form: DepartmentForm {
                name: String::new(),
                parent_id: parent.0,
            },
        });
        Ok(())
    }

    /// Opens an edit session populated from the target's current record.
    pub fn open_edit(&mut self, target: DepartmentId) -> Result<()> {
        let Some(record) = self.find(&target) else {
            return Err(LibError::not_found(
                "Department not found",
                anyhow!("unknown department {}", target),
            ));
        };
        let form = DepartmentForm {
            name: record.name.clone(),
            parent_id: record
                .parent_id
                .as_ref()
                .map(|parent| parent.0.clone())
                .unwrap_or_default(),
        };
        self.last_error = None;
        self.session = EditSession::Open(OpenSession {
            mode: SessionMode::Edit { target_id: target },
            form,
        });
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let form = self.open_form_mut()?;
        form.name = name.into();
        Ok(())
    }

    /// Accepts the raw select value; the empty string clears the parent.
    pub fn set_parent(&mut self, parent: impl Into<String>) -> Result<()> {
        let form = self.open_form_mut()?;
        form.parent_id = parent.into();
        Ok(())
    }

    /// Eligible parent options for the open session, in list order. Editing
    /// a node excludes only the node itself; its descendants stay eligible,
    /// matching the shipped selector.
    pub fn parent_choices(&self) -> Vec<&DepartmentRecord> {
        let excluded = match &self.session {
            EditSession::Open(OpenSession {
                mode: SessionMode::Edit { target_id },
                ..
            }) => Some(target_id),
            _ => None,
        };
        self.records
            .iter()
            .filter(|record| Some(&record.id) != excluded)
            .collect()
    }

    /// Emits the create/update intent for the open session and marks it in
    /// flight. The session stays open until the collaborator resolves it.
    pub fn submit(&mut self) -> Result<DepartmentIntent> {
        let EditSession::Open(open) = &self.session else {
            return Err(LibError::invalid(
                "No department form is open",
                anyhow!("submit without an open edit session"),
            ));
        };
        if self.in_flight {
            return Err(LibError::invalid_with_code(
                "intent_in_flight",
                "A change is already being saved",
                anyhow!("duplicate submit while an intent is outstanding"),
            ));
        }

        let parent_id = selected_parent(&open.form.parent_id);
        let intent = match &open.mode {
            SessionMode::CreateRoot | SessionMode::CreateChild { .. } => {
                DepartmentIntent::Create {
                    name: open.form.name.clone(),
                    parent_id,
                }
            }
            SessionMode::Edit { target_id } => {
                if parent_id.as_ref() == Some(target_id) {
                    return Err(LibError::invalid_with_code(
                        "self_parent",
                        "A department cannot be its own parent",
                        anyhow!("department {} selected itself as parent", target_id),
                    ));
                }
                DepartmentIntent::Update {
                    id: target_id.clone(),
                    name: open.form.name.clone(),
                    parent_id,
                }
            }
        };

        self.in_flight = true;
        Ok(intent)
    }

    /// Arms the delete confirmation for one node. Replaces any armed target.
    pub fn request_delete(&mut self, id: DepartmentId) -> Result<()> {
        if self.find(&id).is_none() {
            return Err(LibError::not_found(
                "Department not found",
                anyhow!("delete requested for unknown department {}", id),
            ));
        }
        self.pending_delete = Some(id);
        Ok(())
    }

    /// Declines the confirmation. Emits nothing and leaves every other piece
    /// of state untouched.
    pub fn decline_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Emits the delete intent for the armed target. Children are not
    /// removed first; cascade-vs-reject is the collaborator's call.
    pub fn confirm_delete(&mut self) -> Result<DepartmentIntent> {
        if self.in_flight {
            return Err(LibError::invalid_with_code(
                "intent_in_flight",
                "A change is already being saved",
                anyhow!("delete confirmed while an intent is outstanding"),
            ));
        }
        let Some(id) = self.pending_delete.take() else {
            return Err(LibError::invalid(
                "No delete is awaiting confirmation",
                anyhow!("confirm_delete without an armed target"),
            ));
        };

        self.in_flight = true;
        Ok(DepartmentIntent::Delete { id })
    }

    /// Collaborator reported success: the session closes and local messages
    /// clear. The caller refreshes the flat list separately.
    pub fn resolve_success(&mut self) {
        self.session = EditSession::Closed;
        self.pending_delete = None;
        self.in_flight = false;
        self.last_error = None;
    }

    /// Collaborator reported failure: the message is kept verbatim for the
    /// presentation layer and the session stays open for retry.
    pub fn resolve_failure(&mut self, message: impl Into<String>) {
        self.in_flight = false;
        self.last_error = Some(message.into());
    }

    /// Closes the surface, discarding form state. An already-emitted intent
    /// is not cancelled; only local state is dropped.
    pub fn close(&mut self) {
        self.session = EditSession::Closed;
        self.pending_delete = None;
        self.last_error = None;
    }

    fn find(&self, id: &DepartmentId) -> Option<&DepartmentRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    fn open_form_mut(&mut self) -> Result<&mut DepartmentForm> {
        match &mut self.session {
            EditSession::Open(open) => Ok(&mut open.form),
            EditSession::Closed => Err(LibError::invalid(
                "No department form is open",
                anyhow!("form edit without an open edit session"),
            )),
        }
    }
}

/// Maps the select value to the wire shape: blank (or whitespace-only)
/// means no parent, never the literal empty string.
fn selected_parent(raw: &str) -> Option<DepartmentId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(DepartmentId::from(trimmed))
    }
}
