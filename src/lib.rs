pub mod editor;
pub mod error;
pub mod models;
pub mod service;
pub mod store;
pub mod tree;

pub mod prelude {
    pub use crate::editor::{DepartmentForm, EditSession, OpenSession, SessionMode, TreeEditor};
    pub use crate::error::{ErrorKind, LibError, Result};
    pub use crate::models::{
        DepartmentDraft, DepartmentId, DepartmentIntent, DepartmentNode, DepartmentRecord,
        StructureAnomaly,
    };
    pub use crate::service::{DirectoryEvent, DirectoryService};
    pub use crate::store::{DepartmentStore, MemoryDirectory};
    pub use crate::tree::{build_forest, has_children, structure_anomalies};
}
