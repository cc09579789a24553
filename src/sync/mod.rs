//! Reconcile BOM trees into a folder of Markdown notes

pub mod document;
pub mod naming;
pub mod reconcile;
pub mod store;
pub mod template;

pub use document::{merge_machine_region, render_machine_region, END_MARKER, START_MARKER};
pub use naming::{document_name, folder_name, sanitize_file_name};
pub use reconcile::{reconcile, Reconciler, SyncReport};
pub use store::{DocumentStore, FsStore};
pub use template::NoteTemplate;
