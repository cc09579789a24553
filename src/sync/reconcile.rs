//! Reconcile a BOM tree into folders and notes
//!
//! Every node gets a folder and a note inside it; children go into the
//! folder of their parent. Existing notes only have their machine region
//! replaced. The walk is pre-order and strictly sequential, and the first
//! store failure ends the run with [`TcError::PartialSync`].

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::core::bom::BomNode;
use crate::core::config::{AttributeConfig, ServerConfig, SyncConfig};
use crate::error::{TcError, TcResult};
use crate::sync::document::{merge_machine_region, render_machine_region};
use crate::sync::naming::{document_name, folder_name};
use crate::sync::store::DocumentStore;
use crate::sync::template::NoteTemplate;

/// Counts from a finished sync
///
/// `folders_created` counts node folders only, not the root folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub folders_created: usize,
    pub documents_created: usize,
    pub documents_updated: usize,
    pub documents_unchanged: usize,
    pub nodes_visited: usize,
}

impl SyncReport {
    /// Documents written during the run
    pub fn documents_written(&self) -> usize {
        self.documents_created + self.documents_updated
    }
}

pub struct Reconciler<'a, S: DocumentStore> {
    store: &'a mut S,
    attrs: &'a AttributeConfig,
    server: &'a ServerConfig,
    root_folder: PathBuf,
    template: NoteTemplate,
    report: SyncReport,
}

impl<'a, S: DocumentStore> Reconciler<'a, S> {
    /// Prepare a run; loads the note template named in `sync`
    pub fn new(
        store: &'a mut S,
        attrs: &'a AttributeConfig,
        server: &'a ServerConfig,
        sync: &SyncConfig,
    ) -> TcResult<Self> {
        let template = NoteTemplate::load(sync.note_template.as_deref())?;
        Ok(Self {
            store,
            attrs,
            server,
            root_folder: PathBuf::from(&sync.root_folder),
            template,
            report: SyncReport::default(),
        })
    }

    /// Sync `tree` below the root folder
    ///
    /// `None` fails with [`TcError::NoTree`] before anything is written.
    pub fn run(mut self, tree: Option<&BomNode>) -> TcResult<SyncReport> {
        let tree = tree.ok_or(TcError::NoTree)?;
        info!(
            root = %self.root_folder.display(),
            nodes = tree.node_count(),
            "Starting sync"
        );

        let root = self.root_folder.clone();
        self.ensure_folder(&root)?;
        self.visit(tree, &root)?;

        info!(
            created = self.report.documents_created,
            updated = self.report.documents_updated,
            unchanged = self.report.documents_unchanged,
            "Sync finished"
        );
        Ok(self.report)
    }

    fn visit(&mut self, node: &BomNode, parent: &Path) -> TcResult<()> {
        let folder = parent.join(folder_name(node));
        if self.ensure_folder(&folder)? {
            self.report.folders_created += 1;
        }

        let document = folder.join(document_name(node));
        self.upsert_document(node, &document)?;
        self.report.nodes_visited += 1;

        for child in &node.children {
            self.visit(child, &folder)?;
        }
        Ok(())
    }

    /// Returns whether the folder had to be created
    fn ensure_folder(&mut self, folder: &Path) -> TcResult<bool> {
        if folder.as_os_str().is_empty() || self.store.exists(folder) {
            return Ok(false);
        }
        self.store
            .create_folder(folder)
            .map_err(|e| self.partial(folder, e))?;
        debug!(folder = %folder.display(), "Created folder");
        Ok(true)
    }

    fn upsert_document(&mut self, node: &BomNode, path: &Path) -> TcResult<()> {
        let link = self.server.deep_link(&node.revision_ref);
        let region = render_machine_region(node, self.attrs, &link);

        if !self.store.exists(path) {
            let content = self
                .template
                .render(&region, node)
                .map_err(|e| self.partial(path, io::Error::other(e.to_string())))?;
            self.store
                .create(path, &content)
                .map_err(|e| self.partial(path, e))?;
            debug!(document = %path.display(), "Created document");
            self.report.documents_created += 1;
            return Ok(());
        }

        let existing = self.store.read(path).map_err(|e| self.partial(path, e))?;
        let merged = merge_machine_region(&existing, &region);
        if merged == existing {
            self.report.documents_unchanged += 1;
            return Ok(());
        }
        self.store
            .modify(path, &merged)
            .map_err(|e| self.partial(path, e))?;
        debug!(document = %path.display(), "Updated document");
        self.report.documents_updated += 1;
        Ok(())
    }

    fn partial(&self, path: &Path, source: io::Error) -> TcError {
        TcError::PartialSync {
            path: path.to_path_buf(),
            completed: self.report.nodes_visited,
            source,
        }
    }
}

/// Sync `tree` into `store` in one call
pub fn reconcile<S: DocumentStore>(
    store: &mut S,
    tree: Option<&BomNode>,
    attrs: &AttributeConfig,
    server: &ServerConfig,
    sync: &SyncConfig,
) -> TcResult<SyncReport> {
    Reconciler::new(store, attrs, server, sync)?.run(tree)
}
