//! Search and sync as one interactive workflow
//!
//! A [`Workflow`] owns one client and the tree from its last search. Sync
//! only ever works on that tree; without a successful search there is
//! nothing to sync.

use tracing::info;

use crate::core::bom::{BomNode, RevisionRule};
use crate::core::config::{AttributeConfig, SyncConfig};
use crate::core::reconstruct::reconstruct_tree;
use crate::error::{TcError, TcResult};
use crate::remote::client::TcClient;
use crate::remote::transport::{ReqwestTransport, Transport};
use crate::sync::reconcile::{reconcile, SyncReport};
use crate::sync::store::DocumentStore;

pub struct Workflow<T: Transport = ReqwestTransport> {
    client: TcClient<T>,
    attributes: AttributeConfig,
    revision_rule: Option<RevisionRule>,
    tree: Option<BomNode>,
}

impl<T: Transport> Workflow<T> {
    pub fn new(client: TcClient<T>, attributes: AttributeConfig) -> Self {
        Self {
            client,
            attributes,
            revision_rule: None,
            tree: None,
        }
    }

    /// Configure structure windows with `rule` instead of the server default
    pub fn with_revision_rule(mut self, rule: Option<RevisionRule>) -> Self {
        self.revision_rule = rule;
        self
    }

    pub fn revision_rule(&self) -> Option<&RevisionRule> {
        self.revision_rule.as_ref()
    }

    /// Configure structure windows with the server's rule `uid`
    ///
    /// Logs in first when no session is held. A uid the server does not
    /// list is [`TcError::NotFound`] and leaves the current rule in place.
    pub async fn select_revision_rule(&mut self, uid: &str) -> TcResult<&RevisionRule> {
        if !self.client.is_authenticated() {
            self.client.login().await?;
        }

        let rule = self
            .client
            .list_revision_rules()
            .await?
            .into_iter()
            .find(|r| r.uid == uid)
            .ok_or_else(|| TcError::NotFound(format!("revision rule {} not found on server", uid)))?;

        info!(uid, name = %rule.name, "Selected revision rule");
        Ok(&*self.revision_rule.insert(rule))
    }

    pub fn client(&self) -> &TcClient<T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut TcClient<T> {
        &mut self.client
    }

    pub fn attributes(&self) -> &AttributeConfig {
        &self.attributes
    }

    /// Tree from the last successful search
    pub fn tree(&self) -> Option<&BomNode> {
        self.tree.as_ref()
    }

    /// Use a tree obtained elsewhere, e.g. loaded from a saved search
    pub fn set_tree(&mut self, tree: Option<BomNode>) {
        self.tree = tree;
    }

    /// Fetch and rebuild the structure of one item revision
    ///
    /// Logs in first when no session is held. The previous tree is dropped
    /// before any request goes out, so a failed search leaves none behind.
    pub async fn search(&mut self, item_id: &str, revision: &str) -> TcResult<&BomNode> {
        self.tree = None;

        if !self.client.is_authenticated() {
            self.client.login().await?;
        }

        let identity = self.client.resolve_item(item_id, revision).await?;
        let root = self
            .client
            .open_structure(&identity, self.revision_rule.as_ref())
            .await?;
        let expansion = self.client.expand_all(&root, &self.attributes).await?;
        let tree = reconstruct_tree(&expansion, &root.root_line_uid, &self.attributes)?;

        info!(
            item = item_id,
            revision,
            nodes = tree.node_count(),
            depth = tree.depth(),
            "Search complete"
        );
        Ok(&*self.tree.insert(tree))
    }

    /// Write the held tree into `store`
    pub fn sync<S: DocumentStore>(&self, store: &mut S, sync: &SyncConfig) -> TcResult<SyncReport> {
        reconcile(
            store,
            self.tree.as_ref(),
            &self.attributes,
            self.client.server(),
            sync,
        )
    }

    /// Release server resources held by the client
    pub async fn close(&mut self) {
        self.client.close_windows().await;
    }
}
