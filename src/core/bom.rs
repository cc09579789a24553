//! BOM data model
//!
//! A [`BomNode`] is one structural occurrence of a part. The same revision
//! can appear at several positions in an assembly; each position is its own
//! node with its own `id`, sharing the `revision_ref`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::{AttributeConfig, PLACEHOLDER};

pub const ITEM_ID_KEY: &str = "item_id";
pub const REVISION_ID_KEY: &str = "item_revision_id";
pub const NAME_KEY: &str = "object_name";

/// Properties that name a part on disk, fetched whatever the display list says
pub const IDENTITY_KEYS: [&str; 3] = [ITEM_ID_KEY, REVISION_ID_KEY, NAME_KEY];

/// A named server-side rule selecting which revision of each part is visible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRule {
    pub uid: String,
    pub name: String,
}

impl RevisionRule {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }
}

/// Item id, revision id and name of the revision at an occurrence
///
/// Held apart from the display attributes so folder and note names do not
/// depend on which attributes the user chose to show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PartIdentity {
    pub fn new(
        item_id: impl Into<String>,
        revision_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            item_id: Some(item_id.into()),
            revision_id: Some(revision_id.into()),
            name: Some(name.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item_id.is_none() && self.revision_id.is_none() && self.name.is_none()
    }
}

/// One occurrence in a reconstructed BOM tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomNode {
    /// Structural occurrence reference (BOM line uid)
    pub id: String,
    /// Revision occupying this occurrence
    pub revision_ref: String,
    #[serde(default, skip_serializing_if = "PartIdentity::is_empty")]
    pub identity: PartIdentity,
    /// Display attributes, one entry per configured key
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BomNode>,
}

impl BomNode {
    pub fn new(id: impl Into<String>, revision_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            revision_ref: revision_ref.into(),
            identity: PartIdentity::default(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_identity(mut self, identity: PartIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_child(mut self, child: BomNode) -> Self {
        self.children.push(child);
        self
    }

    /// Attribute value, or the placeholder when the key is absent
    pub fn attr(&self, key: &str) -> &str {
        self.attributes
            .get(key)
            .map(|s| s.as_str())
            .unwrap_or(PLACEHOLDER)
    }

    /// Identity value first, then the display attribute of the same key
    fn identity_or_attr<'a>(&'a self, value: &'a Option<String>, key: &str) -> &'a str {
        value.as_deref().unwrap_or_else(|| self.attr(key))
    }

    pub fn item_id(&self) -> &str {
        self.identity_or_attr(&self.identity.item_id, ITEM_ID_KEY)
    }

    pub fn revision_id(&self) -> &str {
        self.identity_or_attr(&self.identity.revision_id, REVISION_ID_KEY)
    }

    pub fn name(&self) -> &str {
        self.identity_or_attr(&self.identity.name, NAME_KEY)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total number of nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(BomNode::node_count).sum::<usize>()
    }

    /// Number of levels in this subtree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(BomNode::depth).max().unwrap_or(0)
    }

    /// Pre-order traversal yielding `(depth, node)` pairs, root at depth 0
    pub fn walk(&self) -> Vec<(usize, &BomNode)> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut stack = vec![(0usize, self)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }

    /// True when every configured key is present (real value or placeholder)
    pub fn has_all_attributes(&self, attrs: &AttributeConfig) -> bool {
        attrs.keys().all(|k| self.attributes.contains_key(k))
            && self.children.iter().all(|c| c.has_all_attributes(attrs))
    }
}
