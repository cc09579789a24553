//! Tree reconstruction from a flat expansion response
//!
//! The server answers a full-depth expansion with a flat list of records,
//! each naming its own occurrence, its children and the revision occupying
//! it, plus a side-table of revision properties. This module turns that
//! into a rooted [`BomNode`] tree.
//!
//! Rules:
//! - a child reference missing from the flat list is skipped (no placeholder node)
//! - a record whose revision has no side-table entry gets placeholders
//! - a reference already on the current root-to-node path is a cycle and is skipped
//! - the same occurrence reference under two different parents is built twice

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::core::bom::{BomNode, PartIdentity, ITEM_ID_KEY, NAME_KEY, REVISION_ID_KEY};
use crate::core::config::{AttributeConfig, PLACEHOLDER};
use crate::error::{TcError, TcResult};

/// One flat record of an expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRecord {
    pub self_ref: String,
    pub parent_ref: Option<String>,
    pub child_refs: Vec<String>,
    pub revision_ref: String,
}

impl FlatRecord {
    pub fn new(self_ref: impl Into<String>, revision_ref: impl Into<String>) -> Self {
        Self {
            self_ref: self_ref.into(),
            parent_ref: None,
            child_refs: Vec::new(),
            revision_ref: revision_ref.into(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_ref = Some(parent.into());
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.child_refs = children.into_iter().map(Into::into).collect();
        self
    }
}

/// Revision uid → property name → display value
pub type PropertyTable = HashMap<String, HashMap<String, String>>;

/// Normalised expansion response
#[derive(Debug, Clone, Default)]
pub struct RawExpansion {
    pub records: Vec<FlatRecord>,
    pub properties: PropertyTable,
}

impl RawExpansion {
    /// Number of records reachable from `root_ref` by following child refs,
    /// counting each structural position once
    pub fn reachable_count(&self, root_ref: &str) -> usize {
        let index = index_records(&self.records);
        let Some(root) = index.get(root_ref).copied() else {
            return 0;
        };
        let mut path = HashSet::new();
        count_positions(root, &index, &mut path)
    }
}

fn count_positions<'a>(
    record: &'a FlatRecord,
    index: &HashMap<&'a str, &'a FlatRecord>,
    path: &mut HashSet<&'a str>,
) -> usize {
    path.insert(record.self_ref.as_str());
    let mut total = 1;
    for child in &record.child_refs {
        if path.contains(child.as_str()) {
            continue;
        }
        if let Some(rec) = index.get(child.as_str()).copied() {
            total += count_positions(rec, index, path);
        }
    }
    path.remove(record.self_ref.as_str());
    total
}

fn index_records(records: &[FlatRecord]) -> HashMap<&str, &FlatRecord> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        index.entry(record.self_ref.as_str()).or_insert(record);
    }
    index
}

/// Build the attribute map for one revision
///
/// Every configured key is present in the result; unresolved or empty values
/// become [`PLACEHOLDER`].
pub fn materialize_attributes(
    props: Option<&HashMap<String, String>>,
    attrs: &AttributeConfig,
) -> BTreeMap<String, String> {
    attrs
        .keys()
        .map(|key| {
            let value = props
                .and_then(|p| p.get(key))
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| PLACEHOLDER.to_string());
            (key.to_string(), value)
        })
        .collect()
}

/// Identity of one revision from its raw properties; blank values count as absent
fn part_identity(props: Option<&HashMap<String, String>>) -> PartIdentity {
    let get = |key: &str| {
        props
            .and_then(|p| p.get(key))
            .filter(|v| !v.trim().is_empty())
            .cloned()
    };
    PartIdentity {
        item_id: get(ITEM_ID_KEY),
        revision_id: get(REVISION_ID_KEY),
        name: get(NAME_KEY),
    }
}

struct TreeBuilder<'a> {
    index: HashMap<&'a str, &'a FlatRecord>,
    properties: &'a PropertyTable,
    attrs: &'a AttributeConfig,
    path: HashSet<&'a str>,
}

impl<'a> TreeBuilder<'a> {
    fn build(&mut self, record: &'a FlatRecord) -> BomNode {
        self.path.insert(record.self_ref.as_str());

        let props = self.properties.get(&record.revision_ref);
        if props.is_none() {
            debug!(revision = %record.revision_ref, "No properties for revision, using placeholders");
        }

        let mut children = Vec::with_capacity(record.child_refs.len());
        for child_ref in &record.child_refs {
            if self.path.contains(child_ref.as_str()) {
                warn!(
                    parent = %record.self_ref,
                    child = %child_ref,
                    "Cyclic reference in expansion, skipping"
                );
                continue;
            }
            let found = self.index.get(child_ref.as_str()).copied();
            match found {
                Some(child) => children.push(self.build(child)),
                None => warn!(
                    parent = %record.self_ref,
                    child = %child_ref,
                    "Child not present in expansion, skipping"
                ),
            }
        }

        self.path.remove(record.self_ref.as_str());

        BomNode {
            id: record.self_ref.clone(),
            revision_ref: record.revision_ref.clone(),
            identity: part_identity(props),
            attributes: materialize_attributes(props, self.attrs),
            children,
        }
    }
}

/// Reconstruct the tree rooted at `root_ref`
///
/// Fails with [`TcError::NotFound`] when the root itself is not among the
/// records.
pub fn reconstruct_tree(
    expansion: &RawExpansion,
    root_ref: &str,
    attrs: &AttributeConfig,
) -> TcResult<BomNode> {
    let index = index_records(&expansion.records);
    let root = *index.get(root_ref).ok_or_else(|| {
        TcError::NotFound(format!("root line {} not present in expansion", root_ref))
    })?;

    let mut builder = TreeBuilder {
        index,
        properties: &expansion.properties,
        attrs,
        path: HashSet::new(),
    };
    let tree = builder.build(root);
    debug!(
        nodes = tree.node_count(),
        records = expansion.records.len(),
        "Reconstructed BOM tree"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AttributeDef;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn three_node_expansion() -> RawExpansion {
        let mut properties = PropertyTable::new();
        properties.insert(
            "R1".to_string(),
            props(&[("item_id", "1001"), ("item_revision_id", "A"), ("object_name", "Frame")]),
        );
        properties.insert(
            "R2".to_string(),
            props(&[("item_id", "1002"), ("item_revision_id", "B"), ("object_name", "Bolt")]),
        );
        RawExpansion {
            records: vec![
                FlatRecord::new("L1", "R1").with_children(["L2", "L3"]),
                FlatRecord::new("L2", "R2").with_parent("L1"),
            ],
            properties,
        }
    }

    #[test]
    fn test_missing_child_is_skipped() {
        let exp = three_node_expansion();
        let tree = reconstruct_tree(&exp, "L1", &AttributeConfig::default()).unwrap();
        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].id, "L2");
        assert_eq!(tree.children[0].item_id(), "1002");
    }

    #[test]
    fn test_identity_kept_when_not_displayed() {
        let mut exp = three_node_expansion();
        exp.records[0].child_refs = vec!["L2".to_string(), "L3".to_string()];
        exp.records.push(FlatRecord::new("L3", "R3").with_parent("L1"));
        exp.properties.insert(
            "R3".to_string(),
            props(&[("item_id", "1003"), ("item_revision_id", "A"), ("object_name", "Nut")]),
        );
        let attrs = AttributeConfig::new(vec![AttributeDef::new("object_desc", "Description")]);

        let tree = reconstruct_tree(&exp, "L1", &attrs).unwrap();
        assert_eq!(tree.attributes.len(), 1);
        assert_eq!(tree.identity, PartIdentity::new("1001", "A", "Frame"));
        let names: Vec<_> = tree.children.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Bolt", "Nut"]);
        assert_eq!(tree.children[1].item_id(), "1003");
    }

    #[test]
    fn test_every_configured_key_present() {
        let exp = three_node_expansion();
        let attrs = AttributeConfig::default();
        let tree = reconstruct_tree(&exp, "L1", &attrs).unwrap();
        assert!(tree.has_all_attributes(&attrs));
        assert_eq!(tree.attributes.len(), attrs.len());
        assert_eq!(tree.attributes["object_desc"], PLACEHOLDER);
    }

    #[test]
    fn test_missing_side_table_entry_uses_placeholders() {
        let exp = RawExpansion {
            records: vec![FlatRecord::new("L1", "R-unknown")],
            properties: PropertyTable::new(),
        };
        let attrs = AttributeConfig::default();
        let tree = reconstruct_tree(&exp, "L1", &attrs).unwrap();
        assert!(tree.is_leaf());
        assert!(tree.attributes.values().all(|v| v == PLACEHOLDER));
        assert_eq!(tree.attributes.len(), attrs.len());
    }

    #[test]
    fn test_empty_value_becomes_placeholder() {
        let mut properties = PropertyTable::new();
        properties.insert("R1".to_string(), props(&[("item_id", "  ")]));
        let exp = RawExpansion {
            records: vec![FlatRecord::new("L1", "R1")],
            properties,
        };
        let tree = reconstruct_tree(&exp, "L1", &AttributeConfig::default()).unwrap();
        assert_eq!(tree.item_id(), PLACEHOLDER);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let exp = three_node_expansion();
        let err = reconstruct_tree(&exp, "nope", &AttributeConfig::default()).unwrap_err();
        assert!(matches!(err, TcError::NotFound(_)));
    }

    #[test]
    fn test_self_reference_does_not_recurse() {
        let exp = RawExpansion {
            records: vec![
                FlatRecord::new("L1", "R1").with_children(["L1", "L2"]),
                FlatRecord::new("L2", "R2").with_children(["L1"]),
            ],
            properties: PropertyTable::new(),
        };
        let tree = reconstruct_tree(&exp, "L1", &AttributeConfig::default()).unwrap();
        assert_eq!(tree.node_count(), 2);
        assert!(tree.children[0].is_leaf());
    }

    #[test]
    fn test_shared_occurrence_built_per_position() {
        // L4 is listed under both L2 and L3
        let exp = RawExpansion {
            records: vec![
                FlatRecord::new("L1", "R1").with_children(["L2", "L3"]),
                FlatRecord::new("L2", "R2").with_children(["L4"]),
                FlatRecord::new("L3", "R3").with_children(["L4"]),
                FlatRecord::new("L4", "R4"),
            ],
            properties: PropertyTable::new(),
        };
        let tree = reconstruct_tree(&exp, "L1", &AttributeConfig::default()).unwrap();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.children[0].children[0].revision_ref, "R4");
        assert_eq!(tree.children[1].children[0].revision_ref, "R4");
        assert_eq!(exp.reachable_count("L1"), 5);
    }

    #[test]
    fn test_same_revision_at_two_occurrences() {
        let exp = RawExpansion {
            records: vec![
                FlatRecord::new("L1", "R1").with_children(["L2", "L3"]),
                FlatRecord::new("L2", "R9"),
                FlatRecord::new("L3", "R9"),
            ],
            properties: PropertyTable::new(),
        };
        let tree = reconstruct_tree(&exp, "L1", &AttributeConfig::default()).unwrap();
        assert_eq!(tree.children.len(), 2);
        assert_ne!(tree.children[0].id, tree.children[1].id);
        assert_eq!(tree.children[0].revision_ref, tree.children[1].revision_ref);
    }

    #[test]
    fn test_orphans_excluded_and_count_matches_reachable() {
        let mut exp = three_node_expansion();
        exp.records.push(FlatRecord::new("ORPHAN", "R7"));
        let tree = reconstruct_tree(&exp, "L1", &AttributeConfig::default()).unwrap();
        assert_eq!(tree.node_count(), exp.reachable_count("L1"));
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn test_duplicate_record_first_wins() {
        let exp = RawExpansion {
            records: vec![
                FlatRecord::new("L1", "R1").with_children(["L2"]),
                FlatRecord::new("L2", "R2"),
                FlatRecord::new("L2", "R-dup").with_children(["L1"]),
            ],
            properties: PropertyTable::new(),
        };
        let tree = reconstruct_tree(&exp, "L1", &AttributeConfig::default()).unwrap();
        assert_eq!(tree.children[0].revision_ref, "R2");
        assert_eq!(tree.node_count(), 2);
    }
}
