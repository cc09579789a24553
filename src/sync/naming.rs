//! Folder and note names derived from BOM attributes

use crate::core::bom::BomNode;

/// Characters that are not allowed in file names on at least one platform
const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Substitute for every illegal character
pub const SUBSTITUTE: char = '_';

/// Replace each illegal or control character with `_`
///
/// The result has the same number of characters as the input.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if ILLEGAL.contains(&c) || c.is_control() {
                SUBSTITUTE
            } else {
                c
            }
        })
        .collect()
}

/// `{item_id}_{object_name}`
pub fn folder_name(node: &BomNode) -> String {
    sanitize_file_name(&format!("{}_{}", node.item_id(), node.name()))
}

/// `{item_id}_{item_revision_id}_{object_name}.md`
pub fn document_name(node: &BomNode) -> String {
    let stem = sanitize_file_name(&format!(
        "{}_{}_{}",
        node.item_id(),
        node.revision_id(),
        node.name()
    ));
    format!("{}.md", stem)
}
