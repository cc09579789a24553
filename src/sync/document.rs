//! Machine-owned region of a note
//!
//! Each note has one region bounded by [`START_MARKER`] and [`END_MARKER`]
//! that the sync rewrites on every run. Everything outside the markers
//! belongs to the user and is carried over byte for byte.

use crate::core::bom::BomNode;
use crate::core::config::AttributeConfig;

pub const START_MARKER: &str = "<!-- START ATTRIBUTES -->";
pub const END_MARKER: &str = "<!-- END ATTRIBUTES -->";

/// Label of the deep link under the attribute table
pub const LINK_LABEL: &str = "Open in Teamcenter";

/// Make a value safe for a Markdown table cell
///
/// Comment openers are entity-escaped so no value can spell a marker.
fn escape_cell(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
        .replace("<!--", "&lt;!--")
}

/// Render the machine region for a node, markers included
///
/// Rows follow the order of `attrs`. The returned text has no trailing
/// newline; it starts with [`START_MARKER`] and ends with [`END_MARKER`].
pub fn render_machine_region(node: &BomNode, attrs: &AttributeConfig, link: &str) -> String {
    let mut out = String::new();
    out.push_str(START_MARKER);
    out.push('\n');
    out.push_str("| Attribute | Value |\n");
    out.push_str("|---|---|\n");
    for def in attrs.iter() {
        out.push_str(&format!(
            "| {} | {} |\n",
            escape_cell(&def.label),
            escape_cell(node.attr(&def.key))
        ));
    }
    out.push('\n');
    out.push_str(&format!("[{}]({})\n", LINK_LABEL, link));
    out.push_str(END_MARKER);
    out
}

/// Byte range of the first complete region: start of [`START_MARKER`] to
/// the end of the first [`END_MARKER`] after it
fn region_span(content: &str) -> Option<(usize, usize)> {
    let start = content.find(START_MARKER)?;
    let after_start = start + START_MARKER.len();
    let end = content[after_start..].find(END_MARKER)? + after_start;
    Some((start, end + END_MARKER.len()))
}

/// Current machine region of a note, markers included
pub fn extract_machine_region(content: &str) -> Option<&str> {
    region_span(content).map(|(s, e)| &content[s..e])
}

/// Text outside the machine region as `(before, after)`
pub fn human_region(content: &str) -> (&str, &str) {
    match region_span(content) {
        Some((s, e)) => (&content[..s], &content[e..]),
        None => ("", content),
    }
}

/// Put `region` into existing note text
///
/// With both markers present only the text between them changes. Without
/// them the region is put in front and the old text follows untouched.
pub fn merge_machine_region(existing: &str, region: &str) -> String {
    match region_span(existing) {
        Some((start, end)) => {
            let mut out = String::with_capacity(existing.len() + region.len());
            out.push_str(&existing[..start]);
            out.push_str(region);
            out.push_str(&existing[end..]);
            out
        }
        None => format!("{}\n\n{}", region, existing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AttributeDef;

    fn node() -> BomNode {
        BomNode::new("L1", "R1")
            .with_attribute("item_id", "1001")
            .with_attribute("object_name", "Frame | Welded")
    }

    fn attrs() -> AttributeConfig {
        AttributeConfig::new(vec![
            AttributeDef::new("item_id", "Item ID"),
            AttributeDef::new("object_name", "Name"),
            AttributeDef::new("owning_user", "Owner"),
        ])
    }

    #[test]
    fn test_render_region() {
        let region = render_machine_region(&node(), &attrs(), "http://awc/#/x?uid=R1");
        insta::assert_snapshot!(region, @r"
        <!-- START ATTRIBUTES -->
        | Attribute | Value |
        |---|---|
        | Item ID | 1001 |
        | Name | Frame \| Welded |
        | Owner | N/A |

        [Open in Teamcenter](http://awc/#/x?uid=R1)
        <!-- END ATTRIBUTES -->
        ");
    }

    #[test]
    fn test_merge_replaces_only_region() {
        let old = render_machine_region(&node(), &attrs(), "old-link");
        let doc = format!("---\ntags: [bom]\n---\n{}\n\n# Notes\nkeep me\n", old);

        let changed = node().with_attribute("item_id", "2002");
        let new_region = render_machine_region(&changed, &attrs(), "new-link");
        let merged = merge_machine_region(&doc, &new_region);

        assert_eq!(human_region(&merged), human_region(&doc));
        assert_eq!(extract_machine_region(&merged), Some(new_region.as_str()));
        assert!(merged.ends_with("# Notes\nkeep me\n"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let region = render_machine_region(&node(), &attrs(), "link");
        let doc = format!("{}\n\n# Notes\n", region);
        let once = merge_machine_region(&doc, &region);
        let twice = merge_machine_region(&once, &region);
        assert_eq!(once, doc);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_merge_without_markers_prepends() {
        let region = render_machine_region(&node(), &attrs(), "link");
        let original = "My own notes\n\nwith | pipes <!-- and comments -->\n";
        let merged = merge_machine_region(original, &region);
        assert!(merged.starts_with(START_MARKER));
        let (_, after) = human_region(&merged);
        assert_eq!(after, format!("\n\n{}", original));

        // the next run finds the markers and stops prepending
        assert_eq!(merge_machine_region(&merged, &region), merged);
    }

    #[test]
    fn test_end_marker_before_start_counts_as_missing() {
        let region = render_machine_region(&node(), &attrs(), "link");
        let original = format!("{}\nstuff\n{}\n", END_MARKER, START_MARKER);
        let merged = merge_machine_region(&original, &region);
        assert!(merged.ends_with(&original));
        assert!(merged.starts_with(&region));
    }

    #[test]
    fn test_escape_cell_newlines() {
        assert_eq!(escape_cell("a\nb\r\nc|d"), "a b c\\|d");
    }

    #[test]
    fn test_marker_text_in_value_cannot_end_region() {
        let tricky = node()
            .with_attribute("object_name", format!("see {} note", END_MARKER))
            .with_attribute("owning_user", START_MARKER);
        let region = render_machine_region(&tricky, &attrs(), "link");
        assert_eq!(region.matches(START_MARKER).count(), 1);
        assert_eq!(region.matches(END_MARKER).count(), 1);
        assert!(region.contains("| Name | see &lt;!-- END ATTRIBUTES --> note |"));
        assert_eq!(extract_machine_region(&region), Some(region.as_str()));
    }
}
