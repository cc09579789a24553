//! Output formatting for BOM trees and revision rules

use miette::{IntoDiagnostic, Result};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::{ListFormat, OutputFormat};
use crate::core::bom::{BomNode, RevisionRule};
use crate::core::config::AttributeConfig;

/// Render a tree in the requested format
pub fn render_bom(tree: &BomNode, attrs: &AttributeConfig, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Tree => Ok(render_tree(tree)),
        OutputFormat::Table => Ok(render_table(tree, attrs)),
        OutputFormat::Csv => render_csv(tree, attrs),
        OutputFormat::Json => serde_json::to_string_pretty(tree).into_diagnostic(),
        OutputFormat::Yaml => serde_yml::to_string(tree).into_diagnostic(),
    }
}

fn node_label(node: &BomNode) -> String {
    format!("{}/{}  {}", node.item_id(), node.revision_id(), node.name())
}

/// Box-drawing tree, one line per node
pub fn render_tree(tree: &BomNode) -> String {
    let mut out = node_label(tree);
    out.push('\n');
    push_children(&mut out, tree, "");
    out
}

fn push_children(out: &mut String, node: &BomNode, prefix: &str) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&node_label(child));
        out.push('\n');
        push_children(out, child, &format!("{}{}", prefix, indent));
    }
}

/// One row per node, first column indented by depth
pub fn render_table(tree: &BomNode, attrs: &AttributeConfig) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["BOM".to_string()];
    header.extend(attrs.labels().map(str::to_string));
    builder.push_record(header);

    for (depth, node) in tree.walk() {
        let mut row = vec![format!("{}{}", "  ".repeat(depth), node.item_id())];
        row.extend(attrs.keys().map(|k| node.attr(k).to_string()));
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    format!("{}\n", table)
}

/// CSV with a `depth` column followed by the attribute labels
pub fn render_csv(tree: &BomNode, attrs: &AttributeConfig) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["depth".to_string()];
    header.extend(attrs.labels().map(str::to_string));
    wtr.write_record(&header).into_diagnostic()?;

    for (depth, node) in tree.walk() {
        let mut record = vec![depth.to_string()];
        record.extend(attrs.keys().map(|k| node.attr(k).to_string()));
        wtr.write_record(&record).into_diagnostic()?;
    }

    let bytes = wtr.into_inner().into_diagnostic()?;
    String::from_utf8(bytes).into_diagnostic()
}

/// Render revision rules
pub fn render_rules(rules: &[RevisionRule], format: ListFormat) -> Result<String> {
    match format {
        ListFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["NAME".to_string(), "UID".to_string()]);
            for rule in rules {
                builder.push_record([rule.name.clone(), rule.uid.clone()]);
            }
            let mut table = builder.build();
            table.with(Style::rounded());
            Ok(format!("{}\n", table))
        }
        ListFormat::Json => serde_json::to_string_pretty(rules).into_diagnostic(),
        ListFormat::Yaml => serde_yml::to_string(&rules).into_diagnostic(),
    }
}
