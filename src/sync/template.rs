//! Note template for newly created documents

use std::path::Path;

use rust_embed::Embed;
use tera::Tera;

use crate::core::bom::BomNode;
use crate::error::{TcError, TcResult};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// Name under which the note template is registered
pub const NOTE_TEMPLATE: &str = "note.md.tera";

/// Variable the template must use to place the machine region
pub const REGION_VAR: &str = "machine_region";

/// Renders the initial content of a new note
#[derive(Debug)]
pub struct NoteTemplate {
    tera: Tera,
}

impl NoteTemplate {
    /// The built-in template
    pub fn embedded() -> TcResult<Self> {
        let mut tera = Tera::default();
        if let Some(file) = EmbeddedTemplates::get(NOTE_TEMPLATE) {
            let source = std::str::from_utf8(&file.data)
                .map_err(|e| TcError::Template(format!("{}: {}", NOTE_TEMPLATE, e)))?;
            tera.add_raw_template(NOTE_TEMPLATE, source)
                .map_err(|e| TcError::Template(e.to_string()))?;
        }
        Ok(Self { tera })
    }

    /// A user template read from disk
    ///
    /// The template has to reference `machine_region`, otherwise later syncs
    /// would have nothing to update.
    pub fn from_file(path: &Path) -> TcResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            TcError::Template(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_source(&source)
            .map_err(|e| TcError::Template(format!("{}: {}", path.display(), inner(e))))
    }

    fn from_source(source: &str) -> TcResult<Self> {
        if !source.contains(REGION_VAR) {
            return Err(TcError::Template(format!(
                "template does not use `{}`",
                REGION_VAR
            )));
        }
        let mut tera = Tera::default();
        tera.add_raw_template(NOTE_TEMPLATE, source)
            .map_err(|e| TcError::Template(e.to_string()))?;
        Ok(Self { tera })
    }

    /// User template when one is configured, built-in otherwise
    pub fn load(custom: Option<&Path>) -> TcResult<Self> {
        match custom {
            Some(path) => Self::from_file(path),
            None => Self::embedded(),
        }
    }

    /// Content of a new note for `node`
    pub fn render(&self, region: &str, node: &BomNode) -> TcResult<String> {
        if !self.tera.get_template_names().any(|n| n == NOTE_TEMPLATE) {
            return Ok(fallback_note(region));
        }

        let mut context = tera::Context::new();
        context.insert(REGION_VAR, region);
        context.insert("attributes", &node.attributes);
        context.insert("item_id", node.item_id());
        context.insert("revision_id", node.revision_id());
        context.insert("name", node.name());

        let rendered = self
            .tera
            .render(NOTE_TEMPLATE, &context)
            .map_err(|e| TcError::Template(render_error(&e)))?;
        if !rendered.contains(region) {
            return Err(TcError::Template(
                "rendered note does not contain the attribute region".to_string(),
            ));
        }
        Ok(rendered)
    }
}

fn fallback_note(region: &str) -> String {
    format!("{}\n\n# Notes\n\n*Add your notes here.*\n", region)
}

fn inner(err: TcError) -> String {
    match err {
        TcError::Template(msg) => msg,
        other => other.to_string(),
    }
}

// Tera hides the useful part of a render failure in the source chain
fn render_error(err: &tera::Error) -> String {
    use std::error::Error;
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
