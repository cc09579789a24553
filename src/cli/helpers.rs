//! Shared helper functions for CLI commands

use console::style;
use dialoguer::{theme::ColorfulTheme, Password};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::bom::BomNode;
use crate::core::config::Config;
use crate::error::TcError;
use crate::remote::client::TcClient;
use crate::sync::reconcile::SyncReport;
use crate::workflow::Workflow;

/// Config file with environment and command-line values applied
pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    let mut config = Config::load(global.config.as_deref())?;
    config.apply_overrides(global.overrides());
    Ok(config)
}

/// Make sure a password is available before logging in
///
/// Asks on the terminal when none is configured; without a terminal the
/// missing password is an authentication failure.
pub fn ensure_password(config: &mut Config) -> Result<()> {
    if !config.credentials.password.is_empty() {
        return Ok(());
    }
    if config.credentials.user.is_empty() {
        return Err(TcError::Authentication(
            "no user configured (use --user, TCBOM_USER or the config file)".to_string(),
        )
        .into());
    }
    if !io::stdin().is_terminal() {
        return Err(TcError::Authentication(
            "no password configured and no terminal to ask for one".to_string(),
        )
        .into());
    }

    config.credentials.password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Password for {}", config.credentials.user))
        .interact()
        .into_diagnostic()?;
    Ok(())
}

/// Workflow over the real HTTP transport, ready to search
pub fn connect(config: &mut Config) -> Result<Workflow> {
    ensure_password(config)?;
    let client = TcClient::connect(config.server.clone(), config.credentials.clone())?;
    Ok(Workflow::new(client, config.attributes.clone())
        .with_revision_rule(config.revision_rule.clone()))
}

/// Write a tree for a later `sync --from`; `.yaml`/`.yml` selects YAML
pub fn save_tree(tree: &BomNode, path: &Path) -> Result<()> {
    let content = if is_yaml(path) {
        serde_yml::to_string(tree).into_diagnostic()?
    } else {
        serde_json::to_string_pretty(tree).into_diagnostic()?
    };
    fs::write(path, content).into_diagnostic()
}

/// Read a tree written by [`save_tree`]
pub fn load_tree(path: &Path) -> Result<BomNode> {
    let content = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read {}", path.display()))?;
    let tree: Result<BomNode> = if is_yaml(path) {
        serde_yml::from_str(&content).into_diagnostic()
    } else {
        serde_json::from_str(&content).into_diagnostic()
    };
    tree.wrap_err_with(|| format!("{} is not a saved BOM", path.display()))
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

pub fn print_sync_report(report: &SyncReport, vault: &Path, root_folder: &str) {
    println!(
        "{} Synced {} node(s) into {}",
        style("✓").green(),
        style(report.nodes_visited).cyan(),
        style(vault.join(root_folder).display()).yellow()
    );
    println!(
        "   {} created, {} updated, {} unchanged, {} new folder(s)",
        style(report.documents_created).green(),
        style(report.documents_updated).yellow(),
        style(report.documents_unchanged).dim(),
        report.folders_created
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_user_is_auth_error() {
        let mut config = Config::default();
        let err = ensure_password(&mut config).unwrap_err();
        assert!(err.to_string().contains("no user configured"));
    }

    #[test]
    fn test_tree_file_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = BomNode::new("L1", "R1")
            .with_attribute("item_id", "1001")
            .with_child(BomNode::new("L2", "R2"));
        for name in ["bom.json", "bom.yaml"] {
            let path = tmp.path().join(name);
            save_tree(&tree, &path).unwrap();
            assert_eq!(load_tree(&path).unwrap(), tree);
        }
    }

    #[test]
    fn test_load_tree_rejects_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bom.json");
        fs::write(&path, "not json").unwrap();
        let err = load_tree(&path).unwrap_err();
        assert!(err.to_string().contains("is not a saved BOM"));
    }

    #[test]
    fn test_configured_password_is_kept() {
        let mut config = Config::default();
        config.credentials.password = "secret".to_string();
        ensure_password(&mut config).unwrap();
        assert_eq!(config.credentials.password, "secret");
    }
}
