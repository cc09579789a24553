//! Core module - configuration, BOM model and tree reconstruction

pub mod bom;
pub mod config;
pub mod reconstruct;

pub use bom::{BomNode, PartIdentity, RevisionRule};
pub use config::{AttributeConfig, AttributeDef, Config, Credentials, ServerConfig, SyncConfig};
pub use reconstruct::{reconstruct_tree, FlatRecord, RawExpansion};
