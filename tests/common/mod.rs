//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tcbom::core::config::{Credentials, ServerConfig};
use tcbom::remote::{HttpResponse, TcClient, Transport};
use tcbom::{TcError, TcResult};

/// Helper to get a tcbom command
///
/// Server settings from the calling environment are cleared so tests only
/// see what they pass explicitly.
pub fn tcbom() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("tcbom"));
    for var in [
        "TCBOM_CONFIG",
        "TCBOM_URL",
        "TCBOM_PORT",
        "TCBOM_APP",
        "TCBOM_AWC_URL",
        "TCBOM_USER",
        "TCBOM_PASSWORD",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

pub const AWC_URL: &str = "http://plm.example.com:3000/";

/// Write a config file into `dir` and return its path
pub fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.yaml");
    fs::write(
        &path,
        format!(
            r#"server:
  url: http://127.0.0.1
  port: "9"
  app_name: tc
  awc_url: {}
  timeout_secs: 1
credentials:
  user: engineer
  password: hunter2
"#,
            AWC_URL
        ),
    )
    .unwrap();
    path
}

/// Saved tree: assembly 1001/A with one child part 2002/B
pub fn sample_bom_json() -> String {
    json!({
        "id": "L1",
        "revision_ref": "R1",
        "attributes": {
            "item_id": "1001",
            "item_revision_id": "A",
            "object_name": "Frame Assembly",
            "object_desc": "Welded frame",
            "object_type": "ItemRevision",
            "owning_user": "engineer",
            "last_mod_date": "2024-03-01"
        },
        "children": [
            {
                "id": "L2",
                "revision_ref": "R2",
                "attributes": {
                    "item_id": "2002",
                    "item_revision_id": "B",
                    "object_name": "Bracket 3/4\"",
                    "object_desc": "N/A",
                    "object_type": "ItemRevision",
                    "owning_user": "engineer",
                    "last_mod_date": "2024-02-11"
                }
            }
        ]
    })
    .to_string()
}

// ============================================================================
// Scripted transport
// ============================================================================

/// One request seen by [`ScriptedTransport`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl RecordedRequest {
    pub fn service(&self) -> &str {
        self.url
            .split("/JsonRestServices/")
            .nth(1)
            .unwrap_or(&self.url)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Transport that replays canned responses in order and records requests
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<TcResult<HttpResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a transport failure
    pub fn push_failure(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TcError::Transport(message.to_string())));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn services(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.service().to_string())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> TcResult<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.to_vec(),
            body: serde_json::from_str(&body).unwrap_or(Value::Null),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TcError::Transport("no scripted response left".to_string())))
    }
}

pub fn server() -> ServerConfig {
    ServerConfig {
        url: "http://plm.example.com".to_string(),
        awc_url: AWC_URL.to_string(),
        ..ServerConfig::default()
    }
}

pub fn client(responses: Vec<HttpResponse>) -> TcClient<ScriptedTransport> {
    TcClient::with_transport(
        ScriptedTransport::new(responses),
        server(),
        Credentials::new("engineer", "hunter2"),
    )
}

// ============================================================================
// Canned server responses
// ============================================================================

pub fn ok(body: Value) -> HttpResponse {
    HttpResponse::new(200, body.to_string())
}

pub fn login_ok(token: &str) -> HttpResponse {
    ok(json!({ "serverInfo": { "Version": "V14000" } }))
        .with_header("Set-Cookie", format!("JSESSIONID={}; Path=/tc; HttpOnly", token))
}

pub fn login_rejected() -> HttpResponse {
    ok(json!({
        ".QName": "http://teamcenter.com/Schemas/Soa/2006-03/Exceptions.InvalidCredentialsException",
        "code": 515143,
        "level": 3,
        "message": "The login attempt failed: either the user ID or the password is invalid."
    }))
}

pub fn item_found(item_uid: &str, rev_uid: &str) -> HttpResponse {
    ok(json!({
        "output": [
            {
                "item": { "uid": item_uid },
                "itemRevOutput": [ { "itemRevision": { "uid": rev_uid } } ]
            }
        ],
        "ServiceData": {}
    }))
}

pub fn window_opened(window_uid: &str, line_uid: &str) -> HttpResponse {
    ok(json!({
        "output": [
            { "bomWindow": { "uid": window_uid }, "bomLine": { "uid": line_uid } }
        ],
        "ServiceData": {}
    }))
}

pub fn windows_closed() -> HttpResponse {
    ok(json!({ "ServiceData": {} }))
}

fn line(uid: &str, rev: &str) -> Value {
    json!({ "bomLine": { "uid": uid }, "itemRevOfBOMLine": { "uid": rev } })
}

fn revision(uid: &str, item_id: &str, rev: &str, name: &str) -> Value {
    json!({
        "uid": uid,
        "className": "ItemRevision",
        "props": {
            "item_id": { "dbValues": [item_id], "uiValues": [item_id] },
            "item_revision_id": { "dbValues": [rev], "uiValues": [rev] },
            "object_name": { "dbValues": [name], "uiValues": [name] }
        }
    })
}

/// Root 1001/A declaring two children where only one came back
pub fn expansion_with_missing_child() -> HttpResponse {
    ok(json!({
        "output": [
            {
                "parent": line("LINE-ROOT", "REV-1001"),
                "children": [ line("LINE-2002", "REV-2002"), line("LINE-GONE", "REV-GONE") ]
            },
            {
                "parent": line("LINE-2002", "REV-2002"),
                "children": []
            }
        ],
        "ServiceData": {
            "modelObjects": {
                "REV-1001": revision("REV-1001", "1001", "A", "Frame Assembly"),
                "REV-2002": revision("REV-2002", "2002", "B", "Bracket")
            }
        }
    }))
}

pub fn revision_rules() -> HttpResponse {
    ok(json!({
        "output": [
            { "revRule": { "uid": "RR-LW" } },
            { "revRule": { "uid": "RR-REL" } },
            { "revRule": { "uid": "RR-GHOST" } }
        ],
        "ServiceData": {
            "modelObjects": {
                "RR-LW": { "uid": "RR-LW", "props": { "object_name": { "uiValues": ["Latest Working"] } } },
                "RR-REL": { "uid": "RR-REL", "props": { "object_name": { "uiValues": ["Latest Released"] } } }
            }
        }
    }))
}
