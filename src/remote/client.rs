//! Session-authenticated client for the structure services
//!
//! One client serves one interactive workflow. Every method takes
//! `&mut self`, so calls of a workflow are serialised by construction;
//! run separate clients for separate workflows.
//!
//! Nothing here logs in implicitly or retries. A call that needs a session
//! fails with [`TcError::NotAuthenticated`] before touching the network, and
//! an authorization failure from the server drops the stored session.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::bom::RevisionRule;
use crate::core::config::{AttributeConfig, Credentials, ServerConfig};
use crate::core::reconstruct::RawExpansion;
use crate::error::{TcError, TcResult};
use crate::remote::session::SessionToken;
use crate::remote::soa::{self, services, ServiceException};
use crate::remote::transport::{ReqwestTransport, Transport};

/// Internal identifiers of an item and one of its revisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIdentity {
    pub item_uid: String,
    pub revision_uid: String,
}

/// An opened structure window and its top line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureRoot {
    pub window_uid: String,
    pub root_line_uid: String,
}

pub struct TcClient<T: Transport = ReqwestTransport> {
    transport: T,
    server: ServerConfig,
    credentials: Credentials,
    session: Option<SessionToken>,
    revision_rules: Option<Vec<RevisionRule>>,
    open_windows: Vec<String>,
}

impl TcClient<ReqwestTransport> {
    /// Client over the real HTTP transport
    pub fn connect(server: ServerConfig, credentials: Credentials) -> TcResult<Self> {
        server.validate()?;
        let transport = ReqwestTransport::new(server.timeout_secs)?;
        Ok(Self::with_transport(transport, server, credentials))
    }
}

impl<T: Transport> TcClient<T> {
    pub fn with_transport(transport: T, server: ServerConfig, credentials: Credentials) -> Self {
        Self {
            transport,
            server,
            credentials,
            session: None,
            revision_rules: None,
            open_windows: Vec::new(),
        }
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&SessionToken> {
        self.session.as_ref()
    }

    /// Windows opened by this client and not yet released
    pub fn open_windows(&self) -> &[String] {
        &self.open_windows
    }

    /// Forget the session and everything cached under it
    pub fn discard_session(&mut self) {
        self.session = None;
        self.revision_rules = None;
    }

    /// Log in and store the session token for later calls
    ///
    /// Any previous session is dropped first, so a failed login always
    /// leaves the client unauthenticated.
    pub async fn login(&mut self) -> TcResult<SessionToken> {
        self.discard_session();

        let url = self.server.service_url(services::LOGIN);
        let body = soa::login_body(&self.credentials.user, &self.credentials.password);
        debug!(url = %url, user = %self.credentials.user, "Logging in");

        let response = self.transport.post_json(&url, &[], body.to_string()).await?;

        let json: Option<Value> = serde_json::from_str(&response.body).ok();
        if let Some(exception) = json.as_ref().and_then(ServiceException::detect) {
            warn!(code = exception.code, "Login rejected by server");
            return Err(TcError::Authentication(exception.message));
        }
        if response.status == 401 || response.status == 403 {
            return Err(TcError::Authentication(format!(
                "login rejected with HTTP {}",
                response.status
            )));
        }
        if !response.is_success() {
            return Err(TcError::Protocol(format!(
                "login returned HTTP {}",
                response.status
            )));
        }

        let token = SessionToken::from_response(&response).ok_or_else(|| {
            TcError::Authentication("login response did not carry a session cookie".to_string())
        })?;

        info!(user = %self.credentials.user, token_len = token.as_str().len(), "Logged in");
        self.session = Some(token.clone());
        Ok(token)
    }

    /// POST an authenticated request and decode the answer
    async fn call<R: DeserializeOwned>(
        &mut self,
        service: &str,
        operation: &str,
        body: Value,
    ) -> TcResult<R> {
        let session = self.session.as_ref().ok_or(TcError::NotAuthenticated)?;
        let headers = [session.cookie_header()];
        let url = self.server.service_url(service);
        debug!(url = %url, operation, "Calling service");

        let response = self
            .transport
            .post_json(&url, &headers, body.to_string())
            .await?;

        match soa::decode(&response, operation) {
            Err(err @ TcError::Authentication(_)) => {
                warn!(operation, "Session rejected by server, discarding it");
                self.discard_session();
                Err(err)
            }
            other => other,
        }
    }

    /// Revision rules known to the server, cached for the session
    pub async fn list_revision_rules(&mut self) -> TcResult<Vec<RevisionRule>> {
        if let Some(rules) = &self.revision_rules {
            return Ok(rules.clone());
        }

        let response: soa::RevisionRulesResponse = self
            .call(
                services::GET_REVISION_RULES,
                "getRevisionRules",
                soa::revision_rules_body(),
            )
            .await?;

        let output = response.output.ok_or_else(|| TcError::missing("output"))?;
        let service_data = response
            .service_data
            .filter(|sd| sd.model_objects.is_some())
            .ok_or_else(|| TcError::missing("ServiceData.modelObjects"))?;

        let mut rules = Vec::with_capacity(output.len());
        for entry in output {
            let Some(uid) = entry.rev_rule.and_then(|r| r.uid) else {
                warn!("Revision rule entry without uid");
                continue;
            };
            if service_data.object(&uid).is_none() {
                warn!(uid = %uid, "Revision rule not found in modelObjects");
                continue;
            }
            match service_data.display_value(&uid, "object_name") {
                Some(name) => rules.push(RevisionRule::new(uid, name)),
                None => warn!(uid = %uid, "No name found for revision rule"),
            }
        }

        info!(count = rules.len(), "Loaded revision rules");
        self.revision_rules = Some(rules.clone());
        Ok(rules)
    }

    /// Map a human item number and revision label to internal uids
    pub async fn resolve_item(&mut self, item_id: &str, revision: &str) -> TcResult<ItemIdentity> {
        let response: soa::ItemFromIdResponse = self
            .call(
                services::GET_ITEM_FROM_ID,
                "getItemFromId",
                soa::item_from_id_body(item_id, revision),
            )
            .await?;

        let (item_uid, revision_uid) = response.first_match(item_id, revision)?;
        debug!(item_id, revision, item_uid = %item_uid, revision_uid = %revision_uid, "Resolved item");
        Ok(ItemIdentity {
            item_uid,
            revision_uid,
        })
    }

    /// Open a configured structure window on an item revision
    ///
    /// Windows opened earlier by this client are released first.
    pub async fn open_structure(
        &mut self,
        identity: &ItemIdentity,
        rule: Option<&RevisionRule>,
    ) -> TcResult<StructureRoot> {
        self.close_windows().await;

        let response: soa::CreateWindowsResponse = self
            .call(
                services::CREATE_BOM_WINDOWS,
                "createBOMWindows",
                soa::create_window_body(
                    &identity.item_uid,
                    &identity.revision_uid,
                    rule.map(|r| r.uid.as_str()),
                ),
            )
            .await?;

        let (window_uid, root_line_uid) = response.first_window()?;
        self.open_windows.push(window_uid.clone());
        debug!(window = %window_uid, root_line = %root_line_uid, rule = ?rule.map(|r| &r.name), "Opened structure window");
        Ok(StructureRoot {
            window_uid,
            root_line_uid,
        })
    }

    /// Release every window this client opened
    ///
    /// Failures are logged and otherwise ignored; the tracked list is
    /// cleared either way.
    pub async fn close_windows(&mut self) {
        if self.open_windows.is_empty() {
            return;
        }
        let windows = std::mem::take(&mut self.open_windows);

        if self.session.is_none() {
            debug!(count = windows.len(), "No session, dropping window handles");
            return;
        }

        let result: TcResult<Value> = self
            .call(
                services::CLOSE_BOM_WINDOWS,
                "closeBOMWindows",
                soa::close_windows_body(&windows),
            )
            .await;
        match result {
            Ok(_) => debug!(count = windows.len(), "Closed structure windows"),
            Err(e) => warn!(error = %e, count = windows.len(), "Failed to close structure windows"),
        }
    }

    /// Expand every level below `root` in one round trip
    pub async fn expand_all(
        &mut self,
        root: &StructureRoot,
        attrs: &AttributeConfig,
    ) -> TcResult<RawExpansion> {
        let response: soa::ExpandResponse = self
            .call(
                services::EXPAND_PS_ALL_LEVELS,
                "expandPSAllLevels",
                soa::expand_all_body(&root.root_line_uid, attrs.fetch_keys().into_iter()),
            )
            .await?;

        let expansion = response.into_raw_expansion()?;
        if expansion.records.is_empty() {
            return Err(TcError::NotFound(format!(
                "expansion of line {} returned no records",
                root.root_line_uid
            )));
        }
        info!(records = expansion.records.len(), "Expanded structure");
        Ok(expansion)
    }
}
