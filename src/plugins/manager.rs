//! MCP manager - loads a user's connections and routes requests through Claude

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::application::errors::{AppError, PluginError};
use crate::domain::entities::{ConnectionStatus, ProviderConnection};
use crate::domain::traits::ConnectionStore;
use crate::infrastructure::crypto::CredentialCipher;
use crate::infrastructure::llm::{LLMConfig, LLMMessage, LLMResponse, LLMResult, LLMUsage, LLM};
use crate::plugins::calls::{extract_calls, McpCall};
use crate::plugins::context::{ClaudeContext, DataSource};
use crate::plugins::registry::PluginRegistry;
use crate::plugins::relevance::{relevant_slugs, PluginProfile};
use crate::plugins::trait_def::{CallResult, McpPlugin, MethodSpec, PluginContext};

/// An initialized, authenticated plugin with the connection it came from
pub struct ActivePlugin {
    pub plugin: Arc<dyn McpPlugin>,
    pub connection: ProviderConnection,
    pub methods: Vec<MethodSpec>,
}

/// Reply to one orchestrated request
#[derive(Debug, Clone, Serialize)]
pub struct ClaudeReply {
    pub session_id: String,
    pub content: String,
    pub model: String,
    pub usage: Option<LLMUsage>,
    pub mcp_calls: Vec<McpCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_data: Option<Vec<CallResult>>,
}

/// Per-user orchestration of plugins and the LLM
pub struct McpManager {
    user_id: String,
    store: Arc<dyn ConnectionStore>,
    registry: Arc<PluginRegistry>,
    cipher: Arc<CredentialCipher>,
    llm: Arc<dyn LLM>,
    llm_config: LLMConfig,
    connections: Vec<ProviderConnection>,
    active_plugins: BTreeMap<String, ActivePlugin>,
}

impl McpManager {
    /// Load the user's active connections. Plugins are built by `initialize_plugins`.
    pub async fn load(
        user_id: impl Into<String>,
        store: Arc<dyn ConnectionStore>,
        registry: Arc<PluginRegistry>,
        cipher: Arc<CredentialCipher>,
        llm: Arc<dyn LLM>,
        llm_config: LLMConfig,
    ) -> Result<Self, AppError> {
        let user_id = user_id.into();
        let connections: Vec<ProviderConnection> = store
            .active_connections(&user_id)
            .await?
            .into_iter()
            .filter(|pc| pc.connection.is_active())
            .collect();

        info!("Loaded {} active connections for user {}", connections.len(), user_id);

        Ok(Self {
            user_id,
            store,
            registry,
            cipher,
            llm,
            llm_config,
            connections,
            active_plugins: BTreeMap::new(),
        })
    }

    /// Slugs of the plugins that initialized successfully
    pub fn active_slugs(&self) -> Vec<&str> {
        self.active_plugins.keys().map(String::as_str).collect()
    }

    pub fn active_plugin(&self, slug: &str) -> Option<&ActivePlugin> {
        self.active_plugins.get(slug)
    }

    /// Build and authenticate a plugin per loaded connection; failures are logged and skipped
    pub async fn initialize_plugins(&mut self) {
        let connections = std::mem::take(&mut self.connections);

        for pc in connections {
            let slug = pc.slug().to_string();
            if self.active_plugins.contains_key(&slug) {
                warn!(
                    "Skipping connection {}: provider {} already has an active plugin",
                    pc.connection.id, slug
                );
                continue;
            }

            match self.initialize_plugin(&pc).await {
                Ok((plugin, methods)) => {
                    info!("Plugin {} ready with {} methods", slug, methods.len());
                    self.active_plugins.insert(
                        slug,
                        ActivePlugin {
                            plugin,
                            connection: pc,
                            methods,
                        },
                    );
                }
                Err(e) => error!("Error initializing plugin {}: {}", slug, e),
            }
        }
    }

    async fn initialize_plugin(
        &self,
        pc: &ProviderConnection,
    ) -> Result<(Arc<dyn McpPlugin>, Vec<MethodSpec>), PluginError> {
        let credentials = pc
            .connection
            .credentials(&self.cipher)
            .map_err(|e| PluginError::Credentials(e.to_string()))?;
        let ctx = PluginContext::new(credentials, pc.connection.config_data.clone(), self.user_id.as_str());
        let plugin = self.registry.create(&pc.provider.plugin_class, ctx)?;

        if pc.connection.is_expired(Utc::now()) {
            info!("Connection {} expired, refreshing token", pc.connection.id);
            if !plugin.refresh_token().await {
                if let Err(e) = self.store.set_status(pc.connection.id, ConnectionStatus::Expired).await {
                    warn!("Could not mark connection {} expired: {}", pc.connection.id, e);
                }
                return Err(PluginError::Authentication(format!("token refresh failed for {}", pc.slug())));
            }
            self.persist_refresh(pc, plugin.as_ref()).await;
        }

        if !plugin.authenticate().await {
            return Err(PluginError::Authentication(format!("{} rejected the stored credentials", pc.slug())));
        }

        let methods = plugin.list_methods().await;
        Ok((plugin, methods))
    }

    /// Store the credentials a refresh produced
    async fn persist_refresh(&self, pc: &ProviderConnection, plugin: &dyn McpPlugin) {
        let Some(refreshed) = plugin.refreshed_credentials().await else {
            return;
        };

        let encrypted = match self.cipher.encrypt_json(&refreshed.credentials) {
            Ok(encrypted) => encrypted,
            Err(e) => {
                warn!("Could not encrypt refreshed credentials for {}: {}", pc.slug(), e);
                return;
            }
        };

        match self
            .store
            .update_credentials(pc.connection.id, &encrypted, refreshed.expires_at)
            .await
        {
            Ok(()) => debug!("Stored refreshed credentials for connection {}", pc.connection.id),
            Err(e) => warn!("Could not store refreshed credentials for {}: {}", pc.slug(), e),
        }
    }

    /// Slugs of the active plugins the message is about
    pub fn analyze_message_for_mcp(&self, message: &str) -> Vec<String> {
        let profiles: Vec<PluginProfile<'_>> = self
            .active_plugins
            .iter()
            .map(|(slug, active)| PluginProfile {
                slug,
                name: &active.connection.provider.name,
                category: &active.connection.provider.category.slug,
                methods: active.methods.iter().map(|m| m.name.as_str()).collect(),
            })
            .collect();

        relevant_slugs(message, &profiles)
    }

    pub fn build_claude_context(&self, slugs: &[String]) -> ClaudeContext {
        let mut context = ClaudeContext {
            user_config: json!({ "user_id": self.user_id }),
            ..Default::default()
        };

        for slug in slugs {
            let Some(active) = self.active_plugins.get(slug) else {
                continue;
            };
            let provider = &active.connection.provider;
            context.available_data_sources.push(DataSource {
                name: provider.name.clone(),
                slug: slug.clone(),
                category: provider.category.slug.clone(),
                config: active.connection.connection.config_data.clone(),
            });
            context.available_methods.insert(slug.clone(), active.methods.clone());
        }

        context
    }

    pub async fn send_claude_request(&self, message: &str, context: &ClaudeContext) -> LLMResult<LLMResponse> {
        let system = context.render_system_prompt(self.llm_config.system_prompt.as_deref());
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(LLMMessage::system(system));
        }
        messages.push(LLMMessage::user(message));

        debug!("Sending request to {} with {} data sources", self.llm.name(), context.available_data_sources.len());
        self.llm
            .chat(
                messages,
                Some(self.llm_config.model()),
                Some(self.llm_config.temperature),
                self.llm_config.max_tokens,
            )
            .await
    }

    /// Run each call against its plugin; failures become error entries
    pub async fn execute_mcp_calls(&self, calls: &[McpCall]) -> Vec<CallResult> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let Some(active) = self.find_plugin(&call.plugin) else {
                warn!("Call to inactive plugin {}", call.plugin);
                results.push(CallResult::error(
                    &call.plugin,
                    &call.method,
                    format!("Plugin '{}' is not active", call.plugin),
                ));
                continue;
            };

            match active.plugin.execute(&call.method, &call.params).await {
                Ok(data) => {
                    if let Err(e) = self.store.record_sync(active.connection.connection.id, Utc::now()).await {
                        warn!("Could not record sync for {}: {}", call.plugin, e);
                    }
                    results.push(CallResult::success(&call.plugin, &call.method, data));
                }
                Err(e) => {
                    error!("{}.{} failed: {}", call.plugin, call.method, e);
                    results.push(CallResult::error(&call.plugin, &call.method, e.to_string()));
                }
            }
        }

        results
    }

    /// Calls name a provider slug; the plugin class is accepted too
    fn find_plugin(&self, name: &str) -> Option<&ActivePlugin> {
        self.active_plugins
            .get(name)
            .or_else(|| self.active_plugins.values().find(|a| a.plugin.name() == name))
    }

    /// Full request flow: relevance, context, LLM, then any requested plugin calls
    pub async fn execute_claude_request(&self, message: &str, session_id: &str) -> Result<ClaudeReply, AppError> {
        let needed = self.analyze_message_for_mcp(message);
        let context = self.build_claude_context(&needed);
        let response = self.send_claude_request(message, &context).await?;

        let mcp_calls = extract_calls(&response.content);
        let mcp_data = if mcp_calls.is_empty() {
            None
        } else {
            info!("Reply requested {} plugin calls", mcp_calls.len());
            Some(self.execute_mcp_calls(&mcp_calls).await)
        };

        Ok(ClaudeReply {
            session_id: session_id.to_string(),
            content: response.content,
            model: response.model,
            usage: response.usage,
            mcp_calls,
            mcp_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use crate::application::errors::StorageError;
    use crate::domain::entities::{Category, Connection, ConnectionStatus, IntegrationType, Provider};
    use crate::plugins::trait_def::{PluginResult, RefreshedCredentials};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    const FAKE_CLASS: &str = "test.fake";

    struct FakePlugin {
        user_id: String,
        credentials: Value,
        refreshed: AtomicBool,
    }

    #[async_trait]
    impl McpPlugin for FakePlugin {
        fn name(&self) -> &str {
            FAKE_CLASS
        }

        fn user_id(&self) -> &str {
            &self.user_id
        }

        async fn authenticate(&self) -> bool {
            let valid = self.credentials["valid"].as_bool().unwrap_or(false);
            let needs_refresh = self.credentials["needs_refresh"].as_bool().unwrap_or(false);
            valid && (!needs_refresh || self.refreshed.load(Ordering::SeqCst))
        }

        async fn list_methods(&self) -> Vec<MethodSpec> {
            vec![
                MethodSpec::new("echo", "Return the params").param("anything", "Any value"),
                MethodSpec::new("fail", "Always fails"),
            ]
        }

        async fn execute(&self, method: &str, params: &Value) -> PluginResult<Value> {
            match method {
                "echo" => Ok(params.clone()),
                "fail" => Err(PluginError::Api("vendor exploded".to_string())),
                other => Err(PluginError::unsupported(FAKE_CLASS, other)),
            }
        }

        async fn refresh_token(&self) -> bool {
            if self.credentials["refresh_fails"].as_bool().unwrap_or(false) {
                return false;
            }
            self.refreshed.store(true, Ordering::SeqCst);
            true
        }

        async fn refreshed_credentials(&self) -> Option<RefreshedCredentials> {
            if !self.refreshed.load(Ordering::SeqCst) {
                return None;
            }
            let mut credentials = self.credentials.clone();
            credentials["needs_refresh"] = json!(false);
            Some(RefreshedCredentials {
                credentials,
                expires_at: Some(Utc::now() + Duration::hours(1)),
            })
        }
    }

    fn registry() -> Arc<PluginRegistry> {
        let mut registry = PluginRegistry::new();
        registry.register(FAKE_CLASS, |ctx| {
            Ok(Arc::new(FakePlugin {
                user_id: ctx.user_id,
                credentials: ctx.credentials,
                refreshed: AtomicBool::new(false),
            }) as Arc<dyn McpPlugin>)
        });
        Arc::new(registry)
    }

    #[derive(Default)]
    struct MemoryStore {
        connections: Vec<ProviderConnection>,
        synced: Mutex<Vec<Uuid>>,
        updated: Mutex<Vec<(Uuid, String, Option<DateTime<Utc>>)>>,
        statuses: Mutex<Vec<(Uuid, ConnectionStatus)>>,
    }

    #[async_trait]
    impl ConnectionStore for MemoryStore {
        async fn active_connections(&self, user_id: &str) -> Result<Vec<ProviderConnection>, StorageError> {
            // Returns everything for the user so the manager's own status filter is exercised
            Ok(self
                .connections
                .iter()
                .filter(|pc| pc.connection.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn record_sync(&self, connection_id: Uuid, _at: DateTime<Utc>) -> Result<(), StorageError> {
            self.synced.lock().unwrap().push(connection_id);
            Ok(())
        }

        async fn update_credentials(
            &self,
            connection_id: Uuid,
            encrypted_credentials: &str,
            expires_at: Option<DateTime<Utc>>,
        ) -> Result<(), StorageError> {
            self.updated
                .lock()
                .unwrap()
                .push((connection_id, encrypted_credentials.to_string(), expires_at));
            Ok(())
        }

        async fn set_status(&self, connection_id: Uuid, status: ConnectionStatus) -> Result<(), StorageError> {
            self.statuses.lock().unwrap().push((connection_id, status));
            Ok(())
        }
    }

    struct StubLLM {
        reply: String,
        seen: Mutex<Vec<LLMMessage>>,
    }

    impl StubLLM {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLM for StubLLM {
        fn name(&self) -> &str {
            "stub"
        }

        async fn chat(
            &self,
            messages: Vec<LLMMessage>,
            model: Option<&str>,
            _temperature: Option<f32>,
            _max_tokens: Option<u32>,
        ) -> LLMResult<LLMResponse> {
            self.seen.lock().unwrap().extend(messages);
            Ok(LLMResponse {
                content: self.reply.clone(),
                model: model.unwrap_or("stub-model").to_string(),
                usage: None,
                finish_reason: Some("end_turn".to_string()),
            })
        }
    }

    fn cipher() -> Arc<CredentialCipher> {
        Arc::new(CredentialCipher::new(&CredentialCipher::generate_key()).unwrap())
    }

    fn provider(id: i64, slug: &str, category: &str, plugin_class: &str) -> Provider {
        Provider {
            id,
            name: slug.replace('-', " "),
            slug: slug.to_string(),
            category: Category {
                id,
                name: category.to_string(),
                slug: category.to_string(),
                icon: String::new(),
                description: None,
                order: 0,
            },
            description: None,
            icon_url: String::new(),
            documentation_url: String::new(),
            integration_type: IntegrationType::Oauth2,
            plugin_class: plugin_class.to_string(),
            required_scopes: vec![],
            webhook_events: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn connection(
        cipher: &CredentialCipher,
        provider: Provider,
        status: ConnectionStatus,
        credentials: Value,
    ) -> ProviderConnection {
        let mut connection = Connection::new("user-1", provider.id).with_config(json!({"site": provider.slug}));
        connection.status = status;
        connection.set_credentials(cipher, &credentials).unwrap();
        ProviderConnection { connection, provider }
    }

    async fn manager(
        connections: Vec<ProviderConnection>,
        cipher: Arc<CredentialCipher>,
        llm: Arc<StubLLM>,
    ) -> (McpManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore {
            connections,
            ..Default::default()
        });
        let mut manager = McpManager::load(
            "user-1",
            store.clone(),
            registry(),
            cipher,
            llm,
            LLMConfig::default(),
        )
        .await
        .unwrap();
        manager.initialize_plugins().await;
        (manager, store)
    }

    #[tokio::test]
    async fn test_only_active_connections_are_loaded() {
        let cipher = cipher();
        let valid = json!({"valid": true});
        let connections = vec![
            connection(&cipher, provider(1, "traffic", "analytics", FAKE_CLASS), ConnectionStatus::Active, valid.clone()),
            connection(&cipher, provider(2, "ranking", "seo", FAKE_CLASS), ConnectionStatus::Disabled, valid.clone()),
            connection(&cipher, provider(3, "spend", "advertising", FAKE_CLASS), ConnectionStatus::Expired, valid),
        ];

        let (manager, _) = manager(connections, cipher, StubLLM::new("ok")).await;
        assert_eq!(manager.active_slugs(), vec!["traffic"]);
    }

    #[tokio::test]
    async fn test_failed_initialization_is_excluded() {
        let cipher = cipher();
        let other_cipher = CredentialCipher::new(&CredentialCipher::generate_key()).unwrap();
        let connections = vec![
            connection(&cipher, provider(1, "good", "analytics", FAKE_CLASS), ConnectionStatus::Active, json!({"valid": true})),
            connection(&cipher, provider(2, "rejected", "analytics", FAKE_CLASS), ConnectionStatus::Active, json!({"valid": false})),
            connection(&cipher, provider(3, "unknown", "analytics", "vendor.missing"), ConnectionStatus::Active, json!({"valid": true})),
            connection(&other_cipher, provider(4, "undecryptable", "analytics", FAKE_CLASS), ConnectionStatus::Active, json!({"valid": true})),
        ];

        let (manager, _) = manager(connections, cipher, StubLLM::new("ok")).await;
        assert_eq!(manager.active_slugs(), vec!["good"]);
    }

    #[tokio::test]
    async fn test_duplicate_provider_keeps_first() {
        let cipher = cipher();
        let first = connection(&cipher, provider(1, "traffic", "analytics", FAKE_CLASS), ConnectionStatus::Active, json!({"valid": true}));
        let mut second = connection(&cipher, provider(1, "traffic", "analytics", FAKE_CLASS), ConnectionStatus::Active, json!({"valid": true}));
        second.connection.display_name = "second".to_string();
        let first_id = first.connection.id;

        let (manager, _) = manager(vec![first, second], cipher, StubLLM::new("ok")).await;
        assert_eq!(manager.active_slugs().len(), 1);
        assert_eq!(manager.active_plugin("traffic").unwrap().connection.connection.id, first_id);
    }

    #[tokio::test]
    async fn test_expired_connection_is_refreshed_once() {
        let cipher = cipher();
        let mut pc = connection(
            &cipher,
            provider(1, "traffic", "analytics", FAKE_CLASS),
            ConnectionStatus::Active,
            json!({"valid": true, "needs_refresh": true}),
        );
        pc.connection.expires_at = Some(Utc::now() - Duration::minutes(5));
        let id = pc.connection.id;

        let (manager, store) = manager(vec![pc], cipher.clone(), StubLLM::new("ok")).await;
        assert_eq!(manager.active_slugs(), vec!["traffic"]);

        let updated = store.updated.lock().unwrap();
        assert_eq!(updated.len(), 1);
        let (updated_id, encrypted, expires_at) = &updated[0];
        assert_eq!(*updated_id, id);
        assert!(expires_at.unwrap() > Utc::now());
        let stored = cipher.decrypt_json(encrypted).unwrap();
        assert_eq!(stored["needs_refresh"], false);
        assert!(store.statuses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_marks_connection_expired() {
        let cipher = cipher();
        let mut pc = connection(
            &cipher,
            provider(1, "traffic", "analytics", FAKE_CLASS),
            ConnectionStatus::Active,
            json!({"valid": true, "refresh_fails": true}),
        );
        pc.connection.expires_at = Some(Utc::now() - Duration::minutes(5));
        let id = pc.connection.id;

        let (manager, store) = manager(vec![pc], cipher, StubLLM::new("ok")).await;
        assert!(manager.active_slugs().is_empty());
        assert_eq!(*store.statuses.lock().unwrap(), vec![(id, ConnectionStatus::Expired)]);
        assert!(store.updated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unexpired_connection_is_not_refreshed() {
        let cipher = cipher();
        let mut pc = connection(
            &cipher,
            provider(1, "traffic", "analytics", FAKE_CLASS),
            ConnectionStatus::Active,
            json!({"valid": true, "refresh_fails": true}),
        );
        pc.connection.expires_at = Some(Utc::now() + Duration::minutes(30));

        let (manager, store) = manager(vec![pc], cipher, StubLLM::new("ok")).await;
        assert_eq!(manager.active_slugs(), vec!["traffic"]);
        assert!(store.updated.lock().unwrap().is_empty());
        assert!(store.statuses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_contains_only_relevant_plugins() {
        let cipher = cipher();
        let connections = vec![
            connection(&cipher, provider(1, "traffic", "analytics", FAKE_CLASS), ConnectionStatus::Active, json!({"valid": true})),
            connection(&cipher, provider(2, "campaigns", "advertising", FAKE_CLASS), ConnectionStatus::Active, json!({"valid": true})),
        ];
        let (manager, _) = manager(connections, cipher, StubLLM::new("ok")).await;

        let slugs = manager.analyze_message_for_mcp("How many visitors did we have?");
        assert_eq!(slugs, vec!["traffic"]);

        let context = manager.build_claude_context(&slugs);
        assert_eq!(context.available_data_sources.len(), 1);
        assert_eq!(context.available_data_sources[0].category, "analytics");
        assert_eq!(context.available_data_sources[0].config, json!({"site": "traffic"}));
        assert_eq!(context.available_methods["traffic"].len(), 2);
        assert_eq!(context.user_config, json!({"user_id": "user-1"}));

        let all = manager.analyze_message_for_mcp("hello");
        assert_eq!(all, vec!["campaigns", "traffic"]);
    }

    #[tokio::test]
    async fn test_execute_calls_captures_failures() {
        let cipher = cipher();
        let pc = connection(&cipher, provider(1, "traffic", "analytics", FAKE_CLASS), ConnectionStatus::Active, json!({"valid": true}));
        let connection_id = pc.connection.id;
        let (manager, store) = manager(vec![pc], cipher, StubLLM::new("ok")).await;

        let calls = vec![
            McpCall { plugin: "traffic".into(), method: "echo".into(), params: json!({"x": 1}) },
            McpCall { plugin: "traffic".into(), method: "nope".into(), params: json!({}) },
            McpCall { plugin: "traffic".into(), method: "fail".into(), params: json!({}) },
            McpCall { plugin: "missing".into(), method: "echo".into(), params: json!({}) },
            McpCall { plugin: FAKE_CLASS.into(), method: "echo".into(), params: json!({"y": 2}) },
        ];
        let results = manager.execute_mcp_calls(&calls).await;

        assert_eq!(results.len(), 5);
        assert!(results[0].success);
        assert_eq!(results[0].data, Some(json!({"x": 1})));
        assert!(!results[1].success);
        assert!(results[1].error.as_deref().unwrap().contains("not supported"));
        assert!(results[2].error.as_deref().unwrap().contains("vendor exploded"));
        assert!(results[3].error.as_deref().unwrap().contains("not active"));
        assert!(results[4].success);

        assert_eq!(*store.synced.lock().unwrap(), vec![connection_id, connection_id]);
    }

    #[tokio::test]
    async fn test_execute_claude_request_runs_requested_calls() {
        let cipher = cipher();
        let pc = connection(&cipher, provider(1, "traffic", "analytics", FAKE_CLASS), ConnectionStatus::Active, json!({"valid": true}));
        let reply = "Fetching.\n```json\n{\"mcp_calls\": [{\"plugin\": \"traffic\", \"method\": \"echo\", \"params\": {\"days\": 7}}]}\n```";
        let llm = StubLLM::new(reply);
        let (manager, _) = manager(vec![pc], cipher, llm.clone()).await;

        let result = manager.execute_claude_request("Show me visitors", "session-1").await.unwrap();
        assert_eq!(result.session_id, "session-1");
        assert_eq!(result.mcp_calls.len(), 1);
        let data = result.mcp_data.unwrap();
        assert_eq!(data[0].data, Some(json!({"days": 7})));

        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].is_system());
        assert!(seen[0].content.contains("\"traffic\""));
        assert_eq!(seen[1].content, "Show me visitors");
    }

    #[tokio::test]
    async fn test_plain_reply_has_no_mcp_data() {
        let (manager, _) = manager(vec![], cipher(), StubLLM::new("Nothing connected yet.")).await;
        let result = manager.execute_claude_request("hi", "s").await.unwrap();
        assert!(result.mcp_calls.is_empty());
        assert!(result.mcp_data.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("mcp_data").is_none());
    }
}
