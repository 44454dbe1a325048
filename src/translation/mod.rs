//! Request entry point.
//!
//! [`Translator::translate`] runs the whole pipeline for one JSON request:
//!
//! ```text
//! JSON ─► source resolution ─► Parser ─► PermissionPolicy ─► DataContext ─► Summary
//! ```
//!
//! Each request resolves its data source, takes that source's current schema
//! snapshot and keeps it until the response is built. Data contexts are
//! registered once and shared by every request.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde_json::Value as Json;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::action::{Action, Operation};
use crate::config::{PermissionPolicyKind, Settings};
use crate::context::{connect, schema_structure, table_structure, DataContext, Summary};
use crate::error::{Error, Result};
use crate::metadata::SchemaProvider;
use crate::parser::{detect_operation, request_source, ParseOptions, Parser};
use crate::permission::{AllowAll, PermissionCheck, PermissionPolicy, StaticPolicy};

pub struct Translator {
    settings: Settings,
    options: ParseOptions,
    contexts: DashMap<String, Arc<dyn DataContext>>,
    policy: Arc<dyn PermissionPolicy>,
}

impl Translator {
    /// A translator with no data sources registered yet.
    pub fn new(settings: Settings) -> Self {
        let policy: Arc<dyn PermissionPolicy> = match settings.permission_policy {
            PermissionPolicyKind::None => Arc::new(AllowAll),
            PermissionPolicyKind::Static => Arc::new(StaticPolicy::new(settings.permissions.clone())),
        };
        Self {
            options: ParseOptions::from_settings(&settings),
            settings,
            contexts: DashMap::new(),
            policy,
        }
    }

    /// A translator with every configured data source connected.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let translator = Self::new(settings);
        let table_config_path = translator.settings.table_config_path.as_deref();
        for (name, datasource) in &translator.settings.datasources {
            translator.register(name, connect(name, datasource, table_config_path)?)?;
        }
        info!(sources = translator.contexts.len(), "Translator ready");
        Ok(translator)
    }

    pub fn with_policy(mut self, policy: Arc<dyn PermissionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn register(&self, name: &str, context: Arc<dyn DataContext>) -> Result<()> {
        if self.contexts.contains_key(name) {
            return Err(Error::DuplicateDataSource(name.to_string()));
        }
        debug!(source = name, dialect = %context.dialect(), "Registered data context");
        self.contexts.insert(name.to_string(), context);
        Ok(())
    }

    pub fn context(&self, name: &str) -> Result<Arc<dyn DataContext>> {
        self.contexts
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::DataSourceNotFound(name.to_string()))
    }

    /// Source used by requests that name none: the configured default, else
    /// a registered source called "default", else the first by name.
    pub fn default_source(&self) -> Option<String> {
        if let Some(name) = &self.settings.default_datasource {
            return Some(name.clone());
        }
        if self.contexts.contains_key("default") {
            return Some("default".to_string());
        }
        self.contexts.iter().map(|e| e.key().clone()).min()
    }

    /// Translate and execute one JSON request.
    pub fn translate(&self, json: &str) -> Result<Summary> {
        let request: Json = serde_json::from_str(json)?;
        self.translate_value(&request)
    }

    pub fn translate_value(&self, request: &Json) -> Result<Summary> {
        let span = info_span!("request", id = %Uuid::new_v4());
        let _enter = span.enter();
        let started = Instant::now();
        debug!(request = %request, "Translating request");

        let result = self.run(request);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(summary) => debug!(operation = %summary.operation(), elapsed_ms, "Request completed"),
            Err(err) => warn!(error = %err, kind = ?err.kind(), elapsed_ms, "Request failed"),
        }
        result
    }

    fn run(&self, request: &Json) -> Result<Summary> {
        let object = request
            .as_object()
            .ok_or_else(|| Error::malformed("request must be a JSON object"))?;
        detect_operation(object)?;

        let default = self.default_source();
        let source = request_source(request, default.as_deref())?
            .or(default)
            .ok_or_else(|| Error::DataSourceNotFound("default".to_string()))?;
        let context = self.context(&source)?;
        let schema = context.schema();

        let action = Parser::new(schema.as_ref(), context.dialect())
            .with_options(self.options.clone())
            .parse(request)?;
        let mut action = self.authorize(action, &source, schema.as_ref())?;

        match action.operation() {
            Operation::Struct => {
                let table = action
                    .primary_table_item()
                    .and_then(|t| t.table)
                    .ok_or_else(|| Error::null_node("struct"))?;
                Ok(Summary::structure(
                    Operation::Struct,
                    table_structure(schema.as_ref(), table),
                ))
            }
            Operation::Structs => Ok(Summary::structure(
                Operation::Structs,
                schema_structure(schema.as_ref()),
            )),
            Operation::Sql => {
                let sql = action.build()?.sql.clone();
                context.execute_sql(&sql)
            }
            Operation::Native => {
                let content = action
                    .native_content()
                    .ok_or_else(|| Error::null_node("native"))?
                    .to_string();
                context.execute_native(&content)
            }
            Operation::Transaction => {
                let mut actions = action.take_transaction_actions();
                context.execute_transaction(&mut actions)
            }
            _ => context.execute(&mut action),
        }
    }

    /// Gate passthrough operations and run the permission policy, child by
    /// child for transactions.
    fn authorize(&self, mut action: Action, source: &str, schema: &dyn SchemaProvider) -> Result<Action> {
        match action.operation() {
            Operation::Sql if !self.settings.sql => return Err(Error::OperationDisabled("sql")),
            Operation::Native if !self.settings.native => {
                return Err(Error::OperationDisabled("native"))
            }
            Operation::Transaction => {
                for child in action.take_transaction_actions() {
                    let child = self.authorize(child, source, schema)?;
                    action.add_transaction_action(child);
                }
                return Ok(action);
            }
            _ => {}
        }

        action.set_source(Some(source.to_string()));
        match self.policy.check(action, schema)? {
            PermissionCheck::Pass(action) => Ok(action),
            PermissionCheck::Deny(reason) => {
                warn!(source, reason = %reason, "Permission denied");
                Err(Error::PermissionDenied(reason))
            }
        }
    }

    /// Reload the schema of every data source. Returns how many succeeded.
    pub fn refresh_all(&self) -> usize {
        let contexts: Vec<Arc<dyn DataContext>> =
            self.contexts.iter().map(|e| Arc::clone(e.value())).collect();
        contexts
            .iter()
            .filter(|context| match context.refresh_schema() {
                Ok(()) => true,
                Err(err) => {
                    warn!(source = context.source(), error = %err, "Schema refresh failed");
                    false
                }
            })
            .count()
    }

    /// Start the interval schema refresh, when the settings ask for one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_refresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.settings.metadata.refresh_period()?;
        let translator = Arc::clone(self);
        info!(period_secs = period.as_secs(), "Starting schema refresh task");
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let translator = Arc::clone(&translator);
                match tokio::task::spawn_blocking(move || translator.refresh_all()).await {
                    Ok(refreshed) => debug!(refreshed, "Schema refresh tick"),
                    Err(err) => warn!(error = %err, "Schema refresh task failed"),
                }
            }
        }))
    }
}
