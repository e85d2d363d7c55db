pub mod types;
pub mod error;
pub mod config;
pub mod language;
pub mod translate;
pub mod store;
pub mod dynamo;
pub mod comments;
pub mod pathways;
pub mod envelope;

use aws_sdk_dynamodb::Client as DynamoClient;
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;

use config::Config;
use dynamo::DynamoStore;
use language::{LanguageClassifier, ScriptClassifier};
use store::DocumentStore;
use translate::{OpenAiTranslator, Translator};

/// Shared application state, built once per execution context and handed to
/// every request.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub classifier: Arc<dyn LanguageClassifier>,
    /// `None` when no translation provider is configured.
    pub translator: Option<Arc<dyn Translator>>,
    pub timezone: Tz,
    /// Deadline for each classification or translation call.
    pub external_call_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        classifier: Arc<dyn LanguageClassifier>,
        translator: Option<Arc<dyn Translator>>,
        timezone: Tz,
        external_call_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            classifier,
            translator,
            timezone,
            external_call_timeout,
        })
    }

    /// Production wiring: DynamoDB store, local script classifier, and the
    /// OpenAI translator when an API key is configured.
    pub fn from_config(config: &Config, dynamo_client: DynamoClient) -> Arc<Self> {
        let translator = config
            .translation
            .as_ref()
            .map(|t| Arc::new(OpenAiTranslator::new(t)) as Arc<dyn Translator>);

        Self::new(
            Arc::new(DynamoStore::new(dynamo_client, config.table_name.clone())),
            Arc::new(ScriptClassifier),
            translator,
            config.timezone,
            config.external_call_timeout,
        )
    }
}
