//! The host-facing façade.

use crate::consent::{CollectConsent, ConsentStatus};
use crate::environment::EnvironmentType;
use crate::event::Event;
use crate::hit::QueuedHit;
use crate::hit_processor::EdgeHitProcessor;
use crate::privacy::{PrivacyGate, PrivacyStatus};
use crate::providers::{
    ConfigurationProvider, ConsentProvider, EdgeConfiguration, EventDispatcher, IdentityProvider,
    KeyValueStore, SystemInfoProvider,
};
use crate::response_handler::NetworkResponseHandler;
use crate::retry::RetryPolicy;
use crate::store_payload::StoreResponsePayloadManager;
use crate::EdgeResult;
use chrono::Utc;
use edge_config_and_utils::{Config, Paths, DEFAULT_EDGE_DOMAIN};
use edge_data_queue::{DataQueue, SqliteDataQueue};
use edge_hit_queue::PersistentHitQueue;
use edge_network::{HttpTransport, HttpTransportConfig, Transport};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Host services the pipeline reads from and reports to.
#[derive(Clone)]
pub struct EdgeDependencies {
    pub configuration: Arc<dyn ConfigurationProvider>,
    pub identity: Arc<dyn IdentityProvider>,
    pub consent: Arc<dyn ConsentProvider>,
    pub dispatcher: Arc<dyn EventDispatcher>,
    pub key_value_store: Arc<dyn KeyValueStore>,
    pub system_info: Arc<dyn SystemInfoProvider>,
}

/// Local delivery settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSettings {
    /// Used when the configuration has no `edge.domain`.
    pub default_domain: String,
    pub environment: Option<EnvironmentType>,
    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,
    pub retry: RetryPolicy,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            default_domain: DEFAULT_EDGE_DOMAIN.to_string(),
            environment: None,
            headers: BTreeMap::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl EdgeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_domain: config.edge_domain.clone(),
            retry: RetryPolicy {
                initial: config.retry_initial_delay(),
                max: config.retry_max_delay(),
            },
            ..Self::default()
        }
    }

    pub fn with_environment(mut self, environment: EnvironmentType) -> Self {
        self.environment = Some(environment);
        self
    }
}

/// Accepts events and delivers them in order through a persistent queue.
///
/// Submission only persists and wakes the queue driver. Call
/// [`start`](Self::start) from inside a tokio runtime to begin sending.
pub struct Edge {
    queue: PersistentHitQueue,
    privacy: Arc<PrivacyGate>,
    consent: CollectConsent,
    consent_provider: Arc<dyn ConsentProvider>,
    configuration: Arc<dyn ConfigurationProvider>,
}

impl Edge {
    pub fn new(
        store: Arc<dyn DataQueue>,
        transport: Arc<dyn Transport>,
        dependencies: EdgeDependencies,
        settings: EdgeSettings,
    ) -> Self {
        let store_payloads = Arc::new(StoreResponsePayloadManager::new(dependencies.key_value_store));
        let privacy = Arc::new(PrivacyGate::new(Arc::clone(&store_payloads)));
        let response_handler = Arc::new(NetworkResponseHandler::new(
            dependencies.dispatcher,
            Arc::clone(&store_payloads),
        ));
        let processor = Arc::new(EdgeHitProcessor::new(
            transport,
            Arc::clone(&dependencies.configuration),
            dependencies.identity,
            dependencies.system_info,
            Arc::clone(&privacy),
            response_handler,
            store_payloads,
            settings,
        ));
        let queue = PersistentHitQueue::new(store, processor, privacy.dispatch_gate());

        let edge = Self {
            queue,
            privacy,
            consent: CollectConsent::new(),
            consent_provider: dependencies.consent,
            configuration: dependencies.configuration,
        };
        edge.handle_configuration_change();
        edge
    }

    /// Open the on-disk queue under `paths` and an HTTP transport tuned by `config`.
    pub fn open(paths: &Paths, config: &Config, dependencies: EdgeDependencies) -> EdgeResult<Self> {
        paths.ensure_dirs()?;
        let store = SqliteDataQueue::open(&paths.queue_database_file())?;
        let transport = HttpTransport::new(HttpTransportConfig {
            request_timeout: config.request_timeout(),
            max_attempts: config.max_attempts,
            backoff: config.transport_backoff(),
        })?;
        info!(path = %paths.queue_database_file().display(), "Edge hit store opened");

        Ok(Self::new(
            Arc::new(store),
            Arc::new(transport),
            dependencies,
            EdgeSettings::from_config(config),
        ))
    }

    /// Start the queue driver.
    pub fn start(&self) {
        self.queue.begin_processing();
    }

    /// Queue an experience event.
    ///
    /// Returns `Ok(false)` when the event is ignored: no data, privacy opted
    /// out, or collect consent `n`.
    pub fn send_event(&self, event: Event) -> EdgeResult<bool> {
        if !event.has_data() {
            debug!(event_id = %event.id, "Ignoring event without data");
            return Ok(false);
        }
        if self.privacy.status() == PrivacyStatus::OptedOut {
            debug!(event_id = %event.id, "Privacy opted out, ignoring event");
            return Ok(false);
        }
        if self.consent.current(self.consent_provider.as_ref()) == ConsentStatus::No {
            debug!(event_id = %event.id, "Collect consent is no, ignoring event");
            return Ok(false);
        }

        self.queue_hit(QueuedHit::Experience {
            request_id: Uuid::new_v4(),
            event,
        })?;
        Ok(true)
    }

    /// Queue a consent update for `privacy/set-consent`.
    pub fn update_consent(&self, event: Event) -> EdgeResult<bool> {
        if !event.has_data() {
            debug!(event_id = %event.id, "Ignoring consent update without data");
            return Ok(false);
        }
        if self.privacy.status() == PrivacyStatus::OptedOut {
            debug!(event_id = %event.id, "Privacy opted out, ignoring consent update");
            return Ok(false);
        }

        self.queue_hit(QueuedHit::Consent {
            request_id: Uuid::new_v4(),
            event,
        })?;
        Ok(true)
    }

    /// Consent preferences changed. Already queued hits are kept.
    pub fn handle_consent_preferences(&self, preferences: &Value) -> ConsentStatus {
        self.consent.update(preferences)
    }

    /// Queue a reset so stored payloads are purged after the hits ahead of it.
    pub fn reset_identities(&self) -> EdgeResult<()> {
        self.queue_hit(QueuedHit::Reset { timestamp: Utc::now() })
    }

    /// Re-read the configuration: apply its privacy status and re-check the head.
    pub fn handle_configuration_change(&self) {
        if let Some(configuration) = self.configuration.configuration() {
            let configuration = EdgeConfiguration::from_map(&configuration);
            self.privacy.set_status(configuration.privacy);
        }
        self.queue.wake();
    }

    /// Some shared state the head may be waiting on has changed.
    pub fn handle_shared_state_change(&self) {
        self.queue.wake();
    }

    pub fn set_privacy_status(&self, status: PrivacyStatus) {
        self.privacy.set_status(status);
    }

    pub fn privacy_status(&self) -> PrivacyStatus {
        self.privacy.status()
    }

    pub fn queued_count(&self) -> EdgeResult<usize> {
        Ok(self.queue.count()?)
    }

    /// Stop sending and close the store. An in-flight hit finishes first.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }

    fn queue_hit(&self, hit: QueuedHit) -> EdgeResult<()> {
        let entity = hit.to_entity()?;
        self.queue.queue(&entity)?;
        Ok(())
    }
}
