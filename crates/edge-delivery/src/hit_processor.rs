//! Turns a stored hit into one Edge Network request.

use crate::device::Device;
use crate::edge::EdgeSettings;
use crate::event::Event;
use crate::hit::{EdgeHit, QueuedHit, RequestType};
use crate::privacy::{PrivacyGate, PrivacyStatus};
use crate::providers::{
    ecid_from_identity, ConfigurationProvider, EdgeConfiguration, IdentityProvider, SystemInfoProvider,
};
use crate::request_builder::{RequestBuilder, RequestContext};
use crate::response_handler::NetworkResponseHandler;
use crate::retry::RetryState;
use crate::store_payload::StoreResponsePayloadManager;
use crate::streaming::StreamingResponseSink;
use async_trait::async_trait;
use edge_config_and_utils::edge_base_url_for;
use edge_hit_queue::{DataEntity, DropReason, HitDisposition, HitProcessing};
use edge_network::{NetworkRequest, Transport, TransportOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// [`HitProcessing`] for Edge hits.
///
/// Everything a request depends on (configuration, identity, stored
/// payloads, privacy) is read when the hit comes up for sending, not when
/// it was queued.
pub struct EdgeHitProcessor {
    transport: Arc<dyn Transport>,
    configuration: Arc<dyn ConfigurationProvider>,
    identity: Arc<dyn IdentityProvider>,
    system_info: Arc<dyn SystemInfoProvider>,
    privacy: Arc<PrivacyGate>,
    response_handler: Arc<NetworkResponseHandler>,
    store_payloads: Arc<StoreResponsePayloadManager>,
    builder: RequestBuilder,
    retry: RetryState,
    settings: EdgeSettings,
}

impl EdgeHitProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn Transport>,
        configuration: Arc<dyn ConfigurationProvider>,
        identity: Arc<dyn IdentityProvider>,
        system_info: Arc<dyn SystemInfoProvider>,
        privacy: Arc<PrivacyGate>,
        response_handler: Arc<NetworkResponseHandler>,
        store_payloads: Arc<StoreResponsePayloadManager>,
        settings: EdgeSettings,
    ) -> Self {
        Self {
            transport,
            configuration,
            identity,
            system_info,
            privacy,
            response_handler,
            store_payloads,
            builder: RequestBuilder::new(),
            retry: RetryState::new(settings.retry),
            settings,
        }
    }

    /// Build the hit for a content entry, or the disposition that replaces sending it.
    fn prepare(
        &self,
        entity: &DataEntity,
        request_id: Uuid,
        event: Event,
        request_type: RequestType,
    ) -> Result<(EdgeHit, NetworkRequest), HitDisposition> {
        let Some(configuration) = self.configuration.configuration() else {
            debug!(entity_id = %entity.unique_id, "Configuration pending, holding hit");
            return Err(HitDisposition::NotReady);
        };
        let configuration = EdgeConfiguration::from_map(&configuration);
        let Some(config_id) = configuration.config_id else {
            debug!(entity_id = %entity.unique_id, "No edge.configId configured, holding hit");
            return Err(HitDisposition::NotReady);
        };

        let domain = configuration
            .domain
            .as_deref()
            .unwrap_or(&self.settings.default_domain);
        let base = edge_base_url_for(domain).map_err(|e| {
            warn!(domain, error = %e, "Configured Edge domain is not a valid host");
            HitDisposition::NotReady
        })?;

        let Some(identity) = self.identity.identity() else {
            debug!(entity_id = %entity.unique_id, "Identity pending, holding hit");
            return Err(HitDisposition::NotReady);
        };

        let context = RequestContext {
            ecid: ecid_from_identity(&identity),
            store_payloads: self.store_payloads.active_payloads(),
            environment: self.settings.environment,
            device: Device::from_system_info(self.system_info.as_ref()),
            headers: self.settings.headers.clone(),
        };
        if context.ecid.is_none() {
            debug!(entity_id = %entity.unique_id, "Identity has no ECID, sending without it");
        }

        let request = match request_type {
            RequestType::Interact => self
                .builder
                .build_experience_request(std::slice::from_ref(&event), &context),
            RequestType::SetConsent => self.builder.build_consent_request(&event, &context),
        };
        let Some(request) = request else {
            warn!(entity_id = %entity.unique_id, "Hit could not be turned into a request, dropping");
            return Err(HitDisposition::Dropped(DropReason::Malformed));
        };

        let hit = EdgeHit {
            config_id,
            request_id,
            request_type,
            payload: request.body,
            events: vec![event],
            headers: context.headers,
            streaming: request.streaming,
        };
        let network_request = hit.network_request(&base).map_err(|e| {
            warn!(entity_id = %entity.unique_id, error = %e, "Request URL could not be built, dropping");
            HitDisposition::Dropped(DropReason::Malformed)
        })?;

        Ok((hit, network_request))
    }

    async fn send(&self, entity: &DataEntity, hit: EdgeHit, request: NetworkRequest) -> HitDisposition {
        let request_id = hit.request_id.to_string();
        self.response_handler.add_waiting_events(&request_id, &hit.events);

        let mut sink = StreamingResponseSink::new(
            Arc::clone(&self.response_handler),
            &request_id,
            hit.streaming.as_ref(),
        );
        debug!(
            entity_id = %entity.unique_id,
            request_id = %request_id,
            url = %request.url,
            "Sending hit"
        );

        let outcome = self.transport.send(request, &mut sink).await;
        match outcome {
            TransportOutcome::Success { status } => {
                sink.complete();
                self.retry.clear(&entity.unique_id);
                info!(entity_id = %entity.unique_id, request_id = %request_id, status, "Hit delivered");
                HitDisposition::Completed
            }
            TransportOutcome::Retryable {
                status,
                retry_after,
                reason,
                body,
            } => {
                drop(sink);
                if let Some(body) = body.as_deref() {
                    self.response_handler.process_error(&request_id, status, body);
                }
                self.response_handler.remove_waiting_events(&request_id);
                let interval = self.retry.next_interval(&entity.unique_id, retry_after);
                warn!(
                    entity_id = %entity.unique_id,
                    request_id = %request_id,
                    status = ?status,
                    reason = %reason,
                    retry_in_ms = interval.as_millis() as u64,
                    "Hit delivery failed, will retry"
                );
                HitDisposition::Retry(interval)
            }
            TransportOutcome::Unrecoverable { status, body } => {
                drop(sink);
                self.response_handler.process_error(&request_id, status, &body);
                self.response_handler.remove_waiting_events(&request_id);
                self.retry.clear(&entity.unique_id);
                error!(
                    entity_id = %entity.unique_id,
                    request_id = %request_id,
                    status = ?status,
                    "Hit rejected by the Edge Network, dropping"
                );
                HitDisposition::Dropped(DropReason::Unrecoverable)
            }
        }
    }
}

#[async_trait]
impl HitProcessing for EdgeHitProcessor {
    fn retry_interval(&self, entity: &DataEntity) -> Duration {
        self.retry.interval(&entity.unique_id)
    }

    async fn process_hit(&self, entity: &DataEntity) -> HitDisposition {
        let Some(bytes) = entity.data.as_deref() else {
            warn!(entity_id = %entity.unique_id, "Dropping hit without data");
            return HitDisposition::Dropped(DropReason::Malformed);
        };
        let hit = match QueuedHit::decode(bytes) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(entity_id = %entity.unique_id, error = %e, "Dropping undecodable hit");
                return HitDisposition::Dropped(DropReason::Malformed);
            }
        };

        let (request_id, event, request_type) = match hit {
            QueuedHit::Reset { timestamp } => {
                self.store_payloads.delete_all();
                debug!(entity_id = %entity.unique_id, %timestamp, "Reset applied");
                return HitDisposition::Completed;
            }
            QueuedHit::Experience { request_id, event } => (request_id, event, RequestType::Interact),
            QueuedHit::Consent { request_id, event } => (request_id, event, RequestType::SetConsent),
        };

        match self.privacy.status() {
            PrivacyStatus::OptedIn => {}
            PrivacyStatus::OptedOut => {
                debug!(entity_id = %entity.unique_id, "Privacy opted out, dropping hit");
                return HitDisposition::Dropped(DropReason::PrivacyOptedOut);
            }
            PrivacyStatus::Unknown => return HitDisposition::NotReady,
        }

        match self.prepare(entity, request_id, event, request_type) {
            Ok((hit, request)) => self.send(entity, hit, request).await,
            Err(disposition) => disposition,
        }
    }
}
