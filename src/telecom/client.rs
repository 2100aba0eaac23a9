//! Client for the remote network capability provider.
//!
//! A connectivity probe at construction picks live or demo mode. In demo mode
//! every capability is served by the simulator. In live mode a failed call
//! (non-2xx, malformed body, timeout, transport error) is answered by the
//! simulator too, so callers always get a well-formed response.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::capability::*;
use super::simulator::SimulatedResponseGenerator;
use crate::config::TelecomConfig;
use crate::error::Result;
use crate::models::ApiMode;
use crate::utils::SimRng;

const NO_RESPONSE_YET: u64 = u64::MAX;

/// Why a live call was abandoned. Never leaves this module.
#[derive(Debug, Error)]
enum CallFailure {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned {0}")]
    Status(StatusCode),
    #[error("bad endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

/// Last observed health of one capability.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityHealth {
    pub capability: Capability,
    pub active: bool,
    pub last_check: DateTime<Utc>,
    pub last_response_ms: Option<u64>,
}

pub struct RemoteCapabilityClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    config: TelecomConfig,
    demo_mode: AtomicBool,
    last_response_ms: AtomicU64,
    health: DashMap<Capability, CapabilityHealth>,
    simulator: SimulatedResponseGenerator,
}

impl RemoteCapabilityClient {
    /// Build the client and probe the provider once to select the mode.
    pub async fn connect(config: &TelecomConfig, rng: SimRng) -> Result<Self> {
        let client = Self::build(config, rng, false)?;
        client.test_connection().await;
        Ok(client)
    }

    /// A client pinned to demo mode. No network traffic until re-tested.
    pub fn demo(config: &TelecomConfig, rng: SimRng) -> Result<Self> {
        Self::build(config, rng, true)
    }

    fn build(config: &TelecomConfig, rng: SimRng, demo_mode: bool) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
            config: config.clone(),
            demo_mode: AtomicBool::new(demo_mode),
            last_response_ms: AtomicU64::new(NO_RESPONSE_YET),
            health: DashMap::new(),
            simulator: SimulatedResponseGenerator::new(rng),
        })
    }

    pub fn mode(&self) -> ApiMode {
        if self.demo_mode.load(Ordering::Acquire) {
            ApiMode::Demo
        } else {
            ApiMode::Live
        }
    }

    pub fn is_demo(&self) -> bool {
        self.mode() == ApiMode::Demo
    }

    /// Latency of the most recent live call, if any has completed.
    pub fn last_response_time_ms(&self) -> Option<u64> {
        match self.last_response_ms.load(Ordering::Relaxed) {
            NO_RESPONSE_YET => None,
            ms => Some(ms),
        }
    }

    /// Per-capability health in a stable order. Empty until a probe succeeds.
    pub fn capability_health(&self) -> Vec<CapabilityHealth> {
        Capability::ALL
            .iter()
            .filter_map(|capability| self.health.get(capability).map(|h| h.clone()))
            .collect()
    }

    pub fn simulator(&self) -> &SimulatedResponseGenerator {
        &self.simulator
    }

    /// Probe the provider and set the mode accordingly.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn test_connection(&self) -> ApiMode {
        let probe = self
            .endpoint(Capability::NumberVerification)
            .map(|url| {
                self.authorized(self.http.get(url))
                    .query(&[("phoneNumber", self.config.probe_phone.as_str())])
                    .timeout(self.config.probe_timeout())
            });

        let outcome = match probe {
            Ok(request) => request.send().await.map_err(CallFailure::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) if response.status().is_success() => {
                self.demo_mode.store(false, Ordering::Release);
                let now = Utc::now();
                for capability in Capability::ALL {
                    self.health.insert(
                        capability,
                        CapabilityHealth {
                            capability,
                            active: true,
                            last_check: now,
                            last_response_ms: None,
                        },
                    );
                }
                info!("capability provider reachable, running live");
            }
            Ok(response) => {
                self.demo_mode.store(true, Ordering::Release);
                self.health.clear();
                warn!(status = %response.status(), "provider probe rejected, enabling demo mode");
            }
            Err(e) => {
                self.demo_mode.store(true, Ordering::Release);
                self.health.clear();
                warn!(error = %e, "provider probe failed, enabling demo mode");
            }
        }

        self.mode()
    }

    // ===== Capabilities =====

    pub async fn number_verification(
        &self,
        phone_number: &str,
    ) -> CapabilityResponse<NumberVerification> {
        if !self.is_demo() {
            if let Some(response) = self.get(&[("phoneNumber", phone_number)]).await {
                return response;
            }
        }
        self.simulator.number_verification(phone_number)
    }

    pub async fn sim_swap_check(&self, phone_number: &str) -> CapabilityResponse<SimSwap> {
        if !self.is_demo() {
            if let Some(response) = self.get(&[("phoneNumber", phone_number)]).await {
                return response;
            }
        }
        self.simulator.sim_swap(phone_number)
    }

    pub async fn device_reachability(
        &self,
        device_id: &str,
    ) -> CapabilityResponse<DeviceReachability> {
        if !self.is_demo() {
            if let Some(response) = self.get(&[("deviceId", device_id)]).await {
                return response;
            }
        }
        self.simulator.device_reachability(device_id)
    }

    pub async fn location(&self, device_id: &str) -> CapabilityResponse<DeviceLocation> {
        if !self.is_demo() {
            if let Some(response) = self.get(&[("deviceId", device_id)]).await {
                return response;
            }
        }
        self.simulator.location(device_id)
    }

    pub async fn quality_on_demand(&self, device_id: &str) -> CapabilityResponse<QualityOnDemand> {
        if !self.is_demo() {
            let body = QualityOnDemandRequest {
                device_id,
                profile: EMERGENCY_QOS_PROFILE,
                duration: EMERGENCY_QOS_DURATION_SECS,
            };
            if let Some(response) = self.post(&body).await {
                return response;
            }
        }
        self.simulator
            .quality_on_demand(device_id, EMERGENCY_QOS_PROFILE, EMERGENCY_QOS_DURATION_SECS)
    }

    pub async fn congestion_insights(
        &self,
        area_code: &str,
    ) -> CapabilityResponse<CongestionInsight> {
        if !self.is_demo() {
            if let Some(response) = self.get(&[("area", area_code)]).await {
                return response;
            }
        }
        self.simulator.congestion_insights(area_code)
    }

    pub async fn create_geofence(
        &self,
        device_id: &str,
        latitude: f64,
        longitude: f64,
        radius: u32,
    ) -> CapabilityResponse<Geofence> {
        if !self.is_demo() {
            let body = GeofenceRequest {
                device_id,
                latitude,
                longitude,
                radius,
                alert_type: "EMERGENCY_MOVEMENT",
            };
            if let Some(response) = self.post(&body).await {
                return response;
            }
        }
        self.simulator.geofence(device_id, radius)
    }

    // ===== Transport =====

    fn endpoint(&self, capability: Capability) -> std::result::Result<Url, CallFailure> {
        Ok(self.base_url.join(capability.endpoint())?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn get<T: CapabilityPayload>(
        &self,
        query: &[(&str, &str)],
    ) -> Option<CapabilityResponse<T>> {
        let request = self
            .endpoint(T::CAPABILITY)
            .map(|url| self.authorized(self.http.get(url)).query(query));
        self.execute(request).await
    }

    async fn post<T: CapabilityPayload, B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> Option<CapabilityResponse<T>> {
        let request = self
            .endpoint(T::CAPABILITY)
            .map(|url| self.authorized(self.http.post(url)).json(body));
        self.execute(request).await
    }

    async fn execute<T: CapabilityPayload>(
        &self,
        request: std::result::Result<RequestBuilder, CallFailure>,
    ) -> Option<CapabilityResponse<T>> {
        let capability = T::CAPABILITY;
        let started = Instant::now();
        let outcome = match request {
            Ok(request) => self.send::<T>(request).await,
            Err(e) => Err(e),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.record(capability, outcome.is_ok(), elapsed_ms);

        match outcome {
            Ok(data) => {
                debug!(%capability, elapsed_ms, "live capability call succeeded");
                Some(CapabilityResponse {
                    source: Source::Live,
                    response_time_ms: elapsed_ms,
                    timestamp: Utc::now(),
                    data,
                })
            }
            Err(e) => {
                warn!(
                    %capability,
                    elapsed_ms,
                    error = %e,
                    "live capability call failed, using simulated response"
                );
                None
            }
        }
    }

    async fn send<T: CapabilityPayload>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<T, CallFailure> {
        let response = request
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallFailure::Status(status));
        }

        Ok(response.json::<T>().await?)
    }

    fn record(&self, capability: Capability, success: bool, elapsed_ms: u64) {
        self.last_response_ms.store(elapsed_ms, Ordering::Relaxed);
        self.health.insert(
            capability,
            CapabilityHealth {
                capability,
                active: success,
                last_check: Utc::now(),
                last_response_ms: Some(elapsed_ms),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::BTreeSet;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> TelecomConfig {
        TelecomConfig {
            base_url: server.uri(),
            api_key: Some("test-key".into()),
            probe_timeout_ms: 500,
            request_timeout_ms: 200,
            probe_phone: "+1234567890".into(),
        }
    }

    fn verification_body() -> Value {
        json!({
            "verified": true,
            "carrier": "Telia",
            "country": "SE",
            "numberType": "MOBILE",
            "riskScore": 3
        })
    }

    async fn live_client(server: &MockServer) -> RemoteCapabilityClient {
        Mock::given(method("GET"))
            .and(path("/number-verification"))
            .and(query_param("phoneNumber", "+1234567890"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verification_body()))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(server)
            .await;

        let client = RemoteCapabilityClient::connect(&config_for(server), SimRng::seeded(1))
            .await
            .unwrap();
        assert_eq!(client.mode(), ApiMode::Live);
        client
    }

    fn keys(value: &Value) -> BTreeSet<String> {
        value.as_object().expect("object").keys().cloned().collect()
    }

    #[tokio::test]
    async fn successful_probe_selects_live_mode() {
        let server = MockServer::start().await;
        let client = live_client(&server).await;

        assert_eq!(client.capability_health().len(), Capability::ALL.len());
        assert!(client.capability_health().iter().all(|h| h.active));
    }

    #[tokio::test]
    async fn live_response_is_parsed_and_tagged() {
        let server = MockServer::start().await;
        let client = live_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/number-verification"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verification_body()))
            .mount(&server)
            .await;

        let response = client.number_verification("+46700000000").await;
        assert_eq!(response.source, Source::Live);
        assert_eq!(response.data.carrier, "Telia");
        assert!(client.last_response_time_ms().is_some());
    }

    #[tokio::test]
    async fn rejected_probe_enables_demo_mode_for_good() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = RemoteCapabilityClient::connect(&config_for(&server), SimRng::seeded(1))
            .await
            .unwrap();
        assert_eq!(client.mode(), ApiMode::Demo);

        let response = client.device_reachability("d1").await;
        assert_eq!(response.source, Source::Simulated);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1, "demo mode must not touch the network");
    }

    #[tokio::test]
    async fn unreachable_provider_enables_demo_mode() {
        let config = TelecomConfig {
            base_url: "http://127.0.0.1:9".into(),
            probe_timeout_ms: 200,
            ..TelecomConfig::default()
        };
        let client = RemoteCapabilityClient::connect(&config, SimRng::seeded(1)).await.unwrap();
        assert!(client.is_demo());
        assert!(client.capability_health().is_empty());
    }

    #[tokio::test]
    async fn retest_recovers_live_mode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        let client = RemoteCapabilityClient::connect(&config_for(&server), SimRng::seeded(1))
            .await
            .unwrap();
        assert!(client.is_demo());

        Mock::given(method("GET"))
            .and(path("/number-verification"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verification_body()))
            .mount(&server)
            .await;
        assert_eq!(client.test_connection().await, ApiMode::Live);
    }

    #[tokio::test]
    async fn retest_into_demo_forgets_live_health() {
        let server = MockServer::start().await;
        let client = live_client(&server).await;
        assert_eq!(client.capability_health().len(), Capability::ALL.len());

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        assert_eq!(client.test_connection().await, ApiMode::Demo);
        assert!(client.capability_health().is_empty());
    }

    #[tokio::test]
    async fn failing_calls_fall_back_without_leaving_live_mode() {
        let server = MockServer::start().await;
        let client = live_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/device-status"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/congestion"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/qod"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(1_000)),
            )
            .mount(&server)
            .await;

        assert!(client.device_reachability("d1").await.is_simulated());
        assert!(client.congestion_insights("NYC").await.is_simulated());
        assert!(client.quality_on_demand("d1").await.is_simulated());
        assert_eq!(client.mode(), ApiMode::Live);

        let unhealthy: Vec<_> = client
            .capability_health()
            .into_iter()
            .filter(|h| !h.active)
            .map(|h| h.capability)
            .collect();
        assert_eq!(
            unhealthy,
            vec![
                Capability::DeviceReachability,
                Capability::QualityOnDemand,
                Capability::CongestionInsights
            ]
        );
    }

    #[tokio::test]
    async fn simulated_and_live_share_one_schema() {
        let server = MockServer::start().await;
        let client = live_client(&server).await;
        Mock::given(method("GET"))
            .and(path("/location"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "location": {
                    "latitude": 59.33,
                    "longitude": 18.06,
                    "accuracy": 12,
                    "movement": "STATIONARY"
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/geofencing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fenceId": "fence_live",
                "status": "ACTIVE",
                "radius": 100,
                "alertsEnabled": true
            })))
            .mount(&server)
            .await;

        let live = serde_json::to_value(client.location("d1").await).unwrap();
        let simulated = serde_json::to_value(client.simulator().location("d1")).unwrap();
        assert_eq!(live["source"], "live");
        assert_eq!(simulated["source"], "simulated");
        assert_eq!(keys(&live), keys(&simulated));
        assert_eq!(keys(&live["location"]), keys(&simulated["location"]));

        let fence = client.create_geofence("d1", 59.33, 18.06, 100).await;
        let live = serde_json::to_value(fence).unwrap();
        let simulated = serde_json::to_value(client.simulator().geofence("d1", 100)).unwrap();
        assert_eq!(live["fenceId"], "fence_live");
        assert_eq!(keys(&live), keys(&simulated));
    }
}
