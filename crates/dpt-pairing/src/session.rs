//! Registration session driver.
//!
//! Runs a [`Registration`] against a device through a [`Transport`]: cleanup,
//! the four protocol round trips, cleanup again.

use crate::registration::{FailureReason, Registration};
use crate::result::RegistrationResult;
use crate::traits::{IdentityIssuer, PairingHandler, RsaIdentityIssuer, Transport};
use dpt_core::config::{EndpointConfig, HttpMethod, PairingConfig};
use dpt_core::error::{Error, Result};
use dpt_core::step::Step;
use dpt_crypto::identity::new_client_id;
use std::future::Future;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// High-level session that registers this client with one device.
pub struct PairingSession<T, H, I = RsaIdentityIssuer> {
    transport: T,
    handler: H,
    issuer: I,
    config: PairingConfig,
}

impl<T: Transport, H: PairingHandler> PairingSession<T, H> {
    /// Create a session with default configuration and RSA key issuance.
    pub fn new(transport: T, handler: H) -> Self {
        Self {
            transport,
            handler,
            issuer: RsaIdentityIssuer,
            config: PairingConfig::default(),
        }
    }
}

impl<T: Transport, H: PairingHandler, I: IdentityIssuer> PairingSession<T, H, I> {
    /// Replace the configuration.
    pub fn with_config(mut self, config: PairingConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the source of client key pairs.
    pub fn with_issuer<J: IdentityIssuer>(self, issuer: J) -> PairingSession<T, H, J> {
        PairingSession {
            transport: self.transport,
            handler: self.handler,
            issuer,
            config: self.config,
        }
    }

    pub fn config(&self) -> &PairingConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run a full registration.
    pub async fn pair(&mut self) -> Result<RegistrationResult> {
        self.pair_until(std::future::pending::<()>()).await
    }

    /// Run a full registration unless `shutdown` completes first.
    ///
    /// On shutdown the in-flight step is dropped, cleanup is still sent to the
    /// device and [`Error::Cancelled`] is returned. A blocking PIN prompt is
    /// not interrupted; shutdown is observed once it returns.
    pub async fn pair_until<F>(&mut self, shutdown: F) -> Result<RegistrationResult>
    where
        F: Future<Output = ()>,
    {
        info!(port = self.config.port, "Starting device registration");
        self.handler.on_pairing_started();

        let mut registration = Registration::new(&self.config);
        let outcome = tokio::select! {
            result = self.run(&mut registration) => result,
            _ = shutdown => Err(Error::Cancelled),
        };

        let outcome = match outcome {
            Ok(()) => {
                if self.config.cleanup_after {
                    self.cleanup().await;
                }
                registration.finish()
            }
            Err(error) => {
                registration.abort(FailureReason::from(&error));
                if matches!(error, Error::Cancelled) || self.config.cleanup_after {
                    self.cleanup().await;
                }
                Err(error)
            }
        };
        self.handler.on_state_changed(&registration.state());

        match &outcome {
            Ok(result) => {
                info!(client_id = %result.client_id, "Device registration complete");
                self.handler.on_pairing_complete();
            }
            Err(error) => {
                warn!(%error, state = ?registration.state(), "Device registration failed");
                self.handler.on_pairing_failed(error);
            }
        }
        outcome
    }

    async fn run(&mut self, registration: &mut Registration) -> Result<()> {
        let endpoints = self.config.endpoints.clone();

        self.cleanup().await;

        info!("Requesting PIN from device");
        let challenge = send(&mut self.transport, Step::PinRequest, &endpoints.pin, &[]).await?;
        let hash_request = registration.start_key_exchange(&challenge)?;
        self.state_changed(registration);

        let hash_response =
            send(&mut self.transport, Step::HashExchange, &endpoints.hash, &hash_request).await?;
        registration.process_hash_response(&hash_response)?;
        self.state_changed(registration);

        let pin = self.read_pin();
        let ca_request = registration.build_ca_request(&pin)?;
        drop(pin);

        let ca_response =
            send(&mut self.transport, Step::CaRegistration, &endpoints.ca, &ca_request).await?;
        registration.process_ca_response(&ca_response)?;
        self.state_changed(registration);

        let issuer = &self.issuer;
        let identity = run_blocking(|| issuer.issue())?;
        let client_id = new_client_id();
        debug!(%client_id, "Client identity issued");

        let register_request = registration.build_registration_request(&client_id, identity)?;
        send(
            &mut self.transport,
            Step::DeviceRegistration,
            &endpoints.register,
            &register_request,
        )
        .await?;
        registration.confirm_registration()?;
        self.state_changed(registration);

        Ok(())
    }

    /// Best-effort reset of half-finished registrations on the device.
    async fn cleanup(&mut self) {
        let endpoint = self.config.endpoints.cleanup.clone();
        match send(&mut self.transport, Step::Cleanup, &endpoint, &[]).await {
            Ok(_) => debug!("Device registration state reset"),
            Err(error) => warn!(%error, "Cleanup failed, continuing"),
        }
    }

    fn read_pin(&self) -> Zeroizing<String> {
        info!("Waiting for the PIN shown on the device screen");
        let handler = &self.handler;
        Zeroizing::new(run_blocking(|| handler.on_pin_required()))
    }

    fn state_changed(&self, registration: &Registration) {
        let state = registration.state();
        info!(?state, "Registration state changed");
        self.handler.on_state_changed(&state);
    }
}

async fn send<T: Transport>(
    transport: &mut T,
    step: Step,
    endpoint: &EndpointConfig,
    body: &[u8],
) -> Result<Vec<u8>> {
    debug!(%step, path = %endpoint.path, method = ?endpoint.method, len = body.len(), "Sending request");
    let response = match endpoint.method {
        HttpMethod::Get => transport.get(&endpoint.path).await?,
        HttpMethod::Post => transport.post(&endpoint.path, body).await?,
        HttpMethod::Put => transport.put(&endpoint.path, body).await?,
    };
    debug!(%step, len = response.len(), "Received response");
    Ok(response)
}

/// Run blocking work without stalling the other tasks of a multi-thread
/// runtime.
fn run_blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}
