use semver::Version;
use slog_scope::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::device::retry::{BackoffStrategy, FixedBackoff, Sleeper, TokioSleeper};
use crate::device::{DeviceProbe, DeviceSession, DeviceVendor};
use crate::error::ConductorError;
use crate::version::extract_version;

/// Tuning of the handshake retry loop and vendor validation.
#[derive(Debug, Clone)]
pub struct HandshakeOptions {
    /// Retry budget of the polling loop.
    pub max_attempts: u32,
    /// When set, a device of any other vendor is rejected.
    pub required_vendor: Option<DeviceVendor>,
    /// Floor for the Cardano app running on a Ledger device.
    pub ledger_minimum_app_version: Version,
    /// Floor for the firmware of a Trezor device.
    pub trezor_minimum_firmware_version: Version,
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            required_vendor: None,
            ledger_minimum_app_version: Version::new(6, 0, 3),
            trezor_minimum_firmware_version: Version::new(2, 6, 0),
        }
    }
}

/// Bounded-retry detection and validation of a connected hardware wallet.
///
/// Polls the device status until it reports an unlocked application or
/// firmware context, classifies the vendor, and checks the vendor-specific
/// version floor. A version shortfall is advisory: it is logged, never
/// fatal, as hardware vendors ship compatible point releases frequently.
///
/// One handshake is single-flight: never run two concurrently against the
/// same device.
pub struct DeviceHandshake {
    options: HandshakeOptions,
    backoff: Box<dyn BackoffStrategy>,
    sleeper: Box<dyn Sleeper>,
}

impl DeviceHandshake {
    pub fn new(options: HandshakeOptions) -> Self {
        Self {
            options,
            backoff: Box::new(FixedBackoff::default()),
            sleeper: Box::new(TokioSleeper),
        }
    }

    pub fn with_backoff(mut self, backoff: Box<dyn BackoffStrategy>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Run the handshake against the given probe.
    ///
    /// The backoff between attempts is cancellable through
    /// `cancellation_token`; cancellation surfaces as
    /// [ConductorError::HandshakeCancelled], distinct from retry-budget
    /// exhaustion.
    pub async fn run(
        &self,
        probe: &dyn DeviceProbe,
        cancellation_token: &CancellationToken,
    ) -> Result<DeviceSession, ConductorError> {
        let mut attempts = 0;
        let status = loop {
            if attempts >= self.options.max_attempts {
                return Err(ConductorError::DeviceUnreachable { attempts });
            }
            attempts += 1;

            match probe.device_status().await {
                Ok(status) if has_app_context_markers(&status) => break status,
                Ok(status) => {
                    info!(
                        "Hardware wallet reachable but not unlocked yet";
                        "status" => status.trim(), "attempt" => attempts
                    );
                }
                Err(error) => {
                    info!(
                        "Hardware wallet not reachable yet";
                        "error" => error.to_string(), "attempt" => attempts
                    );
                }
            }

            if attempts < self.options.max_attempts {
                tokio::select! {
                    biased;
                    _ = cancellation_token.cancelled() => {
                        return Err(ConductorError::HandshakeCancelled);
                    }
                    _ = self.sleeper.sleep(self.backoff.delay(attempts)) => (),
                }
            }
        };

        let vendor = DeviceVendor::classify(&status).ok_or_else(|| {
            ConductorError::UnsupportedDeviceVendor {
                status: status.trim().to_string(),
            }
        })?;
        let reported_version = status
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_string();
        self.log_version_shortfall(vendor, &reported_version);

        if let Some(required) = self.options.required_vendor {
            if vendor != required {
                return Err(ConductorError::DeviceVendorMismatch {
                    detected: vendor,
                    required,
                });
            }
        }

        info!(
            "Hardware wallet handshake succeeded";
            "vendor" => vendor.to_string(), "version" => &reported_version,
            "attempts" => attempts
        );

        Ok(DeviceSession {
            vendor,
            reported_version,
            attempts_used: attempts,
            unlocked: true,
        })
    }

    fn log_version_shortfall(&self, vendor: DeviceVendor, reported_version: &str) {
        let minimum = match vendor {
            DeviceVendor::Ledger => &self.options.ledger_minimum_app_version,
            DeviceVendor::Trezor => &self.options.trezor_minimum_firmware_version,
        };

        match extract_version(reported_version) {
            Some(current) if current >= *minimum => (),
            Some(current) => warn!(
                "Hardware wallet version below the supported floor";
                "vendor" => vendor.to_string(), "current" => current.to_string(),
                "minimum" => minimum.to_string()
            ),
            None => warn!(
                "Could not parse the hardware wallet version";
                "vendor" => vendor.to_string(), "reported" => reported_version
            ),
        }
    }
}

fn has_app_context_markers(status: &str) -> bool {
    let lowered = status.to_lowercase();

    lowered.contains("app version") || lowered.contains("firmware")
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use mockall::Sequence;

    use crate::device::MockDeviceProbe;

    use super::*;

    /// Probe yielding a scripted sequence of responses, then "locked" forever.
    struct ScriptedProbe {
        responses: Mutex<VecDeque<Result<String, ConductorError>>>,
    }

    impl ScriptedProbe {
        fn new(responses: Vec<Result<String, ConductorError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
            }
        }

        fn locked_then_unlocked(locked_polls: u32, unlocked_status: &str) -> Self {
            let mut responses: Vec<_> = (0..locked_polls)
                .map(|_| Ok("locked".to_string()))
                .collect();
            responses.push(Ok(unlocked_status.to_string()));

            Self::new(responses)
        }
    }

    #[async_trait]
    impl DeviceProbe for ScriptedProbe {
        async fn device_status(&self) -> Result<String, ConductorError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("locked".to_string()))
        }
    }

    /// Sleeper without wall-clock delay, counting how often it was awaited.
    #[derive(Default)]
    struct InstantSleeper {
        sleep_count: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Sleeper for InstantSleeper {
        async fn sleep(&self, _duration: Duration) {
            self.sleep_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn handshake(options: HandshakeOptions) -> (DeviceHandshake, Arc<AtomicU32>) {
        let sleeper = InstantSleeper::default();
        let sleep_count = sleeper.sleep_count.clone();
        let handshake = DeviceHandshake::new(options).with_sleeper(Box::new(sleeper));

        (handshake, sleep_count)
    }

    #[tokio::test]
    async fn unlock_on_the_last_attempt_succeeds() {
        let probe = ScriptedProbe::locked_then_unlocked(
            9,
            "Ledger Nano S Plus unlocked, app version 6.1.2",
        );
        let (handshake, sleep_count) = handshake(HandshakeOptions::default());

        let session = handshake
            .run(&probe, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(10, session.attempts_used);
        assert_eq!(DeviceVendor::Ledger, session.vendor);
        assert_eq!("6.1.2", session.reported_version);
        assert!(session.unlocked);
        // no backoff after the final, successful poll
        assert_eq!(9, sleep_count.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn exhausted_retry_budget_is_unreachable() {
        let probe = ScriptedProbe::new(vec![]);
        let (handshake, sleep_count) = handshake(HandshakeOptions::default());

        match handshake.run(&probe, &CancellationToken::new()).await {
            Err(ConductorError::DeviceUnreachable { attempts }) => {
                assert_eq!(10, attempts)
            }
            other => panic!("expected DeviceUnreachable, got {other:?}"),
        }
        // no backoff after the last poll of the budget
        assert_eq!(9, sleep_count.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn probe_failures_consume_attempts_too() {
        let mut probe = MockDeviceProbe::new();
        let mut sequence = Sequence::new();
        probe
            .expect_device_status()
            .times(2)
            .in_sequence(&mut sequence)
            .returning(|| {
                Err(ConductorError::CommandFailed {
                    argv: vec!["cardano-hw-cli".to_string()],
                    diagnostic: "no device connected".to_string(),
                })
            });
        probe
            .expect_device_status()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Ok("Trezor Model T firmware 2.6.4".to_string()));
        let (handshake, _) = handshake(HandshakeOptions::default());

        let session = handshake
            .run(&probe, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(3, session.attempts_used);
        assert_eq!(DeviceVendor::Trezor, session.vendor);
        assert_eq!("2.6.4", session.reported_version);
    }

    #[tokio::test]
    async fn unknown_vendor_is_rejected() {
        let probe =
            ScriptedProbe::new(vec![Ok("generic usb token app version 1.0.0".to_string())]);
        let (handshake, _) = handshake(HandshakeOptions::default());

        match handshake.run(&probe, &CancellationToken::new()).await {
            Err(ConductorError::UnsupportedDeviceVendor { status }) => {
                assert_eq!("generic usb token app version 1.0.0", status)
            }
            other => panic!("expected UnsupportedDeviceVendor, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn vendor_mismatch_names_both_vendors() {
        let probe = ScriptedProbe::new(vec![Ok(
            "Ledger Nano S Plus unlocked, app version 6.1.2".to_string()
        )]);
        let (handshake, _) = handshake(HandshakeOptions {
            required_vendor: Some(DeviceVendor::Trezor),
            ..Default::default()
        });

        match handshake.run(&probe, &CancellationToken::new()).await {
            Err(ConductorError::DeviceVendorMismatch { detected, required }) => {
                assert_eq!(DeviceVendor::Ledger, detected);
                assert_eq!(DeviceVendor::Trezor, required);
            }
            other => panic!("expected DeviceVendorMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn version_shortfall_is_advisory_only() {
        let probe = ScriptedProbe::new(vec![Ok(
            "Ledger Nano S Plus unlocked, app version 1.0.0".to_string()
        )]);
        let (handshake, _) = handshake(HandshakeOptions::default());

        let session = handshake
            .run(&probe, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!("1.0.0", session.reported_version);
        assert!(session.unlocked);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_backoff() {
        let probe = ScriptedProbe::new(vec![]);
        let (handshake, _) = handshake(HandshakeOptions::default());
        let cancellation_token = CancellationToken::new();
        cancellation_token.cancel();

        match handshake.run(&probe, &cancellation_token).await {
            Err(ConductorError::HandshakeCancelled) => (),
            other => panic!("expected HandshakeCancelled, got {other:?}"),
        }
    }
}
