//! Generic façade over a device that is driven through one-shot HTTP GETs.
//!
//! A command renders its URL, records an in-progress [`Status`], and spawns
//! the request on the tokio runtime the device was built in (or the caller's,
//! if it has one). The façade keeps no handle to the spawned task; the outcome
//! only becomes visible through [`Device::status`] and [`Device::telemetry`].
//! Overlapping commands are not ordered: whichever request settles last
//! decides the final state.

use log::{debug, error, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::client::{Transport, TransportError};
use crate::config::Timeouts;
use crate::models::Telemetry;

mod status;

pub use status::Status;

/// Body substring a device answers with when it accepted a command.
const ACK_MARKER: &str = "OK";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePolicy {
    /// Plain-text acknowledgement; success when the body contains `OK`.
    Acknowledge,
    /// JSON sensor snapshot parsed into the device's telemetry.
    Poll,
}

/// One row of a device's command table.
#[derive(Debug)]
pub struct CommandSpec {
    pub opcode: &'static str,
    /// Path and query, with `{ARG}` placeholders for block arguments.
    pub path: &'static str,
    pub progress: Status,
    pub timeout: TimeoutClass,
    pub policy: ResponsePolicy,
    pub failure: Status,
    /// Settle without a request while the address is still the placeholder.
    pub skip_unconfigured: bool,
}

impl CommandSpec {
    pub fn render_url(&self, address: &str, params: &[(&str, &str)]) -> String {
        let mut path = self.path.to_string();
        for (name, value) in params {
            path = path.replace(&format!("{{{}}}", name), value);
        }
        format!("http://{}{}", address, path)
    }
}

/// Outcome of a dispatched command. Dropping it leaves the request running.
pub struct Pending(Inner);

enum Inner {
    Settled(Status),
    InFlight(JoinHandle<Status>),
}

impl Pending {
    /// Waits for the request to settle and returns the status it left behind.
    pub async fn settled(self) -> Status {
        match self.0 {
            Inner::Settled(status) => status,
            Inner::InFlight(handle) => handle.await.unwrap_or_else(|e| {
                error!("Device request task failed: {}", e);
                Status::Failed
            }),
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Inner::Settled(status) => f.debug_tuple("Settled").field(status).finish(),
            Inner::InFlight(_) => f.write_str("InFlight"),
        }
    }
}

struct Shared<T> {
    status: Status,
    telemetry: T,
}

fn lock<T>(shared: &Mutex<Shared<T>>) -> MutexGuard<'_, Shared<T>> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Device<T: Telemetry, C: Transport> {
    address: String,
    timeouts: Timeouts,
    transport: Arc<C>,
    runtime: Option<Handle>,
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T: Telemetry, C: Transport> Device<T, C> {
    pub fn new(transport: Arc<C>, address: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            address: address.into(),
            timeouts,
            transport,
            runtime: Handle::try_current().ok(),
            shared: Arc::new(Mutex::new(Shared {
                status: Status::Idle,
                telemetry: T::default(),
            })),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Stored verbatim; nothing is sent to the device.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = address.into();
        debug!("Device address set to {}", self.address);
    }

    /// Any `x` in the address is read as the unfilled placeholder.
    pub fn is_configured(&self) -> bool {
        !self.address.contains('x')
    }

    pub fn status(&self) -> Status {
        lock(&self.shared).status
    }

    pub fn telemetry(&self) -> T {
        lock(&self.shared).telemetry.clone()
    }

    pub fn dispatch(&self, spec: &'static CommandSpec, params: &[(&str, &str)]) -> Pending {
        if spec.skip_unconfigured && !self.is_configured() {
            debug!("{}: device address not configured, skipping request", spec.opcode);
            let mut state = lock(&self.shared);
            state.telemetry = T::default();
            return Pending(Inner::Settled(state.status));
        }

        let url = spec.render_url(&self.address, params);
        let timeout = match spec.timeout {
            TimeoutClass::Short => self.timeouts.short,
            TimeoutClass::Long => self.timeouts.long,
        };
        debug!("{}: GET {} (timeout {:?})", spec.opcode, url, timeout);

        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            error!("{}: no tokio runtime to send {} on", spec.opcode, url);
            let mut state = lock(&self.shared);
            state.telemetry = T::default();
            state.status = spec.failure;
            return Pending(Inner::Settled(spec.failure));
        };

        lock(&self.shared).status = spec.progress;

        let transport = Arc::clone(&self.transport);
        let shared = Arc::clone(&self.shared);
        let handle = runtime.spawn(async move {
            let outcome = transport.get(url, timeout).await;
            settle(&shared, spec, outcome)
        });

        Pending(Inner::InFlight(handle))
    }
}

/// Folds a finished request into the shared state. Never fails.
fn settle<T: Telemetry>(
    shared: &Mutex<Shared<T>>,
    spec: &CommandSpec,
    outcome: Result<String, TransportError>,
) -> Status {
    let mut state = lock(shared);

    let status = match (outcome, spec.policy) {
        (Err(e), _) => {
            warn!("{}: request failed: {}", spec.opcode, e);
            state.telemetry = T::default();
            spec.failure
        }
        (Ok(body), ResponsePolicy::Acknowledge) => {
            if body.contains(ACK_MARKER) {
                Status::Completed
            } else {
                warn!("{}: device did not acknowledge: {:?}", spec.opcode, body);
                spec.failure
            }
        }
        (Ok(body), ResponsePolicy::Poll) => match T::from_body(&body) {
            Ok(telemetry) => {
                state.telemetry = telemetry;
                Status::Completed
            }
            Err(e) => {
                warn!("{}: {}", spec.opcode, e);
                state.telemetry = T::default();
                spec.failure
            }
        },
    };

    state.status = status;
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::scripted::ScriptedTransport;
    use crate::models::car::{CarTelemetry, IrState};
    use std::time::Duration;

    static ACK: CommandSpec = CommandSpec {
        opcode: "ack",
        path: "/cmd?a={A}&n={N}",
        progress: Status::Sending,
        timeout: TimeoutClass::Short,
        policy: ResponsePolicy::Acknowledge,
        failure: Status::Failed,
        skip_unconfigured: false,
    };

    static SLOW_ACK: CommandSpec = CommandSpec {
        opcode: "slow",
        path: "/slow",
        progress: Status::Receiving,
        timeout: TimeoutClass::Long,
        policy: ResponsePolicy::Acknowledge,
        failure: Status::Failed,
        skip_unconfigured: false,
    };

    static POLL: CommandSpec = CommandSpec {
        opcode: "poll",
        path: "/update_d",
        progress: Status::Receiving,
        timeout: TimeoutClass::Short,
        policy: ResponsePolicy::Poll,
        failure: Status::UpdateFailed,
        skip_unconfigured: false,
    };

    static GUARDED_POLL: CommandSpec = CommandSpec {
        opcode: "guarded",
        path: "/update",
        progress: Status::SensorUpdating,
        timeout: TimeoutClass::Short,
        policy: ResponsePolicy::Poll,
        failure: Status::UpdateFailed,
        skip_unconfigured: true,
    };

    fn device(transport: &ScriptedTransport) -> Device<CarTelemetry, ScriptedTransport> {
        Device::new(Arc::new(transport.clone()), "10.0.0.7", Timeouts::default())
    }

    #[test]
    fn test_render_url() {
        assert_eq!(
            ACK.render_url("10.0.0.7", &[("A", "RIGHT"), ("N", "300")]),
            "http://10.0.0.7/cmd?a=RIGHT&n=300"
        );
        assert_eq!(POLL.render_url("car.local:8080", &[]), "http://car.local:8080/update_d");
    }

    #[test]
    fn test_new_device_starts_idle_with_sentinels() {
        let device = device(&ScriptedTransport::new());
        assert_eq!(device.status(), Status::Idle);
        assert_eq!(device.telemetry(), CarTelemetry::default());
    }

    #[tokio::test]
    async fn test_progress_label_visible_until_settled() {
        let transport = ScriptedTransport::new();
        let gate = transport.gate();
        let device = device(&transport);

        let pending = device.dispatch(&ACK, &[("A", "GO"), ("N", "1")]);
        assert_eq!(device.status(), Status::Sending);

        gate.send(Ok("OK".to_string())).unwrap();
        assert_eq!(pending.settled().await, Status::Completed);
        assert_eq!(device.status(), Status::Completed);
    }

    #[tokio::test]
    async fn test_acknowledgement_needs_ok_substring() {
        let transport = ScriptedTransport::new();
        transport.reply("result: OK\n").reply("ERR");
        let device = device(&transport);

        assert_eq!(device.dispatch(&ACK, &[]).settled().await, Status::Completed);
        assert_eq!(device.dispatch(&ACK, &[]).settled().await, Status::Failed);
    }

    #[tokio::test]
    async fn test_timeout_classes() {
        let transport = ScriptedTransport::new();
        transport.reply("OK").reply("OK");
        let timeouts = Timeouts {
            short: Duration::from_millis(10),
            long: Duration::from_millis(20),
        };
        let device: Device<CarTelemetry, _> =
            Device::new(Arc::new(transport.clone()), "h", timeouts);

        device.dispatch(&ACK, &[]).settled().await;
        device.dispatch(&SLOW_ACK, &[]).settled().await;

        let requested: Vec<Duration> = transport.requests().into_iter().map(|(_, t)| t).collect();
        assert_eq!(requested, vec![timeouts.short, timeouts.long]);
    }

    #[tokio::test]
    async fn test_poll_replaces_telemetry() {
        let transport = ScriptedTransport::new();
        transport.reply(r#"{"d": 42, "r": "L", "l": "N"}"#);
        let device = device(&transport);

        assert_eq!(device.dispatch(&POLL, &[]).settled().await, Status::Completed);
        let telemetry = device.telemetry();
        assert_eq!(telemetry.distance, 42.0);
        assert_eq!(telemetry.right_ir, IrState::Detected);
        assert_eq!(telemetry.left_ir, IrState::NotDetected);
    }

    #[tokio::test]
    async fn test_invalid_poll_resets_telemetry() {
        let transport = ScriptedTransport::new();
        transport.reply(r#"{"d": 42, "r": "L", "l": "L"}"#).reply(r#"{"d": -1}"#);
        let device = device(&transport);

        device.dispatch(&POLL, &[]).settled().await;
        assert_eq!(device.dispatch(&POLL, &[]).settled().await, Status::UpdateFailed);
        assert_eq!(device.telemetry(), CarTelemetry::default());
    }

    #[tokio::test]
    async fn test_transport_failure_resets_telemetry() {
        let transport = ScriptedTransport::new();
        transport
            .reply(r#"{"d": 42, "r": "L", "l": "L"}"#)
            .time_out()
            .reply(r#"{"d": 12, "r": "L", "l": "L"}"#)
            .time_out();
        let device = device(&transport);

        device.dispatch(&POLL, &[]).settled().await;
        assert_eq!(device.dispatch(&ACK, &[]).settled().await, Status::Failed);
        assert_eq!(device.telemetry(), CarTelemetry::default());

        device.dispatch(&POLL, &[]).settled().await;
        assert_eq!(device.dispatch(&POLL, &[]).settled().await, Status::UpdateFailed);
        assert_eq!(device.telemetry(), CarTelemetry::default());
    }

    #[tokio::test]
    async fn test_ack_without_ok_keeps_telemetry() {
        let transport = ScriptedTransport::new();
        transport.reply(r#"{"d": 42, "r": "L", "l": "L"}"#).reply("ERR");
        let device = device(&transport);

        device.dispatch(&POLL, &[]).settled().await;
        assert_eq!(device.dispatch(&ACK, &[]).settled().await, Status::Failed);
        assert_eq!(device.telemetry().distance, 42.0);
    }

    #[tokio::test]
    async fn test_unconfigured_poll_skips_request() {
        let transport = ScriptedTransport::new();
        let device: Device<CarTelemetry, _> =
            Device::new(Arc::new(transport.clone()), "192.168.x.x", Timeouts::default());

        assert!(!device.is_configured());
        assert_eq!(device.dispatch(&GUARDED_POLL, &[]).settled().await, Status::Idle);
        assert!(transport.requests().is_empty());
        assert_eq!(device.telemetry(), CarTelemetry::default());
    }

    #[tokio::test]
    async fn test_unguarded_poll_ignores_placeholder_check() {
        let transport = ScriptedTransport::new();
        transport.reply(r#"{"d": 8}"#);
        let device: Device<CarTelemetry, _> =
            Device::new(Arc::new(transport.clone()), "robotx.local", Timeouts::default());

        assert!(!device.is_configured());
        assert_eq!(device.dispatch(&POLL, &[]).settled().await, Status::Completed);
        assert_eq!(transport.urls(), vec!["http://robotx.local/update_d".to_string()]);
    }

    #[test]
    fn test_dispatch_outside_runtime_fails_without_panicking() {
        let transport = ScriptedTransport::new();
        let device = device(&transport);

        let pending = device.dispatch(&ACK, &[]);
        assert_eq!(device.status(), Status::Failed);
        assert_eq!(format!("{:?}", pending), "Settled(Failed)");
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_dispatch_from_plain_thread_uses_stored_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = ScriptedTransport::new();
        transport.reply("OK");
        let device = runtime.block_on(async { device(&transport) });

        let (pending, device) = std::thread::spawn(move || (device.dispatch(&ACK, &[]), device))
            .join()
            .unwrap();

        assert_eq!(runtime.block_on(pending.settled()), Status::Completed);
        assert_eq!(device.status(), Status::Completed);
    }

    #[tokio::test]
    async fn test_unconfigured_ack_still_sends() {
        let transport = ScriptedTransport::new();
        transport.reply("OK");
        let device: Device<CarTelemetry, _> =
            Device::new(Arc::new(transport.clone()), "192.168.x.x", Timeouts::default());

        device.dispatch(&SLOW_ACK, &[]).settled().await;
        assert_eq!(transport.urls(), vec!["http://192.168.x.x/slow".to_string()]);
    }

    #[tokio::test]
    async fn test_last_settled_request_wins() {
        let transport = ScriptedTransport::new();
        let first = transport.gate();
        let second = transport.gate();
        let device = device(&transport);

        let first_pending = device.dispatch(&POLL, &[]);
        let second_pending = device.dispatch(&POLL, &[]);

        second.send(Ok(r#"{"d": 20}"#.to_string())).unwrap();
        second_pending.settled().await;
        assert_eq!(device.telemetry().distance, 20.0);

        // The earlier request answers late and overwrites the newer snapshot.
        first.send(Ok(r#"{"d": 10}"#.to_string())).unwrap();
        first_pending.settled().await;
        assert_eq!(device.telemetry().distance, 10.0);
        assert_eq!(device.status(), Status::Completed);
    }

    #[tokio::test]
    async fn test_repeated_command_is_idempotent() {
        let transport = ScriptedTransport::new();
        let body = r#"{"d": 33, "r": "N", "l": "L"}"#;
        transport.reply(body).reply(body);
        let device = device(&transport);

        device.dispatch(&POLL, &[]).settled().await;
        let (status, telemetry) = (device.status(), device.telemetry());
        device.dispatch(&POLL, &[]).settled().await;

        assert_eq!(device.status(), status);
        assert_eq!(device.telemetry(), telemetry);
    }
}
