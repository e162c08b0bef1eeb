use serde_json::Value;

use crate::blocks::{arg_text, BlockError};
use crate::client::Transport;
use crate::device::{CommandSpec, Device, Pending, ResponsePolicy, Status, TimeoutClass};
use crate::models::Telemetry;

pub mod car;
pub mod remocon;

pub use car::CarExtension;
pub use remocon::RemoconExtension;

/// Both devices expose the same status LED endpoint.
pub static LED_CONTROL: CommandSpec = CommandSpec {
    opcode: "ledControl",
    path: "/led?o={LED_CONT}",
    progress: Status::LedControlling,
    timeout: TimeoutClass::Short,
    policy: ResponsePolicy::Acknowledge,
    failure: Status::Failed,
    skip_unconfigured: false,
};

/// Sends a command with each named block argument cast to text and
/// inserted into the URL as is. Menu values are not checked.
pub(crate) fn dispatch_block<T: Telemetry, C: Transport>(
    device: &Device<T, C>,
    spec: &'static CommandSpec,
    args: &Value,
    names: &[&'static str],
) -> Result<Pending, BlockError> {
    let values = names
        .iter()
        .map(|name| arg_text(args, name))
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<(&str, &str)> = names
        .iter()
        .copied()
        .zip(values.iter().map(String::as_str))
        .collect();
    Ok(device.dispatch(spec, &params))
}
