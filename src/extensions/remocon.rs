use indexmap::IndexMap;
use log::info;
use serde_json::Value;
use std::sync::Arc;

use crate::blocks::menus::{IrSlot, Led, WebhookJob};
use crate::blocks::{
    arg_text, ArgumentInfo, BlockError, BlockExtension, BlockInfo, BlockItem, BlockOutput,
    BlockValue, ExtensionInfo, Menu,
};
use crate::client::{HttpTransport, Transport};
use crate::config::{Timeouts, PLACEHOLDER_ADDRESS};
use crate::device::{CommandSpec, Device, Pending, ResponsePolicy, Status, TimeoutClass};
use crate::extensions::{dispatch_block, LED_CONTROL};
use crate::models::remocon::HubTelemetry;

const ICON_URI: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHdpZHRoPSI0MCIgaGVpZ2h0PSI0MCIgdmlld0JveD0iMCAwIDQwIDQwIj48cmVjdCB4PSIxMiIgeT0iNiIgd2lkdGg9IjE2IiBoZWlnaHQ9IjI4IiByeD0iMyIgZmlsbD0iIzRjOTdmZiIvPjxjaXJjbGUgY3g9IjIwIiBjeT0iMTMiIHI9IjMiIGZpbGw9IiNmZjY2ODAiLz48L3N2Zz4=";

static UPDATE_SENSOR: CommandSpec = CommandSpec {
    opcode: "updateSensorData",
    path: "/update",
    progress: Status::SensorUpdating,
    timeout: TimeoutClass::Short,
    policy: ResponsePolicy::Poll,
    failure: Status::UpdateFailed,
    skip_unconfigured: true,
};

// Recording waits for the user to press a button on the physical remote.
static IR_RECV: CommandSpec = CommandSpec {
    opcode: "irRecvControl",
    path: "/recv?n={IR_NO}",
    progress: Status::Receiving,
    timeout: TimeoutClass::Long,
    policy: ResponsePolicy::Acknowledge,
    failure: Status::Failed,
    skip_unconfigured: false,
};

static IR_SEND: CommandSpec = CommandSpec {
    opcode: "irSendControl",
    path: "/send?n={IR_NO}",
    progress: Status::Sending,
    timeout: TimeoutClass::Long,
    policy: ResponsePolicy::Acknowledge,
    failure: Status::Failed,
    skip_unconfigured: false,
};

static IFTTT_WEBHOOK: CommandSpec = CommandSpec {
    opcode: "iftttWebhooksControl",
    path: "/ifttt?j={IFTTT_JOB}",
    progress: Status::IftttTriggering,
    timeout: TimeoutClass::Long,
    policy: ResponsePolicy::Acknowledge,
    failure: Status::Failed,
    skip_unconfigured: false,
};

/// Blocks for the infrared remote-control hub.
pub struct RemoconExtension<C: Transport = HttpTransport> {
    device: Device<HubTelemetry, C>,
}

impl<C: Transport> RemoconExtension<C> {
    pub fn new(transport: Arc<C>, timeouts: Timeouts) -> Self {
        Self {
            device: Device::new(transport, PLACEHOLDER_ADDRESS, timeouts),
        }
    }

    pub fn set_device_address(&mut self, address: impl Into<String>) {
        self.device.set_address(address);
        info!("Remocon address: {}", self.device.address());
    }

    pub fn led_control(&self, led: Led) -> Pending {
        self.device.dispatch(&LED_CONTROL, &[("LED_CONT", led.as_str())])
    }

    /// Skipped, with telemetry cleared, while the address is still the placeholder.
    pub fn update_sensor_data(&self) -> Pending {
        self.device.dispatch(&UPDATE_SENSOR, &[])
    }

    pub fn ir_recv(&self, slot: IrSlot) -> Pending {
        self.device.dispatch(&IR_RECV, &[("IR_NO", slot.as_str())])
    }

    pub fn ir_send(&self, slot: IrSlot) -> Pending {
        self.device.dispatch(&IR_SEND, &[("IR_NO", slot.as_str())])
    }

    pub fn ifttt_webhook(&self, job: WebhookJob) -> Pending {
        self.device
            .dispatch(&IFTTT_WEBHOOK, &[("IFTTT_JOB", job.as_str())])
    }

    pub fn address(&self) -> &str {
        self.device.address()
    }

    pub fn status(&self) -> Status {
        self.device.status()
    }

    pub fn temperature(&self) -> f64 {
        self.device.telemetry().temperature
    }

    pub fn humidity(&self) -> f64 {
        self.device.telemetry().humidity
    }

    pub fn illuminance(&self) -> f64 {
        self.device.telemetry().illuminance
    }

    fn report(&self, opcode: &str) -> Result<BlockValue, BlockError> {
        Ok(match opcode {
            "getViewerRemoconIp" => BlockValue::Text(self.address().to_string()),
            "getViewerRemoconStatus" => BlockValue::Text(self.status().to_string()),
            "getViewerTemperature" => BlockValue::Number(self.temperature()),
            "getViewerHumidity" => BlockValue::Number(self.humidity()),
            "getViewerIlluminance" => BlockValue::Number(self.illuminance()),
            _ => return Err(BlockError::UnknownOpcode(opcode.to_string())),
        })
    }
}

impl<C: Transport> BlockExtension for RemoconExtension<C> {
    fn info(&self) -> ExtensionInfo {
        let mut menus = IndexMap::new();
        menus.insert("led_cont", Menu::new(Led::ITEMS));
        menus.insert("ir_nos", Menu::new(IrSlot::ITEMS));
        menus.insert("ifttt_job", Menu::new(WebhookJob::ITEMS));

        ExtensionInfo {
            id: "iotremocon",
            name: "IoT Smart Remocon",
            block_icon_uri: ICON_URI,
            menu_icon_uri: ICON_URI,
            blocks: vec![
                BlockInfo::command("setIotIp", "IoT Remocon IP [IPADDR]")
                    .argument("IPADDR", ArgumentInfo::string(self.address()))
                    .into(),
                BlockItem::Separator,
                BlockInfo::command("ledControl", "LED Control [LED_CONT]")
                    .argument("LED_CONT", ArgumentInfo::string("ON").menu("led_cont"))
                    .into(),
                BlockInfo::command("updateSensorData", "Update Sensor").into(),
                BlockInfo::command("irRecvControl", "Record Remote Control [IR_NO]")
                    .argument("IR_NO", ArgumentInfo::string(1).menu("ir_nos"))
                    .into(),
                BlockInfo::command("irSendControl", "Send Remote Control [IR_NO]")
                    .argument("IR_NO", ArgumentInfo::string(1).menu("ir_nos"))
                    .into(),
                BlockInfo::command("iftttWebhooksControl", "IFTTT WebHooks [IFTTT_JOB]")
                    .argument("IFTTT_JOB", ArgumentInfo::string("MAIL").menu("ifttt_job"))
                    .into(),
                BlockItem::Separator,
                BlockInfo::reporter("getViewerRemoconIp", "IoT Remocon IP").into(),
                BlockInfo::reporter("getViewerRemoconStatus", "IoT Remocon Status").into(),
                BlockInfo::reporter("getViewerTemperature", "Temperature").into(),
                BlockInfo::reporter("getViewerHumidity", "Humidity").into(),
                BlockInfo::reporter("getViewerIlluminance", "Illuminance").into(),
            ],
            menus,
        }
    }

    fn run_block(&mut self, opcode: &str, args: &Value) -> Result<BlockOutput, BlockError> {
        let pending = match opcode {
            "setIotIp" => {
                self.set_device_address(arg_text(args, "IPADDR")?);
                return Ok(BlockOutput::Done);
            }
            "ledControl" => dispatch_block(&self.device, &LED_CONTROL, args, &["LED_CONT"])?,
            "updateSensorData" => self.update_sensor_data(),
            "irRecvControl" => dispatch_block(&self.device, &IR_RECV, args, &["IR_NO"])?,
            "irSendControl" => dispatch_block(&self.device, &IR_SEND, args, &["IR_NO"])?,
            "iftttWebhooksControl" => {
                dispatch_block(&self.device, &IFTTT_WEBHOOK, args, &["IFTTT_JOB"])?
            }
            _ => return self.report(opcode).map(BlockOutput::Value),
        };
        Ok(BlockOutput::Dispatched(pending))
    }
}
