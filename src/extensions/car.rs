use indexmap::IndexMap;
use log::info;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::blocks::menus::{Drive, Led, SensorAngle, TurnDirection};
use crate::blocks::{
    arg_number, arg_text, ArgumentInfo, BlockError, BlockExtension, BlockInfo, BlockItem,
    BlockOutput, BlockType, BlockValue, ExtensionInfo, Menu,
};
use crate::client::{HttpTransport, Transport};
use crate::config::{Timeouts, PLACEHOLDER_ADDRESS};
use crate::device::{CommandSpec, Device, Pending, ResponsePolicy, Status, TimeoutClass};
use crate::extensions::{dispatch_block, LED_CONTROL};
use crate::models::car::{CarTelemetry, IrState};

const ICON_URI: &str = "data:image/svg+xml;base64,PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHdpZHRoPSI0MCIgaGVpZ2h0PSI0MCIgdmlld0JveD0iMCAwIDQwIDQwIj48cmVjdCB4PSI2IiB5PSIxMiIgd2lkdGg9IjI4IiBoZWlnaHQ9IjE0IiByeD0iMyIgZmlsbD0iIzBmYmQ4YyIvPjxjaXJjbGUgY3g9IjEyIiBjeT0iMjkiIHI9IjQiIGZpbGw9IiMzMzMiLz48Y2lyY2xlIGN4PSIyOCIgY3k9IjI5IiByPSI0IiBmaWxsPSIjMzMzIi8+PC9zdmc+";

static SENSOR_ANGLE: CommandSpec = CommandSpec {
    opcode: "sensorAngleControl",
    path: "/s_angle?n={SENSOR_ANGLE}",
    progress: Status::Receiving,
    timeout: TimeoutClass::Short,
    policy: ResponsePolicy::Acknowledge,
    failure: Status::Failed,
    skip_unconfigured: false,
};

static DISTANCE_UPDATE: CommandSpec = CommandSpec {
    opcode: "sensorDistanceUpdate",
    path: "/update_d",
    progress: Status::Receiving,
    timeout: TimeoutClass::Short,
    policy: ResponsePolicy::Poll,
    failure: Status::Failed,
    skip_unconfigured: false,
};

static DRIVE: CommandSpec = CommandSpec {
    opcode: "carGobackControl",
    path: "/cargo?a={GO_BACK}",
    progress: Status::Sending,
    timeout: TimeoutClass::Short,
    policy: ResponsePolicy::Acknowledge,
    failure: Status::Failed,
    skip_unconfigured: false,
};

static TURN: CommandSpec = CommandSpec {
    opcode: "carTurnControl",
    path: "/carturn?a={TURN_DIR}&n={TURN_TIME}",
    progress: Status::Sending,
    timeout: TimeoutClass::Short,
    policy: ResponsePolicy::Acknowledge,
    failure: Status::Failed,
    skip_unconfigured: false,
};

static ADJUST_ANGLE: CommandSpec = CommandSpec {
    opcode: "adjustAngle",
    path: "/adjusta?n={ADJUST_ANG}",
    progress: Status::Adjusting,
    timeout: TimeoutClass::Short,
    policy: ResponsePolicy::Acknowledge,
    failure: Status::Failed,
    skip_unconfigured: false,
};

/// Blocks for the two-wheel IoT car.
pub struct CarExtension<C: Transport = HttpTransport> {
    device: Device<CarTelemetry, C>,
    sensor_adjust_angle: f64,
}

impl<C: Transport> CarExtension<C> {
    pub fn new(transport: Arc<C>, timeouts: Timeouts) -> Self {
        Self {
            device: Device::new(transport, PLACEHOLDER_ADDRESS, timeouts),
            sensor_adjust_angle: 0.0,
        }
    }

    pub fn set_device_address(&mut self, address: impl Into<String>) {
        self.device.set_address(address);
        info!("Car address: {}", self.device.address());
    }

    pub fn led_control(&self, led: Led) -> Pending {
        self.device.dispatch(&LED_CONTROL, &[("LED_CONT", led.as_str())])
    }

    pub fn sensor_angle_control(&self, angle: SensorAngle) -> Pending {
        self.device
            .dispatch(&SENSOR_ANGLE, &[("SENSOR_ANGLE", angle.as_str())])
    }

    pub fn sensor_distance_update(&self) -> Pending {
        self.device.dispatch(&DISTANCE_UPDATE, &[])
    }

    pub fn drive(&self, drive: Drive) -> Pending {
        self.device.dispatch(&DRIVE, &[("GO_BACK", drive.as_str())])
    }

    pub fn turn(&self, direction: TurnDirection, duration: Duration) -> Pending {
        let millis = duration.as_millis().to_string();
        self.device.dispatch(
            &TURN,
            &[("TURN_DIR", direction.as_str()), ("TURN_TIME", &millis)],
        )
    }

    /// The angle is cached before the request goes out, whatever it returns.
    pub fn adjust_angle(&mut self, angle: f64) -> Pending {
        self.sensor_adjust_angle = angle;
        let angle = angle.to_string();
        self.device.dispatch(&ADJUST_ANGLE, &[("ADJUST_ANG", &angle)])
    }

    pub fn address(&self) -> &str {
        self.device.address()
    }

    pub fn status(&self) -> Status {
        self.device.status()
    }

    pub fn distance(&self) -> f64 {
        self.device.telemetry().distance
    }

    pub fn right_ir(&self) -> IrState {
        self.device.telemetry().right_ir
    }

    pub fn left_ir(&self) -> IrState {
        self.device.telemetry().left_ir
    }

    pub fn sensor_adjust_angle(&self) -> f64 {
        self.sensor_adjust_angle
    }

    fn report(&self, opcode: &str) -> Result<BlockValue, BlockError> {
        Ok(match opcode {
            "getViewerCar2wdIp" => BlockValue::Text(self.address().to_string()),
            "getViewerCar2wdStatus" => BlockValue::Text(self.status().to_string()),
            "getViewerDistance" => BlockValue::Number(self.distance()),
            "getViewerAdjustAngle" => BlockValue::Number(self.sensor_adjust_angle()),
            "getViewerRightIr" => BlockValue::Text(self.right_ir().to_string()),
            "getViewerLeftIr" => BlockValue::Text(self.left_ir().to_string()),
            _ => return Err(BlockError::UnknownOpcode(opcode.to_string())),
        })
    }
}

impl<C: Transport> BlockExtension for CarExtension<C> {
    fn info(&self) -> ExtensionInfo {
        let mut menus = IndexMap::new();
        menus.insert("led_cont", Menu::new(Led::ITEMS));
        menus.insert("sensor_angles", Menu::new(SensorAngle::ITEMS));
        menus.insert("gobacks", Menu::new(Drive::ITEMS));
        menus.insert("turns", Menu::new(TurnDirection::ITEMS));

        ExtensionInfo {
            id: "iotcar2wd",
            name: "sLab-Car",
            block_icon_uri: ICON_URI,
            menu_icon_uri: ICON_URI,
            blocks: vec![
                BlockInfo::new(BlockType::Hat, "setIotIp", "Car IP address [IPADDR]")
                    .argument("IPADDR", ArgumentInfo::string(self.address()))
                    .into(),
                BlockInfo::command("adjustAngle", "Adjust sensor angle [ADJUST_ANG]")
                    .argument("ADJUST_ANG", ArgumentInfo::string(self.sensor_adjust_angle))
                    .into(),
                BlockItem::Separator,
                BlockInfo::command("ledControl", "LED [LED_CONT]")
                    .argument("LED_CONT", ArgumentInfo::string("ON").menu("led_cont"))
                    .into(),
                BlockInfo::command("sensorDistanceUpdate", "Measure distance").into(),
                BlockInfo::command("sensorAngleControl", "Turn distance sensor [SENSOR_ANGLE]")
                    .argument("SENSOR_ANGLE", ArgumentInfo::string(90).menu("sensor_angles"))
                    .into(),
                BlockInfo::command("carGobackControl", "Car GO/BACK [GO_BACK]")
                    .argument("GO_BACK", ArgumentInfo::string("GO").menu("gobacks"))
                    .into(),
                BlockInfo::command("carTurnControl", "Car turn [TURN_DIR] [TURN_TIME] msec")
                    .argument("TURN_DIR", ArgumentInfo::string("RIGHT").menu("turns"))
                    .argument("TURN_TIME", ArgumentInfo::string(300))
                    .into(),
                BlockItem::Separator,
                BlockInfo::reporter("getViewerCar2wdIp", "Car IP address").into(),
                BlockInfo::reporter("getViewerCar2wdStatus", "Car Status").into(),
                BlockInfo::reporter("getViewerDistance", "Distance (cm)").into(),
                BlockInfo::reporter("getViewerAdjustAngle", "Sensor angle adjustment").into(),
                BlockInfo::reporter("getViewerRightIr", "Right IR sensor").into(),
                BlockInfo::reporter("getViewerLeftIr", "Left IR sensor").into(),
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
            "adjustAngle" => {
                // The URL carries the text as given; the reporter shows its number cast.
                self.sensor_adjust_angle = arg_number(args, "ADJUST_ANG")?;
                dispatch_block(&self.device, &ADJUST_ANGLE, args, &["ADJUST_ANG"])?
            }
            "ledControl" => dispatch_block(&self.device, &LED_CONTROL, args, &["LED_CONT"])?,
            "sensorDistanceUpdate" => self.sensor_distance_update(),
            "sensorAngleControl" => {
                dispatch_block(&self.device, &SENSOR_ANGLE, args, &["SENSOR_ANGLE"])?
            }
            "carGobackControl" => dispatch_block(&self.device, &DRIVE, args, &["GO_BACK"])?,
            "carTurnControl" => {
                dispatch_block(&self.device, &TURN, args, &["TURN_DIR", "TURN_TIME"])?
            }
            _ => return self.report(opcode).map(BlockOutput::Value),
        };
        Ok(BlockOutput::Dispatched(pending))
    }
}
