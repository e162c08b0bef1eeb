pub mod blocks;
pub mod client;
pub mod config;
pub mod device;
pub mod extensions;
pub mod models;

use crate::blocks::{BlockExtension, BlockOutput, ExtensionInfo};
use crate::client::HttpTransport;
use crate::config::AppConfig;
use crate::extensions::{CarExtension, RemoconExtension};
use anyhow::Context;
use log::{debug, error, info};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const CAR_POLL: &str = "sensorDistanceUpdate";
const CAR_REPORTERS: &[&str] = &[
    "getViewerCar2wdStatus",
    "getViewerDistance",
    "getViewerRightIr",
    "getViewerLeftIr",
    "getViewerAdjustAngle",
];

const REMOCON_POLL: &str = "updateSensorData";
const REMOCON_REPORTERS: &[&str] = &[
    "getViewerRemoconStatus",
    "getViewerTemperature",
    "getViewerHumidity",
    "getViewerIlluminance",
];

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting application");

    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Application completed successfully"),
                Err(e) => {
                    error!("Application error: {e:#}");
                    // Print chain of error causes
                    let mut source = e.source();
                    while let Some(e) = source {
                        error!("Caused by: {e}");
                        source = e.source();
                    }
                    return Err(e).context("Application failed to run");
                }
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    Ok(())
}

async fn main_loop(config: AppConfig) -> anyhow::Result<()> {
    let transport = Arc::new(HttpTransport::new());
    let timeouts = config.http.timeouts();

    let mut car = CarExtension::new(Arc::clone(&transport), timeouts);
    car.set_device_address(config.car.address.clone());
    let mut remocon = RemoconExtension::new(transport, timeouts);
    remocon.set_device_address(config.remocon.address.clone());

    let infos = [car.info(), remocon.info()];
    for info in &infos {
        info!(
            "Registered extension {} ({}) with {} blocks",
            info.name,
            info.id,
            info.block_infos().count()
        );
        for block in info.block_infos() {
            debug!("  {} [{:?}] {}", block.opcode, block.block_type, block.text);
        }
    }

    if config.descriptor.save_to_file {
        save_descriptors(&config.descriptor.file, &infos)?;
    }

    if !config.poll.enabled {
        info!("Sensor polling disabled");
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.poll.interval_secs.max(1)));
    loop {
        interval.tick().await; // Wait for the next tick

        // Readings come from the previous tick's requests, like reporter blocks in the editor.
        info!("Car: {}", report(&mut car, CAR_REPORTERS));
        info!("Remocon: {}", report(&mut remocon, REMOCON_REPORTERS));

        fire(&mut car, CAR_POLL);
        fire(&mut remocon, REMOCON_POLL);
    }
}

/// Runs a command block without waiting for the device to answer.
fn fire<E: BlockExtension>(extension: &mut E, opcode: &str) {
    match extension.run_block(opcode, &json!({})) {
        Ok(BlockOutput::Dispatched(pending)) => debug!("{}: dispatched {:?}", opcode, pending),
        Ok(_) => {}
        Err(e) => error!("Failed to run {}: {}", opcode, e),
    }
}

/// Reads reporter blocks into a single `opcode=value` line.
fn report<E: BlockExtension>(extension: &mut E, opcodes: &[&str]) -> String {
    opcodes
        .iter()
        .map(|opcode| match extension.run_block(opcode, &Value::Null) {
            Ok(output) => match output.into_value() {
                Some(value) => format!("{}={}", opcode, value),
                None => format!("{}=?", opcode),
            },
            Err(e) => format!("{}=<{}>", opcode, e),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn save_descriptors<P: AsRef<Path>>(path: P, infos: &[ExtensionInfo]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(infos).context("Failed to serialize descriptors")?;

    fs::write(path, json).context(format!("Failed to save descriptors to {}", path.display()))?;

    info!("Block descriptors saved to {}", path.display());
    Ok(())
}
