use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::Context;
use image::{GrayImage, Luma};
use mova_worker::{DeviceConnector, EdgeMode, SerialConnector, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;

    println!(
        "worker-selfcheck: starting with sessions_dir={} edge_mode={}",
        config.sessions_dir.display(),
        config.edge_mode
    );
    ensure_sessions_dir(&config.sessions_dir).await?;
    ensure_tool("ffmpeg")?;
    ensure_tool("ffprobe")?;

    if config.edge_mode == EdgeMode::Device {
        ensure_env_present(&["MOVA_SERIAL_PORT"])?;
        let link = config.link_config()?;
        let elapsed = tokio::task::spawn_blocking(move || device_round_trip(&link)).await??;
        println!("worker-selfcheck: device round trip in {:?}", elapsed);
    }

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_sessions_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("cannot create {}", path.display()))?;
    Ok(())
}

fn ensure_tool(name: &str) -> anyhow::Result<()> {
    which::which(name).map_err(|e| anyhow::anyhow!("{} not found in PATH: {}", name, e))?;

    let output = Command::new(name)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", name, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} -version failed: {:?}",
            name,
            output.status
        ));
    }
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}

/// Send one gradient frame and wait for the device's reply.
fn device_round_trip(link: &mova_link::LinkConfig) -> anyhow::Result<Duration> {
    let mut transceiver = SerialConnector
        .connect(link)
        .with_context(|| format!("cannot open {}", link.device.display()))?;
    transceiver.clear();

    let frame = GrayImage::from_fn(link.frame_width, link.frame_height, |x, _| {
        Luma([(x * 255 / link.frame_width.max(1)) as u8])
    });

    let started = std::time::Instant::now();
    transceiver.send(frame.as_raw())?;
    let reply = transceiver.receive(link.timeout)?;
    let elapsed = started.elapsed();
    transceiver.close();

    anyhow::ensure!(
        reply.len() == link.frame_len(),
        "device replied with {} bytes, expected {}",
        reply.len(),
        link.frame_len()
    );
    Ok(elapsed)
}
