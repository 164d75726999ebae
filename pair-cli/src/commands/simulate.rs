//! Pair two simulated devices over a loopback network.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use beampair_client::{BeaconRole, LoopbackNetwork, PairingConfig, PairingSession};
use beampair_core::{Phase, SessionSnapshot, SessionState};

/// How long any single step may take before the run is abandoned.
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for a first beacon before sharing anyway.
const RANGING_GRACE: Duration = Duration::from_millis(500);

/// Options for one simulation run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Config file for the first device.
    pub config_a: Option<PathBuf>,
    /// Config file for the second device.
    pub config_b: Option<PathBuf>,
    /// Distance between the devices in metres.
    pub distance_m: f64,
    /// Print final snapshots as JSON.
    pub json: bool,
}

/// One simulated device taking part in the run.
struct Device {
    label: &'static str,
    session: PairingSession,
}

/// Run the simulate command.
pub async fn run(options: &Options) -> Result<()> {
    anyhow::ensure!(
        options.distance_m.is_finite() && options.distance_m >= 0.0,
        "Distance must be a non-negative number of metres"
    );

    let config_a = load(
        options.config_a.as_deref(),
        PairingConfig::default()
            .with_display_name("Alpha")
            .with_role(BeaconRole::One),
    )?;
    let config_b = load(
        options.config_b.as_deref(),
        PairingConfig::default()
            .with_display_name("Bravo")
            .with_role(BeaconRole::Two),
    )?;
    anyhow::ensure!(
        config_a.local_beacon() != config_b.local_beacon(),
        "Both devices advertise beacon {}; give them different roles",
        config_a.local_beacon()
    );

    let network = LoopbackNetwork::new();
    let devices = [
        Device {
            label: "A",
            session: PairingSession::spawn(&config_a, network.device(0.0).collaborators())
                .context("Failed to start device A")?,
        },
        Device {
            label: "B",
            session: PairingSession::spawn(
                &config_b,
                network.device(options.distance_m).collaborators(),
            )
            .context("Failed to start device B")?,
        },
    ];

    println!("=== beampair simulate ===");
    println!();
    for (device, config) in devices.iter().zip([&config_a, &config_b]) {
        println!(
            "Device {}: {} (beacon {})",
            device.label,
            config.device.display_name,
            config.local_beacon()
        );
    }
    println!("Distance: {} m", options.distance_m);
    println!();

    for device in &devices {
        device.session.start().await?;
    }
    for device in &devices {
        settle(device, "discover its peer", |s| !s.peers.is_empty()).await?;
        // Out of range is a valid outcome, so ranging only gets a grace period.
        let mut watch = device.session.watch();
        let _ = tokio::time::timeout(RANGING_GRACE, watch.wait_for(|s| !s.beacons.is_empty()))
            .await;
    }

    for device in &devices {
        device.session.share_intent().await?;
        let snapshot = settle(device, "pick a peer", |s| {
            matches!(s.state.phase(), Phase::AwaitingConfirmation | Phase::Failed)
        })
        .await?;
        match &snapshot.state {
            SessionState::AwaitingConfirmation { offer } => println!(
                "Device {}: offering {} (beacon {}, {:.2} m)",
                device.label, offer.peer, offer.beacon.beacon, offer.beacon.accuracy
            ),
            SessionState::Failed { reason } => {
                anyhow::bail!("Device {} found no one to pair with: {}", device.label, reason)
            }
            other => anyhow::bail!("Device {} stuck in {}", device.label, other.phase()),
        }
    }

    for device in &devices {
        device.session.confirm_intent().await?;
    }

    let mut finals = Vec::new();
    for device in &devices {
        let snapshot = settle(device, "finish the exchange", |s| {
            matches!(s.state.phase(), Phase::Completed | Phase::Failed)
        })
        .await?;
        match &snapshot.state {
            SessionState::Completed { peer, profile } => {
                println!("Device {}: received \"{}\" from {}", device.label, profile.name, peer)
            }
            SessionState::Failed { reason } => {
                println!("Device {}: exchange failed: {}", device.label, reason)
            }
            other => anyhow::bail!("Device {} stuck in {}", device.label, other.phase()),
        }
        finals.push(snapshot);
    }

    if options.json {
        println!();
        println!("{}", serde_json::to_string_pretty(&finals)?);
    }

    for device in &devices {
        device.session.shutdown().await?;
    }

    let failed = finals
        .iter()
        .filter(|s| s.state.phase() == Phase::Failed)
        .count();
    anyhow::ensure!(failed == 0, "{} of 2 exchanges failed", failed);
    Ok(())
}

fn load(path: Option<&Path>, fallback: PairingConfig) -> Result<PairingConfig> {
    match path {
        Some(path) => PairingConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(fallback),
    }
}

/// Wait until `device` publishes a snapshot satisfying `condition`.
async fn settle(
    device: &Device,
    what: &str,
    condition: impl Fn(&SessionSnapshot) -> bool,
) -> Result<SessionSnapshot> {
    let mut watch = device.session.watch();
    let snapshot = tokio::time::timeout(STEP_TIMEOUT, watch.wait_for(|s| condition(s)))
        .await
        .with_context(|| format!("Timed out waiting for device {} to {}", device.label, what))?
        .with_context(|| format!("Device {} stopped", device.label))?
        .clone();
    Ok(snapshot)
}
