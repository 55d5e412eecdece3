//! C11 — Config & Provisioning. Persisted `device_name` + `floor`, with an
//! interactive console entered when persisted state is missing or invalid
//! (spec §4.8/§6 "Persisted state (gateway)").

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

const STATE_FILE: &str = "gateway_identity.json";
const MAX_NAME_LEN: usize = 31;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayIdentity {
    pub device_name: String,
    pub floor: i32,
}

impl GatewayIdentity {
    fn is_valid(&self) -> bool {
        !self.device_name.is_empty() && self.device_name.len() <= MAX_NAME_LEN && self.floor != 0 && self.floor.abs() <= 99
    }
}

/// Load persisted identity from disk, or run the interactive console if
/// missing or malformed (spec §7 "NVS read missing -> enter interactive
/// provisioning (blocking)").
pub async fn load_or_provision() -> GatewayIdentity {
    if let Some(identity) = load().await {
        return identity;
    }
    info!("no valid gateway identity on disk, entering provisioning console");
    run_console().await
}

async fn load() -> Option<GatewayIdentity> {
    if !Path::new(STATE_FILE).exists() {
        return None;
    }
    match fs::read_to_string(STATE_FILE).await {
        Ok(data) => match serde_json::from_str::<GatewayIdentity>(&data) {
            Ok(identity) if identity.is_valid() => Some(identity),
            Ok(_) => {
                warn!("gateway_identity.json failed validation");
                None
            }
            Err(e) => {
                warn!("failed to parse gateway_identity.json: {e}");
                None
            }
        },
        Err(e) => {
            warn!("failed to read gateway_identity.json: {e}");
            None
        }
    }
}

/// Persist `identity`, committing the provisioning decision (spec §6 "Writing
/// both triggers a commit and reboot" — here, commit to disk; the caller
/// restarts the process in place of a hardware reboot).
pub async fn save(identity: &GatewayIdentity) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(identity)?;
    fs::write(STATE_FILE, json).await?;
    Ok(())
}

/// `set_name <name>`, `set_floor <n>` console, reading stdin lines until both
/// fields are set validly (spec §6).
async fn run_console() -> GatewayIdentity {
    let mut name: Option<String> = None;
    let mut floor: Option<i32> = None;

    loop {
        if let (Some(device_name), Some(floor)) = (&name, floor) {
            let identity = GatewayIdentity { device_name: device_name.clone(), floor };
            if let Err(e) = save(&identity).await {
                warn!("failed to commit provisioning: {e}");
                continue;
            }
            info!("provisioning committed: {identity:?}");
            return identity;
        }

        let line = match read_console_line().await {
            Some(l) => l,
            None => continue,
        };

        match parse_command(&line) {
            Some(Command::SetName(n)) if n.len() <= MAX_NAME_LEN && !n.is_empty() => name = Some(n),
            Some(Command::SetName(_)) => warn!("device name must be 1-{MAX_NAME_LEN} characters"),
            Some(Command::SetFloor(n)) if n != 0 && n.abs() <= 99 => floor = Some(n),
            Some(Command::SetFloor(_)) => warn!("floor must satisfy 0 < |n| <= 99"),
            None => warn!("unrecognized command, expected: set_name <name> | set_floor <n>"),
        }
    }
}

enum Command {
    SetName(String),
    SetFloor(i32),
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.trim().splitn(2, ' ');
    match (parts.next()?, parts.next()) {
        ("set_name", Some(name)) => Some(Command::SetName(name.to_string())),
        ("set_floor", Some(n)) => n.parse().ok().map(Command::SetFloor),
        _ => None,
    }
}

async fn read_console_line() -> Option<String> {
    use tokio::io::AsyncBufReadExt;
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    lines.next_line().await.ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_name_and_set_floor() {
        assert!(matches!(parse_command("set_name Lobby-1"), Some(Command::SetName(n)) if n == "Lobby-1"));
        assert!(matches!(parse_command("set_floor -3"), Some(Command::SetFloor(-3))));
    }

    #[test]
    fn rejects_garbage_commands() {
        assert!(parse_command("reboot").is_none());
        assert!(parse_command("").is_none());
    }

    #[test]
    fn identity_validation_rejects_zero_floor_and_long_names() {
        let ok = GatewayIdentity { device_name: "Lobby-1".to_string(), floor: 2 };
        assert!(ok.is_valid());

        let zero_floor = GatewayIdentity { device_name: "Lobby-1".to_string(), floor: 0 };
        assert!(!zero_floor.is_valid());

        let long_name = GatewayIdentity { device_name: "x".repeat(32), floor: 2 };
        assert!(!long_name.is_valid());
    }
}
