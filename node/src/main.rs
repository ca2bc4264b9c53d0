use clap::Parser;
use log::{error, info, warn};
use node::config::{Command, NodeConfig};
use node::network::TcpTransport;
use node::{seated_table, RoleKind, SessionNotice, Supervisor};
use shared::{PeerIdentity, SessionError, Transport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = NodeConfig::parse();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let transport = TcpTransport::bind(&config.listen, event_tx).await?;
    let local = transport
        .local_identity()
        .ok_or(SessionError::TransportUnavailable)?;
    let mut supervisor = Supervisor::new(transport, &config.name);

    match &config.command {
        Command::Host { players } => {
            let table = seated_table(local.clone(), &config.name, usize::from(*players));
            supervisor.start_hosting(table)?;
            if let Some(host) = supervisor.host() {
                info!("Room {} is open", host.room_code());
                println!("Room {}: others join with `card-node join {}`", host.room_code(), local);
                println!("Type a line to add it to the table log, /sync to re-send the table");
            }
        }
        Command::Join { host } => {
            supervisor.join_game(PeerIdentity::from(host.as_str()))?;
        }
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    error!("Transport stopped");
                    break;
                };
                if let Some(notice) = supervisor.handle_event(event) {
                    println!("{}", notice);
                    if session_over(&supervisor, &notice) {
                        break;
                    }
                }
            },

            line = stdin.next_line(), if stdin_open && supervisor.role_kind() == RoleKind::Host => {
                match line {
                    Ok(Some(line)) => handle_host_input(&mut supervisor, line.trim()),
                    Ok(None) => {
                        info!("stdin closed, table keeps running");
                        stdin_open = false;
                    }
                    Err(e) => warn!("Failed to read stdin: {}", e),
                }
            },

            _ = tokio::signal::ctrl_c() => {
                println!("Received Ctrl+C, leaving the table...");
                break;
            }
        }
    }

    Ok(())
}

fn session_over<T: Transport>(supervisor: &Supervisor<T>, notice: &SessionNotice) -> bool {
    matches!(notice, SessionNotice::SessionEnded(_))
        && supervisor.role_kind() != RoleKind::Host
}

fn handle_host_input<T: Transport>(supervisor: &mut Supervisor<T>, line: &str) {
    if line.is_empty() {
        return;
    }
    if line == "/sync" {
        match supervisor.broadcast() {
            Ok(sent) => println!("Table re-sent to {} peers", sent),
            Err(e) => warn!("Re-send failed: {}", e),
        }
        return;
    }

    let entry = format!("{}: {}", supervisor.display_name(), line);
    match supervisor.mutate_and_broadcast(|state| state.turn_history.push(entry)) {
        Ok(state) => info!("Table at revision {}", state.revision),
        Err(e) => warn!("Update refused: {}", e),
    }
}
