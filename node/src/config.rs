use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "card-node", author, version, about, long_about = None)]
pub struct NodeConfig {
    /// Address to listen on; the bound address is this node's identity
    #[arg(short = 'l', long, default_value = "127.0.0.1:0")]
    pub listen: String,

    /// Name shown to the other players
    #[arg(short = 'n', long, default_value = "Player")]
    pub name: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Host a new table and take seat 0
    Host {
        /// Number of seats, host included
        #[arg(short = 'p', long, default_value_t = shared::DEFAULT_PLAYER_COUNT, value_parser = clap::value_parser!(u8).range(1..=16))]
        players: u8,
    },
    /// Join the table hosted at the given address
    Join {
        /// Host identity, e.g. 127.0.0.1:7000
        host: String,
    },
}
