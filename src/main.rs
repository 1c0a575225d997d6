use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use mycoin::api;
use mycoin::config::MycoinConfig;
use mycoin::crypto::wallet::Wallet;
use mycoin::node::Node;

#[derive(Parser)]
#[command(name = "mycoin")]
#[command(about = "MyCoin - a minimal proof-of-work cryptocurrency node", long_about = None)]
struct Cli {
    /// Port for the node's HTTP API (default 5000)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Peer node URLs to register and sync from at startup
    #[arg(long, env = "CONNECT_NODE", value_delimiter = ',', num_args = 0..)]
    connect: Vec<String>,

    /// Configuration file path (default: mycoin.toml when present)
    #[arg(short, long)]
    config: Option<String>,

    /// Directory holding the persisted chain state
    #[arg(short, long)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Wallet operations: key generation, balances, signed transfers
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Generate a new keypair and save it as a wallet file
    New {
        /// Wallet file name
        #[arg(short, long, default_value = "my_key.json")]
        file: String,

        /// Directory for wallet files
        #[arg(short, long, default_value = "wallet_data")]
        dir: String,
    },

    /// Query a balance through a running node
    Balance {
        /// Address to query; defaults to the wallet file's address
        #[arg(short, long)]
        address: Option<String>,

        /// Wallet file name
        #[arg(short, long, default_value = "my_key.json")]
        file: String,

        /// Directory for wallet files
        #[arg(short, long, default_value = "wallet_data")]
        dir: String,

        /// Node to query
        #[arg(short, long, default_value = "http://localhost:5000")]
        node: String,
    },

    /// Sign a transfer with a wallet file and submit it to a node
    Send {
        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Amount to send
        #[arg(short, long)]
        amount: f64,

        /// Wallet file name
        #[arg(short, long, default_value = "my_key.json")]
        file: String,

        /// Directory for wallet files
        #[arg(long, default_value = "wallet_data")]
        dir: String,

        /// Node to submit to
        #[arg(short, long, default_value = "http://localhost:5000")]
        node: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut cli = Cli::parse();
    match cli.command.take() {
        Some(Commands::Wallet { command }) => run_wallet_command(command).await,
        None => run_node(cli).await,
    }
}

async fn run_node(cli: Cli) {
    let config = MycoinConfig::load_with_overrides(cli.config, cli.port, cli.data_dir, &cli.connect)
        .expect("failed to load configuration");

    println!("--------------------------------------------------");
    println!("         MyCoin Blockchain Node Initializing      ");
    println!("--------------------------------------------------");

    let node_id = Uuid::new_v4().simple().to_string();
    let node = Arc::new(
        Node::open(&config.node.data_dir, node_id.clone()).expect("failed to open node state"),
    );

    let view = node.get_chain().await;
    println!("Node ID: {}", node_id);
    println!("Chain height: {}", view.length);
    println!("Difficulty: {}", view.difficulty);

    // never gossip to ourselves
    let own_endpoint = format!(":{}", config.node.port);
    let peers: Vec<String> = config
        .network
        .peers
        .iter()
        .map(|peer| peer.trim().to_string())
        .filter(|peer| !peer.is_empty() && !peer.trim_end_matches('/').ends_with(&own_endpoint))
        .collect();

    if !peers.is_empty() {
        node.register_peers(&peers).await;
        tracing::info!(count = peers.len(), "registered initial peers, attempting consensus");
        if node.resolve().await {
            tracing::info!("chain synchronized with the network");
        } else {
            tracing::info!("local chain is authoritative");
        }
    }

    api::serve(node, config.node.port).await;
}

async fn run_wallet_command(command: WalletCommands) {
    match command {
        WalletCommands::New { file, dir } => match Wallet::generate() {
            Ok(wallet) => match wallet.save(&dir, &file) {
                Ok(path) => {
                    println!("New MyCoin wallet");
                    println!("WARNING: never share your private key!");
                    println!("Address: {}", wallet.public_address);
                    println!("Saved to: {}", path.display());
                }
                Err(err) => eprintln!("Failed to save wallet: {}", err),
            },
            Err(err) => eprintln!("Failed to generate wallet: {}", err),
        },

        WalletCommands::Balance {
            address,
            file,
            dir,
            node,
        } => {
            let address = match address {
                Some(address) => address,
                None => match Wallet::load(&dir, &file) {
                    Ok(wallet) => wallet.public_address.clone(),
                    Err(err) => {
                        eprintln!("Failed to load wallet: {}", err);
                        return;
                    }
                },
            };
            match fetch_balance(&node, &address).await {
                Ok(balance) => println!("Balance of {}...: {} MyCoin", &address[..address.len().min(12)], balance),
                Err(err) => eprintln!("Node request failed (is the node at {} running?): {}", node, err),
            }
        }

        WalletCommands::Send {
            to,
            amount,
            file,
            dir,
            node,
        } => {
            let wallet = match Wallet::load(&dir, &file) {
                Ok(wallet) => wallet,
                Err(err) => {
                    eprintln!("Failed to load wallet: {}", err);
                    return;
                }
            };
            let signature = match wallet.sign(&to, amount) {
                Ok(signature) => signature,
                Err(err) => {
                    eprintln!("Failed to sign transaction: {}", err);
                    return;
                }
            };
            match submit_transfer(&node, &wallet.public_address, &to, amount, &signature).await {
                Ok((accepted, reply)) => {
                    if accepted {
                        println!("Transaction sent!");
                    } else {
                        println!("Transaction rejected by the node.");
                    }
                    println!("Node response: {}", reply);
                }
                Err(err) => eprintln!("Node request failed (is the node at {} running?): {}", node, err),
            }
        }
    }
}

async fn fetch_balance(node: &str, address: &str) -> Result<f64, Box<dyn std::error::Error>> {
    let mut url = url::Url::parse(node)?;
    url.path_segments_mut()
        .map_err(|_| "node URL cannot be a base")?
        .push("balance")
        .push(address);

    let reply: serde_json::Value = reqwest::get(url).await?.json().await?;
    Ok(reply
        .get("balance")
        .and_then(|balance| balance.as_f64())
        .unwrap_or(0.0))
}

async fn submit_transfer(
    node: &str,
    sender: &str,
    recipient: &str,
    amount: f64,
    signature: &str,
) -> Result<(bool, String), Box<dyn std::error::Error>> {
    let url = url::Url::parse(node)?.join("transactions/new")?;
    let response = reqwest::Client::new()
        .post(url)
        .json(&serde_json::json!({
            "sender": sender,
            "recipient": recipient,
            "amount": amount,
            "signature": signature,
        }))
        .send()
        .await?;

    let accepted = response.status().is_success();
    let reply: serde_json::Value = response.json().await?;
    let text = reply
        .get("message")
        .and_then(|message| message.as_str())
        .unwrap_or("(no message)")
        .to_string();
    Ok((accepted, text))
}
