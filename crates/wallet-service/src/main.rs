use alloy::primitives::utils::{format_ether, format_units};
use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wallet_config::{ConfigLoader, GmWalletConfig};
use wallet_network::active_chain;
use wallet_provider::WalletKind;
use wallet_service::board::{connect_board, HISTORY_LIMIT};
use wallet_service::session::estimated_message_cost;
use wallet_service::transfer::transfer;
use wallet_service::wallets::{injected_wallets, select_wallet};
use wallet_service::WalletSession;

#[derive(Parser)]
#[command(name = "gm-wallet")]
#[command(about = "Wallet provider adapter and network bootstrap toolkit", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Configuration file (TOML or JSON); defaults are used when omitted
	#[arg(short, long, value_name = "FILE", env = "GM_WALLET_CONFIG")]
	config: Option<PathBuf>,

	#[arg(long, env = "GM_WALLET_LOG_LEVEL", default_value = "info")]
	log_level: String,

	/// Wallet to use: metamask, coinbase or browser
	#[arg(short, long)]
	wallet: Option<WalletKind>,
}

#[derive(Subcommand)]
enum Commands {
	/// Request account access and switch to the configured chain
	Connect,
	/// Switch (or add) the configured chain without connecting
	EnsureChain {
		/// Stop waiting for the wallet after this many seconds
		#[arg(long)]
		timeout_secs: Option<u64>,
	},
	/// Print the chain the wallet is currently on
	ChainId,
	/// Send a message transaction to the configured contract
	SendMessage {
		/// Message text; the configured default is sent when empty
		message: Option<String>,
	},
	/// Show the connected account's balance and the current gas price
	Balance,
	/// Show how many messages the contract holds
	Stats {
		/// Account to count messages for; the connected wallet when omitted
		#[arg(long)]
		address: Option<String>,
	},
	/// Show the most recent messages, newest first
	History {
		#[arg(long, default_value_t = HISTORY_LIMIT)]
		limit: usize,
	},
	/// Send a value transfer signed with the configured private key
	Transfer,
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	// Initialize tracing
	setup_tracing(&cli.log_level)?;

	// Load configuration
	let config = load_config(&cli).await?;

	match &cli.command {
		Commands::Connect => connect(&cli, &config).await,
		Commands::EnsureChain { timeout_secs } => ensure_chain(&cli, &config, *timeout_secs).await,
		Commands::ChainId => chain_id(&cli, &config).await,
		Commands::SendMessage { message } => {
			send_message(&cli, &config, message.as_deref().unwrap_or_default()).await
		}
		Commands::Balance => balance(&cli, &config).await,
		Commands::Stats { address } => stats(&cli, &config, address.as_deref()).await,
		Commands::History { limit } => history(&config, *limit).await,
		Commands::Transfer => run_transfer(&config).await,
		Commands::Validate => validate(&config),
	}
}

async fn load_config(cli: &Cli) -> Result<GmWalletConfig> {
	let mut loader = ConfigLoader::new();
	if let Some(path) = &cli.config {
		info!("Loading configuration from: {:?}", path);
		loader = loader.with_file(path);
	}

	loader.load().await.context("Failed to load configuration")
}

fn session(cli: &Cli, config: &GmWalletConfig) -> Result<WalletSession> {
	let wallets = injected_wallets(&config.wallet).context("Failed to set up wallet")?;
	// --wallet wins over the configured kind, auto-detection comes last
	let (_, handle) = select_wallet(&wallets, cli.wallet, config.wallet.kind)?;
	Ok(WalletSession::from_config(handle, config))
}

/// A session with an account, reusing an earlier authorisation when possible.
async fn connected_session(cli: &Cli, config: &GmWalletConfig) -> Result<WalletSession> {
	let mut session = session(cli, config)?;
	if session.check_connection().await.is_none() {
		session.connect().await.context("Failed to connect wallet")?;
	}
	Ok(session)
}

fn chain_rpc_url(config: &GmWalletConfig) -> Result<&str> {
	config
		.chain
		.rpc_urls
		.first()
		.map(String::as_str)
		.context("chain.rpc_urls is empty")
}

async fn connect(cli: &Cli, config: &GmWalletConfig) -> Result<()> {
	let mut session = session(cli, config)?;
	let account = session.connect().await.context("Failed to connect wallet")?;

	println!("Connected: {}", account);
	println!(
		"Network:   {} ({})",
		config.chain.chain_name, config.chain.chain_id
	);
	Ok(())
}

async fn ensure_chain(cli: &Cli, config: &GmWalletConfig, timeout_secs: Option<u64>) -> Result<()> {
	let mut session = session(cli, config)?;

	// The command line timeout replaces the configured one
	if let Some(secs) = timeout_secs {
		let bootstrap = session
			.bootstrap()
			.clone()
			.with_switch_timeout(Duration::from_secs(secs));
		session = session.with_bootstrap(bootstrap);
	}

	session
		.bootstrap()
		.ensure_chain(Some(session.handle()), session.chain())
		.await
		.into_result()
		.with_context(|| format!("Failed to switch to {}", config.chain.chain_name))?;
	println!(
		"Wallet is on {} ({})",
		config.chain.chain_name, config.chain.chain_id
	);
	Ok(())
}

async fn chain_id(cli: &Cli, config: &GmWalletConfig) -> Result<()> {
	let session = session(cli, config)?;
	let current = active_chain(Some(session.handle()))
		.await
		.context("Failed to read chain id")?;

	println!("{}", current);
	if current != config.chain.chain_id {
		warn!(
			"Wallet is not on {} ({})",
			config.chain.chain_name, config.chain.chain_id
		);
	}
	Ok(())
}

async fn send_message(cli: &Cli, config: &GmWalletConfig, message: &str) -> Result<()> {
	let session = connected_session(cli, config).await?;

	match session.send_message(message).await {
		Ok(receipt) => {
			println!("{}", receipt);
			Ok(())
		}
		// Declining in the wallet is not a failure of the tool
		Err(e) if e.is_user_rejection() => {
			warn!("Transaction rejected by user.");
			println!("Transaction rejected by user.");
			Ok(())
		}
		Err(e) => Err(e).context("Failed to send message"),
	}
}

async fn balance(cli: &Cli, config: &GmWalletConfig) -> Result<()> {
	let session = connected_session(cli, config).await?;
	let account = session.account().context("Wallet returned no account")?;
	let symbol = &config.chain.native_currency.symbol;

	let balance = session
		.balance(account)
		.await
		.context("Failed to fetch balance")?;
	let gas_price = session.gas_price().await;

	println!("Account:   {}", account);
	println!("Balance:   {} {}", format_ether(balance), symbol);
	println!("Gas price: {} gwei", format_units(gas_price, "gwei")?);
	println!(
		"Estimated cost per message: ~{} {}",
		format_ether(estimated_message_cost(gas_price)),
		symbol
	);
	Ok(())
}

async fn stats(cli: &Cli, config: &GmWalletConfig, address: Option<&str>) -> Result<()> {
	let board = connect_board(chain_rpc_url(config)?, &config.message.contract_address)?;

	// Count for the given address, or for whoever the wallet is connected as
	let account: Address = match address {
		Some(address) => address
			.parse()
			.with_context(|| format!("Invalid address: {}", address))?,
		None => {
			let session = connected_session(cli, config).await?;
			let account = session.account().context("Wallet returned no account")?;
			account
				.parse()
				.with_context(|| format!("Wallet returned an invalid account: {}", account))?
		}
	};

	let total = board.message_count().await?;
	let sent = board.sender_message_count(account).await?;

	println!("Total messages: {}", total);
	println!("Sent by {}: {}", account, sent);
	Ok(())
}

async fn history(config: &GmWalletConfig, limit: usize) -> Result<()> {
	let board = connect_board(chain_rpc_url(config)?, &config.message.contract_address)?;
	let messages = board.recent_messages(limit).await?;

	if messages.is_empty() {
		println!("No messages found");
		return Ok(());
	}
	for message in messages {
		println!("{}", message);
	}
	Ok(())
}

async fn run_transfer(config: &GmWalletConfig) -> Result<()> {
	let settings = config
		.transfer
		.as_ref()
		.context("No [transfer] section in configuration")?;

	// Sign locally and submit straight to the node
	let report = transfer(settings).await?;
	println!("{}", report);
	if !report.success {
		bail!("Transaction {} failed", report.hash);
	}
	Ok(())
}

fn validate(config: &GmWalletConfig) -> Result<()> {
	info!("Configuration is valid");
	info!(
		"Chain: {} ({})",
		config.chain.chain_name, config.chain.chain_id
	);
	info!("Wallet backend: {:?}", config.wallet.backend);
	info!("Message contract: {}", config.message.contract_address);
	if !config.network.extra_unregistered_codes.is_empty() {
		info!(
			"Extra unregistered-chain codes: {:?}",
			config.network.extra_unregistered_codes
		);
	}
	if config.transfer.is_some() {
		info!("Transfer: configured");
	}
	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	Ok(())
}
