use chain::{
    ObjectId,
    PlayId,
    SigningClient,
    SuiRpcClient,
};
use clap::{
    ArgGroup,
    Parser,
    Subcommand,
};
use client::{
    account::{
        self,
        PlayMode,
    },
    config::{
        GameObjects,
        resolve_data_dir,
    },
    manager::{
        ClaimStatus,
        SessionManager,
        StartRequest,
    },
    retry::RetryPolicy,
    session::SessionPhase,
    sled_session_store::SledSessionStore,
    wallets::{
        KeytoolSigner,
        active_address,
        resolve_sui_config_dir,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::{
    ChainConfig,
    DeploymentEnv,
    DeploymentStore,
};
use indexer::{
    app::{
        App,
        sled_storage::{
            SledSnapshotStorage,
            open_db,
        },
    },
    world::WorldMap,
};
use std::{
    path::Path,
    sync::OnceLock,
    time::Duration,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Commit-reveal treasure hunts on chunk worlds",
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["local", "dev", "test"])
            .required(true)
    )
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[arg(long)]
    rpc_url: Option<String>,

    /// sled directory for the play session and world cache
    #[arg(long)]
    data_dir: Option<String>,

    /// Sui client config directory (defaults to ~/.sui/sui_config)
    #[arg(long)]
    sui_config: Option<String>,

    #[arg(long, default_value = "sui")]
    sui_bin: String,

    /// index lookups before a committed play is left pending (default 5)
    #[arg(long)]
    index_attempts: Option<u32>,

    /// wait for indexing with growing delays for up to this many seconds
    #[arg(long)]
    index_deadline_secs: Option<u64>,

    /// write daily rolling logs here instead of stderr
    #[arg(long)]
    log_dir: Option<String>,

    #[arg(long)]
    local: bool,

    #[arg(long)]
    dev: bool,

    #[arg(long)]
    test: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Current play, character and reward balance
    Status,
    /// Load (and cache) a world map
    World {
        world_id: Option<String>,
        #[arg(long)]
        ascii: bool,
    },
    /// Commit a new play
    Play {
        #[arg(long, default_value = "free")]
        mode: PlayMode,
        #[arg(long)]
        world: Option<String>,
    },
    /// Look up the play id of a pending play once more
    RetryIndex,
    /// Report the player's position; marks the key found on the target tile
    Reach { x: u32, y: u32 },
    /// Mark the key as found
    Found,
    /// Reveal the key and claim the reward
    Redeem,
    /// Check whether the current play was already claimed
    Verify,
    /// Continue a play from another device
    Restore {
        play_id: u64,
        key_hex: String,
        #[arg(long)]
        world: String,
    },
    /// Forget the current play (the commitment cannot be claimed afterwards)
    Cancel,
    /// Plays committed by this account that were never claimed
    Unclaimed,
    /// Record a published package and its shared objects for the selected network
    Register {
        package_id: String,
        #[arg(long)]
        world_registry: Option<String>,
        #[arg(long)]
        reward_vault: Option<String>,
    },
}

fn init_tracing(log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            let appender = rolling::daily(dir, "chunkworld.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            let _ = fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
        }
        None => {
            let _ = fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId> {
    raw.parse()
        .map_err(|e| eyre!("invalid {what} '{raw}': {e}"))
}

fn register(
    env: DeploymentEnv,
    rpc_url: Option<&str>,
    package_id: &str,
    world_registry: Option<&str>,
    reward_vault: Option<&str>,
) -> Result<()> {
    let package = parse_object_id(package_id, "package id")?;
    let world_registry = world_registry
        .map(|raw| parse_object_id(raw, "world registry id"))
        .transpose()?;
    let reward_vault = reward_vault
        .map(|raw| parse_object_id(raw, "reward vault id"))
        .transpose()?;
    let store = DeploymentStore::new(env).map_err(|e| eyre!("{e:#}"))?;
    let record = store
        .record_deployment(
            package.to_string(),
            rpc_url.unwrap_or(env.default_rpc_url()),
            world_registry.map(|id| id.to_string()),
            reward_vault.map(|id| id.to_string()),
        )
        .map_err(|e| eyre!("{e:#}"))?;
    tracing::info!(package = %record.package_id, %env, "deployment recorded");
    println!("Recorded {env} deployment in {}", store.path().display());
    Ok(())
}

async fn world_map(
    app: &mut App<SuiRpcClient, SledSnapshotStorage>,
    world: Option<&ObjectId>,
) -> Result<WorldMap> {
    if let Some(cached) = app.cached_world(world).map_err(|e| eyre!("{e:#}"))? {
        return Ok(cached);
    }
    app.refresh_world(world)
        .await
        .map_err(|e| eyre!("{e:#}"))
}

fn describe_phase(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Idle => "no play in progress",
        SessionPhase::Committing => "committing",
        SessionPhase::PendingIndex => "committed, waiting for the play id",
        SessionPhase::Active { found: false } => "active, key not found yet",
        SessionPhase::Active { found: true } => "active, key found; ready to redeem",
        SessionPhase::Redeeming => "redeeming",
        SessionPhase::Closed => "closed",
        SessionPhase::Recovering => "recovering",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.log_dir.as_deref().map(Path::new));

    let env = if args.local {
        DeploymentEnv::Local
    } else if args.dev {
        DeploymentEnv::Dev
    } else {
        DeploymentEnv::Test
    };
    if let Command::Register {
        package_id,
        world_registry,
        reward_vault,
    } = &args.command
    {
        return register(
            env,
            args.rpc_url.as_deref(),
            package_id,
            world_registry.as_deref(),
            reward_vault.as_deref(),
        );
    }
    let mut chain_config = ChainConfig::resolve(env).map_err(|e| eyre!("{e:#}"))?;
    if let Some(url) = &args.rpc_url {
        chain_config.rpc_url = url.clone();
    }
    let game = GameObjects::from_chain_config(&chain_config).map_err(|e| eyre!("{e:#}"))?;
    tracing::info!(
        "Using package {} on {} via {}",
        game.package,
        chain_config.env_label,
        chain_config.rpc_url
    );

    let data_dir = resolve_data_dir(args.data_dir.as_deref(), env);
    std::fs::create_dir_all(&data_dir)
        .wrap_err_with(|| format!("creating {}", data_dir.display()))?;
    let db = open_db(&data_dir).map_err(|e| eyre!("{e:#}"))?;
    let snapshots = SledSnapshotStorage::new(&db).map_err(|e| eyre!("{e:#}"))?;
    let store = SledSessionStore::new(&db).map_err(|e| eyre!("{e:#}"))?;

    let sui_config = resolve_sui_config_dir(args.sui_config.as_deref());
    let address = active_address(&sui_config).map_err(|e| eyre!("{e:#}"))?;
    let signer = KeytoolSigner::new(address.clone(), &sui_config).with_binary(&args.sui_bin);
    let rpc = SuiRpcClient::new(chain_config.rpc_url.clone()).map_err(|e| eyre!("{e:#}"))?;
    let reader = SuiRpcClient::new(chain_config.rpc_url.clone()).map_err(|e| eyre!("{e:#}"))?;
    let mut app = App::new(
        reader,
        snapshots,
        game.package.clone(),
        game.world_registry.clone(),
    );
    let retry = RetryPolicy::index_lookup(
        args.index_attempts,
        args.index_deadline_secs.map(Duration::from_secs),
    );
    let mut manager = SessionManager::new(SigningClient::new(rpc, signer), store, game.clone())?
        .with_retry_policy(retry);
    let resumed = manager.resume();
    if resumed != SessionPhase::Idle {
        println!("Resuming unfinished play: {}", describe_phase(resumed));
    }

    match args.command {
        Command::Status => {
            println!("Account: {address}");
            println!("Play: {}", describe_phase(manager.phase()));
            if let Some(session) = manager.session() {
                match session.play_id {
                    Some(play_id) => println!("Play id: {play_id}"),
                    None => println!("Commit digest: {:?}", session.digest),
                }
                println!("World: {}", session.world_id);
            }
            if let Some(target) = manager.target()? {
                println!(
                    "Key hidden at tile ({}, {}){}",
                    target.x,
                    target.y,
                    if target.found { ", found" } else { "" }
                );
            }
            let character =
                account::load_character(manager.chain(), &game.package, &address)
                    .await
                    .map_err(|e| eyre!("{e:#}"))?;
            match character {
                Some(character) => println!(
                    "Character {}: free plays {}/{}, paid plays {}/{}",
                    character.name,
                    character.free_daily_plays,
                    PlayMode::Free.daily_limit(),
                    character.daily_plays,
                    PlayMode::Paid.daily_limit(),
                ),
                None => println!("No character yet"),
            }
            let balance = account::reward_balance(
                manager.chain(),
                &address,
                &game.reward_coin_type,
            )
            .await
            .map_err(|e| eyre!("{e:#}"))?;
            println!("Reward balance: {balance}");
        }
        Command::World { world_id, ascii } => {
            let world_id = world_id
                .as_deref()
                .map(|raw| parse_object_id(raw, "world id"))
                .transpose()?;
            let map = app
                .refresh_world(world_id.as_ref())
                .await
                .map_err(|e| eyre!("{e:#}"))?;
            println!(
                "World {} ({}x{}, {} chunks, difficulty {})",
                map.world_id,
                map.grid.width(),
                map.grid.height(),
                map.chunk_count,
                map.difficulty
            );
            if ascii {
                print!("{}", map.grid.render_ascii());
            }
        }
        Command::Play { mode, world } => {
            let world = world
                .as_deref()
                .map(|raw| parse_object_id(raw, "world id"))
                .transpose()?;
            let map = world_map(&mut app, world.as_ref()).await?;
            let started = manager
                .start(StartRequest {
                    world_id: map.world_id.clone(),
                    mode,
                    grid: Some(&map.grid),
                })
                .await?;
            println!("Committed in {}", started.digest);
            println!(
                "Play key (keep it to claim from another device): {}",
                started.session.key.to_hex()
            );
            match (started.session.play_id, started.target) {
                (Some(play_id), Some(target)) => println!(
                    "Play {play_id} started; key hidden at tile ({}, {})",
                    target.x, target.y
                ),
                (Some(play_id), None) => {
                    println!("Play {play_id} started; the world has no walkable tile")
                }
                (None, _) => println!(
                    "Play id not indexed yet; run `retry-index` or `verify` later"
                ),
            }
        }
        Command::RetryIndex => {
            let map = match manager.session() {
                Some(session) => {
                    let world_id = session.world_id.clone();
                    Some(world_map(&mut app, Some(&world_id)).await?)
                }
                None => None,
            };
            match manager.retry_index(map.as_ref().map(|map| &map.grid)).await? {
                Some(play_id) => println!("Play {play_id} is active"),
                None => println!("Still not indexed; try again shortly"),
            }
        }
        Command::Reach { x, y } => {
            if manager.reach(x, y)? {
                println!("Key found! Run `redeem` to claim the reward");
            } else {
                println!("Nothing here");
            }
        }
        Command::Found => {
            manager.mark_found()?;
            println!("Key marked as found");
        }
        Command::Redeem => {
            let redemption = manager.redeem().await?;
            match redemption.reward {
                Some(reward) => println!(
                    "Play {} claimed in {}: reward {reward}",
                    redemption.play_id, redemption.digest
                ),
                None => println!(
                    "Play {} claimed in {}; reward not readable yet",
                    redemption.play_id, redemption.digest
                ),
            }
        }
        Command::Verify => match manager.verify_claim_status().await? {
            ClaimStatus::AlreadyClaimed { reward } => {
                println!("Already claimed (reward {reward:?}); local play cleared")
            }
            ClaimStatus::Unclaimed { truncated: false } => println!("Not claimed yet"),
            ClaimStatus::Unclaimed { truncated: true } => {
                println!("No claim in recent history; older claims were not searched")
            }
        },
        Command::Restore {
            play_id,
            key_hex,
            world,
        } => {
            let world_id = parse_object_id(&world, "world id")?;
            let map = app.cached_world(Some(&world_id)).map_err(|e| eyre!("{e:#}"))?;
            manager.restore(
                PlayId(play_id),
                &key_hex,
                world_id,
                map.as_ref().map(|map| &map.grid),
            )?;
            println!("Play {play_id} restored");
        }
        Command::Cancel => {
            manager.cancel()?;
            println!("Local play cleared");
        }
        // recorded before any connection is made
        Command::Register { .. } => {}
        Command::Unclaimed => {
            let plays = app
                .unclaimed_plays(&address)
                .await
                .map_err(|e| eyre!("{e:#}"))?;
            println!("{}", serde_json::to_string_pretty(&plays)?);
            if plays.truncated {
                println!("Older history was not searched");
            }
        }
    }
    Ok(())
}
