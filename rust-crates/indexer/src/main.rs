use anyhow::Context;
use chain::{
    Address,
    ObjectId,
    PlayId,
    SuiRpcClient,
};
use clap::{
    ArgGroup,
    Parser,
    Subcommand,
};
use deployments::{
    ChainConfig,
    DeploymentEnv,
};
use indexer::app::{
    App,
    init_tracing,
    sled_storage::SledSnapshotStorage,
};
use serde::Serialize;
use std::{
    env::current_dir,
    fs,
    path::PathBuf,
};
use url::Url;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Replays chunk-world events into marketplace, world and play snapshots",
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
    rpc_url: Option<Url>,

    #[arg(short, long)]
    package_id: Option<String>,

    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    #[arg(short, long, default_value = "false")]
    tracing: bool,

    #[arg(long)]
    local: bool,

    #[arg(long)]
    dev: bool,

    #[arg(long)]
    test: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open listings and recent sales
    Marketplace {
        /// only show this seller's recent sales
        #[arg(long)]
        seller: Option<String>,
        /// print the last stored snapshot without replaying
        #[arg(long)]
        cached: bool,
    },
    /// Known world ids, registry world first
    Worlds,
    /// Load a world's tile grid
    World {
        world_id: Option<String>,
        #[arg(long)]
        ascii: bool,
        #[arg(long)]
        cached: bool,
    },
    /// Plays created by an address that were never claimed
    Plays { creator: String },
    /// Look up the reward claim for a play
    Claim { play_id: String },
    /// Proceeds waiting for a seller in a world
    Proceeds { world_id: String, owner: String },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_object_id(raw: &str, what: &str) -> anyhow::Result<ObjectId> {
    raw.parse()
        .with_context(|| format!("parsing {what} '{raw}'"))
}

fn parse_address(raw: &str) -> anyhow::Result<Address> {
    raw.parse()
        .with_context(|| format!("parsing address '{raw}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.tracing {
        init_tracing();
    }
    let (deployment_env, network_label) = if args.local {
        (DeploymentEnv::Local, "local")
    } else if args.dev {
        (DeploymentEnv::Dev, "dev")
    } else {
        (DeploymentEnv::Test, "test")
    };
    let mut config =
        ChainConfig::resolve(deployment_env).context("resolving chain configuration")?;
    if let Some(url) = &args.rpc_url {
        config.rpc_url = url.to_string();
    }
    if let Some(package_id) = &args.package_id {
        config.package_id = package_id.clone();
    }
    tracing::info!(
        "Using package {} on {} via {}",
        config.package_id,
        config.env_label,
        config.rpc_url
    );

    let package = parse_object_id(&config.package_id, "package id")?;
    let registry = config
        .world_registry_id
        .as_deref()
        .map(|raw| parse_object_id(raw, "world registry id"))
        .transpose()?;

    let storage_path = match &args.snapshot_dir {
        Some(path) => path.clone(),
        None => current_dir()
            .context("determine process working directory")?
            .join("chunkworld_indexer_data")
            .join(network_label)
            .join(package.as_str())
            .join("snapshots"),
    };
    fs::create_dir_all(&storage_path)?;
    tracing::info!("Using sled storage directory {}", storage_path.display());

    let snapshots = SledSnapshotStorage::open(&storage_path)?;
    let chain = SuiRpcClient::new(config.rpc_url.clone())?;
    let mut app = App::new(chain, snapshots, package, registry);

    match args.command {
        Command::Marketplace { seller, cached } => {
            let snapshot = if cached {
                app.latest_marketplace()?.unwrap_or_default()
            } else {
                app.refresh_marketplace().await?
            };
            match seller {
                Some(seller) => {
                    let seller = parse_address(&seller)?;
                    print_json(&snapshot.recent_sales_by(&seller))?;
                }
                None => print_json(&snapshot)?,
            }
        }
        Command::Worlds => {
            print_json(&app.world_list().await?)?;
        }
        Command::World {
            world_id,
            ascii,
            cached,
        } => {
            let world_id = world_id
                .as_deref()
                .map(|raw| parse_object_id(raw, "world id"))
                .transpose()?;
            let map = if cached {
                app.cached_world(world_id.as_ref())?
                    .context("no cached world map; run without --cached first")?
            } else {
                app.refresh_world(world_id.as_ref()).await?
            };
            if ascii {
                println!("{}", map.grid.render_ascii());
            } else {
                print_json(&map)?;
            }
        }
        Command::Plays { creator } => {
            let creator = parse_address(&creator)?;
            print_json(&app.unclaimed_plays(&creator).await?)?;
        }
        Command::Claim { play_id } => {
            let play_id: PlayId = play_id
                .parse()
                .with_context(|| format!("parsing play id '{play_id}'"))?;
            print_json(&app.find_claim(play_id).await?)?;
        }
        Command::Proceeds { world_id, owner } => {
            let world_id = parse_object_id(&world_id, "world id")?;
            let owner = parse_address(&owner)?;
            println!("{}", app.seller_proceeds(&world_id, &owner).await?);
        }
    }
    Ok(())
}
