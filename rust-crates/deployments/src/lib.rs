use anyhow::{
    Context,
    Result,
    anyhow,
};
use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

pub const ENV_RPC_URL: &str = "CHUNKWORLD_RPC_URL";
pub const ENV_PACKAGE_ID: &str = "CHUNKWORLD_PACKAGE_ID";
pub const ENV_WORLD_REGISTRY: &str = "CHUNKWORLD_WORLD_REGISTRY";
pub const ENV_REWARD_VAULT: &str = "CHUNKWORLD_REWARD_VAULT";
pub const ENV_RANDOM_OBJECT_ID: &str = "CHUNKWORLD_RANDOM_OBJECT_ID";

/// The shared on-chain randomness object.
pub const DEFAULT_RANDOM_OBJECT_ID: &str = "0x8";

const TESTNET_PACKAGE_ID: &str =
    "0x153e0a84431e269febf163f75fee2f26526849f48d408ee20b812a9329ac5374";
const TESTNET_WORLD_REGISTRY_ID: &str =
    "0x4550843c52763748bd5cf32c9a49ba8d0e4ff73649df7855d30b3ad75b08b21c";
const TESTNET_REWARD_VAULT_ID: &str =
    "0x9b58af962b5e8e5009779f4af7bb0717c626f7e120a8e2c4b4eedbb431b84a62";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Dev,
    Test,
    Local,
}

impl DeploymentEnv {
    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "dev",
            DeploymentEnv::Test => "test",
            DeploymentEnv::Local => "local",
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "https://fullnode.devnet.sui.io:443",
            DeploymentEnv::Test => "https://fullnode.testnet.sui.io",
            DeploymentEnv::Local => "http://127.0.0.1:9000",
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Dev => "Devnet",
            DeploymentEnv::Test => "Testnet",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

impl FromStr for DeploymentEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "devnet" => Ok(DeploymentEnv::Dev),
            "test" | "testnet" => Ok(DeploymentEnv::Test),
            "local" | "localnet" => Ok(DeploymentEnv::Local),
            other => Err(anyhow!("unknown deployment environment '{other}'")),
        }
    }
}

fn default_random_object_id() -> String {
    DEFAULT_RANDOM_OBJECT_ID.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub package_id: String,
    pub network_url: String,
    #[serde(default)]
    pub world_registry_id: Option<String>,
    #[serde(default)]
    pub reward_vault_id: Option<String>,
    #[serde(default = "default_random_object_id")]
    pub random_object_id: String,
}

impl DeploymentRecord {
    /// A record stamped with the current time, using the shared randomness object.
    pub fn new(
        package_id: impl Into<String>,
        network_url: impl Into<String>,
        world_registry_id: Option<String>,
        reward_vault_id: Option<String>,
    ) -> Self {
        Self {
            deployed_at: Utc::now().to_rfc3339(),
            package_id: package_id.into(),
            network_url: network_url.into(),
            world_registry_id,
            reward_vault_id,
            random_object_id: default_random_object_id(),
        }
    }

    /// The package published to testnet that the game currently runs against.
    pub fn testnet() -> Self {
        Self {
            deployed_at: String::new(),
            package_id: TESTNET_PACKAGE_ID.to_string(),
            network_url: DeploymentEnv::Test.default_rpc_url().to_string(),
            world_registry_id: Some(TESTNET_WORLD_REGISTRY_ID.to_string()),
            reward_vault_id: Some(TESTNET_REWARD_VAULT_ID.to_string()),
            random_object_id: default_random_object_id(),
        }
    }
}

#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(Path::new(DEPLOYMENTS_ROOT), env)?;
        Ok(Self { path })
    }

    /// Store rooted somewhere other than `.deployments` in the working directory.
    pub fn in_root(root: impl AsRef<Path>, env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(root.as_ref(), env)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        read_record(&self.path)
    }

    pub fn save(&self, record: DeploymentRecord) -> Result<()> {
        write_record(&self.path, &record)
    }

    /// Replaces the stored record with one for `package_id`, keeping nothing from the
    /// previous deployment.
    pub fn record_deployment(
        &self,
        package_id: impl Into<String>,
        network_url: impl Into<String>,
        world_registry_id: Option<String>,
        reward_vault_id: Option<String>,
    ) -> Result<DeploymentRecord> {
        let record = DeploymentRecord::new(
            package_id,
            network_url,
            world_registry_id,
            reward_vault_id,
        );
        self.save(record.clone())?;
        Ok(record)
    }
}

fn ensure_store(root: &Path, env: DeploymentEnv) -> Result<PathBuf> {
    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).with_context(|| {
            format!("Failed to create {} directory", env_dir.display())
        })?;
    }

    let file_path = env_dir.join(DEPLOYMENTS_FILE);
    if !file_path.exists() {
        let mut file = fs::File::create(&file_path).with_context(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                env, file_path
            )
        })?;
        file.write_all(b"").with_context(|| {
            format!("Failed to initialize deployment record file for {}", env)
        })?;
    }

    Ok(file_path)
}

fn read_record(path: impl AsRef<Path>) -> Result<Option<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).context("Failed to read deployment records")?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    if let Ok(record) = serde_json::from_slice::<DeploymentRecord>(&data) {
        return Ok(Some(record));
    }
    if let Ok(mut records) = serde_json::from_slice::<Vec<DeploymentRecord>>(&data) {
        return Ok(records.pop());
    }
    Err(anyhow!(
        "Failed to parse deployment record JSON; expected a single deployment object"
    ))
}

fn write_record(path: impl AsRef<Path>, record: &DeploymentRecord) -> Result<()> {
    let json = serde_json::to_vec_pretty(record)
        .context("Failed to serialize deployment record")?;
    fs::write(path.as_ref(), json).context("Failed to write deployment record")?;
    Ok(())
}

/// Ids and endpoint the client and indexer talk to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainConfig {
    pub env_label: String,
    pub rpc_url: String,
    pub package_id: String,
    pub world_registry_id: Option<String>,
    pub reward_vault_id: Option<String>,
    pub random_object_id: String,
}

impl ChainConfig {
    pub fn from_record(env: DeploymentEnv, record: &DeploymentRecord) -> Self {
        Self {
            env_label: env.to_string(),
            rpc_url: record.network_url.clone(),
            package_id: record.package_id.clone(),
            world_registry_id: record.world_registry_id.clone(),
            reward_vault_id: record.reward_vault_id.clone(),
            random_object_id: record.random_object_id.clone(),
        }
    }

    /// Layers, later wins: built-in testnet ids, the stored deployment record, then
    /// `CHUNKWORLD_*` environment variables.
    pub fn resolve(env: DeploymentEnv) -> Result<Self> {
        let store = DeploymentStore::new(env).context("opening deployments store")?;
        Self::resolve_with(env, store.load()?, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(
        env: DeploymentEnv,
        stored: Option<DeploymentRecord>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let base = match (stored, env) {
            (Some(record), _) => Some(Self::from_record(env, &record)),
            (None, DeploymentEnv::Test) => {
                Some(Self::from_record(env, &DeploymentRecord::testnet()))
            }
            (None, _) => None,
        };
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = match (base, var(ENV_PACKAGE_ID)) {
            (Some(config), _) => config,
            (None, Some(package_id)) => Self {
                env_label: env.to_string(),
                rpc_url: env.default_rpc_url().to_string(),
                package_id,
                world_registry_id: None,
                reward_vault_id: None,
                random_object_id: default_random_object_id(),
            },
            (None, None) => {
                return Err(anyhow!(
                    "No deployment record found for {env}; set {ENV_PACKAGE_ID} or run `chunkworld register`"
                ));
            }
        };
        if let Some(url) = var(ENV_RPC_URL) {
            config.rpc_url = url;
        }
        if let Some(package_id) = var(ENV_PACKAGE_ID) {
            config.package_id = package_id;
        }
        if let Some(registry) = var(ENV_WORLD_REGISTRY) {
            config.world_registry_id = Some(registry);
        }
        if let Some(vault) = var(ENV_REWARD_VAULT) {
            config.reward_vault_id = Some(vault);
        }
        if let Some(random) = var(ENV_RANDOM_OBJECT_ID) {
            config.random_object_id = random;
        }
        Ok(config)
    }

    pub fn reward_coin_type(&self) -> String {
        format!("{}::reward_coin::REWARD_COIN", self.package_id)
    }
}
