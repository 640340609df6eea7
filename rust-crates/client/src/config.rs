use anyhow::{
    Context,
    anyhow,
};
use chain::ObjectId;
use deployments::{
    ChainConfig,
    DeploymentEnv,
};
use std::path::PathBuf;

const DEFAULT_DATA_ROOT: &str = "~/.chunkworld";

/// Shared objects every play and claim transaction touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameObjects {
    pub package: ObjectId,
    pub world_registry: Option<ObjectId>,
    pub reward_vault: ObjectId,
    pub random: ObjectId,
    pub reward_coin_type: String,
}

impl GameObjects {
    pub fn from_chain_config(config: &ChainConfig) -> anyhow::Result<Self> {
        let package: ObjectId = config
            .package_id
            .parse()
            .with_context(|| format!("parsing package id '{}'", config.package_id))?;
        let world_registry = config
            .world_registry_id
            .as_deref()
            .map(|raw| {
                raw.parse()
                    .with_context(|| format!("parsing world registry id '{raw}'"))
            })
            .transpose()?;
        let reward_vault = config
            .reward_vault_id
            .as_deref()
            .ok_or_else(|| anyhow!("missing reward vault id for {}", config.env_label))?
            .parse()
            .context("parsing reward vault id")?;
        let random = config
            .random_object_id
            .parse()
            .context("parsing random object id")?;
        Ok(Self {
            reward_coin_type: format!("{package}::reward_coin::REWARD_COIN"),
            package,
            world_registry,
            reward_vault,
            random,
        })
    }
}

/// Sled directory for the session store and world cache, `~/.chunkworld/<env>` unless
/// overridden.
pub fn resolve_data_dir(dir: Option<&str>, env: DeploymentEnv) -> PathBuf {
    match dir {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        None => PathBuf::from(shellexpand::tilde(DEFAULT_DATA_ROOT).into_owned())
            .join(env.dir_name()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn config() -> ChainConfig {
        ChainConfig {
            env_label: "Testnet".to_string(),
            rpc_url: "http://localhost:9000".to_string(),
            package_id: "0xabc".to_string(),
            world_registry_id: None,
            reward_vault_id: Some("0x2".to_string()),
            random_object_id: "0x8".to_string(),
        }
    }

    #[test]
    fn from_chain_config__normalizes_ids_and_coin_type() {
        // when
        let objects = GameObjects::from_chain_config(&config()).unwrap();

        // then
        assert_eq!(objects.random, "0x8".parse::<ObjectId>().unwrap());
        assert!(objects.reward_coin_type.starts_with("0x0000"));
        assert!(objects.reward_coin_type.ends_with("abc::reward_coin::REWARD_COIN"));
        assert_eq!(objects.world_registry, None);
    }

    #[test]
    fn from_chain_config__without_vault__is_error() {
        let mut config = config();
        config.reward_vault_id = None;

        assert!(GameObjects::from_chain_config(&config).is_err());
    }

    #[test]
    fn resolve_data_dir__default_is_per_environment() {
        let dir = resolve_data_dir(None, DeploymentEnv::Local);

        assert!(dir.ends_with(".chunkworld/local"));
        assert_eq!(
            resolve_data_dir(Some("/tmp/cw"), DeploymentEnv::Local),
            PathBuf::from("/tmp/cw")
        );
    }
}
