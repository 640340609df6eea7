use anyhow::{
    Context,
    anyhow,
    bail,
};
use chain::{
    Address,
    TransactionSigner,
};
use serde::Deserialize;
use std::path::{
    Path,
    PathBuf,
};
use tokio::process::Command;

const DEFAULT_SUI_CONFIG_DIR: &str = "~/.sui/sui_config";
const CLIENT_CONFIG_FILE: &str = "client.yaml";
const KEYSTORE_FILE: &str = "sui.keystore";

pub fn resolve_sui_config_dir(dir: Option<&str>) -> PathBuf {
    let raw = dir.unwrap_or(DEFAULT_SUI_CONFIG_DIR);
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// `active_address` from a Sui `client.yaml`.
pub fn parse_active_address(client_yaml: &str) -> Option<Address> {
    client_yaml.lines().find_map(|line| {
        let value = line.trim().strip_prefix("active_address:")?;
        value
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .parse()
            .ok()
    })
}

pub fn active_address(config_dir: &Path) -> anyhow::Result<Address> {
    let path = config_dir.join(CLIENT_CONFIG_FILE);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_active_address(&contents)
        .ok_or_else(|| anyhow!("no active_address set in {}", path.display()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeytoolSignature {
    sui_signature: String,
}

/// Signs through `sui keytool`, so keys never leave the Sui keystore.
#[derive(Debug, Clone)]
pub struct KeytoolSigner {
    address: Address,
    sui_bin: PathBuf,
    keystore: PathBuf,
}

impl KeytoolSigner {
    pub fn new(address: Address, config_dir: &Path) -> Self {
        Self {
            address,
            sui_bin: PathBuf::from("sui"),
            keystore: config_dir.join(KEYSTORE_FILE),
        }
    }

    pub fn with_binary(mut self, sui_bin: impl Into<PathBuf>) -> Self {
        self.sui_bin = sui_bin.into();
        self
    }

    fn sign_command(&self, tx_bytes: &str) -> Command {
        let mut command = Command::new(&self.sui_bin);
        command
            .arg("keytool")
            .arg("--keystore-path")
            .arg(&self.keystore)
            .arg("--json")
            .arg("sign")
            .arg("--address")
            .arg(self.address.as_str())
            .arg("--data")
            .arg(tx_bytes);
        command
    }
}

impl TransactionSigner for KeytoolSigner {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn sign(&self, tx_bytes: &str) -> anyhow::Result<String> {
        let output = self
            .sign_command(tx_bytes)
            .output()
            .await
            .with_context(|| format!("running {}", self.sui_bin.display()))?;
        if !output.status.success() {
            bail!(
                "sui keytool sign failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let signed: KeytoolSignature = serde_json::from_slice(&output.stdout)
            .context("parsing sui keytool output")?;
        Ok(signed.sui_signature)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn parse_active_address__reads_quoted_or_bare_value() {
        // given
        let yaml = "keystore:\n  File: /home/me/.sui/sui_config/sui.keystore\nactive_env: testnet\nactive_address: \"0x2a\"\n";

        // when
        let address = parse_active_address(yaml).unwrap();

        // then
        assert_eq!(address, "0x2a".parse::<Address>().unwrap());
        assert_eq!(
            parse_active_address("active_address: 0x2a"),
            Some(address)
        );
        assert_eq!(parse_active_address("active_env: testnet"), None);
    }

    #[test]
    fn sign_command__passes_keystore_address_and_bytes() {
        // given
        let signer = KeytoolSigner::new("0x2a".parse().unwrap(), Path::new("/cfg"));

        // when
        let command = signer.sign_command("AAEC");

        // then
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[0], "keytool");
        assert_eq!(args[2], "/cfg/sui.keystore");
        assert_eq!(args[6], signer.address().as_str());
        assert_eq!(args.last().map(String::as_str), Some("AAEC"));
    }

    #[test]
    fn resolve_sui_config_dir__expands_home() {
        let dir = resolve_sui_config_dir(None);

        assert!(dir.ends_with(".sui/sui_config"));
    }
}
