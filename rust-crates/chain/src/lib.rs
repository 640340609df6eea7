pub mod events;
pub mod fields;
pub mod ids;
pub mod rpc;
pub mod signer;
pub mod sui_rpc_client;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use ids::{
    Address,
    ObjectId,
    PlayId,
    TxDigest,
};
pub use signer::{
    SigningClient,
    TransactionSigner,
};
pub use sui_rpc_client::SuiRpcClient;

/// Move module holding the game's entry functions and events.
pub const WORLD_MODULE: &str = events::WORLD_MODULE;
