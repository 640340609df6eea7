use crate::{
    ids::{
        Address,
        ObjectId,
        TxDigest,
    },
    rpc::{
        Coin,
        DynamicFieldInfo,
        DynamicFieldName,
        EventCursor,
        EventOrder,
        EventPage,
        EventQuery,
        EventReader,
        MoveCall,
        ObjectData,
        ObjectReader,
        Page,
        TransactionBlock,
        TransactionReader,
        TransactionSubmitter,
    },
    sui_rpc_client::{
        SuiRpcClient,
        TransactionBlockDto,
    },
};
use anyhow::{
    Context,
    anyhow,
};
use serde::Deserialize;
use serde_json::{
    Value,
    json,
};

pub const DEFAULT_GAS_BUDGET: u64 = 50_000_000;

/// Produces serialized signatures over transaction bytes for one account.
pub trait TransactionSigner {
    fn address(&self) -> &Address;

    /// `tx_bytes` is the base64 transaction data returned by the node; the result is
    /// the base64 serialized signature the node expects alongside it.
    fn sign(&self, tx_bytes: &str) -> impl Future<Output = anyhow::Result<String>>;
}

/// Read access plus submission on behalf of the signer's account.
pub struct SigningClient<S> {
    rpc: SuiRpcClient,
    signer: S,
    gas_budget: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBytes {
    tx_bytes: String,
}

impl<S> SigningClient<S>
where
    S: TransactionSigner,
{
    pub fn new(rpc: SuiRpcClient, signer: S) -> Self {
        Self {
            rpc,
            signer,
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }

    pub fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }

    pub fn rpc(&self) -> &SuiRpcClient {
        &self.rpc
    }
}

fn move_call_params(sender: &Address, call: &MoveCall, gas_budget: u64) -> Value {
    let arguments: Vec<Value> = call.arguments.iter().map(|arg| arg.to_json()).collect();
    json!([
        sender,
        call.package,
        call.module,
        call.function,
        call.type_arguments,
        arguments,
        Value::Null,
        gas_budget.to_string(),
    ])
}

/// Maps the executed block to its digest, or to the chain's abort message.
fn execution_outcome(block: TransactionBlockDto) -> anyhow::Result<TxDigest> {
    let digest = TxDigest::new(block.digest);
    match block.effects {
        Some(effects) if effects.status.status != "success" => Err(anyhow!(
            "transaction {digest} failed: {}",
            effects
                .status
                .error
                .unwrap_or_else(|| effects.status.status.clone())
        )),
        _ => Ok(digest),
    }
}

impl<S> TransactionSubmitter for SigningClient<S>
where
    S: TransactionSigner,
{
    async fn submit(&self, call: &MoveCall) -> anyhow::Result<TxDigest> {
        let target = call.target();
        let unsigned: TransactionBytes = self
            .rpc
            .call(
                "unsafe_moveCall",
                move_call_params(self.signer.address(), call, self.gas_budget),
            )
            .await
            .with_context(|| format!("building transaction for {target}"))?;
        let signature = self
            .signer
            .sign(&unsigned.tx_bytes)
            .await
            .with_context(|| format!("signing transaction for {target}"))?;
        let executed: TransactionBlockDto = self
            .rpc
            .call(
                "sui_executeTransactionBlock",
                json!([
                    unsigned.tx_bytes,
                    [signature],
                    { "showEffects": true },
                    "WaitForLocalExecution",
                ]),
            )
            .await
            .with_context(|| format!("executing transaction for {target}"))?;
        let digest = execution_outcome(executed)?;
        tracing::info!(%target, %digest, "transaction executed");
        Ok(digest)
    }

    fn sender(&self) -> &Address {
        self.signer.address()
    }
}

impl<S> ObjectReader for SigningClient<S> {
    async fn get_object(&self, id: &ObjectId) -> anyhow::Result<Option<ObjectData>> {
        self.rpc.get_object(id).await
    }

    async fn multi_get_objects(
        &self,
        ids: &[ObjectId],
    ) -> anyhow::Result<Vec<Option<ObjectData>>> {
        self.rpc.multi_get_objects(ids).await
    }

    async fn dynamic_fields(
        &self,
        parent: &ObjectId,
        cursor: Option<String>,
        limit: usize,
    ) -> anyhow::Result<Page<DynamicFieldInfo>> {
        self.rpc.dynamic_fields(parent, cursor, limit).await
    }

    async fn dynamic_field_object(
        &self,
        parent: &ObjectId,
        name: &DynamicFieldName,
    ) -> anyhow::Result<Option<ObjectData>> {
        self.rpc.dynamic_field_object(parent, name).await
    }

    async fn owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> anyhow::Result<Vec<ObjectData>> {
        self.rpc.owned_objects(owner, struct_type).await
    }

    async fn coins(&self, owner: &Address, coin_type: &str) -> anyhow::Result<Vec<Coin>> {
        self.rpc.coins(owner, coin_type).await
    }
}

impl<S> EventReader for SigningClient<S> {
    async fn query_events(
        &self,
        query: &EventQuery,
        cursor: Option<EventCursor>,
        limit: usize,
        order: EventOrder,
    ) -> anyhow::Result<EventPage> {
        self.rpc.query_events(query, cursor, limit, order).await
    }
}

impl<S> TransactionReader for SigningClient<S> {
    async fn transaction_block(
        &self,
        digest: &TxDigest,
    ) -> anyhow::Result<Option<TransactionBlock>> {
        self.rpc.transaction_block(digest).await
    }
}
