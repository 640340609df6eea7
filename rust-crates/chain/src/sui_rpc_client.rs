// JSON-RPC implementation of the read-side capabilities.
use crate::{
    events::ChainEvent,
    fields,
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
        ObjectData,
        ObjectReader,
        Page,
        TransactionBlock,
        TransactionReader,
    },
};
use anyhow::{
    Context,
    anyhow,
};
use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use serde_json::{
    Value,
    json,
};
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use thiserror::Error;

const PAGE_LIMIT: usize = 50;
const MULTI_GET_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("rpc response for {method} had neither result nor error")]
    EmptyResponse { method: String },
    #[error("invalid rpc payload for {method}: {source}")]
    Payload {
        method: String,
        source: serde_json::Error,
    },
}

pub struct SuiRpcClient {
    url: String,
    http: reqwest::Client,
    request_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl SuiRpcClient {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let url = url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client for rpc")?;
        Ok(Self {
            url,
            http,
            request_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(%method, %id, "rpc request");
        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response.result.ok_or_else(|| RpcError::EmptyResponse {
            method: method.to_string(),
        })?;
        serde_json::from_value(result).map_err(|source| RpcError::Payload {
            method: method.to_string(),
            source,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventDto {
    id: EventCursor,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    parsed_json: Value,
    #[serde(default)]
    timestamp_ms: Option<Value>,
}

impl From<EventDto> for ChainEvent {
    fn from(dto: EventDto) -> Self {
        ChainEvent {
            id: dto.id,
            event_type: dto.event_type,
            sender: dto.sender.and_then(|raw| raw.parse().ok()),
            parsed_json: dto.parsed_json,
            timestamp_ms: dto.timestamp_ms.as_ref().and_then(fields::parse_u64),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventPageDto {
    data: Vec<EventDto>,
    #[serde(default)]
    next_cursor: Option<EventCursor>,
    #[serde(default)]
    has_next_page: bool,
}

impl From<EventPageDto> for EventPage {
    fn from(dto: EventPageDto) -> Self {
        EventPage {
            data: dto.data.into_iter().map(Into::into).collect(),
            next_cursor: dto.next_cursor,
            has_next_page: dto.has_next_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ObjectResponseDto {
    #[serde(default)]
    data: Option<ObjectDataDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectDataDto {
    object_id: String,
    #[serde(default, rename = "type")]
    object_type: Option<String>,
    #[serde(default)]
    content: Option<ContentDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDto {
    data_type: String,
    #[serde(default, rename = "type")]
    content_type: Option<String>,
    #[serde(default)]
    fields: Value,
}

impl ObjectResponseDto {
    /// Only Move objects with content are interesting; packages and missing objects
    /// map to `None`.
    pub(crate) fn into_object(self) -> Option<ObjectData> {
        let data = self.data?;
        let content = data.content?;
        if content.data_type != "moveObject" {
            return None;
        }
        Some(ObjectData {
            object_id: data.object_id.parse().ok()?,
            object_type: data.object_type.or(content.content_type),
            fields: content.fields,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageDto<T> {
    data: Vec<T>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DynamicFieldDto {
    name: DynamicFieldName,
    object_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinDto {
    coin_object_id: String,
    balance: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionBlockDto {
    pub(crate) digest: String,
    #[serde(default)]
    events: Option<Vec<EventDto>>,
    #[serde(default)]
    pub(crate) effects: Option<EffectsDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EffectsDto {
    pub(crate) status: ExecutionStatusDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExecutionStatusDto {
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

impl TransactionBlockDto {
    /// A block whose events are not populated yet counts as not indexed.
    pub(crate) fn into_block(self) -> Option<TransactionBlock> {
        let events = self.events?;
        Some(TransactionBlock {
            digest: TxDigest::new(self.digest),
            events: events.into_iter().map(Into::into).collect(),
        })
    }
}

fn object_options() -> Value {
    json!({ "showContent": true, "showType": true })
}

impl ObjectReader for SuiRpcClient {
    async fn get_object(&self, id: &ObjectId) -> anyhow::Result<Option<ObjectData>> {
        let response: ObjectResponseDto = self
            .call("sui_getObject", json!([id, object_options()]))
            .await
            .with_context(|| format!("reading object {id}"))?;
        Ok(response.into_object())
    }

    async fn multi_get_objects(
        &self,
        ids: &[ObjectId],
    ) -> anyhow::Result<Vec<Option<ObjectData>>> {
        let mut objects = Vec::with_capacity(ids.len());
        for batch in ids.chunks(MULTI_GET_LIMIT) {
            let responses: Vec<ObjectResponseDto> = self
                .call("sui_multiGetObjects", json!([batch, object_options()]))
                .await
                .context("reading object batch")?;
            if responses.len() != batch.len() {
                return Err(anyhow!(
                    "multi-get returned {} objects for {} ids",
                    responses.len(),
                    batch.len()
                ));
            }
            objects.extend(responses.into_iter().map(ObjectResponseDto::into_object));
        }
        Ok(objects)
    }

    async fn dynamic_fields(
        &self,
        parent: &ObjectId,
        cursor: Option<String>,
        limit: usize,
    ) -> anyhow::Result<Page<DynamicFieldInfo>> {
        let page: PageDto<DynamicFieldDto> = self
            .call("suix_getDynamicFields", json!([parent, cursor, limit]))
            .await
            .with_context(|| format!("listing dynamic fields of {parent}"))?;
        let data = page
            .data
            .into_iter()
            .filter_map(|dto| {
                Some(DynamicFieldInfo {
                    name: dto.name,
                    object_id: dto.object_id.parse().ok()?,
                })
            })
            .collect();
        Ok(Page {
            data,
            next_cursor: page.next_cursor,
            has_next_page: page.has_next_page,
        })
    }

    async fn dynamic_field_object(
        &self,
        parent: &ObjectId,
        name: &DynamicFieldName,
    ) -> anyhow::Result<Option<ObjectData>> {
        let result: Result<ObjectResponseDto, RpcError> = self
            .call("suix_getDynamicFieldObject", json!([parent, name]))
            .await;
        match result {
            Ok(response) => Ok(response.into_object()),
            // a missing field is reported as an rpc error by some nodes
            Err(RpcError::Rpc { code, message }) => {
                tracing::debug!(%parent, %code, %message, "dynamic field not found");
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("reading dynamic field of {parent}")),
        }
    }

    async fn owned_objects(
        &self,
        owner: &Address,
        struct_type: &str,
    ) -> anyhow::Result<Vec<ObjectData>> {
        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let query = json!({
                "filter": { "StructType": struct_type },
                "options": object_options(),
            });
            let page: PageDto<ObjectResponseDto> = self
                .call(
                    "suix_getOwnedObjects",
                    json!([owner, query, cursor, PAGE_LIMIT]),
                )
                .await
                .with_context(|| format!("listing {struct_type} owned by {owner}"))?;
            objects.extend(page.data.into_iter().filter_map(ObjectResponseDto::into_object));
            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => return Ok(objects),
            }
        }
    }

    async fn coins(&self, owner: &Address, coin_type: &str) -> anyhow::Result<Vec<Coin>> {
        let mut coins = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: PageDto<CoinDto> = self
                .call(
                    "suix_getCoins",
                    json!([owner, coin_type, cursor, PAGE_LIMIT]),
                )
                .await
                .with_context(|| format!("listing {coin_type} coins of {owner}"))?;
            for dto in page.data {
                let balance = fields::parse_u64(&dto.balance)
                    .ok_or_else(|| anyhow!("coin {} has invalid balance", dto.coin_object_id))?;
                coins.push(Coin {
                    coin_object_id: dto.coin_object_id.parse()?,
                    balance,
                });
            }
            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => return Ok(coins),
            }
        }
    }
}

impl EventReader for SuiRpcClient {
    async fn query_events(
        &self,
        query: &EventQuery,
        cursor: Option<EventCursor>,
        limit: usize,
        order: EventOrder,
    ) -> anyhow::Result<EventPage> {
        let descending = matches!(order, EventOrder::Descending);
        let page: EventPageDto = self
            .call(
                "suix_queryEvents",
                json!([
                    { "MoveEventType": query.move_event_type },
                    cursor,
                    limit,
                    descending,
                ]),
            )
            .await
            .with_context(|| format!("querying {} events", query.move_event_type))?;
        Ok(page.into())
    }
}

impl TransactionReader for SuiRpcClient {
    async fn transaction_block(
        &self,
        digest: &TxDigest,
    ) -> anyhow::Result<Option<TransactionBlock>> {
        let result: Result<TransactionBlockDto, RpcError> = self
            .call(
                "sui_getTransactionBlock",
                json!([digest, { "showEvents": true, "showEffects": true }]),
            )
            .await;
        match result {
            Ok(block) => Ok(block.into_block()),
            Err(RpcError::Rpc { code, message }) => {
                tracing::debug!(%digest, %code, %message, "transaction not indexed yet");
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("reading transaction {digest}")),
        }
    }
}
