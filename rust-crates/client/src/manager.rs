//! Commit-reveal play sessions.
//!
//! A play starts by committing to `sha3_256(key)` on chain and ends by revealing
//! `key` once the player has found the hidden tile. The key is the only way to
//! claim, so once a commit transaction has been submitted the session is persisted
//! before anything else can fail.

use crate::{
    account::{
        self,
        PlayMode,
    },
    commitment::{
        Commitment,
        KeyError,
        PlayKey,
    },
    config::GameObjects,
    retry::RetryPolicy,
    session::{
        PlayTarget,
        Session,
        SessionPhase,
    },
    session_store::SessionStore,
};
use chain::{
    ObjectId,
    PlayId,
    TxDigest,
    WORLD_MODULE,
    events::{
        DecodeEvent,
        PlayCreatedEvent,
        RewardClaimedEvent,
    },
    rpc::{
        CallArg,
        Coin,
        EventReader,
        MoveCall,
        ObjectReader,
        TransactionReader,
        TransactionSubmitter,
    },
};
use indexer::{
    app::find_claim,
    world::WorldGrid,
};
use thiserror::Error;


const CLAIM_FUNCTION: &str = "claim_reward";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("another play is still in progress; redeem or cancel it first")]
    SessionInFlight,
    #[error("no play in progress")]
    NoSession,
    #[error("no character found for this account; create one first")]
    NoCharacter,
    #[error("{mode} play limit reached ({limit}/day)")]
    LimitReached { mode: PlayMode, limit: u64 },
    #[error("need a reward coin holding at least {fee} to pay for the play")]
    InsufficientFee { fee: u64 },
    #[error("play id is not known yet; retry the index lookup")]
    PlayIdUnknown,
    #[error("the hidden key has not been found yet")]
    KeyNotFound,
    #[error("invalid play key: {0}")]
    InvalidKey(#[from] KeyError),
    #[error("{0:#}")]
    Chain(anyhow::Error),
    #[error("local session store: {0:#}")]
    Store(anyhow::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone)]
pub struct StartRequest<'a> {
    pub world_id: ObjectId,
    pub mode: PlayMode,
    /// map the hidden key is placed on; no target is stored without one
    pub grid: Option<&'a WorldGrid>,
}

/// A committed play, with the key the user should keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    pub session: Session,
    pub target: Option<PlayTarget>,
    pub digest: TxDigest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub play_id: PlayId,
    /// `None` when the claim transaction could not be read back in time
    pub reward: Option<u64>,
    pub digest: TxDigest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStatus {
    /// a claim already exists on chain; local state was cleared
    AlreadyClaimed { reward: Option<u64> },
    /// no claim found; `truncated` means older claim history was not searched
    Unclaimed { truncated: bool },
}

fn commit_call(
    game: &GameObjects,
    world_id: &ObjectId,
    character: &ObjectId,
    fee_coin: Option<&Coin>,
    commitment: &Commitment,
) -> MoveCall {
    let mut arguments = vec![
        CallArg::object(world_id),
        CallArg::object(&game.reward_vault),
        CallArg::object(character),
    ];
    let function = match fee_coin {
        Some(coin) => {
            arguments.push(CallArg::object(&coin.coin_object_id));
            PlayMode::Paid.entry_function()
        }
        None => PlayMode::Free.entry_function(),
    };
    arguments.push(CallArg::bytes(commitment.as_bytes()));
    MoveCall::new(&game.package, WORLD_MODULE, function, arguments)
}

fn claim_call(
    game: &GameObjects,
    session: &Session,
    play_id: PlayId,
    character: &ObjectId,
) -> MoveCall {
    MoveCall::new(
        &game.package,
        WORLD_MODULE,
        CLAIM_FUNCTION,
        vec![
            CallArg::object(&session.world_id),
            CallArg::object(&game.reward_vault),
            CallArg::object(character),
            CallArg::object(&game.random),
            CallArg::u64(play_id.0),
            CallArg::bytes(session.key.as_bytes()),
        ],
    )
}

/// `Ok(None)` while the transaction is not indexed; once it is, whether it created a play.
async fn indexed_play_id<R: TransactionReader>(
    reader: &R,
    digest: &TxDigest,
) -> anyhow::Result<Option<Option<PlayId>>> {
    let block = reader.transaction_block(digest).await?;
    Ok(block.map(|block| PlayCreatedEvent::find_in(&block.events).map(|play| play.event.play_id)))
}

async fn indexed_reward<R: TransactionReader>(
    reader: &R,
    digest: &TxDigest,
) -> anyhow::Result<Option<Option<u64>>> {
    let block = reader.transaction_block(digest).await?;
    Ok(block.map(|block| {
        RewardClaimedEvent::find_in(&block.events).and_then(|claim| claim.event.reward)
    }))
}

fn pick_target(grid: Option<&WorldGrid>, world_id: &ObjectId) -> Option<PlayTarget> {
    let position = grid?.pick_key_target(&mut rand::rng())?;
    Some(PlayTarget::new(position, world_id.clone()))
}

pub struct SessionManager<Chain, Store> {
    chain: Chain,
    store: Store,
    game: GameObjects,
    retry: RetryPolicy,
    phase: SessionPhase,
    session: Option<Session>,
}

impl<Chain, Store> SessionManager<Chain, Store>
where
    Store: SessionStore,
{
    /// Picks up an unfinished session from `store`, entering `Recovering` if there is one.
    pub fn new(chain: Chain, store: Store, game: GameObjects) -> SessionResult<Self> {
        let session = store.load().map_err(SessionError::Store)?;
        let phase = match &session {
            Some(session) => {
                tracing::info!(play_id = ?session.play_id, "recovering unfinished play");
                SessionPhase::Recovering
            }
            None => SessionPhase::Idle,
        };
        Ok(Self {
            chain,
            store,
            game,
            retry: RetryPolicy::default(),
            phase,
            session,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn target(&self) -> SessionResult<Option<PlayTarget>> {
        self.store.load_target().map_err(SessionError::Store)
    }

    /// Leaves `Recovering` for the phase the stored session is actually in.
    pub fn resume(&mut self) -> SessionPhase {
        if self.phase == SessionPhase::Recovering {
            self.phase = self.current_phase();
        }
        self.phase
    }

    fn current_phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map_or(SessionPhase::Idle, Session::phase)
    }

    fn persist(&mut self, session: Session) -> SessionResult<()> {
        self.phase = session.phase();
        self.session = Some(session.clone());
        self.store.save(&session).map_err(SessionError::Store)
    }

    fn forget(&mut self) -> SessionResult<()> {
        self.session = None;
        self.store.clear().map_err(SessionError::Store)
    }

    fn save_target(&mut self, target: Option<&PlayTarget>) -> SessionResult<()> {
        match target {
            Some(target) => self.store.save_target(target).map_err(SessionError::Store),
            None => Ok(()),
        }
    }

    fn active_play(&self) -> SessionResult<(&Session, PlayId)> {
        let session = self.session.as_ref().ok_or(SessionError::NoSession)?;
        let play_id = session.play_id.ok_or(SessionError::PlayIdUnknown)?;
        Ok((session, play_id))
    }

    /// Local only: the player reached the hidden tile.
    pub fn mark_found(&mut self) -> SessionResult<()> {
        let (session, play_id) = self.active_play()?;
        let mut session = session.clone();
        session.found = true;
        self.persist(session)?;
        if let Some(mut target) = self.target()? {
            target.found = true;
            self.save_target(Some(&target))?;
        }
        tracing::info!(%play_id, "key found");
        Ok(())
    }

    /// Marks the key found when `(x, y)` is the stored target tile.
    pub fn reach(&mut self, x: u32, y: u32) -> SessionResult<bool> {
        let (session, _) = self.active_play()?;
        let world_id = session.world_id.clone();
        let on_target = self
            .target()?
            .is_some_and(|target| target.world_id == world_id && target.is_at(x, y));
        if on_target {
            self.mark_found()?;
        }
        Ok(on_target)
    }

    /// Rebuilds an active play from a key shared out of band. No chain calls.
    pub fn restore(
        &mut self,
        play_id: PlayId,
        key_hex: &str,
        world_id: ObjectId,
        grid: Option<&WorldGrid>,
    ) -> SessionResult<Session> {
        let key = PlayKey::from_hex(key_hex)?;
        if let Some(existing) = &self.session {
            if existing.play_id != Some(play_id) {
                return Err(SessionError::SessionInFlight);
            }
        }
        let target = pick_target(grid, &world_id);
        let session = Session::active(play_id, key, world_id);
        self.store.clear().map_err(SessionError::Store)?;
        self.persist(session.clone())?;
        self.save_target(target.as_ref())?;
        tracing::info!(%play_id, "play restored");
        Ok(session)
    }

    /// Drops the local play. The on-chain commitment stays behind, unclaimable.
    pub fn cancel(&mut self) -> SessionResult<()> {
        if let Some(session) = &self.session {
            tracing::info!(play_id = ?session.play_id, "play cancelled");
        }
        self.forget()?;
        self.phase = SessionPhase::Idle;
        Ok(())
    }
}

impl<Chain, Store> SessionManager<Chain, Store>
where
    Chain: ObjectReader + EventReader + TransactionSubmitter + TransactionReader,
    Store: SessionStore,
{
    async fn character(&self) -> SessionResult<account::Character> {
        account::load_character(&self.chain, &self.game.package, self.chain.sender())
            .await
            .map_err(SessionError::Chain)?
            .ok_or(SessionError::NoCharacter)
    }

    /// Commits a fresh key on chain and waits (bounded) for the play id.
    pub async fn start(&mut self, request: StartRequest<'_>) -> SessionResult<Started> {
        if self.session.is_some() {
            return Err(SessionError::SessionInFlight);
        }
        let character = self.character().await?;
        if character.plays_left(request.mode) == 0 {
            return Err(SessionError::LimitReached {
                mode: request.mode,
                limit: request.mode.daily_limit(),
            });
        }
        let fee_coin = match request.mode {
            PlayMode::Free => None,
            PlayMode::Paid => Some(
                account::fee_coin(
                    &self.chain,
                    self.chain.sender(),
                    &self.game.reward_coin_type,
                )
                .await
                .map_err(SessionError::Chain)?
                .ok_or(SessionError::InsufficientFee {
                    fee: account::PLAY_FEE,
                })?,
            ),
        };

        let key = PlayKey::generate();
        let call = commit_call(
            &self.game,
            &request.world_id,
            &character.id,
            fee_coin.as_ref(),
            &key.commitment(),
        );
        self.phase = SessionPhase::Committing;
        let digest = match self.chain.submit(&call).await {
            Ok(digest) => digest,
            Err(e) => {
                self.phase = SessionPhase::Idle;
                return Err(SessionError::Chain(e));
            }
        };
        tracing::info!(%digest, mode = %request.mode, "play committed");

        // the key exists nowhere else yet
        self.persist(Session::pending(
            key.clone(),
            request.world_id.clone(),
            digest.clone(),
        ))?;

        let polled = self
            .retry
            .poll("play index", |_| indexed_play_id(&self.chain, &digest))
            .await;
        let Some(play_id) = polled.value.flatten() else {
            tracing::warn!(
                %digest,
                attempts = polled.attempts,
                "play id not indexed yet; keeping the play pending"
            );
            let session = self.session.clone().ok_or(SessionError::NoSession)?;
            return Ok(Started {
                session,
                target: None,
                digest,
            });
        };

        let target = pick_target(request.grid, &request.world_id);
        let mut session = Session::active(play_id, key, request.world_id);
        session.digest = Some(digest.clone());
        self.persist(session.clone())?;
        self.save_target(target.as_ref())?;
        tracing::info!(%play_id, "play active");
        Ok(Started {
            session,
            target,
            digest,
        })
    }

    /// One more lookup of a pending play's commit transaction.
    pub async fn retry_index(
        &mut self,
        grid: Option<&WorldGrid>,
    ) -> SessionResult<Option<PlayId>> {
        let session = self.session.clone().ok_or(SessionError::NoSession)?;
        if let Some(play_id) = session.play_id {
            return Ok(Some(play_id));
        }
        let digest = session.digest.clone().ok_or(SessionError::PlayIdUnknown)?;
        let found = indexed_play_id(&self.chain, &digest)
            .await
            .map_err(SessionError::Chain)?
            .flatten();
        let Some(play_id) = found else {
            self.phase = SessionPhase::PendingIndex;
            return Ok(None);
        };
        let target = pick_target(grid, &session.world_id);
        let mut session = session;
        session.play_id = Some(play_id);
        self.persist(session)?;
        self.save_target(target.as_ref())?;
        tracing::info!(%play_id, "pending play indexed");
        Ok(Some(play_id))
    }

    /// Reveals the key to claim the reward. Local state is only cleared on success.
    pub async fn redeem(&mut self) -> SessionResult<Redemption> {
        let (session, play_id) = self.active_play()?;
        if !session.found {
            return Err(SessionError::KeyNotFound);
        }
        let session = session.clone();
        let character = self.character().await?;
        let call = claim_call(&self.game, &session, play_id, &character.id);

        self.phase = SessionPhase::Redeeming;
        let digest = match self.chain.submit(&call).await {
            Ok(digest) => digest,
            Err(e) => {
                self.phase = session.phase();
                return Err(SessionError::Chain(e));
            }
        };
        tracing::info!(%play_id, %digest, "reward claimed");

        let polled = self
            .retry
            .poll("claim receipt", |_| indexed_reward(&self.chain, &digest))
            .await;
        // the claim is final on chain; a stale record is closed later by verify
        if let Err(e) = self.forget() {
            tracing::warn!(
                %play_id,
                %digest,
                "claimed, but clearing the local play failed: {e:#}"
            );
        }
        self.phase = SessionPhase::Closed;
        Ok(Redemption {
            play_id,
            reward: polled.value.flatten(),
            digest,
        })
    }

    /// Looks for an existing claim of the current play and closes it locally if found.
    pub async fn verify_claim_status(&mut self) -> SessionResult<ClaimStatus> {
        let (_, play_id) = self.active_play()?;
        let lookup = find_claim(&self.chain, &self.game.package, play_id)
            .await
            .map_err(SessionError::Chain)?;
        match lookup.claim {
            Some(claim) => {
                tracing::info!(%play_id, "play was already claimed; clearing local state");
                self.forget()?;
                self.phase = SessionPhase::Closed;
                Ok(ClaimStatus::AlreadyClaimed {
                    reward: claim.event.reward,
                })
            }
            None => Ok(ClaimStatus::Unclaimed {
                truncated: lookup.truncated,
            }),
        }
    }
}
