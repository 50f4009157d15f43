//! Session registry: id allocation, lookup, removal and the request surface.

use super::{
    actor::{SessionActor, SessionHandle, SessionTable},
    config::SessionConfig,
    dedup::{Admission, RequestDeduplicator},
    errors::{SessionError, SessionResult},
    game::GameSession,
    liveness::LivenessMonitor,
    messages::SessionMessage,
    models::{Difficulty, GuessOutcome, PlayerSlot, SessionId, SessionSnapshot},
};
use crate::{
    notify::CallbackHandle,
    puzzle::{Grid, PuzzleLayout, PuzzleState},
    services::{AccountService, WordRepository, bounded},
};
use rand::Rng;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::{
    sync::{Mutex, RwLock},
    time::timeout,
};

/// Everything needed to open a session besides its owner
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub puzzle: PuzzleState,
    pub difficulty: Difficulty,
    pub guess_budget: u32,
}

impl SessionSetup {
    /// Setup with the budget derived from difficulty and letter count
    pub fn new(puzzle: PuzzleState, difficulty: Difficulty) -> Self {
        let guess_budget = difficulty.guess_budget(puzzle.letter_count());
        Self {
            puzzle,
            difficulty,
            guess_budget,
        }
    }

    /// Override the starting guess budget
    pub fn with_guess_budget(mut self, guess_budget: u32) -> Self {
        self.guess_budget = guess_budget;
        self
    }
}

/// How a start request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStart {
    /// A new session was opened
    Opened(SessionId),
    /// The request was already applied; its original session
    Replayed(SessionId),
}

impl GameStart {
    pub fn session_id(&self) -> SessionId {
        match self {
            GameStart::Opened(id) | GameStart::Replayed(id) => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, GameStart::Opened(_))
    }
}

/// Pick a free id: random probes first, then a scan of the whole id space
fn allocate_id(
    table: &HashMap<SessionId, SessionHandle>,
    max_id: SessionId,
    attempts: u32,
) -> Option<SessionId> {
    if table.len() >= max_id as usize {
        return None;
    }

    let mut rng = rand::rng();
    for _ in 0..attempts {
        let id = rng.random_range(1..=max_id);
        if !table.contains_key(&id) {
            return Some(id);
        }
    }

    (1..=max_id).find(|id| !table.contains_key(id))
}

/// Registry of live sessions
///
/// Owns the id -> session table. Sessions are only ever referenced by id; the
/// table holds actor handles and each actor removes itself once its game ends or
/// its roster empties.
pub struct SessionRegistry {
    config: SessionConfig,
    sessions: SessionTable,
    accounts: Arc<dyn AccountService>,
    words: Arc<dyn WordRepository>,
    /// Replayed start requests, keyed by owner
    start_requests: Mutex<RequestDeduplicator<SessionId>>,
    /// Owners with a start in flight
    start_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionRegistry {
    /// Create a new session registry
    ///
    /// # Arguments
    ///
    /// * `config` - Session configuration
    /// * `accounts` - Account score service
    /// * `words` - Word repository
    pub fn new(
        config: SessionConfig,
        accounts: Arc<dyn AccountService>,
        words: Arc<dyn WordRepository>,
    ) -> Self {
        let start_requests = Mutex::new(RequestDeduplicator::new(config.dedup_history));
        Self {
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            accounts,
            words,
            start_requests,
            start_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start sweeping this registry for silent players
    pub fn spawn_liveness_monitor(self: &Arc<Self>) -> LivenessMonitor {
        LivenessMonitor::spawn(Arc::downgrade(self), self.config.liveness)
    }

    /// Open a session owned by `owner`
    ///
    /// # Arguments
    ///
    /// * `owner` - Creating player, seated first
    /// * `callback` - Owner's push target
    /// * `setup` - Puzzle, difficulty and budget
    ///
    /// # Returns
    ///
    /// * `SessionResult<SessionId>` - New id, or `CapacityExceeded`
    pub async fn create_session(
        &self,
        owner: &str,
        callback: CallbackHandle,
        setup: SessionSetup,
    ) -> SessionResult<SessionId> {
        let score = self.fetch_score(owner).await;
        self.spawn_session(PlayerSlot::new(owner, callback, score), setup)
            .await
    }

    async fn spawn_session(
        &self,
        owner: PlayerSlot,
        setup: SessionSetup,
    ) -> SessionResult<SessionId> {
        if setup.guess_budget == 0 {
            return Err(SessionError::InvalidRequest(
                "guess budget must be positive".to_string(),
            ));
        }

        let owner_name = owner.username.clone();
        let allocation = async {
            let mut table = self.sessions.write().await;
            let id = allocate_id(
                &table,
                self.config.max_session_id,
                self.config.id_probe_attempts,
            )
            .ok_or(SessionError::CapacityExceeded)?;

            let session = GameSession::new(
                id,
                owner,
                setup.puzzle,
                setup.difficulty,
                setup.guess_budget,
            );
            let (actor, handle) = SessionActor::new(
                session,
                &self.config,
                self.accounts.clone(),
                self.sessions.clone(),
            );
            table.insert(id, handle);
            Ok::<_, SessionError>((id, actor))
        };

        let (id, actor) = timeout(self.config.allocation_window, allocation)
            .await
            .map_err(|_| SessionError::CapacityExceeded)??;

        tokio::spawn(actor.run());

        log::info!("Created session {} for {}", id, owner_name);
        Ok(id)
    }

    /// Get a session handle
    pub async fn lookup(&self, id: SessionId) -> SessionResult<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .cloned()
            .ok_or(SessionError::SessionNotFound(id))
    }

    /// Remove a session; removing an unknown id is a no-op
    ///
    /// # Returns
    ///
    /// * `bool` - true if this call removed it
    pub async fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            log::info!("Removed session {}", id);
        }
        removed
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Live session ids, ascending
    pub async fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Latest state of every live session, by id
    pub async fn snapshots(&self) -> Vec<Arc<SessionSnapshot>> {
        let mut snapshots: Vec<Arc<SessionSnapshot>> = self
            .sessions
            .read()
            .await
            .values()
            .map(SessionHandle::snapshot)
            .collect();
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }

    /// Latest state of one session
    pub async fn snapshot(&self, id: SessionId) -> SessionResult<Arc<SessionSnapshot>> {
        Ok(self.lookup(id).await?.snapshot())
    }

    /// Generate a puzzle and open a session for it
    ///
    /// # Arguments
    ///
    /// * `username` - Owner
    /// * `callback` - Owner's push target
    /// * `num_words` - Words in the puzzle, stem included
    /// * `difficulty` - Guess budget factor
    /// * `seq` - Client sequence number
    ///
    /// # Returns
    ///
    /// * `SessionResult<SessionId>` - Session id (the original one for a replayed request)
    pub async fn start_game(
        &self,
        username: &str,
        callback: CallbackHandle,
        num_words: usize,
        difficulty: u32,
        seq: u64,
    ) -> SessionResult<SessionId> {
        self.open_game(username, callback, num_words, difficulty, seq)
            .await
            .map(|start| start.session_id())
    }

    /// [`start_game`](Self::start_game), also telling a replay from a new session
    ///
    /// Starts by the same owner run one at a time so a retried request never
    /// opens a second session; different owners start concurrently.
    pub async fn open_game(
        &self,
        username: &str,
        callback: CallbackHandle,
        num_words: usize,
        difficulty: u32,
        seq: u64,
    ) -> SessionResult<GameStart> {
        if let Some(id) = self.replayed_start(username, seq).await {
            log::debug!("Replaying start of session {} for {}", id, username);
            return Ok(GameStart::Replayed(id));
        }

        if num_words == 0 || num_words > self.config.max_words {
            return Err(SessionError::InvalidRequest(format!(
                "number of words must be between 1 and {}",
                self.config.max_words
            )));
        }
        let difficulty = Difficulty::new(difficulty, self.config.max_difficulty)
            .map_err(SessionError::InvalidRequest)?;

        let owner_lock = self.owner_lock(username).await;
        let result = {
            let _serial = owner_lock.lock().await;
            self.open_game_serialized(username, callback, num_words, difficulty, seq)
                .await
        };
        drop(owner_lock);
        self.release_owner_lock(username).await;

        result
    }

    async fn open_game_serialized(
        &self,
        username: &str,
        callback: CallbackHandle,
        num_words: usize,
        difficulty: Difficulty,
        seq: u64,
    ) -> SessionResult<GameStart> {
        if let Some(id) = self.replayed_start(username, seq).await {
            return Ok(GameStart::Replayed(id));
        }

        let layout = timeout(
            self.config.service_timeout,
            PuzzleLayout::generate(self.words.as_ref(), num_words, self.config.layout_attempts),
        )
        .await
        .map_err(|_| {
            SessionError::UpstreamServiceFailure("word repository timed out".to_string())
        })??;

        let setup = SessionSetup::new(PuzzleState::new(layout), difficulty);
        let score = self.fetch_score(username).await;
        let id = self
            .spawn_session(PlayerSlot::new(username, callback, score), setup)
            .await?;
        self.start_requests.lock().await.record(username, seq, id);

        Ok(GameStart::Opened(id))
    }

    async fn replayed_start(&self, username: &str, seq: u64) -> Option<SessionId> {
        match self.start_requests.lock().await.check(username, seq) {
            Admission::Duplicate { reply, .. } => Some(reply),
            Admission::Fresh => None,
        }
    }

    async fn owner_lock(&self, owner: &str) -> Arc<Mutex<()>> {
        let mut locks = self.start_locks.lock().await;
        Arc::clone(locks.entry(owner.to_string()).or_default())
    }

    /// Drop the owner's lock once no other start holds it
    async fn release_owner_lock(&self, owner: &str) {
        let mut locks = self.start_locks.lock().await;
        if locks
            .get(owner)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(owner);
        }
    }

    /// Forget start records whose sessions have all ended
    async fn prune_start_requests(&self) {
        let live: HashSet<SessionId> = self.sessions.read().await.keys().copied().collect();
        self.start_requests
            .lock()
            .await
            .retain_replies(|id| live.contains(id));
        self.start_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Join an existing session
    ///
    /// # Returns
    ///
    /// * `SessionResult<bool>` - false if the username is already seated
    pub async fn join_game(
        &self,
        id: SessionId,
        username: &str,
        callback: CallbackHandle,
        seq: u64,
    ) -> SessionResult<bool> {
        let handle = self.lookup(id).await?;
        let score = self.fetch_score(username).await;

        let result = handle
            .request(self.config.request_timeout, |response| {
                SessionMessage::Join {
                    username: username.to_string(),
                    callback,
                    score,
                    seq,
                    response,
                }
            })
            .await?;

        match result {
            Ok(()) => Ok(true),
            Err(SessionError::DuplicatePlayer(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Move a waiting session into play; repeated signals are no-ops
    pub async fn issue_start_signal(&self, id: SessionId) -> SessionResult<()> {
        let handle = self.lookup(id).await?;
        handle
            .request(self.config.request_timeout, |response| {
                SessionMessage::StartSignal { response }
            })
            .await?
    }

    /// Current revealed grid
    pub async fn initial_puzzle(&self, id: SessionId) -> SessionResult<Grid> {
        Ok(self.snapshot(id).await?.grid.clone())
    }

    /// Session-wide guesses left
    pub async fn guess_counter(&self, id: SessionId) -> SessionResult<u32> {
        Ok(self.snapshot(id).await?.guesses_remaining)
    }

    /// Guess a letter or word on the caller's turn
    pub async fn player_guess(
        &self,
        username: &str,
        id: SessionId,
        guess: &str,
        seq: u64,
    ) -> SessionResult<GuessOutcome> {
        let handle = self.lookup(id).await?;
        handle
            .request(self.config.request_timeout, |response| {
                SessionMessage::Guess {
                    username: username.to_string(),
                    guess: guess.to_string(),
                    seq,
                    response,
                }
            })
            .await?
    }

    /// Leave a session
    pub async fn player_quit(&self, id: SessionId, username: &str, seq: u64) -> SessionResult<()> {
        let handle = self.lookup(id).await?;
        handle
            .request(self.config.request_timeout, |response| {
                SessionMessage::Quit {
                    username: username.to_string(),
                    seq,
                    response,
                }
            })
            .await?
    }

    /// Refresh a player's heartbeat
    pub async fn player_heartbeat(&self, id: SessionId, username: &str) -> SessionResult<()> {
        let handle = self.lookup(id).await?;
        handle
            .request(self.config.request_timeout, |response| {
                SessionMessage::Heartbeat {
                    username: username.to_string(),
                    response,
                }
            })
            .await?
    }

    /// Remove silent players from every live session, then forget start
    /// records of sessions that have ended
    ///
    /// # Returns
    ///
    /// * `usize` - Players removed
    pub async fn sweep(&self) -> usize {
        let handles: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();
        let mut reaped = 0;

        for handle in handles {
            let result = handle
                .request(self.config.request_timeout, |response| {
                    SessionMessage::Sweep { response }
                })
                .await;
            match result {
                Ok(count) => reaped += count,
                Err(e) => log::debug!("Sweep skipped session {}: {}", handle.session_id(), e),
            }
        }

        self.prune_start_requests().await;
        reaped
    }

    /// Add a word to the dictionary
    pub async fn add_word(&self, word: &str) -> SessionResult<bool> {
        Ok(bounded(self.config.service_timeout, self.words.add_word(word)).await?)
    }

    /// Remove a word from the dictionary
    pub async fn remove_word(&self, word: &str) -> SessionResult<bool> {
        Ok(bounded(self.config.service_timeout, self.words.remove_word(word)).await?)
    }

    /// Check whether a word is in the dictionary
    pub async fn check_word(&self, word: &str) -> SessionResult<bool> {
        Ok(bounded(self.config.service_timeout, self.words.check_word(word)).await?)
    }

    /// Persistent score, 0 when the account service fails
    async fn fetch_score(&self, username: &str) -> i64 {
        match bounded(self.config.service_timeout, self.accounts.user_score(username)).await {
            Ok(score) => score,
            Err(e) => {
                log::warn!("Could not read score for {}: {}", username, e);
                0
            }
        }
    }
}
