//! Application state: in-memory stores for groups, user scores and Wordle sessions.
//!
//! This module owns:
//!   - content groups (by id) and the items assigned to them
//!   - per-user score totals plus the last time a mini-game was offered
//!   - live Wordle sessions keyed by session id (dropped once the game ends)
//!
//! Each store sits behind its own `RwLock`; score updates take the write lock
//! for the whole read-score-apply step so concurrent answers from one user
//! never interleave.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::{AnswerTask, CanonicalItem, Cefr, ContentKind, GroupAssignment, GroupId, Language};
use crate::error::{EngineError, Result};
use crate::level::LevelCurve;
use crate::scoring::{ScoreResult, ScoreState};
use crate::wordle::WordleState;

#[derive(Clone, Debug, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub kind: ContentKind,
    pub level: Cefr,
    pub language: Language,
    pub items: Vec<CanonicalItem>,
}

#[derive(Clone, Debug, Default)]
struct UserProgress {
    score: ScoreState,
    last_mini_game: Option<Instant>,
}

#[derive(Clone, Debug)]
struct WordleSession {
    user_id: String,
    game: WordleState,
}

#[derive(Clone)]
pub struct AppState {
    pub groups: Arc<RwLock<HashMap<GroupId, Group>>>,
    users: Arc<RwLock<HashMap<String, UserProgress>>>,
    wordle: Arc<RwLock<HashMap<Uuid, WordleSession>>>,
    pub levels: LevelCurve,
    pub mini_game_cooldown: Duration,
}

impl AppState {
    #[instrument(level = "info", skip_all, fields(cooldown_secs = config.mini_game_cooldown_secs))]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            groups: Arc::new(RwLock::new(HashMap::new())),
            users: Arc::new(RwLock::new(HashMap::new())),
            wordle: Arc::new(RwLock::new(HashMap::new())),
            levels: LevelCurve::default(),
            mini_game_cooldown: config.mini_game_cooldown(),
        }
    }

    /// Register an empty destination group.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_group(&self, name: &str, kind: ContentKind, level: Cefr, language: Language) -> GroupId {
        let id = Uuid::new_v4();
        let group = Group { id, name: name.to_string(), kind, level, language, items: Vec::new() };
        self.groups.write().await.insert(id, group);
        debug!(target: "drill_engine", %id, name, "Created group");
        id
    }

    /// Append an assignment's items to its group. Returns how many were stored.
    #[instrument(level = "debug", skip(self, assignment), fields(group_id = %assignment.group_id, items = assignment.items.len()))]
    pub async fn store_assignment(&self, assignment: GroupAssignment) -> Result<usize> {
        let mut groups = self.groups.write().await;
        let group = groups
            .get_mut(&assignment.group_id)
            .ok_or_else(|| EngineError::invalid(format!("unknown group {}", assignment.group_id)))?;
        if let Some(item) = assignment.items.iter().find(|i| i.kind() != group.kind) {
            return Err(EngineError::invalid(format!(
                "group {} holds {:?} items, got {:?}",
                group.id,
                group.kind,
                item.kind()
            )));
        }
        let n = assignment.items.len();
        group.items.extend(assignment.items);
        Ok(n)
    }

    pub async fn get_group(&self, id: &GroupId) -> Option<Group> {
        self.groups.read().await.get(id).cloned()
    }

    /// One stored item, addressed by group and position.
    pub async fn get_item(&self, group_id: &GroupId, index: usize) -> Result<(CanonicalItem, Language)> {
        let groups = self.groups.read().await;
        let group = groups
            .get(group_id)
            .ok_or_else(|| EngineError::invalid(format!("unknown group {group_id}")))?;
        let item = group
            .items
            .get(index)
            .ok_or_else(|| EngineError::invalid(format!("group {group_id} has no item {index}")))?;
        Ok((item.clone(), group.language))
    }

    /// Record an accepted alternative answer. `Ok(false)` when it was already known.
    #[instrument(level = "debug", skip(self, answer), fields(%group_id))]
    pub async fn add_alternative_answer(
        &self,
        group_id: &GroupId,
        index: usize,
        task: AnswerTask,
        answer: &str,
    ) -> Result<bool> {
        let mut groups = self.groups.write().await;
        let item = groups
            .get_mut(group_id)
            .and_then(|g| g.items.get_mut(index))
            .ok_or_else(|| EngineError::invalid(format!("group {group_id} has no item {index}")))?;
        let added = item.add_alternative(task, answer)?;
        if added {
            info!(target: "drill_engine", %group_id, index, "Alternative answer recorded");
        }
        Ok(added)
    }

    pub async fn groups_of_kind(&self, kind: ContentKind) -> Vec<Group> {
        let groups = self.groups.read().await;
        groups.values().filter(|g| g.kind == kind).cloned().collect()
    }

    pub async fn score_state(&self, user_id: &str) -> ScoreState {
        self.users.read().await.get(user_id).map(|u| u.score).unwrap_or_default()
    }

    /// Score and apply one answer atomically for `user_id`.
    ///
    /// `score_fn` sees the stored totals and returns the transition. A mini-game
    /// offered within the cooldown of the previous one is suppressed.
    #[instrument(level = "debug", skip(self, score_fn), fields(%user_id))]
    pub async fn apply_score<F>(&self, user_id: &str, score_fn: F) -> (ScoreResult, ScoreState)
    where
        F: FnOnce(&ScoreState) -> ScoreResult,
    {
        let mut users = self.users.write().await;
        let progress = users.entry(user_id.to_string()).or_default();

        let mut result = score_fn(&progress.score);
        if result.mini_game_triggered {
            let now = Instant::now();
            let cooling = progress
                .last_mini_game
                .is_some_and(|last| now.duration_since(last) < self.mini_game_cooldown);
            if cooling {
                debug!(target: "scoring", %user_id, "Mini-game suppressed by cooldown");
                result.mini_game_triggered = false;
            } else {
                progress.last_mini_game = Some(now);
            }
        }

        progress.score.apply(&result);
        (result, progress.score)
    }

    /// Register a new Wordle game owned by `user_id`.
    #[instrument(level = "info", skip(self, game), fields(%user_id))]
    pub async fn insert_wordle(&self, user_id: &str, game: WordleState) -> Uuid {
        let id = Uuid::new_v4();
        self.wordle
            .write()
            .await
            .insert(id, WordleSession { user_id: user_id.to_string(), game });
        info!(target: "wordle", session = %id, "Wordle session started");
        id
    }

    /// Run `f` against a live session. Unknown ids and foreign sessions are invalid input.
    ///
    /// A session whose game is over after `f` is removed; `f` must capture
    /// anything it needs from the final state (e.g. the revealed target).
    pub async fn with_wordle<T, F>(&self, session_id: &Uuid, user_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut WordleState) -> Result<T>,
    {
        let mut sessions = self.wordle.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| EngineError::invalid(format!("unknown wordle session {session_id}")))?;
        if session.user_id != user_id {
            warn!(target: "wordle", session = %session_id, %user_id, "Guess for another user's session");
            return Err(EngineError::invalid("session belongs to another user"));
        }
        let out = f(&mut session.game);
        if session.game.is_over() {
            sessions.remove(session_id);
            info!(target: "wordle", session = %session_id, "Wordle session finished");
        }
        out
    }

    pub async fn live_wordle_sessions(&self) -> usize {
        self.wordle.read().await.len()
    }
}
