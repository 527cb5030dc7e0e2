use futures::future::{BoxFuture, FutureExt};
use rand::rngs::StdRng;
use spy_sketch_engine::models::{
    ChatId, ChatSession, Effect, GamePhase, PhaseTimer, Registrant, SessionView,
    SubmissionContent, UserId,
};
use spy_sketch_engine::{GameError, GameStateMachine};
use tracing::{debug, error, info, warn};

use crate::models::request::VoteRequest;
use crate::models::user::PlatformUser;
use crate::services::messaging::deliver;
use crate::state::{AppState, SessionEntry};

pub async fn join(
    state: AppState,
    chat_id: ChatId,
    user: &PlatformUser,
) -> Result<SessionView, GameError> {
    let user = state.user_service.resolve(user);
    let registrant = Registrant {
        user_id: user.id,
        name: user.display_name(),
    };
    run(&state, chat_id, move |machine, session, _| {
        machine.join(session, registrant)
    })
    .await
}

pub async fn leave(
    state: AppState,
    chat_id: ChatId,
    user_id: UserId,
) -> Result<SessionView, GameError> {
    run(&state, chat_id, move |machine, session, _| {
        machine.leave(session, user_id)
    })
    .await
}

pub async fn start_game(state: AppState, chat_id: ChatId) -> Result<SessionView, GameError> {
    run(&state, chat_id, |machine, session, rng| {
        machine.start_game(session, rng)
    })
    .await
}

pub async fn end_game(state: AppState, chat_id: ChatId) -> Result<SessionView, GameError> {
    run(&state, chat_id, |machine, session, _| machine.end_game(session)).await
}

pub async fn cast_vote(
    state: AppState,
    chat_id: ChatId,
    vote: VoteRequest,
) -> Result<SessionView, GameError> {
    run(&state, chat_id, move |machine, session, rng| {
        machine.record_vote(session, vote.user_id, vote.round, vote.target_player_id, rng)
    })
    .await
}

pub async fn submit(
    state: AppState,
    chat_id: ChatId,
    user_id: UserId,
    content: SubmissionContent,
) -> Result<SessionView, GameError> {
    run(&state, chat_id, move |machine, session, _| {
        machine.submit(session, user_id, content)
    })
    .await
}

pub async fn force_next_phase(state: AppState, chat_id: ChatId) -> Result<SessionView, GameError> {
    run(&state, chat_id, |machine, session, rng| machine.advance(session, rng)).await
}

// 役職を含まない公開情報
pub async fn get_game_state(state: AppState, chat_id: ChatId) -> SessionView {
    match state.existing_session(chat_id).await {
        Some(entry) => entry.lock().await.session.view(),
        None => ChatSession::new(chat_id).view(),
    }
}

/// Full snapshot, roles included. Used by tests and persistence checks.
pub async fn session_snapshot(state: &AppState, chat_id: ChatId) -> Option<ChatSession> {
    let entry = state.existing_session(chat_id).await?;
    let session = entry.lock().await.session.clone();
    Some(session)
}

async fn run<F>(state: &AppState, chat_id: ChatId, op: F) -> Result<SessionView, GameError>
where
    F: FnOnce(&GameStateMachine, &mut ChatSession, &mut StdRng) -> Result<Vec<Effect>, GameError>,
{
    let entry = state.session_entry(chat_id).await;
    let mut entry = entry.lock().await;

    let result = {
        let mut rng = state.rng();
        op(&state.machine, &mut entry.session, &mut *rng)
    };

    match result {
        Ok(effects) => {
            apply_effects(state, chat_id, &mut entry, effects);
            Ok(entry.session.view())
        }
        Err(e) => {
            log_rejection(chat_id, &e);
            Err(e)
        }
    }
}

fn log_rejection(chat_id: ChatId, e: &GameError) {
    if e.is_fatal() {
        error!("Inconsistent game state in chat {}: {}", chat_id, e);
    } else {
        debug!("Rejected action in chat {}: {}", chat_id, e);
    }
}

/// Timer callback. Boxed because arming the next timer refers back to it.
pub fn fire_timer(state: AppState, chat_id: ChatId, timer: PhaseTimer) -> BoxFuture<'static, ()> {
    async move {
        let Some(entry) = state.existing_session(chat_id).await else {
            return;
        };
        let mut entry = entry.lock().await;

        // 発火したタイマー自身はabortしない
        if entry.timer.as_ref().map(|(t, _)| t == &timer).unwrap_or(false) {
            entry.timer = None;
        }

        let result = {
            let mut rng = state.rng();
            state.machine.on_timer(&mut entry.session, &timer, &mut *rng)
        };
        match result {
            Ok(effects) => apply_effects(&state, chat_id, &mut entry, effects),
            Err(e) => log_rejection(chat_id, &e),
        }
    }
    .boxed()
}

/// Carries out the effects of a successful transition, in order, then
/// writes the session snapshot.
pub fn apply_effects(
    state: &AppState,
    chat_id: ChatId,
    entry: &mut SessionEntry,
    effects: Vec<Effect>,
) {
    for effect in effects {
        match effect {
            Effect::Notify(notice) => deliver(state.gateway.as_ref(), &notice),
            Effect::Schedule(timer) => {
                if let Some((_, old)) = entry.timer.take() {
                    old.cancel();
                }
                let timer_state = state.clone();
                let handle = state
                    .scheduler
                    .schedule_once(timer.delay, timer.clone(), move |t| {
                        fire_timer(timer_state, chat_id, t)
                    });
                debug!(
                    "Armed {:?} for chat {} in {:?}",
                    timer.transition, chat_id, timer.delay
                );
                entry.timer = Some((timer, handle));
            }
            Effect::CancelTimer => {
                if let Some((_, handle)) = entry.timer.take() {
                    handle.cancel();
                }
            }
            Effect::GameFinished(game) => {
                state.user_service.record_result(&game);
                if let Err(e) = state.store.archive(&game) {
                    warn!("Failed to archive game {}: {}", game.id, e);
                }
            }
        }
    }
    persist(state, &entry.session);
}

fn persist(state: &AppState, session: &ChatSession) {
    let result = if session.phase() == GamePhase::Idle {
        state.store.remove(session.chat_id)
    } else {
        state.store.save(session)
    };
    if let Err(e) = result {
        error!("Failed to persist session of chat {}: {}", session.chat_id, e);
    }
}

/// Loads stored sessions and statistics, and re-arms the timers of running
/// games with a full phase duration. Returns the number of restored chats.
pub async fn restore_sessions(state: &AppState) -> usize {
    match state.store.finished_games() {
        Ok(games) => games
            .iter()
            .for_each(|game| state.user_service.record_result(game)),
        Err(e) => warn!("Could not read finished games: {}", e),
    }

    let sessions = match state.store.load_all() {
        Ok(sessions) => sessions,
        Err(e) => {
            error!("Could not restore chat sessions: {}", e);
            return 0;
        }
    };

    let mut restored = 0;
    for session in sessions {
        let chat_id = session.chat_id;
        let effects: Vec<Effect> = state
            .machine
            .resume_timer(&session)
            .map(Effect::Schedule)
            .into_iter()
            .collect();

        let entry = state.session_entry(chat_id).await;
        let mut entry = entry.lock().await;
        entry.session = session;
        apply_effects(state, chat_id, &mut entry, effects);
        restored += 1;
    }
    info!("Restored {} chat sessions", restored);
    restored
}
