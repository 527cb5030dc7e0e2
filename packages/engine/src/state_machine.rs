use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{EntityKind, GameError, VoteRejection};
use crate::models::{
    ChatSession, Effect, Game, GameConfig, GamePhase, Medium, Message, PhaseTimer, Player,
    PlayerId, Registrant, Role, Round, Submission, SubmissionContent, Team, Transition, UserId,
};
use crate::role_assigner::RoleAssigner;
use crate::scoring::score_round;
use crate::task_provider::{Task, TaskProvider};
use crate::vote_tally::Resolution;
use crate::win_condition::check_game_end;

/// Drives one chat through registration, rounds and the end of the game.
///
/// Every operation either fails with a [`GameError`] and leaves the session
/// untouched, or mutates the session and returns the effects (messages,
/// timers, finished games) the caller has to carry out, in order.
pub struct GameStateMachine {
    config: GameConfig,
    assigner: RoleAssigner,
    tasks: Arc<dyn TaskProvider>,
}

// 投票結果の後に何をするか
enum AfterResults {
    NextRound,
    Finish(Team),
}

impl GameStateMachine {
    pub fn new(config: GameConfig, tasks: Arc<dyn TaskProvider>) -> Self {
        let assigner = RoleAssigner::from_config(&config);
        Self {
            config,
            assigner,
            tasks,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn join(
        &self,
        session: &mut ChatSession,
        registrant: Registrant,
    ) -> Result<Vec<Effect>, GameError> {
        match session.phase() {
            GamePhase::Idle | GamePhase::Registration => {}
            _ => return Err(GameError::GameInProgress),
        }
        if session
            .registrants
            .iter()
            .any(|r| r.user_id == registrant.user_id)
        {
            return Err(GameError::AlreadyJoined);
        }
        if session.registrants.len() >= self.config.max_players {
            return Err(GameError::TooManyPlayers {
                count: session.registrants.len() + 1,
                max: self.config.max_players,
            });
        }

        let opened = session.registrants.is_empty();
        let name = registrant.name.clone();
        session.registrants.push(registrant);
        let count = session.registrants.len();

        let mut text = String::new();
        if opened {
            text.push_str("Registration is open!\n\n");
        }
        text.push_str(&format!("{} joined the game. Players registered: {}.", name, count));
        if count < self.config.min_players {
            text.push_str(&format!(
                " At least {} players are needed to start.",
                self.config.min_players
            ));
        } else {
            text.push_str(" Use /startgame to begin.");
        }

        Ok(vec![Effect::to_chat(session.chat_id, Message::text(text))])
    }

    pub fn leave(
        &self,
        session: &mut ChatSession,
        user_id: UserId,
    ) -> Result<Vec<Effect>, GameError> {
        match session.phase() {
            GamePhase::Registration => {}
            GamePhase::Idle => return Err(GameError::NotRegistered),
            _ => return Err(GameError::GameInProgress),
        }
        let index = session
            .registrants
            .iter()
            .position(|r| r.user_id == user_id)
            .ok_or(GameError::NotRegistered)?;

        let registrant = session.registrants.remove(index);
        let text = format!(
            "{} left the game. Players registered: {}.",
            registrant.name,
            session.registrants.len()
        );
        Ok(vec![Effect::to_chat(session.chat_id, Message::text(text))])
    }

    pub fn start_game<R: Rng>(
        &self,
        session: &mut ChatSession,
        rng: &mut R,
    ) -> Result<Vec<Effect>, GameError> {
        match session.phase() {
            GamePhase::Registration => {}
            GamePhase::Idle => {
                return Err(GameError::InsufficientPlayers {
                    count: 0,
                    min: self.config.min_players,
                })
            }
            _ => return Err(GameError::GameInProgress),
        }

        let count = session.registrants.len();
        if count < self.config.min_players {
            return Err(GameError::InsufficientPlayers {
                count,
                min: self.config.min_players,
            });
        }
        if count > self.config.max_players {
            return Err(GameError::TooManyPlayers {
                count,
                max: self.config.max_players,
            });
        }

        // 登録順に役職を配る（役職の並びはシャッフル済み）
        let roles = self.assigner.assign(count, rng);
        let players: Vec<Player> = session
            .registrants
            .iter()
            .zip(roles)
            .enumerate()
            .map(|(i, (r, role))| Player::new(i as PlayerId + 1, r.user_id, r.name.clone(), role))
            .collect();
        let game = Game::new(session.chat_id, self.config.max_rounds, players);

        let spies: Vec<&str> = game
            .players
            .iter()
            .filter(|p| p.role == Role::Spy)
            .map(|p| p.name.as_str())
            .collect();

        let mut effects = Vec::with_capacity(game.players.len() + 2);
        for player in &game.players {
            let mut text = format!("Your role: {}\n\n{}", player.role, player.role.briefing());
            if player.role == Role::Double {
                text.push_str(&format!("\n\nThe spies are: {}.", spies.join(", ")));
            }
            effects.push(Effect::to_user(player.user_id, Message::text(text)));
        }
        effects.push(Effect::to_chat(
            session.chat_id,
            Message::text(format!(
                "The game has begun with {} players! {} of you {} secretly working for the enemy.\n\n\
                 Round 1 is about to start. The creative phase begins in {}.",
                count,
                spies.len(),
                if spies.len() == 1 { "is" } else { "are" },
                duration_text(self.config.preparation_seconds)
            )),
        ));
        effects.push(Effect::Schedule(
            self.timer(&game, Transition::BeginCreative),
        ));

        info!("Game {} started in chat {} with {} players", game.id, game.chat_id, count);
        session.registrants.clear();
        session.game = Some(game);
        Ok(effects)
    }

    pub fn submit(
        &self,
        session: &mut ChatSession,
        user_id: UserId,
        content: SubmissionContent,
    ) -> Result<Vec<Effect>, GameError> {
        let game = game_mut(session)?;
        if game.phase != GamePhase::Creative {
            return Err(GameError::PhaseViolation {
                expected: GamePhase::Creative,
                actual: game.phase,
            });
        }
        let player_id = game
            .player_by_user(user_id)
            .filter(|p| p.is_active)
            .map(|p| p.id)
            .ok_or(GameError::NotAParticipant)?;
        let key = game.round_key(game.current_round);

        let submission = game
            .current_mut()?
            .submission_of_mut(player_id)
            .ok_or_else(|| {
                GameError::EntityNotFound(EntityKind::Submission, format!("{}/{}", key, player_id))
            })?;
        if submission.is_submitted() {
            return Err(GameError::AlreadySubmitted);
        }
        if content.medium() != submission.medium {
            return Err(GameError::WrongMedium {
                expected: submission.medium,
                got: content.medium(),
            });
        }

        let medium = submission.medium;
        submission.fill(content);

        let text = match medium {
            Medium::Drawing => "Your drawing has been accepted! Wait for the discussion to begin.",
            Medium::Text => "Your answer has been accepted! Wait for the discussion to begin.",
        };
        Ok(vec![Effect::to_user(user_id, Message::text(text))])
    }

    /// Records a vote for the current round. `round` pins the vote to a
    /// specific round number; a ballot from an earlier round is rejected.
    pub fn record_vote<R: Rng>(
        &self,
        session: &mut ChatSession,
        user_id: UserId,
        round: Option<u32>,
        target: PlayerId,
        rng: &mut R,
    ) -> Result<Vec<Effect>, GameError> {
        let game = game_mut(session)?;
        if game.phase != GamePhase::Voting {
            return Err(GameError::PhaseViolation {
                expected: GamePhase::Voting,
                actual: game.phase,
            });
        }
        if let Some(number) = round.filter(|n| *n != game.current_round) {
            return Err(GameError::PhaseViolation {
                expected: GamePhase::Voting,
                actual: game.round(number).map(|r| r.phase).unwrap_or(GamePhase::Idle),
            });
        }

        let voter = game
            .player_by_user(user_id)
            .filter(|p| p.is_active)
            .map(|p| p.id)
            .ok_or(GameError::InvalidVote(
                VoteRejection::VoterNotActive,
            ))?;
        let target_name = game.player(target).map(|p| p.name.clone()).unwrap_or_default();
        let active = game.active_ids();

        let tally = &mut game.current_mut()?.tally;
        let before = tally.clone();
        tally.record_vote(voter, target, &active)?;
        let everyone_voted = tally.has_everyone_voted(&active);

        let mut effects = vec![Effect::to_user(
            user_id,
            Message::text(format!(
                "Your vote against {} has been counted. You can change it until voting ends.",
                target_name
            )),
        )];

        if everyone_voted {
            debug!("Every active player voted in chat {}, closing early", session.chat_id);
            match self.close_voting(session, rng) {
                Ok(closing) => {
                    effects.push(Effect::CancelTimer);
                    effects.extend(closing);
                }
                Err(e) => {
                    // 集計に失敗したら今回の投票も取り消す
                    if let Some(round) = session.game.as_mut().and_then(|g| g.current_mut().ok()) {
                        round.tally = before;
                    }
                    return Err(e);
                }
            }
        }
        Ok(effects)
    }

    /// Performs the next timed transition right away (operator command).
    pub fn advance<R: Rng>(
        &self,
        session: &mut ChatSession,
        rng: &mut R,
    ) -> Result<Vec<Effect>, GameError> {
        let phase = game_mut(session)?.phase;
        let transition = Transition::leaving(phase).ok_or(GameError::NoActiveGame)?;

        let mut effects = vec![Effect::CancelTimer];
        effects.extend(self.apply(session, transition, rng)?);
        Ok(effects)
    }

    /// Runs a fired timer. Timers that no longer match the game, round or
    /// phase of the session are stale and produce no effects.
    pub fn on_timer<R: Rng>(
        &self,
        session: &mut ChatSession,
        timer: &PhaseTimer,
        rng: &mut R,
    ) -> Result<Vec<Effect>, GameError> {
        let current = session.game.as_ref().filter(|game| {
            game.id == timer.game_id
                && game.current_round == timer.round_number
                && game.phase == timer.transition.from_phase()
        });
        if current.is_none() {
            debug!(
                "Ignoring stale timer {:?} for chat {}",
                timer.transition, session.chat_id
            );
            return Ok(Vec::new());
        }
        self.apply(session, timer.transition, rng)
    }

    pub fn end_game(&self, session: &mut ChatSession) -> Result<Vec<Effect>, GameError> {
        match session.phase() {
            GamePhase::Idle => Err(GameError::NoActiveGame),
            GamePhase::Registration => {
                session.registrants.clear();
                Ok(vec![Effect::to_chat(
                    session.chat_id,
                    Message::text("Registration has been cancelled."),
                )])
            }
            _ => {
                let mut effects = vec![Effect::CancelTimer];
                effects.extend(self.finish(session, None)?);
                Ok(effects)
            }
        }
    }

    /// The timer a restored session needs to keep its game moving.
    pub fn resume_timer(&self, session: &ChatSession) -> Option<PhaseTimer> {
        let game = session.game.as_ref()?;
        Transition::leaving(game.phase).map(|t| self.timer(game, t))
    }

    fn apply<R: Rng>(
        &self,
        session: &mut ChatSession,
        transition: Transition,
        rng: &mut R,
    ) -> Result<Vec<Effect>, GameError> {
        let actual = game_mut(session)?.phase;
        if actual != transition.from_phase() {
            return Err(GameError::PhaseViolation {
                expected: transition.from_phase(),
                actual,
            });
        }

        match transition {
            Transition::BeginCreative => self.begin_creative(game_mut(session)?, rng),
            Transition::BeginDiscussion => self.begin_discussion(game_mut(session)?, rng),
            Transition::BeginVoting => self.begin_voting(game_mut(session)?),
            Transition::CloseVoting => self.close_voting(session, rng),
        }
    }

    fn begin_creative<R: Rng>(&self, game: &mut Game, rng: &mut R) -> Result<Vec<Effect>, GameError> {
        game.set_phase(GamePhase::Creative)?;

        let mut assignments: Vec<(PlayerId, UserId, Task)> = Vec::new();
        for player in game.active_players() {
            let task = self.tasks.next_task(None, &mut *rng);
            assignments.push((player.id, player.user_id, task));
        }

        let number = game.current_round;
        let mut effects = vec![Effect::to_chat(
            game.chat_id,
            Message::text(format!(
                "Round {}: the creative phase has started!\n\n\
                 Every player gets a task in private messages. You have {} to complete it.",
                number,
                duration_text(self.config.creative_seconds)
            )),
        )];

        let round = game.current_mut()?;
        for (player_id, user_id, task) in assignments {
            effects.push(Effect::to_user(user_id, Message::text(task_text(number, &task))));
            round
                .submissions
                .push(Submission::pending(player_id, task.prompt, task.medium));
        }

        effects.push(Effect::Schedule(
            self.timer(game, Transition::BeginDiscussion),
        ));
        Ok(effects)
    }

    fn begin_discussion<R: Rng>(
        &self,
        game: &mut Game,
        rng: &mut R,
    ) -> Result<Vec<Effect>, GameError> {
        game.set_phase(GamePhase::Discussion)?;
        let chat = game.chat_id;

        let mut effects = vec![Effect::to_chat(
            chat,
            Message::text(
                "The discussion begins!\n\n\
                 Below are the anonymous results of the creative phase. \
                 Study them carefully to find the spies.",
            ),
        )];

        // 提出順が分からないように並べ替えて匿名で公開する
        let round = game.current()?;
        let mut shown: Vec<&Submission> =
            round.submissions.iter().filter(|s| s.is_submitted()).collect();
        shown.shuffle(rng);

        if shown.is_empty() {
            effects.push(Effect::to_chat(
                chat,
                Message::text("Nobody handed anything in this round."),
            ));
        }
        for (i, submission) in shown.iter().enumerate() {
            let content = submission.content.clone().unwrap_or_default();
            let message = match submission.medium {
                Medium::Drawing => Message::Photo {
                    file_id: content,
                    caption: format!("Drawing #A{}: {}", i + 1, submission.task),
                },
                Medium::Text => Message::text(format!(
                    "Answer #A{}\nTask: {}\n\n\"{}\"",
                    i + 1,
                    submission.task,
                    content
                )),
            };
            effects.push(Effect::to_chat(chat, message));
        }

        effects.push(Effect::to_chat(
            chat,
            Message::text(format!(
                "Discuss what you have seen and work out who might be a spy. Voting starts in {}.",
                duration_text(self.config.discussion_seconds)
            )),
        ));
        effects.push(Effect::Schedule(self.timer(game, Transition::BeginVoting)));
        Ok(effects)
    }

    fn begin_voting(&self, game: &mut Game) -> Result<Vec<Effect>, GameError> {
        game.set_phase(GamePhase::Voting)?;

        let mut effects = vec![Effect::to_chat(
            game.chat_id,
            Message::text(format!(
                "Voting has started! You have {} to vote for the player you believe is a spy.\n\n\
                 Every player gets a ballot in private messages.",
                duration_text(self.config.voting_seconds)
            )),
        )];

        for voter in game.active_players() {
            let mut ballot = format!(
                "Round {} ballot. Who do you think is a spy? Vote with the player number:\n",
                game.current_round
            );
            for candidate in game.active_players().filter(|p| p.id != voter.id) {
                ballot.push_str(&format!("\n{}. {}", candidate.id, candidate.name));
            }
            effects.push(Effect::to_user(voter.user_id, Message::text(ballot)));
        }

        effects.push(Effect::Schedule(self.timer(game, Transition::CloseVoting)));
        Ok(effects)
    }

    fn close_voting<R: Rng>(
        &self,
        session: &mut ChatSession,
        rng: &mut R,
    ) -> Result<Vec<Effect>, GameError> {
        let game = game_mut(session)?;
        let chat = game.chat_id;
        let resolution = game.current()?.tally.resolve(rng);

        // 書き換える前に追放対象が存在することを確認する
        if let Resolution::Eliminate { target, .. } = resolution {
            if game.player(target).is_none() {
                return Err(GameError::EntityNotFound(
                    EntityKind::Player,
                    format!("{}/{}", game.id, target),
                ));
            }
        }

        game.set_phase(GamePhase::Results)?;
        game.current_mut()?.finished_at = Some(Utc::now());

        let mut effects = Vec::new();
        let next = match resolution {
            Resolution::NoElimination => {
                effects.push(Effect::to_chat(
                    chat,
                    Message::text(
                        "Strange... nobody voted. The round ends without an elimination.",
                    ),
                ));
                AfterResults::NextRound
            }
            Resolution::Eliminate { target, votes } => {
                let (name, role) = match game.player_mut(target) {
                    Some(player) => {
                        player.eliminate();
                        (player.name.clone(), player.role)
                    }
                    None => {
                        return Err(GameError::EntityNotFound(
                            EntityKind::Player,
                            target.to_string(),
                        ))
                    }
                };

                let active = game.active_roles();
                for (player_id, delta) in score_round(role, &active) {
                    if let Some(player) = game.player_mut(player_id) {
                        player.score += delta;
                    }
                }

                info!(
                    "Player {} ({}) eliminated in game {} round {}",
                    target, role, game.id, game.current_round
                );
                effects.push(Effect::to_chat(
                    chat,
                    Message::text(format!(
                        "Agent {} has been eliminated!\n\nRole: {}\nVotes: {}",
                        name, role, votes
                    )),
                ));

                match check_game_end(active.into_values()) {
                    Some(team) => AfterResults::Finish(team),
                    None => AfterResults::NextRound,
                }
            }
        };

        match next {
            AfterResults::NextRound => effects.extend(self.start_next_round(game_mut(session)?)),
            AfterResults::Finish(team) => effects.extend(self.finish(session, Some(team))?),
        }
        Ok(effects)
    }

    fn start_next_round(&self, game: &mut Game) -> Vec<Effect> {
        game.current_round += 1;
        game.rounds.push(Round::new(game.current_round));
        game.phase = GamePhase::Preparation;

        vec![
            Effect::to_chat(
                game.chat_id,
                Message::text(format!(
                    "Round {} begins! Get ready for a new challenge. The creative phase starts in {}.",
                    game.current_round,
                    duration_text(self.config.preparation_seconds)
                )),
            ),
            Effect::Schedule(self.timer(game, Transition::BeginCreative)),
        ]
    }

    fn finish(
        &self,
        session: &mut ChatSession,
        winner: Option<Team>,
    ) -> Result<Vec<Effect>, GameError> {
        let mut game = session.game.take().ok_or(GameError::NoActiveGame)?;
        let now = Utc::now();
        game.phase = GamePhase::Idle;
        game.finished_at = Some(now);
        game.winner = winner;
        if let Ok(round) = game.current_mut() {
            round.finished_at.get_or_insert(now);
        }

        let chat = game.chat_id;
        let mut effects = Vec::new();
        match winner {
            Some(Team::Loyal) => effects.push(Effect::to_chat(
                chat,
                Message::text(
                    "Game over! The loyal agents win!\n\n\
                     Every spy has been exposed. Mission accomplished!",
                ),
            )),
            Some(Team::Spy) => effects.push(Effect::to_chat(
                chat,
                Message::text(
                    "Game over! The spies win!\n\n\
                     The spies have matched the agents in number. Mission failed!",
                ),
            )),
            None => effects.push(Effect::to_chat(
                chat,
                Message::text("The game has been ended early. Use /join to start a new one."),
            )),
        }

        if winner.is_some() {
            let mut standings: Vec<&Player> = game.players.iter().collect();
            standings.sort_by(|a, b| b.score.cmp(&a.score));
            let mut board = String::from("Final results:\n");
            for player in standings {
                board.push_str(&format!(
                    "\n{}: {} points - {}",
                    player.name, player.score, player.role
                ));
            }
            effects.push(Effect::to_chat(chat, Message::text(board)));
            effects.push(Effect::to_chat(
                chat,
                Message::text("Thanks for playing! Use /join and then /startgame to play again."),
            ));
        }

        info!("Game {} in chat {} finished, winner: {:?}", game.id, chat, winner);
        effects.push(Effect::GameFinished(Box::new(game)));
        Ok(effects)
    }

    fn timer(&self, game: &Game, transition: Transition) -> PhaseTimer {
        let delay = match transition {
            Transition::BeginCreative => self.config.preparation_time(),
            Transition::BeginDiscussion => self.config.creative_time(),
            Transition::BeginVoting => self.config.discussion_time(),
            Transition::CloseVoting => self.config.voting_time(),
        };
        PhaseTimer {
            game_id: game.id,
            round_number: game.current_round,
            transition,
            delay,
        }
    }
}

fn game_mut(session: &mut ChatSession) -> Result<&mut Game, GameError> {
    session.game.as_mut().ok_or(GameError::NoActiveGame)
}

fn task_text(round: u32, task: &Task) -> String {
    let how = match task.medium {
        Medium::Drawing => "Draw it and send the picture here as a photo.",
        Medium::Text => "Reply here with your answer as a text message.",
    };
    format!("Your task for round {}:\n\n{}\n\n{}", round, task.prompt, how)
}

fn duration_text(seconds: u64) -> String {
    match seconds {
        60 => "1 minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{} seconds", s),
    }
}
