use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;

use spy_sketch_engine::models::{
    ChatSession, Effect, GameConfig, GamePhase, Medium, Message, PhaseTimer, PlayerId, Recipient,
    Registrant, Role, SubmissionContent, Team, Transition, UserId,
};
use spy_sketch_engine::{GameError, GameStateMachine, Task, TaskProvider, VoteRejection};

const CHAT: i64 = -1001;

/// 常に同じ種類のお題を出す
struct FixedTasks(Medium);

impl TaskProvider for FixedTasks {
    fn next_task(&self, _hint: Option<Medium>, _rng: &mut dyn RngCore) -> Task {
        Task {
            medium: self.0,
            prompt: "Draw a secret key".to_string(),
        }
    }
}

fn config() -> GameConfig {
    GameConfig {
        double_agent_enabled: false,
        ..GameConfig::default()
    }
}

fn machine_with(config: GameConfig, medium: Medium) -> GameStateMachine {
    GameStateMachine::new(config, Arc::new(FixedTasks(medium)))
}

fn user(i: usize) -> UserId {
    100 + i as UserId
}

fn registered(machine: &GameStateMachine, count: usize) -> ChatSession {
    let mut session = ChatSession::new(CHAT);
    for i in 1..=count {
        machine
            .join(
                &mut session,
                Registrant {
                    user_id: user(i),
                    name: format!("Player{}", i),
                },
            )
            .unwrap();
    }
    session
}

fn scheduled(effects: &[Effect]) -> PhaseTimer {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::Schedule(timer) => Some(timer.clone()),
            _ => None,
        })
        .expect("a timer should be scheduled")
}

fn texts_to(effects: &[Effect], recipient: Recipient) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Notify(notice) if notice.recipient == recipient => match &notice.message {
                Message::Text { text } => Some(text.clone()),
                Message::Photo { caption, .. } => Some(caption.clone()),
            },
            _ => None,
        })
        .collect()
}

// (player id, user id) のうち指定した役職のもの
fn members(session: &ChatSession, role: Role) -> Vec<(PlayerId, UserId)> {
    session
        .game
        .as_ref()
        .unwrap()
        .players
        .iter()
        .filter(|p| p.role == role)
        .map(|p| (p.id, p.user_id))
        .collect()
}

fn advance_to(
    machine: &GameStateMachine,
    session: &mut ChatSession,
    phase: GamePhase,
    rng: &mut StdRng,
) {
    while session.phase() != phase {
        machine.advance(session, rng).unwrap();
    }
}

#[test]
fn test_full_game_loyal_agents_win() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = registered(&machine, 6);

    let effects = machine.start_game(&mut session, &mut rng).unwrap();
    assert_eq!(session.phase(), GamePhase::Preparation);
    assert!(session.registrants.is_empty());
    for i in 1..=6 {
        let briefing = texts_to(&effects, Recipient::User(user(i)));
        assert_eq!(briefing.len(), 1);
        assert!(briefing[0].starts_with("Your role:"));
    }
    let timer = scheduled(&effects);
    assert_eq!(timer.transition, Transition::BeginCreative);
    assert_eq!(timer.round_number, 1);

    let spies = members(&session, Role::Spy);
    assert_eq!(spies.len(), 1);
    let (spy_id, spy_user) = spies[0];
    let (loyal_id, _) = members(&session, Role::Loyal)[0];

    // 創作フェーズ
    let effects = machine.on_timer(&mut session, &timer, &mut rng).unwrap();
    assert_eq!(session.phase(), GamePhase::Creative);
    for i in 1..=6 {
        let task = texts_to(&effects, Recipient::User(user(i)));
        assert!(task[0].contains("Draw a secret key"));
    }
    for i in 1..=6 {
        machine
            .submit(
                &mut session,
                user(i),
                SubmissionContent::Text {
                    text: format!("idea {}", i),
                },
            )
            .unwrap();
    }

    // 議論フェーズ：作品は匿名で全て公開される
    let timer = scheduled(&effects);
    let effects = machine.on_timer(&mut session, &timer, &mut rng).unwrap();
    assert_eq!(session.phase(), GamePhase::Discussion);
    let shown = texts_to(&effects, Recipient::Chat(CHAT));
    assert_eq!(shown.iter().filter(|t| t.starts_with("Answer #A")).count(), 6);
    assert!(shown.iter().all(|t| !t.contains("Player")));

    let timer = scheduled(&effects);
    let effects = machine.on_timer(&mut session, &timer, &mut rng).unwrap();
    assert_eq!(session.phase(), GamePhase::Voting);
    assert_eq!(scheduled(&effects).transition, Transition::CloseVoting);

    machine
        .record_vote(&mut session, spy_user, None, loyal_id, &mut rng)
        .unwrap();
    let mut last = Vec::new();
    for i in 1..=6 {
        if user(i) != spy_user {
            last = machine
                .record_vote(&mut session, user(i), Some(1), spy_id, &mut rng)
                .unwrap();
        }
    }

    // 全員が投票したので締め切りを待たずに集計される
    assert!(last.iter().any(|e| matches!(e, Effect::CancelTimer)));
    let announcements = texts_to(&last, Recipient::Chat(CHAT));
    assert!(announcements
        .iter()
        .any(|t| t.contains("has been eliminated") && t.contains("Role: Spy") && t.contains("Votes: 5")));
    assert!(announcements.iter().any(|t| t.contains("The loyal agents win")));

    let finished = last
        .iter()
        .find_map(|e| match e {
            Effect::GameFinished(game) => Some(game),
            _ => None,
        })
        .expect("the game should be finished");
    assert_eq!(finished.winner, Some(Team::Loyal));
    assert_eq!(finished.phase, GamePhase::Idle);
    for player in &finished.players {
        let expected = if player.id == spy_id { 0 } else { 2 };
        assert_eq!(player.score, expected, "score of {}", player.name);
    }

    assert!(session.game.is_none());
    assert_eq!(session.phase(), GamePhase::Idle);
}

#[test]
fn test_start_with_too_few_players_is_rejected() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(1);
    let mut session = registered(&machine, 2);

    let err = machine.start_game(&mut session, &mut rng).unwrap_err();
    assert_eq!(err, GameError::InsufficientPlayers { count: 2, min: 3 });
    assert_eq!(session.phase(), GamePhase::Registration);
    assert_eq!(session.registrants.len(), 2);
}

#[test]
fn test_start_without_registration() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(1);
    let mut session = ChatSession::new(CHAT);

    assert_eq!(
        machine.start_game(&mut session, &mut rng).unwrap_err(),
        GameError::InsufficientPlayers { count: 0, min: 3 }
    );
}

#[test]
fn test_registration_guards() {
    let machine = machine_with(
        GameConfig {
            max_players: 4,
            ..config()
        },
        Medium::Text,
    );
    let mut rng = StdRng::seed_from_u64(1);
    let mut session = registered(&machine, 4);

    let again = Registrant {
        user_id: user(1),
        name: "Player1".to_string(),
    };
    assert_eq!(
        machine.join(&mut session, again).unwrap_err(),
        GameError::AlreadyJoined
    );

    let extra = Registrant {
        user_id: user(5),
        name: "Player5".to_string(),
    };
    assert_eq!(
        machine.join(&mut session, extra.clone()).unwrap_err(),
        GameError::TooManyPlayers { count: 5, max: 4 }
    );

    machine.leave(&mut session, user(4)).unwrap();
    assert_eq!(
        machine.leave(&mut session, user(4)).unwrap_err(),
        GameError::NotRegistered
    );

    machine.start_game(&mut session, &mut rng).unwrap();
    assert_eq!(
        machine.join(&mut session, extra).unwrap_err(),
        GameError::GameInProgress
    );
}

#[test]
fn test_vote_guards() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(7);
    let mut session = registered(&machine, 4);
    machine.start_game(&mut session, &mut rng).unwrap();

    assert_eq!(
        machine
            .record_vote(&mut session, user(1), None, 2, &mut rng)
            .unwrap_err(),
        GameError::PhaseViolation {
            expected: GamePhase::Voting,
            actual: GamePhase::Preparation,
        }
    );

    advance_to(&machine, &mut session, GamePhase::Voting, &mut rng);

    assert_eq!(
        machine
            .record_vote(&mut session, user(1), None, 1, &mut rng)
            .unwrap_err(),
        GameError::InvalidVote(VoteRejection::SelfVote)
    );
    assert_eq!(
        machine
            .record_vote(&mut session, 999, None, 1, &mut rng)
            .unwrap_err(),
        GameError::InvalidVote(VoteRejection::VoterNotActive)
    );
    assert_eq!(
        machine
            .record_vote(&mut session, user(1), None, 42, &mut rng)
            .unwrap_err(),
        GameError::InvalidVote(VoteRejection::TargetNotActive)
    );

    let round = session.game.as_ref().unwrap().current().unwrap();
    assert!(round.tally.is_empty());
}

#[test]
fn test_submission_guards() {
    let machine = machine_with(config(), Medium::Drawing);
    let mut rng = StdRng::seed_from_u64(3);
    let mut session = registered(&machine, 3);
    machine.start_game(&mut session, &mut rng).unwrap();

    let photo = SubmissionContent::Photo {
        file_id: "file-1".to_string(),
    };
    assert_eq!(
        machine
            .submit(&mut session, user(1), photo.clone())
            .unwrap_err(),
        GameError::PhaseViolation {
            expected: GamePhase::Creative,
            actual: GamePhase::Preparation,
        }
    );

    advance_to(&machine, &mut session, GamePhase::Creative, &mut rng);

    let text = SubmissionContent::Text {
        text: "a key".to_string(),
    };
    assert_eq!(
        machine.submit(&mut session, user(1), text).unwrap_err(),
        GameError::WrongMedium {
            expected: Medium::Drawing,
            got: Medium::Text,
        }
    );
    assert_eq!(
        machine
            .submit(&mut session, 999, photo.clone())
            .unwrap_err(),
        GameError::NotAParticipant
    );

    let reply = machine
        .submit(&mut session, user(1), photo.clone())
        .unwrap();
    assert!(texts_to(&reply, Recipient::User(user(1)))[0].contains("accepted"));
    assert_eq!(
        machine.submit(&mut session, user(1), photo).unwrap_err(),
        GameError::AlreadySubmitted
    );

    // 画像はそのまま写真として議論フェーズに流れる
    let effects = machine.advance(&mut session, &mut rng).unwrap();
    let photos = effects
        .iter()
        .filter(|e| {
            matches!(e, Effect::Notify(n) if matches!(&n.message, Message::Photo { file_id, .. } if file_id == "file-1"))
        })
        .count();
    assert_eq!(photos, 1);
}

#[test]
fn test_stale_timer_is_ignored() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(11);
    let mut session = registered(&machine, 3);

    let effects = machine.start_game(&mut session, &mut rng).unwrap();
    let timer = scheduled(&effects);

    let effects = machine.advance(&mut session, &mut rng).unwrap();
    assert!(matches!(effects[0], Effect::CancelTimer));
    assert_eq!(session.phase(), GamePhase::Creative);

    let effects = machine.on_timer(&mut session, &timer, &mut rng).unwrap();
    assert!(effects.is_empty());
    assert_eq!(session.phase(), GamePhase::Creative);
}

#[test]
fn test_no_votes_starts_next_round() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(5);
    let mut session = registered(&machine, 4);
    machine.start_game(&mut session, &mut rng).unwrap();
    advance_to(&machine, &mut session, GamePhase::Voting, &mut rng);

    let effects = machine.advance(&mut session, &mut rng).unwrap();
    assert!(texts_to(&effects, Recipient::Chat(CHAT))
        .iter()
        .any(|t| t.contains("nobody voted")));

    let timer = scheduled(&effects);
    assert_eq!(timer.transition, Transition::BeginCreative);
    assert_eq!(timer.round_number, 2);

    let game = session.game.as_ref().unwrap();
    assert_eq!(game.phase, GamePhase::Preparation);
    assert_eq!(game.current_round, 2);
    assert_eq!(game.active_players().count(), 4);
    assert_eq!(game.round(1).unwrap().phase, GamePhase::Results);
    assert!(game.round(1).unwrap().finished_at.is_some());

    // 前のラウンドの投票は受け付けない
    advance_to(&machine, &mut session, GamePhase::Voting, &mut rng);
    assert_eq!(
        machine
            .record_vote(&mut session, user(1), Some(1), 2, &mut rng)
            .unwrap_err(),
        GameError::PhaseViolation {
            expected: GamePhase::Voting,
            actual: GamePhase::Results,
        }
    );
}

#[test]
fn test_spies_win_at_parity() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(9);
    let mut session = registered(&machine, 3);
    machine.start_game(&mut session, &mut rng).unwrap();
    advance_to(&machine, &mut session, GamePhase::Voting, &mut rng);

    let (spy_id, spy_user) = members(&session, Role::Spy)[0];
    let loyal = members(&session, Role::Loyal);
    let (first_id, first_user) = loyal[0];
    let (_, second_user) = loyal[1];

    machine
        .record_vote(&mut session, spy_user, None, first_id, &mut rng)
        .unwrap();
    machine
        .record_vote(&mut session, second_user, None, first_id, &mut rng)
        .unwrap();
    let effects = machine
        .record_vote(&mut session, first_user, None, spy_id, &mut rng)
        .unwrap();

    let finished = effects
        .iter()
        .find_map(|e| match e {
            Effect::GameFinished(game) => Some(game),
            _ => None,
        })
        .expect("the game should be finished");
    assert_eq!(finished.winner, Some(Team::Spy));
    assert!(!finished.player(first_id).unwrap().is_active);
    assert_eq!(finished.player(spy_id).unwrap().score, 1);
    assert!(texts_to(&effects, Recipient::Chat(CHAT))
        .iter()
        .any(|t| t.contains("The spies win")));
    assert_eq!(session.phase(), GamePhase::Idle);
}

#[test]
fn test_double_agent_learns_the_spies() {
    let machine = machine_with(
        GameConfig {
            double_agent_enabled: true,
            double_agent_probability: 1.0,
            ..config()
        },
        Medium::Text,
    );
    let mut rng = StdRng::seed_from_u64(21);
    let mut session = registered(&machine, 8);
    let effects = machine.start_game(&mut session, &mut rng).unwrap();

    let game = session.game.as_ref().unwrap();
    let double = game
        .players
        .iter()
        .find(|p| p.role == Role::Double)
        .expect("a double agent should be present");
    let briefing = &texts_to(&effects, Recipient::User(double.user_id))[0];
    for spy in game.players.iter().filter(|p| p.role == Role::Spy) {
        assert!(briefing.contains(&spy.name));
    }

    let spy = game.players.iter().find(|p| p.role == Role::Spy).unwrap();
    let spy_briefing = &texts_to(&effects, Recipient::User(spy.user_id))[0];
    assert!(!spy_briefing.contains("The spies are"));
}

#[test]
fn test_end_game() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(2);

    let mut idle = ChatSession::new(CHAT);
    assert_eq!(
        machine.end_game(&mut idle).unwrap_err(),
        GameError::NoActiveGame
    );

    let mut session = registered(&machine, 3);
    machine.end_game(&mut session).unwrap();
    assert_eq!(session.phase(), GamePhase::Idle);

    let mut session = registered(&machine, 3);
    machine.start_game(&mut session, &mut rng).unwrap();
    assert!(machine.resume_timer(&session).is_some());

    let effects = machine.end_game(&mut session).unwrap();
    assert!(matches!(effects[0], Effect::CancelTimer));
    let finished = effects
        .iter()
        .find_map(|e| match e {
            Effect::GameFinished(game) => Some(game),
            _ => None,
        })
        .unwrap();
    assert_eq!(finished.winner, None);
    assert!(finished.is_finished());
    assert_eq!(session.phase(), GamePhase::Idle);
    assert!(machine.resume_timer(&session).is_none());
}

#[test]
fn test_missing_round_leaves_voting_untouched() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(13);
    let mut session = registered(&machine, 4);
    machine.start_game(&mut session, &mut rng).unwrap();
    advance_to(&machine, &mut session, GamePhase::Voting, &mut rng);
    machine
        .record_vote(&mut session, user(1), None, 2, &mut rng)
        .unwrap();

    let players_before = session.game.as_ref().unwrap().players.clone();
    session.game.as_mut().unwrap().rounds.clear();

    let err = machine.advance(&mut session, &mut rng).unwrap_err();
    assert!(err.is_fatal(), "unexpected error: {:?}", err);
    assert!(matches!(err, GameError::EntityNotFound(..)));
    assert_eq!(session.phase(), GamePhase::Voting);
    assert_eq!(session.game.as_ref().unwrap().players, players_before);
}

#[test]
fn test_failed_early_close_discards_the_last_vote() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(17);
    let mut session = registered(&machine, 4);
    machine.start_game(&mut session, &mut rng).unwrap();
    advance_to(&machine, &mut session, GamePhase::Voting, &mut rng);

    machine
        .record_vote(&mut session, user(1), None, 4, &mut rng)
        .unwrap();
    machine
        .record_vote(&mut session, user(2), None, 4, &mut rng)
        .unwrap();

    // 得票中のプレイヤーが名簿から消えると集計は失敗する
    session
        .game
        .as_mut()
        .unwrap()
        .players
        .retain(|p| p.id != 4);

    let err = machine
        .record_vote(&mut session, user(3), None, 1, &mut rng)
        .unwrap_err();
    assert!(err.is_fatal(), "unexpected error: {:?}", err);
    assert_eq!(session.phase(), GamePhase::Voting);

    let tally = &session.game.as_ref().unwrap().current().unwrap().tally;
    assert_eq!(tally.len(), 2);
    assert!(tally.vote_of(3).is_none());
}

#[test]
fn test_session_snapshot_round_trip() {
    let machine = machine_with(config(), Medium::Text);
    let mut rng = StdRng::seed_from_u64(19);
    let mut session = registered(&machine, 4);
    machine.start_game(&mut session, &mut rng).unwrap();
    advance_to(&machine, &mut session, GamePhase::Creative, &mut rng);
    machine
        .submit(
            &mut session,
            user(2),
            SubmissionContent::Text {
                text: "a lock".to_string(),
            },
        )
        .unwrap();

    let json = serde_json::to_string(&session).unwrap();
    let mut restored: ChatSession = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.view(), session.view());
    let game = restored.game.as_ref().unwrap();
    assert_eq!(game.players, session.game.as_ref().unwrap().players);
    assert_eq!(machine.resume_timer(&restored), machine.resume_timer(&session));

    // 復元後も同じ提出は二重に受け付けない
    assert_eq!(
        machine
            .submit(
                &mut restored,
                user(2),
                SubmissionContent::Text {
                    text: "again".to_string(),
                },
            )
            .unwrap_err(),
        GameError::AlreadySubmitted
    );
}
