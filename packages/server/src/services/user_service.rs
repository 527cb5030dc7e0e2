use chrono::Utc;
use spy_sketch_engine::models::{Game, UserId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::models::user::{LeaderboardEntry, PlatformUser, User, UserStats};

// ランキングに載るのに必要な対戦数
const LEADERBOARD_MIN_GAMES: u32 = 3;
const LEADERBOARD_SIZE: usize = 10;

#[derive(Clone, Default)]
pub struct UserService {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("user {0} not found")]
    UserNotFound(UserId),
}

impl UserService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored user, creating it on first contact.
    pub fn resolve(&self, platform: &PlatformUser) -> User {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let user = users.entry(platform.id).or_insert_with(|| {
            debug!("Registering new user {}", platform.id);
            User::new(platform)
        });
        user.username = platform.username.clone();
        user.first_name = platform.first_name.clone();
        user.last_name = platform.last_name.clone();
        user.last_active = Utc::now();
        user.clone()
    }

    pub fn get_user(&self, user_id: UserId) -> Result<User, UserServiceError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users
            .get(&user_id)
            .cloned()
            .ok_or(UserServiceError::UserNotFound(user_id))
    }

    pub fn stats(&self, user_id: UserId) -> Result<UserStats, UserServiceError> {
        self.get_user(user_id).map(|u| UserStats::from(&u))
    }

    /// Credits every player of a finished game. Games without a winner do not count.
    pub fn record_result(&self, game: &Game) {
        if game.winner.is_none() {
            return;
        }
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        for player in &game.players {
            let user = users.entry(player.user_id).or_insert_with(|| {
                User::new(&PlatformUser {
                    id: player.user_id,
                    username: None,
                    first_name: player.name.clone(),
                    last_name: None,
                })
            });
            user.games_played += 1;
            if game.is_winner(player) {
                user.games_won += 1;
            }
            user.total_score += i64::from(player.score);
            *user.roles_played.entry(player.role).or_insert(0) += 1;
        }
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        let mut ranked: Vec<&User> = users
            .values()
            .filter(|u| u.games_played >= LEADERBOARD_MIN_GAMES)
            .collect();
        ranked.sort_by(|a, b| {
            b.win_rate()
                .total_cmp(&a.win_rate())
                .then(b.games_won.cmp(&a.games_won))
                .then(a.id.cmp(&b.id))
        });

        ranked
            .into_iter()
            .take(LEADERBOARD_SIZE)
            .enumerate()
            .map(|(i, u)| LeaderboardEntry {
                rank: i + 1,
                user_id: u.id,
                display_name: u.display_name(),
                games_played: u.games_played,
                games_won: u.games_won,
                win_rate: u.win_rate(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spy_sketch_engine::models::{Player, Role, Team};

    fn platform(id: UserId, name: &str) -> PlatformUser {
        PlatformUser {
            id,
            username: None,
            first_name: name.to_string(),
            last_name: None,
        }
    }

    fn game(winner: Option<Team>, players: Vec<Player>) -> Game {
        let mut game = Game::new(-1, 3, players);
        game.winner = winner;
        game
    }

    #[test]
    fn test_resolve_creates_once_and_refreshes_names() {
        let service = UserService::new();
        service.resolve(&platform(1, "Ann"));
        let user = service.resolve(&PlatformUser {
            last_name: Some("Lee".to_string()),
            ..platform(1, "Ann")
        });
        assert_eq!(user.display_name(), "Ann Lee");
        assert_eq!(service.stats(1).unwrap().games_played, 0);
        assert!(matches!(
            service.stats(2),
            Err(UserServiceError::UserNotFound(2))
        ));
    }

    #[test]
    fn test_record_result_credits_winning_team() {
        let service = UserService::new();
        let mut loyal = Player::new(1, 10, "Ann".to_string(), Role::Loyal);
        loyal.score = 2;
        let double = Player::new(2, 20, "Ben".to_string(), Role::Double);
        let spy = Player::new(3, 30, "Cat".to_string(), Role::Spy);
        service.record_result(&game(Some(Team::Loyal), vec![loyal, double, spy]));

        let ann = service.stats(10).unwrap();
        assert_eq!((ann.games_played, ann.games_won, ann.total_score), (1, 1, 2));
        assert_eq!(service.stats(20).unwrap().games_won, 1);
        let cat = service.stats(30).unwrap();
        assert_eq!((cat.games_played, cat.games_won), (1, 0));
        assert_eq!(cat.roles_played.get(&Role::Spy), Some(&1));
    }

    #[test]
    fn test_unfinished_game_is_not_counted() {
        let service = UserService::new();
        let player = Player::new(1, 10, "Ann".to_string(), Role::Loyal);
        service.record_result(&game(None, vec![player]));
        assert!(service.stats(10).is_err());
    }

    #[test]
    fn test_leaderboard_order() {
        let service = UserService::new();
        // 10: 3戦2勝, 20: 4戦2勝, 30: 2戦2勝（対象外）, 40: 3戦2勝
        let results: [(UserId, &[bool]); 4] = [
            (10, &[true, true, false]),
            (20, &[true, true, false, false]),
            (30, &[true, true]),
            (40, &[false, true, true]),
        ];
        for (user_id, outcomes) in results {
            for &won in outcomes {
                let role = if won { Role::Loyal } else { Role::Spy };
                let player = Player::new(1, user_id, format!("U{}", user_id), role);
                service.record_result(&game(Some(Team::Loyal), vec![player]));
            }
        }

        let board = service.leaderboard();
        let order: Vec<UserId> = board.iter().map(|e| e.user_id).collect();
        assert_eq!(order, vec![10, 40, 20]);
        assert_eq!(board[0].rank, 1);
        assert!((board[2].win_rate - 0.5).abs() < f64::EPSILON);
    }
}
