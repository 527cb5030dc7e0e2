use spy_sketch_engine::models::{ChatId, Role};

use crate::error::ApiError;
use crate::models::user::PlatformUser;
use crate::services::game_service;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Rules,
    Join,
    Leave,
    StartGame,
    EndGame,
    Stats,
    Leaderboard,
    Unknown(String),
}

impl BotCommand {
    /// Parses `/name` or `/name@botname`, ignoring arguments. Plain text is not a command.
    pub fn parse(text: &str) -> Option<BotCommand> {
        let word = text.trim().split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name).to_lowercase();

        let command = match name.as_str() {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            "rules" => BotCommand::Rules,
            "join" => BotCommand::Join,
            "leave" => BotCommand::Leave,
            "startgame" => BotCommand::StartGame,
            "endgame" => BotCommand::EndGame,
            "stats" => BotCommand::Stats,
            "leaderboard" => BotCommand::Leaderboard,
            _ => BotCommand::Unknown(name),
        };
        Some(command)
    }
}

const WELCOME_TEXT: &str = "Welcome to Spy Sketch!\n\n\
    A social deduction party game with creative tasks.\n\n\
    Use /join to register for the next game.\n\
    When everyone is ready, use /startgame to begin.\n\
    Use /help for the list of commands.";

const HELP_TEXT: &str = "Commands:\n\n\
    /start - Show the welcome message\n\
    /join - Register for the next game\n\
    /leave - Leave the registration\n\
    /startgame - Start the game with everyone registered\n\
    /endgame - End the current game\n\
    /rules - Show the rules\n\
    /stats - Show your statistics\n\
    /leaderboard - Show the best players\n\n\
    How to play:\n\
    1. Everybody who wants to play sends /join\n\
    2. Start the game with /startgame\n\
    3. Every player gets a secret role in a private message\n\
    4. Follow the bot through the phases of each round";

const RULES_TEXT: &str = "Spy Sketch rules:\n\n\
    1. Every player gets one of the roles:\n\
    \x20  - Loyal agent: find the spies\n\
    \x20  - Spy: stay hidden and mislead the agents\n\
    \x20  - Double agent: knows the spies but wins with the loyal agents\n\n\
    2. Each round has four phases:\n\
    \x20  - Preparation: get ready for the next task\n\
    \x20  - Creative: complete your task (a drawing or a text)\n\
    \x20  - Discussion: study the anonymous results and look for spies\n\
    \x20  - Voting: vote for the player you suspect\n\n\
    3. The most voted player is eliminated and their role is revealed.\n\
    4. The loyal agents win when every spy is gone. The spies win as soon as \
    they are as many as the loyal agents.";

/// Runs a bot command sent by `user` in `chat_id` and returns the reply text.
pub async fn dispatch(
    state: AppState,
    chat_id: ChatId,
    user: &PlatformUser,
    command: BotCommand,
) -> Result<String, ApiError> {
    let reply = match command {
        BotCommand::Start => WELCOME_TEXT.to_string(),
        BotCommand::Help => HELP_TEXT.to_string(),
        BotCommand::Rules => RULES_TEXT.to_string(),
        BotCommand::Join => {
            let view = game_service::join(state, chat_id, user).await?;
            format!(
                "You are registered. Players registered: {}.",
                view.registrants.len()
            )
        }
        BotCommand::Leave => {
            game_service::leave(state, chat_id, user.id).await?;
            "You left the registration.".to_string()
        }
        BotCommand::StartGame => {
            game_service::start_game(state, chat_id).await?;
            "The game has started! Check your private messages for your role.".to_string()
        }
        BotCommand::EndGame => {
            game_service::end_game(state, chat_id).await?;
            "The game has been ended.".to_string()
        }
        BotCommand::Stats => {
            let user = state.user_service.resolve(user);
            let stats = state.user_service.stats(user.id)?;
            if stats.games_played == 0 {
                format!("{}, you have not finished any games yet.", stats.display_name)
            } else {
                let roles = [Role::Loyal, Role::Spy, Role::Double]
                    .iter()
                    .map(|role| {
                        format!(
                            "{}: {}",
                            role,
                            stats.roles_played.get(role).copied().unwrap_or(0)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "Statistics for {}:\n\nGames played: {}\nGames won: {}\nWin rate: {:.1}%\nTotal score: {}\n\nRoles:\n{}",
                    stats.display_name,
                    stats.games_played,
                    stats.games_won,
                    stats.win_rate * 100.0,
                    stats.total_score,
                    roles
                )
            }
        }
        BotCommand::Leaderboard => {
            let board = state.user_service.leaderboard();
            if board.is_empty() {
                "Nobody has finished at least 3 games yet.".to_string()
            } else {
                let mut text = String::from("Leaderboard:\n");
                for entry in board {
                    text.push_str(&format!(
                        "\n{}. {} - {:.1}% wins ({} of {})",
                        entry.rank,
                        entry.display_name,
                        entry.win_rate * 100.0,
                        entry.games_won,
                        entry.games_played
                    ));
                }
                text
            }
        }
        BotCommand::Unknown(name) => {
            format!("Unknown command /{}. Use /help to see the list of commands.", name)
        }
    };
    Ok(reply)
}
