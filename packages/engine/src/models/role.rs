use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Loyal,  // 忠実なエージェント
    Spy,    // スパイ
    Double, // 二重スパイ（忠実側の勝利条件）
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Team {
    Loyal,
    Spy,
}

impl Role {
    // 勝利条件を共有する陣営
    pub fn team(self) -> Team {
        match self {
            Role::Spy => Team::Spy,
            Role::Loyal | Role::Double => Team::Loyal,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Role::Loyal => "Loyal agent",
            Role::Spy => "Spy",
            Role::Double => "Double agent",
        }
    }

    pub fn briefing(self) -> &'static str {
        match self {
            Role::Loyal => {
                "Your goal is to find and expose every spy. Do your creative tasks \
                 honestly so the other agents can recognise you, and watch for work \
                 that gives a spy away."
            }
            Role::Spy => {
                "Your goal is to stay hidden until the spies match the agents in number. \
                 Make your creative work look loyal and steer the vote towards the agents."
            }
            Role::Double => {
                "You know who the spies are, but you win together with the loyal agents. \
                 Guide the vote without giving away what you know, or the spies will \
                 come for you."
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Loyal => write!(f, "loyal agents"),
            Team::Spy => write!(f, "spies"),
        }
    }
}
