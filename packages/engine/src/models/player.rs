use serde::{Deserialize, Serialize};

use super::{role::Role, PlayerId, UserId};

// 登録受付中の参加希望者（役職はまだ無い）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    pub user_id: UserId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub user_id: UserId,
    pub name: String,
    pub role: Role,
    pub is_active: bool, // 追放されるとfalse（戻らない）
    pub score: i32,
}

impl Player {
    pub fn new(id: PlayerId, user_id: UserId, name: String, role: Role) -> Self {
        Self {
            id,
            user_id,
            name,
            role,
            is_active: true,
            score: 0,
        }
    }

    pub(crate) fn eliminate(&mut self) {
        self.is_active = false;
    }
}
