use std::collections::BTreeMap;

use crate::models::{PlayerId, Role};

// 追放された役職と自分の役職から、そのラウンドの得点を決める
fn delta(eliminated: Role, own: Role) -> i32 {
    match (eliminated, own) {
        (Role::Spy, Role::Loyal) => 2,
        (Role::Spy, Role::Double) => 1,
        (Role::Loyal | Role::Double, Role::Spy) => 1,
        _ => 0,
    }
}

/// Score deltas for every player still in the game after an elimination.
///
/// Every entry of `active` appears in the result, with 0 where nothing is awarded.
pub fn score_round(eliminated: Role, active: &BTreeMap<PlayerId, Role>) -> BTreeMap<PlayerId, i32> {
    active
        .iter()
        .map(|(&player, &role)| (player, delta(eliminated, role)))
        .collect()
}
