use crate::models::{Role, Team};

/// Returns the winning team, or `None` while the game goes on.
///
/// The double agent counts towards the loyal headcount. Parity favours the spies.
pub fn check_game_end<I>(active_roles: I) -> Option<Team>
where
    I: IntoIterator<Item = Role>,
{
    let (spies, loyal) = active_roles
        .into_iter()
        .fold((0usize, 0usize), |(s, l), role| match role.team() {
            Team::Spy => (s + 1, l),
            Team::Loyal => (s, l + 1),
        });

    if spies == 0 {
        Some(Team::Loyal)
    } else if spies >= loyal {
        Some(Team::Spy)
    } else {
        None
    }
}
