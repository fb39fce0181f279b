// Best-available selection used when a turn expires.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::dto::player_dto::Player;

/// Highest prior-season goal count first; equal rankings go to the lowest
/// player id so repeated runs over the same pool agree.
fn preference(a: &Player, b: &Player) -> Ordering {
    b.ranking
        .cmp(&a.ranking)
        .then_with(|| a.player_id.cmp(&b.player_id))
}

pub fn best_available<'a>(players: &'a [Player], taken: &HashSet<&str>) -> Option<&'a Player> {
    players
        .iter()
        .filter(|p| !taken.contains(p.player_id.as_str()))
        .min_by(|a, b| preference(a, b))
}

/// The pool in auto-pick order, without players that are already owned.
pub fn ranked_available(players: &[Player], taken: &HashSet<&str>) -> Vec<Player> {
    let mut available: Vec<Player> = players
        .iter()
        .filter(|p| !taken.contains(p.player_id.as_str()))
        .cloned()
        .collect();
    available.sort_by(preference);
    available
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, ranking: i64) -> Player {
        Player {
            player_id: id.to_string(),
            name: format!("Player {id}"),
            club: "ATL".into(),
            position: "F".into(),
            ranking,
            goals: 0,
        }
    }

    #[test]
    fn picks_the_highest_ranked_free_player() {
        let pool = vec![player("p1", 4), player("p2", 17), player("p3", 9)];
        let taken = HashSet::new();
        assert_eq!(best_available(&pool, &taken).unwrap().player_id, "p2");

        let taken: HashSet<&str> = ["p2"].into_iter().collect();
        assert_eq!(best_available(&pool, &taken).unwrap().player_id, "p3");
    }

    #[test]
    fn ties_go_to_the_lowest_id_regardless_of_pool_order() {
        let forward = vec![player("p7", 12), player("p3", 12), player("p5", 12)];
        let mut backward = forward.clone();
        backward.reverse();
        let taken = HashSet::new();
        assert_eq!(best_available(&forward, &taken).unwrap().player_id, "p3");
        assert_eq!(best_available(&backward, &taken).unwrap().player_id, "p3");
    }

    #[test]
    fn exhausted_pool_yields_nothing() {
        let pool = vec![player("p1", 1)];
        let taken: HashSet<&str> = ["p1"].into_iter().collect();
        assert!(best_available(&pool, &taken).is_none());
        assert!(ranked_available(&pool, &taken).is_empty());
    }

    #[test]
    fn ranked_available_matches_best_available() {
        let pool = vec![player("b", 3), player("a", 3), player("c", 8)];
        let taken = HashSet::new();
        let ranked: Vec<String> = ranked_available(&pool, &taken)
            .into_iter()
            .map(|p| p.player_id)
            .collect();
        assert_eq!(ranked, vec!["c", "a", "b"]);
    }
}
