// League table: each team scores the goals its players got while rostered.

use std::collections::HashMap;

use crate::dto::draft_dto::DraftPick;
use crate::dto::player_dto::Player;
use crate::dto::team_dto::{FantasyTeam, StandingRow};
use crate::dto::transfer_dto::{TransferAction, TransferActionType};

/// `actions` must be in the order they were logged.
pub fn compute_standings(
    teams: &[FantasyTeam],
    picks: &[DraftPick],
    actions: &[TransferAction],
    players: &[Player],
) -> Vec<StandingRow> {
    let current_goals: HashMap<&str, i64> = players
        .iter()
        .map(|p| (p.player_id.as_str(), p.goals))
        .collect();

    let mut points: HashMap<&str, i64> = HashMap::new();
    // (team, player) -> goals when the stint began
    let mut open: HashMap<(&str, &str), i64> = HashMap::new();

    for pick in picks {
        open.insert((pick.team_drafted_by.as_str(), pick.player_id.as_str()), 0);
    }

    for action in actions {
        let key = (action.fantasy_team_id.as_str(), action.player_id.as_str());
        match action.action_type {
            TransferActionType::Pickup => {
                open.insert(key, action.goals_at_action);
            }
            TransferActionType::Drop => {
                if let Some(baseline) = open.remove(&key) {
                    *points.entry(key.0).or_default() += action.goals_at_action - baseline;
                }
            }
        }
    }

    for ((team, player), baseline) in open {
        let goals = current_goals.get(player).copied().unwrap_or(baseline);
        *points.entry(team).or_default() += goals - baseline;
    }

    let mut rows: Vec<StandingRow> = teams
        .iter()
        .map(|team| StandingRow {
            rank: 0,
            team_id: team.team_id.clone(),
            team_name: team.name.clone(),
            points: points.get(team.team_id.as_str()).copied().unwrap_or(0),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| a.team_name.cmp(&b.team_name))
    });

    let mut previous: Option<(i64, usize)> = None;
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = match previous {
            Some((points, rank)) if points == row.points => rank,
            _ => i + 1,
        };
        previous = Some((row.points, row.rank));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn team(id: &str, name: &str) -> FantasyTeam {
        FantasyTeam {
            league_id: "mls".into(),
            team_id: id.into(),
            name: name.into(),
            owner: format!("{id}-owner"),
        }
    }

    fn player(id: &str, goals: i64) -> Player {
        Player {
            player_id: id.into(),
            name: id.to_uppercase(),
            club: "LAFC".into(),
            position: "F".into(),
            ranking: 0,
            goals,
        }
    }

    fn pick(n: u32, player: &str, team: &str) -> DraftPick {
        DraftPick {
            pick_number: n,
            player_id: player.into(),
            team_drafted_by: team.into(),
            draft_time: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    fn action(team: &str, kind: TransferActionType, player: &str, goals: i64) -> TransferAction {
        TransferAction {
            fantasy_team_id: team.into(),
            action_type: kind,
            player_id: player.into(),
            player_name: player.to_uppercase(),
            action_date: Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap(),
            goals_at_action: goals,
            transfer_round: 1,
        }
    }

    #[test]
    fn drafted_players_score_all_their_goals() {
        let teams = vec![team("a", "Alpha"), team("b", "Bravo")];
        let picks = vec![pick(1, "p1", "a"), pick(2, "p2", "b")];
        let players = vec![player("p1", 7), player("p2", 11)];
        let table = compute_standings(&teams, &picks, &[], &players);
        assert_eq!(table[0].team_id, "b");
        assert_eq!(table[0].points, 11);
        assert_eq!(table[1].points, 7);
        assert_eq!(table[1].rank, 2);
    }

    #[test]
    fn transfers_split_a_players_goals_between_stints() {
        let teams = vec![team("a", "Alpha"), team("b", "Bravo")];
        let picks = vec![pick(1, "p1", "a")];
        let actions = vec![
            action("a", TransferActionType::Drop, "p1", 5),
            action("a", TransferActionType::Pickup, "p3", 2),
            action("b", TransferActionType::Pickup, "p1", 5),
        ];
        let players = vec![player("p1", 9), player("p3", 6)];
        let table = compute_standings(&teams, &picks, &actions, &players);
        let alpha = table.iter().find(|r| r.team_id == "a").unwrap();
        let bravo = table.iter().find(|r| r.team_id == "b").unwrap();
        assert_eq!(alpha.points, 5 + 4);
        assert_eq!(bravo.points, 4);
    }

    #[test]
    fn tied_teams_share_a_rank() {
        let teams = vec![team("a", "Alpha"), team("b", "Bravo"), team("c", "Charlie")];
        let table = compute_standings(&teams, &[], &[], &[]);
        assert!(table.iter().all(|r| r.rank == 1 && r.points == 0));
        assert_eq!(table[0].team_name, "Alpha");
    }
}
