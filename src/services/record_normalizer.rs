// Converts DynamoDB-style typed attribute items into players. Nothing past
// this module sees the attribute encoding.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::dto::player_dto::Player;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    L(Vec<AttributeValue>),
    M(HashMap<String, AttributeValue>),
}

pub type Item = HashMap<String, AttributeValue>;

/// Body of a player import: a scan result as exported by DynamoDB.
#[derive(Debug, Deserialize)]
pub struct ItemBatch {
    #[serde(rename = "Items")]
    pub items: Vec<Item>,
}

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("item {index}: missing attribute {attribute}")]
    Missing { index: usize, attribute: &'static str },

    #[error("item {index}: attribute {attribute} has the wrong type")]
    WrongType { index: usize, attribute: &'static str },

    #[error("item {index}: attribute {attribute} is not a whole number: {value}")]
    NotANumber {
        index: usize,
        attribute: &'static str,
        value: String,
    },
}

fn text(item: &Item, index: usize, names: &[&'static str]) -> Result<Option<String>, NormalizeError> {
    for &name in names {
        match item.get(name) {
            None | Some(AttributeValue::Null(_)) => continue,
            Some(AttributeValue::S(s)) => return Ok(Some(s.trim().to_string())),
            Some(AttributeValue::N(n)) => return Ok(Some(n.trim().to_string())),
            Some(_) => {
                return Err(NormalizeError::WrongType {
                    index,
                    attribute: name,
                })
            }
        }
    }
    Ok(None)
}

fn number(item: &Item, index: usize, names: &[&'static str]) -> Result<Option<i64>, NormalizeError> {
    for &name in names {
        let raw = match item.get(name) {
            None | Some(AttributeValue::Null(_)) => continue,
            Some(AttributeValue::N(n)) | Some(AttributeValue::S(n)) => n.trim(),
            Some(_) => {
                return Err(NormalizeError::WrongType {
                    index,
                    attribute: name,
                })
            }
        };
        return raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| NormalizeError::NotANumber {
                index,
                attribute: name,
                value: raw.to_string(),
            });
    }
    Ok(None)
}

/// `player_id` and `name` (or `player_name`) are required. `ranking` falls
/// back to `prior_goals`, and both numbers default to zero.
pub fn player_from_item(item: &Item, index: usize) -> Result<Player, NormalizeError> {
    let player_id = text(item, index, &["player_id"])?
        .filter(|id| !id.is_empty())
        .ok_or(NormalizeError::Missing {
            index,
            attribute: "player_id",
        })?;
    let name = text(item, index, &["name", "player_name"])?.ok_or(NormalizeError::Missing {
        index,
        attribute: "name",
    })?;

    Ok(Player {
        player_id,
        name,
        club: text(item, index, &["club", "team"])?.unwrap_or_default(),
        position: text(item, index, &["position"])?.unwrap_or_default(),
        ranking: number(item, index, &["ranking", "prior_goals"])?.unwrap_or(0),
        goals: number(item, index, &["goals"])?.unwrap_or(0),
    })
}

pub fn players_from_items(items: &[Item]) -> Result<Vec<Player>, NormalizeError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| player_from_item(item, index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(json: &str) -> Vec<Item> {
        serde_json::from_str::<ItemBatch>(json).unwrap().items
    }

    #[test]
    fn reads_a_scan_export() {
        let items = batch(
            r#"{"Items": [
                {"player_id": {"S": "p-9"}, "player_name": {"S": " Denis Bouanga "},
                 "club": {"S": "LAFC"}, "position": {"S": "F"},
                 "prior_goals": {"N": "20"}, "goals": {"N": "4"}},
                {"player_id": {"N": "12"}, "name": {"S": "Cucho"}, "goals": {"NULL": true}}
            ]}"#,
        );
        let players = players_from_items(&items).unwrap();
        assert_eq!(players[0].player_id, "p-9");
        assert_eq!(players[0].name, "Denis Bouanga");
        assert_eq!(players[0].ranking, 20);
        assert_eq!(players[0].goals, 4);
        assert_eq!(players[1].player_id, "12");
        assert_eq!(players[1].club, "");
        assert_eq!(players[1].goals, 0);
    }

    #[test]
    fn missing_name_is_reported_with_its_index() {
        let items = batch(r#"{"Items": [{"player_id": {"S": "a"}, "name": {"S": "A"}}, {"player_id": {"S": "b"}}]}"#);
        assert_eq!(
            players_from_items(&items),
            Err(NormalizeError::Missing {
                index: 1,
                attribute: "name"
            })
        );
    }

    #[test]
    fn rejects_mistyped_attributes() {
        let items = batch(r#"{"Items": [{"player_id": {"S": "a"}, "name": {"L": []}}]}"#);
        assert!(matches!(
            players_from_items(&items),
            Err(NormalizeError::WrongType { attribute: "name", .. })
        ));

        let items = batch(r#"{"Items": [{"player_id": {"S": "a"}, "name": {"S": "A"}, "goals": {"N": "1.5"}}]}"#);
        assert!(matches!(
            players_from_items(&items),
            Err(NormalizeError::NotANumber { attribute: "goals", .. })
        ));
    }
}
