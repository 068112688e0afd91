//! Dice roll summaries and the adjective ladder
//!
//! Stateless helpers applied to chat records on the consumer surface. Fudge
//! dice faces are -1, 0 and +1; totals map onto the adjective ladder.

use serde::Serialize;

use crate::protocol::records::{ChatRecord, RollRecord};

/// A parsed view of one roll on a chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Die faces rendered as `+`, `-` and `0`.
    pub faces: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Ladder label for a value, if the value is on the ladder.
pub fn ladder_label(value: i64) -> Option<&'static str> {
    Some(match value {
        8 => "Legendary",
        7 => "Epic",
        6 => "Fantastic",
        5 => "Superb",
        4 => "Great",
        3 => "Good",
        2 => "Fair",
        1 => "Average",
        0 => "Mediocre",
        -1 => "Poor",
        -2 => "Terrible",
        _ => return None,
    })
}

/// Human label for any value: the ladder name, or the signed number when the
/// value falls off the ladder.
pub fn describe(value: i64) -> String {
    match ladder_label(value) {
        Some(label) => label.to_owned(),
        None => format!("{value:+}"),
    }
}

/// Summarize the rolls attached to a chat record.
pub fn parse_rolls(record: &ChatRecord) -> Vec<RollSummary> {
    record.rolls.iter().map(summarize).collect()
}

fn summarize(roll: &RollRecord) -> RollSummary {
    let total = roll.total.map(|t| t.round() as i64);
    RollSummary {
        formula: roll.formula.clone(),
        faces: face_symbols(&roll.dice),
        total,
        label: total.and_then(|t| ladder_label(t).map(str::to_owned)),
    }
}

fn face_symbols(dice: &[i32]) -> String {
    dice.iter()
        .map(|d| match d.signum() {
            1 => '+',
            -1 => '-',
            _ => '0',
        })
        .collect()
}
