//! Callback tokens carried by menu buttons.
//!
//! Wire format, `|`-delimited:
//! - `{event_id}|{fight_id}|{label}`: a fight was selected
//! - `remove|{label}`: a subscription should be removed
//! - `action_start`, `action_subscribe`, `action_view`, `action_remove`: main menu

use std::fmt;
use std::str::FromStr;

use crate::bot::error::BotError;
use crate::service::fight_menu::FightChoice;

pub const DELIMITER: char = '|';
/// Telegram rejects callback data longer than this.
pub const MAX_TOKEN_BYTES: usize = 64;
const REMOVE_PREFIX: &str = "remove";
/// Longest label that still fits in a `remove|{label}` token.
pub const MAX_LABEL_BYTES: usize = MAX_TOKEN_BYTES - REMOVE_PREFIX.len() - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Start,
    Subscribe,
    View,
    Remove,
}

impl MenuAction {
    pub fn as_token(&self) -> &'static str {
        match self {
            MenuAction::Start => "action_start",
            MenuAction::Subscribe => "action_subscribe",
            MenuAction::View => "action_view",
            MenuAction::Remove => "action_remove",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "action_start" => Some(MenuAction::Start),
            "action_subscribe" => Some(MenuAction::Subscribe),
            "action_view" => Some(MenuAction::View),
            "action_remove" => Some(MenuAction::Remove),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackToken {
    Action(MenuAction),
    Remove { label: String },
    Fight(FightChoice),
}

impl FromStr for CallbackToken {
    type Err = BotError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        if let Some(action) = MenuAction::from_token(data) {
            return Ok(CallbackToken::Action(action));
        }

        let malformed = || BotError::MalformedCallback {
            data: data.to_string(),
        };
        let fields: Vec<&str> = data.split(DELIMITER).collect();
        if fields.iter().any(|f| f.is_empty()) {
            return Err(malformed());
        }

        match fields.as_slice() {
            [REMOVE_PREFIX, label] => Ok(CallbackToken::Remove {
                label: label.to_string(),
            }),
            [REMOVE_PREFIX, ..] => Err(malformed()),
            [event_id, fight_id, label] => Ok(CallbackToken::Fight(FightChoice {
                event_id: event_id.to_string(),
                fight_id: fight_id.to_string(),
                label: label.to_string(),
            })),
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackToken::Action(action) => f.write_str(action.as_token()),
            CallbackToken::Remove { label } => {
                write!(f, "{REMOVE_PREFIX}{DELIMITER}{}", normalize_label(label, 0))
            }
            CallbackToken::Fight(choice) => {
                let prefix = format!(
                    "{}{DELIMITER}{}{DELIMITER}",
                    choice.event_id, choice.fight_id
                );
                write!(f, "{prefix}{}", normalize_label(&choice.label, prefix.len()))
            }
        }
    }
}

/// Makes `label` safe to embed in a token after `prefix_len` bytes.
///
/// The delimiter is replaced with `/` and the label is cut on a char
/// boundary to [`MAX_LABEL_BYTES`] or to what is left of the token.
pub fn normalize_label(label: &str, prefix_len: usize) -> String {
    let sanitized = label.replace(DELIMITER, "/");
    let limit = MAX_LABEL_BYTES.min(MAX_TOKEN_BYTES.saturating_sub(prefix_len));
    truncate_on_char_boundary(&sanitized, limit).trim_end().to_string()
}

fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
