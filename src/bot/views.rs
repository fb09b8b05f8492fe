//! Message builders for every reply the bot sends.

use crate::bot::callback::CallbackToken;
use crate::bot::callback::MenuAction;
use crate::entity::RecipientSubscription;
use crate::notifier::Menu;
use crate::notifier::MenuButton;
use crate::notifier::OutgoingMessage;
use crate::service::fight_menu::FightChoice;
use crate::service::subscription_service::SubscribeResult;
use crate::service::subscription_service::UnsubscribeResult;

pub fn main_menu() -> OutgoingMessage {
    OutgoingMessage::text("Welcome! What would you like to do?").with_menu(Menu::single_column([
        action_button("📅 Subscribe to a fight", MenuAction::Subscribe),
        action_button("👀 My fights", MenuAction::View),
        action_button("❌ Remove a fight", MenuAction::Remove),
    ]))
}

pub fn unknown_command() -> OutgoingMessage {
    OutgoingMessage::text("❌ Unknown command. Try /start")
}

pub fn unknown_message() -> OutgoingMessage {
    OutgoingMessage::text(
        "🤖 I don't understand that. Use /start or see actions from the main menu.",
    )
    .with_menu(Menu::single_column([action_button(
        "Main Menu",
        MenuAction::Start,
    )]))
}

pub fn fight_selection(event_name: &str, choices: &[FightChoice]) -> OutgoingMessage {
    let buttons = choices.iter().map(|choice| {
        let token = CallbackToken::Fight(choice.clone());
        MenuButton::new(choice.label.clone(), token.to_string())
    });
    OutgoingMessage::markdown(format!(
        "Select a fight from the event: {}",
        bold(event_name)
    ))
    .with_menu(Menu::single_column(buttons))
}

pub fn subscribe_result(result: &SubscribeResult) -> OutgoingMessage {
    match result {
        SubscribeResult::Success { label } => OutgoingMessage::markdown(format!(
            "✅ Subscribed to the fight: {}",
            bold(label)
        )),
        SubscribeResult::AlreadyOver => OutgoingMessage::text("❌ This fight is already over."),
        SubscribeResult::AboutToStart => {
            OutgoingMessage::text("🚨 The Fight is already about to start!")
        }
        SubscribeResult::InProgress => {
            OutgoingMessage::text("🔥 The fight is happening right now!")
        }
    }
}

pub fn subscriptions_list(subs: &[RecipientSubscription]) -> OutgoingMessage {
    if subs.is_empty() {
        return no_subscriptions();
    }
    let lines: Vec<String> = subs
        .iter()
        .map(|s| format!("- {} at {}\n", s.label, s.start_time.format("%d %b")))
        .collect();
    OutgoingMessage::text(format!(
        "📌 Your current fight subscriptions:\n{}",
        lines.concat()
    ))
}

pub fn remove_menu(subs: &[RecipientSubscription]) -> OutgoingMessage {
    if subs.is_empty() {
        return OutgoingMessage::text("You have no active subscriptions to remove.");
    }
    let buttons = subs.iter().map(|s| {
        let token = CallbackToken::Remove {
            label: s.label.clone(),
        };
        MenuButton::new(
            format!("❌ {} ({})", s.label, s.start_time.format("%b %-d")),
            token.to_string(),
        )
    });
    let menu = Menu::single_column(buttons)
        .push_row(vec![action_button("🔙 Cancel", MenuAction::Start)]);
    OutgoingMessage::text("Select a subscription to remove:").with_menu(menu)
}

pub fn unsubscribe_result(result: &UnsubscribeResult) -> OutgoingMessage {
    match result {
        UnsubscribeResult::Success { .. } => {
            OutgoingMessage::text("✅ Subscription removed successfully!")
        }
        UnsubscribeResult::NoneSubscribed { label } => {
            OutgoingMessage::text(format!("You are not subscribed to {label}."))
        }
    }
}

pub fn no_subscriptions() -> OutgoingMessage {
    OutgoingMessage::text("You have no active subscriptions.")
}

/// Generic reply when an action could not be completed.
pub fn failure(action: &str) -> OutgoingMessage {
    OutgoingMessage::text(format!("❌ Failed to {action}. Please try again later."))
}

fn action_button(text: &str, action: MenuAction) -> MenuButton {
    MenuButton::new(text, CallbackToken::Action(action).to_string())
}

/// Renders `text` bold in legacy Markdown.
///
/// Entities cannot contain escapes there, so text with markup characters is
/// escaped and left plain instead.
fn bold(text: &str) -> String {
    if text.contains(MARKDOWN_SPECIAL) {
        escape_markdown(text)
    } else {
        format!("*{text}*")
    }
}

const MARKDOWN_SPECIAL: [char; 4] = ['_', '*', '`', '['];

/// Escapes characters with meaning in Telegram's legacy Markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;

    fn sub(label: &str, day: u32) -> RecipientSubscription {
        RecipientSubscription {
            label: label.to_string(),
            start_time: Utc.with_ymd_and_hms(2025, 1, day, 3, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_main_menu_buttons() {
        let msg = main_menu();
        let tokens: Vec<&str> = msg
            .menu
            .as_ref()
            .unwrap()
            .buttons()
            .map(|b| b.token.as_str())
            .collect();
        assert_eq!(tokens, ["action_subscribe", "action_view", "action_remove"]);
    }

    #[test]
    fn test_subscriptions_list_format() {
        let msg = subscriptions_list(&[sub("A vs B", 2), sub("C vs D", 12)]);
        assert_eq!(
            msg.text,
            "📌 Your current fight subscriptions:\n- A vs B at 02 Jan\n- C vs D at 12 Jan\n"
        );
        assert_eq!(
            subscriptions_list(&[]).text,
            "You have no active subscriptions."
        );
    }

    #[test]
    fn test_remove_menu_has_cancel_row() {
        let msg = remove_menu(&[sub("A vs B", 2)]);
        assert_eq!(msg.text, "Select a subscription to remove:");
        let menu = msg.menu.unwrap();
        assert_eq!(menu.rows.len(), 2);
        assert_eq!(menu.rows[0][0].text, "❌ A vs B (Jan 2)");
        assert_eq!(menu.rows[0][0].token, "remove|A vs B");
        assert_eq!(menu.rows[1][0].text, "🔙 Cancel");
        assert_eq!(menu.rows[1][0].token, "action_start");
    }

    #[test]
    fn test_remove_menu_without_subscriptions() {
        let msg = remove_menu(&[]);
        assert_eq!(msg.text, "You have no active subscriptions to remove.");
        assert!(msg.menu.is_none());
    }

    #[test]
    fn test_markup_in_names_is_not_bolded() {
        let msg = subscribe_result(&SubscribeResult::Success {
            label: "Jon_Jones vs *Stipe*".to_string(),
        });
        assert_eq!(
            msg.text,
            "✅ Subscribed to the fight: Jon\\_Jones vs \\*Stipe\\*"
        );

        let msg = fight_selection("UFC 313", &[]);
        assert_eq!(msg.text, "Select a fight from the event: *UFC 313*");
        let msg = fight_selection("UFC_313", &[]);
        assert_eq!(msg.text, "Select a fight from the event: UFC\\_313");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("UFC_300 *main*"), "UFC\\_300 \\*main\\*");
        assert_eq!(escape_markdown("UFC 300"), "UFC 300");
    }
}
