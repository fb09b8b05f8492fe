//! Outbound messaging capability used by the poller and the dispatcher.

use async_trait::async_trait;

use crate::entity::RecipientId;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum NotifyError {
    #[error("Failed to deliver message to {recipient}: {source}")]
    DeliveryFailed {
        recipient: RecipientId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Transport rejected message to {recipient}: {description}")]
    Rejected {
        recipient: RecipientId,
        description: String,
    },
}

/// A button carrying an opaque token that comes back when it is pressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuButton {
    pub text: String,
    pub token: String,
}

impl MenuButton {
    pub fn new(text: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            token: token.into(),
        }
    }
}

/// Rows of choice buttons attached to a message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Menu {
    pub rows: Vec<Vec<MenuButton>>,
}

impl Menu {
    /// A menu with one button per row.
    pub fn single_column(buttons: impl IntoIterator<Item = MenuButton>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    pub fn push_row(mut self, row: Vec<MenuButton>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &MenuButton> {
        self.rows.iter().flatten()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    /// Render `text` as Markdown.
    pub markdown: bool,
    pub menu: Option<Menu>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: true,
            menu: None,
        }
    }

    pub fn with_menu(mut self, menu: Menu) -> Self {
        self.menu = Some(menu);
        self
    }
}

/// Delivers a message to a recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: RecipientId, message: OutgoingMessage)
    -> Result<(), NotifyError>;
}
