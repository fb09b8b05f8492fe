//! Fight selection menu built from concurrent fighter-name lookups.

use std::sync::Arc;

use log::debug;
use log::warn;
use tokio::task::JoinSet;

use crate::source::Event;
use crate::source::Fight;
use crate::source::StatusSource;

/// Label of a fight listing fewer than two participants.
pub const UNKNOWN_FIGHT_LABEL: &str = "Unknown Fight";
/// Label of a fight whose participant names could not be resolved.
pub const FALLBACK_FIGHT_LABEL: &str = "Fight";

/// One selectable fight of an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FightChoice {
    pub event_id: String,
    pub fight_id: String,
    pub label: String,
}

/// Labels for `fights`, in the same order as `fights`.
///
/// Spawns two name lookups per fight with at least two participants and
/// waits for all of them. Lookups finish in any order; each result is put
/// back at its fight's index.
pub async fn fight_labels(source: Arc<dyn StatusSource>, fights: &[Fight]) -> Vec<String> {
    let mut lookups = JoinSet::new();
    // `None` marks a fight with too few participants to look up.
    let mut slots: Vec<Option<[Option<String>; 2]>> = Vec::with_capacity(fights.len());

    for (index, fight) in fights.iter().enumerate() {
        let locators = fight.participant_locators();
        if locators.len() < 2 {
            debug!(
                "Fight {} has {} participant(s), skipping lookup.",
                fight.id,
                locators.len()
            );
            slots.push(None);
            continue;
        }
        slots.push(Some([None, None]));

        for (side, locator) in locators.into_iter().take(2).enumerate() {
            let source = source.clone();
            let locator = locator.to_string();
            lookups.spawn(async move {
                let name = source.resolve_fighter_name(&locator).await;
                (index, side, locator, name)
            });
        }
    }

    while let Some(joined) = lookups.join_next().await {
        match joined {
            Ok((index, side, _, Ok(name))) => {
                if let Some(Some(names)) = slots.get_mut(index) {
                    names[side] = Some(name);
                }
            }
            Ok((_, _, locator, Err(e))) => {
                warn!("Failed to resolve fighter name from {locator}: {e}");
            }
            Err(e) => {
                warn!("Fighter name lookup task failed: {e}");
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| match slot {
            None => UNKNOWN_FIGHT_LABEL.to_string(),
            Some([Some(a), Some(b)]) => format!("{a} vs {b}"),
            Some(_) => FALLBACK_FIGHT_LABEL.to_string(),
        })
        .collect()
}

/// Selectable fights of `event`, in display order (reverse of the event's order).
pub async fn build_fight_menu(source: Arc<dyn StatusSource>, event: &Event) -> Vec<FightChoice> {
    let labels = fight_labels(source, &event.fights).await;

    let mut choices: Vec<FightChoice> = event
        .fights
        .iter()
        .zip(labels)
        .map(|(fight, label)| FightChoice {
            event_id: event.id.clone(),
            fight_id: fight.id.clone(),
            label,
        })
        .collect();
    choices.reverse();
    choices
}
