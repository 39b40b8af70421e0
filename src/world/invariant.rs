use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use super::entity::{EntityId, Kind, Registry};
use super::fact::Fact;
use super::state::World;

/// A consistency rule of the household model was broken. Every variant carries
/// entity names so the message can be shown without the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("no person is declared, the household needs exactly one agent")]
    NoAgent,
    #[error("several persons are declared ({names}), the household needs exactly one agent")]
    SeveralAgents { names: String },
    #[error("item '{item}' is placed in more than one container ({first} and {second})")]
    DuplicateContainment { item: String, first: String, second: String },
    #[error("tv '{tv}' is playing a channel while switched off")]
    ChannelWithoutPower { tv: String },
    #[error("tv '{tv}' is switched on without playing a channel")]
    SilentTv { tv: String },
    #[error("tv '{tv}' is playing more than one channel")]
    SeveralChannels { tv: String },
    #[error("shelf '{shelf}' has no level '{level}'")]
    UndeclaredLevel { shelf: String, level: String },
    #[error("agent '{agent}' has an empty hand while holding '{item}'")]
    HandConflict { agent: String, item: String },
    #[error("agent '{agent}' holds more than one item")]
    SeveralHeld { agent: String },
    #[error("agent '{agent}' neither has an empty hand nor holds an item")]
    HandUnaccounted { agent: String },
    #[error("item '{item}' is not placed anywhere")]
    Unplaced { item: String },
    #[error("fixture '{fixture}' is located in more than one room")]
    SeveralRooms { fixture: String },
    #[error("static fact {fact} cannot change after load")]
    StaticFact { fact: String },
    #[error("fact {fact} is not a static fact")]
    NotStatic { fact: String },
}

/// Checks the static part of a world: one room per fixture, statics only.
pub(crate) fn check_statics(registry: &Registry, statics: &BTreeSet<Fact>) -> Result<(), InvariantViolation> {
    let mut rooms: HashMap<EntityId, EntityId> = HashMap::new();
    for fact in statics {
        if !fact.is_static() {
            return Err(InvariantViolation::NotStatic { fact: fact.display(registry).to_string() });
        }
        if let Some((room, fixture)) = fact.location() {
            if let Some(previous) = rooms.insert(fixture, room) {
                if previous != room {
                    return Err(InvariantViolation::SeveralRooms { fixture: registry.name(fixture).to_owned() });
                }
            }
        }
    }
    Ok(())
}

/// Checks a fluent set against the world in one pass.
///
/// With `exhaustive` unset only the mutual-exclusion rules are applied; set it
/// for complete states (loaded snapshots, action results) to also require the
/// agent's hand to be accounted for, every item to be placed and every
/// switched-on tv to play a channel.
pub(crate) fn check(world: &World, fluents: &BTreeSet<Fact>, exhaustive: bool) -> Result<(), InvariantViolation> {
    let registry = world.registry();
    let name = |id: EntityId| registry.name(id).to_owned();
    let mut placed: HashMap<EntityId, &Fact> = HashMap::new();
    let mut channels: HashMap<EntityId, usize> = HashMap::new();
    let mut held = None;
    let mut hand_empty = false;

    for fact in fluents {
        if fact.is_static() {
            return Err(InvariantViolation::StaticFact { fact: fact.display(registry).to_string() });
        }
        if let Some(item) = fact.contained_item() {
            if let Some(first) = placed.insert(item, fact) {
                return Err(InvariantViolation::DuplicateContainment {
                    item: name(item),
                    first: first.display(registry).to_string(),
                    second: fact.display(registry).to_string(),
                });
            }
        }
        match *fact {
            Fact::TvPlayingChannel { tv, .. } => {
                if !fluents.contains(&Fact::TvOn { tv }) {
                    return Err(InvariantViolation::ChannelWithoutPower { tv: name(tv) });
                }
                let count = channels.entry(tv).or_insert(0);
                *count += 1;
                if *count > 1 {
                    return Err(InvariantViolation::SeveralChannels { tv: name(tv) });
                }
            }
            Fact::ShelfContains { shelf, level, .. } => {
                if !world.has_level(shelf, level) {
                    return Err(InvariantViolation::UndeclaredLevel { shelf: name(shelf), level: name(level) });
                }
            }
            Fact::InHand { person, item } => {
                if held.replace(item).is_some() {
                    return Err(InvariantViolation::SeveralHeld { agent: name(person) });
                }
            }
            Fact::HandEmpty { .. } => hand_empty = true,
            _ => {}
        }
    }

    if exhaustive {
        if let Some(item) = registry.of_kinds(Kind::ITEMS).find(|item| !placed.contains_key(item)) {
            return Err(InvariantViolation::Unplaced { item: name(item) });
        }
        for fact in fluents {
            if let Fact::TvOn { tv } = *fact {
                if !channels.contains_key(&tv) {
                    return Err(InvariantViolation::SilentTv { tv: name(tv) });
                }
            }
        }
    }

    let agent = world.agent();
    match (hand_empty, held) {
        (true, Some(item)) => Err(InvariantViolation::HandConflict { agent: name(agent), item: name(item) }),
        (false, None) if exhaustive => Err(InvariantViolation::HandUnaccounted { agent: name(agent) }),
        _ => Ok(()),
    }
}
