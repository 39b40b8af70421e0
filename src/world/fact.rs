use std::fmt;

use enumset::{enum_set, EnumSet};
use thiserror::Error;

use super::entity::{kinds_to_string, EntityId, Kind, Registry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Predicate {
    InBedroom,
    InLivingroom,
    InKitchen,
    ShelfHasLevel,
    TableContains,
    ShelfContains,
    SinkContains,
    FridgeContains,
    InHand,
    HandEmpty,
    LightOn,
    TvOn,
    TvPlayingChannel,
    WindowOpen,
    FaucetOn,
    IsRinging,
}

const LIVING_FIXTURES: EnumSet<Kind> = enum_set!(Kind::Table | Kind::Shelf | Kind::Tv | Kind::Window | Kind::Light);
const KITCHEN_FIXTURES: EnumSet<Kind> = enum_set!(Kind::Fridge | Kind::Sink | Kind::Light);

static IN_BEDROOM: [EnumSet<Kind>; 2] = [enum_set!(Kind::Bedroom), LIVING_FIXTURES];
static IN_LIVINGROOM: [EnumSet<Kind>; 2] = [enum_set!(Kind::LivingRoom), LIVING_FIXTURES];
static IN_KITCHEN: [EnumSet<Kind>; 2] = [enum_set!(Kind::Kitchen), KITCHEN_FIXTURES];
static SHELF_HAS_LEVEL: [EnumSet<Kind>; 2] = [enum_set!(Kind::Shelf), enum_set!(Kind::Level)];
static TABLE_CONTAINS: [EnumSet<Kind>; 2] = [enum_set!(Kind::Table), Kind::ITEMS];
static SHELF_CONTAINS: [EnumSet<Kind>; 3] = [enum_set!(Kind::Shelf), Kind::ITEMS, enum_set!(Kind::Level)];
static SINK_CONTAINS: [EnumSet<Kind>; 2] = [enum_set!(Kind::Sink), enum_set!(Kind::Kitchenware)];
static FRIDGE_CONTAINS: [EnumSet<Kind>; 2] = [enum_set!(Kind::Fridge), enum_set!(Kind::Food)];
static IN_HAND: [EnumSet<Kind>; 2] = [enum_set!(Kind::Person), Kind::ITEMS];
static HAND_EMPTY: [EnumSet<Kind>; 1] = [enum_set!(Kind::Person)];
static LIGHT: [EnumSet<Kind>; 1] = [enum_set!(Kind::Light)];
static TV: [EnumSet<Kind>; 1] = [enum_set!(Kind::Tv)];
static TV_CHANNEL: [EnumSet<Kind>; 2] = [enum_set!(Kind::Tv), enum_set!(Kind::Channel)];
static WINDOW: [EnumSet<Kind>; 1] = [enum_set!(Kind::Window)];
static SINK: [EnumSet<Kind>; 1] = [enum_set!(Kind::Sink)];
static PHONE: [EnumSet<Kind>; 1] = [enum_set!(Kind::Phone)];

impl Predicate {
    pub const ALL: [Predicate; 16] = [
        Predicate::InBedroom,
        Predicate::InLivingroom,
        Predicate::InKitchen,
        Predicate::ShelfHasLevel,
        Predicate::TableContains,
        Predicate::ShelfContains,
        Predicate::SinkContains,
        Predicate::FridgeContains,
        Predicate::InHand,
        Predicate::HandEmpty,
        Predicate::LightOn,
        Predicate::TvOn,
        Predicate::TvPlayingChannel,
        Predicate::WindowOpen,
        Predicate::FaucetOn,
        Predicate::IsRinging,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Predicate::InBedroom => "in-bedroom",
            Predicate::InLivingroom => "in-livingroom",
            Predicate::InKitchen => "in-kitchen",
            Predicate::ShelfHasLevel => "shelf-has-level",
            Predicate::TableContains => "table-contains",
            Predicate::ShelfContains => "shelf-contains",
            Predicate::SinkContains => "sink-contains",
            Predicate::FridgeContains => "fridge-contains",
            Predicate::InHand => "in-hand",
            Predicate::HandEmpty => "hand-empty",
            Predicate::LightOn => "light-on",
            Predicate::TvOn => "tv-on",
            Predicate::TvPlayingChannel => "tv-playing-channel",
            Predicate::WindowOpen => "window-open",
            Predicate::FaucetOn => "faucet-on",
            Predicate::IsRinging => "is-ringing",
        }
    }

    /// Also accepts `phone-ringing`, the spelling snapshot generators write
    /// into `:init`.
    pub fn from_name(name: &str) -> Option<Predicate> {
        if name.eq_ignore_ascii_case("phone-ringing") {
            return Some(Predicate::IsRinging);
        }
        Self::ALL.iter().copied().find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Accepted kinds for each argument position.
    pub fn signature(self) -> &'static [EnumSet<Kind>] {
        match self {
            Predicate::InBedroom => &IN_BEDROOM,
            Predicate::InLivingroom => &IN_LIVINGROOM,
            Predicate::InKitchen => &IN_KITCHEN,
            Predicate::ShelfHasLevel => &SHELF_HAS_LEVEL,
            Predicate::TableContains => &TABLE_CONTAINS,
            Predicate::ShelfContains => &SHELF_CONTAINS,
            Predicate::SinkContains => &SINK_CONTAINS,
            Predicate::FridgeContains => &FRIDGE_CONTAINS,
            Predicate::InHand => &IN_HAND,
            Predicate::HandEmpty => &HAND_EMPTY,
            Predicate::LightOn => &LIGHT,
            Predicate::TvOn => &TV,
            Predicate::TvPlayingChannel => &TV_CHANNEL,
            Predicate::WindowOpen => &WINDOW,
            Predicate::FaucetOn => &SINK,
            Predicate::IsRinging => &PHONE,
        }
    }

    pub fn arity(self) -> usize {
        self.signature().len()
    }

    /// Location and shelf structure never change once a problem is loaded.
    pub fn is_static(self) -> bool {
        matches!(
            self,
            Predicate::InBedroom | Predicate::InLivingroom | Predicate::InKitchen | Predicate::ShelfHasLevel
        )
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactError {
    #[error("{predicate} takes {expected} argument(s), got {found}")]
    Arity { predicate: Predicate, expected: usize, found: usize },
    #[error("argument {position} of {predicate} is '{entity}' of type {kind}, expected {expected}")]
    WrongKind { predicate: Predicate, position: usize, entity: String, kind: Kind, expected: String },
}

/// A ground relation instance. Argument order follows the problem files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Fact {
    InBedroom { room: EntityId, fixture: EntityId },
    InLivingroom { room: EntityId, fixture: EntityId },
    InKitchen { room: EntityId, fixture: EntityId },
    ShelfHasLevel { shelf: EntityId, level: EntityId },
    TableContains { table: EntityId, item: EntityId },
    ShelfContains { shelf: EntityId, item: EntityId, level: EntityId },
    SinkContains { sink: EntityId, item: EntityId },
    FridgeContains { fridge: EntityId, item: EntityId },
    InHand { person: EntityId, item: EntityId },
    HandEmpty { person: EntityId },
    LightOn { light: EntityId },
    TvOn { tv: EntityId },
    TvPlayingChannel { tv: EntityId, channel: EntityId },
    WindowOpen { window: EntityId },
    FaucetOn { sink: EntityId },
    IsRinging { phone: EntityId },
}

impl Fact {
    pub fn new(predicate: Predicate, args: &[EntityId], registry: &Registry) -> Result<Fact, FactError> {
        let signature = predicate.signature();
        if args.len() != signature.len() {
            return Err(FactError::Arity { predicate, expected: signature.len(), found: args.len() });
        }
        for (position, (id, expected)) in args.iter().zip(signature).enumerate() {
            let kind = registry.kind(*id);
            if !expected.contains(kind) {
                return Err(FactError::WrongKind {
                    predicate,
                    position: position + 1,
                    entity: registry.name(*id).to_owned(),
                    kind,
                    expected: kinds_to_string(*expected),
                });
            }
        }
        let a = |i: usize| args[i];
        Ok(match predicate {
            Predicate::InBedroom => Fact::InBedroom { room: a(0), fixture: a(1) },
            Predicate::InLivingroom => Fact::InLivingroom { room: a(0), fixture: a(1) },
            Predicate::InKitchen => Fact::InKitchen { room: a(0), fixture: a(1) },
            Predicate::ShelfHasLevel => Fact::ShelfHasLevel { shelf: a(0), level: a(1) },
            Predicate::TableContains => Fact::TableContains { table: a(0), item: a(1) },
            Predicate::ShelfContains => Fact::ShelfContains { shelf: a(0), item: a(1), level: a(2) },
            Predicate::SinkContains => Fact::SinkContains { sink: a(0), item: a(1) },
            Predicate::FridgeContains => Fact::FridgeContains { fridge: a(0), item: a(1) },
            Predicate::InHand => Fact::InHand { person: a(0), item: a(1) },
            Predicate::HandEmpty => Fact::HandEmpty { person: a(0) },
            Predicate::LightOn => Fact::LightOn { light: a(0) },
            Predicate::TvOn => Fact::TvOn { tv: a(0) },
            Predicate::TvPlayingChannel => Fact::TvPlayingChannel { tv: a(0), channel: a(1) },
            Predicate::WindowOpen => Fact::WindowOpen { window: a(0) },
            Predicate::FaucetOn => Fact::FaucetOn { sink: a(0) },
            Predicate::IsRinging => Fact::IsRinging { phone: a(0) },
        })
    }

    pub fn predicate(&self) -> Predicate {
        match self {
            Fact::InBedroom { .. } => Predicate::InBedroom,
            Fact::InLivingroom { .. } => Predicate::InLivingroom,
            Fact::InKitchen { .. } => Predicate::InKitchen,
            Fact::ShelfHasLevel { .. } => Predicate::ShelfHasLevel,
            Fact::TableContains { .. } => Predicate::TableContains,
            Fact::ShelfContains { .. } => Predicate::ShelfContains,
            Fact::SinkContains { .. } => Predicate::SinkContains,
            Fact::FridgeContains { .. } => Predicate::FridgeContains,
            Fact::InHand { .. } => Predicate::InHand,
            Fact::HandEmpty { .. } => Predicate::HandEmpty,
            Fact::LightOn { .. } => Predicate::LightOn,
            Fact::TvOn { .. } => Predicate::TvOn,
            Fact::TvPlayingChannel { .. } => Predicate::TvPlayingChannel,
            Fact::WindowOpen { .. } => Predicate::WindowOpen,
            Fact::FaucetOn { .. } => Predicate::FaucetOn,
            Fact::IsRinging { .. } => Predicate::IsRinging,
        }
    }

    pub fn args(&self) -> Vec<EntityId> {
        match *self {
            Fact::InBedroom { room, fixture }
            | Fact::InLivingroom { room, fixture }
            | Fact::InKitchen { room, fixture } => vec![room, fixture],
            Fact::ShelfHasLevel { shelf, level } => vec![shelf, level],
            Fact::TableContains { table, item } => vec![table, item],
            Fact::ShelfContains { shelf, item, level } => vec![shelf, item, level],
            Fact::SinkContains { sink, item } => vec![sink, item],
            Fact::FridgeContains { fridge, item } => vec![fridge, item],
            Fact::InHand { person, item } => vec![person, item],
            Fact::HandEmpty { person } => vec![person],
            Fact::LightOn { light } => vec![light],
            Fact::TvOn { tv } => vec![tv],
            Fact::TvPlayingChannel { tv, channel } => vec![tv, channel],
            Fact::WindowOpen { window } => vec![window],
            Fact::FaucetOn { sink } => vec![sink],
            Fact::IsRinging { phone } => vec![phone],
        }
    }

    pub fn is_static(&self) -> bool {
        self.predicate().is_static()
    }

    /// The `located-in(room, fixture)` view of the three room predicates.
    pub fn location(&self) -> Option<(EntityId, EntityId)> {
        match *self {
            Fact::InBedroom { room, fixture }
            | Fact::InLivingroom { room, fixture }
            | Fact::InKitchen { room, fixture } => Some((room, fixture)),
            _ => None,
        }
    }

    /// The item a containment fact places, counting the agent's hand as a container.
    pub fn contained_item(&self) -> Option<EntityId> {
        match *self {
            Fact::TableContains { item, .. }
            | Fact::ShelfContains { item, .. }
            | Fact::SinkContains { item, .. }
            | Fact::FridgeContains { item, .. }
            | Fact::InHand { item, .. } => Some(item),
            _ => None,
        }
    }

    pub fn display<'a>(&'a self, registry: &'a Registry) -> FactDisplay<'a> {
        FactDisplay { fact: self, registry }
    }
}

pub struct FactDisplay<'a> {
    fact: &'a Fact,
    registry: &'a Registry,
}

impl fmt::Display for FactDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.fact.predicate())?;
        for id in self.fact.args() {
            write!(f, " {}", self.registry.name(id))?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        let mut r = Registry::new();
        r.declare("me", Kind::Person).unwrap();
        r.declare("kitchen", Kind::Kitchen).unwrap();
        r.declare("kitchen-fridge", Kind::Fridge).unwrap();
        r.declare("apple", Kind::Food).unwrap();
        r.declare("red-pen", Kind::Pen).unwrap();
        r.declare("kitchen-table", Kind::Table).unwrap();
        r.declare("kitchen-light", Kind::Light).unwrap();
        r
    }

    #[test]
    fn test_new_checks_signature() {
        let r = registry();
        let fridge = r.lookup("kitchen-fridge").unwrap();
        let apple = r.lookup("apple").unwrap();
        let pen = r.lookup("red-pen").unwrap();
        assert_eq!(
            Fact::new(Predicate::FridgeContains, &[fridge, apple], &r),
            Ok(Fact::FridgeContains { fridge, item: apple })
        );
        assert!(matches!(
            Fact::new(Predicate::FridgeContains, &[fridge, pen], &r),
            Err(FactError::WrongKind { position: 2, .. })
        ));
        assert!(matches!(
            Fact::new(Predicate::HandEmpty, &[], &r),
            Err(FactError::Arity { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn test_display_and_views() {
        let r = registry();
        let kitchen = r.lookup("kitchen").unwrap();
        let fridge = r.lookup("kitchen-fridge").unwrap();
        let fact = Fact::new(Predicate::InKitchen, &[kitchen, fridge], &r).unwrap();
        assert_eq!(fact.display(&r).to_string(), "(in-kitchen kitchen kitchen-fridge)");
        assert!(fact.is_static());
        assert_eq!(fact.location(), Some((kitchen, fridge)));
        assert_eq!(fact.contained_item(), None);
        assert_eq!(Predicate::from_name("tv-playing-channel"), Some(Predicate::TvPlayingChannel));
        assert_eq!(Predicate::ShelfContains.arity(), 3);
    }

    #[test]
    fn test_room_accepts_its_fixtures() {
        let r = registry();
        let kitchen = r.lookup("kitchen").unwrap();
        let table = r.lookup("kitchen-table").unwrap();
        let light = r.lookup("kitchen-light").unwrap();
        assert!(matches!(
            Fact::new(Predicate::InKitchen, &[kitchen, table], &r),
            Err(FactError::WrongKind { position: 2, kind: Kind::Table, .. })
        ));
        assert_eq!(
            Fact::new(Predicate::InKitchen, &[kitchen, light], &r),
            Ok(Fact::InKitchen { room: kitchen, fixture: light })
        );
    }

    #[test]
    fn test_phone_ringing_alias() {
        assert_eq!(Predicate::from_name("phone-ringing"), Some(Predicate::IsRinging));
        assert_eq!(Predicate::from_name("is-ringing"), Some(Predicate::IsRinging));
        assert_eq!(Predicate::IsRinging.name(), "is-ringing");
        assert_eq!(Predicate::from_name("phone-buzzing"), None);
    }
}
