use std::collections::HashMap;
use std::fmt;

use enumset::{enum_set, EnumSet, EnumSetType};
use thiserror::Error;

/// Closed set of object types a household problem can declare.
#[derive(EnumSetType, Debug, Hash, PartialOrd, Ord)]
pub enum Kind {
    Person,
    Bedroom,
    LivingRoom,
    Kitchen,
    Table,
    Shelf,
    Tv,
    Light,
    Window,
    Sink,
    Fridge,
    Book,
    Pen,
    Food,
    Kitchenware,
    Phone,
    Channel,
    Level,
}

impl Kind {
    pub const ROOMS: EnumSet<Kind> = enum_set!(Kind::Bedroom | Kind::LivingRoom | Kind::Kitchen);
    pub const FIXTURES: EnumSet<Kind> = enum_set!(
        Kind::Table | Kind::Shelf | Kind::Tv | Kind::Light | Kind::Window | Kind::Sink | Kind::Fridge
    );
    pub const ITEMS: EnumSet<Kind> =
        enum_set!(Kind::Book | Kind::Pen | Kind::Food | Kind::Kitchenware | Kind::Phone);

    pub fn name(self) -> &'static str {
        match self {
            Kind::Person => "person",
            Kind::Bedroom => "bedroom",
            Kind::LivingRoom => "livingroom",
            Kind::Kitchen => "kitchen",
            Kind::Table => "table",
            Kind::Shelf => "shelf",
            Kind::Tv => "tv",
            Kind::Light => "light",
            Kind::Window => "window",
            Kind::Sink => "sink",
            Kind::Fridge => "fridge",
            Kind::Book => "book",
            Kind::Pen => "pen",
            Kind::Food => "food",
            Kind::Kitchenware => "kitchenware",
            Kind::Phone => "phone",
            Kind::Channel => "channel",
            Kind::Level => "level",
        }
    }

    pub fn from_name(name: &str) -> Option<Kind> {
        EnumSet::<Kind>::all().iter().find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// Item kinds a container of this kind accepts. Empty for non-containers.
    pub fn holds(self) -> EnumSet<Kind> {
        match self {
            Kind::Table | Kind::Shelf => Kind::ITEMS,
            Kind::Sink => enum_set!(Kind::Kitchenware),
            Kind::Fridge => enum_set!(Kind::Food),
            _ => EnumSet::empty(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Renders a set of kinds as `a|b|c`, used in type errors.
pub fn kinds_to_string(kinds: EnumSet<Kind>) -> String {
    kinds.iter().map(Kind::name).collect::<Vec<_>>().join("|")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("object '{name}' is already declared as {previous}")]
pub struct Redeclared {
    pub name: String,
    pub previous: Kind,
}

/// Typed entity table. Ids are handed out in declaration order, which is also
/// the order actions get grounded in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
    entities: Vec<Entity>,
    index: HashMap<String, EntityId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, kind: Kind) -> Result<EntityId, Redeclared> {
        if let Some(id) = self.index.get(name) {
            return Err(Redeclared { name: name.to_owned(), previous: self.kind(*id) });
        }
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Entity { name: name.to_owned(), kind });
        self.index.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        self.index.get(name).copied()
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub fn kind(&self, id: EntityId) -> Kind {
        self.entities[id.index()].kind
    }

    pub fn name(&self, id: EntityId) -> &str {
        &self.entities[id.index()].name
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.entities.iter().enumerate().map(|(i, e)| (EntityId(i as u32), e))
    }

    pub fn of_kinds(&self, kinds: EnumSet<Kind>) -> impl Iterator<Item = EntityId> + '_ {
        self.iter().filter(move |(_, e)| kinds.contains(e.kind)).map(|(id, _)| id)
    }

    pub fn of_kind(&self, kind: Kind) -> impl Iterator<Item = EntityId> + '_ {
        self.of_kinds(EnumSet::only(kind))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
