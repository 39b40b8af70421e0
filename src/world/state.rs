use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::entity::{EntityId, Kind, Registry};
use super::fact::Fact;
use super::invariant::{self, InvariantViolation};

/// Everything that stays fixed for a problem: the entities, the static facts
/// and the agent. Shared between all states of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    registry: Registry,
    statics: BTreeSet<Fact>,
    agent: EntityId,
}

impl World {
    pub fn new(registry: Registry, statics: BTreeSet<Fact>) -> Result<World, InvariantViolation> {
        let persons: Vec<EntityId> = registry.of_kind(Kind::Person).collect();
        let agent = match persons.as_slice() {
            [] => return Err(InvariantViolation::NoAgent),
            [agent] => *agent,
            _ => {
                let names = persons.iter().map(|id| registry.name(*id)).collect::<Vec<_>>().join(", ");
                return Err(InvariantViolation::SeveralAgents { names });
            }
        };
        invariant::check_statics(&registry, &statics)?;
        Ok(World { registry, statics, agent })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn statics(&self) -> &BTreeSet<Fact> {
        &self.statics
    }

    pub fn agent(&self) -> EntityId {
        self.agent
    }

    pub fn has_level(&self, shelf: EntityId, level: EntityId) -> bool {
        self.statics.contains(&Fact::ShelfHasLevel { shelf, level })
    }

    pub fn levels_of(&self, shelf: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.registry.of_kind(Kind::Level).filter(move |level| self.has_level(shelf, *level))
    }

    pub fn room_of(&self, fixture: EntityId) -> Option<EntityId> {
        self.statics.iter().find_map(|fact| match fact.location() {
            Some((room, f)) if f == fixture => Some(room),
            _ => None,
        })
    }
}

/// Atomic edit: every fact in `del` is removed before `add` is inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub del: Vec<Fact>,
    pub add: Vec<Fact>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn del(mut self, fact: Fact) -> Self {
        self.del.push(fact);
        self
    }

    pub fn add(mut self, fact: Fact) -> Self {
        self.add.push(fact);
        self
    }
}

/// An immutable snapshot. Two states are equal when their full fact sets are,
/// the hash only covers the fluents since worlds of comparable states match.
#[derive(Debug, Clone)]
pub struct State {
    world: Arc<World>,
    fluents: BTreeSet<Fact>,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.world, &other.world) || self.world.statics == other.world.statics)
            && self.fluents == other.fluents
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fluents.hash(state);
    }
}

impl State {
    pub fn new(world: Arc<World>, fluents: BTreeSet<Fact>) -> Result<State, InvariantViolation> {
        invariant::check(&world, &fluents, true)?;
        Ok(State { world, fluents })
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn registry(&self) -> &Registry {
        self.world.registry()
    }

    pub fn agent(&self) -> EntityId {
        self.world.agent()
    }

    pub fn holds(&self, fact: &Fact) -> bool {
        if fact.is_static() {
            self.world.statics.contains(fact)
        } else {
            self.fluents.contains(fact)
        }
    }

    /// All true facts, statics first.
    pub fn facts(&self) -> impl Iterator<Item = &Fact> + '_ {
        self.world.statics.iter().chain(self.fluents.iter())
    }

    pub fn all_facts(&self) -> BTreeSet<Fact> {
        self.facts().copied().collect()
    }

    pub fn fluents(&self) -> &BTreeSet<Fact> {
        &self.fluents
    }

    pub fn with_fact(&self, fact: Fact) -> Result<State, InvariantViolation> {
        self.edit(fact, |fluents| fluents.insert(fact))
    }

    pub fn without_fact(&self, fact: Fact) -> Result<State, InvariantViolation> {
        self.edit(fact, |fluents| fluents.remove(&fact))
    }

    fn edit(&self, fact: Fact, f: impl FnOnce(&mut BTreeSet<Fact>) -> bool) -> Result<State, InvariantViolation> {
        if fact.is_static() {
            return Err(self.static_fact(&fact));
        }
        let mut fluents = self.fluents.clone();
        f(&mut fluents);
        invariant::check(&self.world, &fluents, false)?;
        Ok(State { world: Arc::clone(&self.world), fluents })
    }

    pub fn apply(&self, delta: &Delta) -> Result<State, InvariantViolation> {
        if let Some(fact) = delta.del.iter().chain(&delta.add).find(|f| f.is_static()) {
            return Err(self.static_fact(fact));
        }
        let mut fluents = self.fluents.clone();
        for fact in &delta.del {
            fluents.remove(fact);
        }
        fluents.extend(delta.add.iter().copied());
        invariant::check(&self.world, &fluents, true)?;
        Ok(State { world: Arc::clone(&self.world), fluents })
    }

    fn static_fact(&self, fact: &Fact) -> InvariantViolation {
        InvariantViolation::StaticFact { fact: fact.display(self.registry()).to_string() }
    }

    /// The fact placing `item`, the agent's hand included.
    pub fn placement_of(&self, item: EntityId) -> Option<&Fact> {
        self.fluents.iter().find(|fact| fact.contained_item() == Some(item))
    }

    pub fn held_item(&self) -> Option<EntityId> {
        self.fluents.iter().find_map(|fact| match *fact {
            Fact::InHand { item, .. } => Some(item),
            _ => None,
        })
    }

    pub fn hand_empty(&self) -> bool {
        self.fluents.contains(&Fact::HandEmpty { person: self.agent() })
    }

    pub fn channel_of(&self, tv: EntityId) -> Option<EntityId> {
        self.fluents.iter().find_map(|fact| match *fact {
            Fact::TvPlayingChannel { tv: t, channel } if t == tv => Some(channel),
            _ => None,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::world::fact::Predicate;

    /// A small household: one bedroom with a table, a two-level shelf and a tv.
    pub(crate) fn bedroom_world() -> Arc<World> {
        let mut r = Registry::new();
        r.declare("me", Kind::Person).unwrap();
        let bedroom = r.declare("bob-bedroom", Kind::Bedroom).unwrap();
        let table = r.declare("bob-bedroom-table", Kind::Table).unwrap();
        let shelf = r.declare("bob-bedroom-shelf", Kind::Shelf).unwrap();
        let tv = r.declare("bob-bedroom-tv", Kind::Tv).unwrap();
        r.declare("book-a", Kind::Book).unwrap();
        r.declare("red-pen", Kind::Pen).unwrap();
        r.declare("cnn", Kind::Channel).unwrap();
        r.declare("nbc", Kind::Channel).unwrap();
        let l1 = r.declare("level-1", Kind::Level).unwrap();
        let l2 = r.declare("level-2", Kind::Level).unwrap();
        let statics = [
            Fact::InBedroom { room: bedroom, fixture: table },
            Fact::InBedroom { room: bedroom, fixture: shelf },
            Fact::InBedroom { room: bedroom, fixture: tv },
            Fact::ShelfHasLevel { shelf, level: l1 },
            Fact::ShelfHasLevel { shelf, level: l2 },
        ];
        Arc::new(World::new(r, statics.into_iter().collect()).unwrap())
    }

    pub(crate) fn id(world: &World, name: &str) -> EntityId {
        world.registry().lookup(name).unwrap()
    }

    pub(crate) fn initial(world: &Arc<World>) -> State {
        let me = id(world, "me");
        let fluents = [
            Fact::HandEmpty { person: me },
            Fact::TableContains { table: id(world, "bob-bedroom-table"), item: id(world, "book-a") },
            Fact::ShelfContains {
                shelf: id(world, "bob-bedroom-shelf"),
                item: id(world, "red-pen"),
                level: id(world, "level-2"),
            },
        ];
        State::new(Arc::clone(world), fluents.into_iter().collect()).unwrap()
    }

    #[test]
    fn test_world_requires_single_agent() {
        let mut r = Registry::new();
        r.declare("kitchen", Kind::Kitchen).unwrap();
        assert_eq!(World::new(r.clone(), BTreeSet::new()), Err(InvariantViolation::NoAgent));
        r.declare("me", Kind::Person).unwrap();
        r.declare("you", Kind::Person).unwrap();
        assert_eq!(
            World::new(r, BTreeSet::new()),
            Err(InvariantViolation::SeveralAgents { names: String::from("me, you") })
        );
    }

    #[test]
    fn test_fixture_in_one_room() {
        let mut r = Registry::new();
        r.declare("me", Kind::Person).unwrap();
        let bedroom = r.declare("bedroom", Kind::Bedroom).unwrap();
        let kitchen = r.declare("kitchen", Kind::Kitchen).unwrap();
        let light = r.declare("light", Kind::Light).unwrap();
        let statics = [
            Fact::InBedroom { room: bedroom, fixture: light },
            Fact::InKitchen { room: kitchen, fixture: light },
        ];
        assert_eq!(
            World::new(r, statics.into_iter().collect()),
            Err(InvariantViolation::SeveralRooms { fixture: String::from("light") })
        );
    }

    #[test]
    fn test_hand_and_containment_exclusion() {
        let world = bedroom_world();
        let state = initial(&world);
        let me = id(&world, "me");
        let book = id(&world, "book-a");
        let held = Fact::InHand { person: me, item: book };
        assert!(matches!(state.with_fact(held), Err(InvariantViolation::DuplicateContainment { .. })));

        let table = id(&world, "bob-bedroom-table");
        let lifted = state.without_fact(Fact::TableContains { table, item: book }).unwrap();
        assert_eq!(
            lifted.with_fact(held),
            Err(InvariantViolation::HandConflict { agent: String::from("me"), item: String::from("book-a") })
        );
        // one-fact edits skip exhaustiveness, complete edits do not
        let emptied = state.without_fact(Fact::HandEmpty { person: me }).unwrap();
        assert_eq!(
            State::new(Arc::clone(&world), emptied.fluents().clone()),
            Err(InvariantViolation::HandUnaccounted { agent: String::from("me") })
        );
    }

    #[test]
    fn test_channel_and_level_rules() {
        let world = bedroom_world();
        let state = initial(&world);
        let tv = id(&world, "bob-bedroom-tv");
        let cnn = id(&world, "cnn");
        let nbc = id(&world, "nbc");
        assert!(matches!(
            state.with_fact(Fact::TvPlayingChannel { tv, channel: cnn }),
            Err(InvariantViolation::ChannelWithoutPower { .. })
        ));
        let on = state.with_fact(Fact::TvOn { tv }).unwrap();
        let tuned = on.with_fact(Fact::TvPlayingChannel { tv, channel: cnn }).unwrap();
        assert_eq!(tuned.channel_of(tv), Some(cnn));
        assert!(matches!(
            tuned.with_fact(Fact::TvPlayingChannel { tv, channel: nbc }),
            Err(InvariantViolation::SeveralChannels { .. })
        ));

        let shelf = id(&world, "bob-bedroom-shelf");
        let book = id(&world, "book-a");
        let not_a_level = id(&world, "cnn");
        let table = id(&world, "bob-bedroom-table");
        let delta = Delta::new()
            .del(Fact::TableContains { table, item: book })
            .add(Fact::ShelfContains { shelf, item: book, level: not_a_level });
        assert!(matches!(state.apply(&delta), Err(InvariantViolation::UndeclaredLevel { .. })));
    }

    #[test]
    fn test_complete_states_place_every_item() {
        let world = bedroom_world();
        let state = initial(&world);
        let pen = id(&world, "red-pen");
        let shelf = id(&world, "bob-bedroom-shelf");
        let level = id(&world, "level-2");
        let dropped = state.without_fact(Fact::ShelfContains { shelf, item: pen, level }).unwrap();
        assert_eq!(dropped.placement_of(pen), None);
        assert_eq!(
            State::new(Arc::clone(&world), dropped.fluents().clone()),
            Err(InvariantViolation::Unplaced { item: String::from("red-pen") })
        );
        assert_eq!(
            state.apply(&Delta::new().del(Fact::ShelfContains { shelf, item: pen, level })),
            Err(InvariantViolation::Unplaced { item: String::from("red-pen") })
        );
    }

    #[test]
    fn test_complete_states_tune_switched_on_tvs() {
        let world = bedroom_world();
        let state = initial(&world);
        let tv = id(&world, "bob-bedroom-tv");
        let cnn = id(&world, "cnn");
        assert_eq!(
            state.apply(&Delta::new().add(Fact::TvOn { tv })),
            Err(InvariantViolation::SilentTv { tv: String::from("bob-bedroom-tv") })
        );
        let tuned = state.apply(&Delta::new().add(Fact::TvOn { tv }).add(Fact::TvPlayingChannel { tv, channel: cnn }));
        assert_eq!(tuned.map(|next| next.channel_of(tv)), Ok(Some(cnn)));
    }

    #[test]
    fn test_statics_are_immutable() {
        let world = bedroom_world();
        let state = initial(&world);
        let shelf = id(&world, "bob-bedroom-shelf");
        let level = id(&world, "level-1");
        let fact = Fact::ShelfHasLevel { shelf, level };
        assert!(state.holds(&fact));
        assert!(matches!(state.without_fact(fact), Err(InvariantViolation::StaticFact { .. })));
        assert!(matches!(state.apply(&Delta::new().del(fact)), Err(InvariantViolation::StaticFact { .. })));
        assert!(Predicate::ShelfHasLevel.is_static());
    }

    #[test]
    fn test_equality_covers_statics_and_fluents() {
        let world = bedroom_world();
        let a = initial(&world);
        let copy = Arc::new(World::clone(&world));
        let b = State::new(copy, a.fluents().clone()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.all_facts().len(), 8);
        let tv = id(&world, "bob-bedroom-tv");
        assert_ne!(a, a.with_fact(Fact::TvOn { tv }).unwrap());
        assert_eq!(a.held_item(), None);
        assert!(a.hand_empty());
        assert_eq!(world.levels_of(id(&world, "bob-bedroom-shelf")).count(), 2);
        assert_eq!(world.room_of(tv), Some(id(&world, "bob-bedroom")));
    }
}
