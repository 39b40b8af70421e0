use std::fmt;

use enumset::{enum_set, EnumSet};
use thiserror::Error;

use crate::world::entity::{kinds_to_string, EntityId, Kind, Registry};
use crate::world::{Delta, Fact, InvariantViolation, State, World};

/// Parameterless tag of an action template, in catalogue order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    PickUp,
    PutOnTable,
    PutOnShelf,
    PutInSink,
    PutInFridge,
    ToggleLight,
    ToggleTv,
    ChangeChannel,
    ToggleWindow,
    ToggleFaucet,
    AnswerPhone,
}

static PICK_UP: [EnumSet<Kind>; 1] = [Kind::ITEMS];
static PUT_ON_TABLE: [EnumSet<Kind>; 2] = [Kind::ITEMS, enum_set!(Kind::Table)];
static PUT_ON_SHELF: [EnumSet<Kind>; 3] = [Kind::ITEMS, enum_set!(Kind::Shelf), enum_set!(Kind::Level)];
static PUT_IN_SINK: [EnumSet<Kind>; 2] = [enum_set!(Kind::Kitchenware), enum_set!(Kind::Sink)];
static PUT_IN_FRIDGE: [EnumSet<Kind>; 2] = [enum_set!(Kind::Food), enum_set!(Kind::Fridge)];
static LIGHT: [EnumSet<Kind>; 1] = [enum_set!(Kind::Light)];
static TV: [EnumSet<Kind>; 1] = [enum_set!(Kind::Tv)];
static CHANGE_CHANNEL: [EnumSet<Kind>; 2] = [enum_set!(Kind::Tv), enum_set!(Kind::Channel)];
static WINDOW: [EnumSet<Kind>; 1] = [enum_set!(Kind::Window)];
static SINK: [EnumSet<Kind>; 1] = [enum_set!(Kind::Sink)];
static PHONE: [EnumSet<Kind>; 1] = [enum_set!(Kind::Phone)];

impl ActionKind {
    pub const ALL: [ActionKind; 11] = [
        ActionKind::PickUp,
        ActionKind::PutOnTable,
        ActionKind::PutOnShelf,
        ActionKind::PutInSink,
        ActionKind::PutInFridge,
        ActionKind::ToggleLight,
        ActionKind::ToggleTv,
        ActionKind::ChangeChannel,
        ActionKind::ToggleWindow,
        ActionKind::ToggleFaucet,
        ActionKind::AnswerPhone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::PickUp => "pick-up",
            ActionKind::PutOnTable => "put-on-table",
            ActionKind::PutOnShelf => "put-on-shelf",
            ActionKind::PutInSink => "put-in-sink",
            ActionKind::PutInFridge => "put-in-fridge",
            ActionKind::ToggleLight => "toggle-light",
            ActionKind::ToggleTv => "toggle-tv",
            ActionKind::ChangeChannel => "change-channel",
            ActionKind::ToggleWindow => "toggle-window",
            ActionKind::ToggleFaucet => "toggle-faucet",
            ActionKind::AnswerPhone => "answer-phone",
        }
    }

    pub fn from_name(name: &str) -> Option<ActionKind> {
        Self::ALL.iter().copied().find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// Accepted kinds per parameter. Sink and fridge parameters are already
    /// narrowed to what those containers hold.
    pub fn parameters(self) -> &'static [EnumSet<Kind>] {
        match self {
            ActionKind::PickUp => &PICK_UP,
            ActionKind::PutOnTable => &PUT_ON_TABLE,
            ActionKind::PutOnShelf => &PUT_ON_SHELF,
            ActionKind::PutInSink => &PUT_IN_SINK,
            ActionKind::PutInFridge => &PUT_IN_FRIDGE,
            ActionKind::ToggleLight => &LIGHT,
            ActionKind::ToggleTv => &TV,
            ActionKind::ChangeChannel => &CHANGE_CHANNEL,
            ActionKind::ToggleWindow => &WINDOW,
            ActionKind::ToggleFaucet => &SINK,
            ActionKind::AnswerPhone => &PHONE,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A ground action: one variant per template with its bound parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    PickUp { item: EntityId },
    PutOnTable { item: EntityId, table: EntityId },
    PutOnShelf { item: EntityId, shelf: EntityId, level: EntityId },
    PutInSink { item: EntityId, sink: EntityId },
    PutInFridge { item: EntityId, fridge: EntityId },
    ToggleLight { light: EntityId },
    ToggleTv { tv: EntityId },
    ChangeChannel { tv: EntityId, channel: EntityId },
    ToggleWindow { window: EntityId },
    ToggleFaucet { sink: EntityId },
    AnswerPhone { phone: EntityId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Reason {
    #[error("expected {expected} argument(s), got {found}")]
    Arity { expected: usize, found: usize },
    #[error("argument {position} is '{entity}' of type {kind}, expected {expected}")]
    WrongKind { position: usize, entity: String, kind: Kind, expected: String },
    #[error("unknown object '{0}'")]
    UnknownObject(String),
    #[error("shelf '{shelf}' has no level '{level}'")]
    UndeclaredLevel { shelf: String, level: String },
    #[error("precondition {0} does not hold")]
    MissingFact(String),
    #[error("{0} already holds")]
    PresentFact(String),
    #[error("'{0}' is not in any container")]
    NotPlaced(String),
    #[error("no channel is declared for '{0}' to play")]
    NoChannel(String),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// An action could not be grounded or applied. The input state is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply {action}: {reason}")]
pub struct IllegalAction {
    pub action: String,
    pub reason: Reason,
}

impl Action {
    /// Binds `kind` to `args` and typechecks the result against `world`.
    pub fn ground(kind: ActionKind, args: &[EntityId], world: &World) -> Result<Action, IllegalAction> {
        let expected = kind.parameters().len();
        if args.len() != expected {
            let mut action = format!("({}", kind.name());
            for id in args {
                action.push(' ');
                action.push_str(world.registry().name(*id));
            }
            action.push(')');
            return Err(IllegalAction { action, reason: Reason::Arity { expected, found: args.len() } });
        }
        let a = |i: usize| args[i];
        let action = match kind {
            ActionKind::PickUp => Action::PickUp { item: a(0) },
            ActionKind::PutOnTable => Action::PutOnTable { item: a(0), table: a(1) },
            ActionKind::PutOnShelf => Action::PutOnShelf { item: a(0), shelf: a(1), level: a(2) },
            ActionKind::PutInSink => Action::PutInSink { item: a(0), sink: a(1) },
            ActionKind::PutInFridge => Action::PutInFridge { item: a(0), fridge: a(1) },
            ActionKind::ToggleLight => Action::ToggleLight { light: a(0) },
            ActionKind::ToggleTv => Action::ToggleTv { tv: a(0) },
            ActionKind::ChangeChannel => Action::ChangeChannel { tv: a(0), channel: a(1) },
            ActionKind::ToggleWindow => Action::ToggleWindow { window: a(0) },
            ActionKind::ToggleFaucet => Action::ToggleFaucet { sink: a(0) },
            ActionKind::AnswerPhone => Action::AnswerPhone { phone: a(0) },
        };
        action.typecheck(world)?;
        Ok(action)
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::PickUp { .. } => ActionKind::PickUp,
            Action::PutOnTable { .. } => ActionKind::PutOnTable,
            Action::PutOnShelf { .. } => ActionKind::PutOnShelf,
            Action::PutInSink { .. } => ActionKind::PutInSink,
            Action::PutInFridge { .. } => ActionKind::PutInFridge,
            Action::ToggleLight { .. } => ActionKind::ToggleLight,
            Action::ToggleTv { .. } => ActionKind::ToggleTv,
            Action::ChangeChannel { .. } => ActionKind::ChangeChannel,
            Action::ToggleWindow { .. } => ActionKind::ToggleWindow,
            Action::ToggleFaucet { .. } => ActionKind::ToggleFaucet,
            Action::AnswerPhone { .. } => ActionKind::AnswerPhone,
        }
    }

    pub fn args(&self) -> Vec<EntityId> {
        match *self {
            Action::PickUp { item } => vec![item],
            Action::PutOnTable { item, table } => vec![item, table],
            Action::PutOnShelf { item, shelf, level } => vec![item, shelf, level],
            Action::PutInSink { item, sink } => vec![item, sink],
            Action::PutInFridge { item, fridge } => vec![item, fridge],
            Action::ToggleLight { light } => vec![light],
            Action::ToggleTv { tv } => vec![tv],
            Action::ChangeChannel { tv, channel } => vec![tv, channel],
            Action::ToggleWindow { window } => vec![window],
            Action::ToggleFaucet { sink } => vec![sink],
            Action::AnswerPhone { phone } => vec![phone],
        }
    }

    /// Every parameter bound to an entity of an accepted kind, shelf levels
    /// declared for their shelf.
    pub fn typecheck(&self, world: &World) -> Result<(), IllegalAction> {
        let registry = world.registry();
        for (position, (id, expected)) in self.args().into_iter().zip(self.kind().parameters()).enumerate() {
            if id.index() >= registry.len() {
                return Err(self.illegal(registry, Reason::UnknownObject(format!("#{}", id.index()))));
            }
            let kind = registry.kind(id);
            if !expected.contains(kind) {
                return Err(self.illegal(
                    registry,
                    Reason::WrongKind {
                        position: position + 1,
                        entity: registry.name(id).to_owned(),
                        kind,
                        expected: kinds_to_string(*expected),
                    },
                ));
            }
        }
        if let Action::PutOnShelf { shelf, level, .. } = *self {
            if !world.has_level(shelf, level) {
                let reason = Reason::UndeclaredLevel {
                    shelf: registry.name(shelf).to_owned(),
                    level: registry.name(level).to_owned(),
                };
                return Err(self.illegal(registry, reason));
            }
        }
        Ok(())
    }

    /// Precondition of a well-typed action.
    pub fn check(&self, state: &State) -> Result<(), IllegalAction> {
        let agent = state.agent();
        let require = |fact: Fact| {
            if state.holds(&fact) {
                Ok(())
            } else {
                Err(self.illegal(state.registry(), Reason::MissingFact(fact.display(state.registry()).to_string())))
            }
        };
        match *self {
            Action::PickUp { item } => {
                require(Fact::HandEmpty { person: agent })?;
                match state.placement_of(item) {
                    Some(Fact::InHand { .. }) | None => {
                        Err(self.illegal(state.registry(), Reason::NotPlaced(state.registry().name(item).to_owned())))
                    }
                    Some(_) => Ok(()),
                }
            }
            Action::PutOnTable { item, .. } | Action::PutInSink { item, .. } | Action::PutInFridge { item, .. } => {
                require(Fact::InHand { person: agent, item })
            }
            Action::PutOnShelf { item, shelf, level } => {
                require(Fact::InHand { person: agent, item })?;
                require(Fact::ShelfHasLevel { shelf, level })
            }
            Action::ChangeChannel { tv, channel } => {
                require(Fact::TvOn { tv })?;
                let tuned = Fact::TvPlayingChannel { tv, channel };
                if state.holds(&tuned) {
                    Err(self.illegal(state.registry(), Reason::PresentFact(tuned.display(state.registry()).to_string())))
                } else {
                    Ok(())
                }
            }
            Action::AnswerPhone { phone } => require(Fact::IsRinging { phone }),
            Action::ToggleTv { tv } => {
                if state.holds(&Fact::TvOn { tv }) || first_channel(state).is_some() {
                    Ok(())
                } else {
                    Err(self.illegal(state.registry(), Reason::NoChannel(state.registry().name(tv).to_owned())))
                }
            }
            Action::ToggleLight { .. } | Action::ToggleWindow { .. } | Action::ToggleFaucet { .. } => Ok(()),
        }
    }

    /// Add and delete lists for `state`. Only meaningful once `check` passed.
    pub fn effect(&self, state: &State) -> Delta {
        let agent = state.agent();
        let toggle = |fact: Fact| {
            if state.holds(&fact) {
                Delta::new().del(fact)
            } else {
                Delta::new().add(fact)
            }
        };
        let put = |item: EntityId, placed: Fact| {
            Delta::new().del(Fact::InHand { person: agent, item }).add(Fact::HandEmpty { person: agent }).add(placed)
        };
        match *self {
            Action::PickUp { item } => {
                let mut delta = Delta::new();
                if let Some(placement) = state.placement_of(item) {
                    delta = delta.del(*placement);
                }
                delta.del(Fact::HandEmpty { person: agent }).add(Fact::InHand { person: agent, item })
            }
            Action::PutOnTable { item, table } => put(item, Fact::TableContains { table, item }),
            Action::PutOnShelf { item, shelf, level } => put(item, Fact::ShelfContains { shelf, item, level }),
            Action::PutInSink { item, sink } => put(item, Fact::SinkContains { sink, item }),
            Action::PutInFridge { item, fridge } => put(item, Fact::FridgeContains { fridge, item }),
            Action::ToggleLight { light } => toggle(Fact::LightOn { light }),
            // switching on tunes the first declared channel
            Action::ToggleTv { tv } => {
                let mut delta = toggle(Fact::TvOn { tv });
                if let Some(channel) = state.channel_of(tv) {
                    delta = delta.del(Fact::TvPlayingChannel { tv, channel });
                } else if let Some(channel) = first_channel(state) {
                    delta = delta.add(Fact::TvPlayingChannel { tv, channel });
                }
                delta
            }
            Action::ChangeChannel { tv, channel } => {
                let mut delta = Delta::new();
                if let Some(current) = state.channel_of(tv) {
                    delta = delta.del(Fact::TvPlayingChannel { tv, channel: current });
                }
                delta.add(Fact::TvPlayingChannel { tv, channel })
            }
            Action::ToggleWindow { window } => toggle(Fact::WindowOpen { window }),
            Action::ToggleFaucet { sink } => toggle(Fact::FaucetOn { sink }),
            Action::AnswerPhone { phone } => Delta::new().del(Fact::IsRinging { phone }),
        }
    }

    /// Typecheck, precondition and effect evaluated against the same state.
    pub fn apply(&self, state: &State) -> Result<State, IllegalAction> {
        self.typecheck(state.world())?;
        self.check(state)?;
        state.apply(&self.effect(state)).map_err(|e| self.illegal(state.registry(), Reason::Invariant(e)))
    }

    fn illegal(&self, registry: &Registry, reason: Reason) -> IllegalAction {
        let action = if self.args().iter().all(|id| id.index() < registry.len()) {
            self.display(registry).to_string()
        } else {
            self.kind().name().to_owned()
        };
        IllegalAction { action, reason }
    }

    pub fn display<'a>(&'a self, registry: &'a Registry) -> ActionDisplay<'a> {
        ActionDisplay { action: self, registry }
    }
}

fn first_channel(state: &State) -> Option<EntityId> {
    state.registry().of_kind(Kind::Channel).next()
}

pub struct ActionDisplay<'a> {
    action: &'a Action,
    registry: &'a Registry,
}

impl fmt::Display for ActionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.action.kind())?;
        for id in self.action.args() {
            write!(f, " {}", self.registry.name(id))?;
        }
        write!(f, ")")
    }
}
