//! Game loop wiring every system around a single world.

use std::{cmp::Ordering, collections::BTreeMap};

use anyhow::{anyhow, bail, Context, Result};
use glam::DVec2;
use lionengine_core::{
    AnimState, Clock, Command, EntityId, EntityKind, Event, EventBus, PlayerId, Subscriber,
    TickClock, TileCoord, TileRect, TileSize,
};
use lionengine_system_animation::{Animation, Animator};
use lionengine_system_attack::{Attacker, AttackerServices, WeaponConfig};
use lionengine_system_production::{Producer, ProducerServices, Producible};
use lionengine_system_tile_collision::{TileCollision, Transform};
use lionengine_world::{self as world, query, Entity, Factory, World};
use log::{debug, info, warn};

use crate::scenario::Scenario;

/// Animations and weapon attached to entities of one kind.
#[derive(Clone, Debug, Default)]
struct KindProfile {
    footprint: Option<TileSize>,
    weapon: Option<WeaponConfig>,
    idle: Option<Animation>,
    attack: Option<Animation>,
}

/// Free-moving body resolved against the map every tick.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Body {
    name: String,
    position: DVec2,
    velocity: DVec2,
    gravity: f64,
    grounded: bool,
}

impl Body {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn position(&self) -> DVec2 {
        self.position
    }

    pub(crate) fn grounded(&self) -> bool {
        self.grounded
    }
}

/// Owns the world and drives every system once per tick.
pub(crate) struct Simulation {
    world: World,
    clock: TickClock,
    bus: EventBus,
    collision: TileCollision,
    profiles: BTreeMap<EntityKind, KindProfile>,
    animators: BTreeMap<EntityId, Animator>,
    attackers: BTreeMap<EntityId, Attacker>,
    producers: BTreeMap<EntityId, Producer>,
    bodies: Vec<Body>,
    edits: Vec<(u64, Command)>,
    seed: u64,
}

impl Simulation {
    /// Builds the world described by `scenario`.
    pub(crate) fn new(scenario: &Scenario, seed: u64) -> Result<Self> {
        let set = scenario
            .collision
            .build()
            .context("invalid collision definitions")?;
        let map = scenario.map.build(&set.groups).context("invalid map")?;

        let mut factory = Factory::new();
        let mut profiles = BTreeMap::new();
        for kind in &scenario.kinds {
            let id = factory.register_unit(kind.name.clone(), kind.life)?;
            let profile = KindProfile {
                footprint: Some(TileSize::new(kind.width, kind.height)),
                weapon: kind
                    .weapon
                    .as_deref()
                    .map(|name| scenario.weapons.get(name).copied())
                    .transpose()
                    .with_context(|| format!("kind '{}'", kind.name))?,
                idle: animation(scenario, kind.idle.as_deref())?,
                attack: animation(scenario, kind.attack.as_deref())?,
            };
            let _ = profiles.insert(id, profile);
        }

        let mut simulation = Self {
            world: World::new(map, factory),
            clock: TickClock::new(),
            bus: EventBus::new(),
            collision: TileCollision::new(set.categories),
            profiles,
            animators: BTreeMap::new(),
            attackers: BTreeMap::new(),
            producers: BTreeMap::new(),
            bodies: Vec::new(),
            edits: Vec::new(),
            seed,
        };

        let mut labels = BTreeMap::new();
        for unit in &scenario.units {
            let kind = simulation.kind(&unit.kind)?;
            let footprint = simulation.footprint(kind);
            let origin = TileCoord::new(unit.column, unit.row);
            let area = TileRect::from_origin_and_size(origin, footprint);
            let id = simulation.world.spawn(kind, area)?;
            let _ = simulation.world.activate(id, PlayerId::new(unit.owner));
            simulation.enlist(id, kind);
            if labels.insert(unit.label.as_str(), (id, unit.owner)).is_some() {
                bail!("unit label '{}' is used twice", unit.label);
            }
        }

        let label = |name: &str| {
            labels
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("unknown unit label '{name}'"))
        };

        for order in &scenario.orders {
            let (producer, owner) = label(&order.producer)?;
            let kind = simulation.kind(&order.kind)?;
            let producible = Producible::new(
                kind,
                order.steps,
                TileCoord::new(order.column, order.row),
                simulation.footprint(kind),
            );
            simulation
                .producers
                .entry(producer)
                .or_insert_with(|| {
                    Producer::new(producer, PlayerId::new(owner), scenario.production)
                })
                .add_to_queue(producible);
        }

        for order in &scenario.attacks {
            let (attacker, _) = label(&order.attacker)?;
            let (target, _) = label(&order.target)?;
            simulation
                .attackers
                .get_mut(&attacker)
                .ok_or_else(|| anyhow!("unit '{}' carries no weapon", order.attacker))?
                .attack(target);
        }

        simulation.bodies = scenario
            .bodies
            .iter()
            .map(|body| Body {
                name: body.name.clone(),
                position: DVec2::new(body.x, body.y),
                velocity: DVec2::new(body.vx, body.vy),
                gravity: body.gravity,
                grounded: false,
            })
            .collect();

        simulation.edits = scenario
            .edits
            .iter()
            .map(|edit| {
                let coord = TileCoord::new(edit.column, edit.row);
                let command = if edit.remove {
                    Command::RemoveTile { coord }
                } else {
                    Command::PlaceTile {
                        coord,
                        sheet: edit.sheet,
                        number: edit.number,
                        group: edit.group.clone(),
                    }
                };
                (edit.tick, command)
            })
            .collect();
        simulation.edits.sort_by_key(|(tick, _)| *tick);

        info!(
            "scenario loaded: {} entities, {} bodies, {} edits",
            query::entities(&simulation.world).count(),
            simulation.bodies.len(),
            simulation.edits.len()
        );
        Ok(simulation)
    }

    /// Registers a subscriber notified of every event.
    pub(crate) fn subscribe(&mut self, subscriber: impl Subscriber + 'static) {
        self.bus.subscribe(subscriber);
    }

    /// Runs `ticks` updates.
    pub(crate) fn run(&mut self, ticks: u64, extrp: f64) {
        for _ in 0..ticks {
            let _ = self.tick(extrp);
        }
    }

    /// Advances every system by one tick and returns the events it raised.
    pub(crate) fn tick(&mut self, extrp: f64) -> Vec<Event> {
        let now = self.clock.now();
        let mut events = Vec::new();

        while self.edits.first().is_some_and(|(tick, _)| *tick <= now) {
            let (_, command) = self.edits.remove(0);
            world::apply(&mut self.world, command, &mut events);
        }

        for producer in self.producers.values_mut() {
            let mut colony = Colony {
                world: &mut self.world,
                producer: producer.id(),
            };
            producer.update(extrp, &mut colony, &mut events);
        }

        let battlefield = Battlefield {
            world: &self.world,
            animators: &self.animators,
        };
        for attacker in self.attackers.values_mut() {
            attacker.update(&battlefield, &self.clock, &mut events);
        }

        self.react(&events);

        for animator in self.animators.values_mut() {
            animator.update(extrp);
        }
        self.move_bodies(extrp);

        self.bus.publish(&events);
        self.clock.advance();
        events
    }

    /// Current tick.
    pub(crate) fn now(&self) -> u64 {
        self.clock.now()
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    fn react(&mut self, events: &[Event]) {
        for event in events {
            match *event {
                Event::AttackStarted { attacker, .. } => {
                    if let Some(swing) = self.profile_of(attacker).and_then(|p| p.attack) {
                        self.play(attacker, &swing);
                    }
                }
                Event::AttackEnded {
                    target, damages, ..
                } => {
                    if self.world.damage(target, damages) == Some(0) {
                        info!("entity {} was killed", target.get());
                    }
                }
                Event::AttackAnimEnded { attacker, .. } => {
                    if let Some(idle) = self.profile_of(attacker).and_then(|p| p.idle) {
                        self.play(attacker, &idle);
                    }
                }
                Event::ProductionCompleted { kind, entity, .. } => self.enlist(entity, kind),
                Event::ReachingTarget { attacker, target } => self.approach(attacker, target),
                _ => {}
            }
        }
    }

    fn move_bodies(&mut self, extrp: f64) {
        let map = query::map(&self.world);
        for body in &mut self.bodies {
            body.velocity.y -= body.gravity * extrp;
            let candidate = body.position + body.velocity * extrp;
            let resolution = self
                .collision
                .resolve(map, &Transform::new(body.position, candidate));

            body.position = resolution.position();
            if resolution.horizontal().is_some() {
                body.velocity.x = 0.0;
            }
            body.grounded = resolution.grounded();
            if body.grounded {
                body.velocity.y = 0.0;
            }
        }
    }

    /// Steps `attacker` one column towards `target` when the tile is free.
    fn approach(&mut self, attacker: EntityId, target: EntityId) {
        let footprint = |id| query::entity(&self.world, id).map(Entity::footprint);
        let (Some(from), Some(to)) = (footprint(attacker), footprint(target)) else {
            return;
        };
        let column = from.origin().column();
        let next = match to.origin().column().cmp(&column) {
            Ordering::Greater => column + 1,
            Ordering::Less => column - 1,
            Ordering::Equal => return,
        };
        let area = TileRect::from_origin_and_size(
            TileCoord::new(next, from.origin().row()),
            from.size(),
        );

        let free = query::map(&self.world).contains(area.origin())
            && query::entities(&self.world)
                .filter(|entity| entity.id() != attacker)
                .all(|entity| entity.footprint().distance_in_tiles(&area) > 0);
        if free {
            let _ = self.world.relocate(attacker, area);
        } else {
            debug!("entity {} is blocked on its way to {}", attacker.get(), target.get());
        }
    }

    fn enlist(&mut self, id: EntityId, kind: EntityKind) {
        let profile = self.profiles.get(&kind).cloned().unwrap_or_default();
        let mut animator = Animator::new();
        if let Some(idle) = &profile.idle {
            animator.play(idle);
        }
        let _ = self.animators.insert(id, animator);

        if let Some(weapon) = profile.weapon {
            let seed = self.seed.wrapping_add(u64::from(id.get()));
            let _ = self.attackers.insert(id, Attacker::new(id, weapon, seed));
        }
    }

    fn play(&mut self, id: EntityId, animation: &Animation) {
        if let Some(animator) = self.animators.get_mut(&id) {
            animator.play(animation);
        }
    }

    fn profile_of(&self, id: EntityId) -> Option<&KindProfile> {
        let entity = query::entity(&self.world, id)?;
        self.profiles.get(&entity.kind())
    }

    fn kind(&self, name: &str) -> Result<EntityKind> {
        query::kind(&self.world, name).ok_or_else(|| anyhow!("unknown entity kind '{name}'"))
    }

    fn footprint(&self, kind: EntityKind) -> TileSize {
        self.profiles
            .get(&kind)
            .and_then(|profile| profile.footprint)
            .unwrap_or(TileSize::new(1, 1))
    }
}

fn animation(scenario: &Scenario, name: Option<&str>) -> Result<Option<Animation>> {
    name.map(|name| {
        scenario
            .animations
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("unknown animation '{name}'"))
    })
    .transpose()
}

/// Production services backed by the world.
struct Colony<'a> {
    world: &'a mut World,
    producer: EntityId,
}

impl ProducerServices for Colony<'_> {
    fn can_produce(&self, _producible: &Producible) -> bool {
        query::is_alive(self.world, self.producer)
    }

    fn can_be_produced(&self, producible: &Producible) -> bool {
        let area = producible.area();
        query::map(self.world).contains(area.origin())
            && query::entities(self.world)
                .all(|entity| entity.footprint().distance_in_tiles(&area) > 0)
    }

    fn spawn(&mut self, producible: &Producible) -> Option<EntityId> {
        match self.world.spawn(producible.kind(), producible.area()) {
            Ok(id) => Some(id),
            Err(error) => {
                warn!("production of kind {} failed: {error}", producible.kind().get());
                None
            }
        }
    }

    fn activate(&mut self, entity: EntityId, owner: PlayerId) {
        let _ = self.world.activate(entity, owner);
    }

    fn discard(&mut self, entity: EntityId) {
        let _ = self.world.discard(entity);
    }
}

/// Attack services backed by the world and the animators.
struct Battlefield<'a> {
    world: &'a World,
    animators: &'a BTreeMap<EntityId, Animator>,
}

impl AttackerServices for Battlefield<'_> {
    fn is_alive(&self, entity: EntityId) -> bool {
        query::is_alive(self.world, entity)
    }

    fn distance_in_tiles(&self, from: EntityId, to: EntityId) -> Option<u32> {
        query::distance_in_tiles(self.world, from, to)
    }

    fn can_attack(&self, attacker: EntityId) -> bool {
        query::is_alive(self.world, attacker)
    }

    fn frame_anim(&self, attacker: EntityId) -> u32 {
        self.animators
            .get(&attacker)
            .map_or(1, Animator::frame_anim)
    }

    fn anim_state(&self, attacker: EntityId) -> AnimState {
        self.animators
            .get(&attacker)
            .map_or(AnimState::Stopped, Animator::anim_state)
    }
}
