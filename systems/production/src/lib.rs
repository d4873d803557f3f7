#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! FIFO production queue that spawns entities after a step-based delay.
//!
//! A [`Producer`] sequences timing and activation only. Whether production
//! may start, how entities are built and what removing one means are all
//! answered by the caller through [`ProducerServices`].

use std::collections::VecDeque;

use lionengine_core::{EntityId, EntityKind, Event, PlayerId, TileCoord, TileRect, TileSize};
use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

const IDLE_PROGRESS: f64 = -1.0;
const IDLE_PERCENT: i32 = -1;

/// Errors raised by invalid producer configuration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ProductionError {
    /// A production rate is zero, negative or not finite.
    #[error("{name} must be finite and positive, got {value}")]
    InvalidRate {
        /// Name of the offending parameter.
        name: &'static str,
        /// Value provided.
        value: f64,
    },
}

/// Production rate shared by the producers of one kind.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RateDefinition")]
pub struct ProducerConfig {
    steps_per_second: f64,
    desired_fps: f64,
}

impl ProducerConfig {
    /// Creates a configuration producing `steps_per_second` steps in a loop
    /// running at `desired_fps` ticks per second.
    pub fn new(steps_per_second: f64, desired_fps: f64) -> Result<Self, ProductionError> {
        check_rate("steps_per_second", steps_per_second)?;
        check_rate("desired_fps", desired_fps)?;
        Ok(Self {
            steps_per_second,
            desired_fps,
        })
    }

    /// Steps produced per second of simulated time.
    #[must_use]
    pub const fn steps_per_second(&self) -> f64 {
        self.steps_per_second
    }

    /// Tick rate of the loop driving the producer.
    #[must_use]
    pub const fn desired_fps(&self) -> f64 {
        self.desired_fps
    }

    /// Steps added per unit of extrapolation.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.steps_per_second / self.desired_fps
    }
}

#[derive(Deserialize)]
struct RateDefinition {
    steps_per_second: f64,
    desired_fps: f64,
}

impl TryFrom<RateDefinition> for ProducerConfig {
    type Error = ProductionError;

    fn try_from(raw: RateDefinition) -> Result<Self, Self::Error> {
        ProducerConfig::new(raw.steps_per_second, raw.desired_fps)
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ProductionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProductionError::InvalidRate { name, value })
    }
}

/// Queued request to spawn an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Producible {
    kind: EntityKind,
    steps: u32,
    location: TileCoord,
    footprint: TileSize,
}

impl Producible {
    /// Creates a request for `kind` at `location` costing `steps` steps.
    #[must_use]
    pub const fn new(
        kind: EntityKind,
        steps: u32,
        location: TileCoord,
        footprint: TileSize,
    ) -> Self {
        Self {
            kind,
            steps,
            location,
            footprint,
        }
    }

    /// Kind of the entity to spawn.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Steps needed to complete the production.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }

    /// Tile the entity occupies once produced.
    #[must_use]
    pub const fn location(&self) -> TileCoord {
        self.location
    }

    /// Size of the entity in tiles.
    #[must_use]
    pub const fn footprint(&self) -> TileSize {
        self.footprint
    }

    /// Tiles covered by the entity once produced.
    #[must_use]
    pub const fn area(&self) -> TileRect {
        TileRect::from_origin_and_size(self.location, self.footprint)
    }
}

/// Lifecycle of the production at the head of the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProducerState {
    /// Nothing to produce.
    None,
    /// Waiting for the head of the queue to become producible.
    Check,
    /// Waiting for the current producible to be allowed to spawn.
    WillProduce,
    /// Accumulating steps.
    Producing,
    /// All steps accumulated, the entity activates on the next update.
    Produced,
}

/// Capabilities the producer relies on.
pub trait ProducerServices {
    /// Reports whether the head of the queue may leave it, typically a
    /// resource check.
    fn can_produce(&self, producible: &Producible) -> bool;

    /// Reports whether the current producible may spawn, typically a
    /// placement check.
    fn can_be_produced(&self, producible: &Producible) -> bool;

    /// Builds an inactive entity for `producible`.
    fn spawn(&mut self, producible: &Producible) -> Option<EntityId>;

    /// Activates a produced entity and hands it to `owner`.
    fn activate(&mut self, entity: EntityId, owner: PlayerId);

    /// Removes an entity whose production was abandoned.
    fn discard(&mut self, entity: EntityId);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cancellation {
    Skip,
    Stop,
}

/// Production queue owned by a single entity.
#[derive(Clone, Debug)]
pub struct Producer {
    id: EntityId,
    owner: PlayerId,
    config: ProducerConfig,
    queue: VecDeque<Producible>,
    current: Option<Producible>,
    in_production: Option<EntityId>,
    progress: f64,
    speed: f64,
    state: ProducerState,
    blocked_reported: bool,
    spawn_failure_reported: bool,
    cancellation: Option<Cancellation>,
}

impl Producer {
    /// Creates an idle producer for entity `id` owned by `owner`.
    #[must_use]
    pub fn new(id: EntityId, owner: PlayerId, config: ProducerConfig) -> Self {
        Self {
            id,
            owner,
            config,
            queue: VecDeque::new(),
            current: None,
            in_production: None,
            progress: IDLE_PROGRESS,
            speed: 0.0,
            state: ProducerState::None,
            blocked_reported: false,
            spawn_failure_reported: false,
            cancellation: None,
        }
    }

    /// Entity owning the queue.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Appends `producible` to the queue. An idle producer starts checking
    /// on the next update.
    pub fn add_to_queue(&mut self, producible: Producible) {
        self.queue.push_back(producible);
        if self.state == ProducerState::None {
            self.state = ProducerState::Check;
        }
    }

    /// Abandons the current production on the next update and moves on to
    /// the rest of the queue.
    ///
    /// Only a producer waiting to spawn or producing is affected; a finished
    /// production is still completed.
    pub fn skip_production(&mut self) {
        if self.cancellation.is_none() {
            self.cancellation = Some(Cancellation::Skip);
        }
    }

    /// Clears the queue on the next update, abandoning the current
    /// production when it has not finished yet.
    pub fn stop_production(&mut self) {
        self.cancellation = Some(Cancellation::Stop);
    }

    /// Advances the production by one tick.
    pub fn update<S>(&mut self, extrp: f64, services: &mut S, out: &mut Vec<Event>)
    where
        S: ProducerServices + ?Sized,
    {
        if let Some(cancellation) = self.cancellation.take() {
            if matches!(
                self.state,
                ProducerState::WillProduce | ProducerState::Producing
            ) {
                self.cancel(cancellation, services, out);
                return;
            }
            if cancellation == Cancellation::Stop {
                self.clear_queue();
            }
        }

        match self.state {
            ProducerState::None => {}
            ProducerState::Check => self.check(services, out),
            ProducerState::WillProduce => self.start(services, out),
            ProducerState::Producing => self.advance(extrp, out),
            ProducerState::Produced => self.complete(services, out),
        }
    }

    /// Accumulated steps, or `-1.0` when idle.
    #[must_use]
    pub const fn production_progress(&self) -> f64 {
        self.progress
    }

    /// Completion percentage, or `-1` when idle.
    ///
    /// Producibles without any step report completion as soon as they start.
    #[must_use]
    pub fn production_progress_percent(&self) -> i32 {
        let Some(current) = self.current.filter(|_| self.progress >= 0.0) else {
            return IDLE_PERCENT;
        };
        if current.steps == 0 {
            return 100;
        }
        (self.progress / f64::from(current.steps) * 100.0).round() as i32
    }

    /// Reports whether an entity is currently under production.
    #[must_use]
    pub const fn is_producing(&self) -> bool {
        self.in_production.is_some()
    }

    /// Number of producibles waiting behind the current one.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Producible taken from the queue, if any.
    #[must_use]
    pub const fn producing(&self) -> Option<&Producible> {
        self.current.as_ref()
    }

    /// Entity spawned for the current production.
    #[must_use]
    pub const fn in_production(&self) -> Option<EntityId> {
        self.in_production
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ProducerState {
        self.state
    }

    /// Producibles waiting in the queue, head first.
    pub fn queue(&self) -> impl Iterator<Item = &Producible> {
        self.queue.iter()
    }

    /// Production rate in use.
    #[must_use]
    pub const fn config(&self) -> &ProducerConfig {
        &self.config
    }

    fn check<S>(&mut self, services: &mut S, out: &mut Vec<Event>)
    where
        S: ProducerServices + ?Sized,
    {
        let Some(head) = self.queue.front() else {
            self.state = ProducerState::None;
            return;
        };

        if services.can_produce(head) {
            self.current = self.queue.pop_front();
            self.blocked_reported = false;
            self.state = ProducerState::WillProduce;
        } else if !self.blocked_reported {
            self.blocked_reported = true;
            debug!("producer {} blocked on kind {}", self.id.get(), head.kind.get());
            out.push(Event::ProductionBlocked {
                producer: self.id,
                kind: head.kind,
            });
        }
    }

    fn start<S>(&mut self, services: &mut S, out: &mut Vec<Event>)
    where
        S: ProducerServices + ?Sized,
    {
        let Some(current) = self.current else {
            self.state = ProducerState::Check;
            return;
        };
        if !services.can_be_produced(&current) {
            return;
        }
        let Some(entity) = services.spawn(&current) else {
            if !self.spawn_failure_reported {
                self.spawn_failure_reported = true;
                warn!(
                    "producer {} could not spawn kind {}",
                    self.id.get(),
                    current.kind.get()
                );
            }
            return;
        };

        self.spawn_failure_reported = false;

        self.in_production = Some(entity);
        self.speed = self.config.speed();
        self.progress = 0.0;
        self.state = ProducerState::Producing;
        debug!(
            "producer {} started entity {} of kind {}",
            self.id.get(),
            entity.get(),
            current.kind.get()
        );
        out.push(Event::ProductionStarted {
            producer: self.id,
            kind: current.kind,
            entity,
            location: current.location,
        });
    }

    fn advance(&mut self, extrp: f64, out: &mut Vec<Event>) {
        let (Some(current), Some(entity)) = (self.current, self.in_production) else {
            self.state = ProducerState::Check;
            return;
        };

        let steps = f64::from(current.steps);
        self.progress += self.speed * extrp;
        if self.progress >= steps {
            self.progress = steps;
            self.state = ProducerState::Produced;
        }
        out.push(Event::ProductionProgress {
            producer: self.id,
            entity,
            percent: self.production_progress_percent(),
        });
    }

    fn complete<S>(&mut self, services: &mut S, out: &mut Vec<Event>)
    where
        S: ProducerServices + ?Sized,
    {
        if let (Some(current), Some(entity)) = (self.current.take(), self.in_production.take()) {
            services.activate(entity, self.owner);
            debug!("producer {} completed entity {}", self.id.get(), entity.get());
            out.push(Event::ProductionCompleted {
                producer: self.id,
                kind: current.kind,
                entity,
            });
        }
        self.reset_progress();
        self.state = self.next_state();
    }

    fn cancel<S>(&mut self, cancellation: Cancellation, services: &mut S, out: &mut Vec<Event>)
    where
        S: ProducerServices + ?Sized,
    {
        let discarded = self.in_production.take();
        if let Some(entity) = discarded {
            services.discard(entity);
        }
        if let Some(current) = self.current.take() {
            debug!(
                "producer {} skipped kind {}",
                self.id.get(),
                current.kind.get()
            );
            out.push(Event::ProductionSkipped {
                producer: self.id,
                kind: current.kind,
                entity: discarded,
            });
        }
        self.reset_progress();

        self.spawn_failure_reported = false;

        if cancellation == Cancellation::Stop {
            self.clear_queue();
        }
        self.state = self.next_state();
    }

    fn clear_queue(&mut self) {
        self.queue.clear();
        self.blocked_reported = false;
        if self.state == ProducerState::Check {
            self.state = ProducerState::None;
        }
    }

    fn reset_progress(&mut self) {
        self.progress = IDLE_PROGRESS;
        self.speed = 0.0;
    }

    fn next_state(&self) -> ProducerState {
        if self.queue.is_empty() {
            ProducerState::None
        } else {
            ProducerState::Check
        }
    }
}
