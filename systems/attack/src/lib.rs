#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weapon state machine that gates hits on range, cooldown and the attack
//! animation frame.
//!
//! The attacker never mutates the world. It reports what happened through
//! [`Event`] values; the caller moves units on `ReachingTarget`, starts the
//! attack animation on `AttackStarted` and applies damages on `AttackEnded`.

use std::collections::BTreeMap;

use lionengine_core::{AnimState, Clock, EntityId, Event, Range};
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised by weapon lookups.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AttackerError {
    /// No weapon is registered under the name.
    #[error("unknown weapon '{0}'")]
    UnknownWeapon(String),
    /// A weapon name was registered twice.
    #[error("weapon '{0}' is already registered")]
    DuplicateWeapon(String),
}

/// Reach, damages and timing of a weapon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct WeaponConfig {
    distance: Range,
    damages: Range,
    frame_attack: u32,
    attack_pause: u64,
}

impl WeaponConfig {
    /// Creates a weapon hitting targets `distance` tiles away on animation
    /// frame `frame_attack`, then resting `attack_pause` ticks.
    #[must_use]
    pub const fn new(
        distance: Range,
        damages: Range,
        frame_attack: u32,
        attack_pause: u64,
    ) -> Self {
        Self {
            distance,
            damages,
            frame_attack,
            attack_pause,
        }
    }

    /// Tile distances the target must lie within.
    #[must_use]
    pub const fn distance(&self) -> Range {
        self.distance
    }

    /// Damages drawn for each hit.
    #[must_use]
    pub const fn damages(&self) -> Range {
        self.damages
    }

    /// Attack animation frame on which the hit lands.
    #[must_use]
    pub const fn frame_attack(&self) -> u32 {
        self.frame_attack
    }

    /// Ticks to wait between two hits.
    #[must_use]
    pub const fn attack_pause(&self) -> u64 {
        self.attack_pause
    }
}

/// Named weapon definitions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct WeaponRegistry {
    weapons: BTreeMap<String, WeaponConfig>,
}

impl WeaponRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `config` under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        config: WeaponConfig,
    ) -> Result<(), AttackerError> {
        let name = name.into();
        if self.weapons.contains_key(&name) {
            return Err(AttackerError::DuplicateWeapon(name));
        }
        let _ = self.weapons.insert(name, config);
        Ok(())
    }

    /// Weapon registered under `name`.
    pub fn get(&self, name: &str) -> Result<&WeaponConfig, AttackerError> {
        self.weapons
            .get(name)
            .ok_or_else(|| AttackerError::UnknownWeapon(name.to_owned()))
    }

    /// Number of registered weapons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    /// Reports whether no weapon is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }
}

/// Phase of the attack loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackState {
    /// No target.
    None,
    /// Checking whether the target can be hit.
    Check,
    /// Running the attack animation.
    Attacking,
}

/// Queries the attacker needs about the world and its own animation.
pub trait AttackerServices {
    /// Reports whether `entity` exists and still has life.
    fn is_alive(&self, entity: EntityId) -> bool;

    /// Tile distance between two entities, if both exist.
    fn distance_in_tiles(&self, from: EntityId, to: EntityId) -> Option<u32>;

    /// Reports whether `attacker` may start attacking, for example because
    /// it is alive and not busy elsewhere.
    fn can_attack(&self, attacker: EntityId) -> bool;

    /// Frame of the animation currently played by `attacker`, starting at one.
    fn frame_anim(&self, attacker: EntityId) -> u32;

    /// Playback state of the animation of `attacker`.
    fn anim_state(&self, attacker: EntityId) -> AnimState;
}

/// Attack state owned by a single entity.
#[derive(Clone, Debug)]
pub struct Attacker {
    id: EntityId,
    weapon: WeaponConfig,
    rng: ChaCha8Rng,
    target: Option<EntityId>,
    state: AttackState,
    timer: Option<u64>,
    attacking: bool,
    attacked: bool,
    stop: bool,
}

impl Attacker {
    /// Creates an idle attacker for entity `id`. Damages are drawn from a
    /// generator seeded with `seed`.
    #[must_use]
    pub fn new(id: EntityId, weapon: WeaponConfig, seed: u64) -> Self {
        Self {
            id,
            weapon,
            rng: ChaCha8Rng::seed_from_u64(seed),
            target: None,
            state: AttackState::None,
            timer: None,
            attacking: false,
            attacked: false,
            stop: false,
        }
    }

    /// Entity owning the weapon.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Weapon in use.
    #[must_use]
    pub const fn weapon(&self) -> &WeaponConfig {
        &self.weapon
    }

    /// Targets `target`. Ignored when already attacking that same target.
    pub fn attack(&mut self, target: EntityId) {
        if self.target == Some(target) && self.state != AttackState::None && !self.stop {
            return;
        }
        self.target = Some(target);
        self.state = AttackState::Check;
        self.attacking = false;
        self.attacked = false;
        self.stop = false;
    }

    /// Cancels the attack on the next update.
    pub fn stop_attack(&mut self) {
        self.stop = true;
    }

    /// Advances the attack loop by one tick.
    pub fn update<S, C>(&mut self, services: &S, clock: &C, out: &mut Vec<Event>)
    where
        S: AttackerServices + ?Sized,
        C: Clock + ?Sized,
    {
        if self.stop {
            debug!("attacker {} stopped", self.id.get());
            self.reset();
            return;
        }

        match self.state {
            AttackState::None => {}
            AttackState::Check => self.check(services, clock.now(), out),
            AttackState::Attacking => self.swing(services, clock.now(), out),
        }
    }

    /// Current target.
    #[must_use]
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Current phase.
    #[must_use]
    pub const fn state(&self) -> AttackState {
        self.state
    }

    /// Reports whether the attack animation is running.
    #[must_use]
    pub const fn is_attacking(&self) -> bool {
        self.attacking
    }

    fn check<S>(&mut self, services: &S, now: u64, out: &mut Vec<Event>)
    where
        S: AttackerServices + ?Sized,
    {
        let Some(target) = self.live_target(services) else {
            self.reset();
            return;
        };
        let Some(distance) = services.distance_in_tiles(self.id, target) else {
            self.reset();
            return;
        };

        if self.weapon.distance.includes(distance) {
            if services.can_attack(self.id) {
                self.state = AttackState::Attacking;
            }
        } else if self.cooldown_elapsed(now) {
            out.push(Event::ReachingTarget {
                attacker: self.id,
                target,
            });
        }
    }

    fn swing<S>(&mut self, services: &S, now: u64, out: &mut Vec<Event>)
    where
        S: AttackerServices + ?Sized,
    {
        if self.attacked {
            if services.anim_state(self.id) == AnimState::Finished {
                if let Some(target) = self.target {
                    out.push(Event::AttackAnimEnded {
                        attacker: self.id,
                        target,
                    });
                }
                self.attacked = false;
                self.attacking = false;
                self.state = AttackState::Check;
            }
            return;
        }

        let Some(target) = self.live_target(services) else {
            self.reset();
            return;
        };

        if !self.attacking {
            if self.cooldown_elapsed(now) {
                self.attacking = true;
                out.push(Event::AttackStarted {
                    attacker: self.id,
                    target,
                });
            }
            return;
        }

        if services.frame_anim(self.id) >= self.weapon.frame_attack {
            let damages = self.weapon.damages.random(&mut self.rng);
            debug!(
                "attacker {} hit {} for {damages}",
                self.id.get(),
                target.get()
            );
            out.push(Event::AttackEnded {
                attacker: self.id,
                target,
                damages,
            });
            self.attacked = true;
            self.timer = Some(now);
        } else {
            out.push(Event::PreparingAttack {
                attacker: self.id,
                target,
            });
        }
    }

    fn live_target<S>(&self, services: &S) -> Option<EntityId>
    where
        S: AttackerServices + ?Sized,
    {
        self.target.filter(|&target| services.is_alive(target))
    }

    fn cooldown_elapsed(&self, now: u64) -> bool {
        self.timer
            .map_or(true, |last| now.saturating_sub(last) > self.weapon.attack_pause)
    }

    fn reset(&mut self) {
        self.target = None;
        self.state = AttackState::None;
        self.attacking = false;
        self.attacked = false;
        self.stop = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sword() -> WeaponConfig {
        WeaponConfig::new(
            Range::new(0, 1).expect("range"),
            Range::new(2, 5).expect("range"),
            3,
            10,
        )
    }

    #[test]
    fn registry_reports_unknown_weapons() {
        let mut registry = WeaponRegistry::new();
        registry.register("sword", sword()).expect("register");
        assert_eq!(registry.get("sword"), Ok(&sword()));
        assert_eq!(
            registry.get("bow"),
            Err(AttackerError::UnknownWeapon("bow".to_owned()))
        );
        assert_eq!(
            registry.register("sword", sword()),
            Err(AttackerError::DuplicateWeapon("sword".to_owned()))
        );
    }

    #[test]
    fn new_attacker_is_idle() {
        let attacker = Attacker::new(EntityId::new(0), sword(), 1);
        assert_eq!(attacker.state(), AttackState::None);
        assert_eq!(attacker.target(), None);
        assert!(!attacker.is_attacking());
    }

    #[test]
    fn attacking_the_same_target_twice_keeps_progress() {
        let mut attacker = Attacker::new(EntityId::new(0), sword(), 1);
        attacker.attack(EntityId::new(4));
        attacker.state = AttackState::Attacking;
        attacker.attack(EntityId::new(4));
        assert_eq!(attacker.state(), AttackState::Attacking);

        attacker.attack(EntityId::new(5));
        assert_eq!(attacker.state(), AttackState::Check);
        assert_eq!(attacker.target(), Some(EntityId::new(5)));
    }

    #[test]
    fn cooldown_is_strict() {
        let mut attacker = Attacker::new(EntityId::new(0), sword(), 1);
        assert!(attacker.cooldown_elapsed(0));
        attacker.timer = Some(5);
        assert!(!attacker.cooldown_elapsed(15));
        assert!(attacker.cooldown_elapsed(16));
    }
}
