//! TOML scenario consumed by the simulator.

use std::collections::BTreeMap;

use lionengine_system_animation::Animation;
use lionengine_system_attack::WeaponRegistry;
use lionengine_system_production::ProducerConfig;
use lionengine_world::{CollisionConfig, MapConfig};
use serde::Deserialize;

/// Everything needed to boot a simulation.
#[derive(Debug, Deserialize)]
pub(crate) struct Scenario {
    /// Tile layout.
    pub(crate) map: MapConfig,
    /// Formulas, groups and the probes attached to bodies.
    #[serde(default)]
    pub(crate) collision: CollisionConfig,
    /// Animations referenced by kinds.
    #[serde(default)]
    pub(crate) animations: BTreeMap<String, Animation>,
    /// Weapons referenced by kinds.
    #[serde(default)]
    pub(crate) weapons: WeaponRegistry,
    /// Production rate shared by every producer.
    pub(crate) production: ProducerConfig,
    /// Entity kinds known to the factory.
    #[serde(default)]
    pub(crate) kinds: Vec<KindConfig>,
    /// Entities present on the first tick.
    #[serde(default)]
    pub(crate) units: Vec<UnitConfig>,
    /// Production orders queued on the first tick.
    #[serde(default)]
    pub(crate) orders: Vec<OrderConfig>,
    /// Attacks ordered on the first tick.
    #[serde(default)]
    pub(crate) attacks: Vec<AttackConfig>,
    /// Free-moving bodies resolved against the map.
    #[serde(default)]
    pub(crate) bodies: Vec<BodyConfig>,
    /// Map edits applied at given ticks.
    #[serde(default)]
    pub(crate) edits: Vec<EditConfig>,
}

impl Scenario {
    /// Parses a scenario from TOML text.
    pub(crate) fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Entity kind definition.
#[derive(Debug, Deserialize)]
pub(crate) struct KindConfig {
    pub(crate) name: String,
    pub(crate) life: u32,
    #[serde(default = "one")]
    pub(crate) width: u32,
    #[serde(default = "one")]
    pub(crate) height: u32,
    #[serde(default)]
    pub(crate) weapon: Option<String>,
    #[serde(default)]
    pub(crate) idle: Option<String>,
    #[serde(default)]
    pub(crate) attack: Option<String>,
}

/// Entity placed and activated before the first tick.
#[derive(Debug, Deserialize)]
pub(crate) struct UnitConfig {
    pub(crate) label: String,
    pub(crate) kind: String,
    pub(crate) column: u32,
    pub(crate) row: u32,
    pub(crate) owner: u32,
}

/// Production order queued on a labelled unit.
#[derive(Debug, Deserialize)]
pub(crate) struct OrderConfig {
    pub(crate) producer: String,
    pub(crate) kind: String,
    pub(crate) steps: u32,
    pub(crate) column: u32,
    pub(crate) row: u32,
}

/// Attack order between two labelled units.
#[derive(Debug, Deserialize)]
pub(crate) struct AttackConfig {
    pub(crate) attacker: String,
    pub(crate) target: String,
}

/// Body moving freely under gravity.
#[derive(Debug, Deserialize)]
pub(crate) struct BodyConfig {
    pub(crate) name: String,
    pub(crate) x: f64,
    pub(crate) y: f64,
    #[serde(default)]
    pub(crate) vx: f64,
    #[serde(default)]
    pub(crate) vy: f64,
    #[serde(default = "default_gravity")]
    pub(crate) gravity: f64,
}

/// Tile placed or removed at `tick`.
#[derive(Debug, Deserialize)]
pub(crate) struct EditConfig {
    pub(crate) tick: u64,
    pub(crate) column: u32,
    pub(crate) row: u32,
    #[serde(default)]
    pub(crate) remove: bool,
    #[serde(default)]
    pub(crate) sheet: u32,
    #[serde(default)]
    pub(crate) number: u32,
    #[serde(default)]
    pub(crate) group: Option<String>,
}

const fn one() -> u32 {
    1
}

const fn default_gravity() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_scenario_parses() {
        let scenario = Scenario::from_toml_str(include_str!("../scenarios/skirmish.toml"))
            .expect("bundled scenario parses");
        assert_eq!(scenario.map.tile_width, 16);
        assert!(scenario.animations.contains_key("swing"));
        assert!(scenario.weapons.get("bow").is_ok());
        assert_eq!(scenario.production.speed(), 0.5);
        assert_eq!(scenario.units.len(), 4);
        assert_eq!(scenario.orders.len(), 2);
        assert!(scenario.edits.iter().any(|edit| edit.remove));
    }

    #[test]
    fn missing_production_rate_is_rejected() {
        let text = r##"
            [map]
            tile_width = 16
            tile_height = 16
            layout = ["#"]
        "##;
        assert!(Scenario::from_toml_str(text).is_err());
    }

    #[test]
    fn kinds_default_to_single_tile_footprints() {
        let kind: KindConfig = toml::from_str(r#"name = "peasant"
life = 10"#)
        .expect("kind parses");
        assert_eq!((kind.width, kind.height), (1, 1));
        assert!(kind.weapon.is_none());
    }
}
