//! Game shapes: which labels a zone draws from and how many it picks.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// One zone of a lottery game: an ordered pool of unique labels and the
/// number of labels drawn from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawVariant")]
pub struct GameVariant {
    name: String,
    labels: Vec<String>,
    pick: usize,
}

#[derive(Deserialize)]
struct RawVariant {
    name: String,
    labels: Vec<String>,
    pick: usize,
}

impl TryFrom<RawVariant> for GameVariant {
    type Error = Error;

    fn try_from(raw: RawVariant) -> Result<Self> {
        Self::new(raw.name, raw.labels, raw.pick)
    }
}

impl GameVariant {
    pub fn new(name: impl Into<String>, labels: Vec<String>, pick: usize) -> Result<Self> {
        let name = name.into();
        if labels.is_empty() {
            return Err(Error::InvalidConfig(format!("variant {name:?} has no labels")));
        }
        if pick == 0 || pick > labels.len() {
            return Err(Error::InvalidConfig(format!(
                "variant {name:?} picks {pick} of {} labels",
                labels.len()
            )));
        }
        let mut seen = HashSet::with_capacity(labels.len());
        if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(Error::InvalidConfig(format!(
                "variant {name:?} repeats label {dup:?}"
            )));
        }
        Ok(Self { name, labels, pick })
    }

    /// Labels `01..=count`, zero-padded to two digits.
    pub fn numbered(name: impl Into<String>, count: usize, pick: usize) -> Result<Self> {
        Self::new(name, numbered_labels(count), pick)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn pool_size(&self) -> usize {
        self.labels.len()
    }

    pub fn pick(&self) -> usize {
        self.pick
    }
}

fn numbered_labels(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("{n:02}")).collect()
}

/// A named game made of one or more zones, drawn in order from one hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    name: String,
    zones: Vec<GameVariant>,
}

impl Game {
    pub fn new(name: impl Into<String>, zones: Vec<GameVariant>) -> Result<Self> {
        let name = name.into();
        if zones.is_empty() {
            return Err(Error::InvalidConfig(format!("game {name:?} has no zones")));
        }
        Ok(Self { name, zones })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zones(&self) -> &[GameVariant] {
        &self.zones
    }
}

/// Lookup table of zones and games by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    variants: BTreeMap<String, GameVariant>,
    games: BTreeMap<String, Game>,
}

impl Registry {
    /// Empty registry, for callers defining only their own shapes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared registry with the built-in games.
    ///
    /// * `double-color-ball`: `red` 33 choose 6, then `blue` 16 choose 1.
    /// * `super-lotto`: `front` 35 choose 5, then `back` 12 choose 2.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: OnceLock<Registry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let zone = |name: &str, count: usize, pick: usize| GameVariant {
                name: name.to_owned(),
                labels: numbered_labels(count),
                pick,
            };
            let mut registry = Registry::new();
            let games = [
                ("double-color-ball", [zone("red", 33, 6), zone("blue", 16, 1)]),
                ("super-lotto", [zone("front", 35, 5), zone("back", 12, 2)]),
            ];
            for (name, zones) in games {
                let game = Game {
                    name: name.to_owned(),
                    zones: zones.to_vec(),
                };
                registry.register_game(game);
            }
            registry
        })
    }

    /// Add a game; its zones become addressable by name too.
    pub fn register_game(&mut self, game: Game) {
        for zone in &game.zones {
            self.register_variant(zone.clone());
        }
        self.games.insert(game.name.clone(), game);
    }

    pub fn register_variant(&mut self, variant: GameVariant) {
        self.variants.insert(variant.name.clone(), variant);
    }

    pub fn variant(&self, name: &str) -> Result<&GameVariant> {
        self.variants
            .get(name)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown game variant {name:?}")))
    }

    pub fn game(&self, name: &str) -> Result<&Game> {
        self.games
            .get(name)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown game {name:?}")))
    }

    pub fn game_names(&self) -> impl Iterator<Item = &str> {
        self.games.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_games_have_expected_shapes() {
        let registry = Registry::builtin();
        let dcb = registry.game("double-color-ball").unwrap();
        let shapes: Vec<(&str, usize, usize)> = dcb
            .zones()
            .iter()
            .map(|z| (z.name(), z.pool_size(), z.pick()))
            .collect();
        assert_eq!(shapes, vec![("red", 33, 6), ("blue", 16, 1)]);

        let lotto = registry.game("super-lotto").unwrap();
        let shapes: Vec<(&str, usize, usize)> = lotto
            .zones()
            .iter()
            .map(|z| (z.name(), z.pool_size(), z.pick()))
            .collect();
        assert_eq!(shapes, vec![("front", 35, 5), ("back", 12, 2)]);
    }

    #[test]
    fn numbered_labels_are_zero_padded() {
        let blue = Registry::builtin().variant("blue").unwrap();
        assert_eq!(blue.labels().first().map(String::as_str), Some("01"));
        assert_eq!(blue.labels().last().map(String::as_str), Some("16"));
    }

    #[test]
    fn unknown_names_are_config_errors() {
        let registry = Registry::builtin();
        assert!(matches!(registry.game("keno"), Err(Error::InvalidConfig(_))));
        assert!(matches!(registry.variant("green"), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn variant_validation() {
        assert!(GameVariant::numbered("empty", 0, 1).is_err());
        assert!(GameVariant::numbered("zero", 5, 0).is_err());
        assert!(GameVariant::numbered("too-many", 5, 6).is_err());
        let dup = vec!["a".to_owned(), "b".to_owned(), "a".to_owned()];
        assert!(GameVariant::new("dup", dup, 1).is_err());
        assert!(GameVariant::numbered("all", 5, 5).is_ok());
    }

    #[test]
    fn registry_accepts_new_shapes() {
        let mut registry = Registry::builtin().clone();
        let pick3 = GameVariant::numbered("digits", 10, 3).unwrap();
        registry.register_game(Game::new("pick-3", vec![pick3]).unwrap());
        assert_eq!(registry.game("pick-3").unwrap().zones().len(), 1);
        assert_eq!(registry.variant("digits").unwrap().pick(), 3);
        assert!(registry.game_names().any(|n| n == "double-color-ball"));
    }
}
