//! Static entity catalog: costs, build durations, producers and tech requirements.
//!
//! The catalog is loaded once and shared read-only by every search branch.
//! Prerequisites form a forest: each entity type names at most one parent.

use std::collections::HashMap;
use std::ops::Index;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::config::EconomyRates;
use crate::error::PlannerError;
use crate::types::{Resource, Ticks, UnitId};

// ============================================================================
// Role - Which completion effect an entity type triggers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Harvests minerals once complete
    ResourceWorker,
    /// Opens a vespene geyser; completion pulls workers off minerals
    Extractor,
    /// Exists to raise the population cap
    Supply,
    #[default]
    Standard,
}

// ============================================================================
// Producer - How an entity type gets made
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Producer {
    /// A structure that stays occupied for the duration of the order
    Structure(UnitId),
    /// A worker that walks off to place the target and is not consumed
    WorkerRelocation(UnitId),
    /// Produces the target in the game but is not modelled by the planner
    Excluded { unit: UnitId, reason: String },
}

impl Producer {
    pub fn unit(&self) -> UnitId {
        match self {
            Producer::Structure(unit) | Producer::WorkerRelocation(unit) => *unit,
            Producer::Excluded { unit, .. } => *unit,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Producer::Excluded { .. })
    }
}

// ============================================================================
// Entity Type - One catalog record
// ============================================================================

#[derive(Debug, Clone)]
pub struct EntityType {
    pub name: String,
    pub minerals: f64,
    pub vespene: f64,
    pub build_ticks: Ticks,
    /// Population consumed while the entity exists
    pub population: u32,
    /// Population cap raised on completion
    pub supply_provided: u32,
    pub role: Role,
    pub producers: Vec<Producer>,
    pub prerequisite: Option<UnitId>,
}

impl EntityType {
    pub fn cost(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Minerals => self.minerals,
            Resource::Vespene => self.vespene,
        }
    }

    /// Producers the planner is allowed to use, in catalog order
    pub fn supported_producers(&self) -> impl Iterator<Item = &Producer> {
        self.producers.iter().filter(|p| p.is_supported())
    }

    pub fn is_placed_by_worker(&self) -> bool {
        self.supported_producers()
            .any(|p| matches!(p, Producer::WorkerRelocation(_)))
    }
}

// ============================================================================
// Records - Serialized form of the catalog (names instead of ids)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProducerRecord {
    Structure { name: String },
    WorkerRelocation { name: String },
    Excluded { name: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    #[serde(default)]
    pub minerals: f64,
    #[serde(default)]
    pub vespene: f64,
    pub build_ticks: Ticks,
    #[serde(default)]
    pub population: u32,
    #[serde(default)]
    pub supply_provided: u32,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub producers: Vec<ProducerRecord>,
    #[serde(default)]
    pub prerequisite: Option<String>,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>, minerals: f64, vespene: f64, build_ticks: Ticks) -> Self {
        Self {
            name: name.into(),
            minerals,
            vespene,
            build_ticks,
            population: 0,
            supply_provided: 0,
            role: Role::Standard,
            producers: Vec::new(),
            prerequisite: None,
        }
    }

    pub fn with_population(mut self, population: u32) -> Self {
        self.population = population;
        self
    }

    pub fn with_supply(mut self, supply: u32) -> Self {
        self.supply_provided = supply;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn trained_at(mut self, structure: &str) -> Self {
        self.producers.push(ProducerRecord::Structure {
            name: structure.to_string(),
        });
        self
    }

    pub fn placed_by(mut self, worker: &str) -> Self {
        self.producers.push(ProducerRecord::WorkerRelocation {
            name: worker.to_string(),
        });
        self
    }

    pub fn excluded(mut self, producer: &str, reason: &str) -> Self {
        self.producers.push(ProducerRecord::Excluded {
            name: producer.to_string(),
            reason: reason.to_string(),
        });
        self
    }

    pub fn requires(mut self, prerequisite: &str) -> Self {
        self.prerequisite = Some(prerequisite.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    entities: Vec<EntityRecord>,
    #[serde(default)]
    rates: EconomyRates,
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: SlotMap<UnitId, EntityType>,
    by_name: HashMap<String, UnitId>,
    rates: EconomyRates,
}

impl Catalog {
    /// Build a catalog from name-keyed records.
    ///
    /// Ids are allocated in record order, so producers and prerequisites may
    /// refer to records further down the list.
    pub fn from_records(records: Vec<EntityRecord>, rates: EconomyRates) -> Result<Self, PlannerError> {
        let mut entries: SlotMap<UnitId, EntityType> = SlotMap::with_key();
        let mut by_name = HashMap::new();

        for record in &records {
            if !(record.build_ticks > 0.0) {
                return Err(PlannerError::InvalidEntity {
                    name: record.name.clone(),
                    reason: format!("build_ticks must be positive, got {}", record.build_ticks),
                });
            }
            if record.minerals < 0.0 || record.vespene < 0.0 {
                return Err(PlannerError::InvalidEntity {
                    name: record.name.clone(),
                    reason: "costs cannot be negative".to_string(),
                });
            }

            let id = entries.insert(EntityType {
                name: record.name.clone(),
                minerals: record.minerals,
                vespene: record.vespene,
                build_ticks: record.build_ticks,
                population: record.population,
                supply_provided: record.supply_provided,
                role: record.role,
                producers: Vec::new(),
                prerequisite: None,
            });
            if by_name.insert(record.name.clone(), id).is_some() {
                return Err(PlannerError::DuplicateEntity(record.name.clone()));
            }
        }

        let resolve = |name: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| PlannerError::UnknownEntity(name.to_string()))
        };

        for record in &records {
            let id = resolve(&record.name)?;
            let producers = record
                .producers
                .iter()
                .map(|p| -> Result<Producer, PlannerError> {
                    Ok(match p {
                        ProducerRecord::Structure { name } => Producer::Structure(resolve(name)?),
                        ProducerRecord::WorkerRelocation { name } => {
                            Producer::WorkerRelocation(resolve(name)?)
                        }
                        ProducerRecord::Excluded { name, reason } => Producer::Excluded {
                            unit: resolve(name)?,
                            reason: reason.clone(),
                        },
                    })
                })
                .collect::<Result<Vec<_>, PlannerError>>()?;
            let prerequisite = record.prerequisite.as_deref().map(resolve).transpose()?;

            let entry = &mut entries[id];
            entry.producers = producers;
            entry.prerequisite = prerequisite;
        }

        let catalog = Self {
            entries,
            by_name,
            rates,
        };
        catalog.check_prerequisite_forest()?;
        Ok(catalog)
    }

    /// Load a catalog from `{"entities": [...], "rates": {...}}`.
    pub fn from_json(json: &str) -> Result<Self, PlannerError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_records(file.entities, file.rates)
    }

    /// The built-in Protoss catalog with default economy rates.
    pub fn protoss() -> Self {
        Self::from_records(protoss_records(), EconomyRates::default())
            .unwrap_or_else(|e| panic!("built-in Protoss catalog is invalid: {e}"))
    }

    fn check_prerequisite_forest(&self) -> Result<(), PlannerError> {
        for (id, entry) in &self.entries {
            let mut current = entry.prerequisite;
            let mut steps = 0;
            while let Some(parent) = current {
                if parent == id || steps > self.entries.len() {
                    return Err(PlannerError::PrerequisiteCycle(entry.name.clone()));
                }
                steps += 1;
                current = self.entries[parent].prerequisite;
            }
        }
        Ok(())
    }

    pub fn rates(&self) -> &EconomyRates {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: UnitId) -> Option<&EntityType> {
        self.entries.get(id)
    }

    pub fn id(&self, name: &str) -> Option<UnitId> {
        self.by_name.get(name).copied()
    }

    pub fn resolve(&self, name: &str) -> Result<UnitId, PlannerError> {
        self.id(name)
            .ok_or_else(|| PlannerError::UnknownEntity(name.to_string()))
    }

    pub fn name(&self, id: UnitId) -> &str {
        self.entries.get(id).map(|e| e.name.as_str()).unwrap_or("<unknown>")
    }

    /// All entity types in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &EntityType)> {
        self.entries.iter()
    }

    /// The prerequisite chain of `id`, nearest parent first. Does not include `id`.
    pub fn prerequisites(&self, id: UnitId) -> impl Iterator<Item = UnitId> + '_ {
        std::iter::successors(self.entries[id].prerequisite, move |parent| {
            self.entries[*parent].prerequisite
        })
    }

    /// Minerals needed to start `id`, including the walk-off surcharge when a
    /// worker places it.
    pub fn mineral_requirement(&self, id: UnitId) -> f64 {
        let entry = &self.entries[id];
        if entry.is_placed_by_worker() {
            entry.minerals + self.rates.relocation_surcharge
        } else {
            entry.minerals
        }
    }

    pub fn requirement(&self, id: UnitId, resource: Resource) -> f64 {
        match resource {
            Resource::Minerals => self.mineral_requirement(id),
            Resource::Vespene => self.entries[id].vespene,
        }
    }

    /// First entity type with the given role, in catalog order
    pub fn with_role(&self, role: Role) -> Option<UnitId> {
        self.entries
            .iter()
            .find(|(_, e)| e.role == role)
            .map(|(id, _)| id)
    }
}

impl Index<UnitId> for Catalog {
    type Output = EntityType;

    fn index(&self, id: UnitId) -> &EntityType {
        &self.entries[id]
    }
}

// ============================================================================
// Built-in Protoss data
// ============================================================================

const WARP_IN: &str = "warp-in needs placement inside a power field";

/// Costs and game-loop build durations for the Protoss tech tree.
/// Gateway and Forge list the Pylon as their prerequisite because they need power.
pub fn protoss_records() -> Vec<EntityRecord> {
    vec![
        // Economy
        EntityRecord::new("Nexus", 400.0, 0.0, 1600.0)
            .with_supply(15)
            .placed_by("Probe"),
        EntityRecord::new("Probe", 50.0, 0.0, 272.0)
            .with_population(1)
            .with_role(Role::ResourceWorker)
            .trained_at("Nexus"),
        EntityRecord::new("Pylon", 100.0, 0.0, 400.0)
            .with_supply(8)
            .with_role(Role::Supply)
            .placed_by("Probe"),
        EntityRecord::new("Assimilator", 75.0, 0.0, 480.0)
            .with_role(Role::Extractor)
            .placed_by("Probe"),
        // Structures
        EntityRecord::new("Gateway", 150.0, 0.0, 1040.0)
            .placed_by("Probe")
            .requires("Pylon"),
        EntityRecord::new("WarpGate", 0.0, 0.0, 160.0)
            .excluded("Gateway", "morphs from a gateway after warp gate research")
            .requires("CyberneticsCore"),
        EntityRecord::new("Forge", 150.0, 0.0, 720.0)
            .placed_by("Probe")
            .requires("Pylon"),
        EntityRecord::new("CyberneticsCore", 150.0, 0.0, 800.0)
            .placed_by("Probe")
            .requires("Gateway"),
        EntityRecord::new("PhotonCannon", 150.0, 0.0, 640.0)
            .placed_by("Probe")
            .requires("Forge"),
        EntityRecord::new("TwilightCouncil", 150.0, 100.0, 800.0)
            .placed_by("Probe")
            .requires("CyberneticsCore"),
        EntityRecord::new("RoboticsFacility", 150.0, 100.0, 1040.0)
            .placed_by("Probe")
            .requires("CyberneticsCore"),
        EntityRecord::new("Stargate", 150.0, 150.0, 960.0)
            .placed_by("Probe")
            .requires("CyberneticsCore"),
        // Gateway units
        EntityRecord::new("Zealot", 100.0, 0.0, 608.0)
            .with_population(2)
            .trained_at("Gateway")
            .excluded("WarpGate", WARP_IN),
        EntityRecord::new("Stalker", 125.0, 50.0, 672.0)
            .with_population(2)
            .trained_at("Gateway")
            .excluded("WarpGate", WARP_IN)
            .requires("CyberneticsCore"),
        EntityRecord::new("Sentry", 50.0, 100.0, 592.0)
            .with_population(2)
            .trained_at("Gateway")
            .excluded("WarpGate", WARP_IN)
            .requires("CyberneticsCore"),
        EntityRecord::new("Adept", 100.0, 25.0, 672.0)
            .with_population(2)
            .trained_at("Gateway")
            .excluded("WarpGate", WARP_IN)
            .requires("CyberneticsCore"),
        // Robotics and Stargate units
        EntityRecord::new("Immortal", 275.0, 100.0, 880.0)
            .with_population(4)
            .trained_at("RoboticsFacility"),
        EntityRecord::new("Observer", 25.0, 75.0, 480.0)
            .with_population(1)
            .trained_at("RoboticsFacility"),
        EntityRecord::new("VoidRay", 250.0, 150.0, 960.0)
            .with_population(4)
            .trained_at("Stargate"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protoss_catalog_resolves() {
        let catalog = Catalog::protoss();
        assert_eq!(catalog.len(), protoss_records().len());

        let stalker = catalog.resolve("Stalker").unwrap();
        assert_eq!(catalog.name(stalker), "Stalker");
        assert_eq!(catalog[stalker].vespene, 50.0);
        assert!(catalog.resolve("Carrier").is_err());
    }

    #[test]
    fn test_prerequisite_chain_walks_to_root() {
        let catalog = Catalog::protoss();
        let stalker = catalog.resolve("Stalker").unwrap();

        let chain: Vec<&str> = catalog
            .prerequisites(stalker)
            .map(|id| catalog.name(id))
            .collect();
        assert_eq!(chain, vec!["CyberneticsCore", "Gateway", "Pylon"]);

        let probe = catalog.resolve("Probe").unwrap();
        assert_eq!(catalog.prerequisites(probe).count(), 0);
    }

    #[test]
    fn test_excluded_producers_are_not_supported() {
        let catalog = Catalog::protoss();
        let zealot = catalog.resolve("Zealot").unwrap();
        let gateway = catalog.resolve("Gateway").unwrap();

        assert_eq!(catalog[zealot].producers.len(), 2);
        let supported: Vec<&Producer> = catalog[zealot].supported_producers().collect();
        assert_eq!(supported, vec![&Producer::Structure(gateway)]);

        let warpgate = catalog.resolve("WarpGate").unwrap();
        assert_eq!(catalog[warpgate].supported_producers().count(), 0);
    }

    #[test]
    fn test_mineral_requirement_includes_walk_off() {
        let catalog = Catalog::protoss();
        let pylon = catalog.resolve("Pylon").unwrap();
        let zealot = catalog.resolve("Zealot").unwrap();

        assert_eq!(catalog.mineral_requirement(pylon), 110.0);
        assert_eq!(catalog.mineral_requirement(zealot), 100.0);
        assert_eq!(catalog.requirement(zealot, Resource::Vespene), 0.0);
    }

    #[test]
    fn test_roles() {
        let catalog = Catalog::protoss();
        assert_eq!(catalog.with_role(Role::ResourceWorker), catalog.id("Probe"));
        assert_eq!(catalog.with_role(Role::Extractor), catalog.id("Assimilator"));
        assert_eq!(catalog.with_role(Role::Supply), catalog.id("Pylon"));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "entities": [
                {"name": "Hall", "minerals": 400, "build_ticks": 1000, "supply_provided": 10},
                {"name": "Peon", "minerals": 50, "build_ticks": 200, "population": 1,
                 "role": "resource_worker",
                 "producers": [{"kind": "structure", "name": "Hall"}]},
                {"name": "Barracks", "minerals": 150, "build_ticks": 800,
                 "producers": [{"kind": "worker_relocation", "name": "Peon"}]},
                {"name": "Grunt", "minerals": 60, "build_ticks": 300, "population": 1,
                 "producers": [{"kind": "structure", "name": "Barracks"}],
                 "prerequisite": "Barracks"}
            ],
            "rates": {"relocation_surcharge": 0}
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 4);

        let barracks = catalog.resolve("Barracks").unwrap();
        assert_eq!(catalog.mineral_requirement(barracks), 150.0);
        assert_eq!(catalog.with_role(Role::ResourceWorker), catalog.id("Peon"));
        assert_eq!(catalog.rates().hard_population_cap, 200);
    }

    #[test]
    fn test_unknown_producer_is_rejected() {
        let records = vec![EntityRecord::new("Zealot", 100.0, 0.0, 608.0).trained_at("Gateway")];
        let err = Catalog::from_records(records, EconomyRates::default()).unwrap_err();
        assert!(matches!(err, PlannerError::UnknownEntity(ref name) if name == "Gateway"));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let records = vec![
            EntityRecord::new("Pylon", 100.0, 0.0, 400.0),
            EntityRecord::new("Pylon", 100.0, 0.0, 400.0),
        ];
        let err = Catalog::from_records(records, EconomyRates::default()).unwrap_err();
        assert!(matches!(err, PlannerError::DuplicateEntity(_)));
    }

    #[test]
    fn test_prerequisite_cycle_is_rejected() {
        let records = vec![
            EntityRecord::new("A", 10.0, 0.0, 10.0).requires("B"),
            EntityRecord::new("B", 10.0, 0.0, 10.0).requires("C"),
            EntityRecord::new("C", 10.0, 0.0, 10.0).requires("A"),
        ];
        let err = Catalog::from_records(records, EconomyRates::default()).unwrap_err();
        assert!(matches!(err, PlannerError::PrerequisiteCycle(_)));
    }

    #[test]
    fn test_zero_build_time_is_rejected() {
        let records = vec![EntityRecord::new("Instant", 10.0, 0.0, 0.0)];
        let err = Catalog::from_records(records, EconomyRates::default()).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidEntity { .. }));
    }
}
