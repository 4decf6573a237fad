use crate::error::{Result, StoreError};
use crate::serialization::{from_json, to_json};
use chrono::{DateTime, Utc};
use felis_core::EvolutionStep;
use felis_data::{
    CatId, EventRecord, EventType, EvolutionData, EvolutionEvent, EvolutionStage, GeneticProfile,
    InheritanceType, Mutation, TraitInheritancePattern,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Read-only source of trait inheritance patterns.
pub trait TraitPatternCatalog {
    fn patterns(&self) -> Result<Vec<TraitInheritancePattern>>;
}

/// Persistence of genetic profiles.
pub trait GeneticStore {
    fn load_profile(&self, cat_id: CatId) -> Result<Option<GeneticProfile>>;

    /// Stores a new profile; fails with `Conflict` if the cat already has one.
    fn insert_profile(&self, profile: &GeneticProfile) -> Result<()>;

    /// Appends to an existing profile's mutation history and returns the profile.
    fn append_mutation(&self, cat_id: CatId, mutation: &Mutation) -> Result<GeneticProfile>;
}

/// Persistence of evolution state and its event log.
pub trait EvolutionStore {
    fn load_evolution(&self, cat_id: CatId) -> Result<Option<EvolutionData>>;

    /// Runs `step` against the cat's current state inside one transaction.
    ///
    /// A missing row is initialized first. The event is appended and the row
    /// replaced only if `step` succeeds; any failure rolls everything back.
    fn apply_event<F>(&self, cat_id: CatId, now: DateTime<Utc>, step: F) -> Result<EvolutionEvent>
    where
        F: FnOnce(&EvolutionData) -> std::result::Result<EvolutionStep, felis_core::EvolutionFault>;

    /// Recorded events for a cat, oldest first.
    fn events_for(&self, cat_id: CatId) -> Result<Vec<EvolutionEvent>>;
}

/// Fixed in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    patterns: Vec<TraitInheritancePattern>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new(patterns: Vec<TraitInheritancePattern>) -> Self {
        Self { patterns }
    }
}

impl TraitPatternCatalog for StaticCatalog {
    fn patterns(&self) -> Result<Vec<TraitInheritancePattern>> {
        Ok(self.patterns.clone())
    }
}

/// SQLite-backed store for the catalog, profiles and evolution records.
///
/// The connection sits behind a mutex, so every transaction, including the
/// read-modify-write of an evolution event, runs alone.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            StoreError::from(e).with_context(format!("opening {:?}", path.as_ref()))
        })?;
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous = NORMAL;");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        init_db(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts or replaces catalog rows by trait name. Returns the number written.
    pub fn seed_catalog(&self, patterns: &[TraitInheritancePattern]) -> Result<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for pattern in patterns {
            tx.execute(
                "INSERT INTO trait_inheritance_patterns
                    (trait_name, inheritance_type, gene_markers, dominance_factors, mutation_rates, description)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                  ON CONFLICT(trait_name) DO UPDATE SET
                     inheritance_type = excluded.inheritance_type,
                     gene_markers = excluded.gene_markers,
                     dominance_factors = excluded.dominance_factors,
                     mutation_rates = excluded.mutation_rates,
                     description = excluded.description",
                params![
                    pattern.trait_name,
                    inheritance_type_name(pattern.inheritance_type),
                    to_json(&pattern.gene_markers)?,
                    to_json(&pattern.dominance_factors)?,
                    to_json(&pattern.mutation_rates)?,
                    pattern.description,
                ],
            )?;
        }
        tx.commit()?;
        tracing::info!(patterns = patterns.len(), "Trait catalog seeded");
        Ok(patterns.len())
    }
}

impl TraitPatternCatalog for SqliteStore {
    fn patterns(&self) -> Result<Vec<TraitInheritancePattern>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT trait_name, inheritance_type, gene_markers, dominance_factors, mutation_rates, description
             FROM trait_inheritance_patterns ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut patterns = Vec::new();
        for row in rows {
            let (trait_name, kind, markers, dominance, rates, description) = row?;
            patterns.push(TraitInheritancePattern {
                inheritance_type: parse_inheritance_type(&kind)
                    .map_err(|e| e.with_context(format!("trait '{trait_name}'")))?,
                trait_name,
                gene_markers: from_json(&markers)?,
                dominance_factors: from_json(&dominance)?,
                mutation_rates: from_json(&rates)?,
                description,
            });
        }
        Ok(patterns)
    }
}

impl GeneticStore for SqliteStore {
    fn load_profile(&self, cat_id: CatId) -> Result<Option<GeneticProfile>> {
        load_profile_row(&self.lock(), cat_id)
    }

    fn insert_profile(&self, profile: &GeneticProfile) -> Result<()> {
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT INTO cat_genetic_profiles
                (cat_id, genetic_markers, trait_data, mutation_history, generation, lineage_path)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                profile.cat_id,
                to_json(&profile.genetic_markers)?,
                to_json(&profile.trait_data)?,
                to_json(&profile.mutation_history)?,
                profile.generation,
                to_json(&profile.lineage_path)?,
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::conflict(format!(
                    "genetic profile for cat {}",
                    profile.cat_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn append_mutation(&self, cat_id: CatId, mutation: &Mutation) -> Result<GeneticProfile> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut profile = load_profile_row(&tx, cat_id)?
            .ok_or_else(|| StoreError::not_found(format!("genetic profile for cat {cat_id}")))?;
        profile.mutation_history.push(mutation.clone());
        tx.execute(
            "UPDATE cat_genetic_profiles SET mutation_history = ?1 WHERE cat_id = ?2",
            params![to_json(&profile.mutation_history)?, cat_id],
        )?;
        tx.commit()?;
        Ok(profile)
    }
}

impl EvolutionStore for SqliteStore {
    fn load_evolution(&self, cat_id: CatId) -> Result<Option<EvolutionData>> {
        load_evolution_row(&self.lock(), cat_id)
    }

    fn apply_event<F>(&self, cat_id: CatId, now: DateTime<Utc>, step: F) -> Result<EvolutionEvent>
    where
        F: FnOnce(&EvolutionData) -> std::result::Result<EvolutionStep, felis_core::EvolutionFault>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let current = match load_evolution_row(&tx, cat_id)? {
            Some(data) => data,
            None => {
                let data = EvolutionData::new(cat_id, now);
                insert_evolution_row(&tx, &data)?;
                data
            }
        };

        let EvolutionStep { next, record } = step(&current)?;
        if next.cat_id != cat_id || record.cat_id != cat_id {
            return Err(StoreError::validation(format!(
                "evolution step for cat {cat_id} produced state for another cat"
            )));
        }
        if next.experience_points < current.experience_points
            || next.evolution_stage < current.evolution_stage
        {
            return Err(StoreError::validation(format!(
                "evolution of cat {cat_id} would move backwards"
            )));
        }

        tx.execute(
            "INSERT INTO cat_evolution_events
                (cat_id, event_type, event_data, experience_gain, adaptations, mutations, new_stage, created_at)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.cat_id,
                record.event_type.as_str(),
                to_json(&record.event_data)?,
                record.experience_gain,
                to_json(&record.adaptations)?,
                to_json(&record.mutations)?,
                record.new_stage.level(),
                record.created_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE cat_evolution_data SET
                experience_points = ?1, evolution_stage = ?2, adaptations = ?3, mutations = ?4, updated_at = ?5
              WHERE cat_id = ?6",
            params![
                next.experience_points,
                next.evolution_stage.level(),
                to_json(&next.adaptations)?,
                to_json(&next.mutations)?,
                next.updated_at.to_rfc3339(),
                cat_id,
            ],
        )?;

        tx.commit()?;
        Ok(EvolutionEvent { id, record })
    }

    fn events_for(&self, cat_id: CatId) -> Result<Vec<EvolutionEvent>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, event_type, event_data, experience_gain, adaptations, mutations, new_stage, created_at
             FROM cat_evolution_events WHERE cat_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![cat_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, u8>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, event_type, data, gain, adaptations, mutations, stage, created_at) = row?;
            events.push(EvolutionEvent {
                id,
                record: EventRecord {
                    cat_id,
                    event_type: EventType::from(event_type),
                    event_data: from_json(&data)?,
                    experience_gain: gain,
                    adaptations: from_json(&adaptations)?,
                    mutations: from_json(&mutations)?,
                    new_stage: parse_stage(stage)?,
                    created_at: parse_timestamp(&created_at)?,
                },
            });
        }
        Ok(events)
    }
}

fn load_profile_row(conn: &Connection, cat_id: CatId) -> Result<Option<GeneticProfile>> {
    let row = conn
        .query_row(
            "SELECT genetic_markers, trait_data, mutation_history, generation, lineage_path
             FROM cat_genetic_profiles WHERE cat_id = ?1",
            params![cat_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((markers, traits, history, generation, lineage)) = row else {
        return Ok(None);
    };
    Ok(Some(GeneticProfile {
        cat_id,
        genetic_markers: from_json(&markers)?,
        trait_data: from_json(&traits)?,
        mutation_history: from_json(&history)?,
        generation,
        lineage_path: from_json(&lineage)?,
    }))
}

fn load_evolution_row(conn: &Connection, cat_id: CatId) -> Result<Option<EvolutionData>> {
    let row = conn
        .query_row(
            "SELECT experience_points, evolution_stage, adaptations, mutations, created_at, updated_at
             FROM cat_evolution_data WHERE cat_id = ?1",
            params![cat_id],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u8>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((experience, stage, adaptations, mutations, created_at, updated_at)) = row else {
        return Ok(None);
    };
    Ok(Some(EvolutionData {
        cat_id,
        experience_points: experience,
        evolution_stage: parse_stage(stage)?,
        adaptations: from_json(&adaptations)?,
        mutations: from_json(&mutations)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    }))
}

fn insert_evolution_row(conn: &Connection, data: &EvolutionData) -> Result<()> {
    conn.execute(
        "INSERT INTO cat_evolution_data
            (cat_id, experience_points, evolution_stage, adaptations, mutations, created_at, updated_at)
          VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            data.cat_id,
            data.experience_points,
            data.evolution_stage.level(),
            to_json(&data.adaptations)?,
            to_json(&data.mutations)?,
            data.created_at.to_rfc3339(),
            data.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn inheritance_type_name(kind: InheritanceType) -> &'static str {
    match kind {
        InheritanceType::Simple => "simple",
        InheritanceType::Complex => "complex",
        InheritanceType::Polygenic => "polygenic",
    }
}

fn parse_inheritance_type(name: &str) -> Result<InheritanceType> {
    match name {
        "simple" => Ok(InheritanceType::Simple),
        "complex" => Ok(InheritanceType::Complex),
        "polygenic" => Ok(InheritanceType::Polygenic),
        other => Err(StoreError::serialization(format!(
            "unknown inheritance type '{other}'"
        ))),
    }
}

fn parse_stage(level: u8) -> Result<EvolutionStage> {
    EvolutionStage::try_from(level).map_err(StoreError::serialization)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::serialization(format!("invalid timestamp '{value}': {e}")))
}

fn init_db(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS trait_inheritance_patterns (
            trait_name TEXT PRIMARY KEY,
            inheritance_type TEXT NOT NULL,
            gene_markers TEXT NOT NULL DEFAULT '[]',
            dominance_factors TEXT NOT NULL DEFAULT '{}',
            mutation_rates TEXT NOT NULL,
            description TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cat_genetic_profiles (
            cat_id INTEGER PRIMARY KEY,
            genetic_markers TEXT NOT NULL,
            trait_data TEXT NOT NULL,
            mutation_history TEXT NOT NULL DEFAULT '[]',
            generation INTEGER NOT NULL DEFAULT 1,
            lineage_path TEXT NOT NULL DEFAULT '[]'
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cat_evolution_data (
            cat_id INTEGER PRIMARY KEY,
            experience_points INTEGER NOT NULL DEFAULT 0,
            evolution_stage INTEGER NOT NULL DEFAULT 1,
            adaptations TEXT NOT NULL DEFAULT '[]',
            mutations TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cat_evolution_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cat_id INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            event_data TEXT NOT NULL,
            experience_gain INTEGER NOT NULL,
            adaptations TEXT NOT NULL DEFAULT '[]',
            mutations TEXT NOT NULL DEFAULT '[]',
            new_stage INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(cat_id) REFERENCES cat_evolution_data(cat_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_evolution_events_cat ON cat_evolution_events(cat_id)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use felis_core::catalog::default_patterns;
    use felis_core::config::EvolutionConfig;
    use felis_core::{EvolutionEngine, EvolutionFault, ScriptedRandom};
    use felis_data::{EventData, Gene, MutationOrigin, TraitValue};

    fn profile(cat_id: CatId) -> GeneticProfile {
        let mut p = GeneticProfile::founder(cat_id);
        p.genetic_markers
            .insert("pattern_type".into(), Gene::from("tabby"));
        p.trait_data
            .insert("color".into(), TraitValue::Allele("black".into()));
        p
    }

    #[test]
    fn test_catalog_roundtrip_keeps_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let patterns = default_patterns();
        assert_eq!(store.seed_catalog(&patterns).unwrap(), patterns.len());
        assert_eq!(store.patterns().unwrap(), patterns);

        // Re-seeding updates in place.
        store.seed_catalog(&patterns[..1]).unwrap();
        assert_eq!(store.patterns().unwrap().len(), patterns.len());
    }

    #[test]
    fn test_profile_insert_and_conflict() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.load_profile(1).unwrap(), None);
        store.insert_profile(&profile(1)).unwrap();
        assert_eq!(store.load_profile(1).unwrap(), Some(profile(1)));
        assert!(matches!(
            store.insert_profile(&profile(1)),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_append_mutation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mutation = Mutation {
            origin: MutationOrigin::Trigger("stress".into()),
            kind: "resistance".into(),
            strength: 0.4,
            permanent: false,
            effect: None,
            timestamp: Utc::now(),
        };
        assert!(matches!(
            store.append_mutation(2, &mutation),
            Err(StoreError::NotFound(_))
        ));
        store.insert_profile(&profile(2)).unwrap();
        let updated = store.append_mutation(2, &mutation).unwrap();
        assert_eq!(updated.mutation_history, vec![mutation]);
        assert_eq!(store.load_profile(2).unwrap(), Some(updated));
    }

    #[test]
    fn test_apply_event_commits_state_and_log() {
        let store = SqliteStore::open_in_memory().unwrap();
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let now = Utc::now();
        let mut rng = ScriptedRandom::new([0.9, 0.9, 0.9, 0.9]);

        let event = store
            .apply_event(5, now, |current| {
                engine.advance(
                    current,
                    EventType::Training,
                    EventData::new().with_base_experience(600.0),
                    &mut rng,
                    now,
                )
            })
            .unwrap();

        assert_eq!(event.record.experience_gain, 1200);
        let data = store.load_evolution(5).unwrap().unwrap();
        assert_eq!(data.experience_points, 1200);
        assert_eq!(data.evolution_stage, EvolutionStage::Evolved);
        assert_eq!(store.events_for(5).unwrap(), vec![event]);
    }

    #[test]
    fn test_failed_step_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.apply_event(9, Utc::now(), |_| {
            Err(EvolutionFault::ExperienceOverflow { cat_id: 9 })
        });
        assert!(matches!(result, Err(StoreError::Evolution(_))));
        assert_eq!(store.load_evolution(9).unwrap(), None);
        assert!(store.events_for(9).unwrap().is_empty());
    }
}
