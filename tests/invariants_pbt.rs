use chrono::Utc;
use felis_core::catalog::default_patterns;
use felis_core::config::{EvolutionConfig, FitnessConfig, GeneticsConfig};
use felis_core::{
    EvolutionEngine, FitnessScorer, InheritanceCalculator, MutationEngine, PatternSet, SeededRandom,
};
use felis_data::{
    EventData, EvolutionData, EvolutionStage, Gene, GeneticProfile, InheritedTrait, Mutation,
    MutationOrigin, TraitValue,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

const TRAIT_NAMES: [&str; 6] = ["size", "color", "pattern", "temperament", "strength", "special"];
const COLORS: [&str; 5] = ["black", "white", "orange", "gray", "cream"];

prop_compose! {
    fn arb_markers()(
        markers in prop::collection::btree_map("[a-e]", prop_oneof![
            (0.0f64..1.0).prop_map(Gene::Level),
            prop::sample::select(COLORS.to_vec()).prop_map(Gene::from),
        ], 0..5)
    ) -> BTreeMap<String, Gene> {
        markers
    }
}

prop_compose! {
    fn arb_profile(cat_id: i64)(
        generation in 1u32..10_000,
        genetic_markers in arb_markers(),
        colors in prop::collection::vec(prop::sample::select(COLORS.to_vec()), 1..3),
        has_color in any::<bool>(),
        has_size in any::<bool>(),
        has_temperament in any::<bool>()
    ) -> GeneticProfile {
        let mut profile = GeneticProfile::founder(cat_id);
        profile.generation = generation;
        profile.genetic_markers = genetic_markers;
        if has_color {
            let colors = colors.into_iter().map(String::from).collect();
            profile.trait_data.insert("color".into(), TraitValue::Alleles(colors));
        }
        if has_size {
            let genes = ["body_mass", "height", "muscle_density", "skeletal_structure"]
                .iter()
                .map(|m| (m.to_string(), Gene::Level(0.5)))
                .collect();
            profile.trait_data.insert("size".into(), TraitValue::Genes(genes));
        }
        if has_temperament {
            profile.trait_data.insert("temperament".into(), TraitValue::Allele("calm".into()));
        }
        profile
    }
}

fn trait_mutation() -> Mutation {
    Mutation {
        origin: MutationOrigin::Trait("color".into()),
        kind: "color_shift".into(),
        strength: 1.0,
        permanent: true,
        effect: None,
        timestamp: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_fitness_stays_bounded(
        multipliers in prop::collection::vec(0.0f64..100.0, TRAIT_NAMES.len()),
        mutation_count in 0usize..8,
        mutation_impact in 0.0f64..5.0
    ) {
        let mut config = FitnessConfig { mutation_impact, ..FitnessConfig::default() };
        let mut traits = BTreeMap::new();
        for (name, multiplier) in TRAIT_NAMES.iter().zip(&multipliers) {
            config.trait_multipliers.insert((*name).to_string(), *multiplier);
            traits.insert(
                (*name).to_string(),
                InheritedTrait::Expressed { allele: "black".into() },
            );
        }
        let mutations = (0..mutation_count)
            .map(|i| (format!("trait_{i}"), trait_mutation()))
            .collect();

        let score = FitnessScorer::new(&config).score(&traits, &mutations);
        prop_assert!((0.0..=config.max_score).contains(&score), "score = {}", score);
    }

    #[test]
    fn test_mutation_probability_is_capped(
        p1 in arb_profile(1),
        p2 in arb_profile(2)
    ) {
        let config = GeneticsConfig::default();
        let p = MutationEngine::new(&config).mutation_probability(&p1, &p2);
        prop_assert!(p >= 0.0);
        prop_assert!(p <= config.mutation_cap, "p = {}", p);
    }

    #[test]
    fn test_only_shared_traits_inherited(
        p1 in arb_profile(1),
        p2 in arb_profile(2),
        seed in any::<u64>()
    ) {
        let config = GeneticsConfig::default();
        let patterns = PatternSet::new(default_patterns());
        let mut rng = SeededRandom::new(seed);

        let inherited = InheritanceCalculator::new(&config).inherit(&p1, &p2, &patterns, &mut rng);
        for name in inherited.keys() {
            prop_assert!(p1.trait_data.contains_key(name));
            prop_assert!(p2.trait_data.contains_key(name));
        }
    }

    #[test]
    fn test_stage_resolution_never_regresses(
        level in 1u8..=5,
        total in 0u64..200_000
    ) {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let current = EvolutionStage::from_level(level).unwrap_or_default();

        let resolved = engine.resolve_stage(current, total);
        prop_assert!(resolved >= current);
        prop_assert!(resolved >= config.stage_for(total));
    }

    #[test]
    fn test_experience_accumulates_monotonically(
        gains in prop::collection::vec(0.0f64..5_000.0, 1..20),
        seed in any::<u64>()
    ) {
        let config = EvolutionConfig::default();
        let engine = EvolutionEngine::new(&config);
        let mut rng = SeededRandom::new(seed);
        let mut state = EvolutionData::new(1, Utc::now());

        for base in gains {
            let data = EventData::new().with_base_experience(base);
            let step = engine
                .advance(&state, "exploration".into(), data, &mut rng, Utc::now())
                .unwrap();
            prop_assert!(step.next.experience_points >= state.experience_points);
            prop_assert!(step.next.evolution_stage >= state.evolution_stage);
            prop_assert!(step.next.adaptations.len() >= state.adaptations.len());
            state = step.next;
        }
    }
}
