use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a cat row owned by the surrounding application.
pub type CatId = i64;

/// Value carried by a single gene marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Gene {
    /// Numeric level (polygenic markers).
    Level(f64),
    /// Named allele (simple and complex markers).
    Allele(String),
}

impl Gene {
    /// Numeric level of the gene, if it carries one.
    #[must_use]
    pub fn as_level(&self) -> Option<f64> {
        match self {
            Gene::Level(v) => Some(*v),
            Gene::Allele(_) => None,
        }
    }

    /// Allele name of the gene, if it carries one.
    #[must_use]
    pub fn as_allele(&self) -> Option<&str> {
        match self {
            Gene::Allele(a) => Some(a),
            Gene::Level(_) => None,
        }
    }

    /// Key used to look the gene up in a dominance table.
    #[must_use]
    pub fn dominance_key(&self) -> String {
        match self {
            Gene::Allele(a) => a.clone(),
            Gene::Level(v) => v.to_string(),
        }
    }
}

impl From<&str> for Gene {
    fn from(allele: &str) -> Self {
        Gene::Allele(allele.to_string())
    }
}

impl From<f64> for Gene {
    fn from(level: f64) -> Self {
        Gene::Level(level)
    }
}

/// Stored value of a trait inside a profile's `trait_data`.
///
/// The shape depends on the trait's inheritance type: simple traits hold one
/// allele or an allele set, complex and polygenic traits hold a marker map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    Allele(String),
    Alleles(Vec<String>),
    Genes(BTreeMap<String, Gene>),
}

impl TraitValue {
    /// Allele set used for simple inheritance. A single allele is a one-element set.
    #[must_use]
    pub fn alleles(&self) -> Vec<&str> {
        match self {
            TraitValue::Allele(a) => vec![a.as_str()],
            TraitValue::Alleles(all) => all.iter().map(String::as_str).collect(),
            TraitValue::Genes(genes) => genes.values().filter_map(Gene::as_allele).collect(),
        }
    }

    /// Gene stored under `marker`, for marker-based traits.
    #[must_use]
    pub fn gene(&self, marker: &str) -> Option<&Gene> {
        match self {
            TraitValue::Genes(genes) => genes.get(marker),
            _ => None,
        }
    }

    /// Mean of the numeric marker levels; `None` when the trait carries none.
    #[must_use]
    pub fn level(&self) -> Option<f64> {
        let TraitValue::Genes(genes) = self else {
            return None;
        };
        let levels: Vec<f64> = genes.values().filter_map(Gene::as_level).collect();
        if levels.is_empty() {
            return None;
        }
        Some(levels.iter().sum::<f64>() / levels.len() as f64)
    }
}

/// Grouping of traits used for category averages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitCategory {
    Physical,
    Personality,
    Abilities,
    Unknown,
}

impl TraitCategory {
    pub const KNOWN: [TraitCategory; 3] = [
        TraitCategory::Physical,
        TraitCategory::Personality,
        TraitCategory::Abilities,
    ];

    /// Category of a trait name; names outside the built-in catalog are `Unknown`.
    #[must_use]
    pub fn of(trait_name: &str) -> Self {
        match trait_name {
            "size" | "color" | "pattern" | "features" => TraitCategory::Physical,
            "temperament" | "intelligence" | "social" => TraitCategory::Personality,
            "agility" | "strength" | "special" => TraitCategory::Abilities,
            _ => TraitCategory::Unknown,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TraitCategory::Physical => "physical",
            TraitCategory::Personality => "personality",
            TraitCategory::Abilities => "abilities",
            TraitCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TraitCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a trait is passed from parents to offspring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceType {
    /// Single locus, dominance decides the expressed allele.
    Simple,
    /// Several markers, each expressed by dominance share.
    Complex,
    /// Additive contribution of many markers.
    Polygenic,
}

fn default_modifier() -> f64 {
    0.1
}

/// Per-trait mutation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationRates {
    /// Per-marker re-roll probability for complex traits.
    pub base: f64,
    /// Standard deviation of the multiplicative drift for polygenic traits.
    #[serde(default = "default_modifier")]
    pub modifier: f64,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            base: 0.01,
            modifier: default_modifier(),
        }
    }
}

/// Catalog row describing how one trait is inherited and mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitInheritancePattern {
    pub trait_name: String,
    pub inheritance_type: InheritanceType,
    #[serde(default)]
    pub gene_markers: Vec<String>,
    /// Allele → weight in [0, 1].
    #[serde(default)]
    pub dominance_factors: BTreeMap<String, f64>,
    #[serde(default)]
    pub mutation_rates: MutationRates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TraitInheritancePattern {
    /// Dominance weight of an allele, if the pattern defines one.
    #[must_use]
    pub fn dominance(&self, allele: &str) -> Option<f64> {
        self.dominance_factors.get(allele).copied()
    }

    /// All alleles the pattern knows about, in stable order.
    pub fn alleles(&self) -> impl Iterator<Item = &str> {
        self.dominance_factors.keys().map(String::as_str)
    }
}

/// One parent's contribution to a complex marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneShare {
    pub value: Gene,
    /// Share of expression in [0, 1].
    pub expression: f64,
}

/// Expression of a complex marker from both parents' genes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneExpression {
    pub gene1: GeneShare,
    pub gene2: GeneShare,
}

impl GeneExpression {
    /// The gene with the larger expression share; the first parent's on a tie.
    #[must_use]
    pub fn dominant(&self) -> &Gene {
        if self.gene2.expression > self.gene1.expression {
            &self.gene2.value
        } else {
            &self.gene1.value
        }
    }
}

/// A trait value computed by inheritance, before it is stored on a child.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InheritedTrait {
    /// One allele strictly dominated the other.
    Expressed { allele: String },
    /// Equal dominance: both alleles recorded.
    Codominant {
        allele1: String,
        allele2: String,
        expression: f64,
    },
    /// Marker → expression; `None` when the marker's combined dominance was zero.
    Complex {
        genes: BTreeMap<String, Option<GeneExpression>>,
    },
    /// Mean of the per-marker samples, with the samples kept per locus.
    Polygenic {
        value: f64,
        loci: BTreeMap<String, f64>,
    },
}

impl InheritedTrait {
    /// Alleles currently expressed by a simple trait.
    #[must_use]
    pub fn expressed_alleles(&self) -> Vec<&str> {
        match self {
            InheritedTrait::Expressed { allele } => vec![allele.as_str()],
            InheritedTrait::Codominant {
                allele1, allele2, ..
            } => vec![allele1.as_str(), allele2.as_str()],
            _ => Vec::new(),
        }
    }

    /// Storable form of the trait for a child profile.
    #[must_use]
    pub fn to_trait_value(&self) -> TraitValue {
        match self {
            InheritedTrait::Expressed { allele } => TraitValue::Allele(allele.clone()),
            InheritedTrait::Codominant {
                allele1, allele2, ..
            } => TraitValue::Alleles(vec![allele1.clone(), allele2.clone()]),
            InheritedTrait::Complex { genes } => TraitValue::Genes(
                genes
                    .iter()
                    .filter_map(|(marker, expr)| {
                        expr.as_ref().map(|e| (marker.clone(), e.dominant().clone()))
                    })
                    .collect(),
            ),
            InheritedTrait::Polygenic { loci, .. } => TraitValue::Genes(
                loci.iter()
                    .map(|(marker, v)| (marker.clone(), Gene::Level(*v)))
                    .collect(),
            ),
        }
    }
}

/// What produced a mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOrigin {
    /// Genetic mutation of a named trait during inheritance.
    Trait(String),
    /// Mutation triggered by an evolution event (stress, achievement, mastery).
    Trigger(String),
}

impl MutationOrigin {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            MutationOrigin::Trait(n) | MutationOrigin::Trigger(n) => n,
        }
    }
}

/// Concrete change carried by a genetic mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationEffect {
    /// A simple trait switches to a different allele.
    AlleleSwap { allele: String },
    /// Complex markers re-rolled to new uniform values.
    GeneReroll { genes: BTreeMap<String, f64> },
    /// A polygenic value scaled by `1 + N(0, modifier)`.
    PolygenicShift { factor: f64, value: f64 },
}

impl MutationEffect {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            MutationEffect::AlleleSwap { .. } => "allele_swap",
            MutationEffect::GeneReroll { .. } => "gene_reroll",
            MutationEffect::PolygenicShift { .. } => "polygenic_shift",
        }
    }
}

/// Immutable mutation record, appended to a profile or an evolution event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub origin: MutationOrigin,
    #[serde(rename = "type")]
    pub kind: String,
    /// Strength in [0, 1].
    pub strength: f64,
    #[serde(default)]
    pub permanent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<MutationEffect>,
    pub timestamp: DateTime<Utc>,
}

/// Heritable state of one cat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticProfile {
    pub cat_id: CatId,
    pub genetic_markers: BTreeMap<String, Gene>,
    pub trait_data: BTreeMap<String, TraitValue>,
    #[serde(default)]
    pub mutation_history: Vec<Mutation>,
    /// Generation number, starting at 1 for founders.
    pub generation: u32,
    /// Ancestor ids, nearest first.
    #[serde(default)]
    pub lineage_path: Vec<CatId>,
}

impl GeneticProfile {
    /// Empty first-generation profile.
    #[must_use]
    pub fn founder(cat_id: CatId) -> Self {
        Self {
            cat_id,
            genetic_markers: BTreeMap::new(),
            trait_data: BTreeMap::new(),
            mutation_history: Vec::new(),
            generation: 1,
            lineage_path: Vec::new(),
        }
    }

    /// Markers carried by both profiles, with each side's value.
    pub fn common_markers<'a>(
        &'a self,
        other: &'a GeneticProfile,
    ) -> impl Iterator<Item = (&'a str, &'a Gene, &'a Gene)> + 'a {
        self.genetic_markers.iter().filter_map(move |(name, value)| {
            other
                .genetic_markers
                .get(name)
                .map(|theirs| (name.as_str(), value, theirs))
        })
    }
}

/// Outcome of running the inheritance pipeline for a parent pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InheritanceResult {
    pub inherited_traits: BTreeMap<String, InheritedTrait>,
    pub mutations: BTreeMap<String, Mutation>,
    pub fitness_score: f64,
    pub genetic_markers: BTreeMap<String, Gene>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_value_untagged_shapes() {
        let single: TraitValue = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(single.alleles(), vec!["black"]);

        let set: TraitValue = serde_json::from_str("[\"black\", \"orange\"]").unwrap();
        assert_eq!(set.alleles(), vec!["black", "orange"]);

        let genes: TraitValue =
            serde_json::from_str("{\"body_mass\": 0.4, \"base_color\": \"tabby\"}").unwrap();
        assert_eq!(genes.gene("body_mass"), Some(&Gene::Level(0.4)));
        assert_eq!(genes.gene("base_color"), Some(&Gene::from("tabby")));
    }

    #[test]
    fn test_complex_to_trait_value_skips_null_markers() {
        let mut genes = BTreeMap::new();
        genes.insert(
            "ear_shape".to_string(),
            Some(GeneExpression {
                gene1: GeneShare {
                    value: Gene::from("folded"),
                    expression: 0.25,
                },
                gene2: GeneShare {
                    value: Gene::from("upright"),
                    expression: 0.75,
                },
            }),
        );
        genes.insert("tail_length".to_string(), None);
        let value = InheritedTrait::Complex { genes }.to_trait_value();
        assert_eq!(value.gene("ear_shape"), Some(&Gene::from("upright")));
        assert_eq!(value.gene("tail_length"), None);
    }

    #[test]
    fn test_trait_level_averages_numeric_markers() {
        let genes: TraitValue =
            serde_json::from_str(r#"{"balance": 0.2, "reflexes": 0.6, "base": "tabby"}"#).unwrap();
        assert!((genes.level().unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(TraitValue::Allele("black".into()).level(), None);
        assert_eq!(TraitValue::Genes(BTreeMap::new()).level(), None);
    }

    #[test]
    fn test_trait_categories() {
        assert_eq!(TraitCategory::of("color"), TraitCategory::Physical);
        assert_eq!(TraitCategory::of("intelligence"), TraitCategory::Personality);
        assert_eq!(TraitCategory::of("agility"), TraitCategory::Abilities);
        assert_eq!(TraitCategory::of("wings"), TraitCategory::Unknown);
        assert_eq!(
            serde_json::to_string(&TraitCategory::Abilities).unwrap(),
            "\"abilities\""
        );
    }

    #[test]
    fn test_pattern_defaults_from_json() {
        let pattern: TraitInheritancePattern = serde_json::from_str(
            r#"{"trait_name": "size", "inheritance_type": "polygenic", "mutation_rates": {"base": 0.01}}"#,
        )
        .unwrap();
        assert_eq!(pattern.inheritance_type, InheritanceType::Polygenic);
        assert!(pattern.gene_markers.is_empty());
        assert!((pattern.mutation_rates.modifier - 0.1).abs() < f64::EPSILON);
    }
}
