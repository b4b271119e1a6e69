use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Transform from a similarity in `(0, 1)` to a target distance.
///
/// Chosen once per run; every variant is strictly decreasing on `(0, 1)` and strictly positive
/// there, so a zero distance can serve as the "never set" marker in the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SimilarityTransform {
    /// `1 - s`
    OneMinus,
    /// `1 / s`
    Inverse,
    /// `1 / s - 1`
    InverseOffset,
    /// `1 / s² - 1`
    InverseSquaredOffset,
    /// `1 / s³ - 1`
    #[default]
    InverseCubedOffset,
}

impl SimilarityTransform {
    pub fn distance(self, similarity: f64) -> f64 {
        let s = similarity;
        match self {
            Self::OneMinus => 1.0 - s,
            Self::Inverse => 1.0 / s,
            Self::InverseOffset => 1.0 / s - 1.0,
            Self::InverseSquaredOffset => 1.0 / (s * s) - 1.0,
            Self::InverseCubedOffset => 1.0 / (s * s * s) - 1.0,
        }
    }

    pub const ALL: [SimilarityTransform; 5] = [
        Self::OneMinus,
        Self::Inverse,
        Self::InverseOffset,
        Self::InverseSquaredOffset,
        Self::InverseCubedOffset,
    ];
}

impl FromStr for SimilarityTransform {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "oneminus" => Ok(Self::OneMinus),
            "inverse" => Ok(Self::Inverse),
            "inverseoffset" => Ok(Self::InverseOffset),
            "inverse2offset" | "inversesquaredoffset" => Ok(Self::InverseSquaredOffset),
            "inverse3offset" | "inversecubedoffset" => Ok(Self::InverseCubedOffset),
            _ => Err(()),
        }
    }
}

/// Options that shape the field and the entities of an [`Embedding`](crate::Embedding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingOptions {
    /// Number of coordinates per entity. Orientation normalization needs at least two.
    pub dimensions: usize,
    pub transform: SimilarityTransform,
    /// Inverse spring stiffness for observed pairs. Smaller is stiffer.
    pub default_force_constant: f64,
    /// Inverse spring stiffness for imputed (never observed) pairs.
    pub weak_force_constant: f64,
    /// Inverse spring stiffness for every pair involving the reference entity.
    pub strong_force_constant: f64,
    pub default_mass: f64,
    pub reference_mass: f64,
    /// When false the reference entity is removed from the active set once designated.
    pub include_reference: bool,
    /// Impute pairs that never appear in the input at the weakest observed similarity.
    pub set_missing_to_min: bool,
    /// When false observed pairs are recorded but never marked present; combined with
    /// `set_missing_to_min` the model runs on the imputed threshold alone.
    pub use_data: bool,
    pub initial_field_size: usize,
    pub random_seed: u64,
}

impl Default for EmbeddingOptions {
    fn default() -> Self {
        Self {
            dimensions: 2,
            transform: SimilarityTransform::default(),
            default_force_constant: 500.0,
            weak_force_constant: 500.0,
            strong_force_constant: 500.0,
            default_mass: 1.0,
            reference_mass: 1.0,
            include_reference: true,
            set_missing_to_min: true,
            use_data: true,
            initial_field_size: 16,
            random_seed: 0,
        }
    }
}

impl EmbeddingOptions {
    pub fn validate(&self) -> Result<()> {
        if self.dimensions < 2 {
            return Err(invalid(format!(
                "dimensions must be at least 2, got {}",
                self.dimensions
            )));
        }
        for (name, v) in [
            ("defaultForceConstant", self.default_force_constant),
            ("weakForceConstant", self.weak_force_constant),
            ("strongForceConstant", self.strong_force_constant),
            ("defaultMass", self.default_mass),
            ("referenceMass", self.reference_mass),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(invalid(format!("{name} must be finite and positive, got {v}")));
            }
        }
        if self.initial_field_size < 2 {
            return Err(invalid(format!(
                "initialFieldSize must be at least 2, got {}",
                self.initial_field_size
            )));
        }
        Ok(())
    }
}

/// Iteration budget for the multi-start search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    /// Random restarts tried before the long run.
    pub number_of_starts: usize,
    /// Steps per restart.
    pub initial_iterations: usize,
    /// Steps for the long run from the best seed.
    pub final_iterations: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            number_of_starts: 30,
            initial_iterations: 1500,
            final_iterations: 8000,
        }
    }
}

/// Everything a driver needs, loadable from one JSON document:
///
/// ```json
/// { "embedding": { "transform": "oneMinus", "randomSeed": 7 }, "search": { "numberOfStarts": 10 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelkieConfig {
    pub embedding: EmbeddingOptions,
    pub search: SearchOptions,
}

impl SelkieConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::InvalidOptions {
            message: e.to_string(),
        })?;
        config.embedding.validate()?;
        Ok(config)
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidOptions { message }
}
