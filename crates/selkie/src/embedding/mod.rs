//! The embedding: entities, their similarity field, and one simulation step.
//!
//! A step is two phases. [`Embedding::impose_forces`] reads only committed positions and
//! integrates every entity's force; [`Embedding::advance_time`] re-centres on the reference
//! entity and commits. Because nobody reads an uncommitted position, the update is the same
//! whatever order entities are visited in.

mod output;

pub use output::Placement;

use crate::coords::Coords;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::field::SimilarityField;
use crate::ingest::{self, SimilarityBounds, SimilarityRecord};
use crate::options::EmbeddingOptions;
use crate::rng::XorShift64Star;
use indexmap::IndexMap;
use std::path::Path;

/// Below this separation two entities are treated as coincident and pushed along the fallback
/// diagonal instead of `delta / distance`.
pub const COINCIDENT_DISTANCE: f64 = 0.0005;

#[derive(Debug, Clone)]
pub struct Embedding {
    options: EmbeddingOptions,
    field: SimilarityField,
    // Insertion index is the entity's slot, and the slot addresses the field.
    entities: IndexMap<String, Entity>,
    rng: XorShift64Star,
    bounds: Option<SimilarityBounds>,
    sum_error: f64,
    clock: u64,
    reference: Option<usize>,
    reference_label: Option<String>,
    orientors: Option<[usize; 2]>,
}

impl Embedding {
    /// An empty embedding. Feed it with [`Embedding::add_record`], then call
    /// [`Embedding::finish_ingestion`] and [`Embedding::set_reference_entity`].
    pub fn new(options: EmbeddingOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            field: SimilarityField::new(options.initial_field_size, &options),
            rng: XorShift64Star::new(options.random_seed),
            options,
            entities: IndexMap::new(),
            bounds: None,
            sum_error: 0.0,
            clock: 0,
            reference: None,
            reference_label: None,
            orientors: None,
        })
    }

    /// Builds an embedding from parsed records and designates `reference`.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a SimilarityRecord>,
        reference: &str,
        options: EmbeddingOptions,
    ) -> Result<Self> {
        let mut embedding = Self::new(options)?;
        let mut accepted = 0usize;
        let mut discarded = 0usize;
        for record in records {
            if embedding.add_record(record) {
                accepted += 1;
            } else {
                discarded += 1;
            }
        }
        tracing::info!(
            accepted,
            discarded,
            entities = embedding.len(),
            bounds = ?embedding.bounds,
            "ingested similarity records"
        );
        embedding.finish_ingestion();
        embedding.set_reference_entity(reference)?;
        match embedding.select_orientors() {
            Ok([first, second]) => tracing::info!(
                first = embedding.label_at(first),
                second = embedding.label_at(second),
                "selected orientors"
            ),
            Err(err) => tracing::warn!(%err, "orientation normalization will be unavailable"),
        }
        Ok(embedding)
    }

    /// Parses `text` (see [`ingest::parse_records`]) and builds an embedding from it.
    pub fn from_text(text: &str, reference: &str, options: EmbeddingOptions) -> Result<Self> {
        let parsed = ingest::parse_records(text);
        if parsed.skipped > 0 {
            tracing::warn!(skipped = parsed.skipped, "skipped malformed similarity records");
        }
        Self::from_records(&parsed.records, reference, options)
    }

    /// Reads a similarity file. Failing to read it aborts; malformed lines are skipped.
    pub fn load(
        path: impl AsRef<Path>,
        reference: &str,
        options: EmbeddingOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_text(&text, reference, options)
    }

    /// Adds one record. Returns whether it was accepted; similarities that normalize to 0 or 1
    /// (or beyond) are discarded without registering either identifier.
    pub fn add_record(&mut self, record: &SimilarityRecord) -> bool {
        let similarity = ingest::normalize_similarity(record.similarity);
        if !ingest::is_accepted(similarity) {
            tracing::debug!(a = %record.a, b = %record.b, similarity, "discarding record");
            return false;
        }
        self.bounds = Some(SimilarityBounds::widen(self.bounds, similarity));

        let a = self.register(&record.a);
        let b = self.register(&record.b);
        if a == b {
            return true;
        }
        let distance = self.field.distance_from_similarity(similarity);
        self.field.set_ideal_distance(a, b, distance);
        if self.options.use_data {
            self.field.set_present(a, b);
        }
        true
    }

    /// Applies the missing-data policy once every record is in. Returns the number of pairs
    /// imputed.
    pub fn finish_ingestion(&mut self) -> usize {
        if !self.options.set_missing_to_min {
            return 0;
        }
        let Some(bounds) = self.bounds else {
            return 0;
        };
        let filled = self.field.fill_missing_with_minimum(bounds.min);
        tracing::debug!(filled, min = bounds.min, "imputed missing pairs");
        filled
    }

    fn register(&mut self, label: &str) -> usize {
        if let Some(slot) = self.entities.get_index_of(label) {
            return slot;
        }
        let slot = self.entities.len();
        while slot >= self.field.size() {
            self.field.expand(slot);
        }
        let position = self.rng.random_coords(self.options.dimensions);
        self.entities.insert(
            label.to_string(),
            Entity::new(label, slot, position, self.options.default_mass),
        );
        slot
    }

    /// Makes `label` the reference: it gets the reference mass and stiff springs to every other
    /// entity. With `include_reference` off it is then removed from the active set.
    pub fn set_reference_entity(&mut self, label: &str) -> Result<()> {
        let slot = self.slot_of(label).ok_or_else(|| Error::MissingEntity {
            label: label.to_string(),
        })?;
        let n = self.entities.len();
        if let Some((_, entity)) = self.entities.get_index_mut(slot) {
            entity.set_mass(self.options.reference_mass);
        }
        self.field.set_strong_force_constant(slot, n);
        self.reference_label = Some(label.to_string());
        self.orientors = None;

        if self.options.include_reference {
            self.reference = Some(slot);
        } else {
            self.reference = None;
            self.remove_slot(slot);
        }
        tracing::info!(
            reference = label,
            slot,
            included = self.reference.is_some(),
            "designated reference entity"
        );
        Ok(())
    }

    fn remove_slot(&mut self, slot: usize) {
        self.entities.shift_remove_index(slot);
        self.field.remove(slot);
        for (idx, entity) in self.entities.values_mut().enumerate().skip(slot) {
            entity.set_slot(idx);
        }
        self.reference = match self.reference {
            Some(r) if r == slot => None,
            Some(r) if r > slot => Some(r - 1),
            other => other,
        };
        self.orientors = None;
    }

    /// The first two slots that are not the reference. They pin rotation and reflection.
    pub fn select_orientors(&mut self) -> Result<[usize; 2]> {
        let mut found = (0..self.entities.len()).filter(|slot| Some(*slot) != self.reference);
        match (found.next(), found.next()) {
            (Some(first), Some(second)) => {
                self.orientors = Some([first, second]);
                Ok([first, second])
            }
            (first, _) => Err(Error::NotEnoughOrientors {
                found: usize::from(first.is_some()),
            }),
        }
    }

    /// Accumulates the spring force on every entity from its present partners and integrates
    /// it. Returns the step's distortion: the sum over evaluated pairs of half the absolute
    /// gap between actual and ideal distance.
    pub fn impose_forces(&mut self) -> Result<f64> {
        let n = self.entities.len();
        let dimensions = self.options.dimensions;
        let fallback = Coords::diagonal(dimensions);
        let mut sum_error = 0.0;
        let mut impulses: Vec<(Coords, f64)> = Vec::with_capacity(n);

        for (j, entity) in self.entities.values().enumerate() {
            let here = entity.position();
            let mut force = Coords::zeros(dimensions);
            let mut log_sum = 0.0;
            let mut partners = 0usize;
            for (i, other) in self.entities.values().enumerate() {
                if i == j || !self.field.is_present(j, i) {
                    continue;
                }
                let delta = here.delta_to(other.position())?;
                let distance = delta.norm();
                let direction = if distance.abs() < COINCIDENT_DISTANCE {
                    fallback.clone()
                } else {
                    delta.scaled(1.0 / distance)
                };
                let difference = (distance.abs() - self.field.ideal_distance(j, i)) / 2.0;
                sum_error += difference.abs();

                let force_constant = self.field.force_constant(j, i);
                log_sum += force_constant.log10();
                partners += 1;
                force.add(&direction.scaled(difference / force_constant))?;
            }
            impulses.push((force, friction_from_log_sum(n, log_sum, partners)));
        }

        for (entity, (force, friction)) in self.entities.values_mut().zip(&impulses) {
            entity.impose_force(force, *friction)?;
        }
        self.sum_error = sum_error;
        Ok(sum_error)
    }

    /// Commits the step for every entity after shifting the whole configuration so the
    /// reference sits at the origin.
    pub fn advance_time(&mut self) -> Result<()> {
        let origin = match self.reference_entity() {
            Some(reference) => reference.after_position().clone(),
            None => Coords::zeros(self.options.dimensions),
        };
        for entity in self.entities.values_mut() {
            entity.shift_coords(&origin)?;
            entity.advance_time();
        }
        self.clock += 1;
        Ok(())
    }

    /// One full step: forces, then commit. Returns the step's distortion.
    pub fn step(&mut self) -> Result<f64> {
        let error = self.impose_forces()?;
        self.advance_time()?;
        Ok(error)
    }

    /// Rotates every entity so the first orientor lies on the positive first axis.
    ///
    /// If that orientor sits exactly on the origin its angle is undefined and the rotation is
    /// skipped.
    pub fn rotate_coords_2d(&mut self) -> Result<()> {
        let [first, _] = self.current_orientors()?;
        let anchor = self.entity_at(first).map(|e| e.after_position().clone());
        let Some(anchor) = anchor else {
            return Err(Error::NotEnoughOrientors { found: 0 });
        };
        if anchor.hypot_2d()? == 0.0 {
            tracing::warn!(orientor = self.label_at(first), "orientor at origin; rotation skipped");
            return Ok(());
        }
        let sin_theta = anchor.sin_theta_2d()?;
        let cos_theta = anchor.cos_theta_2d()?;
        for entity in self.entities.values_mut() {
            entity.rotate_coords_2d(sin_theta, cos_theta)?;
        }
        Ok(())
    }

    /// Reflects every entity across the first axis when the second orientor lies below it.
    pub fn reflect_coords_2d(&mut self) -> Result<()> {
        let [_, second] = self.current_orientors()?;
        let below = self
            .entity_at(second)
            .and_then(|e| e.after_position().get(1))
            .is_some_and(|y| y < 0.0);
        if below {
            for entity in self.entities.values_mut() {
                entity.reflect_x_axis()?;
            }
        }
        Ok(())
    }

    /// Rotation, reflection, then a commit so the normalized layout becomes the visible one.
    pub fn normalize_orientation(&mut self) -> Result<()> {
        self.rotate_coords_2d()?;
        self.reflect_coords_2d()?;
        self.advance_time()
    }

    fn current_orientors(&mut self) -> Result<[usize; 2]> {
        match self.orientors {
            Some(orientors) => Ok(orientors),
            None => self.select_orientors(),
        }
    }

    /// Sends every entity to a fresh random point at rest and zeroes all clocks.
    pub fn reset_terms(&mut self) -> Result<()> {
        let dimensions = self.options.dimensions;
        for entity in self.entities.values_mut() {
            entity.reset();
            let position = self.rng.random_coords(dimensions);
            entity.set_position(&position)?;
        }
        self.clock = 0;
        self.sum_error = 0.0;
        Ok(())
    }

    /// Uncommitted positions in slot order.
    pub fn clone_positions(&self) -> Vec<Coords> {
        self.entities
            .values()
            .map(|e| e.after_position().clone())
            .collect()
    }

    /// Places every entity (slot order) at the given position, at rest, and restarts the clock.
    pub fn set_positions(&mut self, positions: &[Coords]) -> Result<()> {
        if positions.len() != self.entities.len() {
            return Err(Error::PositionCountMismatch {
                expected: self.entities.len(),
                found: positions.len(),
            });
        }
        let dimensions = self.options.dimensions;
        if let Some(bad) = positions.iter().find(|p| p.dimensions() != dimensions) {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                found: bad.dimensions(),
            });
        }
        for (entity, position) in self.entities.values_mut().zip(positions) {
            entity.set_position(position)?;
        }
        self.clock = 0;
        Ok(())
    }

    /// Every entity must have stepped exactly as often as the embedding.
    pub fn check_clock(&self) -> Result<u64> {
        for entity in self.entities.values() {
            if entity.internal_clock() != self.clock {
                return Err(Error::ClockInconsistent {
                    label: entity.label().to_string(),
                    expected: self.clock,
                    found: entity.internal_clock(),
                });
            }
        }
        Ok(self.clock)
    }

    /// Hides or shows an entity in the visible output; the simulation is unaffected.
    pub fn set_included(&mut self, label: &str, included: bool) -> Result<()> {
        let entity = self
            .entities
            .get_mut(label)
            .ok_or_else(|| Error::MissingEntity {
                label: label.to_string(),
            })?;
        if included {
            entity.include();
        } else {
            entity.exclude();
        }
        Ok(())
    }

    pub fn options(&self) -> &EmbeddingOptions {
        &self.options
    }

    pub fn field(&self) -> &SimilarityField {
        &self.field
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.options.dimensions
    }

    /// Labels in slot order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity(&self, label: &str) -> Option<&Entity> {
        self.entities.get(label)
    }

    pub fn entity_at(&self, slot: usize) -> Option<&Entity> {
        self.entities.get_index(slot).map(|(_, e)| e)
    }

    pub fn slot_of(&self, label: &str) -> Option<usize> {
        self.entities.get_index_of(label)
    }

    fn label_at(&self, slot: usize) -> &str {
        self.entities
            .get_index(slot)
            .map(|(label, _)| label.as_str())
            .unwrap_or("")
    }

    pub fn bounds(&self) -> Option<SimilarityBounds> {
        self.bounds
    }

    /// Distortion of the last [`Embedding::impose_forces`] call.
    pub fn sum_error(&self) -> f64 {
        self.sum_error
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// `None` when no reference was designated or it was removed from the active set.
    pub fn reference_slot(&self) -> Option<usize> {
        self.reference
    }

    pub fn reference_label(&self) -> Option<&str> {
        self.reference_label.as_deref()
    }

    pub fn reference_entity(&self) -> Option<&Entity> {
        self.reference.and_then(|slot| self.entity_at(slot))
    }

    pub fn orientors(&self) -> Option<[usize; 2]> {
        self.orientors
    }
}

/// Damping for an entity with the given spring constants in an embedding of
/// `number_of_entities`: `sqrt(n / 10^mean(log10 k))`.
///
/// The mean is the log of the geometric mean of the constants, so stiffly held entities are
/// damped harder. With no constants the mean is taken as zero.
pub fn friction(number_of_entities: usize, force_constants: impl IntoIterator<Item = f64>) -> f64 {
    let mut log_sum = 0.0;
    let mut count = 0usize;
    for k in force_constants {
        log_sum += k.log10();
        count += 1;
    }
    friction_from_log_sum(number_of_entities, log_sum, count)
}

fn friction_from_log_sum(number_of_entities: usize, log_sum: f64, partners: usize) -> f64 {
    let mean = if partners == 0 {
        0.0
    } else {
        log_sum / partners as f64
    };
    let effective_rate = 10f64.powf(mean);
    (number_of_entities as f64 / effective_rate).sqrt()
}
