use crate::coords::Coords;
use crate::error::Result;

/// A mapped point with physical state.
///
/// `before` is the position at the start of the current step and is what other entities see
/// while forces are accumulated. `after` receives the integrated position and becomes the next
/// `before` when the step is committed with [`Entity::advance_time`].
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    label: String,
    display_label: String,
    slot: usize,
    before: Coords,
    after: Coords,
    velocity: Coords,
    acceleration: Coords,
    mass: f64,
    clock: u64,
    included: bool,
}

impl Entity {
    pub fn new(label: impl Into<String>, slot: usize, position: Coords, mass: f64) -> Self {
        let label = label.into();
        let dimensions = position.dimensions();
        Self {
            display_label: display_label(&label),
            label,
            slot,
            before: position.clone(),
            after: position,
            velocity: Coords::zeros(dimensions),
            acceleration: Coords::zeros(dimensions),
            mass,
            clock: 0,
            included: true,
        }
    }

    /// The identifier as it appeared in the input.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Underscores as spaces, every word capitalised.
    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub(crate) fn set_slot(&mut self, slot: usize) {
        self.slot = slot;
    }

    pub fn dimensions(&self) -> usize {
        self.before.dimensions()
    }

    /// Committed position (start of the current step).
    pub fn position(&self) -> &Coords {
        &self.before
    }

    /// Position after this step's integration, not yet committed.
    pub fn after_position(&self) -> &Coords {
        &self.after
    }

    pub fn velocity(&self) -> &Coords {
        &self.velocity
    }

    pub fn acceleration(&self) -> &Coords {
        &self.acceleration
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
    }

    pub fn internal_clock(&self) -> u64 {
        self.clock
    }

    pub fn is_included(&self) -> bool {
        self.included
    }

    pub fn include(&mut self) {
        self.included = true;
    }

    pub fn exclude(&mut self) {
        self.included = false;
    }

    /// Places the entity at `position` (both before and after), at rest, with its clock at zero.
    pub fn set_position(&mut self, position: &Coords) -> Result<()> {
        self.before.set(position)?;
        self.after.set(position)?;
        self.velocity.reset();
        self.acceleration.reset();
        self.clock = 0;
        Ok(())
    }

    pub fn set_velocity(&mut self, velocity: &Coords) -> Result<()> {
        self.velocity.set(velocity)
    }

    /// Integrates one unit time step under `force`.
    ///
    /// Friction is `velocity * damping / 2`. Velocity follows explicit Euler; the position moves
    /// by the mean of the old and new velocities.
    pub fn impose_force(&mut self, force: &Coords, damping: f64) -> Result<()> {
        let friction = self.velocity.scaled(damping * 0.5);
        let mut net = force.clone();
        net.subtract(&friction)?;
        net.mult(1.0 / self.mass);
        self.acceleration.set(&net)?;

        let old_velocity = self.velocity.clone();
        self.velocity.add(&self.acceleration)?;

        let mut average_velocity = old_velocity;
        average_velocity.add(&self.velocity)?;
        average_velocity.mult(0.5);
        self.after.add(&average_velocity)
    }

    /// Commits the step: `before` takes a copy of `after` and the clock ticks once.
    pub fn advance_time(&mut self) {
        self.clock += 1;
        self.before = self.after.clone();
    }

    /// Subtracts `delta` from the uncommitted position.
    pub fn shift_coords(&mut self, delta: &Coords) -> Result<()> {
        self.after.subtract(delta)
    }

    pub fn rotate_coords_2d(&mut self, sin_theta: f64, cos_theta: f64) -> Result<()> {
        self.after.rotate_2d(sin_theta, cos_theta)
    }

    pub fn reflect_x_axis(&mut self) -> Result<()> {
        self.after.reflect_x_axis()
    }

    /// Zeroes positions, velocity, acceleration and clock. Identity and mass are kept.
    pub fn reset(&mut self) {
        self.before.reset();
        self.after.reset();
        self.velocity.reset();
        self.acceleration.reset();
        self.clock = 0;
    }
}

fn display_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut at_word_start = true;
    for ch in label.replace('_', " ").chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = ch == ' ';
    }
    out
}
