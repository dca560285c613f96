use std::collections::VecDeque;

use crate::particles::{
    noise::Perlin3,
    particle::{EmitterParams, Particle},
    rng::Rng64,
};

/// Tolerance, in steps, for snapping a requested time onto the step grid.
const GRID_EPSILON: f64 = 1e-9;

/// Offsets of the second turbulence sample so x and y perturbations are independent.
const TURBULENCE_OFFSET: (f64, f64, f64) = (31.416, 47.853, 12.793);

/// Step and checkpoint tuning for a [`ParticleSimulator`].
///
/// `FLURRY_CHECKPOINT_CAP` and `FLURRY_CHECKPOINT_INTERVAL_MS` override the defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatorOpts {
    /// Fixed integration steps per second.
    pub step_rate: u32,
    /// Simulated seconds between checkpoints.
    pub checkpoint_interval: f64,
    /// Checkpoints kept before the oldest is evicted.
    pub max_checkpoints: usize,
}

impl Default for SimulatorOpts {
    fn default() -> Self {
        let max_checkpoints = std::env::var("FLURRY_CHECKPOINT_CAP")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(120);
        let interval_ms = std::env::var("FLURRY_CHECKPOINT_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(500);
        Self {
            step_rate: 60,
            checkpoint_interval: f64::from(interval_ms) / 1000.0,
            max_checkpoints,
        }
    }
}

impl SimulatorOpts {
    fn step_rate(&self) -> u32 {
        self.step_rate.max(1)
    }

    /// Checkpoint spacing in whole steps.
    fn checkpoint_every(&self) -> u64 {
        let steps = (self.checkpoint_interval * f64::from(self.step_rate())).round();
        if steps.is_finite() && steps >= 1.0 {
            steps as u64
        } else {
            1
        }
    }
}

/// Immutable snapshot of the simulation at a step boundary.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    step: u64,
    time: f64,
    particles: Box<[Particle]>,
    rng_calls: u64,
}

impl Checkpoint {
    /// Simulation time of the snapshot.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Particles stored in the snapshot.
    pub fn alive(&self) -> usize {
        self.particles.len()
    }

    /// RNG position at the snapshot.
    pub fn rng_calls(&self) -> u64 {
        self.rng_calls
    }
}

/// What the last [`ParticleSimulator::simulate`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationRun {
    /// Time of the checkpoint resumed from, `None` when started from zero.
    pub resumed_from: Option<f64>,
    /// Fixed steps integrated, counting a clipped last step.
    pub steps: u64,
    /// Checkpoints taken during the call.
    pub checkpoints_saved: usize,
    /// Checkpoints discarded because time moved back or parameters changed.
    pub checkpoints_dropped: usize,
}

/// Deterministic, seekable particle simulation with periodic checkpoints.
///
/// The live buffer always holds exactly the state at the last requested time. Everything else
/// is reconstructed from checkpoints, which are only ever taken on the fixed step grid so that
/// replays are bit-identical to a from-scratch run.
#[derive(Debug)]
pub struct ParticleSimulator {
    opts: SimulatorOpts,
    particles: Vec<Particle>,
    alive: usize,
    checkpoints: VecDeque<Checkpoint>,
    params_version: Option<u64>,
    noise: Option<Perlin3>,
    time: f64,
    rng_calls: u64,
    last_run: SimulationRun,
}

impl Default for ParticleSimulator {
    fn default() -> Self {
        Self::new(SimulatorOpts::default())
    }
}

impl ParticleSimulator {
    /// Empty simulator at time zero.
    pub fn new(opts: SimulatorOpts) -> Self {
        Self {
            opts,
            particles: Vec::new(),
            alive: 0,
            checkpoints: VecDeque::new(),
            params_version: None,
            noise: None,
            time: 0.0,
            rng_calls: 0,
            last_run: SimulationRun::default(),
        }
    }

    /// Options the simulator was built with.
    pub fn opts(&self) -> SimulatorOpts {
        self.opts
    }

    /// Alive particles at the last simulated time.
    pub fn particles(&self) -> &[Particle] {
        &self.particles[..self.alive]
    }

    /// Number of alive particles.
    pub fn alive(&self) -> usize {
        self.alive
    }

    /// Slots allocated in the particle buffer. Grows by doubling, never shrinks.
    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    /// Time of the live state.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Stored checkpoints, oldest first.
    pub fn checkpoints(&self) -> impl ExactSizeIterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    /// Summary of the last [`Self::simulate`] call.
    pub fn last_run(&self) -> SimulationRun {
        self.last_run
    }

    /// RNG draws consumed to reach the current state.
    pub fn rng_calls(&self) -> u64 {
        self.rng_calls
    }

    /// Drop every checkpoint and the live state.
    pub fn reset(&mut self) {
        self.checkpoints.clear();
        self.alive = 0;
        self.time = 0.0;
        self.rng_calls = 0;
        self.params_version = None;
    }

    /// Bring the live buffer to absolute simulation `time`.
    ///
    /// `params_version` must change whenever any value in `params` changes; a change discards
    /// all checkpoints.
    #[tracing::instrument(level = "trace", skip(self, params))]
    pub fn simulate(&mut self, time: f64, params: &EmitterParams, params_version: u64) {
        let mut run = SimulationRun::default();
        if self.params_version != Some(params_version) {
            run.checkpoints_dropped += self.checkpoints.len();
            self.checkpoints.clear();
            self.params_version = Some(params_version);
        }

        if time.is_nan() || time <= 0.0 {
            self.alive = 0;
            self.time = 0.0;
            self.rng_calls = 0;
            self.last_run = run;
            return;
        }

        let params = params.sanitized();
        if self.noise.as_ref().map(Perlin3::seed) != Some(params.seed) {
            self.noise = Some(Perlin3::new(params.seed));
        }

        let rate = f64::from(self.opts.step_rate());
        let dt = 1.0 / rate;
        let scaled = time * rate;
        let mut full_steps = scaled.floor();
        // Times that land on the grid up to rounding count as whole steps.
        if scaled - full_steps > 1.0 - GRID_EPSILON {
            full_steps += 1.0;
        }
        if !full_steps.is_finite() || full_steps >= (u64::MAX / 2) as f64 {
            full_steps = (u64::MAX / 2) as f64;
        }
        let full_steps = full_steps as u64;
        let mut partial = time - full_steps as f64 / rate;
        if partial < GRID_EPSILON * dt {
            partial = 0.0;
        }

        // Scrub-back: checkpoints past the requested point are future state.
        let before = self.checkpoints.len();
        while self
            .checkpoints
            .back()
            .is_some_and(|cp| cp.step > full_steps)
        {
            self.checkpoints.pop_back();
        }
        run.checkpoints_dropped += before - self.checkpoints.len();

        let mut step = 0u64;
        let mut rng = Rng64::new(params.seed);
        self.alive = 0;
        if let Some(cp) = self.checkpoints.back() {
            step = cp.step;
            rng = Rng64::at(params.seed, cp.rng_calls);
            let n = cp.particles.len();
            if self.particles.len() < n {
                self.particles.resize(n, Particle::default());
            }
            self.particles[..n].copy_from_slice(&cp.particles);
            self.alive = n;
            run.resumed_from = Some(cp.time);
            tracing::trace!(checkpoint = cp.time, alive = n, "restored checkpoint");
        }

        let every = self.opts.checkpoint_every();
        while step < full_steps {
            let start = step as f64 / rate;
            self.step(start, start + dt, dt, &params, &mut rng);
            step += 1;
            run.steps += 1;
            if step % every == 0 {
                self.push_checkpoint(step, rng.calls());
                run.checkpoints_saved += 1;
            }
        }
        if partial > 0.0 {
            let start = full_steps as f64 / rate;
            self.step(start, time, partial, &params, &mut rng);
            run.steps += 1;
        }

        self.time = time;
        self.rng_calls = rng.calls();
        self.last_run = run;
    }

    fn push_checkpoint(&mut self, step: u64, rng_calls: u64) {
        self.checkpoints.push_back(Checkpoint {
            step,
            time: step as f64 / f64::from(self.opts.step_rate()),
            particles: self.particles[..self.alive].into(),
            rng_calls,
        });
        while self.checkpoints.len() > self.opts.max_checkpoints.max(1) {
            self.checkpoints.pop_front();
        }
    }

    fn step(&mut self, start: f64, end: f64, dt: f64, p: &EmitterParams, rng: &mut Rng64) {
        self.emit(start, dt, p, rng);
        self.update(end, dt, p);
    }

    fn emit(&mut self, start: f64, dt: f64, p: &EmitterParams, rng: &mut Rng64) {
        let count = p.emission_rate * dt;
        let whole = count.floor();
        let frac = count - whole;
        // One draw per step for the fractional particle, whatever the remainder.
        let extra = u64::from(rng.next_f64_01() < frac);
        let requested = (whole as u64).saturating_add(extra);

        let max = p.max_particles as usize;
        for _ in 0..requested {
            if self.alive >= max {
                break;
            }
            self.ensure_slot(max);
            self.particles[self.alive] = Particle::spawn(start, p, rng);
            self.alive += 1;
        }
    }

    fn ensure_slot(&mut self, max: usize) {
        if self.alive < self.particles.len() {
            return;
        }
        let grown = (self.particles.len() * 2).max(16).min(max).max(self.alive + 1);
        self.particles.resize(grown, Particle::default());
    }

    fn update(&mut self, now: f64, dt: f64, p: &EmitterParams) {
        let dtf = dt as f32;
        let gravity = p.gravity as f32;
        let damping = (1.0 - p.air_resistance * dt).max(0.0) as f32;
        let strength = p.turbulence_strength;
        let noise = self.noise.as_ref().filter(|_| strength != 0.0);

        let mut i = self.alive;
        while i > 0 {
            i -= 1;
            let particle = &mut self.particles[i];
            let age = particle.age(now);
            if age >= f64::from(particle.lifetime) {
                particle.alive = false;
                self.alive -= 1;
                self.particles.swap(i, self.alive);
                continue;
            }

            particle.vy += gravity * dtf;
            particle.vx *= damping;
            particle.vy *= damping;
            if let Some(noise) = noise {
                let nx = f64::from(particle.x) * p.turbulence_scale;
                let ny = f64::from(particle.y) * p.turbulence_scale;
                let nz = now * p.turbulence_speed;
                let (ox, oy, oz) = TURBULENCE_OFFSET;
                let tx = noise.sample(nx, ny, nz);
                let ty = noise.sample(nx + ox, ny + oy, nz + oz);
                particle.vx += (tx * strength * dt) as f32;
                particle.vy += (ty * strength * dt) as f32;
            }
            particle.x += particle.vx * dtf;
            particle.y += particle.vy * dtf;
            particle.rotation += particle.angular_velocity * dtf;

            let t = (age / f64::from(particle.lifetime)).clamp(0.0, 1.0) as f32;
            particle.apply_over_life(p, t);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/particles/simulator.rs"]
mod tests;
