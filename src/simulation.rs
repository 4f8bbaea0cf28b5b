// src/simulation.rs
// Stepping contract shared by every pendulum model, plus the state record they mutate.

use crate::error::{Result, SimulationError};
use crate::math::{broadcast, lanes_from, Lanes};
use nalgebra::DVector;
use serde::Serialize;

/// Fixed-step simulation.
///
/// Implementors provide the clock and a single step; `step_until` comes for free.
pub trait Simulation {
    /// Current simulation time [s].
    fn time(&self) -> f64;

    /// Advances the state by exactly one time step.
    fn do_step(&mut self);

    /// Steps while `time() < target` and returns how many steps were taken.
    ///
    /// The comparison is strict, so the clock ends in `[target, target + dt)` and is never
    /// snapped onto `target`. Blocks until done; the caller must guarantee a reachable target.
    fn step_until(&mut self, target: f64) -> usize {
        let mut steps = 0;
        while self.time() < target {
            self.do_step();
            steps += 1;
        }
        steps
    }
}

/// A double pendulum model as seen by renderers and plotting drivers.
pub trait DoublePendulum: Simulation {
    /// Current state of every lane.
    fn state(&self) -> &PendulumState;

    /// First rod length per lane [m].
    fn l1(&self) -> &Lanes;

    /// Second rod length per lane [m].
    fn l2(&self) -> &Lanes;

    fn theta1(&self) -> &Lanes {
        &self.state().theta1
    }

    fn theta2(&self) -> &Lanes {
        &self.state().theta2
    }

    /// Number of pendulums in the batch.
    fn lanes(&self) -> usize {
        self.state().lanes()
    }
}

/// Kinematic state of a batch of double pendulums.
///
/// Every lane vector has the same length; lane `i` of each field belongs to pendulum `i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendulumState {
    /// Elapsed time [s]
    pub t: f64,
    /// Angle of the first segment [rad]
    pub theta1: Lanes,
    /// Angle of the second segment [rad]
    pub theta2: Lanes,
    /// Angular velocity of the first segment [rad/s]
    pub omega1: Lanes,
    /// Angular velocity of the second segment [rad/s]
    pub omega2: Lanes,
    /// Angular acceleration of the first segment [rad/s²]
    pub alpha1: Lanes,
    /// Angular acceleration of the second segment [rad/s²]
    pub alpha2: Lanes,
}

impl PendulumState {
    /// Single pendulum with zero velocity and acceleration.
    pub fn scalar(t: f64, theta1: f64, theta2: f64) -> Self {
        Self::at_rest(t, lanes_from(&[theta1]), lanes_from(&[theta2]))
    }

    /// Batch with the given starting angles and zero velocities/accelerations.
    ///
    /// Lane counts are not checked here; models validate on construction.
    pub fn at_rest(t: f64, theta1: Lanes, theta2: Lanes) -> Self {
        let n = theta1.len();
        Self {
            t,
            theta1,
            theta2,
            omega1: DVector::zeros(n),
            omega2: DVector::zeros(n),
            alpha1: DVector::zeros(n),
            alpha2: DVector::zeros(n),
        }
    }

    /// Replaces the starting angular velocities.
    pub fn with_omega(mut self, omega1: Lanes, omega2: Lanes) -> Self {
        self.omega1 = omega1;
        self.omega2 = omega2;
        self
    }

    /// Replaces the starting angular accelerations.
    pub fn with_alpha(mut self, alpha1: Lanes, alpha2: Lanes) -> Self {
        self.alpha1 = alpha1;
        self.alpha2 = alpha2;
        self
    }

    /// Number of pendulums in the batch.
    pub fn lanes(&self) -> usize {
        self.theta1.len()
    }

    /// Checks every lane vector against `theta1`'s length.
    ///
    /// Single-lane velocity or acceleration vectors are broadcast to the batch, matching how
    /// a scalar default spreads over array-valued angles.
    pub(crate) fn validated(self) -> Result<Self> {
        let n = self.lanes();
        if n == 0 {
            return Err(SimulationError::EmptyBatch);
        }
        if self.theta2.len() != n {
            return Err(SimulationError::shape_mismatch("theta2", n, self.theta2.len()));
        }
        Ok(Self {
            t: self.t,
            theta1: self.theta1,
            theta2: self.theta2,
            omega1: broadcast("omega1", self.omega1, n)?,
            omega2: broadcast("omega2", self.omega2, n)?,
            alpha1: broadcast("alpha1", self.alpha1, n)?,
            alpha2: broadcast("alpha2", self.alpha2, n)?,
        })
    }

    /// True when every angle, velocity and acceleration is finite.
    pub fn is_finite(&self) -> bool {
        [
            &self.theta1,
            &self.theta2,
            &self.omega1,
            &self.omega2,
            &self.alpha1,
            &self.alpha2,
        ]
        .iter()
        .all(|v| v.iter().all(|x| x.is_finite()))
    }
}

/// Rejects a non-positive or non-finite time step.
pub(crate) fn validate_dt(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(SimulationError::invalid_time_step(dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clock that only counts.
    struct Counter {
        t: f64,
        dt: f64,
        steps: usize,
    }

    impl Simulation for Counter {
        fn time(&self) -> f64 {
            self.t
        }

        fn do_step(&mut self) {
            self.t += self.dt;
            self.steps += 1;
        }
    }

    #[test]
    fn test_step_until_overshoots() {
        let mut c = Counter { t: 0.0, dt: 0.25, steps: 0 };
        let taken = c.step_until(1.1);
        assert_eq!(taken, 5);
        assert_eq!(c.steps, 5);
        assert_eq!(c.time(), 1.25);
    }

    #[test]
    fn test_step_until_exact_boundary() {
        let mut c = Counter { t: 0.0, dt: 0.5, steps: 0 };
        assert_eq!(c.step_until(1.0), 2);
        assert_eq!(c.time(), 1.0);
        // Already at target: strict comparison takes no step.
        assert_eq!(c.step_until(1.0), 0);
    }

    #[test]
    fn test_step_until_past_target_is_noop() {
        let mut c = Counter { t: 3.0, dt: 0.5, steps: 0 };
        assert_eq!(c.step_until(-1.0), 0);
        assert_eq!(c.time(), 3.0);
    }

    #[test]
    fn test_validated_broadcasts_rates() {
        let state = PendulumState::at_rest(0.0, lanes_from(&[1.0, 2.0, 3.0]), lanes_from(&[0.0; 3]))
            .with_omega(lanes_from(&[0.5]), lanes_from(&[0.0, 0.1, 0.2]))
            .validated()
            .unwrap();
        assert_eq!(state.omega1.len(), 3);
        assert_eq!(state.omega1[2], 0.5);
    }

    #[test]
    fn test_validated_rejects_theta_mismatch() {
        let err = PendulumState::at_rest(0.0, lanes_from(&[1.0, 2.0]), lanes_from(&[1.0]))
            .validated()
            .unwrap_err();
        assert!(matches!(err, SimulationError::ShapeMismatch { field: "theta2", .. }));
    }

    #[test]
    fn test_validated_rejects_empty() {
        let err = PendulumState::at_rest(0.0, lanes_from(&[]), lanes_from(&[]))
            .validated()
            .unwrap_err();
        assert!(matches!(err, SimulationError::EmptyBatch));
    }

    #[test]
    fn test_validate_dt() {
        assert!(validate_dt(1e-4).is_ok());
        assert!(validate_dt(0.0).is_err());
        assert!(validate_dt(-1.0).is_err());
        assert!(validate_dt(f64::NAN).is_err());
    }
}
