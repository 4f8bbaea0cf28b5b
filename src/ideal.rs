// src/ideal.rs
// Ideal double pendulum: two point masses on massless rods.
// Accelerations come from the closed-form Lagrangian solution and the state advances with explicit Euler;
// every next value is computed from the pre-step snapshot, then the whole record is replaced at once.

use nalgebra::DVector;
use tracing::debug;

use crate::error::Result;
use crate::math::{broadcast, lanes_from, normalize_angle, Lanes};
use crate::simulation::{validate_dt, DoublePendulum, PendulumState, Simulation};

/// Physical constants of the ideal model.
#[derive(Debug, Clone, PartialEq)]
pub struct IdealParams {
    /// Gravitational acceleration [m/s²]
    pub g: f64,
    /// First point mass [kg]
    pub m1: f64,
    /// Second point mass [kg]
    pub m2: f64,
    /// First rod length per lane [m]
    pub l1: Lanes,
    /// Second rod length per lane [m]
    pub l2: Lanes,
}

impl IdealParams {
    /// Constants with one rod length pair shared by every lane.
    pub fn new(g: f64, m1: f64, m2: f64, l1: f64, l2: f64) -> Self {
        Self {
            g,
            m1,
            m2,
            l1: lanes_from(&[l1]),
            l2: lanes_from(&[l2]),
        }
    }
}

/// Angular accelerations of one lane.
///
/// Denominators are not guarded; a singular configuration yields ±inf or NaN.
fn accelerations(
    params: &IdealParams,
    l1: f64,
    l2: f64,
    theta1: f64,
    theta2: f64,
    omega1: f64,
    omega2: f64,
) -> (f64, f64) {
    let IdealParams { g, m1, m2, .. } = *params;
    let delta = theta1 - theta2;
    let denom = 2.0 * m1 + m2 - m2 * (2.0 * theta1 - 2.0 * theta2).cos();

    let alpha1 = (-g * (2.0 * m1 + m2) * theta1.sin()
        - m2 * g * (theta1 - 2.0 * theta2).sin()
        - 2.0 * delta.sin() * m2 * (omega2 * omega2 * l2 + omega1 * omega1 * l1 * delta.cos()))
        / (l1 * denom);

    let alpha2 = (2.0
        * delta.sin()
        * (omega1 * omega1 * l1 * (m1 + m2)
            + g * (m1 + m2) * theta1.cos()
            + omega2 * omega2 * l2 * m2 * delta.cos()))
        / (l2 * denom);

    (alpha1, alpha2)
}

/// Batched ideal double pendulum.
#[derive(Debug, Clone)]
pub struct IdealDoublePendulum {
    dt: f64,
    params: IdealParams,
    state: PendulumState,
    use_angle_normalization: bool,
}

impl IdealDoublePendulum {
    /// Builds the model. Single-lane lengths are broadcast over the batch.
    ///
    /// Fails on a non-positive `dt`, an empty batch, or lane vectors of different lengths.
    pub fn new(
        dt: f64,
        params: IdealParams,
        initial: PendulumState,
        use_angle_normalization: bool,
    ) -> Result<Self> {
        validate_dt(dt)?;
        let state = initial.validated()?;
        let lanes = state.lanes();
        let params = IdealParams {
            l1: broadcast("l1", params.l1, lanes)?,
            l2: broadcast("l2", params.l2, lanes)?,
            ..params
        };
        debug!(dt, lanes, use_angle_normalization, "ideal double pendulum constructed");
        Ok(Self {
            dt,
            params,
            state,
            use_angle_normalization,
        })
    }

    /// Fixed integration step [s].
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Physical constants, lengths already broadcast per lane.
    pub fn params(&self) -> &IdealParams {
        &self.params
    }

    fn simplify_theta(&self, theta: f64) -> f64 {
        if self.use_angle_normalization {
            normalize_angle(theta)
        } else {
            theta
        }
    }
}

impl Simulation for IdealDoublePendulum {
    fn time(&self) -> f64 {
        self.state.t
    }

    fn do_step(&mut self) {
        let dt = self.dt;
        let prev = &self.state;
        let n = prev.lanes();

        let mut alpha1 = DVector::zeros(n);
        let mut alpha2 = DVector::zeros(n);
        for i in 0..n {
            let (a1, a2) = accelerations(
                &self.params,
                self.params.l1[i],
                self.params.l2[i],
                prev.theta1[i],
                prev.theta2[i],
                prev.omega1[i],
                prev.omega2[i],
            );
            alpha1[i] = a1;
            alpha2[i] = a2;
        }

        let next = PendulumState {
            t: prev.t + dt,
            theta1: prev.theta1.zip_map(&prev.omega1, |th, w| self.simplify_theta(th + w * dt)),
            theta2: prev.theta2.zip_map(&prev.omega2, |th, w| self.simplify_theta(th + w * dt)),
            omega1: prev.omega1.zip_map(&prev.alpha1, |w, a| w + a * dt),
            omega2: prev.omega2.zip_map(&prev.alpha2, |w, a| w + a * dt),
            alpha1,
            alpha2,
        };
        self.state = next;
    }
}

impl DoublePendulum for IdealDoublePendulum {
    fn state(&self) -> &PendulumState {
        &self.state
    }

    fn l1(&self) -> &Lanes {
        &self.params.l1
    }

    fn l2(&self) -> &Lanes {
        &self.params.l2
    }
}
