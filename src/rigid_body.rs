// src/rigid_body.rs
// Rigid-body double pendulum with joint friction: two rods with their own moments of inertia.
// The coupled accelerations are NOT solved as a simultaneous 2x2 system: each step's `alpha1` reads the
// previous `alpha2` and vice versa. That one-step lag is part of the model and is kept as is,
// so results will not match textbook rigid double-pendulum mechanics exactly.

use nalgebra::DVector;
use tracing::debug;

use crate::error::Result;
use crate::math::{broadcast, lanes_from, normalize_angle, sign, Lanes};
use crate::simulation::{validate_dt, DoublePendulum, PendulumState, Simulation};

/// Physical constants of the rigid-body model.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyParams {
    /// Gravitational acceleration [m/s²]
    pub g: f64,
    /// Mass of the first rod [kg]
    pub m1: f64,
    /// Mass of the second rod [kg]
    pub m2: f64,
    /// First rod length per lane [m]
    pub l1: Lanes,
    /// Second rod length per lane [m]
    pub l2: Lanes,
    /// Extra moment of inertia at the first joint [kg·m²]
    pub i1: f64,
    /// Extra moment of inertia at the second joint [kg·m²]
    pub i2: f64,
    /// Friction coefficient of the first joint
    pub c1: f64,
    /// Friction coefficient of the second joint
    pub c2: f64,
}

impl RigidBodyParams {
    /// Constants with one rod length pair shared by every lane.
    #[allow(clippy::too_many_arguments)]
    pub fn new(g: f64, m1: f64, m2: f64, l1: f64, l2: f64, i1: f64, i2: f64, c1: f64, c2: f64) -> Self {
        Self {
            g,
            m1,
            m2,
            l1: lanes_from(&[l1]),
            l2: lanes_from(&[l2]),
            i1,
            i2,
            c1,
            c2,
        }
    }

    /// The measured bench apparatus: 131 g rods, 33.8 cm long, frictionless joints.
    pub fn preset() -> Self {
        Self::new(9.81, 0.131, 0.131, 0.338, 0.338, 0.014, 0.0099, 0.0, 0.0)
    }
}

/// Per-lane combinations of the constants, fixed for the life of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedConstants {
    /// Effective inertia of the first rod
    pub i1_eff: Lanes,
    /// Effective inertia of the second rod
    pub i2_eff: Lanes,
    /// Coupling coefficient
    pub k: Lanes,
    /// Gravity torque coefficient, first rod
    pub a: Lanes,
    /// Gravity torque coefficient, second rod
    pub b: Lanes,
}

impl DerivedConstants {
    fn from_params(p: &RigidBodyParams) -> Self {
        let (m1, m2, g) = (p.m1, p.m2, p.g);
        Self {
            i1_eff: p.l1.map(|l1| m1 * l1 * l1 / 4.0 + m2 * l1 * l1 + p.i1),
            i2_eff: p.l2.map(|l2| m2 * l2 * l2 / 4.0 + m2 * l2 * l2 + p.i2),
            k: p.l1.zip_map(&p.l2, |l1, l2| m2 * l1 * l2 / 2.0),
            a: p.l1.map(|l1| (m1 + 2.0 * m2) / 2.0 * g * l1),
            b: p.l2.map(|l2| 0.5 * m2 * g * l2),
        }
    }
}

/// Friction term of the first joint. Zero when the joint is at rest.
pub fn friction_first(c1: f64, l1: f64, i1_eff: f64, omega1: f64) -> f64 {
    sign(omega1) * c1 * omega1 * omega1 * l1 * l1 / i1_eff
}

/// Friction term of the second joint, driven by the squared speed of the second rod's tip.
pub fn friction_second(
    c2: f64,
    l1: f64,
    l2: f64,
    theta1: f64,
    theta2: f64,
    omega1: f64,
    omega2: f64,
) -> f64 {
    let vx = omega1 * l1 * theta1.cos() + omega2 * l2 * theta2.cos();
    let vy = omega1 * l1 * theta1.sin() + omega2 * l2 * theta2.sin();
    sign(omega2) * c2 * (vx * vx + vy * vy)
}

/// Batched rigid-body double pendulum.
#[derive(Debug, Clone)]
pub struct RigidBodyDoublePendulum {
    dt: f64,
    params: RigidBodyParams,
    derived: DerivedConstants,
    state: PendulumState,
    use_angle_normalization: bool,
}

impl RigidBodyDoublePendulum {
    /// Builds the model and caches the derived constants.
    ///
    /// Single-lane lengths are broadcast over the batch. Fails on a non-positive `dt`, an
    /// empty batch, or lane vectors of different lengths.
    pub fn new(
        dt: f64,
        params: RigidBodyParams,
        initial: PendulumState,
        use_angle_normalization: bool,
    ) -> Result<Self> {
        validate_dt(dt)?;
        let state = initial.validated()?;
        let lanes = state.lanes();
        let params = RigidBodyParams {
            l1: broadcast("l1", params.l1, lanes)?,
            l2: broadcast("l2", params.l2, lanes)?,
            ..params
        };
        let derived = DerivedConstants::from_params(&params);
        debug!(
            dt,
            lanes,
            c1 = params.c1,
            c2 = params.c2,
            use_angle_normalization,
            "rigid-body double pendulum constructed"
        );
        Ok(Self {
            dt,
            params,
            derived,
            state,
            use_angle_normalization,
        })
    }

    /// Fixed integration step [s].
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn params(&self) -> &RigidBodyParams {
        &self.params
    }

    pub fn derived(&self) -> &DerivedConstants {
        &self.derived
    }

    fn simplify_theta(&self, theta: f64) -> f64 {
        if self.use_angle_normalization {
            normalize_angle(theta)
        } else {
            theta
        }
    }

    /// Next accelerations of lane `i`, from the pre-step values of that lane.
    fn accelerations(&self, prev: &PendulumState, i: usize) -> (f64, f64) {
        let p = &self.params;
        let d = &self.derived;
        let (l1, l2) = (p.l1[i], p.l2[i]);
        let (theta1, theta2) = (prev.theta1[i], prev.theta2[i]);
        let (omega1, omega2) = (prev.omega1[i], prev.omega2[i]);
        let (alpha1, alpha2) = (prev.alpha1[i], prev.alpha2[i]);
        let (i1_eff, i2_eff, k) = (d.i1_eff[i], d.i2_eff[i], d.k[i]);

        let s = (theta1 - theta2).sin();
        let c = (theta1 - theta2).cos();

        let fw1 = friction_first(p.c1, l1, i1_eff, omega1);
        let fw2 = friction_second(p.c2, l1, l2, theta1, theta2, omega1, omega2);

        // Lagged coupling: old alpha2 feeds alpha1, old alpha1 feeds alpha2.
        let next_alpha1 =
            -((k * (omega2 * omega2 * s + alpha2 * c) + d.a[i] * theta1.sin()) + fw1) / i1_eff;
        let next_alpha2 =
            (2.0 * (k * (omega1 * omega1 * s - alpha1 * c) - d.b[i] * theta2.sin()) - fw2) / i2_eff;

        (next_alpha1, next_alpha2)
    }
}

impl Simulation for RigidBodyDoublePendulum {
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
            let (a1, a2) = self.accelerations(prev, i);
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

impl DoublePendulum for RigidBodyDoublePendulum {
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

/// The bench apparatus as a ready-made model; only the initial state and options vary.
pub fn our_double_pendulum(
    dt: f64,
    initial: PendulumState,
    use_angle_normalization: bool,
) -> Result<RigidBodyDoublePendulum> {
    RigidBodyDoublePendulum::new(dt, RigidBodyParams::preset(), initial, use_angle_normalization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_derived_constants() {
        let params = RigidBodyParams::new(9.81, 0.2, 0.3, 0.5, 0.4, 0.01, 0.02, 0.0, 0.0);
        let sim =
            RigidBodyDoublePendulum::new(1e-3, params, PendulumState::scalar(0.0, 0.0, 0.0), false).unwrap();
        let d = sim.derived();
        assert_relative_eq!(d.i1_eff[0], 0.2 * 0.25 / 4.0 + 0.3 * 0.25 + 0.01, epsilon = 1e-15);
        assert_relative_eq!(d.i2_eff[0], 0.3 * 0.16 / 4.0 + 0.3 * 0.16 + 0.02, epsilon = 1e-15);
        assert_relative_eq!(d.k[0], 0.3 * 0.5 * 0.4 / 2.0, epsilon = 1e-15);
        assert_relative_eq!(d.a[0], (0.2 + 0.6) / 2.0 * 9.81 * 0.5, epsilon = 1e-15);
        assert_relative_eq!(d.b[0], 0.5 * 0.3 * 9.81 * 0.4, epsilon = 1e-15);
    }

    #[test]
    fn test_friction_sign() {
        assert!(friction_first(0.5, 0.3, 0.02, 2.0) > 0.0);
        assert!(friction_first(0.5, 0.3, 0.02, -2.0) < 0.0);
        assert_eq!(friction_first(0.5, 0.3, 0.02, 0.0), 0.0);
        assert_eq!(friction_second(0.5, 0.3, 0.3, 1.0, 2.0, 3.0, 0.0), 0.0);
        assert!(friction_second(0.5, 0.3, 0.3, 1.0, 2.0, 0.0, 1.0) > 0.0);
    }

    #[test]
    fn test_friction_slows_spinning_joint() {
        let spin = PendulumState::scalar(0.0, 0.0, 0.0).with_omega(lanes_from(&[3.0]), lanes_from(&[0.0]));
        let mut free = RigidBodyDoublePendulum::new(
            1e-3,
            RigidBodyParams::new(9.81, 0.1, 0.1, 0.3, 0.3, 0.01, 0.01, 0.0, 0.0),
            spin.clone(),
            false,
        )
        .unwrap();
        let mut damped = RigidBodyDoublePendulum::new(
            1e-3,
            RigidBodyParams::new(9.81, 0.1, 0.1, 0.3, 0.3, 0.01, 0.01, 0.05, 0.0),
            spin,
            false,
        )
        .unwrap();
        free.do_step();
        damped.do_step();
        assert!(damped.state().alpha1[0] < free.state().alpha1[0]);
    }

    #[test]
    fn test_lagged_alpha_coupling() {
        // With theta = omega = 0 the only source of alpha2 is the old alpha1.
        let initial = PendulumState::scalar(0.0, 0.0, 0.0)
            .with_alpha(lanes_from(&[1.5]), lanes_from(&[0.0]));
        let mut sim =
            RigidBodyDoublePendulum::new(1e-3, RigidBodyParams::preset(), initial, false).unwrap();
        sim.do_step();
        let d = sim.derived().clone();
        assert_eq!(sim.state().alpha1[0], 0.0);
        assert_relative_eq!(sim.state().alpha2[0], -2.0 * d.k[0] * 1.5 / d.i2_eff[0], epsilon = 1e-15);
    }

    #[test]
    fn test_preset_params() {
        let p = RigidBodyParams::preset();
        assert_eq!(p.g, 9.81);
        assert_eq!(p.m1, 0.131);
        assert_eq!(p.m2, 0.131);
        assert_eq!(p.l1[0], 0.338);
        assert_eq!(p.l2[0], 0.338);
        assert_eq!(p.i1, 0.014);
        assert_eq!(p.i2, 0.0099);
        assert_eq!(p.c1, 0.0);
        assert_eq!(p.c2, 0.0);
    }

    #[test]
    fn test_upright_balance_is_unstable() {
        use std::f64::consts::PI;
        let mut sim = our_double_pendulum(1e-4, PendulumState::scalar(0.0, PI, PI - 1e-3), false).unwrap();
        sim.step_until(2.0);
        assert!(sim.state().is_finite());
        assert!((sim.theta1()[0] - PI).abs() > 1e-3);
    }
}
