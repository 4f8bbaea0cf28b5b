// src/trajectory.rs
// Batch sampling driver: walks a model through evenly spaced target times with `step_until`,
// records the angles of every lane, then derives the series the charts and the renderer consume.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, SimulationError};
use crate::math::Lanes;
use crate::simulation::DoublePendulum;

/// Angles of every lane at a sequence of sample times.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    /// Model clock after each sample [s]; overshoots the target by less than `dt`
    pub times: Vec<f64>,
    /// First segment angle of every lane, one entry per sample
    pub theta1: Vec<Lanes>,
    /// Second segment angle of every lane, one entry per sample
    pub theta2: Vec<Lanes>,
    /// First rod length per lane [m]
    pub l1: Vec<f64>,
    /// Second rod length per lane [m]
    pub l2: Vec<f64>,
}

/// Cartesian joint positions, indexed `[lane][sample]`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartesianSeries {
    pub x1: Vec<Vec<f64>>,
    pub y1: Vec<Vec<f64>>,
    pub x2: Vec<Vec<f64>>,
    pub y2: Vec<Vec<f64>>,
    /// Distance of the first joint from the pivot
    pub r1: Vec<Vec<f64>>,
    /// Distance of the tip from the pivot
    pub r2: Vec<Vec<f64>>,
}

/// Spread across lanes at each sample (population standard deviation).
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnsembleStats {
    pub sigma_theta1: Vec<f64>,
    pub sigma_theta2: Vec<f64>,
    pub sigma_r1: Vec<f64>,
    pub sigma_r2: Vec<f64>,
}

/// Endpoints of the two drawn segments of one pendulum: pivot, elbow, tip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segments {
    pub pivot: (f64, f64),
    pub elbow: (f64, f64),
    pub tip: (f64, f64),
}

/// Screen-space segments for one lane; `y` grows downward so `theta = 0` hangs below the pivot.
pub fn segment_endpoints(
    pivot: (f64, f64),
    scale: f64,
    l1: f64,
    l2: f64,
    theta1: f64,
    theta2: f64,
) -> Segments {
    let (x1, y1) = pivot;
    let x2 = x1 + scale * l1 * theta1.sin();
    let y2 = y1 + scale * l1 * theta1.cos();
    let x3 = x2 + scale * l2 * theta2.sin();
    let y3 = y2 + scale * l2 * theta2.cos();
    Segments {
        pivot,
        elbow: (x2, y2),
        tip: (x3, y3),
    }
}

impl Trajectory {
    /// Samples `sim` at `t0, t0 + interval, ...` for every target below `t0 + duration`,
    /// where `t0` is the model clock on entry.
    pub fn sample<S>(sim: &mut S, duration: f64, interval: f64) -> Result<Self>
    where
        S: DoublePendulum + ?Sized,
    {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(SimulationError::invalid_config(format!(
                "sample interval must be finite and > 0, got {interval}"
            )));
        }
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(SimulationError::invalid_config(format!(
                "duration must be finite and >= 0, got {duration}"
            )));
        }

        let ratio = (duration / interval).ceil();
        if !(ratio.is_finite() && ratio <= usize::MAX as f64) {
            return Err(SimulationError::invalid_config(format!(
                "{duration} s at {interval} s per sample is not a countable number of samples"
            )));
        }
        let samples = ratio as usize;

        let t0 = sim.time();
        let mut traj = Self {
            l1: sim.l1().iter().copied().collect(),
            l2: sim.l2().iter().copied().collect(),
            ..Self::default()
        };
        let reserve = |e: std::collections::TryReserveError| {
            SimulationError::invalid_config(format!("cannot hold {samples} samples: {e}"))
        };
        traj.times.try_reserve_exact(samples).map_err(reserve)?;
        traj.theta1.try_reserve_exact(samples).map_err(reserve)?;
        traj.theta2.try_reserve_exact(samples).map_err(reserve)?;

        let mut steps = 0usize;
        let mut reported_non_finite = false;
        for k in 0..samples {
            steps += sim.step_until(t0 + k as f64 * interval);
            if !reported_non_finite && !sim.state().is_finite() {
                warn!(time = sim.time(), "state became non-finite; values propagate unchanged");
                reported_non_finite = true;
            }
            traj.times.push(sim.time());
            traj.theta1.push(sim.theta1().clone());
            traj.theta2.push(sim.theta2().clone());
        }

        info!(samples, steps, lanes = sim.lanes(), end_time = sim.time(), "trajectory sampled");
        Ok(traj)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Number of lanes.
    pub fn lanes(&self) -> usize {
        self.l1.len()
    }

    /// `theta1` of one lane over time.
    pub fn theta1_series(&self, lane: usize) -> Vec<f64> {
        self.theta1.iter().map(|s| s[lane]).collect()
    }

    /// `theta2` of one lane over time.
    pub fn theta2_series(&self, lane: usize) -> Vec<f64> {
        self.theta2.iter().map(|s| s[lane]).collect()
    }

    /// Joint positions with the pivot at the origin, angles measured from the x axis.
    pub fn cartesian(&self) -> CartesianSeries {
        let mut out = CartesianSeries::default();
        for lane in 0..self.lanes() {
            let (l1, l2) = (self.l1[lane], self.l2[lane]);
            let x1: Vec<f64> = self.theta1.iter().map(|s| l1 * s[lane].cos()).collect();
            let y1: Vec<f64> = self.theta1.iter().map(|s| l1 * s[lane].sin()).collect();
            let x2: Vec<f64> = self.theta2.iter().zip(&x1).map(|(s, x)| l2 * s[lane].cos() + x).collect();
            let y2: Vec<f64> = self.theta2.iter().zip(&y1).map(|(s, y)| l2 * s[lane].sin() + y).collect();
            out.r1.push(x1.iter().zip(&y1).map(|(x, y)| x.hypot(*y)).collect());
            out.r2.push(x2.iter().zip(&y2).map(|(x, y)| x.hypot(*y)).collect());
            out.x1.push(x1);
            out.y1.push(y1);
            out.x2.push(x2);
            out.y2.push(y2);
        }
        out
    }

    /// Ensemble spread of the angles and joint radii at every sample.
    pub fn ensemble_stats(&self) -> EnsembleStats {
        let cart = self.cartesian();
        // nalgebra's variance divides by N.
        let across = |series: &[Vec<f64>], k: usize| -> f64 {
            Lanes::from_iterator(series.len(), series.iter().map(|lane| lane[k]))
                .variance()
                .sqrt()
        };
        EnsembleStats {
            sigma_theta1: self.theta1.iter().map(|s| s.variance().sqrt()).collect(),
            sigma_theta2: self.theta2.iter().map(|s| s.variance().sqrt()).collect(),
            sigma_r1: (0..self.len()).map(|k| across(&cart.r1, k)).collect(),
            sigma_r2: (0..self.len()).map(|k| across(&cart.r2, k)).collect(),
        }
    }

    /// Drawable segments for every sample and lane, pivot at the origin.
    pub fn segment_frames(&self, scale: f64) -> Vec<Vec<Segments>> {
        self.theta1
            .iter()
            .zip(&self.theta2)
            .map(|(t1, t2)| {
                (0..self.lanes())
                    .map(|lane| {
                        segment_endpoints((0.0, 0.0), scale, self.l1[lane], self.l2[lane], t1[lane], t2[lane])
                    })
                    .collect()
            })
            .collect()
    }

    /// Longest fully stretched pendulum in the batch [m].
    pub fn reach(&self) -> f64 {
        self.l1
            .iter()
            .zip(&self.l2)
            .map(|(a, b)| a + b)
            .fold(0.0, f64::max)
    }
}
