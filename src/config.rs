// src/config.rs
// Server settings (file + environment) and the JSON body of a simulation request,
// together with the translation of a request into a ready-to-step model.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SimulationError};
use crate::ideal::{IdealDoublePendulum, IdealParams};
use crate::math::{lanes_from, Lanes};
use crate::reference::{model_angles, MEASURED_START_ANGLES};
use crate::rigid_body::{our_double_pendulum, RigidBodyDoublePendulum, RigidBodyParams};
use crate::simulation::{DoublePendulum, PendulumState};

/// Environment variable naming a JSON server config file.
pub const CONFIG_ENV: &str = "PENDULUM_CONFIG";
/// Environment override for the bind address.
pub const BIND_ENV: &str = "PENDULUM_BIND";
/// Environment override for the port.
pub const PORT_ENV: &str = "PENDULUM_PORT";

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub bind_address: String,
    /// TCP port
    pub port: u16,
    /// Directory holding the renderer page
    pub static_dir: PathBuf,
    /// Ceiling on integration steps per request
    pub max_steps: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            static_dir: PathBuf::from("static"),
            max_steps: 2_000_000,
        }
    }
}

impl ServerConfig {
    /// Parses a JSON config; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SimulationError::invalid_config(e.to_string()))
    }

    /// Loads the file named by `PENDULUM_CONFIG` (if any), then applies env overrides.
    pub async fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path)).await?,
            Err(_) => Self::default(),
        };
        if let Ok(bind) = std::env::var(BIND_ENV) {
            config.bind_address = bind;
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            config.port = port
                .parse()
                .map_err(|_| SimulationError::invalid_config(format!("{PORT_ENV}={port} is not a port")))?;
        }
        config.validate()?;
        Ok(config)
    }

    async fn from_file(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            SimulationError::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "loaded server config");
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(SimulationError::invalid_config("max_steps must be > 0"));
        }
        Ok(())
    }
}

/// Which model a request runs, with its constants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    /// Point masses on massless rods
    Ideal { g: f64, m1: f64, m2: f64, l1: f64, l2: f64 },
    /// Rods with inertia and joint friction
    RigidBody {
        g: f64,
        m1: f64,
        m2: f64,
        l1: f64,
        l2: f64,
        i1: f64,
        i2: f64,
        #[serde(default)]
        c1: f64,
        #[serde(default)]
        c2: f64,
    },
    /// The bench apparatus
    #[default]
    Preset,
}

/// Where the starting angles come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleSource {
    /// `theta1` / `theta2` from the request
    #[default]
    Explicit,
    /// The measured pairs, mapped through `π - raw`
    Reference,
}

/// Body of `POST /api/simulate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub model: ModelSpec,
    /// Integration step [s]
    pub dt: f64,
    /// Simulated span [s]
    pub t_end: f64,
    /// Spacing of recorded samples [s]
    pub sample_interval: f64,
    pub angle_source: AngleSource,
    /// Starting first-segment angles [rad], one per pendulum
    pub theta1: Vec<f64>,
    /// Starting second-segment angles [rad], one per pendulum
    pub theta2: Vec<f64>,
    /// Starting angular velocities; empty means at rest, one value is shared by all lanes
    pub omega1: Vec<f64>,
    pub omega2: Vec<f64>,
    pub use_angle_normalization: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            model: ModelSpec::Preset,
            dt: 1e-4,
            t_end: 15.0,
            sample_interval: 0.02,
            angle_source: AngleSource::Explicit,
            theta1: vec![std::f64::consts::PI],
            theta2: vec![std::f64::consts::PI * 0.99999],
            omega1: Vec::new(),
            omega2: Vec::new(),
            use_angle_normalization: false,
        }
    }
}

impl SimParams {
    /// Integration steps the run needs (the final sample may add one more).
    pub fn required_steps(&self) -> u64 {
        (self.t_end / self.dt).ceil().max(0.0) as u64
    }

    /// Samples the run records; saturates for absurdly small intervals.
    pub fn required_samples(&self) -> u64 {
        (self.t_end / self.sample_interval).ceil().max(0.0) as u64
    }

    /// Checks the run against the step and sample budgets and basic sanity.
    ///
    /// Both budgets share `max_steps` as their ceiling.
    pub fn validate(&self, max_steps: u64) -> Result<()> {
        if !(self.t_end.is_finite() && self.t_end >= 0.0) {
            return Err(SimulationError::invalid_config(format!(
                "t_end must be finite and >= 0, got {}",
                self.t_end
            )));
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimulationError::invalid_time_step(self.dt));
        }
        let requested = self.required_steps();
        if requested > max_steps {
            return Err(SimulationError::StepBudgetExceeded {
                requested,
                limit: max_steps,
            });
        }
        if !(self.sample_interval.is_finite() && self.sample_interval > 0.0) {
            return Err(SimulationError::invalid_config(format!(
                "sample_interval must be finite and > 0, got {}",
                self.sample_interval
            )));
        }
        let samples = self.required_samples();
        if samples > max_steps {
            return Err(SimulationError::SampleBudgetExceeded {
                requested: samples,
                limit: max_steps,
            });
        }
        Ok(())
    }

    /// Initial state at `t = 0` for the selected angle source.
    pub fn initial_state(&self) -> PendulumState {
        let (theta1, theta2) = match self.angle_source {
            AngleSource::Explicit => (lanes_from(&self.theta1), lanes_from(&self.theta2)),
            AngleSource::Reference => model_angles(&MEASURED_START_ANGLES),
        };
        let n = theta1.len();
        let rate = |values: &[f64]| {
            if values.is_empty() {
                Lanes::zeros(n)
            } else {
                lanes_from(values)
            }
        };
        let omega1 = rate(&self.omega1);
        let omega2 = rate(&self.omega2);
        PendulumState::at_rest(0.0, theta1, theta2).with_omega(omega1, omega2)
    }

    /// Builds the requested model.
    pub fn build_model(&self) -> Result<Box<dyn DoublePendulum>> {
        let initial = self.initial_state();
        let norm = self.use_angle_normalization;
        debug!(model = ?self.model, lanes = initial.lanes(), "building model");
        let model: Box<dyn DoublePendulum> = match self.model {
            ModelSpec::Ideal { g, m1, m2, l1, l2 } => Box::new(IdealDoublePendulum::new(
                self.dt,
                IdealParams::new(g, m1, m2, l1, l2),
                initial,
                norm,
            )?),
            ModelSpec::RigidBody { g, m1, m2, l1, l2, i1, i2, c1, c2 } => {
                Box::new(RigidBodyDoublePendulum::new(
                    self.dt,
                    RigidBodyParams::new(g, m1, m2, l1, l2, i1, i2, c1, c2),
                    initial,
                    norm,
                )?)
            }
            ModelSpec::Preset => Box::new(our_double_pendulum(self.dt, initial, norm)?),
        };
        Ok(model)
    }
}
