// src/lib.rs
// Double pendulum simulation: fixed-step explicit integration of two double-pendulum models
// (ideal point masses, and rigid rods with joint friction), each advancing a batch of independent
// pendulums in lockstep. Around the core sit a sampling driver for ensemble studies, chart rendering,
// and an HTTP surface for the browser renderer.

pub mod config;
pub mod error;
pub mod ideal;
pub mod math;
pub mod plot;
pub mod reference;
pub mod rigid_body;
pub mod simulation;
pub mod trajectory;
pub mod ui;

pub use error::{Result, SimulationError};
pub use ideal::{IdealDoublePendulum, IdealParams};
pub use rigid_body::{our_double_pendulum, RigidBodyDoublePendulum, RigidBodyParams};
pub use simulation::{DoublePendulum, PendulumState, Simulation};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ideal::{IdealDoublePendulum, IdealParams};
    pub use crate::math::{lanes_from, normalize_angle, Lanes};
    pub use crate::reference;
    pub use crate::rigid_body::{our_double_pendulum, RigidBodyDoublePendulum, RigidBodyParams};
    pub use crate::simulation::{DoublePendulum, PendulumState, Simulation};
    pub use crate::trajectory::Trajectory;
}
