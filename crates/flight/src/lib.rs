//! Airship flight: kinematic controller, autopilot planner and the landing/interior transfer gate.

pub mod autopilot;
pub mod config;
pub mod controller;
pub mod landing;

pub use autopilot::{plan, AutopilotTask, PlanOutput};
pub use config::FlightConfig;
pub use controller::{ControlIntent, FlightController, FlightEvent, MovementState};
pub use landing::{LandingOutcome, TransferConfig, TransferGate, TransferRequest};
