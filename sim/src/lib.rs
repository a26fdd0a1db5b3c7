pub mod aircraft;
pub mod queue;
pub mod simulator;
pub mod unassigned;
pub mod world;

pub use aircraft::{
    Aircraft, AircraftKind, EventKind, GotoReason, LegState, PathEval, PlanStop, PlannedEvent,
    Status, UavAttributes, UpdateEvent, WbAttributes,
};
pub use queue::{EventQueue, FleetKind, QueueItem};
pub use simulator::{Simulator, UavCoordinator, WbCoordinator};
pub use unassigned::UnassignedController;
pub use world::{assign_ignitions, World};
