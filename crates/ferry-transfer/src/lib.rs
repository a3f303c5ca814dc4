pub mod coordinator;
pub mod dispatcher;
pub mod node;
pub mod precondition;
pub mod registry;
pub mod resolver;
pub mod workflow;

pub use coordinator::{Reservation, ReservationCoordinator};
pub use dispatcher::WorkflowDispatcher;
pub use node::TransferNode;
pub use precondition::{PreconditionChecker, Preconditions};
pub use registry::ReservationRegistry;
pub use resolver::{ResolvedEdge, TransferMap};
pub use workflow::{FsWorkflowSource, WorkflowLoader};
