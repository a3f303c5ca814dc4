//! Test doubles for the collaborator traits and shared config fixtures.

mod fixtures;
mod mocks;

pub use fixtures::{
    sample_config, stack_to_reader_workflow, write_config, write_workflows, SAMPLE_CONFIG,
};
pub use mocks::{MockOrchestrator, MockResourceService, StaticWorkflowSource};
