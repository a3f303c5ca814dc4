use std::sync::Arc;

use tracing::debug;

use ferry_core::error::{FerryError, Result};
use ferry_core::traits::ResourceService;
use ferry_core::types::ResourceState;

/// Source and target state observed by a passing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preconditions {
    pub source: ResourceState,
    pub target: ResourceState,
}

/// Vetoes transfers whose source is empty or whose target is full.
pub struct PreconditionChecker {
    resources: Arc<dyn ResourceService>,
}

impl PreconditionChecker {
    pub fn new(resources: Arc<dyn ResourceService>) -> Self {
        Self { resources }
    }

    pub async fn check(&self, source_id: &str, target_id: &str) -> Result<Preconditions> {
        let (source, target) = futures::try_join!(
            self.resources.get_resource(source_id),
            self.resources.get_resource(target_id),
        )?;

        debug!(
            source_id,
            source_quantity = source.quantity,
            target_id,
            target_quantity = target.quantity,
            target_capacity = ?target.capacity,
            "Resource states fetched"
        );

        if source.is_empty() {
            return Err(FerryError::SourceEmpty {
                resource_id: source_id.to_string(),
            });
        }
        if target.is_full() {
            return Err(FerryError::TargetFull {
                resource_id: target_id.to_string(),
            });
        }
        Ok(Preconditions { source, target })
    }
}
