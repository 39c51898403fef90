//! Resource stores supply scenario resources and collect test case evidence.

mod local;

pub use local::LocalResourceStore;

use crate::config::ResourceStoreConfig;
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;

/// Backend-agnostic resource provisioning
///
/// Calls are synchronous and made while the lifecycle lock is held.
pub trait ResourceStore: Send + Sync {
    /// Populate `dir` with the test case directories of a scenario
    fn download_scenario_resource(
        &self,
        dir: &Path,
        group: &str,
        scenario: &str,
        stub_id: &str,
    ) -> Result<()>;

    /// Collect the evidence directory of a finished test case
    fn upload_testcase_resource(
        &self,
        dir: &Path,
        group: &str,
        scenario: &str,
        testcase: &str,
        stub_id: &str,
    ) -> Result<()>;
}

/// Store that provisions nothing and discards uploads
#[derive(Debug)]
pub struct NoOpResourceStore;

impl ResourceStore for NoOpResourceStore {
    fn download_scenario_resource(
        &self,
        _dir: &Path,
        _group: &str,
        _scenario: &str,
        _stub_id: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn upload_testcase_resource(
        &self,
        _dir: &Path,
        _group: &str,
        _scenario: &str,
        _testcase: &str,
        _stub_id: &str,
    ) -> Result<()> {
        Ok(())
    }
}

/// Create a ResourceStore based on configuration
pub fn create_resource_store(config: &ResourceStoreConfig) -> Result<Arc<dyn ResourceStore>> {
    match config.backend.as_str() {
        "none" => {
            tracing::warn!(
                "Using NoOp resource store: scenarios will start without resources and evidence will not be uploaded"
            );
            Ok(Arc::new(NoOpResourceStore))
        }
        "local" => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| anyhow!("Local resource store selected but no path provided"))?;
            let evidence_path = config.evidence_path.clone().unwrap_or_else(|| {
                path.parent()
                    .map(|parent| parent.join("uploads"))
                    .unwrap_or_else(|| path.join("uploads"))
            });
            tracing::info!(
                "Using local resource store (source={:?}, uploads={:?})",
                path,
                evidence_path
            );
            Ok(Arc::new(LocalResourceStore::new(path, evidence_path)))
        }
        other => Err(anyhow!("Unknown resource store backend: {other}")),
    }
}
