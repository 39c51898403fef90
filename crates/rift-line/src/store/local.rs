use super::ResourceStore;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Filesystem-backed resource store.
///
/// Scenario resources are read from `<source>/<group>/<scenario>/<stub_id>/`
/// and test case evidence is written to
/// `<uploads>/<group>/<scenario>/<stub_id>/<testcase>/`.
#[derive(Debug, Clone)]
pub struct LocalResourceStore {
    source: PathBuf,
    uploads: PathBuf,
}

impl LocalResourceStore {
    pub fn new(source: impl Into<PathBuf>, uploads: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            uploads: uploads.into(),
        }
    }

    pub fn scenario_source(&self, group: &str, scenario: &str, stub_id: &str) -> PathBuf {
        self.source.join(group).join(scenario).join(stub_id)
    }

    pub fn upload_target(&self, group: &str, scenario: &str, testcase: &str, stub_id: &str) -> PathBuf {
        self.uploads
            .join(group)
            .join(scenario)
            .join(stub_id)
            .join(testcase)
    }
}

impl ResourceStore for LocalResourceStore {
    fn download_scenario_resource(
        &self,
        dir: &Path,
        group: &str,
        scenario: &str,
        stub_id: &str,
    ) -> Result<()> {
        let source = self.scenario_source(group, scenario, stub_id);
        if !source.is_dir() {
            bail!("No resources for {group}/{scenario} (stub {stub_id}) at {source:?}");
        }
        let copied = copy_tree(&source, dir)?;
        info!("Downloaded {} resource file(s) from {:?}", copied, source);
        Ok(())
    }

    fn upload_testcase_resource(
        &self,
        dir: &Path,
        group: &str,
        scenario: &str,
        testcase: &str,
        stub_id: &str,
    ) -> Result<()> {
        let target = self.upload_target(group, scenario, testcase, stub_id);
        if target.exists() {
            fs::remove_dir_all(&target)
                .with_context(|| format!("Failed to replace previous upload at {target:?}"))?;
        }
        let copied = copy_tree(dir, &target)?;
        info!("Uploaded {} evidence file(s) to {:?}", copied, target);
        Ok(())
    }
}

/// Recursively copy `from` into `to`, returns the number of files copied
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    fs::create_dir_all(to).with_context(|| format!("Failed to create {to:?}"))?;
    let mut copied = 0;
    for entry in fs::read_dir(from).with_context(|| format!("Failed to read {from:?}"))? {
        let entry = entry?;
        let path = entry.path();
        let dest = to.join(entry.file_name());
        if path.is_dir() {
            copied += copy_tree(&path, &dest)?;
        } else {
            fs::copy(&path, &dest).with_context(|| format!("Failed to copy {path:?}"))?;
            debug!("Copied {:?} -> {:?}", path, dest);
            copied += 1;
        }
    }
    Ok(copied)
}
