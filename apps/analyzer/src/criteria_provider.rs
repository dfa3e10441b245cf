//! Criteria Provider: where the administrator-configured scoring criteria live.
//!
//! The analyzer only sees `Arc<dyn CriteriaProvider>`. The bundled backend keeps
//! the current snapshot in memory and swaps it whole on every update, so a
//! concurrent reader sees either the old or the new criteria, never a mix.

use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tracing::info;

use crate::models::{Criteria, CriteriaUpdate};

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait CriteriaProvider: Send + Sync {
    /// Current criteria snapshot.
    async fn get(&self) -> anyhow::Result<Criteria>;

    /// Applies a partial update and returns the resulting snapshot.
    async fn update(&self, update: CriteriaUpdate) -> anyhow::Result<Criteria>;
}

// ────────────────────────────────────────────────────────────────────────────
// InMemoryCriteriaProvider
// ────────────────────────────────────────────────────────────────────────────

pub struct InMemoryCriteriaProvider {
    current: RwLock<Arc<Criteria>>,
}

impl InMemoryCriteriaProvider {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            current: RwLock::new(Arc::new(criteria)),
        }
    }

    /// Loads initial criteria from a JSON file shaped like `Criteria`.
    pub async fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read criteria file {}", path.display()))?;
        let criteria: Criteria = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid criteria JSON in {}", path.display()))?;
        info!(
            "Loaded criteria from {}: {} whitelisted, {} blacklisted industries",
            path.display(),
            criteria.industries.whitelist.len(),
            criteria.industries.blacklist.len()
        );
        Ok(Self::new(criteria))
    }

    fn snapshot(&self) -> anyhow::Result<Arc<Criteria>> {
        self.current
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| anyhow!("criteria lock poisoned"))
    }
}

impl Default for InMemoryCriteriaProvider {
    fn default() -> Self {
        Self::new(Criteria::default())
    }
}

#[async_trait]
impl CriteriaProvider for InMemoryCriteriaProvider {
    async fn get(&self) -> anyhow::Result<Criteria> {
        Ok(self.snapshot()?.as_ref().clone())
    }

    async fn update(&self, update: CriteriaUpdate) -> anyhow::Result<Criteria> {
        let mut guard = self
            .current
            .write()
            .map_err(|_| anyhow!("criteria lock poisoned"))?;
        let next = guard.apply(&update);
        *guard = Arc::new(next.clone());
        info!("Criteria updated");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_update_replaces_snapshot() {
        let provider = InMemoryCriteriaProvider::default();
        let updated = provider
            .update(CriteriaUpdate {
                blacklist: Some(vec![" Pure SaaS ".into(), "pure saas".into()]),
                ..CriteriaUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.industries.blacklist, vec!["Pure SaaS"]);
        assert_eq!(provider.get().await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_reader_snapshot_unaffected_by_later_update() {
        let provider = InMemoryCriteriaProvider::default();
        let before = provider.get().await.unwrap();
        provider
            .update(CriteriaUpdate {
                whitelist: Some(vec!["HVAC".into()]),
                ..CriteriaUpdate::default()
            })
            .await
            .unwrap();
        assert!(before.industries.whitelist.is_empty());
        assert_eq!(
            provider.get().await.unwrap().industries.whitelist,
            vec!["HVAC"]
        );
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"industries": {{"whitelist": ["HVAC", "Plumbing"], "blacklist": ["Pure SaaS"]}},
                "requirements": {{"strengths": ["Dispatch"]}}}}"#
        )
        .unwrap();

        let provider = InMemoryCriteriaProvider::from_json_file(file.path())
            .await
            .unwrap();
        let criteria = provider.get().await.unwrap();
        assert_eq!(criteria.industries.whitelist, vec!["HVAC", "Plumbing"]);
        assert_eq!(criteria.requirements.strengths, vec!["Dispatch"]);
        assert!(criteria.requirements.unsupported.is_empty());
    }

    #[tokio::test]
    async fn test_from_json_file_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = InMemoryCriteriaProvider::from_json_file(file.path())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Invalid criteria JSON"));
    }
}
