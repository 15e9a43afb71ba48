use crate::actions::{ActionData, ActionDefinition};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::RwLock;

/// Most entries kept on disk.
pub const RECENT_ACTIONS_LIMIT: usize = 10;
/// Most entries surfaced to the UI.
pub const RECENT_ACTIONS_VISIBLE: usize = 5;

/// Fields that make two invocations of the same action distinct. A new entry
/// replaces a stored one only when none of these disagree.
pub const DISTINGUISHING_FIELDS: [&str; 6] = [
    "orderNumber",
    "weightValue",
    "fromZip",
    "toZip",
    "vmName",
    "resourceGroup",
];

/// One remembered action invocation. The submitted form fields ride along
/// flattened, so entries stay self-describing on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAction {
    pub id: String,
    pub label: String,
    /// Unix epoch milliseconds at submission time.
    pub timestamp: i64,
    #[serde(default)]
    pub class_name: String,
    /// The fully substituted prompt, kept so the entry can be replayed as-is.
    #[serde(default)]
    pub prompt: String,
    #[serde(flatten)]
    pub fields: HashMap<String, String>,
}

impl RecentAction {
    /// Display label, suffixed with the VM name when one was submitted.
    pub fn display_label(&self) -> String {
        match self.fields.get("vmName") {
            Some(vm) if !vm.is_empty() => format!("{}: {}", self.label, vm),
            _ => self.label.clone(),
        }
    }

    /// True when this entry should replace `stored`: same action, and every
    /// distinguishing field this entry carries matches. A field this entry
    /// lacks never separates the two.
    fn supersedes(&self, stored: &RecentAction) -> bool {
        if stored.id != self.id {
            return false;
        }
        DISTINGUISHING_FIELDS.iter().all(|field| {
            match self.fields.get(*field) {
                Some(value) if !value.is_empty() => stored.fields.get(*field) == Some(value),
                _ => true,
            }
        })
    }
}

// --- Storage ---

/// Persistence behind the store. Swapped for an in-memory double in tests.
#[async_trait]
pub trait RecentsStorage: Send + Sync {
    async fn load(&self) -> Result<Vec<RecentAction>>;
    async fn save(&self, entries: &[RecentAction]) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// JSON-file storage. Writes go through a temp file in the same directory so
/// a crash never leaves a half-written list behind.
#[derive(Clone, Debug)]
pub struct FileRecentsStorage {
    path: PathBuf,
}

impl FileRecentsStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("config")
            .join("recent_actions.json")
    }
}

#[async_trait]
impl RecentsStorage for FileRecentsStorage {
    async fn load(&self) -> Result<Vec<RecentAction>> {
        if tokio::fs::metadata(&self.path).await.is_err() {
            return Ok(Vec::new());
        }
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            anyhow!(
                "failed to read recent actions file {}: {e}",
                self.path.display()
            )
        })?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            anyhow!(
                "failed to parse recent actions JSON {}: {e}",
                self.path.display()
            )
        })
    }

    async fn save(&self, entries: &[RecentAction]) -> Result<()> {
        let dir = self
            .path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow!("failed to create config dir {}: {e}", dir.display()))?;

        let tmp_path = dir.join(format!(
            "recent_actions.json.tmp-{}",
            uuid::Uuid::new_v4()
        ));

        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| anyhow!("failed to serialize recent actions: {e}"))?;

        tokio::fs::write(&tmp_path, raw).await.map_err(|e| {
            anyhow!(
                "failed to write temp recent actions file {}: {e}",
                tmp_path.display()
            )
        })?;

        // Best-effort atomic replace.
        let _ = tokio::fs::remove_file(&self.path).await;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            anyhow!(
                "failed to replace recent actions file {}: {e}",
                self.path.display()
            )
        })?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow!(
                "failed to remove recent actions file {}: {e}",
                self.path.display()
            )),
        }
    }
}

/// In-memory storage for tests and ephemeral setups.
#[derive(Clone, Debug, Default)]
pub struct MemoryRecentsStorage {
    entries: Arc<RwLock<Vec<RecentAction>>>,
}

impl MemoryRecentsStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecentsStorage for MemoryRecentsStorage {
    async fn load(&self) -> Result<Vec<RecentAction>> {
        Ok(self.entries.read().await.clone())
    }

    async fn save(&self, entries: &[RecentAction]) -> Result<()> {
        *self.entries.write().await = entries.to_vec();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

// --- Store ---

/// Bounded, deduplicated history of submitted actions. Holds the working
/// copy in memory and writes the whole list back through the storage on
/// every change.
pub struct RecentActionsStore {
    storage: Arc<dyn RecentsStorage>,
    current: RwLock<Vec<RecentAction>>,
}

impl std::fmt::Debug for RecentActionsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentActionsStore").finish()
    }
}

impl RecentActionsStore {
    /// Loads the persisted list once and serves reads from memory after.
    pub async fn open(storage: Arc<dyn RecentsStorage>) -> Result<Self> {
        let initial = storage.load().await?;
        Ok(Self {
            storage,
            current: RwLock::new(initial),
        })
    }

    /// Records a submitted action: drops any stored entry the new one
    /// supersedes, prepends, and truncates to the retention limit. The
    /// updated list is persisted before the call returns.
    pub async fn record(
        &self,
        action: &ActionDefinition,
        prompt: &str,
        data: &ActionData,
    ) -> Result<RecentAction> {
        let entry = RecentAction {
            id: action.id.clone(),
            label: action.label.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            class_name: action.class_name.clone(),
            prompt: prompt.to_string(),
            fields: data.clone(),
        };

        let mut guard = self.current.write().await;
        guard.retain(|stored| !entry.supersedes(stored));
        guard.insert(0, entry.clone());
        guard.truncate(RECENT_ACTIONS_LIMIT);
        self.storage.save(&guard).await?;
        Ok(entry)
    }

    /// The newest entries for display, sorted by timestamp descending. The
    /// sort is stable, so entries stamped in the same millisecond keep their
    /// insertion order.
    pub async fn visible(&self) -> Vec<RecentAction> {
        let mut entries = self.current.read().await.clone();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(RECENT_ACTIONS_VISIBLE);
        entries
    }

    /// The full retained list, newest first.
    pub async fn all(&self) -> Vec<RecentAction> {
        self.current.read().await.clone()
    }

    /// Empties the history. The persisted copy is removed first, so a
    /// storage failure leaves the in-memory list untouched.
    pub async fn clear(&self) -> Result<()> {
        let mut guard = self.current.write().await;
        self.storage.clear().await?;
        guard.clear();
        Ok(())
    }
}
