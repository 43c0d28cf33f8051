use crate::KindredError;
use crate::config::{RunConfig, ToleranceSpec};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SPEC_FILE: &str = "spec_dict.json";
const LOCK_FILE: &str = "spec_dict.lock";
const ID_SPACE: u32 = 10_000;
const MAX_ALLOC_ATTEMPTS: usize = 32;
const MAX_LOCK_ATTEMPTS: usize = 100;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// One persisted run spec. `date_created` is recorded but excluded from
/// equality when matching an incoming configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecEntry {
    pub date_created: String,
    pub tol_dict: BTreeMap<String, ToleranceSpec>,
    pub eps_min: f64,
    pub eps_max: f64,
    pub cluster_method: String,
    pub partition_vars: Vec<String>,
    pub datevar: Option<String>,
    pub query_spec: Option<i64>,
}

impl SpecEntry {
    fn from_config(config: &RunConfig) -> SpecEntry {
        let eps_min = config.eps.iter().copied().fold(f64::INFINITY, f64::min);
        let eps_max = config.eps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        SpecEntry {
            date_created: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            tol_dict: config.tol_dict.clone(),
            eps_min,
            eps_max,
            cluster_method: config.cluster_method.clone(),
            partition_vars: config.partition_vars.clone(),
            datevar: config.datevar.clone(),
            query_spec: config.query_spec,
        }
    }

    /// Content equality with the creation timestamp excluded.
    fn matches(&self, other: &SpecEntry) -> bool {
        self.tol_dict == other.tol_dict
            && self.eps_min == other.eps_min
            && self.eps_max == other.eps_max
            && self.cluster_method == other.cluster_method
            && self.partition_vars == other.partition_vars
            && self.datevar == other.datevar
            && self.query_spec == other.query_spec
    }
}

/// File-backed cache mapping run ids to normalized configurations. Repeated
/// identical configurations reuse their id; writers are serialized through a
/// lock file and the store is replaced by atomic rename.
pub struct SpecCache {
    dir: PathBuf,
}

impl SpecCache {
    pub fn new(dir: &Path) -> SpecCache {
        SpecCache { dir: dir.to_path_buf() }
    }

    pub fn spec_path(&self) -> PathBuf {
        self.dir.join(SPEC_FILE)
    }

    /// Return the run id for this configuration, allocating and persisting a
    /// fresh one if no existing entry matches.
    pub fn allocate(&self, config: &RunConfig) -> Result<u32, KindredError> {
        fs::create_dir_all(&self.dir).map_err(KindredError::Io)?;
        let _lock = self.acquire_lock()?;

        let mut entries = self.load()?;
        let candidate = SpecEntry::from_config(config);

        for (id, entry) in &entries {
            if entry.matches(&candidate) {
                return Ok(*id);
            }
        }

        let id = pick_unused_id(&entries)?;
        entries.insert(id, candidate);
        self.store(&entries)?;
        Ok(id)
    }

    fn load(&self) -> Result<BTreeMap<u32, SpecEntry>, KindredError> {
        let path = self.spec_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path).map_err(KindredError::Io)?;
        let entries: BTreeMap<u32, SpecEntry> = serde_json::from_str(&content)?;
        Ok(entries)
    }

    fn store(&self, entries: &BTreeMap<u32, SpecEntry>) -> Result<(), KindredError> {
        let tmp_path = self.dir.join(format!("{}.tmp", SPEC_FILE));
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&tmp_path, content).map_err(KindredError::Io)?;
        fs::rename(&tmp_path, self.spec_path()).map_err(KindredError::Io)?;
        Ok(())
    }

    fn acquire_lock(&self) -> Result<LockGuard, KindredError> {
        let path = self.dir.join(LOCK_FILE);
        for _ in 0..MAX_LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(LockGuard { path }),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    std::thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(err) => return Err(KindredError::Io(err)),
            }
        }
        Err(KindredError::Cache(format!(
            "could not acquire spec cache lock at {} (stale lock file?)",
            path.display()
        )))
    }
}

struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Draw candidate ids until one is free, bounded so a saturated id space
/// surfaces as an error instead of spinning.
fn pick_unused_id(entries: &BTreeMap<u32, SpecEntry>) -> Result<u32, KindredError> {
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_ALLOC_ATTEMPTS {
        let candidate = rng.gen_range(0..ID_SPACE);
        if !entries.contains_key(&candidate) {
            return Ok(candidate);
        }
    }
    Err(KindredError::Cache(format!(
        "could not allocate an unused run id after {} attempts",
        MAX_ALLOC_ATTEMPTS
    )))
}
