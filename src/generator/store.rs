// Task store - sidecar files holding the most recent task ids

use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tracing::{debug, info};

use super::errors::GenerationError;
use super::models::{GenerationJob, JobKind};

/// Directory holding `last_task_id.txt` and `last_mp4_task_id.txt`
#[derive(Debug, Clone)]
pub struct TaskStore {
    dir: PathBuf,
}

impl TaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: JobKind) -> PathBuf {
        self.dir.join(kind.sidecar_file())
    }

    /// Record `job` as the latest task of its kind
    pub fn save(&self, job: &GenerationJob) -> Result<PathBuf, GenerationError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(job.kind);
        std::fs::write(&path, format!("{}\n", job.task_id))?;
        info!("[TaskStore] {} task id saved to {}", job.kind, path.display());
        Ok(path)
    }

    /// Latest task of `kind`, if one was recorded
    pub fn load(&self, kind: JobKind) -> Option<GenerationJob> {
        let path = self.path_for(kind);
        let raw = std::fs::read_to_string(&path).ok()?;
        let task_id = raw.trim();
        if task_id.is_empty() {
            debug!("[TaskStore] {} is empty", path.display());
            return None;
        }

        Some(GenerationJob {
            task_id: task_id.to_string(),
            kind,
            created_at: modified_at(&path).unwrap_or_else(OffsetDateTime::now_utc),
        })
    }
}

fn modified_at(path: &Path) -> Option<OffsetDateTime> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(OffsetDateTime::from(modified))
}
