//! Session storage - JSON lines next to the anchor images
//!
//! Each session directory holds its `click_*.png` anchors and an
//! `actions.jsonl` whose first line is metadata and every other line one
//! action.

use crate::events::{Action, RecordedSession};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const LOG_FILE: &str = "actions.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    started_at: DateTime<Utc>,
    events: usize,
}

/// Summary row for `list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Directory name, also the id passed to `load`
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub started_at: DateTime<Utc>,
    pub events: usize,
}

pub struct SessionStorage {
    dir: PathBuf,
}

impl SessionStorage {
    /// Storage rooted at the default recordings directory
    pub fn new() -> Result<Self> {
        Self::with_dir(crate::recorder::default_recordings_dir())
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Write the session log into its own directory
    pub fn save(&self, session: &RecordedSession) -> Result<PathBuf> {
        fs::create_dir_all(&session.dir)?;
        let path = session.dir.join(LOG_FILE);

        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut w = BufWriter::new(file);

        // First line: metadata
        let meta = Metadata {
            label: session.label.clone(),
            started_at: session.started_at,
            events: session.events.len(),
        };
        serde_json::to_writer(&mut w, &meta)?;
        writeln!(w)?;

        for action in &session.events {
            serde_json::to_writer(&mut w, action)?;
            writeln!(w)?;
        }

        w.flush()?;
        debug!(path = %path.display(), events = session.events.len(), "session saved");
        Ok(path)
    }

    /// Load a session by id (directory name under the root) or by path
    pub fn load(&self, id: &str) -> Result<RecordedSession> {
        let dir = self.resolve(id);
        let path = dir.join(LOG_FILE);
        let file = File::open(&path)
            .with_context(|| format!("no saved session at {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();

        let meta_line = lines.next().context("Empty file")??;
        let meta: Metadata = serde_json::from_str(&meta_line).context("bad metadata line")?;

        let mut events = Vec::with_capacity(meta.events);
        for (n, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let action: Action = serde_json::from_str(&line)
                .with_context(|| format!("bad action on line {}", n + 2))?;
            events.push(action);
        }

        Ok(RecordedSession {
            label: meta.label,
            dir,
            started_at: meta.started_at,
            events,
        })
    }

    /// Saved sessions, oldest first
    pub fn list(&self) -> Result<Vec<SessionInfo>> {
        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let log = entry.path().join(LOG_FILE);
            if !log.is_file() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let meta = match read_metadata(&log) {
                Ok(meta) => meta,
                Err(e) => {
                    debug!(path = %log.display(), error = %e, "skipping unreadable session");
                    continue;
                }
            };
            sessions.push(SessionInfo {
                id,
                label: meta.label,
                started_at: meta.started_at,
                events: meta.events,
            });
        }
        sessions.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    /// Remove a session directory with its anchors
    pub fn delete(&self, id: &str) -> Result<()> {
        let dir = self.resolve(id);
        if !dir.join(LOG_FILE).is_file() {
            bail!("no saved session at {}", dir.display());
        }
        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, id: &str) -> PathBuf {
        let as_path = Path::new(id);
        if as_path.is_absolute() || as_path.join(LOG_FILE).is_file() {
            as_path.to_path_buf()
        } else {
            self.dir.join(sanitize(id))
        }
    }
}

fn read_metadata(path: &Path) -> Result<Metadata> {
    let mut first = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first)?;
    Ok(serde_json::from_str(first.trim_end())?)
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
