//! Write-only experiment logs.
//!
//! Layout under `{output_dir}/{name}/{episode}/`:
//! - `prompt/{player}/prompt_{model}.txt` -- every prompt and reply
//! - `prompt/{player}/ml_action.csv` -- the merged action of each tick
//! - `status/game_status_{model}.json` -- run status keyed by tick
//! - `status/task_progress_{model}.json` -- survival progress per player
//!
//! Nothing here is read back during a run.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use foray_types::{EntityId, MergedAction};
use serde::Serialize;

use crate::error::RunnerError;
use crate::llm::TokenUsage;
use crate::prompt::RenderedPrompt;

/// Directories of one episode.
#[derive(Debug, Clone)]
pub struct RunDir {
    root: PathBuf,
}

impl RunDir {
    /// `{output_dir}/{name}/{episode}`, created on demand.
    pub fn new(output_dir: &Path, name: &str, episode: u32) -> Self {
        Self {
            root: output_dir.join(name).join(episode.to_string()),
        }
    }

    /// Episode root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-player prompt directory.
    pub fn player_dir(&self, player: EntityId) -> PathBuf {
        self.root.join("prompt").join(player.0.to_string())
    }

    /// Status directory.
    pub fn status_dir(&self) -> PathBuf {
        self.root.join("status")
    }
}

/// Overwrite `path` with `contents`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> Result<(), RunnerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn append(path: &Path, text: &str) -> Result<(), RunnerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Prompt transcript
// ---------------------------------------------------------------------------

/// Prompt and reply transcript of one player. A log without a path
/// discards everything.
#[derive(Debug, Clone, Default)]
pub struct PromptLog {
    path: Option<PathBuf>,
}

impl PromptLog {
    /// A transcript appended to `path`.
    pub const fn to_file(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// A transcript that writes nothing.
    pub const fn discard() -> Self {
        Self { path: None }
    }

    /// Record one exchange.
    pub fn exchange(
        &self,
        tick: u32,
        label: &str,
        prompt: &RenderedPrompt,
        reply: &str,
    ) -> Result<(), RunnerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut out = String::new();
        out.push_str(&format!("=== tick: {tick} {label} input ===\n"));
        out.push_str(&format!("[system]\n{}\n[user]\n{}\n", prompt.system, prompt.user));
        out.push_str(&format!("=== tick: {tick} {label} output ===\n{reply}\n\n"));
        append(path, &out)
    }

    /// Record a line of free text.
    pub fn note(&self, tick: u32, text: &str) -> Result<(), RunnerError> {
        match &self.path {
            Some(path) => append(path, &format!("=== tick: {tick} === {text}\n\n")),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Action CSV
// ---------------------------------------------------------------------------

/// One CSV line per tick of the merged action.
#[derive(Debug, Clone)]
pub struct ActionCsv {
    path: PathBuf,
}

impl ActionCsv {
    /// Start `path` with the header row.
    pub fn create(path: PathBuf) -> Result<Self, RunnerError> {
        let mut header = MergedAction::CSV_HEADER.join(", ");
        header.push('\n');
        write_file(&path, &header)?;
        Ok(Self { path })
    }

    /// Append the action of `tick`.
    pub fn append(&self, tick: u32, action: &MergedAction) -> Result<(), RunnerError> {
        let mut line = tick.to_string();
        for field in action.csv_fields() {
            line.push_str(", ");
            line.push_str(field);
        }
        line.push('\n');
        append(&self.path, &line)
    }
}

// ---------------------------------------------------------------------------
// Run status
// ---------------------------------------------------------------------------

/// Where the episode stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Players are still playing.
    #[serde(rename = "running")]
    Running,
    /// Every player is dead.
    #[serde(rename = "all player dead")]
    AllDead,
    /// The horizon was reached.
    #[serde(rename = "game end")]
    GameEnd,
}

impl RunStatus {
    /// Status from the per-player flags of the last step.
    pub fn from_flags(
        terminated: &BTreeMap<EntityId, bool>,
        truncated: &BTreeMap<EntityId, bool>,
    ) -> Self {
        if !terminated.is_empty() && terminated.values().all(|t| *t) {
            Self::AllDead
        } else if !truncated.is_empty() && truncated.values().all(|t| *t) {
            Self::GameEnd
        } else {
            Self::Running
        }
    }

    /// Whether the episode is over.
    pub fn is_final(self) -> bool {
        self != Self::Running
    }
}

/// Status after one tick.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    /// Players still alive.
    pub alive_player_num: usize,
    /// Tokens used by every player so far.
    #[serde(flatten)]
    pub usage: TokenUsage,
    /// Seconds since the episode started, as `"{:.4}s"`.
    pub program_run_time: String,
    /// Local wall-clock time.
    pub current_time: String,
    /// UTC timestamp.
    pub timestamp: DateTime<Utc>,
    /// Episode status.
    pub status: RunStatus,
}

impl StatusEntry {
    /// An entry stamped now.
    pub fn now(
        alive_player_num: usize,
        usage: TokenUsage,
        elapsed_secs: f64,
        status: RunStatus,
    ) -> Self {
        Self {
            alive_player_num,
            usage,
            program_run_time: format!("{elapsed_secs:.4}s"),
            current_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            timestamp: Utc::now(),
            status,
        }
    }
}

/// The status file, rewritten whole after every tick.
#[derive(Debug)]
pub struct StatusLog {
    path: PathBuf,
    entries: BTreeMap<u32, StatusEntry>,
}

impl StatusLog {
    /// `game_status_{model}.json` in the run's status directory.
    pub fn new(run: &RunDir, model: &str) -> Self {
        Self {
            path: run.status_dir().join(format!("game_status_{}.json", file_safe(model))),
            entries: BTreeMap::new(),
        }
    }

    /// Store the entry of `tick` and rewrite the file.
    pub fn record(&mut self, tick: u32, entry: StatusEntry) -> Result<(), RunnerError> {
        self.entries.insert(tick, entry);
        write_file(&self.path, &serde_json::to_string_pretty(&self.entries)?)
    }

    /// Entries so far.
    pub const fn entries(&self) -> &BTreeMap<u32, StatusEntry> {
        &self.entries
    }
}

/// How far one player got.
#[derive(Debug, Clone, Serialize)]
pub struct TaskProgress {
    /// Display name.
    pub player: String,
    /// Role key.
    pub role: &'static str,
    /// Long-term goal, for task players.
    pub goal: Option<String>,
    /// Ticks survived.
    pub survived_ticks: u32,
    /// Survived ticks over the horizon.
    pub progress: f64,
    /// Whether the player is alive.
    pub alive: bool,
}

/// Write the progress of every player to `task_progress_{model}.json`.
pub fn write_task_progress(
    run: &RunDir,
    model: &str,
    progress: &[TaskProgress],
) -> Result<(), RunnerError> {
    let path = run.status_dir().join(format!("task_progress_{}.json", file_safe(model)));
    write_file(&path, &serde_json::to_string_pretty(progress)?)
}

/// `model` with path separators replaced, for use in file names.
pub fn file_safe(model: &str) -> String {
    model.replace(['/', '\\', ':'], "_")
}
