use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const STATE_FILE: &str = ".approx-mutator-state.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub strategy: String,
    pub out: Utf8PathBuf,
    pub mutants: Vec<MutantSummary>,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MutantSummary {
    pub source: Utf8PathBuf,
    pub dir: Utf8PathBuf,
    pub mutations: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total_mutations(&self) -> usize {
        self.mutants.iter().map(|m| m.mutations).sum()
    }
}

fn state_path() -> PathBuf {
    let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    dir.join(STATE_FILE)
}

pub fn save_last_run(summary: &RunSummary) {
    save_to_path(summary, &state_path());
}

pub fn load_last_run() -> Option<RunSummary> {
    load_from_path(&state_path())
}

pub fn save_to_path(summary: &RunSummary, path: &std::path::Path) {
    match serde_json::to_string(summary) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                log::warn!("could not save run state to {}: {e}", path.display());
            }
        }
        Err(e) => log::warn!("could not serialize run state: {e}"),
    }
}

pub fn load_from_path(path: &std::path::Path) -> Option<RunSummary> {
    let data = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}
