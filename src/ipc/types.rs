use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::courses::FetchSettings;
use crate::db;
use crate::roster::RosterStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<RosterStore>,
    pub fetch: FetchSettings,
}

impl AppState {
    pub fn new(fetch: FetchSettings) -> Self {
        AppState {
            workspace: None,
            store: None,
            fetch,
        }
    }

    /// Opens (or creates) the workspace database and loads its roster.
    /// Returns the number of students loaded.
    pub fn select_workspace(&mut self, path: &Path) -> anyhow::Result<usize> {
        let conn = db::open_db(path)?;
        let store = RosterStore::open(conn);
        let count = store.roster().len();
        info!(workspace = %path.display(), students = count, "workspace opened");
        self.workspace = Some(path.to_path_buf());
        self.store = Some(store);
        Ok(count)
    }
}
