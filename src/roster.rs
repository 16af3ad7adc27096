//! The roster: an ordered list of student records kept in memory and mirrored
//! to a single key of the workspace key-value table.
//!
//! Persistence is soft-failing. A missing or unreadable roster loads as empty,
//! and a failed write is logged while the in-memory roster keeps the change.

use crate::db;
use crate::validate::{placeholder_image, StudentDraft};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

pub const ROSTER_KEY: &str = "students";
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Empty means unassigned. The label is only applied when aggregating.
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub image: String,
}

impl StudentRecord {
    /// Builds a record from validated form input. A draft without an id gets a
    /// fresh one; a blank image falls back to the name-derived placeholder.
    pub fn from_draft(draft: StudentDraft) -> Self {
        let id = draft
            .id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let name = draft.name.trim().to_string();
        let image = match draft.image.trim() {
            "" => placeholder_image(&name),
            url => url.to_string(),
        };
        StudentRecord {
            id,
            name,
            email: draft.email.trim().to_string(),
            course: draft.course.trim().to_string(),
            image,
        }
    }
}

pub type Roster = Vec<StudentRecord>;
pub type CourseCounts = BTreeMap<String, usize>;

/// Outcome of decoding the persisted roster bytes.
#[derive(Debug)]
pub enum Decoded {
    Absent,
    Parsed(Roster),
    Malformed(serde_json::Error),
    /// Parses, but the same id appears more than once.
    DuplicateId(String),
}

pub fn decode_roster(bytes: Option<&[u8]>) -> Decoded {
    let Some(bytes) = bytes else {
        return Decoded::Absent;
    };
    let roster = match serde_json::from_slice::<Roster>(bytes) {
        Ok(roster) => roster,
        Err(e) => return Decoded::Malformed(e),
    };
    let mut seen = HashSet::with_capacity(roster.len());
    for s in &roster {
        if !seen.insert(s.id.as_str()) {
            return Decoded::DuplicateId(s.id.clone());
        }
    }
    Decoded::Parsed(roster)
}

/// Replace in place when the id exists, otherwise prepend.
pub fn upsert_into(roster: &[StudentRecord], record: StudentRecord) -> Roster {
    if let Some(pos) = roster.iter().position(|s| s.id == record.id) {
        let mut next = roster.to_vec();
        next[pos] = record;
        return next;
    }
    let mut next = Vec::with_capacity(roster.len() + 1);
    next.push(record);
    next.extend_from_slice(roster);
    next
}

pub fn remove_from(roster: &[StudentRecord], id: &str) -> Roster {
    roster.iter().filter(|s| s.id != id).cloned().collect()
}

pub fn course_counts(roster: &[StudentRecord]) -> CourseCounts {
    let mut counts = CourseCounts::new();
    for s in roster {
        let course = s.course.trim();
        let key = if course.is_empty() { UNASSIGNED } else { course };
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

pub struct RosterStore {
    conn: Connection,
    roster: Roster,
}

impl RosterStore {
    pub fn open(conn: Connection) -> Self {
        let mut store = RosterStore {
            conn,
            roster: Vec::new(),
        };
        store.load();
        store
    }

    pub fn roster(&self) -> &[StudentRecord] {
        &self.roster
    }

    /// Re-reads the persisted roster, replacing the in-memory copy.
    pub fn load(&mut self) -> Roster {
        self.roster = load(&self.conn);
        self.roster.clone()
    }

    pub fn upsert(&mut self, record: StudentRecord) -> Roster {
        self.roster = upsert_into(&self.roster, record);
        self.persist();
        self.roster.clone()
    }

    pub fn remove(&mut self, id: &str) -> Roster {
        self.roster = remove_from(&self.roster, id);
        self.persist();
        self.roster.clone()
    }

    /// Drops the persisted roster entirely and starts over from empty.
    pub fn reset(&mut self) -> Roster {
        if let Err(e) = db::kv_delete(&self.conn, ROSTER_KEY) {
            warn!(error = %e, "failed to clear persisted roster");
        }
        self.roster.clear();
        Vec::new()
    }

    fn persist(&self) {
        let bytes = match serde_json::to_vec(&self.roster) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "failed to serialize roster");
                return;
            }
        };
        match db::kv_set(&self.conn, ROSTER_KEY, &bytes) {
            Ok(()) => debug!(students = self.roster.len(), "roster persisted"),
            Err(e) => warn!(error = %e, "failed to persist roster"),
        }
    }
}

fn load(conn: &Connection) -> Roster {
    let bytes = match db::kv_get(conn, ROSTER_KEY) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "failed to read persisted roster; starting empty");
            return Vec::new();
        }
    };
    match decode_roster(bytes.as_deref()) {
        Decoded::Absent => Vec::new(),
        Decoded::Parsed(roster) => roster,
        Decoded::Malformed(e) => {
            warn!(error = %e, "persisted roster is malformed; starting empty");
            Vec::new()
        }
        Decoded::DuplicateId(id) => {
            warn!(student_id = %id, "persisted roster repeats an id; starting empty");
            Vec::new()
        }
    }
}
