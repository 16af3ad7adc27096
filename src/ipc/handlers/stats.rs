use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use crate::roster::course_counts;
use serde_json::json;

fn handle_stats_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let roster = state.store.as_ref().map(|s| s.roster()).unwrap_or(&[]);
    let counts: Vec<serde_json::Value> = course_counts(roster)
        .into_iter()
        .map(|(course, count)| json!({ "course": course, "count": count }))
        .collect();
    ok(
        &req.id,
        json!({
            "total": roster.len(),
            "courseCounts": counts
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.get" => Some(handle_stats_get(state, req)),
        _ => None,
    }
}
