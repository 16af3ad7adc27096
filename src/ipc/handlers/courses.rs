use crate::courses::{fetch_courses, FetchError};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_courses_fetch(state: &mut AppState, req: &Request) -> serde_json::Value {
    match fetch_courses(&state.fetch, &mut rand::rng()) {
        Ok(courses) => ok(&req.id, json!({ "courses": courses })),
        Err(FetchError::Network(message)) => err(&req.id, "network_error", message, None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.fetch" => Some(handle_courses_fetch(state, req)),
        _ => None,
    }
}
