use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::roster::StudentRecord;
use crate::validate::{validate_student, StudentDraft};
use serde_json::json;
use tracing::info;

fn parse_draft(req: &Request) -> Result<StudentDraft, serde_json::Value> {
    if req.params.is_null() {
        return Ok(StudentDraft::default());
    }
    serde_json::from_value::<StudentDraft>(req.params.clone())
        .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };
    ok(&req.id, json!({ "students": store.roster() }))
}

fn handle_students_validate(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let draft = match parse_draft(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    match validate_student(&draft) {
        Ok(()) => ok(&req.id, json!({ "valid": true, "errors": {} })),
        Err(errors) => ok(&req.id, json!({ "valid": false, "errors": errors })),
    }
}

fn handle_students_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let draft = match parse_draft(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if let Err(errors) = validate_student(&draft) {
        return err(
            &req.id,
            "validation_failed",
            "student has invalid fields",
            Some(json!({ "errors": errors })),
        );
    }

    let record = StudentRecord::from_draft(draft);
    let existed = store.roster().iter().any(|s| s.id == record.id);
    let students = store.upsert(record.clone());
    info!(
        student_id = %record.id,
        created = !existed,
        total = students.len(),
        "student saved"
    );
    ok(
        &req.id,
        json!({
            "student": record,
            "created": !existed,
            "students": students
        }),
    )
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };

    let removed = store.roster().iter().any(|s| s.id == student_id);
    let students = store.remove(&student_id);
    info!(student_id = %student_id, removed, total = students.len(), "student delete");
    ok(
        &req.id,
        json!({
            "removed": removed,
            "students": students
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.validate" => Some(handle_students_validate(state, req)),
        "students.upsert" => Some(handle_students_upsert(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
