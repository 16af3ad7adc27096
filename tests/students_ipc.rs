use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut child = Command::new(exe)
        .env("ROSTERD_FETCH_DELAY_MS", "0")
        .env_remove("ROSTERD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rosterd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn student_ids(result: &serde_json::Value) -> Vec<String> {
    result
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| s.get("id").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .collect()
}

#[test]
fn insert_insert_remove_scenario_persists_across_restart() {
    let workspace = temp_dir("rosterd-students-scenario");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let selected = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        assert_eq!(selected.get("studentCount").and_then(|v| v.as_u64()), Some(0));

        let listed = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
        assert!(student_ids(&listed).is_empty());

        let first = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "students.upsert",
            json!({ "id": "1", "name": "Ann", "email": "a@b.com", "course": "CSS Mastery" }),
        );
        assert_eq!(student_ids(&first), vec!["1"]);
        assert_eq!(first.get("created").and_then(|v| v.as_bool()), Some(true));
        let image = first
            .get("student")
            .and_then(|s| s.get("image"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        assert!(image.contains("name=Ann"), "placeholder image: {image}");

        let second = request_ok(
            &mut stdin,
            &mut reader,
            "4",
            "students.upsert",
            json!({ "id": "2", "name": "Bob", "email": "bob@b.com", "course": "CSS Mastery" }),
        );
        assert_eq!(student_ids(&second), vec!["2", "1"]);

        let removed = request_ok(
            &mut stdin,
            &mut reader,
            "5",
            "students.delete",
            json!({ "studentId": "1" }),
        );
        assert_eq!(removed.get("removed").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(student_ids(&removed), vec!["2"]);

        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected.get("studentCount").and_then(|v| v.as_u64()), Some(1));
    let listed = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(student_ids(&listed), vec!["2"]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn edit_keeps_position_and_delete_of_unknown_id_is_noop() {
    let workspace = temp_dir("rosterd-students-edit");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    for (i, name) in ["Ann", "Bob", "Cid"].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("c{i}"),
            "students.upsert",
            json!({
                "id": name.to_lowercase(),
                "name": name,
                "email": format!("{}@school.org", name.to_lowercase())
            }),
        );
    }

    let edited = request_ok(
        &mut stdin,
        &mut reader,
        "e",
        "students.upsert",
        json!({
            "id": "bob",
            "name": "Robert",
            "email": "robert@school.org",
            "course": "Node.js Backend",
            "image": "https://img.example/robert.png"
        }),
    );
    assert_eq!(edited.get("created").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(student_ids(&edited), vec!["cid", "bob", "ann"]);
    let bob = &edited["students"][1];
    assert_eq!(bob["name"], "Robert");
    assert_eq!(bob["image"], "https://img.example/robert.png");

    let noop = request_ok(
        &mut stdin,
        &mut reader,
        "d",
        "students.delete",
        json!({ "studentId": "nobody" }),
    );
    assert_eq!(noop.get("removed").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(student_ids(&noop), vec!["cid", "bob", "ann"]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn upsert_without_id_assigns_unique_ids() {
    let workspace = temp_dir("rosterd-students-ids");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let mut ids = Vec::new();
    for i in 0..3 {
        let res = request_ok(
            &mut stdin,
            &mut reader,
            &format!("u{i}"),
            "students.upsert",
            json!({ "name": "Same Name", "email": "same@school.org" }),
        );
        let id = res["student"]["id"].as_str().expect("assigned id").to_string();
        assert!(!id.is_empty());
        ids.push(id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn validation_blocks_save_and_reports_field_hints() {
    let workspace = temp_dir("rosterd-students-validation");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let checked = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.validate",
        json!({ "name": "", "email": "a@b" }),
    );
    assert_eq!(checked["valid"], false);
    assert_eq!(checked["errors"]["name"], "Name is required");
    assert_eq!(checked["errors"]["email"], "Please enter a valid email");

    let checked = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.validate",
        json!({ "name": "Ann", "email": "a@b.co" }),
    );
    assert_eq!(checked["valid"], true);

    let rejected = request(
        &mut stdin,
        &mut reader,
        "4",
        "students.upsert",
        json!({ "name": "Ann", "email": "a b@c.com" }),
    );
    assert_eq!(rejected["ok"], false);
    assert_eq!(rejected["error"]["code"], "validation_failed");
    assert!(rejected["error"]["details"]["errors"]["email"].is_string());

    let listed = request_ok(&mut stdin, &mut reader, "5", "students.list", json!({}));
    assert!(student_ids(&listed).is_empty());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn stats_count_per_course_with_unassigned_label() {
    let workspace = temp_dir("rosterd-stats");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    for (i, course) in ["A", "A", "", "B"].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{i}"),
            "students.upsert",
            json!({
                "id": format!("{i}"),
                "name": format!("Student {i}"),
                "email": format!("s{i}@school.org"),
                "course": course
            }),
        );
    }

    let stats = request_ok(&mut stdin, &mut reader, "2", "stats.get", json!({}));
    assert_eq!(stats["total"], 4);
    assert_eq!(
        stats["courseCounts"],
        json!([
            { "course": "A", "count": 2 },
            { "course": "B", "count": 1 },
            { "course": "Unassigned", "count": 1 }
        ])
    );

    // The stored record keeps its empty course.
    let listed = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    let unassigned = listed["students"]
        .as_array()
        .expect("students")
        .iter()
        .find(|s| s["id"] == "2")
        .cloned()
        .expect("student 2");
    assert_eq!(unassigned["course"], "");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn corrupt_persisted_roster_loads_empty_and_recovers() {
    let workspace = temp_dir("rosterd-corrupt");
    {
        let conn = rusqlite::Connection::open(workspace.join("roster.sqlite3")).expect("open db");
        conn.execute(
            "CREATE TABLE kv(key TEXT PRIMARY KEY, value BLOB NOT NULL)",
            [],
        )
        .expect("create kv");
        conn.execute(
            "INSERT INTO kv(key, value) VALUES('students', ?)",
            [b"[{\"id\": 1,".to_vec()],
        )
        .expect("seed corrupt roster");
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected.get("studentCount").and_then(|v| v.as_u64()), Some(0));

    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.upsert",
        json!({ "id": "x", "name": "Ann", "email": "a@b.com" }),
    );
    assert_eq!(student_ids(&saved), vec!["x"]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn reset_clears_persisted_state() {
    let workspace = temp_dir("rosterd-reset");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.upsert",
        json!({ "name": "Ann", "email": "a@b.com" }),
    );
    let reset = request_ok(&mut stdin, &mut reader, "3", "workspace.reset", json!({}));
    assert!(student_ids(&reset).is_empty());

    // Re-selecting reads from storage, which must be empty too.
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected.get("studentCount").and_then(|v| v.as_u64()), Some(0));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn store_methods_require_workspace() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let listed = request_ok(&mut stdin, &mut reader, "1", "students.list", json!({}));
    assert!(student_ids(&listed).is_empty());
    let stats = request_ok(&mut stdin, &mut reader, "2", "stats.get", json!({}));
    assert_eq!(stats["total"], 0);

    let rejected = request(
        &mut stdin,
        &mut reader,
        "3",
        "students.upsert",
        json!({ "name": "Ann", "email": "a@b.com" }),
    );
    assert_eq!(rejected["error"]["code"], "no_workspace");
    let rejected = request(
        &mut stdin,
        &mut reader,
        "4",
        "students.delete",
        json!({ "studentId": "1" }),
    );
    assert_eq!(rejected["error"]["code"], "no_workspace");

    drop(stdin);
    let _ = child.wait();
}
