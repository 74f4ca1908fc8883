use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;
use tidepool::core::collection::{Collection, Layout, Record};
use tidepool::core::time::{new_record_id, now_iso};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
struct Note {
    id: String,
    body: String,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    children: Vec<String>,
}

impl Record for Note {
    fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self, now: String) {
        self.updated_at = now;
    }
}

fn note(body: &str) -> Note {
    let now = now_iso();
    Note {
        id: new_record_id(),
        body: body.to_string(),
        created_at: now.clone(),
        updated_at: now,
        children: Vec::new(),
    }
}

fn log_collection(root: &Path) -> Collection<Note> {
    Collection::new("notes", root.join("notes.jsonl"), Layout::Log)
}

fn doc_collection(root: &Path) -> Collection<Note> {
    Collection::new("notes", root.join("notes.json"), Layout::Document)
}

#[test]
fn test_append_then_read_grows_by_exactly_one() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    coll.init_if_absent(&[]).unwrap();

    coll.insert(note("first")).unwrap();
    coll.insert(note("second")).unwrap();
    let before = coll.read_all().unwrap().len();

    let appended = note("third");
    coll.append(&appended).unwrap();

    let notes = coll.read_all().unwrap();
    assert_eq!(notes.len(), before + 1);
    assert_eq!(notes.last().unwrap(), &appended);
}

#[test]
fn test_noop_update_changes_only_updated_at() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    let original = note("stable");
    coll.insert(original.clone()).unwrap();

    thread::sleep(Duration::from_millis(5));
    assert!(coll.update_by_id(&original.id, |_| {}).unwrap());

    let reread = coll.get(&original.id).unwrap().unwrap();
    let mut before = serde_json::to_value(&original).unwrap();
    let mut after = serde_json::to_value(&reread).unwrap();
    before.as_object_mut().unwrap().remove("updated_at");
    after.as_object_mut().unwrap().remove("updated_at");
    assert_eq!(before, after);
    assert!(reread.updated_at > original.updated_at);
}

#[test]
fn test_update_missing_id_has_no_side_effects() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    coll.insert(note("only")).unwrap();
    let before = fs::read(coll.path()).unwrap();

    assert!(!coll.update_by_id("no-such-id", |n| n.body.clear()).unwrap());
    assert_eq!(fs::read(coll.path()).unwrap(), before);
}

#[test]
fn test_delete_is_total() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    let doomed = note("doomed");
    coll.insert(doomed.clone()).unwrap();
    coll.insert(note("survivor")).unwrap();

    assert!(coll.delete_by_id(&doomed.id).unwrap());
    let notes = coll.read_all().unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes.iter().all(|n| n.id != doomed.id));
}

#[test]
fn test_delete_absent_id_is_silent_noop() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    coll.insert(note("keeper")).unwrap();

    assert!(!coll.delete_by_id("no-such-id").unwrap());
    assert_eq!(coll.read_all().unwrap().len(), 1);
}

#[test]
fn test_corrupted_line_among_valid_lines_is_skipped() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    let a = note("a");
    let b = note("b");
    let c = note("c");

    let mut body = String::new();
    body.push_str(&serde_json::to_string(&a).unwrap());
    body.push('\n');
    body.push_str("{\"id\": \"broken\", truncated garbage\n");
    body.push_str(&serde_json::to_string(&b).unwrap());
    body.push('\n');
    body.push_str(&serde_json::to_string(&c).unwrap());
    body.push('\n');
    fs::write(coll.path(), body).unwrap();

    let notes = coll.read_all().unwrap();
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[0], a);
    assert_eq!(notes[1], b);
    assert_eq!(notes[2], c);
}

#[test]
fn test_whitespace_only_lines_do_not_count() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    let a = note("a");
    let body = format!("{}\n\n   \n", serde_json::to_string(&a).unwrap());
    fs::write(coll.path(), body).unwrap();

    assert_eq!(coll.read_all().unwrap(), vec![a]);
}

#[test]
fn test_document_missing_file_reads_empty() {
    let tmp = tempdir().unwrap();
    let coll = doc_collection(tmp.path());
    assert!(coll.read_all().unwrap().is_empty());
}

#[test]
fn test_document_invalid_json_reads_empty() {
    let tmp = tempdir().unwrap();
    let coll = doc_collection(tmp.path());
    fs::write(coll.path(), "[{\"id\": \"trunc").unwrap();
    assert!(coll.read_all().unwrap().is_empty());
}

#[test]
fn test_init_if_absent_is_idempotent() {
    let tmp = tempdir().unwrap();
    let coll = doc_collection(tmp.path());
    let seed = vec![note("seeded")];
    coll.init_if_absent(&seed).unwrap();
    let first = fs::read(coll.path()).unwrap();

    // A second call, even with a different seed, must be a no-op.
    coll.init_if_absent(&[note("other")]).unwrap();
    assert_eq!(fs::read(coll.path()).unwrap(), first);

    let notes = coll.read_all().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].body, "seeded");
}

#[test]
fn test_init_creates_missing_parent_directories() {
    let tmp = tempdir().unwrap();
    let coll: Collection<Note> = Collection::new(
        "notes",
        tmp.path().join("nested").join("deeper").join("notes.jsonl"),
        Layout::Log,
    );
    coll.init_if_absent(&[]).unwrap();
    assert!(coll.path().exists());
}

#[test]
fn test_nested_append_preserves_siblings() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    let a = note("parent");
    let b = note("sibling");
    coll.insert(a.clone()).unwrap();
    coll.insert(b.clone()).unwrap();

    assert!(
        coll.append_nested(&a.id, |n| n.children.push("child-1".to_string()))
            .unwrap()
    );

    let notes = coll.read_all().unwrap();
    assert_eq!(notes[1], b, "sibling record must be byte-identical");

    let mut expected_a = serde_json::to_value(&a).unwrap();
    let mut actual_a = serde_json::to_value(&notes[0]).unwrap();
    expected_a.as_object_mut().unwrap().remove("updated_at");
    actual_a.as_object_mut().unwrap().remove("updated_at");
    expected_a["children"] = serde_json::json!(["child-1"]);
    assert_eq!(actual_a, expected_a);
}

#[test]
fn test_rewrite_preserves_on_disk_order() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    let notes: Vec<Note> = (0..5).map(|i| note(&format!("n{i}"))).collect();
    for n in &notes {
        coll.append(n).unwrap();
    }

    // Update the middle record; everything must stay in write order.
    assert!(coll.update_by_id(&notes[2].id, |n| n.body = "edited".to_string()).unwrap());
    let reread = coll.read_all().unwrap();
    let ids: Vec<&str> = reread.iter().map(|n| n.id.as_str()).collect();
    let expected: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, expected);
    assert_eq!(reread[2].body, "edited");
}

#[test]
fn test_rewrite_all_replaces_content_in_given_order() {
    let tmp = tempdir().unwrap();
    let coll = log_collection(tmp.path());
    assert_eq!(coll.name(), "notes");
    assert_eq!(coll.layout(), Layout::Log);

    let a = note("a");
    let b = note("b");
    coll.append(&a).unwrap();
    coll.append(&b).unwrap();

    // Callers own the order they hand in; a compaction that reverses it
    // must stick.
    coll.rewrite_all(&[b.clone(), a.clone()]).unwrap();
    let notes = coll.read_all().unwrap();
    assert_eq!(notes, vec![b, a]);
}

#[test]
fn test_document_collection_update_and_delete() {
    let tmp = tempdir().unwrap();
    let coll = doc_collection(tmp.path());
    let a = note("a");
    let b = note("b");
    coll.insert(a.clone()).unwrap();
    coll.insert(b.clone()).unwrap();

    assert!(coll.update_by_id(&a.id, |n| n.body = "a2".to_string()).unwrap());
    assert!(coll.delete_by_id(&b.id).unwrap());

    let notes = coll.read_all().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].body, "a2");
}
