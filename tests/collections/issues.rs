use chrono::DateTime;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;
use tidepool::collections::audit;
use tidepool::collections::issues::{self, IssueFilters, NewIssue};
use tidepool::core::store::Store;
use tidepool::init_store;

fn seeded_store() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("data"));
    init_store(&store).unwrap();
    (tmp, store)
}

fn new_issue(title: &str, category: &str, province: Option<&str>) -> NewIssue {
    NewIssue {
        title: title.to_string(),
        description: "".to_string(),
        category: category.to_string(),
        priority: "medium".to_string(),
        submitter_id: "reporter-1".to_string(),
        province: province.map(str::to_string),
    }
}

#[test]
fn test_issue_lifecycle() {
    let (_tmp, store) = seeded_store();

    // 1. Create
    let issue = issues::create_issue(&store, "reporter-1", new_issue("Login loops", "bug", None)).unwrap();
    assert_eq!(issue.status, "open");
    assert!(issue.assigned_to.is_none());
    assert!(issue.comments.is_empty());

    // 2. Get
    let got = issues::get_issue(&store, &issue.id).unwrap().expect("issue not found");
    assert_eq!(got.title, "Login loops");

    // 3. Assign
    assert!(issues::assign(&store, "manager-1", &issue.id, "dev-7").unwrap());
    let got = issues::get_issue(&store, &issue.id).unwrap().unwrap();
    assert_eq!(got.status, "assigned");
    assert_eq!(got.assigned_to.as_deref(), Some("dev-7"));

    // 4. Comment
    assert!(issues::add_comment(&store, "dev-7", &issue.id, "Tracked down to the session TTL").unwrap());
    let got = issues::get_issue(&store, &issue.id).unwrap().unwrap();
    assert_eq!(got.comments.len(), 1);
    assert_eq!(got.comments[0].user_id, "dev-7");
    assert!(!got.comments[0].id.is_empty());

    // 5. Resolve
    assert!(issues::update_status(&store, "dev-7", &issue.id, "resolved").unwrap());
    let got = issues::get_issue(&store, &issue.id).unwrap().unwrap();
    assert_eq!(got.status, "resolved");
}

#[test]
fn test_end_to_end_store_scenario() {
    let (_tmp, store) = seeded_store();

    let issue = issues::create_issue(&store, "u1", new_issue("X", "bug", None)).unwrap();
    let all = issues::list_issues(&store, &IssueFilters::default()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "X");
    assert_eq!(all[0].status, "open");

    thread::sleep(Duration::from_millis(5));
    assert!(issues::update_status(&store, "u1", &issue.id, "resolved").unwrap());
    let all = issues::list_issues(&store, &IssueFilters::default()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, "resolved");

    let created = DateTime::parse_from_rfc3339(&all[0].created_at).unwrap();
    let updated = DateTime::parse_from_rfc3339(&all[0].updated_at).unwrap();
    assert!(updated > created);

    assert!(issues::collection(&store.root).delete_by_id(&issue.id).unwrap());
    assert!(issues::list_issues(&store, &IssueFilters::default()).unwrap().is_empty());
}

#[test]
fn test_list_filters() {
    let (_tmp, store) = seeded_store();
    issues::create_issue(&store, "u1", new_issue("a", "bug", Some("Guangdong"))).unwrap();
    issues::create_issue(&store, "u1", new_issue("b", "feature", Some("Guangdong"))).unwrap();
    let c = issues::create_issue(&store, "u2", new_issue("c", "bug", Some("Zhejiang"))).unwrap();
    issues::update_status(&store, "u2", &c.id, "closed").unwrap();

    let bugs = issues::list_issues(
        &store,
        &IssueFilters {
            category: Some("bug".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(bugs.len(), 2);

    let guangdong = issues::list_issues(
        &store,
        &IssueFilters {
            province: Some("Guangdong".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(guangdong.len(), 2);

    let open_bugs = issues::list_issues(
        &store,
        &IssueFilters {
            status: Some("open".to_string()),
            category: Some("bug".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(open_bugs.len(), 1);
    assert_eq!(open_bugs[0].title, "a");

    let by_submitter = issues::list_issues(
        &store,
        &IssueFilters {
            submitter: Some("u2".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_submitter.len(), 1);
    assert_eq!(by_submitter[0].title, "c");
}

#[test]
fn test_commenting_preserves_sibling_issues() {
    let (_tmp, store) = seeded_store();
    let a = issues::create_issue(&store, "u1", new_issue("a", "bug", None)).unwrap();
    let b = issues::create_issue(&store, "u1", new_issue("b", "bug", None)).unwrap();

    let b_before = serde_json::to_value(issues::get_issue(&store, &b.id).unwrap().unwrap()).unwrap();
    assert!(issues::add_comment(&store, "u2", &a.id, "only A changes").unwrap());
    let b_after = serde_json::to_value(issues::get_issue(&store, &b.id).unwrap().unwrap()).unwrap();
    assert_eq!(b_before, b_after);

    let a_after = issues::get_issue(&store, &a.id).unwrap().unwrap();
    assert_eq!(a_after.comments.len(), 1);
}

#[test]
fn test_invalid_inputs_are_rejected() {
    let (_tmp, store) = seeded_store();

    assert!(issues::create_issue(&store, "u1", new_issue("", "bug", None)).is_err());
    assert!(issues::create_issue(&store, "u1", new_issue("t", "enhancement", None)).is_err());

    let mut bad_priority = new_issue("t", "bug", None);
    bad_priority.priority = "critical".to_string();
    assert!(issues::create_issue(&store, "u1", bad_priority).is_err());

    let issue = issues::create_issue(&store, "u1", new_issue("ok", "bug", None)).unwrap();
    assert!(issues::update_status(&store, "u1", &issue.id, "abandoned").is_err());
    assert!(issues::add_comment(&store, "u1", &issue.id, "   ").is_err());
}

#[test]
fn test_operations_on_missing_issue_report_false() {
    let (_tmp, store) = seeded_store();
    assert!(!issues::update_status(&store, "u1", "no-such-id", "closed").unwrap());
    assert!(!issues::assign(&store, "u1", "no-such-id", "dev-1").unwrap());
    assert!(!issues::add_comment(&store, "u1", "no-such-id", "hello").unwrap());
}

#[test]
fn test_issue_mutations_are_audited() {
    let (_tmp, store) = seeded_store();
    let issue = issues::create_issue(&store, "u1", new_issue("audited", "bug", None)).unwrap();
    issues::assign(&store, "mgr", &issue.id, "dev-1").unwrap();

    let actions: Vec<String> = audit::recent(&store, 50)
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert!(actions.contains(&"create_issue".to_string()));
    assert!(actions.contains(&"assign_issue".to_string()));

    // A miss must not be audited.
    issues::assign(&store, "mgr", "no-such-id", "dev-2").unwrap();
    let count = audit::recent(&store, 50)
        .unwrap()
        .iter()
        .filter(|e| e.action == "assign_issue")
        .count();
    assert_eq!(count, 1);
}
