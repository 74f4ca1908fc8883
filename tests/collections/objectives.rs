use tempfile::tempdir;
use tidepool::collections::objectives::{self, NewObjective, ObjectiveFilters};
use tidepool::core::store::Store;
use tidepool::init_store;

fn seeded_store() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("data"));
    init_store(&store).unwrap();
    (tmp, store)
}

fn new_objective(title: &str, parent: Option<String>) -> NewObjective {
    NewObjective {
        title: title.to_string(),
        description: "".to_string(),
        target_province: None,
        target_user: None,
        deadline: "2026-12-31".to_string(),
        creator_id: "manager-1".to_string(),
        parent_id: parent,
    }
}

#[test]
fn test_create_starts_pending_at_zero() {
    let (_tmp, store) = seeded_store();
    let objective = objectives::create_objective(&store, "m", new_objective("Q4 rollout", None)).unwrap();
    assert_eq!(objective.status, "pending");
    assert_eq!(objective.progress, 0);
    assert!(objective.sub_objectives.is_empty());
}

#[test]
fn test_child_links_into_parent() {
    let (_tmp, store) = seeded_store();
    let parent = objectives::create_objective(&store, "m", new_objective("Yearly target", None)).unwrap();
    let child =
        objectives::create_objective(&store, "m", new_objective("Q1 slice", Some(parent.id.clone())))
            .unwrap();

    let parent = objectives::get_objective(&store, &parent.id).unwrap().unwrap();
    assert_eq!(parent.sub_objectives, vec![child.id.clone()]);
    assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
}

#[test]
fn test_unknown_parent_is_rejected() {
    let (_tmp, store) = seeded_store();
    assert!(
        objectives::create_objective(&store, "m", new_objective("orphan", Some("no-such-id".to_string())))
            .is_err()
    );
}

#[test]
fn test_progress_clamps_and_derives_status() {
    let (_tmp, store) = seeded_store();
    let objective = objectives::create_objective(&store, "m", new_objective("goal", None)).unwrap();

    assert!(objectives::update_progress(&store, "staff-1", &objective.id, 40, None).unwrap());
    let got = objectives::get_objective(&store, &objective.id).unwrap().unwrap();
    assert_eq!(got.progress, 40);
    assert_eq!(got.status, "in_progress");

    // Over-reporting clamps to 100 and reads as completed.
    assert!(objectives::update_progress(&store, "staff-1", &objective.id, 150, None).unwrap());
    let got = objectives::get_objective(&store, &objective.id).unwrap().unwrap();
    assert_eq!(got.progress, 100);
    assert_eq!(got.status, "completed");

    // An explicit status wins over the derived one.
    assert!(
        objectives::update_progress(&store, "staff-1", &objective.id, 90, Some("overdue".to_string()))
            .unwrap()
    );
    let got = objectives::get_objective(&store, &objective.id).unwrap().unwrap();
    assert_eq!(got.status, "overdue");

    assert!(
        objectives::update_progress(&store, "staff-1", &objective.id, 10, Some("stalled".to_string()))
            .is_err()
    );
}

#[test]
fn test_review_transitions() {
    let (_tmp, store) = seeded_store();
    let objective = objectives::create_objective(&store, "m", new_objective("goal", None)).unwrap();
    objectives::update_progress(&store, "staff-1", &objective.id, 100, None).unwrap();

    // Rejection sends it back to work.
    assert!(objectives::approve(&store, "m", &objective.id, false, "numbers missing").unwrap());
    let got = objectives::get_objective(&store, &objective.id).unwrap().unwrap();
    assert_eq!(got.status, "in_progress");

    // Approval completes it.
    assert!(objectives::approve(&store, "m", &objective.id, true, "").unwrap());
    let got = objectives::get_objective(&store, &objective.id).unwrap().unwrap();
    assert_eq!(got.status, "completed");

    assert!(!objectives::approve(&store, "m", "no-such-id", true, "").unwrap());
}

#[test]
fn test_list_filters() {
    let (_tmp, store) = seeded_store();
    let mut a = new_objective("a", None);
    a.target_province = Some("Guangdong".to_string());
    let b = new_objective("b", None);
    objectives::create_objective(&store, "m", a).unwrap();
    let b = objectives::create_objective(&store, "m", b).unwrap();
    objectives::update_progress(&store, "m", &b.id, 10, None).unwrap();

    let by_province = objectives::list_objectives(
        &store,
        &ObjectiveFilters {
            province: Some("Guangdong".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_province.len(), 1);
    assert_eq!(by_province[0].title, "a");

    let in_progress = objectives::list_objectives(
        &store,
        &ObjectiveFilters {
            status: Some("in_progress".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(in_progress.len(), 1);
    assert_eq!(in_progress[0].title, "b");

    let by_creator = objectives::list_objectives(
        &store,
        &ObjectiveFilters {
            creator: Some("manager-1".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_creator.len(), 2);
}
