use std::path::PathBuf;

use clause_guard_core::{
    decide, select_rewrites, ClauseSource, ClauseStore, FileClauseSource, RewriteView, Session,
    Verdict,
};
use insta::assert_json_snapshot;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

async fn load_fixture(name: &str) -> ClauseStore {
    let source = FileClauseSource::new(fixture(name));
    source
        .load_store()
        .await
        .unwrap_or_else(|err| panic!("failed to load fixture {name}: {err:#}"))
}

#[tokio::test(flavor = "current_thread")]
async fn sample_contract_expanded_snapshot() {
    let mut session = Session::new(load_fixture("sample_contract.json").await);
    session.expand_rewrites();
    assert_eq!(session.rewrite_view(), RewriteView::Expanded);
    let view = session.report_view().expect("fixture has clauses");
    assert_json_snapshot!("sample_contract_expanded", view);
}

#[tokio::test(flavor = "current_thread")]
async fn medium_majority_fixture_needs_revision() {
    let store = load_fixture("medium_majority.json").await;
    assert_eq!(decide(&store.distribution()), Verdict::ReviseRecommended);
    assert_eq!(select_rewrites(&store).len(), 3);
}

#[tokio::test(flavor = "current_thread")]
async fn all_low_fixture_is_acceptable_without_rewrites() {
    let store = load_fixture("all_low.json").await;
    assert_eq!(decide(&store.distribution()), Verdict::Acceptable);
    assert!(select_rewrites(&store).is_empty());
    let summary = clause_guard_core::aggregate(&store).unwrap();
    assert!(summary.in_good_standing());
}
