//! Integration tests for `SqliteStore` against an in-memory database, driven
//! through the core pipeline, hierarchy and roll-up entry points.

use psephos_core::{
  Error,
  fact::FactKind,
  hierarchy::{Level, Node, NodeInput},
  nodes::{self, NodeFilter},
  page::PageRequest,
  pipeline::{self, FactFilter, FactView},
  rollup::{self, RollupFilter},
  store::{DateRange, ElectionStore, FactQuery, NumericRange, WriteOutcome},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn caller() -> Uuid { Uuid::from_u128(0xC0FFEE) }

fn page(n: u64, size: u64) -> PageRequest { PageRequest::new(n, size, 100).unwrap() }

fn everything() -> PageRequest { page(1, 100) }

async fn node(s: &SqliteStore, level: Level, name: &str, parent: Option<&Node>) -> Node {
  let input = NodeInput {
    name: Some(name.into()),
    parent_id: parent.map(|p| p.id),
    full_address: (level == Level::Booth).then(|| format!("{name}, primary school")),
    ..Default::default()
  };
  nodes::create_node(s, level, input, caller()).await.unwrap()
}

/// One node per level, each the child of the previous.
struct Chain {
  state:      Node,
  division:   Node,
  parliament: Node,
  assembly:   Node,
  block:      Node,
  booth:      Node,
}

async fn chain(s: &SqliteStore, tag: &str) -> Chain {
  let state = node(s, Level::State, &format!("{tag} state"), None).await;
  let division = node(s, Level::Division, &format!("{tag} division"), Some(&state)).await;
  let parliament = node(s, Level::Parliament, &format!("{tag} pc"), Some(&division)).await;
  let assembly = node(s, Level::Assembly, &format!("{tag} ac"), Some(&parliament)).await;
  let block = node(s, Level::Block, &format!("{tag} block"), Some(&assembly)).await;
  let booth = node(s, Level::Booth, &format!("{tag} booth"), Some(&block)).await;
  Chain { state, division, parliament, assembly, block, booth }
}

async fn create(s: &SqliteStore, kind: FactKind, data: Value) -> Result<FactView, Error> {
  pipeline::create_fact(s, kind, data, caller()).await
}

async fn party(s: &SqliteStore, name: &str, abbr: &str) -> FactView {
  create(s, FactKind::Party, json!({ "name": name, "abbreviation": abbr }))
    .await
    .unwrap()
}

async fn year(s: &SqliteStore, year: i32) -> FactView {
  create(s, FactKind::ElectionYear, json!({ "year": year, "election_type": "Assembly" }))
    .await
    .unwrap()
}

async fn candidate(s: &SqliteStore, name: &str, party: &FactView, c: &Chain, y: &FactView) -> FactView {
  create(
    s,
    FactKind::Candidate,
    json!({
      "name": name,
      "party_id": party.id,
      "assembly_id": c.assembly.id,
      "election_year_id": y.id,
    }),
  )
  .await
  .unwrap()
}

fn booth_votes(candidate: &FactView, booth: &Node, year: &FactView, votes: i64) -> Value {
  json!({
    "candidate_id": candidate.id,
    "booth_id": booth.id,
    "election_year_id": year.id,
    "total_votes": votes,
  })
}

async fn count(s: &SqliteStore, kind: FactKind) -> u64 {
  s.count_facts(&FactQuery::kind(kind)).await.unwrap()
}

// ─── Hierarchy ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn child_ancestry_is_derived_from_parent() {
  let s = store().await;
  let c = chain(&s, "north").await;

  let booth = nodes::get_node(&s, Level::Booth, c.booth.id).await.unwrap();
  assert_eq!(booth.parent_id, Some(c.block.id));
  assert_eq!(booth.ancestry.state_id, Some(c.state.id));
  assert_eq!(booth.ancestry.division_id, Some(c.division.id));
  assert_eq!(booth.ancestry.parliament_id, Some(c.parliament.id));
  assert_eq!(booth.ancestry.assembly_id, Some(c.assembly.id));
  assert_eq!(booth.ancestry.block_id, Some(c.block.id));
}

#[tokio::test]
async fn node_requires_existing_parent_at_level_above() {
  let s = store().await;
  let c = chain(&s, "n").await;

  let orphan = NodeInput {
    name: Some("Orphan".into()),
    parent_id: Some(Uuid::new_v4()),
    ..Default::default()
  };
  let err = nodes::create_node(&s, Level::Block, orphan, caller()).await.unwrap_err();
  assert!(matches!(err, Error::ReferenceNotFound { ref field } if field == "parent_id"));

  // A division is not a valid parent for a block.
  let skipped = NodeInput {
    name: Some("Skipped".into()),
    parent_id: Some(c.division.id),
    ..Default::default()
  };
  let err = nodes::create_node(&s, Level::Block, skipped, caller()).await.unwrap_err();
  assert!(matches!(err, Error::ReferenceNotFound { .. }));

  let missing = NodeInput { name: Some("Loose".into()), ..Default::default() };
  let err = nodes::create_node(&s, Level::Assembly, missing, caller()).await.unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "parent_id"));
}

#[tokio::test]
async fn claimed_ancestors_must_match_parent() {
  let s = store().await;
  let a = chain(&s, "a").await;
  let b = chain(&s, "b").await;

  let input = NodeInput {
    name: Some("Mixed".into()),
    parent_id: Some(a.parliament.id),
    division_id: Some(b.division.id),
    ..Default::default()
  };
  let err = nodes::create_node(&s, Level::Assembly, input, caller()).await.unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "division_id"));
}

#[tokio::test]
async fn codes_are_unique_per_level() {
  let s = store().await;
  let c = chain(&s, "c").await;

  let coded = |name: &str, code: &str| NodeInput {
    name: Some(name.into()),
    code: Some(code.into()),
    parent_id: Some(c.parliament.id),
    ..Default::default()
  };
  let first = nodes::create_node(&s, Level::Assembly, coded("Ac 12", "12"), caller())
    .await
    .unwrap();
  let err = nodes::create_node(&s, Level::Assembly, coded("Ac 12 bis", "12"), caller())
    .await
    .unwrap_err();
  match err {
    Error::DuplicateRecord { conflicting_fields, existing_id } => {
      assert_eq!(conflicting_fields, ["code"]);
      assert_eq!(existing_id, first.id);
    }
    other => panic!("expected DuplicateRecord, got {other:?}"),
  }

  // Same code at another level is fine.
  let block = NodeInput {
    name: Some("Block 12".into()),
    code: Some("12".into()),
    parent_id: Some(first.id),
    ..Default::default()
  };
  nodes::create_node(&s, Level::Block, block, caller()).await.unwrap();

  // Re-sending a node's own code is not a conflict.
  let same = NodeInput { code: Some("12".into()), ..Default::default() };
  nodes::update_node(&s, Level::Assembly, first.id, same, caller()).await.unwrap();
}

#[tokio::test]
async fn reparent_cascades_ancestry_to_descendants() {
  let s = store().await;
  let a = chain(&s, "a").await;
  let b = chain(&s, "b").await;

  let input = NodeInput { parent_id: Some(b.parliament.id), ..Default::default() };
  let moved = nodes::update_node(&s, Level::Assembly, a.assembly.id, input, caller())
    .await
    .unwrap();
  assert_eq!(moved.ancestry.parliament_id, Some(b.parliament.id));
  assert_eq!(moved.ancestry.division_id, Some(b.division.id));

  let booth = nodes::get_node(&s, Level::Booth, a.booth.id).await.unwrap();
  assert_eq!(booth.ancestry.state_id, Some(b.state.id));
  assert_eq!(booth.ancestry.division_id, Some(b.division.id));
  assert_eq!(booth.ancestry.parliament_id, Some(b.parliament.id));
  assert_eq!(booth.ancestry.assembly_id, Some(a.assembly.id));
  assert_eq!(booth.ancestry.block_id, Some(a.block.id));
}

#[tokio::test]
async fn delete_is_restricted_while_referenced() {
  let s = store().await;
  let c = chain(&s, "d").await;

  let err = nodes::delete_node(&s, Level::Block, c.block.id).await.unwrap_err();
  assert!(matches!(err, Error::NodeInUse { dependents: 1, .. }));

  create(
    &s,
    FactKind::BoothSurvey,
    json!({ "booth_id": c.booth.id, "survey_date": "2024-02-10" }),
  )
  .await
  .unwrap();
  let err = nodes::delete_node(&s, Level::Booth, c.booth.id).await.unwrap_err();
  assert!(matches!(err, Error::NodeInUse { level: Level::Booth, dependents: 1, .. }));

  let spare = node(&s, Level::Booth, "spare", Some(&c.block)).await;
  nodes::delete_node(&s, Level::Booth, spare.id).await.unwrap();
  let err = nodes::get_node(&s, Level::Booth, spare.id).await.unwrap_err();
  assert!(matches!(err, Error::NodeNotFound { level: Level::Booth, .. }));
}

#[tokio::test]
async fn list_nodes_by_parent_and_text() {
  let s = store().await;
  let c = chain(&s, "l").await;
  node(&s, Level::Booth, "Ramgarh", Some(&c.block)).await;
  node(&s, Level::Booth, "Sitapur", Some(&c.block)).await;

  let filter = NodeFilter { parent_id: Some(c.block.id), text: None };
  let all = nodes::list_nodes(&s, Level::Booth, filter, page(1, 2)).await.unwrap();
  assert_eq!(all.total, 3);
  assert_eq!(all.count, 2);
  assert_eq!(all.pages, 2);
  assert_eq!(all.data[0].id, c.booth.id);

  let filter = NodeFilter { parent_id: None, text: Some("ramg".into()) };
  let hits = nodes::list_nodes(&s, Level::Booth, filter, everything()).await.unwrap();
  assert_eq!(hits.total, 1);
  assert_eq!(hits.data[0].name, "Ramgarh");
}

// ─── Write pipeline ──────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_booth_votes_are_rejected() {
  let s = store().await;
  let c = chain(&s, "v").await;
  let p = party(&s, "Lok Dal", "LD").await;
  let y = year(&s, 2024).await;
  let cand = candidate(&s, "C1", &p, &c, &y).await;

  let first = create(&s, FactKind::BoothVotes, booth_votes(&cand, &c.booth, &y, 500))
    .await
    .unwrap();
  let err = create(&s, FactKind::BoothVotes, booth_votes(&cand, &c.booth, &y, 700))
    .await
    .unwrap_err();

  match err {
    Error::DuplicateRecord { conflicting_fields, existing_id } => {
      assert_eq!(conflicting_fields, ["candidate_id", "booth_id", "election_year_id"]);
      assert_eq!(existing_id, first.id);
    }
    other => panic!("expected DuplicateRecord, got {other:?}"),
  }
  assert_eq!(count(&s, FactKind::BoothVotes).await, 1);
}

#[tokio::test]
async fn missing_reference_persists_nothing() {
  let s = store().await;
  let c = chain(&s, "r").await;
  let p = party(&s, "Lok Dal", "LD").await;
  let y = year(&s, 2024).await;
  let cand = candidate(&s, "C1", &p, &c, &y).await;

  let mut data = booth_votes(&cand, &c.booth, &y, 10);
  data["booth_id"] = json!(Uuid::new_v4());
  let err = create(&s, FactKind::BoothVotes, data).await.unwrap_err();
  assert!(matches!(err, Error::ReferenceNotFound { ref field } if field == "booth_id"));

  // A candidate id pointing at a party is a missing candidate.
  let mut data = booth_votes(&cand, &c.booth, &y, 10);
  data["candidate_id"] = json!(p.id);
  let err = create(&s, FactKind::BoothVotes, data).await.unwrap_err();
  assert!(matches!(err, Error::ReferenceNotFound { ref field } if field == "candidate_id"));

  assert_eq!(count(&s, FactKind::BoothVotes).await, 0);
}

#[tokio::test]
async fn cross_level_references_must_agree() {
  let s = store().await;
  let a = chain(&s, "a").await;
  let b = chain(&s, "b").await;
  let p = party(&s, "Lok Dal", "LD").await;
  let y = year(&s, 2024).await;
  let cand = candidate(&s, "C1", &p, &a, &y).await;

  let data = json!({
    "candidate_id": cand.id,
    "block_id": b.block.id,
    "booth_id": a.booth.id,
    "election_year_id": y.id,
    "total_votes": 20,
  });
  let err = create(&s, FactKind::BlockVotes, data).await.unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "block_id"));

  let data = json!({
    "candidate_id": cand.id,
    "block_id": a.block.id,
    "booth_id": a.booth.id,
    "election_year_id": y.id,
    "total_votes": 20,
  });
  create(&s, FactKind::BlockVotes, data).await.unwrap();
}

#[tokio::test]
async fn update_with_equal_values_does_not_self_conflict() {
  let s = store().await;
  let c = chain(&s, "u").await;
  let p = party(&s, "Lok Dal", "LD").await;
  let y = year(&s, 2024).await;
  let cand = candidate(&s, "C1", &p, &c, &y).await;
  let votes = create(&s, FactKind::BoothVotes, booth_votes(&cand, &c.booth, &y, 500))
    .await
    .unwrap();

  let Value::Object(patch) = booth_votes(&cand, &c.booth, &y, 500) else { unreachable!() };
  let updated = pipeline::update_fact(&s, FactKind::BoothVotes, votes.id, patch, Uuid::new_v4())
    .await
    .unwrap();
  assert_eq!(updated.id, votes.id);
  assert_eq!(updated.audit.created_by, caller());
  assert_ne!(updated.audit.updated_by, caller());
}

#[tokio::test]
async fn update_into_another_records_key_conflicts() {
  let s = store().await;
  let c = chain(&s, "u").await;
  let p = party(&s, "Lok Dal", "LD").await;
  let y = year(&s, 2024).await;
  let c1 = candidate(&s, "C1", &p, &c, &y).await;
  let q = party(&s, "Jan Morcha", "JM").await;
  let c2 = candidate(&s, "C2", &q, &c, &y).await;

  let v1 = create(&s, FactKind::BoothVotes, booth_votes(&c1, &c.booth, &y, 1)).await.unwrap();
  let v2 = create(&s, FactKind::BoothVotes, booth_votes(&c2, &c.booth, &y, 2)).await.unwrap();

  let mut patch = serde_json::Map::new();
  patch.insert("candidate_id".into(), json!(c1.id));
  let err = pipeline::update_fact(&s, FactKind::BoothVotes, v2.id, patch, caller())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateRecord { existing_id, .. } if existing_id == v1.id));

  let mut patch = serde_json::Map::new();
  patch.insert("total_votes".into(), json!(-5));
  let err = pipeline::update_fact(&s, FactKind::BoothVotes, v2.id, patch, caller())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "total_votes"));

  let stored = pipeline::get_fact(&s, FactKind::BoothVotes, v2.id).await.unwrap();
  assert_eq!(stored.value.to_json().unwrap()["total_votes"], 2);
}

#[tokio::test]
async fn unique_constraint_backs_up_the_guard() {
  let s = store().await;
  let y = year(&s, 2024).await;

  // Bypass the guard: a second row with the same year goes straight to the
  // store.
  let mut twin = s.get_fact(y.id).await.unwrap().unwrap();
  twin.fact_id = Uuid::new_v4();
  let outcome = s.insert_fact(&twin).await.unwrap();
  match outcome {
    WriteOutcome::Conflict(conflict) => {
      assert_eq!(conflict.key, "year");
      assert_eq!(conflict.existing_id, y.id);
    }
    WriteOutcome::Written => panic!("duplicate year was written"),
  }
  assert_eq!(count(&s, FactKind::ElectionYear).await, 1);
  assert!(s.get_fact(twin.fact_id).await.unwrap().is_none());
}

#[tokio::test]
async fn get_returns_reference_labels() {
  let s = store().await;
  let c = chain(&s, "g").await;
  let p = party(&s, "Lok Dal", "ld").await;
  let y = year(&s, 2024).await;
  let cand = candidate(&s, "Meera Devi", &p, &c, &y).await;

  let view = pipeline::get_fact(&s, FactKind::Candidate, cand.id).await.unwrap();
  let label = |field: &str| {
    view
      .references
      .iter()
      .find(|r| r.field == field)
      .map(|r| r.label.clone())
  };
  assert_eq!(label("party_id").as_deref(), Some("Lok Dal (LD)"));
  assert_eq!(label("assembly_id").as_deref(), Some("g ac"));
  assert_eq!(label("election_year_id").as_deref(), Some("2024 Assembly"));

  let err = pipeline::get_fact(&s, FactKind::Party, cand.id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { kind: FactKind::Party, .. }));
}

#[tokio::test]
async fn winner_references_are_frozen() {
  let s = store().await;
  let c = chain(&s, "w").await;
  let p = party(&s, "Lok Dal", "LD").await;
  let q = party(&s, "Jan Morcha", "JM").await;
  let y = year(&s, 2024).await;
  let cand = candidate(&s, "C1", &p, &c, &y).await;

  let mut data = json!({
    "candidate_id": cand.id,
    "assembly_id": c.assembly.id,
    "party_id": q.id,
    "election_year_id": y.id,
    "votes": 4100,
    "margin": 300,
  });
  let err = create(&s, FactKind::AssemblyWinner, data.clone()).await.unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "party_id"));

  data["party_id"] = json!(p.id);
  let winner = create(&s, FactKind::AssemblyWinner, data).await.unwrap();

  let mut patch = serde_json::Map::new();
  patch.insert("party_id".into(), json!(q.id));
  let err = pipeline::update_fact(&s, FactKind::AssemblyWinner, winner.id, patch, caller())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "party_id"));

  let mut patch = serde_json::Map::new();
  patch.insert("party_id".into(), json!(p.id));
  patch.insert("margin".into(), json!(320));
  pipeline::update_fact(&s, FactKind::AssemblyWinner, winner.id, patch, caller())
    .await
    .unwrap();
}

#[tokio::test]
async fn demographics_fill_ancestors_from_booth() {
  let s = store().await;
  let c = chain(&s, "dm").await;

  let view = create(
    &s,
    FactKind::BoothDemographics,
    json!({
      "booth_id": c.booth.id,
      "total_population": 1200,
      "total_electors": 900,
      "male_electors": 460,
      "female_electors": 440,
    }),
  )
  .await
  .unwrap();
  let body = view.value.to_json().unwrap();
  assert_eq!(body["block_id"], json!(c.block.id));
  assert_eq!(body["assembly_id"], json!(c.assembly.id));
  assert_eq!(body["parliament_id"], json!(c.parliament.id));

  let err = create(
    &s,
    FactKind::BoothDemographics,
    json!({
      "booth_id": c.booth.id,
      "total_population": 1,
      "total_electors": 0,
      "male_electors": 0,
      "female_electors": 0,
    }),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::DuplicateRecord { .. }));
}

#[tokio::test]
async fn booth_stats_and_vote_shares_are_keyed() {
  let s = store().await;
  let c = chain(&s, "st").await;
  let p = party(&s, "Lok Dal", "LD").await;
  let y = year(&s, 2024).await;

  let stats_body = json!({
    "booth_id": c.booth.id,
    "election_year_id": y.id,
    "total_votes_polled": 812,
    "turnout_percentage": 67.4,
    "winning_party_id": p.id,
  });
  let stats = create(&s, FactKind::BoothElectionStats, stats_body.clone()).await.unwrap();
  let err = create(&s, FactKind::BoothElectionStats, stats_body).await.unwrap_err();
  match err {
    Error::DuplicateRecord { conflicting_fields, existing_id } => {
      assert_eq!(conflicting_fields, ["booth_id", "election_year_id"]);
      assert_eq!(existing_id, stats.id);
    }
    other => panic!("expected DuplicateRecord, got {other:?}"),
  }

  let share = |stat_id: Uuid| json!({ "stat_id": stat_id, "party_id": p.id, "votes": 390, "vote_percent": 48.0 });
  let first = create(&s, FactKind::BoothPartyVoteShare, share(stats.id)).await.unwrap();
  let err = create(&s, FactKind::BoothPartyVoteShare, share(stats.id)).await.unwrap_err();
  assert!(matches!(
    err,
    Error::DuplicateRecord { ref conflicting_fields, existing_id }
      if conflicting_fields == &["stat_id", "party_id"] && existing_id == first.id
  ));

  // An election year is not a stats record.
  let err = create(&s, FactKind::BoothPartyVoteShare, share(y.id)).await.unwrap_err();
  assert!(matches!(err, Error::ReferenceNotFound { ref field } if field == "stat_id"));

  let err = pipeline::delete_fact(&s, FactKind::BoothElectionStats, stats.id).await.unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "id"));
  assert_eq!(count(&s, FactKind::BoothElectionStats).await, 1);
}

#[tokio::test]
async fn voting_trend_derives_chain_and_is_keyed_by_year() {
  let s = store().await;
  let a = chain(&s, "a").await;
  let b = chain(&s, "b").await;
  let p = party(&s, "Lok Dal", "LD").await;

  let trend = create(
    &s,
    FactKind::VotingTrend,
    json!({
      "booth_id": a.booth.id,
      "election_year": 2019,
      "turnout_percent": 62.0,
      "party_vote_shares": [{ "party_id": p.id, "vote_share": 47.5 }],
    }),
  )
  .await
  .unwrap();
  let body = trend.value.to_json().unwrap();
  assert_eq!(body["division_id"], json!(a.division.id));
  assert_eq!(body["parliament_id"], json!(a.parliament.id));
  assert_eq!(body["assembly_id"], json!(a.assembly.id));
  assert_eq!(body["block_id"], json!(a.block.id));
  let share = trend.references.iter().find(|r| r.field == "party_vote_shares").unwrap();
  assert_eq!(share.label, "Lok Dal (LD)");

  let err = create(&s, FactKind::VotingTrend, json!({ "booth_id": a.booth.id, "election_year": 2019 }))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::DuplicateRecord { ref conflicting_fields, .. }
      if conflicting_fields == &["booth_id", "election_year"]
  ));
  create(&s, FactKind::VotingTrend, json!({ "booth_id": a.booth.id, "election_year": 2014 }))
    .await
    .unwrap();

  let err = create(
    &s,
    FactKind::VotingTrend,
    json!({ "booth_id": a.booth.id, "division_id": b.division.id, "election_year": 2009 }),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "division_id"));

  let filter = FactFilter {
    eq: vec![("party_vote_shares".into(), p.id)],
    ..Default::default()
  };
  let page = pipeline::list_facts(&s, FactKind::VotingTrend, filter, everything()).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.data[0].id, trend.id);

  let err = pipeline::delete_fact(&s, FactKind::Party, p.id).await.unwrap_err();
  assert!(matches!(err, Error::Validation { .. }));
}

#[tokio::test]
async fn active_party_keeps_last_status() {
  let s = store().await;
  let c = chain(&s, "ap").await;
  let p = party(&s, "Lok Dal", "LD").await;

  let body = json!({ "booth_id": c.booth.id, "party_id": p.id });
  let created = create(&s, FactKind::ActiveParty, body.clone()).await.unwrap();
  let err = create(&s, FactKind::ActiveParty, body).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateRecord { existing_id, .. } if existing_id == created.id));

  let set_active = |active: bool| {
    let mut patch = serde_json::Map::new();
    patch.insert("active".into(), json!(active));
    patch
  };
  let off = pipeline::update_fact(&s, FactKind::ActiveParty, created.id, set_active(false), caller())
    .await
    .unwrap();
  let body = off.value.to_json().unwrap();
  assert_eq!((body["active"].clone(), body["last_active"].clone()), (json!(false), json!(true)));

  let on = pipeline::update_fact(&s, FactKind::ActiveParty, created.id, set_active(true), caller())
    .await
    .unwrap();
  let body = on.value.to_json().unwrap();
  assert_eq!((body["active"].clone(), body["last_active"].clone()), (json!(true), json!(false)));
}

#[tokio::test]
async fn field_contacts_follow_the_booth_chain() {
  let s = store().await;
  let a = chain(&s, "a").await;
  let b = chain(&s, "b").await;
  let p = party(&s, "Lok Dal", "LD").await;

  let volunteer = create(
    &s,
    FactKind::BoothVolunteer,
    json!({
      "booth_id": a.booth.id,
      "party_id": p.id,
      "name": " Sunita Bai ",
      "phone": "9876500011",
      "email": " Sunita@Example.IN ",
    }),
  )
  .await
  .unwrap();
  let body = volunteer.value.to_json().unwrap();
  assert_eq!(body["block_id"], json!(a.block.id));
  assert_eq!(body["parliament_id"], json!(a.parliament.id));
  assert_eq!(body["name"], "Sunita Bai");
  assert_eq!(body["email"], "sunita@example.in");
  assert_eq!(body["activity_level"], "Medium");

  let visit = |c: &Chain, booth: &Node, date: &str| {
    json!({
      "person_name": "D. Rao",
      "post": "Observer",
      "date": date,
      "division_id": c.division.id,
      "parliament_id": c.parliament.id,
      "assembly_id": c.assembly.id,
      "block_id": c.block.id,
      "booth_id": booth.id,
    })
  };
  create(&s, FactKind::Visit, visit(&a, &a.booth, "2024-02-11")).await.unwrap();
  create(&s, FactKind::Visit, visit(&a, &a.booth, "2024-03-02")).await.unwrap();
  let err = create(&s, FactKind::Visit, visit(&a, &b.booth, "2024-03-05")).await.unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "division_id"));

  let filter = FactFilter {
    dates: vec![DateRange {
      field: "date".into(),
      from:  "2024-03-01".parse().ok(),
      to:    None,
    }],
    ..Default::default()
  };
  let page = pipeline::list_facts(&s, FactKind::Visit, filter, everything()).await.unwrap();
  assert_eq!(page.total, 1);

  let err = create(
    &s,
    FactKind::Influencer,
    json!({
      "name": "Mukhiya",
      "contact_number": "12345",
      "full_address": "Chowk",
      "state_id": a.state.id,
      "division_id": a.division.id,
      "parliament_id": a.parliament.id,
      "assembly_id": a.assembly.id,
      "block_id": a.block.id,
      "booth_id": a.booth.id,
    }),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "contact_number"));
}

#[tokio::test]
async fn committee_regions_must_all_exist() {
  let s = store().await;
  let a = chain(&s, "a").await;
  let b = chain(&s, "b").await;

  let err = create(
    &s,
    FactKind::Committee,
    json!({ "region_type": "Block", "region_ids": [a.block.id, Uuid::new_v4()] }),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::ReferenceNotFound { ref field } if field == "region_ids"));

  // Ids of the wrong level do not count.
  let err = create(
    &s,
    FactKind::Committee,
    json!({ "region_type": "Block", "region_ids": [a.block.id, b.assembly.id] }),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::ReferenceNotFound { .. }));

  let committee = create(
    &s,
    FactKind::Committee,
    json!({
      "region_type": "Block",
      "region_ids": [a.block.id, b.block.id],
      "committee_name": "Twin blocks",
    }),
  )
  .await
  .unwrap();

  nodes::delete_node(&s, Level::Booth, b.booth.id).await.unwrap();
  let err = nodes::delete_node(&s, Level::Block, b.block.id).await.unwrap_err();
  assert!(matches!(err, Error::NodeInUse { .. }));

  let incharge = json!({
    "committee_id": committee.id,
    "name": "R. Meena",
    "phone": "9876543210",
    "email": "R.Meena@Example.in",
    "designation": "Convenor",
  });
  create(&s, FactKind::Incharge, incharge.clone()).await.unwrap();
  let mut other = incharge;
  other["phone"] = json!("9123456780");
  other["email"] = json!("r.meena@example.in");
  let err = create(&s, FactKind::Incharge, other).await.unwrap_err();
  assert!(matches!(
    err,
    Error::DuplicateRecord { ref conflicting_fields, .. } if conflicting_fields == &["email"]
  ));

  let err = pipeline::delete_fact(&s, FactKind::Committee, committee.id).await.unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "id"));
}

#[tokio::test]
async fn list_facts_filters() {
  let s = store().await;
  let a = chain(&s, "a").await;
  let b = chain(&s, "b").await;
  let p = party(&s, "Lok Dal", "LD").await;
  let y = year(&s, 2024).await;
  let c1 = candidate(&s, "Meera Devi", &p, &a, &y).await;
  let c2 = candidate(&s, "Ravi Kumar", &p, &b, &y).await;

  for (cand, chain, votes) in [(&c1, &a, 100), (&c2, &b, 400), (&c1, &a, 0)] {
    let booth = if votes == 0 {
      node(&s, Level::Booth, "extra", Some(&chain.block)).await
    } else {
      chain.booth.clone()
    };
    create(&s, FactKind::BoothVotes, booth_votes(cand, &booth, &y, votes)).await.unwrap();
  }

  let by_candidate = FactFilter {
    eq: vec![("candidate_id".into(), c1.id)],
    ..Default::default()
  };
  let hits = pipeline::list_facts(&s, FactKind::BoothVotes, by_candidate, everything())
    .await
    .unwrap();
  assert_eq!(hits.total, 2);

  let by_range = FactFilter {
    ranges: vec![NumericRange { field: "total_votes".into(), min: Some(50.0), max: Some(400.0) }],
    ..Default::default()
  };
  let hits = pipeline::list_facts(&s, FactKind::BoothVotes, by_range, everything())
    .await
    .unwrap();
  assert_eq!(hits.total, 2);
  assert!(hits.data.iter().all(|v| v.value.to_json().unwrap()["total_votes"] != 0));

  let by_text = FactFilter { text: Some("RAVI".into()), ..Default::default() };
  let hits = pipeline::list_facts(&s, FactKind::Candidate, by_text, everything())
    .await
    .unwrap();
  assert_eq!(hits.total, 1);
  assert_eq!(hits.data[0].id, c2.id);

  let undeclared = FactFilter {
    ranges: vec![NumericRange { field: "name".into(), min: Some(1.0), max: None }],
    ..Default::default()
  };
  let err = pipeline::list_facts(&s, FactKind::Candidate, undeclared, everything())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "name"));
}

#[tokio::test]
async fn event_dates_filter_and_order() {
  let s = store().await;
  let c = chain(&s, "e").await;
  let event = |name: &str, start: &str, end: &str| {
    json!({
      "name": name,
      "type": "campaign",
      "start_date": start,
      "end_date": end,
      "location": "Chowk",
      "state_id": c.state.id,
      "division_id": c.division.id,
      "parliament_id": c.parliament.id,
      "assembly_id": c.assembly.id,
      "block_id": c.block.id,
      "booth_id": c.booth.id,
    })
  };
  create(&s, FactKind::Event, event("Padyatra", "2024-03-01", "2024-03-04")).await.unwrap();
  create(&s, FactKind::Event, event("Sabha", "2024-04-10", "2024-04-10")).await.unwrap();
  let err = create(&s, FactKind::Event, event("Backwards", "2024-05-02", "2024-05-01"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "end_date"));

  let april = FactFilter {
    dates: vec![DateRange {
      field: "start_date".into(),
      from:  "2024-04-01".parse().ok(),
      to:    None,
    }],
    ..Default::default()
  };
  let hits = pipeline::list_facts(&s, FactKind::Event, april, everything()).await.unwrap();
  assert_eq!(hits.total, 1);
}

// ─── Roll-up ─────────────────────────────────────────────────────────────────

/// Two divisions: one fully populated with a branching parliament, one with
/// no children at all.
async fn rollup_fixture(s: &SqliteStore) -> (Chain, Node, Node) {
  let c = chain(s, "r").await;
  // A second assembly with nothing below it.
  let bare_assembly = node(s, Level::Assembly, "bare ac", Some(&c.parliament)).await;
  node(s, Level::Booth, "r booth 2", Some(&c.block)).await;
  let empty_division = node(s, Level::Division, "empty division", Some(&c.state)).await;
  (c, bare_assembly, empty_division)
}

#[tokio::test]
async fn rollup_keeps_empty_branches() {
  let s = store().await;
  let (c, bare, empty) = rollup_fixture(&s).await;

  let all = rollup::rollup(&s, RollupFilter::default(), everything()).await.unwrap();
  assert_eq!(all.total, 4);
  assert_eq!(all.count, 4);

  let ids: Vec<_> = all
    .data
    .iter()
    .map(|r| (r.division.id, r.assembly.as_ref().map(|a| a.id), r.booth.as_ref().map(|b| b.id)))
    .collect();
  // Nesting order: the populated assembly's booths first, then the bare
  // assembly, then the empty division.
  assert_eq!(ids[0], (c.division.id, Some(c.assembly.id), Some(c.booth.id)));
  assert_eq!(ids[2], (c.division.id, Some(bare.id), None));
  assert_eq!(ids[3], (empty.id, None, None));

  let empty_row = &all.data[3];
  assert!(empty_row.parliament.is_none());
  assert!(empty_row.block.is_none());
  assert_eq!(all.data[0].assembly.as_ref().unwrap().category, Some(Default::default()));
}

#[tokio::test]
async fn rollup_filter_matches_client_side_filter() {
  let s = store().await;
  let (c, bare, _) = rollup_fixture(&s).await;
  let all = rollup::rollup(&s, RollupFilter::default(), everything()).await.unwrap();

  for assembly in [c.assembly.id, bare.id, Uuid::new_v4()] {
    let pinned = rollup::rollup(&s, RollupFilter::pin(Level::Assembly, assembly), everything())
      .await
      .unwrap();
    let expected: Vec<_> = all
      .data
      .iter()
      .filter(|r| r.assembly.as_ref().map(|a| a.id) == Some(assembly))
      .cloned()
      .collect();
    assert_eq!(pinned.data, expected);
    assert_eq!(pinned.total, expected.len() as u64);
  }

  let by_state = rollup::rollup(&s, RollupFilter::pin(Level::State, c.state.id), everything())
    .await
    .unwrap();
  assert_eq!(by_state.data, all.data);
}

#[tokio::test]
async fn rollup_from_matches_pinned_rollup() {
  let s = store().await;
  let (c, _, _) = rollup_fixture(&s).await;
  let raw = c.parliament.id.to_string();

  let from = rollup::rollup_from(&s, Level::Parliament, &raw, everything()).await.unwrap();
  let pinned = rollup::rollup(&s, RollupFilter::pin(Level::Parliament, c.parliament.id), everything())
    .await
    .unwrap();
  assert_eq!(from, pinned);
  assert_eq!(from.total, 3);
  assert!(from.data.iter().all(|r| r.parliament.as_ref().map(|p| p.id) == Some(c.parliament.id)));

  let from_booth = rollup::rollup_from(&s, Level::Booth, &c.booth.id.to_string(), everything())
    .await
    .unwrap();
  assert_eq!(from_booth.total, 1);
  assert_eq!(from_booth.data[0].division.id, c.division.id);
}

#[tokio::test]
async fn rollup_from_unknown_node() {
  let s = store().await;
  rollup_fixture(&s).await;

  let err = rollup::rollup_from(&s, Level::Division, "unknown-id", everything())
    .await
    .unwrap_err();
  match err {
    Error::NodeNotFound { level, id } => {
      assert_eq!(level, Level::Division);
      assert_eq!(id, "unknown-id");
    }
    other => panic!("expected NodeNotFound, got {other:?}"),
  }

  let missing = Uuid::new_v4().to_string();
  let err = rollup::rollup_from(&s, Level::Division, &missing, everything())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NodeNotFound { .. }));
}

#[tokio::test]
async fn rollup_pages_over_flattened_rows() {
  let s = store().await;
  rollup_fixture(&s).await;
  let all = rollup::rollup(&s, RollupFilter::default(), everything()).await.unwrap();

  let second = rollup::rollup(&s, RollupFilter::default(), page(2, 3)).await.unwrap();
  assert_eq!(second.total, 4);
  assert_eq!(second.pages, 2);
  assert_eq!(second.count, 1);
  assert_eq!(second.data[0], all.data[3]);
}

#[tokio::test]
async fn pages_past_the_end_are_empty_or_rejected() {
  let s = store().await;
  rollup_fixture(&s).await;

  let far = PageRequest::new(i64::MAX as u64 + 1, 1, 100).unwrap();
  let rows = rollup::rollup(&s, RollupFilter::default(), far).await.unwrap();
  assert_eq!(rows.total, 4);
  assert_eq!(rows.count, 0);
  let booths = nodes::list_nodes(&s, Level::Booth, NodeFilter::default(), far).await.unwrap();
  assert_eq!(booths.count, 0);

  let err = PageRequest::new(100_000_000_000_000_000, 100, 100).unwrap_err();
  assert!(matches!(err, Error::Validation { ref field, .. } if field == "page"));
}
