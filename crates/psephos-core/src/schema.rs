//! Per-kind declarations consumed by the write pipeline and the listing
//! layer: which fields are foreign keys, which tuples are natural keys, which
//! fields are searchable, and which references are frozen after create.
//!
//! The pipeline never branches on kind itself. Everything kind-specific is
//! answered here (and in [`crate::rules`]).

use uuid::Uuid;

use crate::{
  fact::{FactKind, FactValue},
  hierarchy::{Level, Node},
};

// ─── Reference targets ───────────────────────────────────────────────────────

/// The store an id field points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
  Node(Level),
  Fact(FactKind),
}

/// Map a foreign-key field name to its target. Field names are shared across
/// kinds, so one table serves them all.
pub fn target_of(field: &str) -> Option<Target> {
  let target = match field {
    "candidate_id" => Target::Fact(FactKind::Candidate),
    "party_id" | "winning_party_id" | "leading_party_id" | "party_vote_shares" => {
      Target::Fact(FactKind::Party)
    }
    "stat_id" => Target::Fact(FactKind::BoothElectionStats),
    "election_year_id" => Target::Fact(FactKind::ElectionYear),
    "committee_id" => Target::Fact(FactKind::Committee),
    other => {
      return Level::ALL
        .into_iter()
        .find(|l| l.id_field() == other)
        .map(Target::Node);
    }
  };
  Some(target)
}

/// A single foreign key present on a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
  pub field:  &'static str,
  pub target: Target,
  pub id:     Uuid,
}

/// A list-valued foreign key whose ids must all exist at `level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRef {
  pub field: &'static str,
  pub level: Level,
  pub ids:   Vec<Uuid>,
}

/// One natural key of a value, flattened to a comparable string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
  pub name:   &'static str,
  pub fields: Vec<&'static str>,
  pub value:  String,
}

impl UniqueKey {
  fn natural(fields: &[&'static str], ids: &[Uuid]) -> Self {
    Self::composite(fields, ids.iter().map(Uuid::to_string).collect())
  }

  fn composite(fields: &[&'static str], parts: Vec<String>) -> Self {
    Self {
      name:   "natural",
      fields: fields.to_vec(),
      value:  parts.join(":"),
    }
  }

  fn single(name: &'static str, value: String) -> Self {
    Self {
      name,
      fields: vec![name],
      value,
    }
  }
}

// ─── Kind-level tables ───────────────────────────────────────────────────────

const LOCAL_FIELDS: &[&str] =
  &["division_id", "parliament_id", "assembly_id", "block_id", "booth_id"];

impl FactKind {
  /// Fields holding ids of other records. These are the fields a listing may
  /// filter on by equality.
  pub fn reference_fields(self) -> &'static [&'static str] {
    match self {
      Self::Party | Self::ElectionYear => &[],
      Self::Candidate => &["party_id", "assembly_id", "election_year_id"],
      Self::BoothVotes => &["candidate_id", "booth_id", "election_year_id"],
      Self::BlockVotes => &["candidate_id", "block_id", "booth_id", "election_year_id"],
      Self::AssemblyVotes => {
        &["candidate_id", "assembly_id", "block_id", "booth_id", "election_year_id"]
      }
      Self::ParliamentVotes => &[
        "candidate_id",
        "parliament_id",
        "assembly_id",
        "block_id",
        "booth_id",
        "election_year_id",
      ],
      Self::BoothDemographics => &["booth_id", "block_id", "assembly_id", "parliament_id"],
      Self::BoothSurvey => &["booth_id"],
      Self::WorkStatus | Self::CasteList | Self::LocalIssue => LOCAL_FIELDS,
      Self::Event => &[
        "state_id",
        "division_id",
        "parliament_id",
        "assembly_id",
        "block_id",
        "booth_id",
      ],
      Self::AssemblyWinner => &["candidate_id", "assembly_id", "party_id", "election_year_id"],
      Self::ParliamentWinner => {
        &["candidate_id", "parliament_id", "party_id", "election_year_id"]
      }
      Self::Committee => &["region_ids"],
      Self::Incharge => &["committee_id"],
      Self::BoothElectionStats => &["booth_id", "election_year_id", "winning_party_id"],
      Self::BoothPartyVoteShare => &["stat_id", "party_id"],
      Self::BoothPartyPresence | Self::ActiveParty => &["booth_id", "party_id"],
      Self::BoothInfrastructure | Self::LocalDynamics => &["booth_id"],
      Self::VotingTrend => &[
        "booth_id",
        "division_id",
        "parliament_id",
        "assembly_id",
        "block_id",
        "leading_party_id",
        "party_vote_shares",
      ],
      Self::BoothVolunteer => {
        &["booth_id", "party_id", "block_id", "assembly_id", "parliament_id"]
      }
      Self::Visit => LOCAL_FIELDS,
      Self::Influencer => &[
        "state_id",
        "division_id",
        "parliament_id",
        "assembly_id",
        "block_id",
        "booth_id",
      ],
    }
  }

  /// Fields searched by the case-insensitive `q` filter.
  pub fn text_fields(self) -> &'static [&'static str] {
    match self {
      Self::Party => &["name", "abbreviation", "symbol"],
      Self::ElectionYear => &["election_type"],
      Self::Candidate => &["name", "caste", "education"],
      Self::BoothSurvey => &["status", "remark"],
      Self::WorkStatus => &["work_name", "department", "status", "falia"],
      Self::Event => &["name", "type", "status", "location"],
      Self::CasteList => &["category", "caste"],
      Self::LocalIssue => &["issue_name", "department", "status", "priority"],
      Self::Committee => &["committee_name", "region_type"],
      Self::Incharge => &["name", "phone", "email", "designation", "role"],
      Self::BoothElectionStats => &["winning_candidate"],
      Self::BoothPartyPresence => &["local_unit_head_name", "head_phone"],
      Self::BoothInfrastructure => &["premises_type", "categorization", "accessibility_issues"],
      Self::LocalDynamics => &["dominant_caste", "known_issues", "local_leader", "grassroots_orgs"],
      Self::BoothVolunteer => {
        &["name", "role", "phone", "email", "area_responsibility", "activity_level"]
      }
      Self::Visit => &["person_name", "post", "declaration", "remark"],
      Self::Influencer => &["name", "contact_number", "email", "full_address"],
      Self::BoothPartyVoteShare | Self::ActiveParty | Self::VotingTrend => &[],
      Self::BoothVotes
      | Self::BlockVotes
      | Self::AssemblyVotes
      | Self::ParliamentVotes
      | Self::BoothDemographics
      | Self::AssemblyWinner
      | Self::ParliamentWinner => &[],
    }
  }

  /// Fields accepting `<field>_min` / `<field>_max` range filters.
  pub fn numeric_fields(self) -> &'static [&'static str] {
    match self {
      Self::Party => &["founded_year"],
      Self::ElectionYear => &["year"],
      Self::Candidate => &["votes", "criminal_cases"],
      Self::BoothVotes | Self::BlockVotes | Self::AssemblyVotes | Self::ParliamentVotes => {
        &["total_votes"]
      }
      Self::BoothDemographics => &[
        "total_population",
        "total_electors",
        "male_electors",
        "female_electors",
        "literacy_rate",
      ],
      Self::WorkStatus => &["approved_fund", "total_budget"],
      Self::AssemblyWinner | Self::ParliamentWinner => &["votes", "margin"],
      Self::BoothElectionStats => &[
        "total_votes_polled",
        "turnout_percentage",
        "male_turnout",
        "female_turnout",
        "nota_votes",
        "rejected_votes",
      ],
      Self::BoothPartyVoteShare => &["votes", "vote_percent"],
      Self::BoothPartyPresence => &["registered_members"],
      Self::VotingTrend => &["election_year", "turnout_percent", "victory_margin"],
      Self::BoothSurvey
      | Self::Event
      | Self::CasteList
      | Self::LocalIssue
      | Self::Committee
      | Self::Incharge
      | Self::ActiveParty
      | Self::BoothInfrastructure
      | Self::LocalDynamics
      | Self::BoothVolunteer
      | Self::Visit
      | Self::Influencer => &[],
    }
  }

  /// Fields accepting `<field>_from` / `<field>_to` date filters.
  pub fn date_fields(self) -> &'static [&'static str] {
    match self {
      Self::BoothSurvey => &["survey_date"],
      Self::Event => &["start_date", "end_date"],
      Self::Visit => &["date"],
      _ => &[],
    }
  }

  /// References that may not change once the record exists.
  pub fn frozen_fields(self) -> &'static [&'static str] {
    match self {
      Self::AssemblyWinner | Self::ParliamentWinner => self.reference_fields(),
      _ => &[],
    }
  }
}

// ─── Value-level accessors ───────────────────────────────────────────────────

impl FactValue {
  /// Every singular id field with its value, absent optionals included.
  fn id_values(&self) -> Vec<(&'static str, Option<Uuid>)> {
    use FactValue as V;
    match self {
      V::Party(_) | V::ElectionYear(_) | V::Committee(_) => vec![],
      V::Candidate(v) => vec![
        ("party_id", Some(v.party_id)),
        ("assembly_id", Some(v.assembly_id)),
        ("election_year_id", Some(v.election_year_id)),
      ],
      V::BoothVotes(v) => vec![
        ("candidate_id", Some(v.candidate_id)),
        ("booth_id", Some(v.booth_id)),
        ("election_year_id", Some(v.election_year_id)),
      ],
      V::BlockVotes(v) => vec![
        ("candidate_id", Some(v.candidate_id)),
        ("block_id", Some(v.block_id)),
        ("booth_id", Some(v.booth_id)),
        ("election_year_id", Some(v.election_year_id)),
      ],
      V::AssemblyVotes(v) => vec![
        ("candidate_id", Some(v.candidate_id)),
        ("assembly_id", Some(v.assembly_id)),
        ("block_id", Some(v.block_id)),
        ("booth_id", Some(v.booth_id)),
        ("election_year_id", Some(v.election_year_id)),
      ],
      V::ParliamentVotes(v) => vec![
        ("candidate_id", Some(v.candidate_id)),
        ("parliament_id", Some(v.parliament_id)),
        ("assembly_id", Some(v.assembly_id)),
        ("block_id", Some(v.block_id)),
        ("booth_id", Some(v.booth_id)),
        ("election_year_id", Some(v.election_year_id)),
      ],
      V::BoothDemographics(v) => vec![
        ("booth_id", Some(v.booth_id)),
        ("block_id", v.block_id),
        ("assembly_id", v.assembly_id),
        ("parliament_id", v.parliament_id),
      ],
      V::BoothSurvey(v) => vec![("booth_id", Some(v.booth_id))],
      V::WorkStatus(v) => local(
        v.division_id,
        v.parliament_id,
        v.assembly_id,
        v.block_id,
        v.booth_id,
      ),
      V::Event(v) => {
        let mut ids = vec![("state_id", Some(v.state_id))];
        ids.extend(local(
          v.division_id,
          v.parliament_id,
          v.assembly_id,
          v.block_id,
          v.booth_id,
        ));
        ids
      }
      V::CasteList(v) => local(
        v.division_id,
        v.parliament_id,
        v.assembly_id,
        v.block_id,
        v.booth_id,
      ),
      V::LocalIssue(v) => local(
        v.division_id,
        v.parliament_id,
        v.assembly_id,
        v.block_id,
        v.booth_id,
      ),
      V::AssemblyWinner(v) => vec![
        ("candidate_id", Some(v.candidate_id)),
        ("assembly_id", Some(v.assembly_id)),
        ("party_id", Some(v.party_id)),
        ("election_year_id", Some(v.election_year_id)),
      ],
      V::ParliamentWinner(v) => vec![
        ("candidate_id", Some(v.candidate_id)),
        ("parliament_id", Some(v.parliament_id)),
        ("party_id", Some(v.party_id)),
        ("election_year_id", Some(v.election_year_id)),
      ],
      V::Incharge(v) => vec![("committee_id", Some(v.committee_id))],
      V::BoothElectionStats(v) => vec![
        ("booth_id", Some(v.booth_id)),
        ("election_year_id", Some(v.election_year_id)),
        ("winning_party_id", v.winning_party_id),
      ],
      V::BoothPartyVoteShare(v) => {
        vec![("stat_id", Some(v.stat_id)), ("party_id", Some(v.party_id))]
      }
      V::BoothPartyPresence(v) => {
        vec![("booth_id", Some(v.booth_id)), ("party_id", Some(v.party_id))]
      }
      V::ActiveParty(v) => vec![("booth_id", Some(v.booth_id)), ("party_id", Some(v.party_id))],
      V::BoothInfrastructure(v) => vec![("booth_id", Some(v.booth_id))],
      V::LocalDynamics(v) => vec![("booth_id", Some(v.booth_id))],
      V::VotingTrend(v) => {
        let mut ids = vec![
          ("booth_id", Some(v.booth_id)),
          ("division_id", v.division_id),
          ("parliament_id", v.parliament_id),
          ("assembly_id", v.assembly_id),
          ("block_id", v.block_id),
          ("leading_party_id", v.leading_party_id),
        ];
        ids.extend(v.party_vote_shares.iter().map(|s| ("party_vote_shares", Some(s.party_id))));
        ids
      }
      V::BoothVolunteer(v) => vec![
        ("booth_id", Some(v.booth_id)),
        ("party_id", Some(v.party_id)),
        ("block_id", v.block_id),
        ("assembly_id", v.assembly_id),
        ("parliament_id", v.parliament_id),
      ],
      V::Visit(v) => local(
        v.division_id,
        v.parliament_id,
        v.assembly_id,
        v.block_id,
        v.booth_id,
      ),
      V::Influencer(v) => {
        let mut ids = vec![("state_id", Some(v.state_id))];
        ids.extend(local(
          v.division_id,
          v.parliament_id,
          v.assembly_id,
          v.block_id,
          v.booth_id,
        ));
        ids
      }
    }
  }

  /// The singular foreign keys present on this value.
  pub fn references(&self) -> Vec<FieldRef> {
    self
      .id_values()
      .into_iter()
      .filter_map(|(field, id)| {
        Some(FieldRef {
          field,
          target: target_of(field)?,
          id: id?,
        })
      })
      .collect()
  }

  /// List-valued references that must be verified as a whole.
  pub fn bulk_references(&self) -> Vec<BulkRef> {
    match self {
      Self::Committee(v) => vec![BulkRef {
        field: "region_ids",
        level: v.region_type.level(),
        ids:   v.region_ids.clone(),
      }],
      _ => vec![],
    }
  }

  /// The hierarchy references among [`Self::references`].
  pub fn hierarchy_refs(&self) -> Vec<(&'static str, Level, Uuid)> {
    self
      .references()
      .into_iter()
      .filter_map(|r| match r.target {
        Target::Node(level) => Some((r.field, level, r.id)),
        Target::Fact(_) => None,
      })
      .collect()
  }

  /// Every outgoing link, bulk ids included. Backends index these so that
  /// deletes can be restricted.
  pub fn links(&self) -> Vec<(&'static str, Uuid)> {
    let mut links: Vec<_> = self.references().into_iter().map(|r| (r.field, r.id)).collect();
    for bulk in self.bulk_references() {
      links.extend(bulk.ids.into_iter().map(|id| (bulk.field, id)));
    }
    links
  }

  /// The natural keys of this value. Kinds without one return nothing.
  pub fn unique_keys(&self) -> Vec<UniqueKey> {
    use FactValue as V;
    match self {
      V::Party(v) => vec![UniqueKey::single("name", v.name.trim().to_lowercase())],
      V::ElectionYear(v) => vec![UniqueKey::single("year", v.year.to_string())],
      V::Candidate(v) => vec![UniqueKey::natural(
        &["assembly_id", "party_id", "election_year_id"],
        &[v.assembly_id, v.party_id, v.election_year_id],
      )],
      V::BoothVotes(v) => vec![UniqueKey::natural(
        &["candidate_id", "booth_id", "election_year_id"],
        &[v.candidate_id, v.booth_id, v.election_year_id],
      )],
      V::BlockVotes(v) => vec![UniqueKey::natural(
        &["candidate_id", "booth_id", "block_id", "election_year_id"],
        &[v.candidate_id, v.booth_id, v.block_id, v.election_year_id],
      )],
      V::AssemblyVotes(v) => vec![UniqueKey::natural(
        &["candidate_id", "assembly_id", "block_id", "booth_id", "election_year_id"],
        &[v.candidate_id, v.assembly_id, v.block_id, v.booth_id, v.election_year_id],
      )],
      V::ParliamentVotes(v) => vec![UniqueKey::natural(
        &[
          "candidate_id",
          "parliament_id",
          "assembly_id",
          "block_id",
          "booth_id",
          "election_year_id",
        ],
        &[
          v.candidate_id,
          v.parliament_id,
          v.assembly_id,
          v.block_id,
          v.booth_id,
          v.election_year_id,
        ],
      )],
      V::BoothDemographics(v) => vec![UniqueKey::natural(&["booth_id"], &[v.booth_id])],
      V::AssemblyWinner(v) => vec![UniqueKey::natural(
        &["assembly_id", "election_year_id"],
        &[v.assembly_id, v.election_year_id],
      )],
      V::ParliamentWinner(v) => vec![UniqueKey::natural(
        &["parliament_id", "election_year_id"],
        &[v.parliament_id, v.election_year_id],
      )],
      V::Incharge(v) => {
        let mut keys = vec![UniqueKey::single("phone", v.phone.clone())];
        // Sparse: only present emails take part.
        if let Some(email) = &v.email {
          keys.push(UniqueKey::single("email", email.clone()));
        }
        keys
      }
      V::BoothElectionStats(v) => vec![UniqueKey::natural(
        &["booth_id", "election_year_id"],
        &[v.booth_id, v.election_year_id],
      )],
      V::BoothPartyVoteShare(v) => {
        vec![UniqueKey::natural(&["stat_id", "party_id"], &[v.stat_id, v.party_id])]
      }
      V::BoothPartyPresence(v) => {
        vec![UniqueKey::natural(&["booth_id", "party_id"], &[v.booth_id, v.party_id])]
      }
      V::ActiveParty(v) => {
        vec![UniqueKey::natural(&["booth_id", "party_id"], &[v.booth_id, v.party_id])]
      }
      V::BoothInfrastructure(v) => vec![UniqueKey::natural(&["booth_id"], &[v.booth_id])],
      V::LocalDynamics(v) => vec![UniqueKey::natural(&["booth_id"], &[v.booth_id])],
      V::VotingTrend(v) => vec![UniqueKey::composite(
        &["booth_id", "election_year"],
        vec![v.booth_id.to_string(), v.election_year.to_string()],
      )],
      V::BoothSurvey(_)
      | V::WorkStatus(_)
      | V::Event(_)
      | V::CasteList(_)
      | V::LocalIssue(_)
      | V::Committee(_)
      | V::BoothVolunteer(_)
      | V::Visit(_)
      | V::Influencer(_) => vec![],
    }
  }

  /// Short display label used when this record is shown as a reference.
  pub fn label(&self) -> String {
    match self {
      Self::Party(v) => format!("{} ({})", v.name, v.abbreviation),
      Self::ElectionYear(v) => format!("{} {:?}", v.year, v.election_type),
      Self::Candidate(v) => v.name.clone(),
      Self::Committee(v) => v
        .committee_name
        .clone()
        .unwrap_or_else(|| format!("{:?} committee", v.region_type)),
      Self::Incharge(v) => v.name.clone(),
      Self::BoothVolunteer(v) => v.name.clone(),
      Self::Influencer(v) => v.name.clone(),
      Self::Visit(v) => format!("{} ({})", v.person_name, v.date),
      other => other.kind().to_string(),
    }
  }

  /// Canonicalise free-text input: trim strings, drop empty optionals,
  /// uppercase abbreviations, lowercase emails.
  pub fn normalize(&mut self) {
    use FactValue as V;
    match self {
      V::Party(v) => {
        trim(&mut v.name);
        v.abbreviation = v.abbreviation.trim().to_uppercase();
        trim_opt(&mut v.symbol);
      }
      V::Candidate(v) => {
        trim(&mut v.name);
        trim_opt(&mut v.assets);
        trim_opt(&mut v.liabilities);
        trim_opt(&mut v.education);
        trim_opt(&mut v.photo);
      }
      V::BoothSurvey(v) => trim_opt(&mut v.remark),
      V::WorkStatus(v) => {
        trim(&mut v.work_name);
        trim(&mut v.department);
        trim_opt(&mut v.falia);
        trim_opt(&mut v.description);
      }
      V::Event(v) => {
        trim(&mut v.name);
        trim(&mut v.location);
        trim_opt(&mut v.description);
      }
      V::CasteList(v) => trim(&mut v.caste),
      V::LocalIssue(v) => {
        trim(&mut v.issue_name);
        trim(&mut v.department);
        trim_opt(&mut v.description);
      }
      V::Committee(v) => trim_opt(&mut v.committee_name),
      V::Incharge(v) => {
        trim(&mut v.name);
        trim(&mut v.phone);
        trim(&mut v.designation);
        lower_email(&mut v.email);
      }
      V::BoothElectionStats(v) => trim_opt(&mut v.winning_candidate),
      V::BoothPartyPresence(v) => {
        trim_opt(&mut v.local_unit_head_name);
        trim_opt(&mut v.head_phone);
      }
      V::BoothInfrastructure(v) => trim_opt(&mut v.accessibility_issues),
      V::LocalDynamics(v) => {
        trim_opt(&mut v.dominant_caste);
        trim_opt(&mut v.known_issues);
        trim_opt(&mut v.local_leader);
        trim_opt(&mut v.grassroots_orgs);
      }
      V::BoothVolunteer(v) => {
        trim(&mut v.name);
        trim(&mut v.phone);
        trim_opt(&mut v.role);
        trim_opt(&mut v.area_responsibility);
        trim_opt(&mut v.remarks);
        lower_email(&mut v.email);
      }
      V::Visit(v) => {
        trim(&mut v.person_name);
        trim(&mut v.post);
        trim_opt(&mut v.declaration);
        trim_opt(&mut v.remark);
      }
      V::Influencer(v) => {
        trim(&mut v.name);
        trim(&mut v.contact_number);
        trim(&mut v.full_address);
        trim_opt(&mut v.alternate_number);
        lower_email(&mut v.email);
      }
      V::ElectionYear(_)
      | V::BoothPartyVoteShare(_)
      | V::ActiveParty(_)
      | V::VotingTrend(_)
      | V::BoothVotes(_)
      | V::BlockVotes(_)
      | V::AssemblyVotes(_)
      | V::ParliamentVotes(_)
      | V::BoothDemographics(_)
      | V::AssemblyWinner(_)
      | V::ParliamentWinner(_) => {}
    }
  }

  /// Fill fields that default to the calling user.
  pub fn apply_caller_defaults(&mut self, caller: Uuid) {
    if let Self::BoothSurvey(v) = self {
      v.survey_done_by.get_or_insert(caller);
    }
  }

  /// Carry state over from the stored version of this record on update.
  pub fn carry_from(&mut self, previous: &FactValue) {
    if let (Self::ActiveParty(v), Self::ActiveParty(old)) = (self, previous) {
      v.last_active = if v.active != old.active { old.active } else { old.last_active };
    }
  }

  /// Derive ancestor ids from the record's booth. A present id is kept when
  /// `keep(field)` holds; everything else is overwritten. Returns the fields
  /// that were derived.
  pub fn fill_ancestry(&mut self, booth: &Node, keep: impl Fn(&str) -> bool) -> Vec<&'static str> {
    let slots: Vec<(&'static str, Level, &mut Option<Uuid>)> = match self {
      Self::BoothDemographics(v) => vec![
        ("block_id", Level::Block, &mut v.block_id),
        ("assembly_id", Level::Assembly, &mut v.assembly_id),
        ("parliament_id", Level::Parliament, &mut v.parliament_id),
      ],
      Self::VotingTrend(v) => vec![
        ("block_id", Level::Block, &mut v.block_id),
        ("assembly_id", Level::Assembly, &mut v.assembly_id),
        ("parliament_id", Level::Parliament, &mut v.parliament_id),
        ("division_id", Level::Division, &mut v.division_id),
      ],
      Self::BoothVolunteer(v) => vec![
        ("block_id", Level::Block, &mut v.block_id),
        ("assembly_id", Level::Assembly, &mut v.assembly_id),
        ("parliament_id", Level::Parliament, &mut v.parliament_id),
      ],
      _ => Vec::new(),
    };

    let mut filled = Vec::new();
    for (field, level, slot) in slots {
      if slot.is_none() || !keep(field) {
        *slot = booth.ancestry.get(level);
        filled.push(field);
      }
    }
    filled
  }

  /// The id a booth-anchored value hangs its ancestry off, if any.
  pub fn ancestry_source(&self) -> Option<Uuid> {
    match self {
      Self::BoothDemographics(v) => Some(v.booth_id),
      Self::VotingTrend(v) => Some(v.booth_id),
      Self::BoothVolunteer(v) => Some(v.booth_id),
      _ => None,
    }
  }
}

fn local(
  division: Uuid,
  parliament: Uuid,
  assembly: Uuid,
  block: Uuid,
  booth: Uuid,
) -> Vec<(&'static str, Option<Uuid>)> {
  LOCAL_FIELDS
    .iter()
    .copied()
    .zip([division, parliament, assembly, block, booth].map(Some))
    .collect()
}

fn trim(s: &mut String) {
  let trimmed = s.trim();
  if trimmed.len() != s.len() {
    *s = trimmed.to_owned();
  }
}

fn trim_opt(s: &mut Option<String>) {
  *s = s.take().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
}

fn lower_email(email: &mut Option<String>) {
  trim_opt(email);
  if let Some(email) = email {
    *email = email.to_lowercase();
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn sample(kind: FactKind) -> FactValue {
    let id = || Uuid::new_v4().to_string();
    let data = match kind {
      FactKind::Party => json!({ "name": "Janata", "abbreviation": "jp" }),
      FactKind::ElectionYear => json!({ "year": 2024, "election_type": "Assembly" }),
      FactKind::Candidate => json!({
        "name": "A", "party_id": id(), "assembly_id": id(), "election_year_id": id(),
      }),
      FactKind::BoothVotes => json!({
        "candidate_id": id(), "booth_id": id(), "election_year_id": id(), "total_votes": 1,
      }),
      FactKind::BlockVotes => json!({
        "candidate_id": id(), "block_id": id(), "booth_id": id(),
        "election_year_id": id(), "total_votes": 1,
      }),
      FactKind::AssemblyVotes => json!({
        "candidate_id": id(), "assembly_id": id(), "block_id": id(), "booth_id": id(),
        "election_year_id": id(), "total_votes": 1,
      }),
      FactKind::ParliamentVotes => json!({
        "candidate_id": id(), "parliament_id": id(), "assembly_id": id(), "block_id": id(),
        "booth_id": id(), "election_year_id": id(), "total_votes": 1,
      }),
      FactKind::BoothDemographics => json!({
        "booth_id": id(), "block_id": id(), "assembly_id": id(), "parliament_id": id(),
        "total_population": 10, "total_electors": 8, "male_electors": 4, "female_electors": 4,
      }),
      FactKind::BoothSurvey => json!({ "booth_id": id(), "survey_date": "2024-03-01" }),
      FactKind::WorkStatus => json!({
        "work_name": "Road", "department": "PWD", "approved_fund": 1.0, "total_budget": 2.0,
        "division_id": id(), "parliament_id": id(), "assembly_id": id(), "block_id": id(),
        "booth_id": id(),
      }),
      FactKind::Event => json!({
        "name": "Rally", "type": "campaign", "start_date": "2024-01-01",
        "end_date": "2024-01-02", "location": "Ground", "state_id": id(), "division_id": id(),
        "parliament_id": id(), "assembly_id": id(), "block_id": id(), "booth_id": id(),
      }),
      FactKind::CasteList => json!({
        "category": "OBC", "caste": "Kurmi", "division_id": id(), "parliament_id": id(),
        "assembly_id": id(), "block_id": id(), "booth_id": id(),
      }),
      FactKind::LocalIssue => json!({
        "issue_name": "Water", "department": "PHED", "division_id": id(),
        "parliament_id": id(), "assembly_id": id(), "block_id": id(), "booth_id": id(),
      }),
      FactKind::AssemblyWinner => json!({
        "candidate_id": id(), "assembly_id": id(), "party_id": id(),
        "election_year_id": id(), "votes": 1, "margin": 1,
      }),
      FactKind::ParliamentWinner => json!({
        "candidate_id": id(), "parliament_id": id(), "party_id": id(),
        "election_year_id": id(), "votes": 1, "margin": 1,
      }),
      FactKind::Committee => json!({ "region_type": "Block", "region_ids": [id()] }),
      FactKind::Incharge => json!({
        "committee_id": id(), "name": "B", "phone": "9876543210", "designation": "Lead",
      }),
      FactKind::BoothElectionStats => json!({
        "booth_id": id(), "election_year_id": id(), "winning_party_id": id(),
        "turnout_percentage": 61.5,
      }),
      FactKind::BoothPartyVoteShare => json!({
        "stat_id": id(), "party_id": id(), "votes": 210, "vote_percent": 38.0,
      }),
      FactKind::BoothPartyPresence => json!({ "booth_id": id(), "party_id": id() }),
      FactKind::ActiveParty => json!({ "booth_id": id(), "party_id": id() }),
      FactKind::BoothInfrastructure => json!({ "booth_id": id(), "premises_type": "School" }),
      FactKind::LocalDynamics => json!({ "booth_id": id(), "dominant_caste": "Bhil" }),
      FactKind::VotingTrend => json!({
        "booth_id": id(), "division_id": id(), "parliament_id": id(), "assembly_id": id(),
        "block_id": id(), "election_year": 2019, "leading_party_id": id(),
        "party_vote_shares": [{ "party_id": id(), "vote_share": 44.0 }],
      }),
      FactKind::BoothVolunteer => json!({
        "booth_id": id(), "party_id": id(), "block_id": id(), "assembly_id": id(),
        "parliament_id": id(), "name": "V", "phone": "9000000001",
      }),
      FactKind::Visit => json!({
        "person_name": "D. Rao", "post": "Observer", "date": "2024-02-11",
        "division_id": id(), "parliament_id": id(), "assembly_id": id(), "block_id": id(),
        "booth_id": id(),
      }),
      FactKind::Influencer => json!({
        "name": "I", "contact_number": "9000000002", "full_address": "Main road",
        "state_id": id(), "division_id": id(), "parliament_id": id(), "assembly_id": id(),
        "block_id": id(), "booth_id": id(),
      }),
    };
    FactValue::from_parts(kind, data).unwrap()
  }

  #[test]
  fn declared_reference_fields_match_values() {
    for kind in FactKind::ALL {
      let value = sample(kind);
      let mut present: Vec<_> = value.links().into_iter().map(|(f, _)| f).collect();
      present.dedup();
      assert_eq!(present, kind.reference_fields(), "{kind}");
    }
  }

  #[test]
  fn every_reference_field_has_a_target() {
    for kind in FactKind::ALL {
      for field in kind.reference_fields() {
        assert!(*field == "region_ids" || target_of(field).is_some(), "{field}");
      }
    }
  }

  #[test]
  fn booth_votes_key_covers_candidate_booth_and_year() {
    let keys = sample(FactKind::BoothVotes).unique_keys();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].fields, ["candidate_id", "booth_id", "election_year_id"]);
  }

  #[test]
  fn incharge_email_key_is_sparse() {
    let mut value = sample(FactKind::Incharge);
    assert_eq!(value.unique_keys().len(), 1);

    if let FactValue::Incharge(v) = &mut value {
      v.email = Some("  Lead@Example.org ".into());
    }
    value.normalize();
    let keys = value.unique_keys();
    assert_eq!(keys[1].name, "email");
    assert_eq!(keys[1].value, "lead@example.org");
  }

  #[test]
  fn normalize_uppercases_abbreviation() {
    let mut value = sample(FactKind::Party);
    value.normalize();
    let FactValue::Party(party) = value else { unreachable!() };
    assert_eq!(party.abbreviation, "JP");
  }

  #[test]
  fn voting_trend_key_is_booth_and_calendar_year() {
    let keys = sample(FactKind::VotingTrend).unique_keys();
    assert_eq!(keys[0].fields, ["booth_id", "election_year"]);
    assert!(keys[0].value.ends_with(":2019"));
  }

  #[test]
  fn active_party_remembers_previous_status() {
    let stored = sample(FactKind::ActiveParty);
    let mut next = stored.clone();
    if let FactValue::ActiveParty(v) = &mut next {
      v.active = false;
    }
    next.carry_from(&stored);
    let FactValue::ActiveParty(v) = &next else { unreachable!() };
    assert!(!v.active);
    assert!(v.last_active);

    // An update that leaves `active` alone keeps the stored history.
    let mut again = next.clone();
    if let FactValue::ActiveParty(v) = &mut again {
      v.last_active = false;
    }
    again.carry_from(&next);
    let FactValue::ActiveParty(v) = again else { unreachable!() };
    assert!(v.last_active);
  }

  #[test]
  fn survey_defaults_to_caller() {
    let caller = Uuid::new_v4();
    let mut value = sample(FactKind::BoothSurvey);
    value.apply_caller_defaults(caller);
    let FactValue::BoothSurvey(survey) = value else { unreachable!() };
    assert_eq!(survey.survey_done_by, Some(caller));
  }
}
