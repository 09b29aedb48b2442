//! Fact types: every record anchored to the hierarchy or referenced by one.
//!
//! A fact is a typed body ([`FactValue`]) plus audit stamps. The variant name
//! doubles as the `kind` discriminant stored by backends and used in URLs.
//! What a kind references, which tuples must be unique and which business
//! rules apply live in [`crate::schema`] and [`crate::rules`]; the write
//! pipeline itself is the same for every kind.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, audit::Audit, hierarchy::RegionType};

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
  Party,
  ElectionYear,
  Candidate,
  BoothVotes,
  BlockVotes,
  AssemblyVotes,
  ParliamentVotes,
  BoothDemographics,
  BoothSurvey,
  WorkStatus,
  Event,
  CasteList,
  LocalIssue,
  AssemblyWinner,
  ParliamentWinner,
  Committee,
  Incharge,
  BoothElectionStats,
  BoothPartyVoteShare,
  BoothPartyPresence,
  ActiveParty,
  BoothInfrastructure,
  LocalDynamics,
  VotingTrend,
  BoothVolunteer,
  Visit,
  Influencer,
}

impl FactKind {
  pub const ALL: [FactKind; 27] = [
    Self::Party,
    Self::ElectionYear,
    Self::Candidate,
    Self::BoothVotes,
    Self::BlockVotes,
    Self::AssemblyVotes,
    Self::ParliamentVotes,
    Self::BoothDemographics,
    Self::BoothSurvey,
    Self::WorkStatus,
    Self::Event,
    Self::CasteList,
    Self::LocalIssue,
    Self::AssemblyWinner,
    Self::ParliamentWinner,
    Self::Committee,
    Self::Incharge,
    Self::BoothElectionStats,
    Self::BoothPartyVoteShare,
    Self::BoothPartyPresence,
    Self::ActiveParty,
    Self::BoothInfrastructure,
    Self::LocalDynamics,
    Self::VotingTrend,
    Self::BoothVolunteer,
    Self::Visit,
    Self::Influencer,
  ];

  /// The discriminant string stored in the `kind` column.
  /// Must match the `rename_all = "snake_case"` serde tags.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Party => "party",
      Self::ElectionYear => "election_year",
      Self::Candidate => "candidate",
      Self::BoothVotes => "booth_votes",
      Self::BlockVotes => "block_votes",
      Self::AssemblyVotes => "assembly_votes",
      Self::ParliamentVotes => "parliament_votes",
      Self::BoothDemographics => "booth_demographics",
      Self::BoothSurvey => "booth_survey",
      Self::WorkStatus => "work_status",
      Self::Event => "event",
      Self::CasteList => "caste_list",
      Self::LocalIssue => "local_issue",
      Self::AssemblyWinner => "assembly_winner",
      Self::ParliamentWinner => "parliament_winner",
      Self::Committee => "committee",
      Self::Incharge => "incharge",
      Self::BoothElectionStats => "booth_election_stats",
      Self::BoothPartyVoteShare => "booth_party_vote_share",
      Self::BoothPartyPresence => "booth_party_presence",
      Self::ActiveParty => "active_party",
      Self::BoothInfrastructure => "booth_infrastructure",
      Self::LocalDynamics => "local_dynamics",
      Self::VotingTrend => "voting_trend",
      Self::BoothVolunteer => "booth_volunteer",
      Self::Visit => "visit",
      Self::Influencer => "influencer",
    }
  }
}

impl fmt::Display for FactKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FactKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let wanted = s.trim().replace('-', "_");
    Self::ALL
      .into_iter()
      .find(|k| k.as_str() == wanted)
      .ok_or_else(|| Error::validation("kind", format!("unknown fact kind {s:?}")))
  }
}

// ─── Shared enums ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionType {
  Assembly,
  Parliament,
}

/// Social category used by candidate rosters and caste lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasteCategory {
  #[default]
  General,
  #[serde(rename = "OBC")]
  Obc,
  #[serde(rename = "SC")]
  Sc,
  #[serde(rename = "ST")]
  St,
  Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurveyStatus {
  #[default]
  Pending,
  #[serde(rename = "In Progress")]
  InProgress,
  Completed,
  Verified,
  Rejected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkState {
  #[default]
  Pending,
  #[serde(rename = "In Progress")]
  InProgress,
  Completed,
  Halted,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
  Event,
  Campaign,
  Activity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
  Done,
  #[default]
  Incomplete,
  Cancelled,
  Postponed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueStatus {
  #[default]
  Reported,
  #[serde(rename = "In Progress")]
  InProgress,
  Resolved,
  Rejected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High,
  Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InchargeRole {
  Incharge,
  Coordinator,
  #[default]
  Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PremisesType {
  School,
  #[serde(rename = "Community Hall")]
  CommunityHall,
  #[serde(rename = "Government Building")]
  GovernmentBuilding,
  Other,
}

/// Security classification of a polling station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoothCategory {
  #[default]
  Normal,
  Sensitive,
  #[serde(rename = "Hyper-sensitive")]
  HyperSensitive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
  High,
  #[default]
  Medium,
  Low,
}

fn yes() -> bool { true }

// ─── Reference data ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartyValue {
  pub name:         String,
  pub abbreviation: String,
  pub symbol:       Option<String>,
  pub founded_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElectionYearValue {
  pub year:          i32,
  pub election_type: ElectionType,
}

/// A party's candidate for one assembly constituency in one election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateValue {
  pub name:             String,
  pub party_id:         Uuid,
  pub assembly_id:      Uuid,
  pub election_year_id: Uuid,
  #[serde(default)]
  pub caste:            CasteCategory,
  #[serde(default)]
  pub votes:            i64,
  #[serde(default)]
  pub criminal_cases:   i64,
  pub assets:           Option<String>,
  pub liabilities:      Option<String>,
  pub education:        Option<String>,
  pub photo:            Option<String>,
  #[serde(default = "yes")]
  pub is_active:        bool,
}

// ─── Vote tallies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoothVotesValue {
  pub candidate_id:     Uuid,
  pub booth_id:         Uuid,
  pub election_year_id: Uuid,
  pub total_votes:      i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockVotesValue {
  pub candidate_id:     Uuid,
  pub block_id:         Uuid,
  pub booth_id:         Uuid,
  pub election_year_id: Uuid,
  pub total_votes:      i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyVotesValue {
  pub candidate_id:     Uuid,
  pub assembly_id:      Uuid,
  pub block_id:         Uuid,
  pub booth_id:         Uuid,
  pub election_year_id: Uuid,
  pub total_votes:      i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParliamentVotesValue {
  pub candidate_id:     Uuid,
  pub parliament_id:    Uuid,
  pub assembly_id:      Uuid,
  pub block_id:         Uuid,
  pub booth_id:         Uuid,
  pub election_year_id: Uuid,
  pub total_votes:      i64,
}

// ─── Booth-level records ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgeGroups {
  #[serde(default)]
  pub age_18_25:     i64,
  #[serde(default)]
  pub age_26_40:     i64,
  #[serde(default)]
  pub age_41_60:     i64,
  #[serde(default)]
  pub age_60_above:  i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CastePopulation {
  #[serde(default)]
  pub sc:      i64,
  #[serde(default)]
  pub st:      i64,
  #[serde(default)]
  pub obc:     i64,
  #[serde(default)]
  pub general: i64,
  #[serde(default)]
  pub other:   i64,
}

/// Electoral demographics of one booth. The block, assembly and parliament
/// ids are filled from the booth's ancestry when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoothDemographicsValue {
  pub booth_id:              Uuid,
  pub block_id:              Option<Uuid>,
  pub assembly_id:           Option<Uuid>,
  pub parliament_id:         Option<Uuid>,
  pub total_population:      i64,
  pub total_electors:        i64,
  pub male_electors:         i64,
  pub female_electors:       i64,
  #[serde(default)]
  pub other_electors:        i64,
  #[serde(default)]
  pub age_groups:            AgeGroups,
  #[serde(default)]
  pub caste_population:      CastePopulation,
  pub literacy_rate:         Option<f64>,
  #[serde(default)]
  pub religious_composition: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoothSurveyValue {
  pub booth_id:       Uuid,
  /// Opaque user id of the surveyor; defaults to the caller.
  pub survey_done_by: Option<Uuid>,
  pub survey_date:    NaiveDate,
  #[serde(default)]
  pub status:         SurveyStatus,
  pub remark:         Option<String>,
}

// ─── Local works, events, issues ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkStatusValue {
  pub work_name:     String,
  pub department:    String,
  #[serde(default)]
  pub status:        WorkState,
  pub approved_fund: f64,
  pub total_budget:  f64,
  pub falia:         Option<String>,
  pub description:   Option<String>,
  pub division_id:   Uuid,
  pub parliament_id: Uuid,
  pub assembly_id:   Uuid,
  pub block_id:      Uuid,
  pub booth_id:      Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventValue {
  pub name:          String,
  #[serde(rename = "type")]
  pub event_type:    EventType,
  #[serde(default)]
  pub status:        EventStatus,
  pub description:   Option<String>,
  pub start_date:    NaiveDate,
  pub end_date:      NaiveDate,
  pub location:      String,
  pub state_id:      Uuid,
  pub division_id:   Uuid,
  pub parliament_id: Uuid,
  pub assembly_id:   Uuid,
  pub block_id:      Uuid,
  pub booth_id:      Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CasteListValue {
  pub category:      CasteCategory,
  pub caste:         String,
  pub division_id:   Uuid,
  pub parliament_id: Uuid,
  pub assembly_id:   Uuid,
  pub block_id:      Uuid,
  pub booth_id:      Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalIssueValue {
  pub issue_name:    String,
  pub department:    String,
  pub description:   Option<String>,
  #[serde(default)]
  pub status:        IssueStatus,
  #[serde(default)]
  pub priority:      Priority,
  pub division_id:   Uuid,
  pub parliament_id: Uuid,
  pub assembly_id:   Uuid,
  pub block_id:      Uuid,
  pub booth_id:      Uuid,
}

// ─── Winners ─────────────────────────────────────────────────────────────────

/// Denormalised winner of an assembly seat, maintained by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyWinnerValue {
  pub candidate_id:     Uuid,
  pub assembly_id:      Uuid,
  pub party_id:         Uuid,
  pub election_year_id: Uuid,
  pub votes:            i64,
  pub margin:           i64,
}

/// Denormalised winner of a parliament seat, maintained by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParliamentWinnerValue {
  pub candidate_id:     Uuid,
  pub parliament_id:    Uuid,
  pub party_id:         Uuid,
  pub election_year_id: Uuid,
  pub votes:            i64,
  pub margin:           i64,
}

// ─── Committees ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitteeValue {
  pub region_type:    RegionType,
  pub region_ids:     Vec<Uuid>,
  pub committee_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InchargeValue {
  pub committee_id: Uuid,
  pub name:         String,
  pub phone:        String,
  pub email:        Option<String>,
  pub designation:  String,
  #[serde(default)]
  pub role:         InchargeRole,
  #[serde(default = "yes")]
  pub is_active:    bool,
}

// ─── Booth results and party presence ────────────────────────────────────────

/// Polling figures for one booth in one election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoothElectionStatsValue {
  pub booth_id:           Uuid,
  pub election_year_id:   Uuid,
  pub total_votes_polled: Option<i64>,
  pub turnout_percentage: Option<f64>,
  pub male_turnout:       Option<f64>,
  pub female_turnout:     Option<f64>,
  pub nota_votes:         Option<i64>,
  pub rejected_votes:     Option<i64>,
  pub winning_candidate:  Option<String>,
  pub winning_party_id:   Option<Uuid>,
}

/// One party's share of a [`BoothElectionStatsValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoothPartyVoteShareValue {
  pub stat_id:      Uuid,
  pub party_id:     Uuid,
  pub votes:        i64,
  pub vote_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoothPartyPresenceValue {
  pub booth_id:             Uuid,
  pub party_id:             Uuid,
  pub local_unit_head_name: Option<String>,
  pub head_phone:           Option<String>,
  pub registered_members:   Option<i64>,
  #[serde(default)]
  pub has_booth_committee:  bool,
}

/// Whether a party is working a booth. `last_active` holds the previous
/// `active` and is maintained on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivePartyValue {
  pub booth_id:    Uuid,
  pub party_id:    Uuid,
  #[serde(default = "yes")]
  pub active:      bool,
  #[serde(default = "yes")]
  pub last_active: bool,
}

// ─── Booth profile ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoothInfrastructureValue {
  pub booth_id:             Uuid,
  pub premises_type:        PremisesType,
  #[serde(default)]
  pub categorization:       BoothCategory,
  pub accessibility_issues: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalDynamicsValue {
  pub booth_id:        Uuid,
  pub dominant_caste:  Option<String>,
  pub known_issues:    Option<String>,
  pub local_leader:    Option<String>,
  pub grassroots_orgs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartyShare {
  pub party_id:   Uuid,
  pub vote_share: Option<f64>,
}

/// Historical result summary of a booth keyed by calendar year. The division,
/// parliament, assembly and block ids are filled from the booth's ancestry
/// when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VotingTrendValue {
  pub booth_id:          Uuid,
  pub division_id:       Option<Uuid>,
  pub parliament_id:     Option<Uuid>,
  pub assembly_id:       Option<Uuid>,
  pub block_id:          Option<Uuid>,
  pub election_year:     i32,
  pub turnout_percent:   Option<f64>,
  pub leading_party_id:  Option<Uuid>,
  pub victory_margin:    Option<i64>,
  #[serde(default)]
  pub party_vote_shares: Vec<PartyShare>,
}

// ─── Field workers and contacts ──────────────────────────────────────────────

/// A party volunteer at a booth. Block, assembly and parliament ids are
/// filled from the booth's ancestry when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoothVolunteerValue {
  pub booth_id:            Uuid,
  pub party_id:            Uuid,
  pub block_id:            Option<Uuid>,
  pub assembly_id:         Option<Uuid>,
  pub parliament_id:       Option<Uuid>,
  pub name:                String,
  pub role:                Option<String>,
  pub phone:               String,
  pub email:               Option<String>,
  pub area_responsibility: Option<String>,
  #[serde(default)]
  pub activity_level:      ActivityLevel,
  pub remarks:             Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisitValue {
  pub person_name:   String,
  pub post:          String,
  pub date:          NaiveDate,
  pub declaration:   Option<String>,
  pub remark:        Option<String>,
  pub division_id:   Uuid,
  pub parliament_id: Uuid,
  pub assembly_id:   Uuid,
  pub block_id:      Uuid,
  pub booth_id:      Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfluencerValue {
  pub name:             String,
  pub contact_number:   String,
  pub alternate_number: Option<String>,
  pub email:            Option<String>,
  pub full_address:     String,
  pub state_id:         Uuid,
  pub division_id:      Uuid,
  pub parliament_id:    Uuid,
  pub assembly_id:      Uuid,
  pub block_id:         Uuid,
  pub booth_id:         Uuid,
}

// ─── FactValue ───────────────────────────────────────────────────────────────

/// The typed body of a fact. The variant name serves as the `kind`
/// discriminant stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum FactValue {
  Party(PartyValue),
  ElectionYear(ElectionYearValue),
  Candidate(CandidateValue),
  BoothVotes(BoothVotesValue),
  BlockVotes(BlockVotesValue),
  AssemblyVotes(AssemblyVotesValue),
  ParliamentVotes(ParliamentVotesValue),
  BoothDemographics(BoothDemographicsValue),
  BoothSurvey(BoothSurveyValue),
  WorkStatus(WorkStatusValue),
  Event(EventValue),
  CasteList(CasteListValue),
  LocalIssue(LocalIssueValue),
  AssemblyWinner(AssemblyWinnerValue),
  ParliamentWinner(ParliamentWinnerValue),
  Committee(CommitteeValue),
  Incharge(InchargeValue),
  BoothElectionStats(BoothElectionStatsValue),
  BoothPartyVoteShare(BoothPartyVoteShareValue),
  BoothPartyPresence(BoothPartyPresenceValue),
  ActiveParty(ActivePartyValue),
  BoothInfrastructure(BoothInfrastructureValue),
  LocalDynamics(LocalDynamicsValue),
  VotingTrend(VotingTrendValue),
  BoothVolunteer(BoothVolunteerValue),
  Visit(VisitValue),
  Influencer(InfluencerValue),
}

impl FactValue {
  pub fn kind(&self) -> FactKind {
    match self {
      Self::Party(_) => FactKind::Party,
      Self::ElectionYear(_) => FactKind::ElectionYear,
      Self::Candidate(_) => FactKind::Candidate,
      Self::BoothVotes(_) => FactKind::BoothVotes,
      Self::BlockVotes(_) => FactKind::BlockVotes,
      Self::AssemblyVotes(_) => FactKind::AssemblyVotes,
      Self::ParliamentVotes(_) => FactKind::ParliamentVotes,
      Self::BoothDemographics(_) => FactKind::BoothDemographics,
      Self::BoothSurvey(_) => FactKind::BoothSurvey,
      Self::WorkStatus(_) => FactKind::WorkStatus,
      Self::Event(_) => FactKind::Event,
      Self::CasteList(_) => FactKind::CasteList,
      Self::LocalIssue(_) => FactKind::LocalIssue,
      Self::AssemblyWinner(_) => FactKind::AssemblyWinner,
      Self::ParliamentWinner(_) => FactKind::ParliamentWinner,
      Self::Committee(_) => FactKind::Committee,
      Self::Incharge(_) => FactKind::Incharge,
      Self::BoothElectionStats(_) => FactKind::BoothElectionStats,
      Self::BoothPartyVoteShare(_) => FactKind::BoothPartyVoteShare,
      Self::BoothPartyPresence(_) => FactKind::BoothPartyPresence,
      Self::ActiveParty(_) => FactKind::ActiveParty,
      Self::BoothInfrastructure(_) => FactKind::BoothInfrastructure,
      Self::LocalDynamics(_) => FactKind::LocalDynamics,
      Self::VotingTrend(_) => FactKind::VotingTrend,
      Self::BoothVolunteer(_) => FactKind::BoothVolunteer,
      Self::Visit(_) => FactKind::Visit,
      Self::Influencer(_) => FactKind::Influencer,
    }
  }

  /// Serialise the inner payload (without the kind tag) for the `body`
  /// database column.
  pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
    // The full serialised form is `{"kind": "...", "data": <payload>}`.
    // We want only the payload.
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Deserialise from a kind and its JSON payload.
  pub fn from_parts(kind: FactKind, data: serde_json::Value) -> serde_json::Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind.as_str(), "data": data });
    serde_json::from_value(wrapped)
  }
}

// ─── Fact ────────────────────────────────────────────────────────────────────

/// A persisted fact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
  pub fact_id: Uuid,
  pub value:   FactValue,
  pub audit:   Audit,
}

impl Fact {
  pub fn kind(&self) -> FactKind { self.value.kind() }
}
