//! Business rules applied after references resolve and before the
//! uniqueness guard runs.

use std::collections::HashSet;

use chrono::{Datelike as _, Utc};

use crate::{
  Error, Result,
  fact::{CandidateValue, FactValue},
  resolver::{Resolved, ResolvedRef},
};

fn non_negative(field: &str, value: i64) -> Result<()> {
  if value < 0 {
    return Err(Error::validation(field, "must not be negative"));
  }
  Ok(())
}

fn non_negative_amount(field: &str, value: f64) -> Result<()> {
  if !value.is_finite() || value < 0.0 {
    return Err(Error::validation(field, "must be a non-negative amount"));
  }
  Ok(())
}

fn non_negative_opt(field: &str, value: Option<i64>) -> Result<()> {
  value.map_or(Ok(()), |v| non_negative(field, v))
}

fn percent(field: &str, value: Option<f64>) -> Result<()> {
  match value {
    Some(v) if !(0.0..=100.0).contains(&v) => {
      Err(Error::validation(field, "must be between 0 and 100"))
    }
    _ => Ok(()),
  }
}

fn phone(field: &str, value: &str) -> Result<()> {
  if !is_phone(value) {
    return Err(Error::validation(field, "must be exactly 10 digits"));
  }
  Ok(())
}

fn email(field: &str, value: Option<&str>) -> Result<()> {
  match value {
    Some(v) if !is_email(v) => Err(Error::validation(field, "is not a valid address")),
    _ => Ok(()),
  }
}

fn length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
  let len = value.chars().count();
  if len < min || len > max {
    return Err(Error::validation(
      field,
      format!("must be between {min} and {max} characters"),
    ));
  }
  Ok(())
}

fn max_length(field: &str, value: Option<&str>, max: usize) -> Result<()> {
  match value {
    Some(v) => length(field, v, 0, max),
    None => Ok(()),
  }
}

fn is_phone(phone: &str) -> bool {
  phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit())
}

fn is_email(email: &str) -> bool {
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && !email.contains(char::is_whitespace)
    && domain
      .split_once('.')
      .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
}

fn is_photo_url(url: &str) -> bool {
  ["http://", "https://", "ftp://"]
    .iter()
    .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

/// The resolved candidate behind `field`, when it was resolved in this write.
fn resolved_candidate<'a>(resolved: &'a [ResolvedRef], field: &str) -> Option<&'a CandidateValue> {
  resolved.iter().find(|r| r.field == field).and_then(|r| match &r.entity {
    Resolved::Fact(fact) => match &fact.value {
      FactValue::Candidate(c) => Some(c),
      _ => None,
    },
    Resolved::Node(_) => None,
  })
}

impl FactValue {
  /// Check the kind-specific business rules. `resolved` holds the references
  /// resolved for this write; cross-record rules only fire for references
  /// present there.
  pub fn validate(&self, resolved: &[ResolvedRef]) -> Result<()> {
    match self {
      Self::Party(v) => {
        length("name", &v.name, 1, 100)?;
        length("abbreviation", &v.abbreviation, 1, 10)?;
      }
      Self::ElectionYear(v) => {
        if !(1900..=2100).contains(&v.year) {
          return Err(Error::validation("year", "must be between 1900 and 2100"));
        }
      }
      Self::Candidate(v) => {
        length("name", &v.name, 1, 100)?;
        non_negative("votes", v.votes)?;
        non_negative("criminal_cases", v.criminal_cases)?;
        if let Some(photo) = &v.photo
          && !is_photo_url(photo)
        {
          return Err(Error::validation("photo", "must be an http(s) or ftp URL"));
        }
      }
      Self::BoothVotes(v) => non_negative("total_votes", v.total_votes)?,
      Self::BlockVotes(v) => non_negative("total_votes", v.total_votes)?,
      Self::AssemblyVotes(v) => non_negative("total_votes", v.total_votes)?,
      Self::ParliamentVotes(v) => non_negative("total_votes", v.total_votes)?,
      Self::BoothDemographics(v) => {
        for (field, count) in [
          ("total_population", v.total_population),
          ("total_electors", v.total_electors),
          ("male_electors", v.male_electors),
          ("female_electors", v.female_electors),
          ("other_electors", v.other_electors),
          ("age_groups.age_18_25", v.age_groups.age_18_25),
          ("age_groups.age_26_40", v.age_groups.age_26_40),
          ("age_groups.age_41_60", v.age_groups.age_41_60),
          ("age_groups.age_60_above", v.age_groups.age_60_above),
          ("caste_population.sc", v.caste_population.sc),
          ("caste_population.st", v.caste_population.st),
          ("caste_population.obc", v.caste_population.obc),
          ("caste_population.general", v.caste_population.general),
          ("caste_population.other", v.caste_population.other),
        ] {
          non_negative(field, count)?;
        }
        for (religion, count) in &v.religious_composition {
          non_negative(&format!("religious_composition.{religion}"), *count)?;
        }
        if v.male_electors + v.female_electors + v.other_electors > v.total_electors {
          return Err(Error::validation(
            "total_electors",
            "is less than the sum of male, female and other electors",
          ));
        }
        if v.total_electors > v.total_population {
          return Err(Error::validation("total_electors", "exceeds total_population"));
        }
        if let Some(rate) = v.literacy_rate
          && !(0.0..=100.0).contains(&rate)
        {
          return Err(Error::validation("literacy_rate", "must be between 0 and 100"));
        }
      }
      Self::BoothSurvey(v) => max_length("remark", v.remark.as_deref(), 500)?,
      Self::WorkStatus(v) => {
        length("work_name", &v.work_name, 1, 200)?;
        length("department", &v.department, 1, 100)?;
        non_negative_amount("approved_fund", v.approved_fund)?;
        non_negative_amount("total_budget", v.total_budget)?;
        if v.approved_fund > v.total_budget {
          return Err(Error::validation("approved_fund", "exceeds total_budget"));
        }
      }
      Self::Event(v) => {
        length("name", &v.name, 1, 100)?;
        length("location", &v.location, 1, 200)?;
        if v.end_date < v.start_date {
          return Err(Error::validation("end_date", "is before start_date"));
        }
      }
      Self::CasteList(v) => length("caste", &v.caste, 1, 100)?,
      Self::LocalIssue(v) => {
        length("issue_name", &v.issue_name, 1, 200)?;
        length("department", &v.department, 1, 100)?;
      }
      Self::AssemblyWinner(v) => {
        non_negative("votes", v.votes)?;
        non_negative("margin", v.margin)?;
        check_winner_party(resolved, v.party_id)?;
      }
      Self::ParliamentWinner(v) => {
        non_negative("votes", v.votes)?;
        non_negative("margin", v.margin)?;
        check_winner_party(resolved, v.party_id)?;
      }
      Self::Committee(v) => {
        if v.region_ids.is_empty() {
          return Err(Error::validation("region_ids", "must not be empty"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = v.region_ids.iter().find(|id| !seen.insert(**id)) {
          return Err(Error::validation("region_ids", format!("{dup} is listed twice")));
        }
        max_length("committee_name", v.committee_name.as_deref(), 100)?;
      }
      Self::Incharge(v) => {
        length("name", &v.name, 1, 100)?;
        length("designation", &v.designation, 1, 100)?;
        phone("phone", &v.phone)?;
        email("email", v.email.as_deref())?;
      }
      Self::BoothElectionStats(v) => {
        non_negative_opt("total_votes_polled", v.total_votes_polled)?;
        non_negative_opt("nota_votes", v.nota_votes)?;
        non_negative_opt("rejected_votes", v.rejected_votes)?;
        percent("turnout_percentage", v.turnout_percentage)?;
        percent("male_turnout", v.male_turnout)?;
        percent("female_turnout", v.female_turnout)?;
        max_length("winning_candidate", v.winning_candidate.as_deref(), 100)?;
      }
      Self::BoothPartyVoteShare(v) => {
        non_negative("votes", v.votes)?;
        if !(0.0..=100.0).contains(&v.vote_percent) {
          return Err(Error::validation("vote_percent", "must be between 0 and 100"));
        }
      }
      Self::BoothPartyPresence(v) => {
        max_length("local_unit_head_name", v.local_unit_head_name.as_deref(), 100)?;
        if let Some(head_phone) = &v.head_phone {
          phone("head_phone", head_phone)?;
        }
        non_negative_opt("registered_members", v.registered_members)?;
      }
      Self::ActiveParty(_) => {}
      Self::BoothInfrastructure(v) => {
        max_length("accessibility_issues", v.accessibility_issues.as_deref(), 500)?;
      }
      Self::LocalDynamics(v) => {
        for (field, text) in [
          ("dominant_caste", &v.dominant_caste),
          ("known_issues", &v.known_issues),
          ("local_leader", &v.local_leader),
          ("grassroots_orgs", &v.grassroots_orgs),
        ] {
          max_length(field, text.as_deref(), 500)?;
        }
      }
      Self::VotingTrend(v) => {
        let latest = Utc::now().year() + 5;
        if !(1950..=latest).contains(&v.election_year) {
          return Err(Error::validation(
            "election_year",
            format!("must be between 1950 and {latest}"),
          ));
        }
        percent("turnout_percent", v.turnout_percent)?;
        non_negative_opt("victory_margin", v.victory_margin)?;
        let mut seen = HashSet::new();
        for share in &v.party_vote_shares {
          if !seen.insert(share.party_id) {
            return Err(Error::validation(
              "party_vote_shares",
              format!("{} is listed twice", share.party_id),
            ));
          }
          percent("party_vote_shares.vote_share", share.vote_share)?;
        }
      }
      Self::BoothVolunteer(v) => {
        length("name", &v.name, 1, 100)?;
        phone("phone", &v.phone)?;
        email("email", v.email.as_deref())?;
        max_length("role", v.role.as_deref(), 100)?;
        max_length("remarks", v.remarks.as_deref(), 500)?;
      }
      Self::Visit(v) => {
        length("person_name", &v.person_name, 1, 100)?;
        length("post", &v.post, 1, 100)?;
        max_length("declaration", v.declaration.as_deref(), 500)?;
        max_length("remark", v.remark.as_deref(), 500)?;
      }
      Self::Influencer(v) => {
        length("name", &v.name, 1, 100)?;
        length("full_address", &v.full_address, 1, 500)?;
        phone("contact_number", &v.contact_number)?;
        if let Some(alternate) = &v.alternate_number {
          phone("alternate_number", alternate)?;
        }
        email("email", v.email.as_deref())?;
      }
    }
    Ok(())
  }
}

fn check_winner_party(resolved: &[ResolvedRef], party_id: uuid::Uuid) -> Result<()> {
  match resolved_candidate(resolved, "candidate_id") {
    Some(candidate) if candidate.party_id != party_id => Err(Error::validation(
      "party_id",
      "does not match the candidate's party",
    )),
    _ => Ok(()),
  }
}
