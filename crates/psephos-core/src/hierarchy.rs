//! The administrative hierarchy: State → Division → Parliament → Assembly →
//! Block → Booth.
//!
//! Every non-root node stores its immediate parent and, denormalised, the id
//! of its ancestor at every level above. The ancestry is never accepted from
//! callers as-is: it is derived from the parent at write time, and any
//! ancestor ids a caller does supply are checked against the derivation.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, audit::Audit};

// ─── Level ───────────────────────────────────────────────────────────────────

/// One level of the hierarchy. The derived ordering is root-first, so the
/// "deepest" of several levels is simply the maximum.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  State,
  Division,
  Parliament,
  Assembly,
  Block,
  Booth,
}

impl Level {
  pub const ALL: [Level; 6] = [
    Level::State,
    Level::Division,
    Level::Parliament,
    Level::Assembly,
    Level::Block,
    Level::Booth,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::State => "state",
      Self::Division => "division",
      Self::Parliament => "parliament",
      Self::Assembly => "assembly",
      Self::Block => "block",
      Self::Booth => "booth",
    }
  }

  /// The name of the foreign-key field that points at a node of this level,
  /// both on fact records and in the ancestry columns.
  pub fn id_field(self) -> &'static str {
    match self {
      Self::State => "state_id",
      Self::Division => "division_id",
      Self::Parliament => "parliament_id",
      Self::Assembly => "assembly_id",
      Self::Block => "block_id",
      Self::Booth => "booth_id",
    }
  }

  fn depth(self) -> usize { self as usize }

  pub fn parent(self) -> Option<Level> {
    self.depth().checked_sub(1).map(|d| Self::ALL[d])
  }

  pub fn child(self) -> Option<Level> { Self::ALL.get(self.depth() + 1).copied() }

  /// Levels strictly above this one, root first.
  pub fn ancestors(self) -> &'static [Level] { &Self::ALL[..self.depth()] }

  /// Levels strictly below this one, nearest first.
  pub fn descendants(self) -> &'static [Level] { &Self::ALL[self.depth() + 1..] }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Level {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| Error::validation("level", format!("unknown level {s:?}")))
  }
}

// ─── Region type ─────────────────────────────────────────────────────────────

/// The levels a committee may be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionType {
  Division,
  Parliament,
  Assembly,
  Block,
}

impl RegionType {
  pub fn level(self) -> Level {
    match self {
      Self::Division => Level::Division,
      Self::Parliament => Level::Parliament,
      Self::Assembly => Level::Assembly,
      Self::Block => Level::Block,
    }
  }
}

// ─── Ancestry ────────────────────────────────────────────────────────────────

/// Ancestor ids of a node (or the claimed ancestors of an incoming write).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestry {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state_id:      Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub division_id:   Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parliament_id: Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assembly_id:   Option<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub block_id:      Option<Uuid>,
}

impl Ancestry {
  pub fn get(&self, level: Level) -> Option<Uuid> {
    match level {
      Level::State => self.state_id,
      Level::Division => self.division_id,
      Level::Parliament => self.parliament_id,
      Level::Assembly => self.assembly_id,
      Level::Block => self.block_id,
      Level::Booth => None,
    }
  }

  pub fn set(&mut self, level: Level, id: Option<Uuid>) {
    match level {
      Level::State => self.state_id = id,
      Level::Division => self.division_id = id,
      Level::Parliament => self.parliament_id = id,
      Level::Assembly => self.assembly_id = id,
      Level::Block => self.block_id = id,
      Level::Booth => {}
    }
  }

  /// The ancestry a child of `parent` must carry.
  pub fn child_of(parent: &Node) -> Self {
    let mut ancestry = parent.ancestry;
    ancestry.set(parent.level(), Some(parent.id));
    ancestry
  }

  /// `true` when `self` is exactly the ancestry of a direct child of
  /// `parent`: every level above the parent agrees, and the parent's own
  /// level points at the parent.
  pub fn descends_from(&self, parent: &Node) -> bool {
    let level = parent.level();
    level.ancestors().iter().all(|&l| self.get(l) == parent.ancestry.get(l))
      && self.get(level) == Some(parent.id)
  }

  /// Compare caller-supplied ancestor ids with the derived ancestry.
  pub fn check_claims(&self, claims: &Ancestry) -> Result<()> {
    for level in Level::Booth.ancestors() {
      if let Some(claimed) = claims.get(*level)
        && self.get(*level) != Some(claimed)
      {
        return Err(Error::validation(
          level.id_field(),
          format!("{claimed} is not an ancestor of the given parent"),
        ));
      }
    }
    Ok(())
  }
}

// ─── Node ────────────────────────────────────────────────────────────────────

/// Reservation category of an assembly constituency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyCategory {
  #[default]
  General,
  #[serde(rename = "SC")]
  Sc,
  #[serde(rename = "ST")]
  St,
}

/// Level-specific attributes. The variant also determines the node's level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum NodeDetails {
  State,
  Division,
  Parliament,
  Assembly {
    category: AssemblyCategory,
  },
  Block,
  Booth {
    full_address: String,
    latitude:     Option<f64>,
    longitude:    Option<f64>,
  },
}

impl NodeDetails {
  pub fn level(&self) -> Level {
    match self {
      Self::State => Level::State,
      Self::Division => Level::Division,
      Self::Parliament => Level::Parliament,
      Self::Assembly { .. } => Level::Assembly,
      Self::Block => Level::Block,
      Self::Booth { .. } => Level::Booth,
    }
  }
}

/// A persisted hierarchy node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id:        Uuid,
  pub name:      String,
  /// Division code, PC code, AC number or booth number, depending on level.
  pub code:      Option<String>,
  pub parent_id: Option<Uuid>,
  pub ancestry:  Ancestry,
  #[serde(flatten)]
  pub details:   NodeDetails,
  pub audit:     Audit,
}

impl Node {
  pub fn level(&self) -> Level { self.details.level() }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Body of a node create or update. On update every `None` means
/// "unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeInput {
  pub name:          Option<String>,
  pub code:          Option<String>,
  pub parent_id:     Option<Uuid>,
  // Optional ancestor claims, checked against the parent's ancestry.
  pub state_id:      Option<Uuid>,
  pub division_id:   Option<Uuid>,
  pub parliament_id: Option<Uuid>,
  pub assembly_id:   Option<Uuid>,
  pub block_id:      Option<Uuid>,
  // Assembly
  pub category:      Option<AssemblyCategory>,
  // Booth
  pub full_address:  Option<String>,
  pub latitude:      Option<f64>,
  pub longitude:     Option<f64>,
}

impl NodeInput {
  pub fn claims(&self) -> Ancestry {
    Ancestry {
      state_id:      self.state_id,
      division_id:   self.division_id,
      parliament_id: self.parliament_id,
      assembly_id:   self.assembly_id,
      block_id:      self.block_id,
    }
  }

  /// Build (on create) or patch (on update) the level-specific details.
  pub fn apply_details(&self, level: Level, current: Option<&NodeDetails>) -> Result<NodeDetails> {
    if level != Level::Assembly && self.category.is_some() {
      return Err(Error::validation("category", format!("not applicable to a {level}")));
    }
    if level != Level::Booth
      && (self.full_address.is_some() || self.latitude.is_some() || self.longitude.is_some())
    {
      return Err(Error::validation("full_address", format!("not applicable to a {level}")));
    }

    let details = match (level, current) {
      (Level::State, _) => NodeDetails::State,
      (Level::Division, _) => NodeDetails::Division,
      (Level::Parliament, _) => NodeDetails::Parliament,
      (Level::Block, _) => NodeDetails::Block,
      (Level::Assembly, Some(NodeDetails::Assembly { category })) => NodeDetails::Assembly {
        category: self.category.unwrap_or(*category),
      },
      (Level::Assembly, _) => NodeDetails::Assembly {
        category: self.category.unwrap_or_default(),
      },
      (Level::Booth, current) => {
        let (address, lat, lon) = match current {
          Some(NodeDetails::Booth { full_address, latitude, longitude }) => {
            (Some(full_address.clone()), *latitude, *longitude)
          }
          _ => (None, None, None),
        };
        let full_address = self
          .full_address
          .clone()
          .or(address)
          .map(|a| a.trim().to_owned())
          .filter(|a| !a.is_empty())
          .ok_or_else(|| Error::validation("full_address", "is required for a booth"))?;
        NodeDetails::Booth {
          full_address,
          latitude: self.latitude.or(lat),
          longitude: self.longitude.or(lon),
        }
      }
    };

    if let NodeDetails::Booth { latitude, longitude, .. } = &details {
      if latitude.is_some_and(|v| !(-90.0..=90.0).contains(&v)) {
        return Err(Error::validation("latitude", "must be within -90..=90"));
      }
      if longitude.is_some_and(|v| !(-180.0..=180.0).contains(&v)) {
        return Err(Error::validation("longitude", "must be within -180..=180"));
      }
    }
    Ok(details)
  }
}
