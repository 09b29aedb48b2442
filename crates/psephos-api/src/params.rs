//! Query-string parsing shared by the list and roll-up handlers.
//!
//! Parameters arrive as a flat string map so that malformed values surface
//! as [`Error::Validation`] naming the parameter, rather than as an extractor
//! rejection.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use psephos_core::{
  Error, Result,
  hierarchy::Level,
  nodes::NodeFilter,
  page::PageRequest,
  parse_id,
  pipeline::FactFilter,
  rollup::RollupFilter,
  store::{DateRange, NumericRange},
};

pub type RawParams = BTreeMap<String, String>;

/// Page sizes applied when a request leaves `page_size` out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
  pub list_default:   u64,
  pub rollup_default: u64,
  pub max:            u64,
}

impl Default for Paging {
  fn default() -> Self {
    Self {
      list_default:   10,
      rollup_default: 25,
      max:            100,
    }
  }
}

fn number(field: &str, raw: &str) -> Result<u64> {
  raw
    .trim()
    .parse()
    .map_err(|_| Error::validation(field, format!("{raw:?} is not a positive integer")))
}

/// Take `page` and `page_size` out of `params`.
pub fn take_page(params: &mut RawParams, default_size: u64, max_size: u64) -> Result<PageRequest> {
  let page = match params.remove("page") {
    Some(raw) => number("page", &raw)?,
    None => 1,
  };
  let size = match params.remove("page_size") {
    Some(raw) => number("page_size", &raw)?,
    None => default_size,
  };
  PageRequest::new(page, size, max_size)
}

/// Fail on the first key no handler consumed.
pub(crate) fn reject_leftovers(params: RawParams) -> Result<()> {
  match params.into_keys().next() {
    Some(key) => Err(Error::validation(&key, "unknown query parameter")),
    None => Ok(()),
  }
}

/// `parent_id` and `q`.
pub fn node_filter(mut params: RawParams) -> Result<NodeFilter> {
  let parent_id = params
    .remove("parent_id")
    .map(|raw| parse_id("parent_id", &raw))
    .transpose()?;
  let text = params.remove("q");
  reject_leftovers(params)?;
  Ok(NodeFilter { parent_id, text })
}

/// `q` for text, `<field>_min`/`<field>_max` for numeric ranges,
/// `<field>_from`/`<field>_to` for date ranges; every other key is an
/// equality filter on a reference field.
pub fn fact_filter(mut params: RawParams) -> Result<FactFilter> {
  let mut filter = FactFilter {
    text: params.remove("q"),
    ..Default::default()
  };
  let mut ranges: BTreeMap<String, NumericRange> = BTreeMap::new();
  let mut dates: BTreeMap<String, DateRange> = BTreeMap::new();

  for (key, raw) in params {
    if let Some((field, bound)) = split_suffix(&key, &["_min", "_max"]) {
      let value = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::validation(&key, format!("{raw:?} is not a finite number")))?;
      let range = ranges.entry(field.to_owned()).or_insert_with(|| NumericRange {
        field: field.to_owned(),
        min:   None,
        max:   None,
      });
      match bound {
        "_min" => range.min = Some(value),
        _ => range.max = Some(value),
      }
    } else if let Some((field, bound)) = split_suffix(&key, &["_from", "_to"]) {
      let value: NaiveDate = raw
        .trim()
        .parse()
        .map_err(|_| Error::validation(&key, format!("{raw:?} is not a YYYY-MM-DD date")))?;
      let range = dates.entry(field.to_owned()).or_insert_with(|| DateRange {
        field: field.to_owned(),
        from:  None,
        to:    None,
      });
      match bound {
        "_from" => range.from = Some(value),
        _ => range.to = Some(value),
      }
    } else {
      let id = parse_id(&key, &raw)?;
      filter.eq.push((key, id));
    }
  }

  filter.ranges = ranges.into_values().collect();
  filter.dates = dates.into_values().collect();
  Ok(filter)
}

fn split_suffix<'a>(key: &'a str, suffixes: &[&'static str]) -> Option<(&'a str, &'static str)> {
  suffixes
    .iter()
    .find_map(|s| key.strip_suffix(s).map(|field| (field, *s)))
    .filter(|(field, _)| !field.is_empty())
}

/// One optional pin per level name, e.g. `?division=<id>&assembly=<id>`.
pub fn rollup_filter(mut params: RawParams) -> Result<RollupFilter> {
  let mut filter = RollupFilter::default();
  for level in Level::ALL {
    if let Some(raw) = params.remove(level.as_str()) {
      let id = parse_id(level.as_str(), &raw)?;
      filter = filter.with(level, id);
    }
  }
  reject_leftovers(params)?;
  Ok(filter)
}
