use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::lenient;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndustryCriteria {
    #[serde(deserialize_with = "lenient::string_list")]
    pub whitelist: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub blacklist: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequirementCriteria {
    #[serde(deserialize_with = "lenient::string_list")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub weaknesses: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub unsupported: Vec<String>,
}

/// Administrator-configured scoring criteria.
///
/// An empty list means "no constraint": with no whitelist every industry is
/// neutral, never preferred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    pub industries: IndustryCriteria,
    pub requirements: RequirementCriteria,
}

/// Partial criteria update. Present lists replace the stored list wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CriteriaUpdate {
    pub whitelist: Option<Vec<String>>,
    pub blacklist: Option<Vec<String>>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
    pub unsupported: Option<Vec<String>>,
}

impl Criteria {
    /// Returns a new snapshot with `update` applied. `self` is untouched.
    pub fn apply(&self, update: &CriteriaUpdate) -> Criteria {
        let pick = |new: &Option<Vec<String>>, old: &Vec<String>| match new {
            Some(list) => clean_list(list),
            None => old.clone(),
        };

        Criteria {
            industries: IndustryCriteria {
                whitelist: pick(&update.whitelist, &self.industries.whitelist),
                blacklist: pick(&update.blacklist, &self.industries.blacklist),
            },
            requirements: RequirementCriteria {
                strengths: pick(&update.strengths, &self.requirements.strengths),
                weaknesses: pick(&update.weaknesses, &self.requirements.weaknesses),
                unsupported: pick(&update.unsupported, &self.requirements.unsupported),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.industries.whitelist.is_empty()
            && self.industries.blacklist.is_empty()
            && self.requirements.strengths.is_empty()
            && self.requirements.weaknesses.is_empty()
            && self.requirements.unsupported.is_empty()
    }
}

/// Trims entries, drops empties and removes case-insensitive duplicates,
/// keeping first occurrence order.
fn clean_list(list: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    list.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(String::from)
        .collect()
}
