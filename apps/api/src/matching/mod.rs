// Matching core: profile extraction, weighted scoring, action items and ranking.
// Everything here is synchronous and side-effect free; tables come from `MatchRuleset`.

pub mod action_items;
pub mod extractor;
pub mod handlers;
pub mod ranking;
pub mod ruleset;
pub mod scorer;
