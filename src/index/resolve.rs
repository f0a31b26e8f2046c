//! Winner selection among same-named bundles.

use crate::bundle::IndexEntry;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A same-name collision observed while resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub name: String,
    pub winner: PathBuf,
    pub loser: PathBuf,
    /// Both candidates had equal precedence; discovery order decided
    pub tie: bool,
}

/// Result of resolving one rebuild's candidates.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub winners: BTreeMap<String, IndexEntry>,
    pub conflicts: Vec<Conflict>,
}

/// Pick one winner per name from candidates in discovery order.
///
/// The highest `(tier rank, priority)` wins. On an exact tie the candidate
/// discovered first is kept.
pub fn resolve_conflicts<I>(candidates: I) -> Resolution
where
    I: IntoIterator<Item = IndexEntry>,
{
    let mut resolution = Resolution::default();

    for candidate in candidates {
        let Some(current) = resolution.winners.get(&candidate.name) else {
            resolution.winners.insert(candidate.name.clone(), candidate);
            continue;
        };

        let (current_prec, candidate_prec) = (current.precedence(), candidate.precedence());
        let tie = current_prec == candidate_prec;
        if candidate_prec > current_prec {
            resolution.conflicts.push(Conflict {
                name: candidate.name.clone(),
                winner: candidate.location.clone(),
                loser: current.location.clone(),
                tie,
            });
            resolution.winners.insert(candidate.name.clone(), candidate);
        } else {
            resolution.conflicts.push(Conflict {
                name: candidate.name.clone(),
                winner: current.location.clone(),
                loser: candidate.location,
                tie,
            });
        }
    }

    resolution
}
