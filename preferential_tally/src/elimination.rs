// Selection of the candidate to eliminate at the end of a round.
//
// All the functions here are pure: they only look at the tally and the ballots of the
// current round.

use std::collections::{BTreeMap, HashSet};

use log::debug;

use crate::config::CandidateId;

// Flag to indicate if a tiebreak happened.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) enum TiebreakSituation {
    Clean,
    // The weighted scores of the tied candidates.
    TiebreakOccured(BTreeMap<CandidateId, u64>),
}

/// All the candidates that share the smallest count, in identifier order.
pub(crate) fn lowest_candidates(tally: &BTreeMap<CandidateId, u64>) -> Vec<CandidateId> {
    let min_count = match tally.values().min() {
        Some(x) => *x,
        None => return Vec::new(),
    };
    tally
        .iter()
        .filter_map(|(cid, count)| if *count == min_count { Some(*cid) } else { None })
        .collect()
}

/// The position-weighted score of each of the given candidates.
///
/// Every ballot gives `active.len() - position` points to the candidate at this position,
/// where the position only counts the candidates that are still active. A candidate ranked
/// first gets the largest weight, and the weights of eliminated candidates do not leave gaps.
pub(crate) fn weighted_scores(
    ballots: &[Vec<CandidateId>],
    active: &[CandidateId],
    candidates: &[CandidateId],
) -> BTreeMap<CandidateId, u64> {
    let active_set: HashSet<CandidateId> = active.iter().cloned().collect();
    let num_active = active.len() as u64;
    let mut scores: BTreeMap<CandidateId, u64> =
        candidates.iter().map(|cid| (*cid, 0)).collect();
    for ballot in ballots.iter() {
        for (position, cid) in ballot
            .iter()
            .filter(|cid| active_set.contains(cid))
            .enumerate()
        {
            if let Some(score) = scores.get_mut(cid) {
                *score += num_active.saturating_sub(position as u64);
            }
        }
    }
    scores
}

/// Picks the loser among tied candidates.
///
/// The lowest weighted score loses. Remaining ties go to the lowest top-choice count, and
/// then to the lowest identifier.
pub(crate) fn break_tie(
    tally: &BTreeMap<CandidateId, u64>,
    scores: &BTreeMap<CandidateId, u64>,
) -> Option<CandidateId> {
    scores
        .iter()
        .min_by_key(|(cid, score)| (**score, tally.get(*cid).cloned().unwrap_or(0), **cid))
        .map(|(cid, _)| *cid)
}

/// Finds the single candidate to eliminate in this round.
///
/// Returns None if the tally is empty.
pub(crate) fn find_eliminated_candidate(
    tally: &BTreeMap<CandidateId, u64>,
    ballots: &[Vec<CandidateId>],
    active: &[CandidateId],
) -> Option<(CandidateId, TiebreakSituation)> {
    let all_smallest = lowest_candidates(tally);
    debug!(
        "find_eliminated_candidate: all_smallest: {:?}",
        all_smallest
    );
    match all_smallest.as_slice() {
        [] => None,
        [cid] => Some((*cid, TiebreakSituation::Clean)),
        tied => {
            let scores = weighted_scores(ballots, active, tied);
            debug!("find_eliminated_candidate: weighted scores: {:?}", scores);
            let loser = break_tie(tally, &scores)?;
            Some((loser, TiebreakSituation::TiebreakOccured(scores)))
        }
    }
}
