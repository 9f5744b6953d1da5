/*!
Instant-runoff tally of a single-seat election.

Every voter ranks all the candidates. At each round, each ballot counts for its highest
ranked candidate still in the race. A candidate with strictly more than half of the votes
wins. Otherwise the candidate with the fewest votes is eliminated, ties being broken by a
position-weighted score over all the ballots, and then by candidate identifier.

```
use preferential_tally::*;

let candidates = vec![
    Candidate::new(1, "Alice"),
    Candidate::new(2, "Bob"),
    Candidate::new(3, "Charlie"),
];
let ballots = vec![
    Ballot::new(&[1, 2, 3]),
    Ballot::new(&[1, 2, 3]),
    Ballot::new(&[2, 1, 3]),
];
let result = run_election(&candidates, &ballots, &TallyRules::DEFAULT_RULES)?;
assert_eq!(result.winner.title, "Alice");
assert_eq!(result.rounds.len(), 1);
# Ok::<(), TallyErrors>(())
```

See the [manual] for the details of the rules.
*/

mod config;
mod elimination;

pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::{BTreeMap, HashMap, HashSet};

pub use crate::config::*;
use crate::elimination::{find_eliminated_candidate, TiebreakSituation};

// **** Private structures ****

type RoundId = u32;

// The outcome of a single round.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum RoundOutcome {
    Elected(CandidateId),
    Eliminated(CandidateId),
}

struct CheckResult {
    // In the order of registration.
    candidates: Vec<Candidate>,
    ballots: Vec<Vec<CandidateId>>,
}

/// Runs the election for the given candidates and ballots.
///
/// Arguments:
/// * `candidates` the registered candidates for this election. The identifiers must be unique.
/// * `ballots` the ballots. Each ballot must rank every candidate exactly once.
/// * `rules` the rules that govern this election
///
/// The input is not modified. Running the election twice on the same input returns the same
/// result.
pub fn run_election(
    candidates: &[Candidate],
    ballots: &[Ballot],
    rules: &TallyRules,
) -> Result<ElectionResult, TallyErrors> {
    info!(
        "Processing {:?} ballots, {:?} candidates, rules: {:?}",
        ballots.len(),
        candidates.len(),
        rules
    );

    let cr: CheckResult = checks(ballots, candidates, rules)?;
    for c in cr.candidates.iter() {
        info!("Candidate: {}: {}", c.id, c.title);
    }

    let candidates_by_id: HashMap<CandidateId, &Candidate> =
        cr.candidates.iter().map(|c| (c.id, c)).collect();
    let num_ballots = cr.ballots.len() as u64;
    // Every round eliminates one candidate, and the last candidate always has a majority of
    // the ballots.
    let max_rounds = cr.candidates.len() as RoundId;

    // The candidates that are still running, in registration order.
    let mut active: Vec<CandidateId> = cr.candidates.iter().map(|c| c.id).collect();
    let mut cur_ballots: Vec<Vec<CandidateId>> = cr.ballots;
    let mut rounds: Vec<RoundResult> = Vec::new();

    loop {
        let round_id = rounds.len() as RoundId + 1;
        if round_id > max_rounds {
            return Err(TallyErrors::RoundLimitExceeded {
                round: round_id,
                limit: max_rounds,
            });
        }

        let (stats, outcome) =
            run_one_round(&cur_ballots, &active, rules, num_ballots, round_id)?;
        log_round(&stats, outcome, &candidates_by_id);
        rounds.push(stats);

        match outcome {
            RoundOutcome::Elected(cid) => {
                let winner = registered_winner(&candidates_by_id, cid, round_id)?;
                return Ok(ElectionResult { winner, rounds });
            }
            RoundOutcome::Eliminated(cid) => {
                let before = active.len();
                active.retain(|x| *x != cid);
                // Invariant: the number of candidates decreased
                if active.len() >= before {
                    return Err(TallyErrors::NoMajorityWinner { round: round_id });
                }
                cur_ballots = remove_candidate(&cur_ballots, cid);
            }
        }
    }
}

impl ElectionResult {
    /// A SHA-256 fingerprint of the audit trail of the election, in hexadecimal.
    ///
    /// It covers the winner, and for every round the tally, the majority total and the
    /// eliminated candidate.
    pub fn digest(&self) -> String {
        let mut lines: Vec<String> = vec![format!("winner:{}", self.winner.id)];
        for r in self.rounds.iter() {
            let tally: Vec<String> = r
                .tally
                .iter()
                .map(|(cid, count)| format!("{}={}", cid, count))
                .collect();
            let eliminated = r
                .eliminated
                .map(|cid| cid.to_string())
                .unwrap_or_default();
            lines.push(format!(
                "round:{};total:{};tally:{};eliminated:{}",
                r.round,
                r.majority_total,
                tally.join(","),
                eliminated
            ));
        }
        sha256::digest(lines.join("\n"))
    }
}

fn registered_winner(
    candidates_by_id: &HashMap<CandidateId, &Candidate>,
    cid: CandidateId,
    round_id: RoundId,
) -> Result<Candidate, TallyErrors> {
    candidates_by_id
        .get(&cid)
        .map(|c| (*c).clone())
        .ok_or(TallyErrors::UnregisteredWinner {
            round: round_id,
            candidate: cid,
        })
}

fn log_round(
    stats: &RoundResult,
    outcome: RoundOutcome,
    candidates_by_id: &HashMap<CandidateId, &Candidate>,
) {
    info!(
        "Round {} (majority total: {}, exhausted: {})",
        stats.round, stats.majority_total, stats.exhausted
    );
    for (cid, count) in stats.tally.iter() {
        let title = candidates_by_id
            .get(cid)
            .map(|c| c.title.as_str())
            .unwrap_or("?");
        let status = match outcome {
            RoundOutcome::Elected(x) if x == *cid => " -> elected",
            RoundOutcome::Eliminated(x) if x == *cid => " -> eliminated",
            _ => "",
        };
        info!("{:>7} {}{}", count, title, status);
    }
}

// The first ranked active candidate of each ballot gets one vote.
// Returns the tally and the number of ballots that did not count.
fn compute_tally(
    ballots: &[Vec<CandidateId>],
    active: &[CandidateId],
) -> (BTreeMap<CandidateId, u64>, u64) {
    // Initialize the tally with the current candidates to capture all the candidates who do
    // not even have a vote.
    let mut tally: BTreeMap<CandidateId, u64> = active.iter().map(|cid| (*cid, 0)).collect();
    let mut exhausted: u64 = 0;
    for ballot in ballots.iter() {
        let first_active = ballot.iter().find(|cid| tally.contains_key(*cid));
        match first_active.and_then(|cid| tally.get_mut(cid)) {
            Some(count) => *count += 1,
            None => exhausted += 1,
        }
    }
    (tally, exhausted)
}

fn run_one_round(
    ballots: &[Vec<CandidateId>],
    active: &[CandidateId],
    rules: &TallyRules,
    num_ballots: u64,
    round_id: RoundId,
) -> Result<(RoundResult, RoundOutcome), TallyErrors> {
    let (tally, exhausted) = compute_tally(ballots, active);
    debug!("run_one_round: round {} tally: {:?}", round_id, tally);

    let majority_total = match rules.majority_basis {
        MajorityBasis::BallotsCast => num_ballots,
        MajorityBasis::ContinuingBallots => num_ballots - exhausted,
    };
    debug!(
        "run_one_round: majority_total: {:?} exhausted: {:?}",
        majority_total, exhausted
    );

    // At most one candidate can hold more than half of the ballots.
    let winner: Option<CandidateId> = tally
        .iter()
        .find(|(_, count)| 2 * **count > majority_total)
        .map(|(cid, _)| *cid);

    if let Some(cid) = winner {
        debug!("run_one_round: {:?} has a majority, marking as winner", cid);
        let stats = RoundResult {
            round: round_id,
            tally,
            eliminated: None,
            majority_total,
            exhausted,
            tiebreak_scores: None,
        };
        return Ok((stats, RoundOutcome::Elected(cid)));
    }

    // Eliminating the last candidate would leave nobody to elect.
    if active.len() <= 1 {
        return Err(TallyErrors::NoMajorityWinner { round: round_id });
    }

    let (eliminated, tiebreak) = find_eliminated_candidate(&tally, ballots, active)
        .ok_or(TallyErrors::NoMajorityWinner { round: round_id })?;
    debug!(
        "run_one_round: eliminated: {:?}, tiebreak situation: {:?}",
        eliminated, tiebreak
    );
    let tiebreak_scores = match tiebreak {
        TiebreakSituation::Clean => None,
        TiebreakSituation::TiebreakOccured(scores) => Some(scores),
    };

    let stats = RoundResult {
        round: round_id,
        tally,
        eliminated: Some(eliminated),
        majority_total,
        exhausted,
        tiebreak_scores,
    };
    Ok((stats, RoundOutcome::Eliminated(eliminated)))
}

// New ballots without the given candidate. The order of the other choices is kept.
fn remove_candidate(ballots: &[Vec<CandidateId>], cid: CandidateId) -> Vec<Vec<CandidateId>> {
    ballots
        .iter()
        .map(|ballot| ballot.iter().filter(|x| **x != cid).cloned().collect())
        .collect()
}

// Candidates are returned in the same order.
fn checks(
    coll: &[Ballot],
    reg_candidates: &[Candidate],
    rules: &TallyRules,
) -> Result<CheckResult, TallyErrors> {
    debug!("checks: coll size: {:?}", coll.len());
    if reg_candidates.is_empty() {
        return Err(TallyErrors::NoCandidates);
    }

    let mut valid_cids: HashSet<CandidateId> = HashSet::new();
    for c in reg_candidates.iter() {
        if !valid_cids.insert(c.id) {
            return Err(TallyErrors::DuplicateCandidate { candidate: c.id });
        }
    }

    if let Some(expected) = rules.required_candidate_count {
        if expected != reg_candidates.len() {
            return Err(TallyErrors::CandidateCountMismatch {
                expected,
                found: reg_candidates.len(),
            });
        }
    }

    if coll.is_empty() {
        return Err(TallyErrors::NoBallots);
    }

    let num_candidates = reg_candidates.len();
    let mut validated: Vec<Vec<CandidateId>> = Vec::with_capacity(coll.len());
    for (ballot_index, b) in coll.iter().enumerate() {
        if b.rankings.len() != num_candidates {
            return Err(TallyErrors::WrongBallotLength {
                ballot_index,
                ballot_id: b.id.clone(),
                expected: num_candidates,
                found: b.rankings.len(),
            });
        }
        let mut seen: HashSet<CandidateId> = HashSet::new();
        for cid in b.rankings.iter() {
            if !valid_cids.contains(cid) {
                return Err(TallyErrors::UnknownCandidate {
                    ballot_index,
                    ballot_id: b.id.clone(),
                    candidate: *cid,
                });
            }
            if !seen.insert(*cid) {
                return Err(TallyErrors::DuplicateRanking {
                    ballot_index,
                    ballot_id: b.id.clone(),
                    candidate: *cid,
                });
            }
        }
        validated.push(b.rankings.clone());
    }

    debug!(
        "checks: validated ballots: {:?} candidates: {:?}",
        validated.len(),
        num_candidates
    );
    Ok(CheckResult {
        candidates: reg_candidates.to_vec(),
        ballots: validated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Candidate> {
        vec![
            Candidate::new(1, "A"),
            Candidate::new(2, "B"),
            Candidate::new(3, "C"),
        ]
    }

    fn ids(xs: &[u32]) -> Vec<CandidateId> {
        xs.iter().map(|x| CandidateId(*x)).collect()
    }

    #[test]
    fn checks_reports_first_bad_ballot() {
        let mut ballots = vec![Ballot::new(&[1, 2, 3]), Ballot::new(&[1, 2])];
        ballots[1].id = Some("vote-7".to_string());
        let res = checks(&ballots, &roster(), &TallyRules::DEFAULT_RULES);
        assert_eq!(
            res.err(),
            Some(TallyErrors::WrongBallotLength {
                ballot_index: 1,
                ballot_id: Some("vote-7".to_string()),
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn checks_unknown_before_duplicate() {
        let ballots = vec![Ballot::new(&[1, 4, 1])];
        let res = checks(&ballots, &roster(), &TallyRules::DEFAULT_RULES);
        assert_eq!(
            res.err(),
            Some(TallyErrors::UnknownCandidate {
                ballot_index: 0,
                ballot_id: None,
                candidate: CandidateId(4)
            })
        );
    }

    #[test]
    fn checks_roster() {
        let rules = TallyRules::DEFAULT_RULES;
        let ballots = vec![Ballot::new(&[1, 2, 3])];
        assert_eq!(
            checks(&ballots, &[], &rules).err(),
            Some(TallyErrors::NoCandidates)
        );
        assert_eq!(
            checks(&[], &roster(), &rules).err(),
            Some(TallyErrors::NoBallots)
        );
        let mut dup = roster();
        dup.push(Candidate::new(2, "B again"));
        assert_eq!(
            checks(&ballots, &dup, &rules).err(),
            Some(TallyErrors::DuplicateCandidate {
                candidate: CandidateId(2)
            })
        );
        let ten = TallyRules {
            required_candidate_count: Some(10),
            ..TallyRules::DEFAULT_RULES
        };
        assert_eq!(
            checks(&ballots, &roster(), &ten).err(),
            Some(TallyErrors::CandidateCountMismatch {
                expected: 10,
                found: 3
            })
        );
    }

    #[test]
    fn tally_counts_first_active_choice() {
        let ballots = vec![ids(&[1, 2, 3]), ids(&[3, 2]), ids(&[]), ids(&[1])];
        let (tally, exhausted) = compute_tally(&ballots, &ids(&[2, 3]));
        assert_eq!(
            tally,
            BTreeMap::from([(CandidateId(2), 1), (CandidateId(3), 1)])
        );
        assert_eq!(exhausted, 2);
    }

    #[test]
    fn continuing_ballots_basis_ignores_exhausted() {
        // Only reachable with trimmed ballots, but the threshold must follow the rule.
        let ballots = vec![ids(&[1]), ids(&[1]), ids(&[2]), ids(&[])];
        let rules = TallyRules {
            majority_basis: MajorityBasis::ContinuingBallots,
            ..TallyRules::DEFAULT_RULES
        };
        let (stats, outcome) = run_one_round(&ballots, &ids(&[1, 2]), &rules, 4, 1).unwrap();
        assert_eq!(outcome, RoundOutcome::Elected(CandidateId(1)));
        assert_eq!(stats.majority_total, 3);
        assert_eq!(stats.exhausted, 1);

        let (stats, outcome) =
            run_one_round(&ballots, &ids(&[1, 2]), &TallyRules::DEFAULT_RULES, 4, 1).unwrap();
        assert_eq!(outcome, RoundOutcome::Eliminated(CandidateId(2)));
        assert_eq!(stats.majority_total, 4);
    }

    #[test]
    fn last_candidate_without_majority_is_an_error() {
        let ballots = vec![ids(&[]), ids(&[]), ids(&[1])];
        let res = run_one_round(&ballots, &ids(&[1]), &TallyRules::DEFAULT_RULES, 3, 3);
        assert_eq!(res.err(), Some(TallyErrors::NoMajorityWinner { round: 3 }));
    }

    #[test]
    fn remove_candidate_keeps_order() {
        let ballots = vec![ids(&[3, 1, 2]), ids(&[1, 2, 3])];
        assert_eq!(
            remove_candidate(&ballots, CandidateId(1)),
            vec![ids(&[3, 2]), ids(&[2, 3])]
        );
        // The original ballots are untouched.
        assert_eq!(ballots[0], ids(&[3, 1, 2]));
    }

    #[test]
    fn winner_must_be_registered() {
        let cands = roster();
        let by_id: HashMap<CandidateId, &Candidate> = cands.iter().map(|c| (c.id, c)).collect();
        assert_eq!(
            registered_winner(&by_id, CandidateId(2), 1),
            Ok(Candidate::new(2, "B"))
        );
        let err = registered_winner(&by_id, CandidateId(9), 2).unwrap_err();
        assert_eq!(
            err,
            TallyErrors::UnregisteredWinner {
                round: 2,
                candidate: CandidateId(9)
            }
        );
        assert_eq!(err.category(), ErrorCategory::Invariant);
    }
}
