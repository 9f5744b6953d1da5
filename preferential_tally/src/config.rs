// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The identifier of a candidate.
///
/// Identifiers are compared numerically. The identifier order is the last
/// resort when breaking ties between candidates.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct CandidateId(pub u32);

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    pub id: CandidateId,
    pub title: String,
}

impl Candidate {
    pub fn new(id: u32, title: &str) -> Candidate {
        Candidate {
            id: CandidateId(id),
            title: title.to_string(),
        }
    }
}

/// The preferences of one voter, best choice first.
///
/// A valid ballot ranks every candidate of the election exactly once.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    /// The identifier of the record this ballot comes from, if any.
    /// It is only used for reporting.
    pub id: Option<String>,
    pub rankings: Vec<CandidateId>,
}

impl Ballot {
    pub fn new(rankings: &[u32]) -> Ballot {
        Ballot {
            id: None,
            rankings: rankings.iter().map(|x| CandidateId(*x)).collect(),
        }
    }
}

// ******** Output data structures *********

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundResult {
    /// Starts at 1.
    pub round: u32,
    /// The top-choice count of every candidate still running in this round.
    pub tally: BTreeMap<CandidateId, u64>,
    /// The candidate eliminated at the end of this round.
    /// Not set for the final round.
    pub eliminated: Option<CandidateId>,
    /// The number of ballots used as the denominator of the majority test.
    pub majority_total: u64,
    /// The number of ballots that did not contribute to the tally.
    pub exhausted: u64,
    /// The weighted scores of the tied candidates, if a tiebreak was required.
    pub tiebreak_scores: Option<BTreeMap<CandidateId, u64>>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionResult {
    pub winner: Candidate,
    /// The rounds, in order.
    pub rounds: Vec<RoundResult>,
}

impl ElectionResult {
    /// The round in which the winner was found.
    pub fn final_round(&self) -> Option<&RoundResult> {
        self.rounds.last()
    }

    /// The eliminated candidates, in elimination order.
    pub fn eliminated_order(&self) -> Vec<CandidateId> {
        self.rounds.iter().filter_map(|r| r.eliminated).collect()
    }
}

/// The broad family of an error.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ErrorCategory {
    /// The data provided by the caller is not acceptable and must be fixed.
    Input,
    /// An internal invariant did not hold. This should never happen on
    /// validated input.
    Invariant,
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyErrors {
    NoCandidates,
    NoBallots,
    DuplicateCandidate {
        candidate: CandidateId,
    },
    CandidateCountMismatch {
        expected: usize,
        found: usize,
    },
    WrongBallotLength {
        ballot_index: usize,
        ballot_id: Option<String>,
        expected: usize,
        found: usize,
    },
    UnknownCandidate {
        ballot_index: usize,
        ballot_id: Option<String>,
        candidate: CandidateId,
    },
    DuplicateRanking {
        ballot_index: usize,
        ballot_id: Option<String>,
        candidate: CandidateId,
    },
    UnknownCandidateTitle {
        title: String,
    },
    DuplicateCandidateTitle {
        title: String,
    },
    NoMajorityWinner {
        round: u32,
    },
    RoundLimitExceeded {
        round: u32,
        limit: u32,
    },
    // The elected identifier is not in the roster.
    UnregisteredWinner {
        round: u32,
        candidate: CandidateId,
    },
}

impl TallyErrors {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TallyErrors::NoMajorityWinner { .. }
            | TallyErrors::RoundLimitExceeded { .. }
            | TallyErrors::UnregisteredWinner { .. } => ErrorCategory::Invariant,
            _ => ErrorCategory::Input,
        }
    }
}

fn ballot_label(ballot_index: &usize, ballot_id: &Option<String>) -> String {
    match ballot_id {
        Some(id) => format!("ballot #{} ({})", ballot_index, id),
        None => format!("ballot #{}", ballot_index),
    }
}

impl Error for TallyErrors {}

impl Display for TallyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyErrors::NoCandidates => write!(f, "the election has no candidates"),
            TallyErrors::NoBallots => write!(f, "the election has no ballots"),
            TallyErrors::DuplicateCandidate { candidate } => {
                write!(f, "candidate id {} is registered more than once", candidate)
            }
            TallyErrors::CandidateCountMismatch { expected, found } => write!(
                f,
                "the election requires {} candidates but {} were provided",
                expected, found
            ),
            TallyErrors::WrongBallotLength {
                ballot_index,
                ballot_id,
                expected,
                found,
            } => write!(
                f,
                "{} ranks {} candidates, expected {}",
                ballot_label(ballot_index, ballot_id),
                found,
                expected
            ),
            TallyErrors::UnknownCandidate {
                ballot_index,
                ballot_id,
                candidate,
            } => write!(
                f,
                "{} references the unknown candidate id {}",
                ballot_label(ballot_index, ballot_id),
                candidate
            ),
            TallyErrors::DuplicateRanking {
                ballot_index,
                ballot_id,
                candidate,
            } => write!(
                f,
                "{} ranks candidate {} more than once",
                ballot_label(ballot_index, ballot_id),
                candidate
            ),
            TallyErrors::UnknownCandidateTitle { title } => {
                write!(f, "no candidate is named {:?}", title)
            }
            TallyErrors::DuplicateCandidateTitle { title } => {
                write!(f, "several candidates are named {:?}", title)
            }
            TallyErrors::NoMajorityWinner { round } => write!(
                f,
                "round {}: no candidate left to eliminate and no majority winner",
                round
            ),
            TallyErrors::RoundLimitExceeded { round, limit } => write!(
                f,
                "round {} exceeds the maximum number of rounds ({})",
                round, limit
            ),
            TallyErrors::UnregisteredWinner { round, candidate } => write!(
                f,
                "round {}: the elected candidate id {} is not registered",
                round, candidate
            ),
        }
    }
}

// ********* Configuration **********

/// The number of ballots against which a majority is measured.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum MajorityBasis {
    /// All the ballots cast in the election. The threshold does not move
    /// between rounds.
    BallotsCast,
    /// Only the ballots that still count towards a running candidate in the
    /// current round.
    ContinuingBallots,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    pub majority_basis: MajorityBasis,
    /// If set, the election must have exactly this number of candidates.
    pub required_candidate_count: Option<usize>,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        majority_basis: MajorityBasis::BallotsCast,
        required_candidate_count: None,
    };
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::DEFAULT_RULES
    }
}
