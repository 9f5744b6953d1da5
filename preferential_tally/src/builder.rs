pub use crate::config::*;

use std::collections::HashSet;

/// A builder for adding ballots one at a time.
///
/// The ballots are only validated when the election is run.
///
/// ```
/// pub use preferential_tally::builder::Builder;
/// pub use preferential_tally::TallyRules;
/// # use preferential_tally::TallyErrors;
///
/// let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)?
///     .candidates(&[(1, "Anna".to_string()), (2, "Bob".to_string())])?;
///
/// builder.add_ballot_simple(&[2, 1])?;
/// builder.add_ballot_titles(None, &["Anna".to_string(), "Bob".to_string()])?;
/// builder.add_ballot_titles(None, &["Anna".to_string(), "Bob".to_string()])?;
///
/// let result = builder.run()?;
/// assert_eq!(result.winner.title, "Anna");
///
/// # Ok::<(), TallyErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _candidates: Vec<Candidate>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Result<Builder, TallyErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _candidates: Vec::new(),
            _ballots: Vec::new(),
        })
    }

    /// Sets the candidates of the election, in registration order.
    ///
    /// Replaces the candidates and drops the ballots added so far. Titles must be unique,
    /// since ballots and summaries can refer to candidates by title.
    pub fn candidates(self, cands: &[(u32, String)]) -> Result<Builder, TallyErrors> {
        let mut titles: HashSet<&str> = HashSet::new();
        for (_, title) in cands.iter() {
            if !titles.insert(title.as_str()) {
                return Err(TallyErrors::DuplicateCandidateTitle {
                    title: title.clone(),
                });
            }
        }
        Ok(Builder {
            _rules: self._rules,
            _candidates: cands
                .iter()
                .map(|(id, title)| Candidate {
                    id: CandidateId(*id),
                    title: title.clone(),
                })
                .collect(),
            _ballots: Vec::new(),
        })
    }

    /// Adds a ballot made of candidate identifiers, best choice first.
    pub fn add_ballot_simple(&mut self, rankings: &[u32]) -> Result<(), TallyErrors> {
        self.add_ballot(&Ballot::new(rankings))
    }

    /// Adds a ballot made of candidate titles, best choice first.
    ///
    /// Every title must name a registered candidate.
    pub fn add_ballot_titles(
        &mut self,
        ballot_id: Option<String>,
        titles: &[String],
    ) -> Result<(), TallyErrors> {
        let mut rankings: Vec<CandidateId> = Vec::new();
        for t in titles {
            let cand = self
                ._candidates
                .iter()
                .find(|c| c.title == *t)
                .ok_or_else(|| TallyErrors::UnknownCandidateTitle { title: t.clone() })?;
            rankings.push(cand.id);
        }
        self.add_ballot(&Ballot {
            id: ballot_id,
            rankings,
        })
    }

    pub fn add_ballot(&mut self, ballot: &Ballot) -> Result<(), TallyErrors> {
        self._ballots.push(ballot.clone());
        Ok(())
    }

    pub fn candidate_list(&self) -> &[Candidate] {
        &self._candidates
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self._ballots
    }

    /// Runs the election on the ballots collected so far.
    pub fn run(&self) -> Result<ElectionResult, TallyErrors> {
        crate::run_election(&self._candidates, &self._ballots, &self._rules)
    }
}
