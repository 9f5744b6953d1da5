use log::{debug, info, warn};

use preferential_tally::builder::Builder;
use preferential_tally::*;
use snafu::{prelude::*, ErrorCompat, Snafu};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_json;
pub mod io_xlsx;

pub use config_reader::*;

#[derive(Debug, Snafu)]
pub enum CountError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name} not found"))]
    MissingWorksheet { name: String },
    #[snafu(display("No worksheet found in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Line {lineno}: cannot read cell {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Line {lineno}: the id column is missing"))]
    ExcelLineTooShort { lineno: usize },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Line {lineno}: cannot parse CSV record"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Line {lineno}: the id column is missing"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Field {field}: expected a positive index"))]
    ParsingJsonNumber { field: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Ballot {ballot_id} (line {lineno}): {content:?} is not a candidate"))]
    UnknownChoice {
        ballot_id: String,
        lineno: usize,
        content: String,
    },
    #[snafu(display(
        "Ballot {ballot_id} (line {lineno}): {content:?} is the id of one candidate and the title of another"
    ))]
    AmbiguousChoice {
        ballot_id: String,
        lineno: usize,
        content: String,
    },
    #[snafu(display("No candidates: use a configuration file or --candidates"))]
    MissingCandidates {},
    #[snafu(display("No ballots: use a configuration file or --input"))]
    MissingBallotSources {},
    #[snafu(display("Error writing to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Tally error: {source}"))]
    Tally { source: TallyErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CountResult<T> = Result<T, CountError>;

/// A ballot as read from a file, before the choices are matched with the candidates.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub id: Option<String>,
    // The line (or position) in the source, for error messages.
    pub lineno: usize,
    pub choices: Vec<String>,
}

/// The content of a ballot file. Only some providers can carry the candidates.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionData {
    pub candidates: Option<Vec<ConfigCandidate>>,
    pub ballots: Vec<ParsedBallot>,
}

fn read_ranking_data(root_path: &Path, cfs: &FileSource) -> CountResult<ElectionData> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read rank file {:?}", p2);
    let data = match cfs.provider.as_str() {
        "json" => io_json::read_json_ballots(p2)?,
        "csv" => ElectionData {
            candidates: None,
            ballots: io_csv::read_csv_ranking(p2, cfs)?,
        },
        "xlsx" => ElectionData {
            candidates: None,
            ballots: io_xlsx::read_excel_file(p2, cfs)?,
        },
        x => whatever!("Provider not implemented {:?}", x),
    };
    debug!("read_ranking_data: {} ballots", data.ballots.len());
    Ok(data)
}

// The provider for a file given on the command line, when not explicit.
fn guess_provider(path: &str) -> String {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("json") => "json".to_string(),
        Some("xlsx") => "xlsx".to_string(),
        _ => "csv".to_string(),
    }
}

// The candidates a choice can refer to: the candidate with this identifier, and the candidate
// with this title.
fn resolve_choice(
    choice: &str,
    ids: &HashSet<CandidateId>,
    titles: &HashMap<&str, CandidateId>,
) -> Vec<CandidateId> {
    let by_id = choice
        .parse::<u32>()
        .ok()
        .map(CandidateId)
        .filter(|cid| ids.contains(cid));
    let by_title = titles.get(choice).cloned();
    let mut res: Vec<CandidateId> = by_id.into_iter().chain(by_title).collect();
    res.dedup();
    res
}

fn validate_ballots(
    parsed_ballots: &[ParsedBallot],
    candidates: &[Candidate],
) -> CountResult<Vec<Ballot>> {
    let ids: HashSet<CandidateId> = candidates.iter().map(|c| c.id).collect();
    let titles: HashMap<&str, CandidateId> = candidates
        .iter()
        .map(|c| (c.title.as_str(), c.id))
        .collect();
    let mut res: Vec<Ballot> = Vec::new();
    for pb in parsed_ballots.iter() {
        let ballot_id = pb.id.clone().unwrap_or_default();
        let mut rankings: Vec<CandidateId> = Vec::new();
        for s in pb.choices.iter() {
            let cid = match resolve_choice(s, &ids, &titles).as_slice() {
                [cid] => *cid,
                [] => {
                    return UnknownChoiceSnafu {
                        ballot_id,
                        lineno: pb.lineno,
                        content: s,
                    }
                    .fail()
                }
                _ => {
                    return AmbiguousChoiceSnafu {
                        ballot_id,
                        lineno: pb.lineno,
                        content: s,
                    }
                    .fail()
                }
            };
            rankings.push(cid);
        }
        debug!("Choices for ballot {:?}: {:?}", pb.id, rankings);
        res.push(Ballot {
            id: pb.id.clone(),
            rankings,
        });
    }
    Ok(res)
}

/// Parses candidates written as `id:title`.
pub fn parse_candidate_args(args: &[String]) -> CountResult<Vec<ConfigCandidate>> {
    let mut res: Vec<ConfigCandidate> = Vec::new();
    for arg in args.iter() {
        let (id_s, title) = match arg.split_once(':') {
            Some(x) => x,
            None => whatever!("Expected a candidate as id:title, got {:?}", arg),
        };
        let id = match id_s.trim().parse::<u32>() {
            Ok(x) => x,
            Err(_) => whatever!("Not a candidate identifier: {:?}", id_s),
        };
        res.push(ConfigCandidate {
            id,
            title: title.trim().to_string(),
        });
    }
    Ok(res)
}

// Sorted by title, as in the JSON output.
fn counts_by_title(
    counts: &BTreeMap<CandidateId, u64>,
    titles: &HashMap<CandidateId, String>,
) -> JSMap<String, JSValue> {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    for (cid, count) in counts.iter() {
        let title = titles.get(cid).cloned().unwrap_or_else(|| cid.to_string());
        m.insert(title, json!(count.to_string()));
    }
    m
}

// Where the ballots of an eliminated candidate went in the next round.
fn transfers(
    eliminated: CandidateId,
    current: &RoundResult,
    next: Option<&RoundResult>,
    titles: &HashMap<CandidateId, String>,
) -> JSMap<String, JSValue> {
    let mut gains: BTreeMap<CandidateId, u64> = BTreeMap::new();
    if let Some(next) = next {
        for (cid, count) in next.tally.iter() {
            let before = current.tally.get(cid).cloned().unwrap_or(0);
            if *count > before {
                gains.insert(*cid, count - before);
            }
        }
    }
    let moved: u64 = gains.values().sum();
    let eliminated_count = current.tally.get(&eliminated).cloned().unwrap_or(0);
    let mut m = counts_by_title(&gains, titles);
    let exhausted = eliminated_count.saturating_sub(moved);
    if exhausted > 0 {
        m.insert("exhausted".to_string(), json!(exhausted.to_string()));
    }
    m
}

fn result_stats_to_json(rs: &ElectionResult, candidates: &[Candidate]) -> Vec<JSValue> {
    let titles: HashMap<CandidateId, String> = candidates
        .iter()
        .map(|c| (c.id, c.title.clone()))
        .collect();
    let mut l: Vec<JSValue> = Vec::new();
    for (idx, round_stat) in rs.rounds.iter().enumerate() {
        let tally_results: Vec<JSValue> = match round_stat.eliminated {
            Some(cid) => {
                let name = titles.get(&cid).cloned().unwrap_or_else(|| cid.to_string());
                vec![json!({
                    "eliminated": name,
                    "transfers": transfers(cid, round_stat, rs.rounds.get(idx + 1), &titles)
                })]
            }
            None => vec![json!({ "elected": rs.winner.title })],
        };
        let mut js = json!({
            "round": round_stat.round,
            "tally": counts_by_title(&round_stat.tally, &titles),
            "majorityTotal": round_stat.majority_total.to_string(),
            "exhausted": round_stat.exhausted.to_string(),
            "tallyResults": tally_results,
        });
        if let (Some(scores), Some(obj)) = (&round_stat.tiebreak_scores, js.as_object_mut()) {
            obj.insert(
                "tiebreakScores".to_string(),
                JSValue::Object(counts_by_title(scores, &titles)),
            );
        }
        l.push(js);
    }
    l
}

fn build_summary_js(
    config: &ElectionConfig,
    rules: &TallyRules,
    candidates: &[Candidate],
    rv: &ElectionResult,
) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_jurisdiction.clone(),
        office: config.output_settings.contest_office.clone(),
        majority_basis: majority_basis_name(rules.majority_basis),
    };
    json!({
        "config": c,
        "winner": {"id": rv.winner.id.0, "title": rv.winner.title},
        "results": result_stats_to_json(rv, candidates)
    })
}

fn print_result(rv: &ElectionResult, candidates: &[Candidate]) {
    let titles: HashMap<CandidateId, &str> = candidates
        .iter()
        .map(|c| (c.id, c.title.as_str()))
        .collect();
    for r in rv.rounds.iter() {
        let tally: Vec<String> = r
            .tally
            .iter()
            .map(|(cid, count)| format!("{}={}", titles.get(cid).unwrap_or(&"?"), count))
            .collect();
        let outcome = match r.eliminated {
            Some(cid) => format!("eliminated {}", titles.get(&cid).unwrap_or(&"?")),
            None => format!("elected {}", rv.winner.title),
        };
        println!("Round {}: {} ({})", r.round, tally.join(", "), outcome);
    }
    println!("Winner: {} ({})", rv.winner.title, rv.winner.id);
    println!("Audit digest: {}", rv.digest());
}

/// Counts the election described by the configuration file and the command line.
///
/// Returns the JSON summary of the election.
pub fn count_election(args: &Args) -> CountResult<JSValue> {
    let (mut config, root_p): (ElectionConfig, PathBuf) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root_p)
        }
        None => (ElectionConfig::default(), PathBuf::new()),
    };
    info!("config: {:?}", config);

    // The command line takes precedence over the configuration file.
    if let Some(input) = &args.input {
        let provider = args
            .input_type
            .clone()
            .unwrap_or_else(|| guess_provider(input));
        config.ballot_sources = vec![FileSource::from_path(&provider, input)];
    }
    if !args.candidates.is_empty() {
        config.candidates = Some(parse_candidate_args(&args.candidates)?);
    }
    if let Some(basis) = &args.majority_basis {
        config.rules.majority_basis = Some(basis.clone());
    }
    if let Some(count) = args.candidate_count {
        config.rules.required_candidate_count = Some(count);
    }

    let rules = config.rules.tally_rules()?;
    ensure!(!config.ballot_sources.is_empty(), MissingBallotSourcesSnafu {});

    // Paths from the command line are relative to the working directory.
    let root_p = if args.input.is_some() {
        PathBuf::new()
    } else {
        root_p
    };
    let mut file_candidates: Option<Vec<ConfigCandidate>> = None;
    let mut parsed_ballots: Vec<ParsedBallot> = Vec::new();
    for cfs in config.ballot_sources.iter() {
        let mut data = read_ranking_data(&root_p, cfs)?;
        if file_candidates.is_none() {
            file_candidates = data.candidates;
        }
        parsed_ballots.append(&mut data.ballots);
    }

    let config_candidates = config
        .candidates
        .clone()
        .or(file_candidates)
        .context(MissingCandidatesSnafu {})?;
    let cands: Vec<(u32, String)> = config_candidates
        .iter()
        .map(|c| (c.id, c.title.clone()))
        .collect();
    let mut builder = Builder::new(&rules)
        .context(TallySnafu {})?
        .candidates(&cands)
        .context(TallySnafu {})?;
    for ballot in validate_ballots(&parsed_ballots, builder.candidate_list())? {
        builder.add_ballot(&ballot).context(TallySnafu {})?;
    }

    let result = builder.run().context(TallySnafu {})?;
    debug!("result {:?}", result);
    print_result(&result, builder.candidate_list());

    let result_js = build_summary_js(&config, &rules, builder.candidate_list(), &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match args.out.as_deref() {
        Some("stdout") => println!("{}", pretty_js_stats),
        Some(out_path) => {
            info!("Writing summary to {}", out_path);
            fs::write(out_path, &pretty_js_stats).context(WritingOutputSnafu { path: out_path })?;
        }
        None => {}
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p.clone())?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(result_js)
}

/// Runs the election and reports the error, if any, on the standard error.
pub fn run_election_cli(args: &Args) -> CountResult<()> {
    let res = count_election(args);
    if let Err(e) = &res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e) {
            eprintln!("trace: {}", bt);
        }
    }
    res.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn test_path(name: &str) -> String {
        format!(
            "{}/tests/data/best_picture/{}",
            env!("CARGO_MANIFEST_DIR"),
            name
        )
    }

    fn args_for(config: &str) -> Args {
        Args {
            config: Some(test_path(config)),
            reference: Some(test_path("best_picture_expected_summary.json")),
            out: None,
            input: None,
            input_type: None,
            candidates: Vec::new(),
            majority_basis: None,
            candidate_count: None,
            verbose: false,
        }
    }

    #[test]
    fn best_picture_csv() {
        init_logs();
        let res = run_election_cli(&args_for("best_picture_config.json"));
        assert!(res.is_ok());
    }

    #[test]
    fn best_picture_json() {
        init_logs();
        let res = run_election_cli(&args_for("best_picture_json_config.json"));
        assert!(res.is_ok());
    }

    #[test]
    fn best_picture_xlsx() {
        init_logs();
        let res = run_election_cli(&args_for("best_picture_xlsx_config.json"));
        assert!(res.is_ok());
    }

    #[test]
    fn input_without_config() {
        init_logs();
        let args = Args {
            config: None,
            reference: None,
            out: None,
            input: Some(test_path("ballots.json")),
            input_type: None,
            candidates: Vec::new(),
            majority_basis: Some("continuingBallots".to_string()),
            candidate_count: Some(4),
            verbose: false,
        };
        let js = count_election(&args).unwrap();
        assert_eq!(js["winner"], json!({"id": 2, "title": "Bob"}));
        assert_eq!(js["config"]["majorityBasis"], json!("continuingBallots"));
        assert_eq!(js["results"].as_array().map(|l| l.len()), Some(3));
    }

    #[test]
    fn wrong_candidate_count_fails() {
        let mut args = args_for("best_picture_config.json");
        args.candidate_count = Some(5);
        let res = count_election(&args);
        assert!(matches!(
            res,
            Err(CountError::Tally {
                source: TallyErrors::CandidateCountMismatch {
                    expected: 5,
                    found: 4
                }
            })
        ));
    }

    #[test]
    fn candidate_arguments() {
        let cands =
            parse_candidate_args(&["1:Alice".to_string(), "2: Bob ".to_string()]).unwrap();
        assert_eq!(
            cands,
            vec![
                ConfigCandidate {
                    id: 1,
                    title: "Alice".to_string()
                },
                ConfigCandidate {
                    id: 2,
                    title: "Bob".to_string()
                }
            ]
        );
        assert!(parse_candidate_args(&["Alice".to_string()]).is_err());
        assert!(parse_candidate_args(&["x:Alice".to_string()]).is_err());
    }

    #[test]
    fn choices_are_identifiers_or_titles() {
        let candidates = vec![Candidate::new(1, "Alice"), Candidate::new(2, "Bob")];
        let parsed = vec![ParsedBallot {
            id: Some("v1".to_string()),
            lineno: 3,
            choices: vec!["Bob".to_string(), "1".to_string()],
        }];
        let ballots = validate_ballots(&parsed, &candidates).unwrap();
        assert_eq!(ballots[0].rankings, vec![CandidateId(2), CandidateId(1)]);

        let parsed = vec![ParsedBallot {
            id: Some("v2".to_string()),
            lineno: 4,
            choices: vec!["Bob".to_string(), "Zoe".to_string()],
        }];
        let err = validate_ballots(&parsed, &candidates).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Ballot v2 (line 4): \"Zoe\" is not a candidate"
        );
    }

    #[test]
    fn numeric_titles() {
        let candidates = vec![Candidate::new(1, "1917"), Candidate::new(2, "Parasite")];
        let parsed = vec![
            ParsedBallot {
                id: Some("v1".to_string()),
                lineno: 1,
                choices: vec!["1917".to_string(), "Parasite".to_string()],
            },
            ParsedBallot {
                id: Some("v2".to_string()),
                lineno: 2,
                choices: vec!["2".to_string(), "1".to_string()],
            },
        ];
        let ballots = validate_ballots(&parsed, &candidates).unwrap();
        assert_eq!(ballots[0].rankings, vec![CandidateId(1), CandidateId(2)]);
        assert_eq!(ballots[1].rankings, vec![CandidateId(2), CandidateId(1)]);

        // The title and the id of the same candidate.
        let candidates = vec![Candidate::new(1917, "1917"), Candidate::new(2, "Parasite")];
        let ballots = validate_ballots(&parsed[..1], &candidates).unwrap();
        assert_eq!(ballots[0].rankings, vec![CandidateId(1917), CandidateId(2)]);
    }

    #[test]
    fn choice_naming_two_candidates_is_rejected() {
        let candidates = vec![Candidate::new(1, "2"), Candidate::new(2, "Parasite")];
        let parsed = vec![ParsedBallot {
            id: Some("v1".to_string()),
            lineno: 5,
            choices: vec!["2".to_string(), "Parasite".to_string()],
        }];
        let err = validate_ballots(&parsed, &candidates).unwrap_err();
        assert!(matches!(err, CountError::AmbiguousChoice { lineno: 5, .. }));
    }

    #[test]
    fn duplicate_titles_fail() {
        let args = Args {
            config: None,
            reference: None,
            out: None,
            input: Some(test_path("ballots.json")),
            input_type: None,
            candidates: vec![
                "1:Dune".to_string(),
                "2:Dune".to_string(),
                "3:Her".to_string(),
                "4:Up".to_string(),
            ],
            majority_basis: None,
            candidate_count: None,
            verbose: false,
        };
        let res = count_election(&args);
        assert!(matches!(
            res,
            Err(CountError::Tally {
                source: TallyErrors::DuplicateCandidateTitle { .. }
            })
        ));
    }

    #[test]
    fn transfers_of_an_eliminated_candidate() {
        let candidates = vec![
            Candidate::new(1, "Alice"),
            Candidate::new(2, "Bob"),
            Candidate::new(3, "Charlie"),
        ];
        let ballots: Vec<Ballot> = [[1, 2, 3], [2, 1, 3], [3, 1, 2], [3, 2, 1], [1, 3, 2]]
            .iter()
            .map(|r| Ballot::new(r))
            .collect();
        let rv =
            preferential_tally::run_election(&candidates, &ballots, &TallyRules::DEFAULT_RULES)
                .unwrap();
        let js = result_stats_to_json(&rv, &candidates);
        assert_eq!(
            js[0]["tallyResults"],
            json!([{"eliminated": "Bob", "transfers": {"Alice": "1"}}])
        );
        assert_eq!(js[1]["tallyResults"], json!([{"elected": "Alice"}]));
        assert_eq!(js[1]["tally"], json!({"Alice": "3", "Charlie": "2"}));
    }

    #[test]
    fn provider_from_extension() {
        assert_eq!(guess_provider("votes.json"), "json");
        assert_eq!(guess_provider("votes.xlsx"), "xlsx");
        assert_eq!(guess_provider("votes.txt"), "csv");
        assert_eq!(guess_provider("votes"), "csv");
    }
}
