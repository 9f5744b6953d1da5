// Ballots exported from a vote store, in JSON.

use std::fs;

use log::debug;
use serde::Deserialize;
use serde_json::Value as JSValue;

use crate::count::{io_common::make_default_id, *};

#[derive(Debug, Clone, Deserialize)]
struct JsonBallot {
    id: Option<JSValue>,
    rankings: Vec<JSValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum JsonBallotFile {
    Full {
        candidates: Option<Vec<ConfigCandidate>>,
        ballots: Vec<JsonBallot>,
    },
    Bare(Vec<JsonBallot>),
}

pub fn read_json_ballots(path: String) -> CountResult<ElectionData> {
    let default_id = make_default_id(&path);
    let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: &path })?;
    let parsed: JsonBallotFile =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let (candidates, json_ballots) = match parsed {
        JsonBallotFile::Full {
            candidates,
            ballots,
        } => (candidates, ballots),
        JsonBallotFile::Bare(ballots) => (None, ballots),
    };

    let mut ballots: Vec<ParsedBallot> = Vec::new();
    for (idx, jb) in json_ballots.iter().enumerate() {
        let lineno = idx + 1;
        let id = match &jb.id {
            Some(JSValue::String(s)) => s.clone(),
            Some(JSValue::Number(n)) => n.to_string(),
            _ => default_id(lineno),
        };
        let mut choices: Vec<String> = Vec::new();
        for r in jb.rankings.iter() {
            let choice = match r {
                JSValue::Number(n) => n.to_string(),
                JSValue::String(s) => s.trim().to_string(),
                x => whatever!("ballot {}: cannot understand ranking {}", id, x),
            };
            choices.push(choice);
        }
        ballots.push(ParsedBallot {
            id: Some(id),
            lineno,
            choices,
        });
    }
    debug!(
        "read_json_ballots: {} ballots, candidates: {:?}",
        ballots.len(),
        candidates
    );
    Ok(ElectionData {
        candidates,
        ballots,
    })
}
