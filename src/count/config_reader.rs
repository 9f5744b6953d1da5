use crate::count::*;

use log::debug;
use preferential_tally::{MajorityBasis, TallyRules};
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_jurisdiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            contest_name: "Election".to_string(),
            contest_date: None,
            contest_jurisdiction: None,
            contest_office: None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
    #[serde(rename = "majorityBasis")]
    pub majority_basis: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteColumnIndex")]
    _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "idColumnIndex")]
    pub id_column_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    /// A source that reads the whole file, without header or id column.
    pub fn from_path(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _first_vote_column_index: None,
            _first_vote_row_index: None,
            id_column_index: None,
            excel_worksheet_name: None,
        }
    }

    /// The first column with a choice (0-based).
    pub fn first_vote_column_index(&self) -> CountResult<usize> {
        if self._first_vote_column_index.is_none() {
            return Ok(0);
        }
        let x = read_js_int(&self._first_vote_column_index, "firstVoteColumnIndex")?;
        x.checked_sub(1).context(ParsingJsonNumberSnafu {
            field: "firstVoteColumnIndex",
        })
    }

    /// The first row with a ballot (1-based, like in a spreadsheet).
    pub fn first_vote_row_index(&self) -> CountResult<usize> {
        if self._first_vote_row_index.is_none() {
            return Ok(1);
        }
        let x = read_js_int(&self._first_vote_row_index, "firstVoteRowIndex")?;
        ensure!(
            x >= 1,
            ParsingJsonNumberSnafu {
                field: "firstVoteRowIndex"
            }
        );
        Ok(x)
    }

    /// The column with the ballot identifier (0-based), if any.
    pub fn id_column_index_int(&self) -> CountResult<Option<usize>> {
        if self.id_column_index.is_none() {
            return Ok(None);
        }
        let x = read_js_int(&self.id_column_index, "idColumnIndex")?;
        x.checked_sub(1)
            .map(Some)
            .context(ParsingJsonNumberSnafu {
                field: "idColumnIndex",
            })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCandidate {
    pub id: u32,
    pub title: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigRules {
    #[serde(rename = "majorityBasis")]
    pub majority_basis: Option<String>,
    #[serde(rename = "requiredCandidateCount")]
    pub required_candidate_count: Option<usize>,
}

impl ConfigRules {
    pub fn majority_basis(&self) -> CountResult<MajorityBasis> {
        match self.majority_basis.as_deref() {
            None | Some("ballotsCast") => Ok(MajorityBasis::BallotsCast),
            Some("continuingBallots") => Ok(MajorityBasis::ContinuingBallots),
            Some(x) => whatever!("unknown majority basis: {}", x),
        }
    }

    pub fn tally_rules(&self) -> CountResult<TallyRules> {
        Ok(TallyRules {
            majority_basis: self.majority_basis()?,
            required_candidate_count: self.required_candidate_count,
        })
    }
}

pub fn majority_basis_name(basis: MajorityBasis) -> String {
    match basis {
        MajorityBasis::BallotsCast => "ballotsCast".to_string(),
        MajorityBasis::ContinuingBallots => "continuingBallots".to_string(),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "ballotSources", default)]
    pub ballot_sources: Vec<FileSource>,
    pub candidates: Option<Vec<ConfigCandidate>>,
    #[serde(default)]
    pub rules: ConfigRules,
}

pub fn read_config(path: &str) -> CountResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: String) -> CountResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>, field: &str) -> CountResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu { field }),
        // Excel-style columns. Only the first 26 columns can be written this way.
        Some(JSValue::String(s))
            if s.chars().count() == 1 && s.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            let c1: char = s.to_ascii_lowercase().chars().next().unwrap_or('a');
            Ok((c1 as usize) - ('a' as usize) + 1)
        }
        Some(JSValue::String(s)) => s
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu { field }),
        _ => None.context(ParsingJsonNumberSnafu { field }),
    }
}
