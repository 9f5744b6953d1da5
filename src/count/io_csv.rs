// Primitives for reading CSV files.

use std::fs::File;

use log::debug;

use crate::count::{
    io_common::{make_default_id, trim_trailing_blanks},
    *,
};

pub fn read_csv_ranking(path: String, cfs: &FileSource) -> CountResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(&path);

    let id_idx_o = cfs.id_column_index_int()?;
    let choices_start_col = cfs.first_vote_column_index()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (records, row_offset) = get_records(&path, cfs)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        if line.iter().all(|s| s.trim().is_empty()) {
            debug!("read_csv_ranking: lineno: {:?} skipping empty row", lineno);
            continue;
        }
        let id = if let Some(id_idx) = id_idx_o {
            line.get(id_idx)
                .context(CsvLineTooShortSnafu { lineno })?
                .trim()
                .to_string()
        } else {
            default_id(lineno)
        };

        let choices: Vec<String> = line
            .iter()
            .skip(choices_start_col)
            .map(|s| s.trim().to_string())
            .collect();
        let choices = trim_trailing_blanks(choices);
        debug!(
            "read_csv_ranking: lineno: {:?} row: {:?}",
            lineno, &choices
        );

        res.push(ParsedBallot {
            id: Some(id),
            lineno,
            choices,
        });
    }
    Ok(res)
}

fn get_records(
    path: &String,
    cfs: &FileSource,
) -> CountResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    // Rows are numbered from 1, as in a spreadsheet.
    for _ in 1..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}
