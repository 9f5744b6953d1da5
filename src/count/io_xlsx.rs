// Ballots recorded in an Excel spreadsheet, one ballot per row.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;

use crate::count::{
    io_common::{make_default_id, trim_trailing_blanks},
    *,
};

/// Reads the ballots of a worksheet.
///
/// Row and column indexes are those of the sheet, even if the first rows or
/// columns of the sheet are empty.
pub fn read_excel_file(path: String, cfs: &FileSource) -> CountResult<Vec<ParsedBallot>> {
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;
    let wrange = if let Some(name) = &cfs.excel_worksheet_name {
        workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name })?
    } else {
        workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path: path.clone() })?
    }
    .context(OpeningExcelSnafu { path: path.clone() })?;

    let default_id = make_default_id(&path);
    let id_idx_o = cfs.id_column_index_int()?;
    let start_range = cfs.first_vote_column_index()?;
    let first_row = cfs.first_vote_row_index()?;
    // calamine only returns the used part of the sheet.
    let (start_row, start_col) = wrange
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    debug!(
        "read_excel_file: start_range: {:?} first_row: {:?} used range starts at {:?}",
        start_range,
        first_row,
        (start_row, start_col)
    );

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        let lineno = start_row + idx + 1;
        if lineno < first_row {
            continue;
        }
        if row.iter().all(|c| c.is_empty()) {
            debug!("read_excel_file: lineno: {:?} skipping empty row", lineno);
            continue;
        }
        let id = match id_idx_o {
            Some(id_idx) => {
                let cell = id_idx
                    .checked_sub(start_col)
                    .and_then(|i| row.get(i))
                    .context(ExcelLineTooShortSnafu { lineno })?;
                read_cell(cell, lineno)?
            }
            None => default_id(lineno),
        };
        // Columns before the used range are blank.
        let mut choices: Vec<String> = vec!["".to_string(); start_col.saturating_sub(start_range)];
        for cell in row.iter().skip(start_range.saturating_sub(start_col)) {
            choices.push(read_cell(cell, lineno)?);
        }
        let choices = trim_trailing_blanks(choices);
        debug!("read_excel_file: lineno: {:?} row: {:?}", lineno, choices);
        res.push(ParsedBallot {
            id: Some(id),
            lineno,
            choices,
        });
    }
    Ok(res)
}

// Numbers are stored as floats by Excel: only whole numbers are accepted.
fn read_cell(cell: &DataType, lineno: usize) -> CountResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok((*f as i64).to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook_path() -> String {
        format!(
            "{}/tests/data/best_picture/ballots.xlsx",
            env!("CARGO_MANIFEST_DIR")
        )
    }

    fn ballots_source() -> FileSource {
        let mut cfs = FileSource::from_path("xlsx", "ballots.xlsx");
        cfs.excel_worksheet_name = Some("Ballots".to_string());
        cfs
    }

    #[test]
    fn worksheet_by_name_uses_sheet_positions() {
        // The header is on row 2 and the ids in column B, the sheet is empty before.
        let cfs: FileSource = serde_json::from_value(serde_json::json!({
            "provider": "xlsx",
            "filePath": "ballots.xlsx",
            "firstVoteColumnIndex": "C",
            "firstVoteRowIndex": 3,
            "idColumnIndex": "B",
            "excelWorksheetName": "Ballots"
        }))
        .unwrap();
        let ballots = read_excel_file(workbook_path(), &cfs).unwrap();
        assert_eq!(ballots.len(), 9);
        assert_eq!(
            ballots[0],
            ParsedBallot {
                id: Some("v1".to_string()),
                lineno: 3,
                choices: vec!["1", "2", "3", "4"]
                    .into_iter()
                    .map(|s| s.to_string())
                    .collect(),
            }
        );
        assert_eq!(ballots[8].lineno, 11);
        assert_eq!(ballots[8].choices[0], "Bob");
    }

    #[test]
    fn default_source_reads_the_whole_sheet() {
        let mut cfs = ballots_source();
        cfs.excel_worksheet_name = None;
        // The first worksheet only has a note in A1.
        let ballots = read_excel_file(workbook_path(), &cfs).unwrap();
        assert_eq!(
            ballots,
            vec![ParsedBallot {
                id: Some("ballots.xlsx-00000001".to_string()),
                lineno: 1,
                choices: vec!["The ballots are in the next sheet".to_string()],
            }]
        );
    }

    #[test]
    fn header_row_is_read_without_first_row() {
        // Row 2 is the first used row: the header comes first.
        let ballots = read_excel_file(workbook_path(), &ballots_source()).unwrap();
        assert_eq!(ballots.len(), 10);
        assert_eq!(ballots[0].lineno, 2);
        assert_eq!(ballots[0].choices[0], "");
        assert_eq!(ballots[0].choices[1], "id");
    }

    #[test]
    fn missing_worksheet() {
        let mut cfs = ballots_source();
        cfs.excel_worksheet_name = Some("Votes".to_string());
        let res = read_excel_file(workbook_path(), &cfs);
        assert!(matches!(res, Err(CountError::MissingWorksheet { .. })));
    }

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::Float(3.0), 1).unwrap(), "3");
        assert_eq!(read_cell(&DataType::Int(4), 1).unwrap(), "4");
        assert_eq!(
            read_cell(&DataType::String(" Bob ".to_string()), 1).unwrap(),
            "Bob"
        );
        assert_eq!(read_cell(&DataType::Empty, 1).unwrap(), "");
        assert!(matches!(
            read_cell(&DataType::Float(2.5), 7),
            Err(CountError::ExcelWrongCellType { lineno: 7, .. })
        ));
        assert!(read_cell(&DataType::Bool(true), 1).is_err());
    }
}
