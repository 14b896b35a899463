use super::UploadedFile;
use crate::error::RegistryError;
use calamine::{Reader, open_workbook_auto};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Largest file accepted for header extraction (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

enum Format {
    Workbook,
    Delimited(u8),
}

/// Reads the header row of an uploaded file and returns it as an uploaded
/// file named after the path's file name.
///
/// Excel workbooks (`.xlsx`, `.xls`) use the first row of the first sheet;
/// `.csv` and `.tsv` files use their first record.
pub fn extract_headers(path: &Path) -> Result<UploadedFile, RegistryError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let format = match extension.as_str() {
        "xlsx" | "xls" => Format::Workbook,
        "csv" => Format::Delimited(b','),
        "tsv" => Format::Delimited(b'\t'),
        other => return Err(RegistryError::UnsupportedFileType(other.to_string())),
    };

    let io_err = |source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = fs::metadata(path).map_err(io_err)?.len();
    if size > MAX_UPLOAD_BYTES {
        return Err(RegistryError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let columns = match format {
        Format::Workbook => headers_from_workbook(path)?,
        Format::Delimited(delimiter) => {
            let file = fs::File::open(path).map_err(io_err)?;
            headers_from_reader(file, delimiter)?
        }
    };
    if columns.is_empty() {
        return Err(RegistryError::NoHeaders(filename));
    }

    tracing::debug!(%filename, columns = columns.len(), "headers extracted");
    Ok(UploadedFile { filename, columns })
}

/// First row of the first worksheet. Empty when the workbook has no sheets
/// or the sheet has no rows.
pub fn headers_from_workbook(path: &Path) -> Result<Vec<String>, RegistryError> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Vec::new());
    };
    let range = range?;
    Ok(range
        .rows()
        .next()
        .map(|row| clean_names(row.iter().map(|cell| cell.to_string())))
        .unwrap_or_default())
}

/// Reads the first record of delimited text as trimmed column names.
/// Returns an empty list for empty input.
pub fn headers_from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Vec<String>, RegistryError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?;
    Ok(clean_names(headers.iter().map(str::to_string)))
}

fn clean_names(names: impl Iterator<Item = String>) -> Vec<String> {
    names
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .filter(|h| !h.is_empty())
        .collect()
}
