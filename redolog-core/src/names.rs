use crate::meta::{LogFileType, LOG_EXT, META_EXT, TMP_EXT};
use crate::reader::RedoError;

// Log file names look like
// `{capture_id}_{changefeed_id}_{create_unix_sec}_{kind}_{commit_ts}.log`,
// with `.log.tmp` while the writer still appends. Meta files drop the
// commit ts segment: `{capture_id}_{changefeed_id}_{create_unix_sec}_meta.meta`.
// Tokenization is on `_`, so the writer must not put underscores in capture
// or changefeed IDs.

/// Parse a redo file name into `(commit_ts, kind)`.
///
/// The commit ts of a log file is the largest commit ts it contains. Meta
/// files carry no commit ts segment and parse as `(0, Meta)`. Any other
/// extension is rejected with [`RedoError::BadName`].
pub fn parse_log_file_name(name: &str) -> Result<(u64, LogFileType), RedoError> {
    if let Some(stem) = name.strip_suffix(META_EXT) {
        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() != 4 || parts[3] != LogFileType::Meta.as_str() {
            return Err(RedoError::BadName(format!(
                "meta file name has unexpected segments: {}",
                name
            )));
        }
        parse_u64_segment(parts[2], name)?;
        return Ok((0, LogFileType::Meta));
    }

    let stem = if let Some(rest) = name.strip_suffix(TMP_EXT) {
        match rest.strip_suffix(LOG_EXT) {
            Some(stem) => stem,
            None => {
                return Err(RedoError::BadName(format!(
                    "tmp file without log extension: {}",
                    name
                )))
            }
        }
    } else if let Some(stem) = name.strip_suffix(LOG_EXT) {
        stem
    } else {
        return Err(RedoError::BadName(format!(
            "file name extension not recognized: {}",
            name
        )));
    };

    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() != 5 {
        return Err(RedoError::BadName(format!(
            "log file name has unexpected segments: {}",
            name
        )));
    }
    parse_u64_segment(parts[2], name)?;
    let kind = match LogFileType::parse(parts[3]) {
        Some(LogFileType::Meta) | None => {
            return Err(RedoError::BadName(format!(
                "log file name has unknown kind '{}': {}",
                parts[3], name
            )))
        }
        Some(kind) => kind,
    };
    let commit_ts = parse_u64_segment(parts[4], name)?;
    Ok((commit_ts, kind))
}

/// Render the name of a sealed log file; the inverse of
/// [`parse_log_file_name`] for the `row` and `ddl` kinds.
pub fn encode_log_file_name(
    capture_id: &str,
    changefeed_id: &str,
    create_unix_sec: u64,
    kind: LogFileType,
    commit_ts: u64,
) -> String {
    format!(
        "{}_{}_{}_{}_{}{}",
        capture_id,
        changefeed_id,
        create_unix_sec,
        kind.as_str(),
        commit_ts,
        LOG_EXT
    )
}

/// Render the name of the meta file for a capture/changefeed pair.
pub fn encode_meta_file_name(
    capture_id: &str,
    changefeed_id: &str,
    create_unix_sec: u64,
) -> String {
    format!(
        "{}_{}_{}_{}{}",
        capture_id,
        changefeed_id,
        create_unix_sec,
        LogFileType::Meta.as_str(),
        META_EXT
    )
}

fn parse_u64_segment(segment: &str, name: &str) -> Result<u64, RedoError> {
    segment.parse::<u64>().map_err(|_| {
        RedoError::BadName(format!(
            "non-numeric segment '{}' in file name: {}",
            segment, name
        ))
    })
}
