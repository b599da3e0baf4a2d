//! Control/data file naming.

pub const CONTROL_FILE_EXTENSION: &str = ".ctl";
pub const DATA_FILE_EXTENSION: &str = ".dat";

/// `<stem>.ctl` → `<stem>.dat`. `None` if `control_file_name` is not a
/// control file or has an empty stem.
pub fn data_file_name(control_file_name: &str) -> Option<String> {
    let stem = control_file_name.strip_suffix(CONTROL_FILE_EXTENSION)?;
    (!stem.is_empty()).then(|| format!("{stem}{DATA_FILE_EXTENSION}"))
}

/// True for `<prefix><at least one char>.ctl`.
///
/// Other files are left alone: the folder is shared with other consumers.
pub fn is_control_file_for(file_name: &str, prefix: &str) -> bool {
    file_name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(CONTROL_FILE_EXTENSION))
        .is_some_and(|middle| !middle.is_empty())
}
