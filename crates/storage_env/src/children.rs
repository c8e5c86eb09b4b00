// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::Path;

use crate::error::{Error, Result};
use crate::path_utils::entry_name;

/// Name of the entry referring to the listed directory itself.
pub const CURRENT_DIR: &str = ".";

/// Name of the entry referring to the parent of the listed directory.
pub const PARENT_DIR: &str = "..";

/// Lists the names of the entries in `dir`.
///
/// The listing always starts with [`CURRENT_DIR`] and [`PARENT_DIR`], followed by the
/// entries in the order the operating system returns them. An empty directory therefore
/// yields two names. Listing is all-or-nothing: if any entry cannot be read or its name
/// is not valid Unicode, the whole listing fails.
pub(crate) fn get_children(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::list(dir, e))?;

    let mut names = vec![CURRENT_DIR.to_owned(), PARENT_DIR.to_owned()];
    for entry in entries {
        let entry = entry.map_err(|e| Error::list(dir, e))?;
        names.push(entry_name(entry.file_name()).map_err(|e| Error::list(dir, e))?);
    }

    Ok(names)
}
