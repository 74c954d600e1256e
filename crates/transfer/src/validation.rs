//! Relative-path validation for upload names.
//!
//! The receiver joins the name under `storageRoot/<identity>/`, so a name
//! must never be able to escape that subtree, on any platform.

use std::path::{Component, Path};

use crate::TransferError;

/// Validates a relative upload name.
///
/// Rejects empty names, absolute paths, `..` components, Windows drive
/// prefixes, and UNC prefixes. Forward slashes are the expected
/// separator; `./` components are tolerated.
pub fn validate_relative_path(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidPath("empty name".into()));
    }

    // Byte-level checks catch Windows shapes even when the receiver runs
    // on Unix, where they would otherwise parse as normal components.
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(TransferError::InvalidPath(format!(
            "leading separator not allowed: {name:?}"
        )));
    }
    if name.len() >= 2 && name.as_bytes()[1] == b':' {
        return Err(TransferError::InvalidPath(format!(
            "drive prefix not allowed: {name:?}"
        )));
    }

    for component in Path::new(name).components() {
        match component {
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent traversal not allowed: {name:?}"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(TransferError::InvalidPath(format!(
                    "absolute path not allowed: {name:?}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}
