//! Path Validator (component A). Every filesystem path crossing the core's
//! boundary passes through here first. Consolidates the filename/containment
//! checking that was previously absent entirely — the original `lib.rs`
//! joined paths with bare `PathBuf::join` and trusted the caller.

use std::path::{Path, PathBuf};

use crate::error::PathError;

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Rejects filenames containing path separators, `..`, null bytes, or (for
/// portability) any of `< > : " | ? *`.
pub fn validate_filename(name: &str) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "filename is empty",
        });
    }
    if name == "." || name == ".." {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "filename is a directory reference",
        });
    }
    if name.contains('\0') {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "filename contains a null byte",
        });
    }
    if name.contains('/') || name.contains('\\') {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "filename contains a path separator",
        });
    }
    if name.contains("..") {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: "filename contains a parent-directory reference",
        });
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(PathError::InvalidName {
            name: name.to_string(),
            reason: char_reason(c),
        });
    }
    Ok(())
}

fn char_reason(c: char) -> &'static str {
    match c {
        '<' => "filename contains '<'",
        '>' => "filename contains '>'",
        ':' => "filename contains ':'",
        '"' => "filename contains '\"'",
        '|' => "filename contains '|'",
        '?' => "filename contains '?'",
        '*' => "filename contains '*'",
        _ => "filename contains a forbidden character",
    }
}

/// Canonicalises `path` and checks that the result is lexically below
/// canonicalised `base`. `base` must exist; `path` itself need not (a
/// not-yet-written output file is the common case), but its parent
/// directory must exist so containment can be resolved. If `path` does
/// exist and is a symlink, the symlink target is what gets checked — this
/// is what catches a symlink planted inside `base` that points outside it.
pub fn validate_path(path: &Path, base: &Path) -> Result<PathBuf, PathError> {
    let canon_base = base
        .canonicalize()
        .map_err(|_| escape(path, base))?;

    let resolved = if path.exists() {
        path.canonicalize().map_err(|_| escape(path, base))?
    } else {
        let parent = path.parent().ok_or_else(|| escape(path, base))?;
        let canon_parent = parent.canonicalize().map_err(|_| escape(path, base))?;
        let file_name = path.file_name().ok_or_else(|| escape(path, base))?;
        canon_parent.join(file_name)
    };

    if resolved.starts_with(&canon_base) {
        Ok(resolved)
    } else {
        Err(PathError::PathEscape {
            path: resolved,
            base: canon_base,
        })
    }
}

fn escape(path: &Path, base: &Path) -> PathError {
    PathError::PathEscape {
        path: path.to_path_buf(),
        base: base.to_path_buf(),
    }
}

/// Composes a child path from `base` and `parts`, validating every part as a
/// filename and the final result for containment.
pub fn safe_join(base: &Path, parts: &[&str]) -> Result<PathBuf, PathError> {
    let mut joined = base.to_path_buf();
    for part in parts {
        validate_filename(part)?;
        joined.push(part);
    }
    validate_path(&joined, base)
}
