//! Hierarchical operation names.
//!
//! Operations are path-like strings: `/Company/Edit` is a child of `/Company`.
//! No tree is stored anywhere; the parent of a name is the name truncated at
//! its last separator. A permission on a parent operation therefore governs
//! every descendant unless a more specific record overrides it.

use crate::constants::OPERATION_SEPARATOR;
use crate::error::{PermError, Result};

/// Check that a name is `/Seg[/Seg...]` with no empty segments
pub fn validate_operation_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PermError::invalid("operation name is empty"));
    }
    let Some(rest) = name.strip_prefix(OPERATION_SEPARATOR) else {
        return Err(PermError::invalid(format!(
            "operation name '{}' must start with '{}'",
            name, OPERATION_SEPARATOR
        )));
    };
    if rest.split(OPERATION_SEPARATOR).any(str::is_empty) {
        return Err(PermError::invalid(format!("operation name '{}' has an empty segment", name)));
    }
    Ok(())
}

/// Iterate a name and its ancestors, most specific first.
///
/// Assumes `name` is valid; see [`validate_operation_name`].
pub fn ancestors(name: &str) -> impl Iterator<Item = &str> {
    let mut cur = Some(name);
    std::iter::from_fn(move || {
        let out = cur?;
        cur = match out.rfind(OPERATION_SEPARATOR) {
            Some(i) if i > 0 => Some(&out[..i]),
            _ => None,
        };
        Some(out)
    })
}

/// Expand names into themselves plus every ancestor, deduplicated.
///
/// Order is input order, each name followed by its ancestors; a name already
/// produced by an earlier input is skipped.
///
/// ```
/// use permres::expand_operation_names;
/// let all = expand_operation_names(&["/Company/Edit"]).unwrap();
/// assert_eq!(all, vec!["/Company/Edit", "/Company"]);
/// ```
pub fn expand_operation_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>> {
    if names.is_empty() {
        return Err(PermError::invalid("operation name list is empty"));
    }
    let mut out: Vec<String> = Vec::with_capacity(names.len() * 2);
    for name in names {
        let name = name.as_ref();
        validate_operation_name(name)?;
        for a in ancestors(name) {
            if !out.iter().any(|o| o == a) {
                out.push(a.to_string());
            }
        }
    }
    Ok(out)
}
