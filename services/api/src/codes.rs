//! Hierarchical catalog codes
//!
//! A child's code is its parent's code, a dot, and a zero-padded sequence
//! number (`01`, `01.03`, `01.03.012`, ...).

/// Code suggested for the next child of `parent_code` given the number of
/// children that already exist.
pub fn next_child_code(parent_code: &str, existing_children: u64, width: usize) -> String {
    format!(
        "{}.{:0width$}",
        parent_code,
        existing_children + 1,
        width = width
    )
}

/// True when `code` sits directly or indirectly under `parent_code`.
pub fn is_child_code(parent_code: &str, code: &str) -> bool {
    code.strip_prefix(parent_code)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|suffix| !suffix.is_empty())
}
