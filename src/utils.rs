//! Utility functions

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Longest common directory of `paths`
///
/// A single path yields its parent directory.
pub fn common_root_path<S: AsRef<str>>(paths: &[S]) -> String {
    let split: Vec<Vec<&str>> = paths
        .iter()
        .map(|p| p.as_ref().split('/').collect())
        .collect();
    let Some(first) = split.first() else {
        return String::new();
    };
    let mut common = first.len().saturating_sub(1);
    for other in &split[1..] {
        let shared = first
            .iter()
            .zip(other.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common = common.min(shared).min(other.len().saturating_sub(1));
    }
    first[..common].join("/")
}
