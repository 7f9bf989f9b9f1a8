//! Chromosome Ordering Module
//! Natural ordering of chromosome identifiers such as `chr1`, `2`, `chrX`.

use std::cmp::Ordering;

/// Normalize a chromosome id: lower case, no `_`, no leading `chr`.
pub fn normalize_chrom(id: &str) -> String {
    let lowered = id.to_lowercase().replace('_', "");
    match lowered.strip_prefix("chr") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Compare two chromosome ids.
///
/// Numeric ids compare by value and sort before non-numeric ones
/// (`chr2` < `chr10` < `chrX` < `chrY`).
pub fn chrom_cmp(a: &str, b: &str) -> Ordering {
    let a = normalize_chrom(a);
    let b = normalize_chrom(b);

    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(&b),
    }
}
