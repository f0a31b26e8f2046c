//! Similar-name suggestions for not-found lookups.

/// Closest candidate to `query`.
///
/// Substring matches (either direction) win first, preferring the closest
/// length. Otherwise the candidate with the smallest edit distance is taken,
/// provided the distance is at most `max(2, len / 3)`.
pub fn suggest<'a, I>(query: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }
    let candidates: Vec<&str> = candidates.into_iter().collect();

    let substring = candidates
        .iter()
        .filter(|c| c.contains(query.as_str()) || query.contains(*c))
        .min_by_key(|c| (c.len().abs_diff(query.len()), **c));
    if let Some(found) = substring {
        return Some(found.to_string());
    }

    let threshold = std::cmp::max(2, query.chars().count() / 3);
    candidates
        .iter()
        .map(|c| (strsim::levenshtein(&query, c), *c))
        .filter(|(distance, _)| *distance <= threshold)
        .min()
        .map(|(_, c)| c.to_string())
}
