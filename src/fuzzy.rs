use regex::RegexBuilder;

/// Filter `candidates` by a fuzzy query, best matches first.
///
/// A candidate matches when the query's characters appear in its key in
/// order, ignoring case. Matches are ranked by the length of the shortest
/// matching span, then by where it starts, then by the key itself. An empty
/// query keeps every candidate in input order.
pub fn filter<'a, T, F>(query: &str, candidates: &'a [T], key: F) -> Vec<&'a T>
where
    F: Fn(&T) -> &str,
{
    if query.is_empty() {
        return candidates.iter().collect();
    }

    let pattern = query
        .chars()
        .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
        .collect::<Vec<_>>()
        .join(".*?");
    // Every metacharacter is escaped, so the pattern always compiles
    let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return Vec::new();
    };

    let mut ranked: Vec<(usize, usize, &str, &T)> = candidates
        .iter()
        .filter_map(|candidate| {
            let text = key(candidate);
            // Leftmost match per start position, shortest overall wins
            let best = (0..text.len())
                .filter(|&start| text.is_char_boundary(start))
                .filter_map(|start| re.find_at(text, start))
                .min_by_key(|m| (m.len(), m.start()))?;
            Some((best.len(), best.start(), text, candidate))
        })
        .collect();

    ranked.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));
    ranked.into_iter().map(|(_, _, _, candidate)| candidate).collect()
}
