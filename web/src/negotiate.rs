//! `Accept` header negotiation.

/// Short names accepted by [`preferred_type`], with their media types
const SHORT_TYPES: &[(&str, &str)] = &[
    ("text", "text/plain"),
    ("html", "text/html"),
    ("json", "application/json"),
    ("xml", "application/xml"),
];

#[derive(Debug)]
struct MediaRange<'a> {
    kind: &'a str,
    subtype: &'a str,
    q: f32,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
struct Priority {
    q: f32,
    specificity: u8,
    order: usize,
    candidate: usize,
}

fn parse_accept(accept: &str) -> Vec<MediaRange<'_>> {
    accept
        .split(',')
        .enumerate()
        .filter_map(|(index, item)| {
            let mut params = item.split(';');
            let media = params.next()?.trim();
            let (kind, subtype) = media.split_once('/')?;
            let mut q = 1.0_f32;
            for param in params {
                if let Some((name, value)) = param.split_once('=') {
                    if name.trim().eq_ignore_ascii_case("q") {
                        q = value.trim().parse().unwrap_or(0.0);
                    }
                }
            }
            Some(MediaRange {
                kind: kind.trim(),
                subtype: subtype.trim(),
                q,
                index,
            })
        })
        .collect()
}

fn priority(ranges: &[MediaRange<'_>], media_type: &str, candidate: usize) -> Option<Priority> {
    let (kind, subtype) = media_type.split_once('/')?;
    let mut best: Option<Priority> = None;
    for range in ranges {
        let mut specificity = 0;
        if range.kind.eq_ignore_ascii_case(kind) {
            specificity |= 4;
        } else if range.kind != "*" {
            continue;
        }
        if range.subtype.eq_ignore_ascii_case(subtype) {
            specificity |= 2;
        } else if range.subtype != "*" {
            continue;
        }
        let found = Priority {
            q: range.q,
            specificity,
            order: range.index,
            candidate,
        };
        let better = best.is_none_or(|b| {
            (b.specificity, b.q, std::cmp::Reverse(b.order))
                < (found.specificity, found.q, std::cmp::Reverse(found.order))
        });
        if better {
            best = Some(found);
        }
    }
    best
}

/// Pick the candidate media type the client prefers.
///
/// Candidates are full media types. Without an `Accept` header the first
/// candidate wins. Ties are broken by specificity of the matching range, then
/// its position in the header, then candidate order. `None` when nothing is
/// acceptable.
///
/// ```
/// use boilerplate_web::negotiate::negotiate;
///
/// let candidates = ["text/plain", "application/json"];
/// assert_eq!(negotiate(Some("application/json"), &candidates), Some(1));
/// assert_eq!(negotiate(Some("*/*;q=0.5, application/json"), &candidates), Some(1));
/// assert_eq!(negotiate(None, &candidates), Some(0));
/// ```
#[must_use]
pub fn negotiate(accept: Option<&str>, candidates: &[&str]) -> Option<usize> {
    let Some(accept) = accept.filter(|a| !a.trim().is_empty()) else {
        return (!candidates.is_empty()).then_some(0);
    };
    let ranges = parse_accept(accept);
    let mut accepted: Vec<Priority> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, candidate)| priority(&ranges, candidate, i))
        .filter(|p| p.q > 0.0)
        .collect();
    accepted.sort_by(|a, b| {
        b.q.total_cmp(&a.q)
            .then(b.specificity.cmp(&a.specificity))
            .then(a.order.cmp(&b.order))
            .then(a.candidate.cmp(&b.candidate))
    });
    accepted.first().map(|p| p.candidate)
}

/// Negotiate among short names (`text`, `html`, `json`, `xml`) or full media
/// types, returning the preferred entry of `names`.
#[must_use]
pub fn preferred_type<'a>(accept: Option<&str>, names: &[&'a str]) -> Option<&'a str> {
    let media: Vec<&str> = names
        .iter()
        .map(|name| {
            SHORT_TYPES
                .iter()
                .find(|(short, _)| short == name)
                .map_or(*name, |(_, full)| *full)
        })
        .collect();
    negotiate(accept, &media).map(|i| names[i])
}
