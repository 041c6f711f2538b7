use crate::model::*;

/// Gaps inside `query` left open by a schedule's slot-blocking bookings.
/// Purely derived from bookings — working-hours rules live with the
/// professional's profile owner, not here.
pub fn free_windows(rs: &ScheduleState, query: &Span) -> Vec<Span> {
    let mut busy: Vec<Span> = rs
        .overlapping(query)
        .filter(|b| b.status.blocks_slot())
        .map(|b| {
            let span = b.span();
            Span::new(span.start.max(query.start), span.end.min(query.end))
        })
        .collect();
    busy.sort_by_key(|s| s.start);
    let busy = merge_overlapping(&busy);
    subtract_intervals(&[*query], &busy)
}

/// Coalesce sorted spans; adjacent spans merge too.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(sorted.len());
    for span in sorted {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => {
                last.end = last.end.max(span.end);
            }
            _ => merged.push(*span),
        }
    }
    merged
}

/// Remove every `to_remove` span from `base`. Both inputs sorted by start;
/// `to_remove` must be non-overlapping (merged).
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    for span in base {
        let mut cursor = span.start;
        for hole in to_remove {
            if hole.end <= cursor {
                continue;
            }
            if hole.start >= span.end {
                break;
            }
            if hole.start > cursor {
                result.push(Span::new(cursor, hole.start.min(span.end)));
            }
            cursor = cursor.max(hole.end);
            if cursor >= span.end {
                break;
            }
        }
        if cursor < span.end {
            result.push(Span::new(cursor, span.end));
        }
    }
    result
}
