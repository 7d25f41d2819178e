//! Tally derivation: per-candidate counts and percentages from stored votes,
//! for one session or an aggregate across many.

use std::collections::HashMap;

use serde::Serialize;

use crate::entity::{candidate, vote};

/// One row of a single-session tally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateTally {
    pub candidate_id: i32,
    pub name: String,
    pub count: u64,
    /// Share of the session's total votes, rounded to one decimal.
    /// Defined as 0.0 when the session has no votes at all.
    pub percent: f64,
}

/// Tally of a single session, rows in candidate-creation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionTally {
    pub total_votes: u64,
    pub rows: Vec<CandidateTally>,
}

/// One row of a cross-session aggregate, keyed by candidate name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub name: String,
    pub count: u64,
}

/// Aggregate tally across several sessions.
///
/// Candidate identity is merged by *name*, not id: two sessions that both
/// ran a candidate called "Alice" contribute to one combined row. This is
/// the intended cross-session semantic, not an accident.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTally {
    pub total_votes: u64,
    pub rows: Vec<AggregateRow>,
}

/// Derives the tally of one session.
///
/// Every candidate appears, zero-vote candidates included, in creation
/// order (`candidates` is expected pre-sorted by id, as `Store::candidates_of`
/// returns it). Votes referencing a candidate outside the list are ignored,
/// mirroring the counting loop of the results endpoint.
pub fn tally_session(candidates: &[candidate::Model], votes: &[vote::Model]) -> SessionTally {
    let mut counts: HashMap<i32, u64> = candidates.iter().map(|c| (c.id, 0)).collect();
    let mut total = 0u64;
    for v in votes {
        if let Some(n) = counts.get_mut(&v.candidate_id) {
            *n += 1;
            total += 1;
        }
    }

    let rows = candidates
        .iter()
        .map(|c| {
            let count = counts[&c.id];
            CandidateTally {
                candidate_id: c.id,
                name: c.name.clone(),
                count,
                percent: percent_of(count, total),
            }
        })
        .collect();

    SessionTally {
        total_votes: total,
        rows,
    }
}

/// Merges several sessions' candidates and votes into one name-keyed tally.
///
/// Rows appear in first-seen order across the given sessions; zero-vote
/// candidates are kept so the summary lists every option that was on a
/// ballot.
pub fn aggregate(sessions: &[(Vec<candidate::Model>, Vec<vote::Model>)]) -> AggregateTally {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<AggregateRow> = Vec::new();
    let mut total = 0u64;

    for (candidates, votes) in sessions {
        let per_session = tally_session(candidates, votes);
        total += per_session.total_votes;
        for row in per_session.rows {
            match index.get(&row.name) {
                Some(&i) => rows[i].count += row.count,
                None => {
                    index.insert(row.name.clone(), rows.len());
                    rows.push(AggregateRow {
                        name: row.name,
                        count: row.count,
                    });
                }
            }
        }
    }

    AggregateTally {
        total_votes: total,
        rows,
    }
}

/// `count / total * 100`, one-decimal rounding, 0.0 for an empty total.
pub(crate) fn percent_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 1000.0 / total as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::prelude::DateTimeWithTimeZone;

    use super::*;

    fn cand(id: i32, session_id: i32, name: &str) -> candidate::Model {
        candidate::Model {
            id,
            session_id,
            name: name.to_owned(),
        }
    }

    fn ballot(id: i32, session_id: i32, candidate_id: i32) -> vote::Model {
        vote::Model {
            id,
            session_id,
            candidate_id,
            device_id: format!("tablet-{id}"),
            ts: now(),
        }
    }

    fn now() -> DateTimeWithTimeZone {
        Utc::now().fixed_offset()
    }

    #[test]
    fn two_to_one_split_rounds_to_one_decimal() {
        let candidates = vec![cand(1, 7, "A"), cand(2, 7, "B")];
        let votes = vec![ballot(1, 7, 1), ballot(2, 7, 1), ballot(3, 7, 2)];

        let tally = tally_session(&candidates, &votes);
        assert_eq!(tally.total_votes, 3);
        assert_eq!(tally.rows[0].count, 2);
        assert_eq!(tally.rows[0].percent, 66.7);
        assert_eq!(tally.rows[1].count, 1);
        assert_eq!(tally.rows[1].percent, 33.3);
    }

    #[test]
    fn zero_votes_yield_zero_percent_everywhere() {
        let candidates = vec![cand(1, 7, "A"), cand(2, 7, "B")];
        let tally = tally_session(&candidates, &[]);
        assert_eq!(tally.total_votes, 0);
        for row in &tally.rows {
            assert_eq!(row.count, 0);
            assert_eq!(row.percent, 0.0);
        }
    }

    #[test]
    fn rows_follow_candidate_creation_order() {
        let candidates = vec![cand(3, 7, "C"), cand(5, 7, "E"), cand(9, 7, "I")];
        let votes = vec![ballot(1, 7, 9)];
        let names: Vec<_> = tally_session(&candidates, &votes)
            .rows
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["C", "E", "I"]);
    }

    #[test]
    fn votes_for_foreign_candidates_are_ignored() {
        let candidates = vec![cand(1, 7, "A")];
        let votes = vec![ballot(1, 7, 1), ballot(2, 7, 42)];
        let tally = tally_session(&candidates, &votes);
        assert_eq!(tally.total_votes, 1);
        assert_eq!(tally.rows[0].count, 1);
    }

    #[test]
    fn aggregate_merges_by_name_across_sessions() {
        let s1 = (
            vec![cand(1, 1, "Alice"), cand(2, 1, "Bob")],
            vec![ballot(1, 1, 1), ballot(2, 1, 1)],
        );
        let s2 = (
            vec![cand(10, 2, "Alice")],
            vec![ballot(3, 2, 10), ballot(4, 2, 10), ballot(5, 2, 10)],
        );

        let agg = aggregate(&[s1, s2]);
        assert_eq!(agg.total_votes, 5);
        let alice = agg.rows.iter().find(|r| r.name == "Alice").unwrap();
        assert_eq!(alice.count, 5);
        let bob = agg.rows.iter().find(|r| r.name == "Bob").unwrap();
        assert_eq!(bob.count, 0);
    }
}
