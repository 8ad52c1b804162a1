//! Context assembly for the completion model
//!
//! Serializes a prefix of the merged candidate list into a bounded text
//! block of labeled Q/A pairs.

use crate::fusion::RankedRecord;

/// Placeholder returned when no candidate fits the budget
///
/// Callers treat this as "proceed without context", not as an error.
pub const NO_CONTEXT: &str = "(no context)";

/// Build the model context from ranked candidates
///
/// Appends `Q:`/`A:` blocks in rank order while the cumulative length stays
/// within `max_chars`; stops before the first block that would exceed the
/// budget rather than truncating it mid-block. At most `max_items` blocks.
pub fn build_context(ranked: &[RankedRecord], max_items: usize, max_chars: usize) -> String {
    let mut out = String::new();

    for candidate in ranked.iter().take(max_items) {
        let answer = candidate.record.first_answer().unwrap_or("");
        let block = format!("Q: {}\nA: {}\n\n", candidate.record.question, answer);

        if out.len() + block.len() > max_chars {
            break;
        }
        out.push_str(&block);
    }

    if out.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Record;
    use crate::matchers::MatchSource;

    fn candidate(question: &str, answer: &str) -> RankedRecord {
        RankedRecord {
            record: Record {
                question: question.into(),
                answers: vec![answer.into()],
                embedding: vec![],
            },
            score: 1.0,
            source: MatchSource::Lexical,
        }
    }

    #[test]
    fn test_blocks_in_rank_order() {
        let ranked = vec![candidate("first?", "one"), candidate("second?", "two")];
        let ctx = build_context(&ranked, 8, 1800);
        assert_eq!(ctx, "Q: first?\nA: one\n\nQ: second?\nA: two\n\n");
    }

    #[test]
    fn test_char_budget_stops_between_blocks() {
        let ranked = vec![
            candidate("short?", "yes"),
            candidate("a much longer question that will not fit?", "a long answer too"),
        ];
        let first_block_len = "Q: short?\nA: yes\n\n".len();
        let ctx = build_context(&ranked, 8, first_block_len + 5);

        // Second block skipped whole, never truncated mid-block
        assert_eq!(ctx, "Q: short?\nA: yes\n\n");
    }

    #[test]
    fn test_max_items_cap() {
        let ranked: Vec<RankedRecord> = (0..20)
            .map(|i| candidate(&format!("q{}?", i), "a"))
            .collect();
        let ctx = build_context(&ranked, 3, 10_000);
        assert_eq!(ctx.matches("Q: ").count(), 3);
    }

    #[test]
    fn test_empty_candidates_yield_sentinel() {
        assert_eq!(build_context(&[], 8, 1800), NO_CONTEXT);
    }

    #[test]
    fn test_budget_too_small_yields_sentinel() {
        let ranked = vec![candidate("question?", "answer")];
        assert_eq!(build_context(&ranked, 8, 4), NO_CONTEXT);
    }
}
