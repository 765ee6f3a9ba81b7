//! Relevance scoring: stage 1 of the analysis pipeline.
//!
//! score = 0.4·title + 0.3·abstract + 0.2·recency + 0.1·citations, with
//! every sub-score pre-normalized to [0, 1] and the final value clamped.
//! Deterministic; no external calls.

use crate::types::{Paper, RelevanceScore};
use chrono::Datelike;
use std::collections::HashSet;

const TITLE_WEIGHT: f32 = 0.4;
const ABSTRACT_WEIGHT: f32 = 0.3;
const RECENCY_WEIGHT: f32 = 0.2;
const CITATION_WEIGHT: f32 = 0.1;

/// Citation count at which the citation sub-score saturates.
const CITATION_SATURATION: f32 = 100.0;

/// A paper paired with its stage-1 score.
#[derive(Debug, Clone)]
pub struct ScoredPaper {
    pub paper: Paper,
    pub score: RelevanceScore,
}

/// Scores one paper against the query, using the current year as the
/// recency reference.
pub fn score_paper(paper: &Paper, query: &str) -> RelevanceScore {
    score_paper_at(paper, query, chrono::Utc::now().year())
}

/// Scores with an explicit reference year; split out so scoring stays
/// reproducible in tests.
pub fn score_paper_at(paper: &Paper, query: &str, reference_year: i32) -> RelevanceScore {
    let lowered_query = query.to_lowercase();
    let query_terms: HashSet<&str> = lowered_query
        .split_whitespace()
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|s| !s.is_empty())
        .collect();

    let title_match = term_overlap(&paper.title, &query_terms);
    let abstract_match = term_overlap(&paper.summary, &query_terms);

    let recency = match paper.year {
        Some(year) if year >= reference_year - 2 => 1.0,
        Some(year) if year >= reference_year - 5 => 0.5,
        _ => 0.0,
    };

    let citation = paper
        .citations
        .map(|c| (c as f32 / CITATION_SATURATION).min(1.0))
        .unwrap_or(0.0);

    let score = (TITLE_WEIGHT * title_match
        + ABSTRACT_WEIGHT * abstract_match
        + RECENCY_WEIGHT * recency
        + CITATION_WEIGHT * citation)
        .clamp(0.0, 1.0);

    RelevanceScore {
        paper_id: paper.id(),
        score,
        title_match,
        abstract_match,
        recency,
        citation,
    }
}

/// Fraction of query terms present in `text`, in [0, 1].
fn term_overlap(text: &str, query_terms: &HashSet<&str>) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let lowered = text.to_lowercase();
    let text_terms: HashSet<String> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect();
    let matched = query_terms
        .iter()
        .filter(|t| text_terms.contains(**t))
        .count();
    matched as f32 / query_terms.len() as f32
}

/// Scores and orders papers: descending by score, ties broken by citation
/// count, then by original aggregation order. Stable across runs.
pub fn rank_papers(papers: Vec<Paper>, query: &str) -> Vec<ScoredPaper> {
    rank_papers_at(papers, query, chrono::Utc::now().year())
}

pub fn rank_papers_at(papers: Vec<Paper>, query: &str, reference_year: i32) -> Vec<ScoredPaper> {
    let mut indexed: Vec<(usize, ScoredPaper)> = papers
        .into_iter()
        .enumerate()
        .map(|(i, paper)| {
            let score = score_paper_at(&paper, query, reference_year);
            (i, ScoredPaper { paper, score })
        })
        .collect();

    indexed.sort_by(|(ai, a), (bi, b)| {
        b.score
            .score
            .total_cmp(&a.score.score)
            .then_with(|| {
                b.paper
                    .citations
                    .unwrap_or(0)
                    .cmp(&a.paper.citations.unwrap_or(0))
            })
            .then_with(|| ai.cmp(bi))
    });

    indexed.into_iter().map(|(_, scored)| scored).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn paper(title: &str, summary: &str, year: Option<i32>, citations: Option<u64>) -> Paper {
        Paper {
            title: title.to_string(),
            authors: vec![],
            summary: summary.to_string(),
            year,
            citations,
            source: "arxiv".to_string(),
            url: String::new(),
        }
    }

    #[test]
    fn test_all_subscores_zero_gives_zero() {
        let p = paper("unrelated topic entirely", "nothing in common", None, None);
        let score = score_paper_at(&p, "transformer models", 2026);
        assert_eq!(score.title_match, 0.0);
        assert_eq!(score.abstract_match, 0.0);
        assert_eq!(score.recency, 0.0);
        assert_eq!(score.citation, 0.0);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_all_subscores_one_gives_one() {
        let p = paper(
            "transformer models",
            "transformer models everywhere",
            Some(2026),
            Some(500),
        );
        let score = score_paper_at(&p, "transformer models", 2026);
        assert_eq!(score.title_match, 1.0);
        assert_eq!(score.abstract_match, 1.0);
        assert_eq!(score.recency, 1.0);
        assert_eq!(score.citation, 1.0);
        assert!((score.score - 1.0).abs() < 1e-6);
    }

    #[rstest]
    #[case(Some(2026), 1.0)]
    #[case(Some(2024), 1.0)]
    #[case(Some(2023), 0.5)]
    #[case(Some(2021), 0.5)]
    #[case(Some(2019), 0.0)]
    #[case(None, 0.0)]
    fn test_recency_tiers(#[case] year: Option<i32>, #[case] expected: f32) {
        let p = paper("t", "s", year, None);
        let score = score_paper_at(&p, "q", 2026);
        assert_eq!(score.recency, expected);
    }

    #[rstest]
    #[case(Some(0), 0.0)]
    #[case(Some(50), 0.5)]
    #[case(Some(100), 1.0)]
    #[case(Some(10_000), 1.0)]
    #[case(None, 0.0)]
    fn test_citation_saturates(#[case] citations: Option<u64>, #[case] expected: f32) {
        let p = paper("t", "s", None, citations);
        let score = score_paper_at(&p, "q", 2026);
        assert_eq!(score.citation, expected);
    }

    #[test]
    fn test_score_stays_in_unit_interval() {
        let p = paper(
            "transformer transformer transformer",
            "transformer",
            Some(2026),
            Some(1_000_000),
        );
        let score = score_paper_at(&p, "transformer", 2026);
        assert!(score.score >= 0.0 && score.score <= 1.0);
    }

    #[test]
    fn test_ranking_ties_broken_by_citations_then_order() {
        let papers = vec![
            paper("same title words", "same summary", Some(2019), Some(10)),
            paper("same title words", "same summary", Some(2019), Some(90)),
            paper("same title words", "same summary", Some(2019), Some(10)),
        ];
        let first_id = papers[0].id();
        let ranked = rank_papers_at(papers, "unmatched query", 2026);

        // Highest citations first; equal-citation papers keep aggregation order.
        assert_eq!(ranked[0].paper.citations, Some(90));
        assert_eq!(ranked[1].paper.id(), first_id);
        assert_eq!(ranked[1].paper.citations, Some(10));
    }

    #[test]
    fn test_ranking_descending_by_score() {
        let papers = vec![
            paper("nothing relevant", "blank", None, None),
            paper("transformer models for nlp", "transformer models", Some(2026), Some(200)),
        ];
        let ranked = rank_papers_at(papers, "transformer models", 2026);
        assert!(ranked[0].score.score > ranked[1].score.score);
        assert_eq!(ranked[0].paper.title, "transformer models for nlp");
    }
}
