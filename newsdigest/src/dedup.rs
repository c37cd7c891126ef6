// Title-based near-duplicate removal
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::model::RawArticle;
use crate::similarity::{normalize_text, normalized_similarity};

/// Titles scoring strictly above this are the same story
pub const DUPLICATE_THRESHOLD: f64 = 0.8;

struct Representative {
    key: String,
    normalized_title: String,
    article: RawArticle,
}

/// Collapse near-duplicate articles, keeping the variant with the longest content.
///
/// Each article is compared against every current representative. The first
/// representative whose normalized title scores above [`DUPLICATE_THRESHOLD`]
/// absorbs it: strictly longer content replaces the kept article in place,
/// otherwise the incoming one is dropped. Surviving articles keep the position
/// where their story was first seen.
///
/// A replacement changes the title its slot is compared by, so the slot is
/// re-checked against the other representatives and any it now matches are
/// folded into the earlier slot. Output titles are pairwise at or below the
/// threshold, which makes the function idempotent.
pub fn deduplicate(articles: Vec<RawArticle>) -> Vec<RawArticle> {
    let input_count = articles.len();
    let mut kept: Vec<Representative> = Vec::new();

    for article in articles {
        let normalized_title = normalize_text(&article.title);

        let duplicate_of = kept
            .iter()
            .position(|rep| normalized_similarity(&normalized_title, &rep.normalized_title) > DUPLICATE_THRESHOLD);

        match duplicate_of {
            Some(idx) => {
                let rep = &mut kept[idx];
                if is_richer(&article, &rep.article) {
                    debug!(
                        "dedup: '{}' replaces '{}' in slot {} (richer content)",
                        article.title, rep.article.title, rep.key
                    );
                    rep.normalized_title = normalized_title;
                    rep.article = article;
                    settle(&mut kept, idx);
                } else {
                    debug!("dedup: dropping '{}' as duplicate of '{}'", article.title, rep.article.title);
                }
            }
            None => {
                kept.push(Representative {
                    key: title_key(&normalized_title),
                    normalized_title,
                    article,
                });
            }
        }
    }

    info!("Deduplicated: {} -> {} articles", input_count, kept.len());
    kept.into_iter().map(|rep| rep.article).collect()
}

/// Fold every representative the slot at `idx` matches, repeating while the
/// surviving title keeps changing
fn settle(kept: &mut Vec<Representative>, mut idx: usize) {
    while let Some(other) = (0..kept.len()).find(|&j| {
        j != idx && normalized_similarity(&kept[idx].normalized_title, &kept[j].normalized_title) > DUPLICATE_THRESHOLD
    }) {
        let (first, second) = (idx.min(other), idx.max(other));
        let absorbed = kept.remove(second);
        let survivor = &mut kept[first];
        debug!(
            "dedup: folding '{}' into slot {} ('{}')",
            absorbed.article.title, survivor.key, survivor.article.title
        );
        if is_richer(&absorbed.article, &survivor.article) {
            survivor.normalized_title = absorbed.normalized_title;
            survivor.article = absorbed.article;
        }
        idx = first;
    }
}

fn is_richer(candidate: &RawArticle, kept: &RawArticle) -> bool {
    candidate.content.chars().count() > kept.content.chars().count()
}

fn title_key(normalized_title: &str) -> String {
    let digest = Sha256::digest(normalized_title.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceKind;
    use chrono::Utc;

    fn article(id: &str, title: &str, content: &str) -> RawArticle {
        RawArticle {
            id: id.to_string(),
            source: "test".to_string(),
            source_kind: SourceKind::Feed,
            title: title.to_string(),
            content: content.to_string(),
            url: None,
            author: None,
            image_url: None,
            published_at: Utc::now(),
        }
    }

    fn ids(articles: &[RawArticle]) -> Vec<&str> {
        articles.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn shorter_duplicate_is_dropped() {
        let out = deduplicate(vec![
            article("a", "Breaking: Market Crashes Today", "long content with plenty of detail"),
            article("b", "Breaking Market Crashes Today", "short"),
        ]);
        assert_eq!(ids(&out), ["a"]);
    }

    #[test]
    fn richer_duplicate_replaces_in_place() {
        let out = deduplicate(vec![
            article("a", "Breaking: Market Crashes Today", "short"),
            article("x", "Local team wins the cup", "sports"),
            article("b", "Breaking Market Crashes Today", "much longer content than the first one"),
        ]);
        assert_eq!(ids(&out), ["b", "x"]);
    }

    #[test]
    fn equal_length_keeps_first() {
        let out = deduplicate(vec![
            article("a", "Storm hits the coast", "12345"),
            article("b", "Storm hits the coast!", "abcde"),
        ]);
        assert_eq!(ids(&out), ["a"]);
    }

    #[test]
    fn exact_threshold_is_not_a_duplicate() {
        // 4 shared words out of 5 distinct: similarity == 0.8
        let out = deduplicate(vec![
            article("a", "alpha beta gamma delta epsilon", "x"),
            article("b", "alpha beta gamma delta", "xx"),
        ]);
        assert_eq!(ids(&out), ["a", "b"]);
    }

    #[test]
    fn distinct_titles_keep_arrival_order() {
        let out = deduplicate(vec![
            article("1", "Election results announced", ""),
            article("2", "New phone released", ""),
            article("3", "Vaccine trial succeeds", ""),
        ]);
        assert_eq!(ids(&out), ["1", "2", "3"]);
    }

    #[test]
    fn idempotent() {
        let input = vec![
            article("a", "Breaking: Market Crashes Today", "short"),
            article("b", "Breaking Market Crashes Today", "longer content"),
            article("c", "Central bank raises rates", "text"),
            article("d", "Central bank raises rates again", "text"),
            article("e", "Scientists find water on Mars", "text"),
        ];
        let once = deduplicate(input);
        let twice = deduplicate(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn replacement_that_matches_a_later_story_folds_it() {
        // "k" matches the first slot (0.82) and, once it replaces it, the second (0.91)
        let input = vec![
            article("a", "a b c d e f g h i j", "short"),
            article("r", "a b c d e f g h i k l", "medium body"),
            article("k", "a b c d e f g h i k", "the longest body of the three"),
        ];

        let once = deduplicate(input);
        assert_eq!(ids(&once), ["k"]);
        assert_eq!(deduplicate(once.clone()), once);
    }

    #[test]
    fn folded_story_keeps_richer_content_and_earliest_slot() {
        let input = vec![
            article("a", "a b c d e f g h i j", "x"),
            article("other", "Unrelated weather report", "rain"),
            article("r", "a b c d e f g h i k l", "the richest body of all of them"),
            article("k", "a b c d e f g h i k", "middle body"),
        ];

        let once = deduplicate(input);
        assert_eq!(ids(&once), ["r", "other"]);
        assert_eq!(deduplicate(once.clone()), once);
    }

    #[test]
    fn output_titles_are_pairwise_distinct() {
        let titles = [
            "a b c d e f g h i j",
            "a b c d e f g h i k l",
            "a b c d e f g h i k",
            "a b c d e f g h x y",
            "a b c d e f g h x",
            "a b c d e f g h i j k",
        ];
        let input: Vec<RawArticle> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| article(&i.to_string(), t, &"z".repeat(i + 1)))
            .collect();

        let out = deduplicate(input);
        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                assert!(crate::similarity::similarity(&a.title, &b.title) <= DUPLICATE_THRESHOLD);
            }
        }
        assert_eq!(deduplicate(out.clone()), out);
    }

    #[test]
    fn empty_input() {
        assert!(deduplicate(Vec::new()).is_empty());
    }
}
