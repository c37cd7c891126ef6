use std::time::Duration;
use tracing::{debug, info, warn};

use crate::dedup;
use crate::llm::{ClassificationReply, EntityMention, LlmProvider};
use crate::model::{content_hash, Category, Entity, EntityKind, ProcessedArticle, RawArticle};

/// Batching of classification calls
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub batch_size: usize,
    /// Pause between two consecutive batches
    pub batch_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_secs(1),
        }
    }
}

/// Deduplicate raw articles, then classify the survivors in batches
pub async fn process_articles<P: LlmProvider + ?Sized>(
    provider: &P,
    articles: Vec<RawArticle>,
    settings: &BatchSettings,
) -> Vec<ProcessedArticle> {
    let deduplicated = dedup::deduplicate(articles);
    enrich_articles(provider, deduplicated, settings).await
}

/// Classify articles in batches. Yields exactly one processed article per input, in input order.
pub async fn enrich_articles<P: LlmProvider + ?Sized>(
    provider: &P,
    articles: Vec<RawArticle>,
    settings: &BatchSettings,
) -> Vec<ProcessedArticle> {
    if articles.is_empty() {
        return Vec::new();
    }

    let batch_size = settings.batch_size.max(1);
    let batch_count = articles.len().div_ceil(batch_size);
    info!("Classifying {} articles in {} batches", articles.len(), batch_count);

    let mut processed = Vec::with_capacity(articles.len());

    for (i, batch) in articles.chunks(batch_size).enumerate() {
        if i > 0 && !settings.batch_delay.is_zero() {
            tokio::time::sleep(settings.batch_delay).await;
        }

        let results = match provider.classify(batch).await {
            Ok(replies) => merge_batch(batch, replies),
            Err(e) => {
                warn!("Error processing batch {}/{}: {:#}, using default classification", i + 1, batch_count, e);
                batch.iter().cloned().map(ProcessedArticle::unclassified).collect()
            }
        };
        processed.extend(results);
    }

    processed
}

/// Apply classification replies to a batch by positional index.
///
/// Articles the reply does not mention keep the default classification;
/// out-of-range and repeated indices are ignored.
pub fn merge_batch(batch: &[RawArticle], replies: Vec<ClassificationReply>) -> Vec<ProcessedArticle> {
    let mut slots: Vec<Option<ClassificationReply>> = vec![None; batch.len()];

    for reply in replies {
        match slots.get_mut(reply.index) {
            Some(slot) if slot.is_none() => *slot = Some(reply),
            Some(_) => debug!("ignoring repeated classification for index {}", reply.index),
            None => debug!("ignoring classification for unknown index {}", reply.index),
        }
    }

    batch
        .iter()
        .zip(slots)
        .map(|(article, slot)| match slot {
            Some(reply) => classified(article.clone(), reply),
            None => {
                warn!("No classification returned for article {}", article.id);
                ProcessedArticle::unclassified(article.clone())
            }
        })
        .collect()
}

fn classified(raw: RawArticle, reply: ClassificationReply) -> ProcessedArticle {
    let language = reply
        .language
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "en".to_string());
    let category = reply
        .category
        .as_deref()
        .map(Category::from_label)
        .unwrap_or(Category::Other);
    let hash = content_hash(&raw.title, &raw.content);

    ProcessedArticle {
        raw,
        language,
        category,
        entities: fold_entities(reply.entities),
        hash,
    }
}

/// Turn oracle mentions into entities, counting repeats of the same (kind, name)
fn fold_entities(mentions: Vec<EntityMention>) -> Vec<Entity> {
    let mut entities: Vec<Entity> = Vec::new();

    for mention in mentions {
        let name = mention.name.trim();
        if name.is_empty() {
            continue;
        }
        let Some(kind) = EntityKind::from_label(&mention.kind) else {
            debug!("dropping entity '{}' with unknown type '{}'", name, mention.kind);
            continue;
        };

        match entities
            .iter_mut()
            .find(|e| e.kind == kind && e.name.to_lowercase() == name.to_lowercase())
        {
            Some(existing) => existing.mentions += 1,
            None => entities.push(Entity {
                kind,
                name: name.to_string(),
                mentions: 1,
            }),
        }
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmRequest, LlmResponse};
    use crate::model::SourceKind;
    use chrono::Utc;
    use std::sync::Mutex;

    fn article(id: &str) -> RawArticle {
        RawArticle {
            id: id.to_string(),
            source: "test".to_string(),
            source_kind: SourceKind::Feed,
            title: format!("Title {}", id),
            content: format!("Content {}", id),
            url: None,
            author: None,
            image_url: None,
            published_at: Utc::now(),
        }
    }

    fn reply(index: usize, category: &str, language: Option<&str>) -> ClassificationReply {
        ClassificationReply {
            index,
            category: Some(category.to_string()),
            language: language.map(str::to_string),
            entities: Vec::new(),
        }
    }

    fn mention(kind: &str, name: &str) -> EntityMention {
        EntityMention {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Classifies everything as world; the call numbers in `fail_calls` fail instead
    struct ScriptedClassifier {
        fail_calls: Vec<usize>,
        batch_sizes: Mutex<Vec<usize>>,
    }

    impl ScriptedClassifier {
        fn failing_on(fail_calls: &[usize]) -> Self {
            Self {
                fail_calls: fail_calls.to_vec(),
                batch_sizes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedClassifier {
        async fn generate(&self, _request: LlmRequest) -> anyhow::Result<LlmResponse> {
            anyhow::bail!("unused")
        }

        async fn classify(&self, batch: &[RawArticle]) -> anyhow::Result<Vec<ClassificationReply>> {
            let call = {
                let mut sizes = self.batch_sizes.lock().unwrap();
                sizes.push(batch.len());
                sizes.len()
            };
            if self.fail_calls.contains(&call) {
                anyhow::bail!("oracle unavailable");
            }
            Ok((0..batch.len()).map(|i| reply(i, "world", Some("en"))).collect())
        }
    }

    fn no_delay(batch_size: usize) -> BatchSettings {
        BatchSettings {
            batch_size,
            batch_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn one_classify_call_per_batch() {
        let provider = ScriptedClassifier::failing_on(&[]);
        let articles: Vec<RawArticle> = (0..12).map(|i| article(&i.to_string())).collect();

        let processed = enrich_articles(&provider, articles, &no_delay(5)).await;

        assert_eq!(*provider.batch_sizes.lock().unwrap(), [5, 5, 2]);
        assert_eq!(processed.len(), 12);
        assert!(processed.iter().all(|p| p.category == Category::World));
        let ids: Vec<String> = processed.iter().map(|p| p.raw.id.clone()).collect();
        let expected: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn failed_batch_next_to_good_ones() {
        let provider = ScriptedClassifier::failing_on(&[2]);
        let articles: Vec<RawArticle> = (0..7).map(|i| article(&i.to_string())).collect();

        let processed = enrich_articles(&provider, articles, &no_delay(3)).await;

        assert_eq!(processed.len(), 7);
        let categories: Vec<Category> = processed.iter().map(|p| p.category).collect();
        assert_eq!(
            categories,
            [
                Category::World,
                Category::World,
                Category::World,
                Category::Other,
                Category::Other,
                Category::Other,
                Category::World,
            ]
        );
        assert_eq!(processed[4].hash, content_hash("Title 4", "Content 4"));
        assert_eq!(processed[4].language, "en");
    }

    #[tokio::test]
    async fn zero_batch_size_classifies_one_at_a_time() {
        let provider = ScriptedClassifier::failing_on(&[]);
        let articles = vec![article("a"), article("b"), article("c")];

        let processed = enrich_articles(&provider, articles, &no_delay(0)).await;

        assert_eq!(*provider.batch_sizes.lock().unwrap(), [1, 1, 1]);
        assert_eq!(processed.len(), 3);
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let provider = ScriptedClassifier::failing_on(&[]);
        assert!(enrich_articles(&provider, Vec::new(), &no_delay(5)).await.is_empty());
        assert!(provider.batch_sizes.lock().unwrap().is_empty());
    }

    #[test]
    fn merge_by_index_out_of_order() {
        let batch = vec![article("a"), article("b")];
        let merged = merge_batch(
            &batch,
            vec![reply(1, "Sports", Some("es")), reply(0, " technology ", None)],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].raw.id, "a");
        assert_eq!(merged[0].category, Category::Technology);
        assert_eq!(merged[0].language, "en");
        assert_eq!(merged[1].category, Category::Sports);
        assert_eq!(merged[1].language, "es");
        assert_eq!(merged[1].hash, content_hash("Title b", "Content b"));
    }

    #[test]
    fn missing_and_bogus_indices_keep_cardinality() {
        let batch = vec![article("a"), article("b"), article("c")];
        let merged = merge_batch(
            &batch,
            vec![reply(1, "science", Some("fr")), reply(1, "health", None), reply(9, "world", None)],
        );

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].category, Category::Other);
        assert_eq!(merged[1].category, Category::Science);
        assert_eq!(merged[2].category, Category::Other);
        assert!(merged[2].entities.is_empty());
    }

    #[test]
    fn unknown_category_maps_to_other() {
        let merged = merge_batch(&[article("a")], vec![reply(0, "finance", Some("en"))]);
        assert_eq!(merged[0].category, Category::Other);
    }

    #[test]
    fn entities_are_folded() {
        let entities = fold_entities(vec![
            mention("person", "Ada Lovelace"),
            mention("organization", "Acme"),
            mention("Person", "ada lovelace"),
            mention("planet", "Mars"),
            mention("location", "  "),
        ]);

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].name, "Ada Lovelace");
        assert_eq!(entities[0].mentions, 2);
        assert_eq!(entities[1].kind, EntityKind::Organization);
        assert_eq!(entities[1].mentions, 1);
    }
}
