use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Kind of source an article was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,
    Site,
    Channel,
}

/// Article as produced by a collector, before any processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub id: String,
    pub source: String,
    pub source_kind: SourceKind,
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Closed set of digest categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    World,
    Politics,
    Technology,
    Business,
    Science,
    Health,
    Sports,
    Entertainment,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::World,
        Category::Politics,
        Category::Technology,
        Category::Business,
        Category::Science,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::World => "world",
            Category::Politics => "politics",
            Category::Technology => "technology",
            Category::Business => "business",
            Category::Science => "science",
            Category::Health => "health",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::Other => "other",
        }
    }

    /// Marker shown next to the section title
    pub fn marker(self) -> &'static str {
        match self {
            Category::World => "🌍",
            Category::Politics => "🏛️",
            Category::Technology => "💻",
            Category::Business => "💼",
            Category::Science => "🔬",
            Category::Health => "🏥",
            Category::Sports => "⚽",
            Category::Entertainment => "🎬",
            Category::Other => "📰",
        }
    }

    /// Lenient parse of an oracle-provided label. Anything outside the set is `Other`.
    pub fn from_label(label: &str) -> Category {
        let normalized = label.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Organization,
    Location,
    Event,
}

impl EntityKind {
    pub fn from_label(label: &str) -> Option<EntityKind> {
        match label.trim().to_lowercase().as_str() {
            "person" => Some(EntityKind::Person),
            "organization" | "organisation" => Some(EntityKind::Organization),
            "location" => Some(EntityKind::Location),
            "event" => Some(EntityKind::Event),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub name: String,
    pub mentions: u32,
}

/// Raw article enriched with classification data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedArticle {
    #[serde(flatten)]
    pub raw: RawArticle,
    pub language: String,
    pub category: Category,
    pub entities: Vec<Entity>,
    pub hash: String,
}

impl ProcessedArticle {
    /// Article with the default classification: `other`, English, no entities
    pub fn unclassified(raw: RawArticle) -> Self {
        let hash = content_hash(&raw.title, &raw.content);
        Self {
            raw,
            language: "en".to_string(),
            category: Category::Other,
            entities: Vec::new(),
            hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub article_id: String,
    pub headline: String,
    pub synopsis: String,
    pub key_points: Vec<String>,
    /// 1 (minor) to 10 (major)
    pub importance: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Verified,
    Unverified,
    Disputed,
    False,
}

impl Verdict {
    pub fn from_label(label: &str) -> Verdict {
        match label.trim().to_lowercase().as_str() {
            "verified" => Verdict::Verified,
            "disputed" => Verdict::Disputed,
            "false" => Verdict::False,
            _ => Verdict::Unverified,
        }
    }

    /// Disputed and false claims put a warning on the article
    pub fn is_contested(self) -> bool {
        matches!(self, Verdict::Disputed | Verdict::False)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheck {
    pub claim: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub explanation: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedArticle {
    #[serde(flatten)]
    pub article: ProcessedArticle,
    pub summary: ArticleSummary,
    pub fact_checks: Vec<FactCheck>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactCheckStatus {
    Verified,
    Warning,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestArticle {
    pub headline: String,
    pub summary: String,
    pub fact_check_status: FactCheckStatus,
    pub fact_check_note: Option<String>,
    pub sources: Vec<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestSection {
    pub category: Category,
    pub marker: String,
    pub articles: Vec<DigestArticle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestStats {
    pub total_articles: usize,
    pub fact_checks_performed: usize,
    pub categories_covered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDigest {
    pub date: DateTime<Utc>,
    pub sections: Vec<DigestSection>,
    pub stats: DigestStats,
}

/// SHA-256 hex of title followed by content
pub fn content_hash(title: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
