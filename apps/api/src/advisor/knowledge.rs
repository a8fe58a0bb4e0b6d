//! Knowledge retrieval for education-mode conversations.
//!
//! Two tiers: a semantic-similarity collaborator behind the
//! `SemanticSearch` trait (an external vector store — opaque to this
//! service), and an in-database keyword fallback over knowledge documents
//! and published articles. Failures degrade to the next tier and finally to
//! an explicit "nothing found" note; nothing here ever raises out of the
//! composer.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;

use crate::advisor::prompts::{KNOWLEDGE_CONTEXT_HEADER, NO_KNOWLEDGE_FOUND};
use crate::models::knowledge::{Article, KnowledgeDocument};

const MAX_RESULTS: i64 = 3;
const SNIPPET_LEN: usize = 300;

/// A retrieved knowledge snippet, from either search tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub title: String,
    pub content: String,
    pub source: String,
    /// "knowledge_document" or "article".
    pub doc_type: String,
    /// Similarity in [0, 1]; keyword hits carry 0 and omit the line.
    pub relevance_score: f32,
}

/// Semantic-similarity collaborator. Carried in `AppState` as
/// `Arc<dyn SemanticSearch>` so the backend can be swapped without touching
/// the composer.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<KnowledgeHit>>;
}

/// Default backend: no vector store attached, always empty. Education mode
/// then runs on the keyword fallback alone.
pub struct DisabledSemanticSearch;

#[async_trait]
impl SemanticSearch for DisabledSemanticSearch {
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<KnowledgeHit>> {
        Ok(Vec::new())
    }
}

/// Lowercased search terms: the first 3 whitespace-separated tokens.
pub fn search_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .take(3)
        .map(String::from)
        .collect()
}

fn snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_LEN {
        let cut: String = text.chars().take(SNIPPET_LEN).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Substring search over document/article titles and bodies. Returns at
/// most 3 hits; any database error degrades to an empty result.
pub async fn keyword_search(pool: &PgPool, query: &str) -> Vec<KnowledgeHit> {
    let terms = search_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    match keyword_search_inner(pool, &terms).await {
        Ok(hits) => hits,
        Err(e) => {
            warn!("Knowledge base keyword search failed: {e}");
            Vec::new()
        }
    }
}

async fn keyword_search_inner(pool: &PgPool, terms: &[String]) -> Result<Vec<KnowledgeHit>> {
    let patterns: Vec<String> = terms.iter().map(|t| format!("%{t}%")).collect();

    // Documents match on ANY term, like the original OR-joined filter.
    let docs: Vec<KnowledgeDocument> = sqlx::query_as(
        r#"
        SELECT *
        FROM knowledge_documents
        WHERE title ILIKE ANY($1) OR raw_text_content ILIKE ANY($1)
        LIMIT $2
        "#,
    )
    .bind(&patterns)
    .bind(MAX_RESULTS)
    .fetch_all(pool)
    .await?;

    let mut hits: Vec<KnowledgeHit> = docs
        .into_iter()
        .map(|doc| KnowledgeHit {
            title: doc.title,
            content: snippet(&doc.raw_text_content),
            source: doc.source_url.unwrap_or_default(),
            doc_type: "document".to_string(),
            relevance_score: 0.0,
        })
        .collect();

    if (hits.len() as i64) < MAX_RESULTS {
        let remaining = MAX_RESULTS - hits.len() as i64;
        // Published articles must match EVERY term.
        let articles: Vec<Article> = sqlx::query_as(
            r#"
            SELECT *
            FROM articles
            WHERE is_published = TRUE
              AND (title || ' ' || content) ILIKE ALL($1)
            LIMIT $2
            "#,
        )
        .bind(&patterns)
        .bind(remaining)
        .fetch_all(pool)
        .await?;

        hits.extend(articles.into_iter().map(|article| KnowledgeHit {
            title: article.title,
            content: snippet(&article.content),
            source: format!("/articles/{}", article.slug),
            doc_type: "article".to_string(),
            relevance_score: 0.0,
        }));
    }

    Ok(hits)
}

/// Formats hits into the labeled context block appended to education
/// prompts. Empty input yields the explicit "nothing found" note instead of
/// silence.
pub fn format_knowledge_context(hits: &[KnowledgeHit]) -> String {
    if hits.is_empty() {
        return NO_KNOWLEDGE_FOUND.to_string();
    }

    let mut context = KNOWLEDGE_CONTEXT_HEADER.to_string();
    for (i, hit) in hits.iter().enumerate() {
        context.push_str(&format!(
            "\n{}. [{}] {}\n   {}\n",
            i + 1,
            hit.doc_type.to_uppercase(),
            hit.title,
            hit.content
        ));
        if !hit.source.is_empty() {
            context.push_str(&format!("   Джерело: {}\n", hit.source));
        }
        if hit.relevance_score > 0.0 {
            context.push_str(&format!(
                "   Релевантність: {:.0}%\n",
                hit.relevance_score * 100.0
            ));
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, doc_type: &str, score: f32) -> KnowledgeHit {
        KnowledgeHit {
            title: title.to_string(),
            content: "зміст".to_string(),
            source: "/articles/test".to_string(),
            doc_type: doc_type.to_string(),
            relevance_score: score,
        }
    }

    #[test]
    fn test_search_terms_takes_first_three_lowercased() {
        assert_eq!(
            search_terms("Курси Веб-розробки для ветеранів онлайн"),
            vec!["курси", "веб-розробки", "для"]
        );
        assert!(search_terms("   ").is_empty());
    }

    #[test]
    fn test_snippet_truncates_at_300_chars() {
        let long = "х".repeat(400);
        let s = snippet(&long);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), 303);

        assert_eq!(snippet("коротко"), "коротко");
    }

    #[test]
    fn test_format_context_labels_hits() {
        let ctx = format_knowledge_context(&[
            hit("Основи Python", "article", 0.87),
            hit("Довідник", "document", 0.0),
        ]);
        assert!(ctx.contains("РЕЛЕВАНТНІ МАТЕРІАЛИ"));
        assert!(ctx.contains("[ARTICLE] Основи Python"));
        assert!(ctx.contains("Релевантність: 87%"));
        assert!(ctx.contains("[DOCUMENT] Довідник"));
    }

    #[test]
    fn test_format_context_empty_inserts_note() {
        let ctx = format_knowledge_context(&[]);
        assert!(ctx.contains("не знайдено"));
    }

    #[tokio::test]
    async fn test_disabled_semantic_search_is_empty() {
        let hits = DisabledSemanticSearch
            .search("будь-що", 3)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
