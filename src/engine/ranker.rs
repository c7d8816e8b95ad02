//! Similarity fallback: rank the full catalog against the collected answers.
//!
//! Used only when every attribute has been asked and several fish remain.
//! The ranking source is always the whole [`CandidateStore`], never the
//! narrowed candidate set, so an over-eager earlier filter cannot leave the
//! user with nothing.

use std::sync::Arc;

use crate::catalog::{AttributeCatalog, CandidateRecord, CandidateStore};
use crate::llm::{GatewayError, LanguageModelGateway, PromptBuilder};

use super::session::CollectedAnswer;

/// Cosine similarity in `[-1, 1]`. Mismatched lengths and zero vectors
/// score `0.0`; vectors holding NaN or infinite components score `-1.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if !norm_a.is_finite() || !norm_b.is_finite() {
        return -1.0;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot_product / (norm_a * norm_b);
    if score.is_finite() {
        // Adding zero folds -0.0 into 0.0 so both tie under `total_cmp`.
        score + 0.0
    } else {
        -1.0
    }
}

/// `"attribute: value"` pairs in catalog order, joined by `", "`.
///
/// Skipped attributes read `"attribute: not given"`; attributes that were
/// never asked are left out.
pub fn composite_description(catalog: &AttributeCatalog, answers: &[CollectedAnswer]) -> String {
    catalog
        .iter()
        .filter_map(|attr| {
            answers
                .iter()
                .find(|a| a.attribute == attr)
                .map(|a| format!("{attr}: {}", a.answer))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// EmbeddingIndex
// ---------------------------------------------------------------------------

/// One embedding per store record, aligned by index.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    /// Embed every record's description. Records that already carry an
    /// embedding are not sent to the gateway.
    pub async fn build(
        store: &CandidateStore,
        gateway: &dyn LanguageModelGateway,
    ) -> Result<Self, GatewayError> {
        let mut vectors = Vec::with_capacity(store.len());
        let mut requested = 0usize;

        for record in store.records() {
            let vector = match &record.embedding {
                Some(v) => v.clone(),
                None => {
                    requested += 1;
                    gateway.embed(&record.describe(store.catalog())).await?
                }
            };
            vectors.push(vector);
        }

        log::info!(
            "ranker: embedding index ready ({} records, {requested} gateway calls)",
            vectors.len()
        );
        Ok(Self { vectors })
    }

    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Self {
        Self { vectors }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// `(record index, similarity)` of the `k` best records, best first.
    /// Equal scores keep catalog order.
    pub fn rank(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(v, query)))
            .collect();

        // Scores are finite here, so `total_cmp` matches numeric order.
        // `sort_by` is stable: ties stay in index order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}

// ---------------------------------------------------------------------------
// RankedMatch
// ---------------------------------------------------------------------------

/// One fallback result.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch {
    pub record: CandidateRecord,
    pub similarity: f32,
    /// Why this fish fits; `None` when the justification request failed.
    pub explanation: Option<String>,
}

impl RankedMatch {
    /// Similarity rounded to two decimals for display.
    pub fn similarity_label(&self) -> String {
        format!("{:.2}", self.similarity)
    }
}

// ---------------------------------------------------------------------------
// SimilarityRanker
// ---------------------------------------------------------------------------

pub struct SimilarityRanker {
    store: Arc<CandidateStore>,
    index: EmbeddingIndex,
    gateway: Arc<dyn LanguageModelGateway>,
    prompts: PromptBuilder,
    top_k: usize,
}

impl SimilarityRanker {
    pub fn new(
        store: Arc<CandidateStore>,
        index: EmbeddingIndex,
        gateway: Arc<dyn LanguageModelGateway>,
        prompts: PromptBuilder,
        top_k: usize,
    ) -> Self {
        if index.len() != store.len() {
            log::warn!(
                "ranker: index has {} vectors for {} records",
                index.len(),
                store.len()
            );
        }
        Self {
            store,
            index,
            gateway,
            prompts,
            top_k,
        }
    }

    /// Build the index through the gateway, then the ranker.
    pub async fn build(
        store: Arc<CandidateStore>,
        gateway: Arc<dyn LanguageModelGateway>,
        prompts: PromptBuilder,
        top_k: usize,
    ) -> Result<Self, GatewayError> {
        let index = EmbeddingIndex::build(&store, gateway.as_ref()).await?;
        Ok(Self::new(store, index, gateway, prompts, top_k))
    }

    /// Rank the full catalog against `answers` and justify each match.
    ///
    /// Fails only when the composite description cannot be embedded;
    /// justification failures just leave `explanation` empty.
    pub async fn rank_answers(&self, answers: &[CollectedAnswer]) -> Result<Vec<RankedMatch>, GatewayError> {
        let composite = composite_description(self.store.catalog(), answers);
        log::debug!("ranker: composite description '{composite}'");

        let query = self.gateway.embed(&composite).await?;

        let mut matches = Vec::with_capacity(self.top_k);
        for (index, similarity) in self.index.rank(&query, self.top_k) {
            let Some(record) = self.store.get(index) else {
                continue;
            };

            let candidate = record.describe(self.store.catalog());
            let (system, user) = self.prompts.justification(&composite, &candidate);
            let explanation = match self.gateway.complete(&system, &user).await {
                Ok(text) => Some(text),
                Err(e) => {
                    log::warn!("ranker: justification for '{}' failed: {e}", record.name);
                    None
                }
            };

            matches.push(RankedMatch {
                record: record.clone(),
                similarity,
                explanation,
            });
        }

        Ok(matches)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::session::Answer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn catalog() -> AttributeCatalog {
        AttributeCatalog::new(["habitat", "form"]).unwrap()
    }

    fn answer(attribute: &str, answer: Answer) -> CollectedAnswer {
        CollectedAnswer {
            attribute: attribute.into(),
            answer,
        }
    }

    /// Embeds every text as a fixed vector; justification fails for "B".
    struct FixedGateway {
        query: Vec<f32>,
        embed_calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModelGateway for FixedGateway {
        async fn complete(&self, _system: &str, user: &str) -> Result<String, GatewayError> {
            if user.contains("form: round") {
                Err(GatewayError::Timeout)
            } else {
                Ok("fits well".into())
            }
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, GatewayError> {
            self.embed_calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.query.clone())
        }
    }

    fn store() -> Arc<CandidateStore> {
        Arc::new(CandidateStore::new(
            catalog(),
            vec![
                CandidateRecord::new("A")
                    .with_attribute("habitat", "fresh")
                    .with_attribute("form", "slim")
                    .with_embedding(vec![1.0, 0.0]),
                CandidateRecord::new("B")
                    .with_attribute("habitat", "fresh")
                    .with_attribute("form", "round")
                    .with_embedding(vec![0.0, 1.0]),
                CandidateRecord::new("C")
                    .with_attribute("habitat", "salt")
                    .with_attribute("form", "slim")
                    .with_embedding(vec![0.7, 0.7]),
                CandidateRecord::new("D")
                    .with_attribute("habitat", "salt")
                    .with_attribute("form", "round")
                    .with_embedding(vec![-1.0, 0.0]),
            ],
        ))
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn composite_follows_catalog_order() {
        let answers = vec![
            answer("form", Answer::NotGiven),
            answer("habitat", Answer::Value("fresh".into())),
        ];
        assert_eq!(
            composite_description(&catalog(), &answers),
            "habitat: fresh, form: not given"
        );
    }

    #[test]
    fn ties_keep_catalog_order() {
        let index = EmbeddingIndex::from_vectors(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![0.5, 0.0],
        ]);
        let ranked = index.rank(&[1.0, 0.0], 3);
        let order: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn non_finite_embeddings_rank_last() {
        let mut vectors: Vec<Vec<f32>> = (0..24).map(|i| vec![1.0, i as f32]).collect();
        vectors[3] = vec![f32::NAN, 1.0];
        vectors[7] = vec![f32::INFINITY, 0.0];
        vectors[11] = vec![f32::NEG_INFINITY, 1.0];
        let index = EmbeddingIndex::from_vectors(vectors);

        let ranked = index.rank(&[1.0, 0.0], 24);
        assert_eq!(ranked.len(), 24);
        assert_eq!(ranked[0].0, 0);
        let tail: Vec<usize> = ranked[21..].iter().map(|(i, _)| *i).collect();
        assert_eq!(tail, vec![3, 7, 11]);
        assert!(ranked.iter().all(|(_, s)| s.is_finite()));
        assert_eq!(cosine_similarity(&[f32::NAN, 0.0], &[1.0, 0.0]), -1.0);
    }

    #[test]
    fn similarity_label_rounds_to_two_decimals() {
        let m = RankedMatch {
            record: CandidateRecord::new("A"),
            similarity: 0.98765,
            explanation: None,
        };
        assert_eq!(m.similarity_label(), "0.99");
    }

    #[tokio::test]
    async fn build_skips_precomputed_embeddings() {
        let gateway = FixedGateway {
            query: vec![1.0, 0.0],
            embed_calls: AtomicUsize::new(0),
        };
        let store = CandidateStore::new(
            catalog(),
            vec![
                CandidateRecord::new("A").with_embedding(vec![1.0, 0.0]),
                CandidateRecord::new("B").with_attribute("habitat", "fresh"),
            ],
        );
        let index = EmbeddingIndex::build(&store, &gateway).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(gateway.embed_calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ranks_full_catalog_and_tolerates_failed_justification() {
        let gateway = Arc::new(FixedGateway {
            query: vec![0.0, 1.0],
            embed_calls: AtomicUsize::new(0),
        });
        let ranker = SimilarityRanker::build(store(), gateway, PromptBuilder::new("en"), 3)
            .await
            .unwrap();

        // Answers that match no record in the narrowed sense still rank
        // against every record.
        let answers = vec![
            answer("habitat", Answer::Value("brackish".into())),
            answer("form", Answer::Value("slim".into())),
        ];
        let matches = ranker.rank_answers(&answers).await.unwrap();

        let names: Vec<&str> = matches.iter().map(|m| m.record.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        assert!(matches[0].explanation.is_none());
        assert_eq!(matches[1].explanation.as_deref(), Some("fits well"));
        assert_eq!(matches[0].similarity_label(), "1.00");
    }
}
