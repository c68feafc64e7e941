use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RaterConfig;
use crate::delay::{Delay, TokioDelay};
use crate::llm::{CommitBatcher, LLMProvider, RatingRequest};
use crate::models::{CommitRecord, Evaluation, RatedCommit};

pub const SENTINEL_SCORE: u8 = 0;
pub const RATING_FAILED_REASON: &str = "Rating failed";
pub const NO_EVALUATION_REASON: &str = "No evaluation returned";
const NO_REASON: &str = "No reason provided";

/// Lifecycle of one batch. `InFlight` carries the number of failed attempts so far.
#[derive(Debug)]
enum BatchState {
    Pending,
    InFlight { failures: u32 },
    Scored(Vec<Evaluation>),
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Scored,
    Exhausted,
}

#[derive(Debug, Default)]
pub struct RatingReport {
    pub commits: Vec<RatedCommit>,
    pub scored_batches: usize,
    pub exhausted_batches: usize,
}

pub struct CommitRater {
    llm: Arc<dyn LLMProvider>,
    delay: Arc<dyn Delay>,
    batcher: CommitBatcher,
    config: RaterConfig,
}

impl CommitRater {
    pub fn new(llm: impl LLMProvider + 'static, config: &RaterConfig) -> Self {
        Self::with_delay(Arc::new(llm), Arc::new(TokioDelay), config)
    }

    pub fn with_delay(
        llm: Arc<dyn LLMProvider>,
        delay: Arc<dyn Delay>,
        config: &RaterConfig,
    ) -> Self {
        Self {
            llm,
            delay,
            batcher: CommitBatcher::new(config.batch_size),
            config: config.clone(),
        }
    }

    /// Rates every commit batch by batch. The result holds exactly one record per input
    /// commit, in input order; failed batches are kept with the sentinel score.
    pub async fn rate(&self, commits: &[CommitRecord]) -> RatingReport {
        let batches = self.batcher.create_batches(commits);
        let total = self.batcher.batch_count(commits.len());
        tracing::info!(
            "Rating quality of {} commits in {} batches using {}",
            commits.len(),
            total,
            self.llm.name()
        );

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut report = RatingReport {
            commits: Vec::with_capacity(commits.len()),
            ..RatingReport::default()
        };

        for (i, batch) in batches.into_iter().enumerate() {
            tracing::info!("Processing batch {}/{}", i + 1, total);
            let (rated, outcome) = self.rate_batch(batch).await;
            match outcome {
                BatchOutcome::Scored => {
                    tracing::info!("Successfully rated batch {}", i + 1);
                    report.scored_batches += 1;
                }
                BatchOutcome::Exhausted => report.exhausted_batches += 1,
            }
            report.commits.extend(rated);
            pb.inc(1);
        }

        pb.finish_with_message("Rating complete");
        report
    }

    async fn rate_batch(&self, batch: &[CommitRecord]) -> (Vec<RatedCommit>, BatchOutcome) {
        let request = RatingRequest::from_batch(batch);
        let max_attempts = self.config.max_attempts.max(1);
        let mut state = BatchState::Pending;

        loop {
            state = match state {
                BatchState::Pending => BatchState::InFlight { failures: 0 },
                BatchState::InFlight { failures } => {
                    match self.llm.evaluate_commits(&request).await {
                        Ok(response) => BatchState::Scored(response.evaluations),
                        Err(e) => {
                            let failures = failures + 1;
                            tracing::error!("Error rating commits: {}", e);
                            if failures >= max_attempts {
                                tracing::error!("All retry attempts failed for this batch");
                                BatchState::Exhausted
                            } else {
                                let wait = Duration::from_secs(2u64.pow(failures));
                                tracing::info!(
                                    "Retrying in {} seconds... (Attempt {}/{})",
                                    wait.as_secs(),
                                    failures + 1,
                                    max_attempts
                                );
                                self.delay.sleep(wait).await;
                                BatchState::InFlight { failures }
                            }
                        }
                    }
                }
                BatchState::Scored(evaluations) => {
                    return (merge_evaluations(batch, &evaluations), BatchOutcome::Scored);
                }
                BatchState::Exhausted => {
                    let failed = batch
                        .iter()
                        .map(|c| RatedCommit::new(c, SENTINEL_SCORE, RATING_FAILED_REASON))
                        .collect();
                    return (failed, BatchOutcome::Exhausted);
                }
            };
        }
    }
}

/// Joins evaluations onto the batch by their 1-based position. The model only echoes a
/// sequence position, so each index is bounds-checked and anything outside the batch is
/// dropped. Repeated indices keep the last evaluation; positions with no evaluation get
/// the sentinel score.
pub fn merge_evaluations(batch: &[CommitRecord], evaluations: &[Evaluation]) -> Vec<RatedCommit> {
    let mut slots: Vec<Option<(u8, String)>> = vec![None; batch.len()];

    for evaluation in evaluations {
        match evaluation.slot(batch.len()) {
            Some(slot) => {
                let reason = evaluation
                    .reason
                    .clone()
                    .unwrap_or_else(|| NO_REASON.to_string());
                slots[slot] = Some((evaluation.clamped_score(), reason));
            }
            None => {
                tracing::debug!("Discarding evaluation with index {:?}", evaluation.index);
            }
        }
    }

    batch
        .iter()
        .zip(slots)
        .map(|(commit, slot)| match slot {
            Some((score, reason)) => RatedCommit::new(commit, score, reason),
            None => RatedCommit::new(commit, SENTINEL_SCORE, NO_EVALUATION_REASON),
        })
        .collect()
}

/// Highest scores first; equal scores keep their input order.
pub fn top_rated(commits: &[RatedCommit], count: usize) -> Vec<&RatedCommit> {
    let mut ranked: Vec<&RatedCommit> = commits.iter().collect();
    ranked.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
    ranked.truncate(count);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::llm::parser::parse_evaluation_response;
    use crate::models::EvaluationResponse;
    use crate::test_support::{commits, RecordingDelay, ScriptedProvider};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn eval(index: i64, score: i64, reason: &str) -> Evaluation {
        Evaluation {
            index: Some(index),
            score: Some(score),
            reason: Some(reason.to_string()),
        }
    }

    fn rater(provider: ScriptedProvider, delay: &Arc<RecordingDelay>, batch_size: usize) -> (CommitRater, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let config = RaterConfig {
            batch_size,
            ..RaterConfig::default()
        };
        (
            CommitRater::with_delay(provider.clone(), delay.clone(), &config),
            provider,
        )
    }

    #[tokio::test]
    async fn test_always_failing_batch_degrades_to_sentinel() {
        let delay = Arc::new(RecordingDelay::default());
        let (rater, provider) = rater(
            ScriptedProvider::from_fn(|_, _| Err(Error::LLMApi("unavailable".to_string()))),
            &delay,
            10,
        );
        let input = commits(4);

        let report = rater.rate(&input).await;

        assert_eq!(provider.call_count(), 3);
        assert_eq!(
            delay.recorded(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(report.exhausted_batches, 1);
        assert_eq!(report.scored_batches, 0);
        assert_eq!(report.commits.len(), 4);
        for (rated, original) in report.commits.iter().zip(&input) {
            assert_eq!(rated.commit_sha, original.commit_sha);
            assert_eq!(rated.quality_score, 0);
            assert_eq!(rated.quality_reason, "Rating failed");
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let delay = Arc::new(RecordingDelay::default());
        let (rater, provider) = rater(
            ScriptedProvider::from_fn(|request, call| {
                if call == 0 {
                    Err(Error::ParseError("not json".to_string()))
                } else {
                    Ok(EvaluationResponse {
                        evaluations: (1..=request.messages.len() as i64)
                            .map(|i| eval(i, 6, "ok"))
                            .collect(),
                    })
                }
            }),
            &delay,
            10,
        );

        let report = rater.rate(&commits(2)).await;

        assert_eq!(provider.call_count(), 2);
        assert_eq!(delay.recorded(), vec![Duration::from_secs(2)]);
        assert_eq!(report.scored_batches, 1);
        assert!(report.commits.iter().all(|c| c.quality_score == 6));
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_affect_neighbours() {
        let delay = Arc::new(RecordingDelay::default());
        let (rater, _) = rater(
            ScriptedProvider::from_fn(|request, _| {
                if request.messages[0] == "message 2" {
                    Err(Error::LLMApi("boom".to_string()))
                } else {
                    Ok(EvaluationResponse {
                        evaluations: vec![eval(1, 9, "good"), eval(2, 7, "fine")],
                    })
                }
            }),
            &delay,
            2,
        );

        let report = rater.rate(&commits(5)).await;

        let scores: Vec<u8> = report.commits.iter().map(|c| c.quality_score).collect();
        assert_eq!(scores, vec![9, 7, 0, 0, 9]);
        assert_eq!(report.commits[2].quality_reason, "Rating failed");
        assert_eq!(report.commits[4].quality_reason, "good");
        assert_eq!(report.scored_batches, 2);
        assert_eq!(report.exhausted_batches, 1);
    }

    #[tokio::test]
    async fn test_malformed_entry_keeps_neighbour_scores() {
        let delay = Arc::new(RecordingDelay::default());
        let (rater, provider) = rater(
            ScriptedProvider::from_fn(|_, _| {
                parse_evaluation_response(
                    r#"{"evaluations": [
                        {"index": 1, "score": 8, "reason": "Clear"},
                        {"index": 2, "score": 7.5, "reason": "Decent"},
                        {"index": "third", "score": 9, "reason": "Unaddressable"},
                        {"index": "4", "score": "6", "reason": "Terse"}
                    ]}"#,
                )
            }),
            &delay,
            10,
        );

        let report = rater.rate(&commits(4)).await;

        assert_eq!(provider.call_count(), 1);
        assert_eq!(report.scored_batches, 1);
        let scored: Vec<(u8, &str)> = report
            .commits
            .iter()
            .map(|c| (c.quality_score, c.quality_reason.as_str()))
            .collect();
        assert_eq!(
            scored,
            vec![
                (8, "Clear"),
                (8, "Decent"),
                (0, NO_EVALUATION_REASON),
                (6, "Terse"),
            ]
        );
    }

    #[test]
    fn test_out_of_range_indices_are_discarded() {
        let batch = commits(3);
        let evaluations = vec![
            eval(0, 10, "zero"),
            eval(1, 5, "first"),
            eval(4, 10, "past the end"),
            Evaluation {
                index: None,
                score: Some(10),
                reason: Some("no index".to_string()),
            },
            eval(3, 2, "third"),
        ];

        let rated = merge_evaluations(&batch, &evaluations);

        assert_eq!(rated.len(), 3);
        assert_eq!((rated[0].quality_score, rated[0].quality_reason.as_str()), (5, "first"));
        assert_eq!(
            (rated[1].quality_score, rated[1].quality_reason.as_str()),
            (0, NO_EVALUATION_REASON)
        );
        assert_eq!((rated[2].quality_score, rated[2].quality_reason.as_str()), (2, "third"));
    }

    #[test]
    fn test_duplicate_index_last_write_wins() {
        let batch = commits(1);
        let rated = merge_evaluations(&batch, &[eval(1, 3, "early"), eval(1, 8, "late")]);
        assert_eq!(rated[0].quality_score, 8);
        assert_eq!(rated[0].quality_reason, "late");
    }

    #[test]
    fn test_missing_reason_and_score() {
        let batch = commits(1);
        let rated = merge_evaluations(
            &batch,
            &[Evaluation {
                index: Some(1),
                score: None,
                reason: None,
            }],
        );
        assert_eq!(rated[0].quality_score, 0);
        assert_eq!(rated[0].quality_reason, "No reason provided");
    }

    #[test]
    fn test_top_rated_is_stable() {
        let input = commits(4);
        let rated: Vec<RatedCommit> = input
            .iter()
            .zip([3u8, 8, 8, 1])
            .map(|(c, score)| RatedCommit::new(c, score, "r"))
            .collect();

        let top = top_rated(&rated, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].commit_sha, input[1].commit_sha);
        assert_eq!(top[1].commit_sha, input[2].commit_sha);
        assert!(top_rated(&rated, 10).len() == 4);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let delay = Arc::new(RecordingDelay::default());
        let (rater, provider) = rater(
            ScriptedProvider::from_fn(|_, _| Ok(EvaluationResponse::default())),
            &delay,
            10,
        );

        let report = rater.rate(&[]).await;
        assert!(report.commits.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Every input commit appears exactly once, whatever the model returns.
        #[test]
        fn prop_rating_preserves_every_commit(
            total in 0usize..60,
            batch_size in 1usize..15,
            fail_every in 0usize..5,
            offset in -2i64..3,
        ) {
            let input = commits(total);
            let delay = Arc::new(RecordingDelay::default());
            let (rater, _) = rater(
                ScriptedProvider::from_fn(move |request, call| {
                    if fail_every > 0 && call % fail_every == 0 {
                        return Err(Error::LLMApi("flaky".to_string()));
                    }
                    Ok(EvaluationResponse {
                        evaluations: (1..=request.messages.len() as i64)
                            .map(|i| eval(i + offset, 5, "ok"))
                            .collect(),
                    })
                }),
                &delay,
                batch_size,
            );

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let report = runtime.block_on(rater.rate(&input));

            prop_assert_eq!(report.commits.len(), input.len());
            let shas: Vec<&str> = report.commits.iter().map(|c| c.commit_sha.as_str()).collect();
            let expected: Vec<&str> = input.iter().map(|c| c.commit_sha.as_str()).collect();
            prop_assert_eq!(&shas, &expected);
            let unique: HashSet<&str> = shas.iter().copied().collect();
            prop_assert_eq!(unique.len(), input.len());
            prop_assert!(report.commits.iter().all(|c| c.quality_score <= 10));
        }
    }
}
