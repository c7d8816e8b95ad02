//! Dialogue runner: drives the engine, the gateway and a presenter.
//!
//! # Session flow
//!
//! ```text
//! is_terminal ──terminal──▶ resolve outcome ──▶ render_result ──▶ Restart / Quit
//!      │
//!      └─ InProgress ─▶ next_question ─▶ phrase (complete) ─▶ render_question
//!                          ─▶ capture_answer
//!                               ├─ Restart / Quit
//!                               └─ Answer ─▶ [validate, free-text mode]
//!                                     ─▶ accept_answer ─▶ [clarify if unsure]
//! ```
//!
//! An exhausted session is ranked when a ranker is configured. The model is
//! asked for its own identification once when there is no ranking, or when
//! free-text answers were collected that the catalog could not filter on.
//!
//! Gateway failures are never retried. They become a notice and the
//! interaction that triggered them leaves the session state untouched.

use std::sync::Arc;

use thiserror::Error;

use crate::config::ValidationMode;
use crate::engine::{
    composite_description, Answer, EngineError, Glossary, NarrowingEngine, Question,
    SessionState, SimilarityRanker, TerminalStatus,
};
use crate::llm::{validate_answer, GatewayError, LanguageModelGateway, PromptBuilder};

use super::presenter::{
    DialogueOutcome, Presenter, PresenterError, QuestionView, RemainingCandidate, UserInput,
};
use super::state::DialoguePhase;

// ---------------------------------------------------------------------------
// DialogueError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Presenter(#[from] PresenterError),
}

/// Result of handling one user input.
enum Step {
    Next(SessionState),
    Stay,
    Restart,
    Quit,
}

// ---------------------------------------------------------------------------
// DialogueRunner
// ---------------------------------------------------------------------------

pub struct DialogueRunner {
    engine: NarrowingEngine,
    gateway: Arc<dyn LanguageModelGateway>,
    ranker: Option<SimilarityRanker>,
    prompts: PromptBuilder,
    glossary: Glossary,
    validation: ValidationMode,
}

impl DialogueRunner {
    pub fn new(
        engine: NarrowingEngine,
        gateway: Arc<dyn LanguageModelGateway>,
        prompts: PromptBuilder,
        glossary: Glossary,
        validation: ValidationMode,
    ) -> Self {
        Self {
            engine,
            gateway,
            ranker: None,
            prompts,
            glossary,
            validation,
        }
    }

    /// Enable the similarity fallback for exhausted sessions.
    pub fn with_ranker(mut self, ranker: SimilarityRanker) -> Self {
        self.ranker = Some(ranker);
        self
    }

    /// Run sessions until the presenter reports `Quit`.
    pub async fn run<P>(&self, presenter: &mut P) -> Result<(), DialogueError>
    where
        P: Presenter + ?Sized,
    {
        let mut state = self.engine.start();
        // Phrasing of the current step, reused while the step is repeated.
        let mut phrased: Option<(usize, Option<String>)> = None;

        presenter.render_status(DialoguePhase::Idle).await?;
        log::info!("dialogue: session started ({} fish)", self.engine.store().len());

        loop {
            let status = self.engine.is_terminal(&state);
            if status.is_terminal() {
                let outcome = self.resolve(status, &state, presenter).await?;
                log::info!("dialogue: session finished: {}", outcome_label(&outcome));
                presenter.render_status(DialoguePhase::Finished).await?;
                presenter.render_result(&outcome).await?;

                if !self.await_restart(presenter).await? {
                    return Ok(());
                }
                state = self.restart(presenter).await?;
                phrased = None;
                continue;
            }

            let question = self.engine.next_question(&state)?;
            let phrasing = match &phrased {
                Some((step, text)) if *step == state.step() => text.clone(),
                _ => {
                    let text = self.phrase(&question, presenter).await?;
                    phrased = Some((state.step(), text.clone()));
                    text
                }
            };

            let view = QuestionView {
                glossary: self.glossary.lookup(&question.attribute, &question.values),
                remaining: state.candidates().len(),
                phrasing,
                question,
            };
            presenter.render_status(DialoguePhase::AwaitingAnswer).await?;
            presenter.render_question(&view).await?;

            match self.handle_input(&state, &view.question, presenter).await? {
                Step::Next(next) => state = next,
                Step::Stay => {}
                Step::Restart => {
                    state = self.restart(presenter).await?;
                    phrased = None;
                }
                Step::Quit => {
                    log::info!("dialogue: quit");
                    return Ok(());
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    async fn handle_input<P>(
        &self,
        state: &SessionState,
        question: &Question,
        presenter: &mut P,
    ) -> Result<Step, DialogueError>
    where
        P: Presenter + ?Sized,
    {
        let text = match presenter.capture_answer().await? {
            UserInput::Restart => return Ok(Step::Restart),
            UserInput::Quit => return Ok(Step::Quit),
            UserInput::Answer(text) => text,
        };
        let attribute = question.attribute.as_str();

        let synthetic = self.engine.is_unsure(&text) || self.engine.is_skip(&text);
        let literal = self.engine.match_value(state, attribute, &text);

        let result = match (&self.validation, synthetic, literal) {
            (_, true, _) => self.engine.accept_answer(state, attribute, &text),
            (_, false, Some(value)) => self.engine.accept_answer(state, attribute, &value),
            (ValidationMode::Literal, false, None) => {
                self.engine.accept_answer(state, attribute, &text)
            }
            (ValidationMode::FreeText, false, None) => {
                presenter.render_status(DialoguePhase::Validating).await?;
                match validate_answer(
                    self.gateway.as_ref(),
                    &self.prompts,
                    attribute,
                    &text,
                    &question.values,
                )
                .await
                {
                    Ok(verdict) if verdict.accepted => {
                        self.engine.accept_free_text(state, attribute, &text)
                    }
                    Ok(verdict) => {
                        let feedback = if verdict.feedback.is_empty() {
                            "That answer is not precise enough, please try again.".to_string()
                        } else {
                            verdict.feedback
                        };
                        presenter.render_notice(&feedback).await?;
                        return Ok(Step::Stay);
                    }
                    Err(e) => {
                        log::warn!("dialogue: validation of '{attribute}' failed: {e}");
                        presenter
                            .render_notice(&format!("Could not check the answer: {e}"))
                            .await?;
                        return Ok(Step::Stay);
                    }
                }
            }
        };

        let next = match result {
            Ok(next) => next,
            Err(e @ EngineError::ChoiceRequired(_)) => {
                presenter.render_notice(&e.to_string()).await?;
                return Ok(Step::Stay);
            }
            Err(e) => return Err(e.into()),
        };

        if next.is_uncertain() {
            presenter.render_status(DialoguePhase::Clarifying).await?;
            let (system, user) = self.prompts.clarification(attribute, &question.values);
            return match self.gateway.complete(&system, &user).await {
                Ok(explanation) => {
                    presenter.render_clarification(attribute, &explanation).await?;
                    Ok(Step::Next(next))
                }
                Err(e) => {
                    log::warn!("dialogue: clarification for '{attribute}' failed: {e}");
                    presenter
                        .render_notice(&format!("No explanation available right now: {e}"))
                        .await?;
                    Ok(Step::Stay)
                }
            };
        }

        Ok(Step::Next(next))
    }

    /// One `complete` call for the question text. `None` when it failed.
    async fn phrase<P>(&self, question: &Question, presenter: &mut P) -> Result<Option<String>, PresenterError>
    where
        P: Presenter + ?Sized,
    {
        presenter.render_status(DialoguePhase::Phrasing).await?;
        let (system, user) = self.prompts.question(&question.attribute, &question.values);
        match self.gateway.complete(&system, &user).await {
            Ok(text) => Ok(Some(text)),
            Err(GatewayError::Disabled) => Ok(None),
            Err(e) => {
                log::warn!("dialogue: phrasing '{}' failed: {e}", question.attribute);
                presenter
                    .render_notice(&format!("Language model unavailable ({e}), showing the plain question."))
                    .await?;
                Ok(None)
            }
        }
    }

    async fn resolve<P>(
        &self,
        status: TerminalStatus,
        state: &SessionState,
        presenter: &mut P,
    ) -> Result<DialogueOutcome, PresenterError>
    where
        P: Presenter + ?Sized,
    {
        match status {
            TerminalStatus::Unique(record) => return Ok(DialogueOutcome::Identified(record)),
            TerminalStatus::Empty => return Ok(DialogueOutcome::NoMatch),
            TerminalStatus::Exhausted | TerminalStatus::InProgress => {}
        }

        let has_free_text = state
            .answers()
            .iter()
            .any(|a| matches!(a.answer, Answer::FreeText(_)));

        presenter.render_status(DialoguePhase::Ranking).await?;
        if let Some(ranker) = &self.ranker {
            match ranker.rank_answers(state.answers()).await {
                Ok(matches) => {
                    let identification = if has_free_text {
                        self.identify(state).await
                    } else {
                        None
                    };
                    return Ok(DialogueOutcome::Ranked {
                        matches,
                        identification,
                    });
                }
                Err(e) => {
                    log::warn!("dialogue: similarity fallback failed: {e}");
                    presenter
                        .render_notice(&format!("Similarity search unavailable: {e}"))
                        .await?;
                }
            }
        }

        let catalog = self.engine.store().catalog();
        let candidates = self
            .engine
            .remaining(state)
            .into_iter()
            .map(|record| RemainingCandidate {
                summary: record.describe(catalog),
                record,
            })
            .collect();
        Ok(DialogueOutcome::BestRemaining {
            candidates,
            identification: self.identify(state).await,
        })
    }

    /// One `complete` call naming the likeliest species from all answers.
    /// Failures are logged and give `None`.
    async fn identify(&self, state: &SessionState) -> Option<String> {
        let composite = composite_description(self.engine.store().catalog(), state.answers());
        let (system, user) = self.prompts.identification(&composite);
        match self.gateway.complete(&system, &user).await {
            Ok(text) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
            Err(GatewayError::Disabled) => None,
            Err(e) => {
                log::warn!("dialogue: final identification failed: {e}");
                None
            }
        }
    }

    /// Wait after a result. `true` means restart.
    async fn await_restart<P>(&self, presenter: &mut P) -> Result<bool, PresenterError>
    where
        P: Presenter + ?Sized,
    {
        loop {
            match presenter.capture_answer().await? {
                UserInput::Restart => return Ok(true),
                UserInput::Quit => return Ok(false),
                UserInput::Answer(_) => {
                    presenter
                        .render_notice("This identification is finished. Restart or quit.")
                        .await?;
                }
            }
        }
    }

    async fn restart<P>(&self, presenter: &mut P) -> Result<SessionState, PresenterError>
    where
        P: Presenter + ?Sized,
    {
        log::info!("dialogue: restart");
        presenter.restart().await?;
        presenter.render_status(DialoguePhase::Idle).await?;
        Ok(self.engine.start())
    }
}

fn outcome_label(outcome: &DialogueOutcome) -> String {
    match outcome {
        DialogueOutcome::Identified(record) => format!("identified {}", record.name),
        DialogueOutcome::NoMatch => "no match".to_string(),
        DialogueOutcome::Ranked { matches, .. } => format!("{} ranked matches", matches.len()),
        DialogueOutcome::BestRemaining { candidates, .. } => format!("{} remaining", candidates.len()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::catalog::{AttributeCatalog, CandidateRecord, CandidateStore};
    use crate::config::EngineConfig;
    use crate::engine::EmbeddingIndex;

    // ---- Test doubles ---

    /// Answers by prompt kind; everything fails when `offline`.
    struct FakeGateway {
        offline: bool,
        validation_reply: String,
        completions: AtomicUsize,
    }

    impl FakeGateway {
        fn online() -> Self {
            Self {
                offline: false,
                validation_reply: r#"{"accepted": true, "feedback": ""}"#.into(),
                completions: AtomicUsize::new(0),
            }
        }

        fn offline() -> Self {
            Self {
                offline: true,
                ..Self::online()
            }
        }
    }

    #[async_trait]
    impl LanguageModelGateway for FakeGateway {
        async fn complete(&self, _system: &str, user: &str) -> Result<String, GatewayError> {
            self.completions.fetch_add(1, Ordering::SeqCst);
            if self.offline {
                return Err(GatewayError::Timeout);
            }
            if user.starts_with("Ask a beginner") {
                Ok("Phrased question?".into())
            } else if user.starts_with("A user is unsure") {
                Ok("Options explained.".into())
            } else if user.starts_with("Step:") {
                Ok(self.validation_reply.clone())
            } else if user.starts_with("Based on these features") {
                Ok(" Probably a pike. \n".into())
            } else {
                Ok("Good fit.".into())
            }
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, GatewayError> {
            if self.offline {
                Err(GatewayError::Timeout)
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    /// Replays scripted inputs and records what was shown. Runs out as Quit.
    #[derive(Default)]
    struct ScriptedPresenter {
        inputs: VecDeque<UserInput>,
        questions: Vec<QuestionView>,
        clarifications: Vec<String>,
        notices: Vec<String>,
        results: Vec<DialogueOutcome>,
        restarts: usize,
    }

    impl ScriptedPresenter {
        fn answering(answers: &[&str]) -> Self {
            Self {
                inputs: answers
                    .iter()
                    .map(|a| UserInput::Answer(a.to_string()))
                    .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Presenter for ScriptedPresenter {
        async fn render_question(&mut self, view: &QuestionView) -> Result<(), PresenterError> {
            self.questions.push(view.clone());
            Ok(())
        }

        async fn render_clarification(&mut self, _attribute: &str, text: &str) -> Result<(), PresenterError> {
            self.clarifications.push(text.to_string());
            Ok(())
        }

        async fn render_notice(&mut self, message: &str) -> Result<(), PresenterError> {
            self.notices.push(message.to_string());
            Ok(())
        }

        async fn render_result(&mut self, outcome: &DialogueOutcome) -> Result<(), PresenterError> {
            self.results.push(outcome.clone());
            Ok(())
        }

        async fn capture_answer(&mut self) -> Result<UserInput, PresenterError> {
            Ok(self.inputs.pop_front().unwrap_or(UserInput::Quit))
        }

        async fn restart(&mut self) -> Result<(), PresenterError> {
            self.restarts += 1;
            Ok(())
        }
    }

    // ---- Fixtures ---

    /// A fresh/slim, B fresh/round, C salt/slim.
    fn store() -> Arc<CandidateStore> {
        let catalog = AttributeCatalog::new(["habitat", "form"]).unwrap();
        Arc::new(CandidateStore::new(
            catalog,
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
                    .with_embedding(vec![0.6, 0.8]),
            ],
        ))
    }

    /// Two indistinguishable fish.
    fn twin_store() -> Arc<CandidateStore> {
        let catalog = AttributeCatalog::new(["habitat"]).unwrap();
        Arc::new(CandidateStore::new(
            catalog,
            vec![
                CandidateRecord::new("X")
                    .with_attribute("habitat", "fresh")
                    .with_embedding(vec![1.0, 0.0]),
                CandidateRecord::new("Y")
                    .with_attribute("habitat", "fresh")
                    .with_embedding(vec![0.0, 1.0]),
            ],
        ))
    }

    fn runner(store: Arc<CandidateStore>, gateway: Arc<FakeGateway>, validation: ValidationMode) -> DialogueRunner {
        let config = EngineConfig::default();
        let glossary = Glossary::new(BTreeMap::from([(
            "slim".to_string(),
            "Long and narrow.".to_string(),
        )]));
        DialogueRunner::new(
            NarrowingEngine::new(store, &config),
            gateway,
            PromptBuilder::new("en"),
            glossary,
            validation,
        )
    }

    // ---- Tests ---

    #[tokio::test]
    async fn identifies_a_fish_end_to_end() {
        let gateway = Arc::new(FakeGateway::online());
        let runner = runner(store(), gateway, ValidationMode::Literal);
        let mut presenter = ScriptedPresenter::answering(&["fresh", "slim"]);

        runner.run(&mut presenter).await.unwrap();

        assert_eq!(presenter.questions.len(), 2);
        assert_eq!(presenter.questions[0].phrasing.as_deref(), Some("Phrased question?"));
        assert_eq!(presenter.questions[0].remaining, 3);
        assert_eq!(presenter.questions[1].question.values, vec!["slim", "round"]);
        assert_eq!(presenter.questions[1].glossary[0].0, "slim");
        assert!(matches!(
            &presenter.results[..],
            [DialogueOutcome::Identified(r)] if r.name == "A"
        ));
    }

    #[tokio::test]
    async fn unknown_literal_answer_ends_without_match() {
        let runner = runner(store(), Arc::new(FakeGateway::online()), ValidationMode::Literal);
        let mut presenter = ScriptedPresenter::answering(&["brackish"]);

        runner.run(&mut presenter).await.unwrap();

        assert_eq!(presenter.results, vec![DialogueOutcome::NoMatch]);
    }

    #[tokio::test]
    async fn offline_gateway_degrades_to_plain_questions() {
        let runner = runner(store(), Arc::new(FakeGateway::offline()), ValidationMode::Literal);
        let mut presenter = ScriptedPresenter::answering(&["salt"]);

        runner.run(&mut presenter).await.unwrap();

        assert!(presenter.questions[0].phrasing.is_none());
        assert!(!presenter.notices.is_empty());
        assert!(matches!(
            &presenter.results[..],
            [DialogueOutcome::Identified(r)] if r.name == "C"
        ));
    }

    #[tokio::test]
    async fn unsure_requests_one_clarification_and_keeps_step() {
        let gateway = Arc::new(FakeGateway::online());
        let runner = runner(store(), gateway.clone(), ValidationMode::Literal);
        let mut presenter = ScriptedPresenter::answering(&["I'm not sure", "fresh"]);

        runner.run(&mut presenter).await.unwrap();

        assert_eq!(presenter.clarifications, vec!["Options explained."]);
        assert_eq!(presenter.questions.len(), 3);
        assert_eq!(presenter.questions[0].question.step, 0);
        assert_eq!(presenter.questions[1].question.step, 0);
        assert_eq!(presenter.questions[1].remaining, 3);
        assert_eq!(presenter.questions[2].question.step, 1);
        // phrase step 0, clarify, phrase step 1
        assert_eq!(gateway.completions.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_clarification_leaves_state_untouched() {
        let runner = runner(store(), Arc::new(FakeGateway::offline()), ValidationMode::Literal);
        let mut presenter = ScriptedPresenter::answering(&["I'm not sure"]);

        runner.run(&mut presenter).await.unwrap();

        assert!(presenter.clarifications.is_empty());
        // Still offered "unsure": no clarification was counted.
        assert!(!presenter.questions[1].question.is_forced());
    }

    #[tokio::test]
    async fn spent_budget_forces_a_choice() {
        let runner = runner(store(), Arc::new(FakeGateway::online()), ValidationMode::Literal);
        let mut presenter =
            ScriptedPresenter::answering(&["I'm not sure", "I'm not sure", "I'm not sure"]);

        runner.run(&mut presenter).await.unwrap();

        assert_eq!(presenter.clarifications.len(), 2);
        assert!(presenter.questions[2].question.is_forced());
        assert!(presenter
            .notices
            .iter()
            .any(|n| n.contains("please pick one of the options")));
    }

    #[tokio::test]
    async fn rejected_free_text_repeats_question_with_feedback() {
        let gateway = Arc::new(FakeGateway {
            validation_reply: r#"{"accepted": false, "feedback": "River or lake?"}"#.into(),
            ..FakeGateway::online()
        });
        let runner = runner(store(), gateway, ValidationMode::FreeText);
        let mut presenter = ScriptedPresenter::answering(&["somewhere wet"]);

        runner.run(&mut presenter).await.unwrap();

        assert_eq!(presenter.notices, vec!["River or lake?"]);
        assert_eq!(presenter.questions.len(), 2);
        assert_eq!(presenter.questions[1].question.step, 0);
        assert!(presenter.results.is_empty());
    }

    #[tokio::test]
    async fn accepted_free_text_advances_without_filtering() {
        let runner = runner(store(), Arc::new(FakeGateway::online()), ValidationMode::FreeText);
        let mut presenter = ScriptedPresenter::answering(&["a small pond", "Slim"]);

        runner.run(&mut presenter).await.unwrap();

        assert_eq!(presenter.questions[1].remaining, 3);
        // "Slim" matches a literal value case-insensitively: A and C remain.
        let [DialogueOutcome::BestRemaining { candidates, identification }] = &presenter.results[..] else {
            panic!("expected remaining candidates, got {:?}", presenter.results);
        };
        let names: Vec<&str> = candidates.iter().map(|c| c.record.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(candidates[0].summary, "habitat: fresh, form: slim");
        assert_eq!(identification.as_deref(), Some("Probably a pike."));
    }

    #[tokio::test]
    async fn literal_session_without_ranker_still_asks_for_identification() {
        let gateway = Arc::new(FakeGateway::online());
        let runner = runner(twin_store(), gateway.clone(), ValidationMode::Literal);
        let mut presenter = ScriptedPresenter::answering(&["fresh"]);

        runner.run(&mut presenter).await.unwrap();

        let [DialogueOutcome::BestRemaining { candidates, identification }] = &presenter.results[..] else {
            panic!("expected remaining candidates, got {:?}", presenter.results);
        };
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].summary, "habitat: fresh");
        assert_eq!(identification.as_deref(), Some("Probably a pike."));
        // phrase step 0, identification
        assert_eq!(gateway.completions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ranked_free_text_session_adds_identification() {
        let gateway = Arc::new(FakeGateway::online());
        let store = twin_store();
        let ranker = SimilarityRanker::new(
            store.clone(),
            EmbeddingIndex::from_vectors(vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
            gateway.clone(),
            PromptBuilder::new("en"),
            3,
        );
        let runner = runner(store, gateway, ValidationMode::FreeText).with_ranker(ranker);
        let mut presenter = ScriptedPresenter::answering(&["a muddy canal"]);

        runner.run(&mut presenter).await.unwrap();

        let [DialogueOutcome::Ranked { matches, identification }] = &presenter.results[..] else {
            panic!("expected ranked outcome, got {:?}", presenter.results);
        };
        assert_eq!(matches.len(), 2);
        assert_eq!(identification.as_deref(), Some("Probably a pike."));
    }

    #[tokio::test]
    async fn exhausted_session_ranks_full_catalog() {
        let gateway = Arc::new(FakeGateway::online());
        let store = twin_store();
        let ranker = SimilarityRanker::new(
            store.clone(),
            EmbeddingIndex::from_vectors(vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
            gateway.clone(),
            PromptBuilder::new("en"),
            3,
        );
        let runner = runner(store, gateway, ValidationMode::Literal).with_ranker(ranker);
        let mut presenter = ScriptedPresenter::answering(&["fresh"]);

        runner.run(&mut presenter).await.unwrap();

        let [DialogueOutcome::Ranked { matches, identification }] = &presenter.results[..] else {
            panic!("expected ranked outcome, got {:?}", presenter.results);
        };
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].record.name, "Y");
        assert_eq!(matches[0].explanation.as_deref(), Some("Good fit."));
        // Literal answers only: the ranking stands on its own.
        assert!(identification.is_none());
    }

    #[tokio::test]
    async fn failed_ranking_falls_back_to_remaining() {
        let gateway = Arc::new(FakeGateway::offline());
        let store = twin_store();
        let ranker = SimilarityRanker::new(
            store.clone(),
            EmbeddingIndex::from_vectors(vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
            gateway.clone(),
            PromptBuilder::new("en"),
            3,
        );
        let runner = runner(store, gateway, ValidationMode::Literal).with_ranker(ranker);
        let mut presenter = ScriptedPresenter::answering(&["fresh"]);

        runner.run(&mut presenter).await.unwrap();

        // The identification request failed too; the session still ends.
        assert!(matches!(
            &presenter.results[..],
            [DialogueOutcome::BestRemaining { candidates, identification: None }] if candidates.len() == 2
        ));
        assert!(presenter.notices.iter().any(|n| n.starts_with("Similarity search unavailable")));
    }

    #[tokio::test]
    async fn restart_begins_a_new_session() {
        let runner = runner(store(), Arc::new(FakeGateway::online()), ValidationMode::Literal);
        let mut presenter = ScriptedPresenter {
            inputs: VecDeque::from([
                UserInput::Answer("salt".into()),
                UserInput::Answer("ignored".into()),
                UserInput::Restart,
                UserInput::Answer("fresh".into()),
                UserInput::Restart,
                UserInput::Answer("brackish".into()),
                UserInput::Quit,
            ]),
            ..ScriptedPresenter::default()
        };

        runner.run(&mut presenter).await.unwrap();

        assert_eq!(presenter.restarts, 2);
        assert_eq!(presenter.results.len(), 2);
        assert_eq!(presenter.results[1], DialogueOutcome::NoMatch);
        assert!(presenter.notices.iter().any(|n| n.contains("finished")));
        // Mid-session restart returned to the first attribute with all fish.
        let last = presenter.questions.last().unwrap();
        assert_eq!(last.question.step, 0);
        assert_eq!(last.remaining, 3);
    }
}
