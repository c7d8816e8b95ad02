//! Line-based presenter for a terminal.
//!
//! Options are numbered; the user answers with a number or types text.
//! `restart` starts over, `quit` (or end of input) leaves.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::presenter::{DialogueOutcome, Presenter, PresenterError, QuestionView, UserInput};
use super::state::DialoguePhase;

const RESTART_WORDS: &[&str] = &["restart", "new", ":r"];
const QUIT_WORDS: &[&str] = &["quit", "exit", ":q"];

/// Presenter over any async line reader and writer (stdin/stdout in the
/// binary, byte buffers in tests).
pub struct TerminalPresenter<R, W> {
    reader: R,
    writer: W,
    choices: Vec<String>,
}

impl<R, W> TerminalPresenter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            choices: Vec::new(),
        }
    }

    /// Give back the writer, e.g. to inspect test output.
    pub fn into_writer(self) -> W {
        self.writer
    }

    async fn write(&mut self, text: &str) -> Result<(), PresenterError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Map one input line to a user action. Blank lines yield `None`.
    fn interpret(&self, line: &str) -> Option<UserInput> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let lower = line.to_lowercase();
        if RESTART_WORDS.contains(&lower.as_str()) {
            return Some(UserInput::Restart);
        }
        if QUIT_WORDS.contains(&lower.as_str()) {
            return Some(UserInput::Quit);
        }
        if let Ok(n) = line.parse::<usize>() {
            if let Some(choice) = n.checked_sub(1).and_then(|i| self.choices.get(i)) {
                return Some(UserInput::Answer(choice.clone()));
            }
        }
        Some(UserInput::Answer(line.to_string()))
    }
}

#[async_trait]
impl<R, W> Presenter for TerminalPresenter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn render_question(&mut self, view: &QuestionView) -> Result<(), PresenterError> {
        let question = &view.question;
        self.choices = question.choices();

        let mut out = format!(
            "\n[{}/{}] {} ({} fish left)\n",
            question.step + 1,
            question.total,
            view.prompt_text(),
            view.remaining
        );
        for (i, choice) in self.choices.iter().enumerate() {
            out.push_str(&format!("  {}) {}\n", i + 1, choice));
        }
        for (term, text) in &view.glossary {
            out.push_str(&format!("  * {term}: {text}\n"));
        }
        out.push_str("> ");
        self.write(&out).await
    }

    async fn render_clarification(&mut self, attribute: &str, text: &str) -> Result<(), PresenterError> {
        self.write(&format!("\nAbout {attribute}:\n{text}\n")).await
    }

    async fn render_notice(&mut self, message: &str) -> Result<(), PresenterError> {
        self.write(&format!("! {message}\n")).await
    }

    async fn render_status(&mut self, phase: DialoguePhase) -> Result<(), PresenterError> {
        if phase.is_busy() {
            self.write(&format!("({}...)\n", phase.label())).await?;
        }
        Ok(())
    }

    async fn render_result(&mut self, outcome: &DialogueOutcome) -> Result<(), PresenterError> {
        self.choices.clear();
        let mut out = String::from("\n");
        match outcome {
            DialogueOutcome::Identified(record) => {
                out.push_str(&format!("Your fish is: {}\n", record.name));
                if let Some(description) = &record.description {
                    out.push_str(&format!("  {description}\n"));
                }
            }
            DialogueOutcome::NoMatch => {
                out.push_str("No fish in the catalog matches these answers.\n");
            }
            DialogueOutcome::Ranked {
                matches,
                identification,
            } => {
                out.push_str("No exact match. Closest fish:\n");
                for (i, m) in matches.iter().enumerate() {
                    out.push_str(&format!(
                        "  {}. {} (similarity {})\n",
                        i + 1,
                        m.record.name,
                        m.similarity_label()
                    ));
                    if let Some(explanation) = &m.explanation {
                        out.push_str(&format!("     {explanation}\n"));
                    }
                }
                push_identification(&mut out, identification.as_deref());
            }
            DialogueOutcome::BestRemaining {
                candidates,
                identification,
            } => {
                out.push_str("Still possible:\n");
                for candidate in candidates {
                    out.push_str(&format!("  - {}: {}\n", candidate.record.name, candidate.summary));
                }
                push_identification(&mut out, identification.as_deref());
            }
        }
        out.push_str("Type 'restart' for a new fish or 'quit' to leave.\n> ");
        self.write(&out).await
    }

    async fn capture_answer(&mut self) -> Result<UserInput, PresenterError> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(UserInput::Quit);
            }
            if let Some(input) = self.interpret(&line) {
                return Ok(input);
            }
            self.write("> ").await?;
        }
    }

    async fn restart(&mut self) -> Result<(), PresenterError> {
        self.choices.clear();
        self.write("\n--- New identification ---\n").await
    }
}

fn push_identification(out: &mut String, identification: Option<&str>) {
    if let Some(text) = identification {
        out.push_str(&format!("Expert guess: {text}\n"));
    }
}
