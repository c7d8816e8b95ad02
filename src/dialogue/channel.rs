//! Presenter that forwards everything over `tokio::sync::mpsc` channels.
//!
//! The runner lives on the tokio runtime; the egui window polls the event
//! receiver every frame and sends commands back with `try_send`.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::presenter::{DialogueOutcome, Presenter, PresenterError, QuestionView, UserInput};
use super::state::DialoguePhase;

/// Commands sent from the window to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueCommand {
    Answer(String),
    Restart,
    Quit,
}

impl From<DialogueCommand> for UserInput {
    fn from(command: DialogueCommand) -> Self {
        match command {
            DialogueCommand::Answer(text) => UserInput::Answer(text),
            DialogueCommand::Restart => UserInput::Restart,
            DialogueCommand::Quit => UserInput::Quit,
        }
    }
}

/// Events delivered from the runner to the window.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueEvent {
    Status(DialoguePhase),
    Question(QuestionView),
    Clarification { attribute: String, text: String },
    Notice(String),
    Result(DialogueOutcome),
    Restarted,
}

pub struct ChannelPresenter {
    events: mpsc::Sender<DialogueEvent>,
    commands: mpsc::Receiver<DialogueCommand>,
}

impl ChannelPresenter {
    pub fn new(events: mpsc::Sender<DialogueEvent>, commands: mpsc::Receiver<DialogueCommand>) -> Self {
        Self { events, commands }
    }

    async fn send(&self, event: DialogueEvent) -> Result<(), PresenterError> {
        self.events.send(event).await.map_err(|_| PresenterError::Closed)
    }
}

#[async_trait]
impl Presenter for ChannelPresenter {
    async fn render_question(&mut self, view: &QuestionView) -> Result<(), PresenterError> {
        self.send(DialogueEvent::Question(view.clone())).await
    }

    async fn render_clarification(&mut self, attribute: &str, text: &str) -> Result<(), PresenterError> {
        self.send(DialogueEvent::Clarification {
            attribute: attribute.to_string(),
            text: text.to_string(),
        })
        .await
    }

    async fn render_notice(&mut self, message: &str) -> Result<(), PresenterError> {
        self.send(DialogueEvent::Notice(message.to_string())).await
    }

    async fn render_status(&mut self, phase: DialoguePhase) -> Result<(), PresenterError> {
        self.send(DialogueEvent::Status(phase)).await
    }

    async fn render_result(&mut self, outcome: &DialogueOutcome) -> Result<(), PresenterError> {
        self.send(DialogueEvent::Result(outcome.clone())).await
    }

    /// A closed command channel means the window is gone.
    async fn capture_answer(&mut self) -> Result<UserInput, PresenterError> {
        Ok(self
            .commands
            .recv()
            .await
            .map(UserInput::from)
            .unwrap_or(UserInput::Quit))
    }

    async fn restart(&mut self) -> Result<(), PresenterError> {
        self.send(DialogueEvent::Restarted).await
    }
}
