//! FinFinder desktop window (egui/eframe).
//!
//! # Architecture
//!
//! [`FinFinderApp`] is the top-level [`eframe::App`]. It never touches the
//! engine directly; it owns two channel endpoints to the dialogue runner:
//!
//! * `command_tx`: sends [`DialogueCommand`]s (answers, restart, quit).
//! * `event_rx`: receives [`DialogueEvent`]s (questions, notices, results).
//!
//! # Views
//!
//! | Phase | Visual |
//! |-------|--------|
//! | busy (`Phrasing`, `Validating`, ...) | Spinner + phase label |
//! | `AwaitingAnswer` | Question, option buttons, free-text field |
//! | `Finished` | Identified fish, ranked matches or remaining fish |

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::{AppConfig, ValidationMode};
use crate::dialogue::{
    DialogueCommand, DialogueEvent, DialogueOutcome, DialoguePhase, QuestionView,
    RemainingCandidate,
};

/// Notices kept on screen.
const MAX_NOTICES: usize = 3;

// ---------------------------------------------------------------------------
// FinFinderApp
// ---------------------------------------------------------------------------

pub struct FinFinderApp {
    // ── Dialogue state ───────────────────────────────────────────────────
    phase: DialoguePhase,
    question: Option<QuestionView>,
    /// `(attribute, explanation)` of the last clarification.
    clarification: Option<(String, String)>,
    notices: Vec<String>,
    outcome: Option<DialogueOutcome>,

    // ── UI state ─────────────────────────────────────────────────────────
    /// Contents of the free-text answer field.
    input: String,
    spinner_phase: f32,
    /// The runner is gone; nothing more will arrive.
    disconnected: bool,

    // ── Channels ─────────────────────────────────────────────────────────
    command_tx: mpsc::Sender<DialogueCommand>,
    event_rx: mpsc::Receiver<DialogueEvent>,

    config: AppConfig,
}

impl FinFinderApp {
    /// * `command_tx`: sender end of the dialogue command channel.
    /// * `event_rx`: receiver end of the dialogue event channel.
    pub fn new(
        command_tx: mpsc::Sender<DialogueCommand>,
        event_rx: mpsc::Receiver<DialogueEvent>,
        config: AppConfig,
    ) -> Self {
        Self {
            phase: DialoguePhase::Idle,
            question: None,
            clarification: None,
            notices: Vec::new(),
            outcome: None,
            input: String::new(),
            spinner_phase: 0.0,
            disconnected: false,
            command_tx,
            event_rx,
            config,
        }
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain all pending dialogue events (non-blocking).
    fn poll_events(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.apply(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        log::info!("ui: dialogue runner stopped");
                    }
                    self.disconnected = true;
                    break;
                }
            }
        }
    }

    fn apply(&mut self, event: DialogueEvent) {
        match event {
            DialogueEvent::Status(phase) => self.phase = phase,
            DialogueEvent::Question(view) => {
                // A new step drops the explanation of the previous one.
                let same_step = self
                    .question
                    .as_ref()
                    .is_some_and(|q| q.question.step == view.question.step);
                if !same_step {
                    self.clarification = None;
                    self.notices.clear();
                }
                self.question = Some(view);
                self.outcome = None;
            }
            DialogueEvent::Clarification { attribute, text } => {
                self.clarification = Some((attribute, text));
            }
            DialogueEvent::Notice(message) => {
                self.notices.push(message);
                if self.notices.len() > MAX_NOTICES {
                    self.notices.remove(0);
                }
            }
            DialogueEvent::Result(outcome) => {
                self.question = None;
                self.clarification = None;
                self.outcome = Some(outcome);
            }
            DialogueEvent::Restarted => self.reset(),
        }
    }

    fn send(&mut self, command: DialogueCommand) {
        if let Err(e) = self.command_tx.try_send(command) {
            log::warn!("ui: could not send command: {e}");
        }
    }

    fn answer(&mut self, text: String) {
        self.input.clear();
        self.send(DialogueCommand::Answer(text));
    }

    fn reset(&mut self) {
        self.question = None;
        self.clarification = None;
        self.notices.clear();
        self.outcome = None;
        self.input.clear();
    }

    // ── Drawing ──────────────────────────────────────────────────────────

    fn draw_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("FinFinder");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(!self.disconnected, egui::Button::new("Start over"))
                    .on_hover_text("Forget all answers and identify a new fish")
                    .clicked()
                {
                    self.send(DialogueCommand::Restart);
                }
                ui.label(
                    egui::RichText::new(self.status_text())
                        .color(self.phase_color())
                        .size(12.0),
                );
            });
        });
    }

    fn draw_busy(&self, ui: &mut egui::Ui) {
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(
                egui::RichText::new(format!("{}...", self.phase.label()))
                    .color(egui::Color32::from_rgb(68, 136, 255)),
            );
        });
    }

    fn draw_question(&mut self, ui: &mut egui::Ui, view: &QuestionView) {
        let question = &view.question;
        ui.label(
            egui::RichText::new(format!(
                "Step {} of {} · {} fish left",
                question.step + 1,
                question.total,
                view.remaining
            ))
            .color(egui::Color32::from_rgb(140, 140, 140))
            .size(11.0),
        );
        ui.add_space(4.0);
        ui.label(egui::RichText::new(view.prompt_text()).size(16.0).strong());
        ui.add_space(8.0);

        let enabled = !self.phase.is_busy() && !self.disconnected;
        let mut picked = None;
        ui.horizontal_wrapped(|ui| {
            for value in &question.values {
                if ui.add_enabled(enabled, egui::Button::new(value.as_str())).clicked() {
                    picked = Some(value.clone());
                }
            }
        });
        ui.horizontal(|ui| {
            for label in question.unsure_label.iter().chain(question.skip_label.iter()) {
                let button = egui::Button::new(
                    egui::RichText::new(label.as_str()).color(egui::Color32::from_rgb(180, 180, 180)),
                );
                if ui.add_enabled(enabled, button).clicked() {
                    picked = Some(label.clone());
                }
            }
        });
        if question.is_forced() {
            ui.label(
                egui::RichText::new("Please pick one of the options.")
                    .color(egui::Color32::from_rgb(255, 136, 68))
                    .size(11.0),
            );
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            let hint = match self.config.engine.validation {
                ValidationMode::FreeText => "Or describe it in your own words",
                ValidationMode::Literal => "Or type an option",
            };
            let field = ui.add_enabled(
                enabled,
                egui::TextEdit::singleline(&mut self.input).hint_text(hint),
            );
            let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let clicked = ui
                .add_enabled(enabled && !self.input.trim().is_empty(), egui::Button::new("Answer"))
                .clicked();
            if (submitted || clicked) && !self.input.trim().is_empty() {
                picked = Some(self.input.trim().to_string());
            }
        });

        if let Some(text) = picked {
            self.answer(text);
        }

        if !view.glossary.is_empty() {
            ui.add_space(8.0);
            egui::CollapsingHeader::new("Terms")
                .default_open(true)
                .show(ui, |ui| {
                    for (term, text) in &view.glossary {
                        ui.label(format!("{term}: {text}"));
                    }
                });
        }

        if let Some((attribute, text)) = &self.clarification {
            ui.add_space(8.0);
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.label(egui::RichText::new(format!("About {attribute}")).strong());
                ui.label(text.as_str());
            });
        }
    }

    fn draw_outcome(&mut self, ui: &mut egui::Ui, outcome: &DialogueOutcome) {
        ui.add_space(8.0);
        match outcome {
            DialogueOutcome::Identified(record) => {
                ui.label(
                    egui::RichText::new(format!("Your fish is: {}", record.name))
                        .size(18.0)
                        .color(egui::Color32::from_rgb(80, 200, 120)),
                );
                if let Some(description) = &record.description {
                    ui.add_space(4.0);
                    ui.label(description.as_str());
                }
            }
            DialogueOutcome::NoMatch => {
                ui.label(
                    egui::RichText::new("No fish in the catalog matches these answers.")
                        .color(egui::Color32::from_rgb(255, 136, 68)),
                );
            }
            DialogueOutcome::Ranked {
                matches,
                identification,
            } => {
                ui.label(egui::RichText::new("No exact match. Closest fish:").strong());
                for (i, m) in matches.iter().enumerate() {
                    ui.add_space(4.0);
                    ui.label(
                        egui::RichText::new(format!(
                            "{}. {}  (similarity {})",
                            i + 1,
                            m.record.name,
                            m.similarity_label()
                        ))
                        .color(egui::Color32::from_rgb(80, 200, 120)),
                    );
                    if let Some(explanation) = &m.explanation {
                        ui.label(explanation.as_str());
                    }
                }
                draw_identification(ui, identification.as_deref());
            }
            DialogueOutcome::BestRemaining {
                candidates,
                identification,
            } => {
                ui.label(egui::RichText::new("Still possible:").strong());
                for candidate in candidates {
                    ui.label(candidate_line(candidate));
                }
                draw_identification(ui, identification.as_deref());
            }
        }

        ui.add_space(12.0);
        if ui
            .add_enabled(!self.disconnected, egui::Button::new("Identify another fish"))
            .clicked()
        {
            self.send(DialogueCommand::Restart);
        }
    }

    fn draw_notices(&self, ui: &mut egui::Ui) {
        for notice in &self.notices {
            ui.label(
                egui::RichText::new(notice.as_str())
                    .color(egui::Color32::from_rgb(255, 136, 68))
                    .size(12.0),
            );
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn status_text(&self) -> String {
        if self.disconnected {
            "Disconnected".to_string()
        } else if self.phase.is_busy() {
            format!("{} {}", self.spinner_char(), self.phase.label())
        } else {
            self.phase.label().to_string()
        }
    }

    /// A simple rotating ASCII spinner character driven by `spinner_phase`.
    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        let idx = (self.spinner_phase as usize) % chars.len();
        chars[idx]
    }

    fn phase_color(&self) -> egui::Color32 {
        match self.phase {
            _ if self.disconnected => egui::Color32::from_rgb(255, 136, 68),
            DialoguePhase::Finished => egui::Color32::from_rgb(80, 200, 120),
            p if p.is_busy() => egui::Color32::from_rgb(68, 136, 255),
            _ => egui::Color32::from_rgb(150, 150, 150),
        }
    }
}

/// `"• name: summary"` for one remaining fish.
fn candidate_line(candidate: &RemainingCandidate) -> String {
    format!("• {}: {}", candidate.record.name, candidate.summary)
}

fn draw_identification(ui: &mut egui::Ui, identification: Option<&str>) {
    if let Some(text) = identification {
        ui.add_space(8.0);
        ui.label(egui::RichText::new("Expert guess").strong());
        ui.label(text);
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for FinFinderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();

        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        // Events arrive from another thread; keep polling.
        if self.phase.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(66));
        } else {
            ctx.request_repaint_after(Duration::from_millis(200));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_header(ui);
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                self.draw_notices(ui);

                if let Some(outcome) = self.outcome.clone() {
                    self.draw_outcome(ui, &outcome);
                } else if self.phase.is_busy() && self.question.is_none() {
                    self.draw_busy(ui);
                } else if let Some(view) = self.question.clone() {
                    self.draw_question(ui, &view);
                    if self.phase.is_busy() {
                        self.draw_busy(ui);
                    }
                } else if self.phase.is_busy() || self.phase == DialoguePhase::Idle {
                    self.draw_busy(ui);
                }
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let _ = self.command_tx.try_send(DialogueCommand::Quit);
        log::info!("FinFinder window closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
