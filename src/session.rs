//! Interactive choice between detection strategies.
//!
//! The flow is a small state machine. It only ever ends in `Accepted` or
//! `Cancelled`, so a "quit" answered deep in a fallback cannot be lost.

use crate::config::Settings;
use crate::error::ChapterError;
use crate::models::{ChapterPartition, DetectionSource};
use crate::services::chapterizer::{Strategy, describe, detect};
use crate::services::document::Document;
use crate::services::llm::GeminiClient;
use crate::services::logger::Logger;
use crate::services::manual::MANUAL_FORMAT_HINT;
use std::io::{BufRead, Write};

const REVIEW_TOC_PROMPT: &str =
    "Choose action: [A]ccept TOC ranges, [T]ry AI detection, [M]anual entry, [Q]uit? ";
const NO_TOC_PROMPT: &str = "Choose action: [T]ry AI detection, [M]anual entry, [Q]uit? ";
const REVIEW_MODEL_PROMPT: &str = "Choose action: [A]ccept AI ranges, [M]anual entry, [Q]uit? ";
const MODEL_FAILED_PROMPT: &str = "Choose action: [M]anual entry, [Q]uit? ";
const REVIEW_MANUAL_PROMPT: &str = "Confirm these ranges? [Y]es, [N]o (re-enter), [Q]uit? ";
const MANUAL_FAILED_PROMPT: &str = "Invalid format. Try entering ranges again? [Y]es, [Q]uit? ";

/// Line-oriented user input. `None` means the input stream is closed.
pub trait Console {
    fn ask(&mut self, prompt: &str) -> Option<String>;
}

/// The three strategies, already bound to a document.
pub trait Detector {
    fn toc(&mut self) -> ChapterPartition;
    fn model(&mut self) -> Result<ChapterPartition, ChapterError>;
    fn manual(&mut self, input: &str) -> Result<ChapterPartition, ChapterError>;
    /// Highest valid page, shown in the manual entry prompt.
    fn total_pages(&self) -> usize;
}

/// Reads answers from stdin, printing each prompt first.
pub struct StdinConsole;

impl Console for StdinConsole {
    fn ask(&mut self, prompt: &str) -> Option<String> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", prompt).ok()?;
        stdout.flush().ok()?;

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Runs the real strategies against an open document.
///
/// The model client is built on demand so a missing API key only fails
/// the AI branch.
pub struct DocumentDetector<'a> {
    doc: &'a dyn Document,
    settings: &'a Settings,
    logger: &'a dyn Logger,
}

impl<'a> DocumentDetector<'a> {
    pub fn new(doc: &'a dyn Document, settings: &'a Settings, logger: &'a dyn Logger) -> Self {
        DocumentDetector { doc, settings, logger }
    }
}

impl Detector for DocumentDetector<'_> {
    fn toc(&mut self) -> ChapterPartition {
        detect(self.doc, Strategy::Toc, self.logger).unwrap_or_default()
    }

    fn model(&mut self) -> Result<ChapterPartition, ChapterError> {
        let client = GeminiClient::from_settings(self.settings)?;
        detect(self.doc, Strategy::Model(&client), self.logger)
    }

    fn manual(&mut self, input: &str) -> Result<ChapterPartition, ChapterError> {
        detect(self.doc, Strategy::Manual(input), self.logger)
    }

    fn total_pages(&self) -> usize {
        self.doc.page_count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    DetectToc,
    ReviewToc(ChapterPartition),
    ChooseWithoutToc,
    DetectModel,
    ReviewModel(ChapterPartition),
    ModelFailed,
    EnterManual,
    ReviewManual(ChapterPartition),
    ManualFailed,
    Accepted {
        source: DetectionSource,
        chapters: ChapterPartition,
    },
    Cancelled,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Accepted { .. } | State::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted {
        source: DetectionSource,
        chapters: ChapterPartition,
    },
    Cancelled,
}

pub struct Session<'a> {
    detector: &'a mut dyn Detector,
    console: &'a mut dyn Console,
    logger: &'a dyn Logger,
}

impl<'a> Session<'a> {
    pub fn new(
        detector: &'a mut dyn Detector,
        console: &'a mut dyn Console,
        logger: &'a dyn Logger,
    ) -> Self {
        Session {
            detector,
            console,
            logger,
        }
    }

    pub fn run(mut self) -> Outcome {
        let mut state = State::DetectToc;
        while !state.is_terminal() {
            state = self.step(state);
        }

        match state {
            State::Accepted { source, chapters } => Outcome::Accepted { source, chapters },
            _ => {
                self.logger.info("Operation cancelled by user.");
                Outcome::Cancelled
            }
        }
    }

    /// Advances the machine by one transition.
    pub fn step(&mut self, state: State) -> State {
        match state {
            State::DetectToc => {
                self.logger.info("--- Attempting Table of Contents (TOC) Detection ---");
                let chapters = self.detector.toc();
                if chapters.is_empty() {
                    self.logger.info("No chapters found automatically via TOC.");
                    State::ChooseWithoutToc
                } else {
                    self.logger.info("Potential chapters found via TOC:");
                    describe(&chapters, self.logger);
                    State::ReviewToc(chapters)
                }
            }
            State::ReviewToc(chapters) => {
                match self.choose(REVIEW_TOC_PROMPT, &['A', 'T', 'M', 'Q']) {
                    Some('A') => State::Accepted {
                        source: DetectionSource::Toc,
                        chapters,
                    },
                    Some('T') => State::DetectModel,
                    Some('M') => State::EnterManual,
                    Some('Q') | None => State::Cancelled,
                    Some(_) => State::ReviewToc(chapters),
                }
            }
            State::ChooseWithoutToc => {
                match self.choose(NO_TOC_PROMPT, &['T', 'M', 'Q']) {
                    Some('T') => State::DetectModel,
                    Some('M') => State::EnterManual,
                    Some('Q') | None => State::Cancelled,
                    Some(_) => State::ChooseWithoutToc,
                }
            }
            State::DetectModel => {
                self.logger.info("--- Attempting AI Detection ---");
                match self.detector.model() {
                    Ok(chapters) => {
                        self.logger.info("Potential chapters suggested by AI:");
                        describe(&chapters, self.logger);
                        State::ReviewModel(chapters)
                    }
                    Err(e) => {
                        self.logger.error(&e.to_string());
                        self.logger.info("AI detection failed or yielded no valid chapters.");
                        State::ModelFailed
                    }
                }
            }
            State::ReviewModel(chapters) => {
                match self.choose(REVIEW_MODEL_PROMPT, &['A', 'M', 'Q']) {
                    Some('A') => State::Accepted {
                        source: DetectionSource::Ai,
                        chapters,
                    },
                    Some('M') => State::EnterManual,
                    Some('Q') | None => State::Cancelled,
                    Some(_) => State::ReviewModel(chapters),
                }
            }
            State::ModelFailed => match self.choose(MODEL_FAILED_PROMPT, &['M', 'Q']) {
                Some('M') => State::EnterManual,
                Some('Q') | None => State::Cancelled,
                Some(_) => State::ModelFailed,
            },
            State::EnterManual => {
                let prompt = format!(
                    "Enter ranges as ChapNum:StartPage-EndPage, separated by commas (1-{}):\n",
                    self.detector.total_pages()
                );
                let Some(input) = self.console.ask(&prompt) else {
                    return State::Cancelled;
                };
                match self.detector.manual(&input) {
                    Ok(chapters) => {
                        self.logger.info("You entered:");
                        describe(&chapters, self.logger);
                        State::ReviewManual(chapters)
                    }
                    Err(e) => {
                        self.logger.error(&format!("Error parsing manual ranges: {}", e));
                        self.logger.info(MANUAL_FORMAT_HINT);
                        State::ManualFailed
                    }
                }
            }
            State::ReviewManual(chapters) => {
                match self.choose(REVIEW_MANUAL_PROMPT, &['Y', 'N', 'Q']) {
                    Some('Y') => State::Accepted {
                        source: DetectionSource::Manual,
                        chapters,
                    },
                    Some('N') => State::EnterManual,
                    Some('Q') | None => State::Cancelled,
                    Some(_) => State::ReviewManual(chapters),
                }
            }
            State::ManualFailed => {
                match self.choose(MANUAL_FAILED_PROMPT, &['Y', 'Q']) {
                    Some('Y') => State::EnterManual,
                    Some('Q') | None => State::Cancelled,
                    Some(_) => State::ManualFailed,
                }
            }
            terminal => terminal,
        }
    }

    /// Reads one answer. `None` on closed input; `Some('?')` for anything not offered.
    fn choose(&mut self, prompt: &str, options: &[char]) -> Option<char> {
        let answer = self.console.ask(prompt)?;
        let mut chars = answer.trim().chars().flat_map(char::to_uppercase);
        match (chars.next(), chars.next()) {
            (Some(c), None) if options.contains(&c) => Some(c),
            _ => {
                self.logger.info("Invalid choice.");
                Some('?')
            }
        }
    }
}
