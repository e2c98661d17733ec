use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::controller::{
    ControllerConfig, ControllerError, EventOutcome, FilterController, FormEvent,
    ResponseDisposition,
};
use crate::fetch::{self, FetchCompletion, FetchRequest, ListingSource};
use crate::form::{ControlKind, GENRES_FIELD};
use crate::format::Dimension;
use crate::page::{self, Page};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },

    #[error("usage: {usage}")]
    Usage { usage: &'static str },

    #[error("invalid number '{value}'")]
    InvalidNumber { value: String },

    #[error("#{id} is not a checkbox")]
    NotACheckbox { id: String },
}

/// A user action in interactive mode, one per input line.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionCommand {
    Slide {
        dimension: Dimension,
        low: f64,
        high: f64,
    },
    Type { id: String, text: String },
    Check { genre: String },
    Uncheck { genre: String },
    Submit,
    Show,
    Query,
    Wait,
    Help,
    Quit,
}

pub const COMMAND_HELP: &str = "\
price LOW HIGH     move the price slider
size LOW HIGH      move the size slider
title TEXT         type into the title search
type ID TEXT       type into any text control
check GENRE        tick a genre checkbox
uncheck GENRE      clear a genre checkbox
submit             press Enter in the form
show               print the current listing
query              print the current query string
wait               wait for in-flight requests
help               this text
quit               exit";

fn parse_number(value: &str) -> Result<f64, SessionError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| SessionError::InvalidNumber {
            value: value.to_string(),
        })
}

impl SessionCommand {
    /// Parses one line; blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, SessionError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let command = match head.to_lowercase().as_str() {
            "price" | "size" => {
                let dimension = if head.eq_ignore_ascii_case("price") {
                    Dimension::Price
                } else {
                    Dimension::Size
                };
                let parts: Vec<&str> = rest.split_whitespace().collect();
                let [low, high] = parts.as_slice() else {
                    return Err(SessionError::Usage {
                        usage: "price|size LOW HIGH",
                    });
                };
                SessionCommand::Slide {
                    dimension,
                    low: parse_number(low)?,
                    high: parse_number(high)?,
                }
            }
            "title" => SessionCommand::Type {
                id: "title".to_string(),
                text: rest.to_string(),
            },
            "type" => {
                let (id, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                if id.is_empty() {
                    return Err(SessionError::Usage { usage: "type ID TEXT" });
                }
                SessionCommand::Type {
                    id: id.to_string(),
                    text: text.trim().to_string(),
                }
            }
            "check" | "uncheck" => {
                if rest.is_empty() {
                    return Err(SessionError::Usage {
                        usage: "check|uncheck GENRE",
                    });
                }
                let genre = rest.to_string();
                if head.eq_ignore_ascii_case("check") {
                    SessionCommand::Check { genre }
                } else {
                    SessionCommand::Uncheck { genre }
                }
            }
            "submit" => SessionCommand::Submit,
            "show" | "ls" => SessionCommand::Show,
            "query" => SessionCommand::Query,
            "wait" => SessionCommand::Wait,
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" | "q" => SessionCommand::Quit,
            _ => {
                return Err(SessionError::UnknownCommand {
                    command: head.to_string(),
                })
            }
        };
        Ok(Some(command))
    }
}

/// Drives a controller the way a browser would: user actions become the
/// event sequence the page sees, and each resulting request runs on its own task.
pub struct Session {
    controller: FilterController,
    source: Arc<dyn ListingSource>,
    tx: mpsc::UnboundedSender<FetchCompletion>,
    rx: mpsc::UnboundedReceiver<FetchCompletion>,
    in_flight: usize,
    default_prevented: u64,
}

impl Session {
    /// Binds the controller and starts the initial refresh requests.
    pub fn start(
        config: ControllerConfig,
        page: Page,
        source: Arc<dyn ListingSource>,
    ) -> Result<Self, SessionError> {
        let (controller, initial) = FilterController::init(config, page)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = Self {
            controller,
            source,
            tx,
            rx,
            in_flight: 0,
            default_prevented: 0,
        };
        for request in initial {
            session.dispatch(request);
        }
        Ok(session)
    }

    pub fn controller(&self) -> &FilterController {
        &self.controller
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn default_prevented(&self) -> u64 {
        self.default_prevented
    }

    fn dispatch(&mut self, request: FetchRequest) {
        self.in_flight += 1;
        fetch::spawn_fetch(self.source.clone(), request, self.tx.clone());
    }

    fn react(&mut self, outcome: EventOutcome) -> usize {
        if outcome.prevent_default {
            self.default_prevented += 1;
        }
        match outcome.request {
            Some(request) => {
                self.dispatch(request);
                1
            }
            None => 0,
        }
    }

    /// Dispatches one event; returns how many requests it started.
    pub fn fire(&mut self, event: FormEvent) -> usize {
        let outcome = self.controller.handle(event);
        self.react(outcome)
    }

    pub fn move_slider(
        &mut self,
        dimension: Dimension,
        low: f64,
        high: f64,
    ) -> Result<usize, SessionError> {
        let outcome = self.controller.set_slider(dimension, low, high)?;
        Ok(self.react(outcome))
    }

    /// Typing fires `input` only; `change` waits for blur.
    pub fn type_text(&mut self, id: &str, text: &str) -> Result<usize, SessionError> {
        self.controller.set_control_value(id, text)?;
        Ok(self.fire(FormEvent::Input {
            target: id.to_string(),
        }))
    }

    /// Clicking a checkbox fires `input` then `change`.
    pub fn set_checkbox(&mut self, id: &str, checked: bool) -> Result<usize, SessionError> {
        let is_checkbox = self
            .controller
            .page()
            .form()
            .control(id)
            .map(|c| c.kind == ControlKind::Checkbox);
        match is_checkbox {
            Some(true) => {}
            Some(false) => return Err(SessionError::NotACheckbox { id: id.to_string() }),
            None => {
                return Err(ControllerError::UnknownControl { id: id.to_string() }.into());
            }
        }
        self.controller.set_checked(id, checked)?;
        let started = self.fire(FormEvent::Input {
            target: id.to_string(),
        });
        Ok(started
            + self.fire(FormEvent::Change {
                target: id.to_string(),
            }))
    }

    /// Clicks the genre checkbox whose submitted value is exactly `genre`.
    pub fn set_genre(&mut self, genre: &str, checked: bool) -> Result<usize, SessionError> {
        let id = self
            .controller
            .page()
            .form()
            .checkbox_for(GENRES_FIELD, genre)
            .map(|c| c.id.clone())
            .ok_or_else(|| ControllerError::UnknownControl {
                id: page::genre_control_id(genre),
            })?;
        self.set_checkbox(&id, checked)
    }

    pub fn submit(&mut self) -> usize {
        self.fire(FormEvent::Submit)
    }

    /// Runs one interactive command. `Show`/`Query`/`Help`/`Quit`/`Wait` are
    /// left to the caller and start nothing here.
    pub fn apply(&mut self, command: &SessionCommand) -> Result<usize, SessionError> {
        match command {
            SessionCommand::Slide {
                dimension,
                low,
                high,
            } => self.move_slider(*dimension, *low, *high),
            SessionCommand::Type { id, text } => self.type_text(id, text),
            SessionCommand::Check { genre } => self.set_genre(genre, true),
            SessionCommand::Uncheck { genre } => self.set_genre(genre, false),
            SessionCommand::Submit => Ok(self.submit()),
            SessionCommand::Show
            | SessionCommand::Query
            | SessionCommand::Wait
            | SessionCommand::Help
            | SessionCommand::Quit => Ok(0),
        }
    }

    fn settle_one(&mut self, completion: FetchCompletion) -> ResponseDisposition {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.controller.complete(completion)
    }

    /// Waits for the next completion and applies it.
    pub async fn next_completion(&mut self) -> Option<ResponseDisposition> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.rx.recv().await?;
        Some(self.settle_one(completion))
    }

    /// Applies a completion already received by the caller (e.g. from a `select!`).
    pub fn accept(&mut self, completion: FetchCompletion) -> ResponseDisposition {
        self.settle_one(completion)
    }

    /// Mutable access to the receiver for `select!` loops.
    pub fn completions(&mut self) -> &mut mpsc::UnboundedReceiver<FetchCompletion> {
        &mut self.rx
    }

    /// Waits until every request started so far has resolved.
    pub async fn settle(&mut self) -> Vec<ResponseDisposition> {
        let mut out = Vec::new();
        while let Some(disposition) = self.next_completion().await {
            out.push(disposition);
        }
        debug!(settled = out.len(), "all listing requests resolved");
        out
    }

    pub fn listing(&self) -> &str {
        let listing = &self.controller.ids().listing;
        self.controller.page().inner_html(listing).unwrap_or("")
    }
}
