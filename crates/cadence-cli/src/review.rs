//! Interactive review loop
//!
//! Drives a [`SessionCoordinator`] from line-oriented input. Judgements are
//! dispatched to storage in the background; failures are reported between
//! cards and can be retried with `retry`.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::time::Duration;

use cadence_core::{
    format_interval, AckEffect, CardRecord, Judgement, Outcome, OutcomeMode, OutcomeSink,
    PersistAck, PersistDispatcher, PersistRequest, ReviewableItem, SessionCoordinator,
    SessionSummary,
};
use chrono::Utc;
use colored::Colorize;
use tokio::sync::mpsc;

/// How long to wait for outstanding persists once the session ends
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty line
    Continue,
    Judge(Outcome),
    Retry,
    Help,
    Quit,
    Unknown(String),
}

/// Interpret a line of input under the given outcome mode
pub fn parse_command(line: &str, mode: OutcomeMode) -> Command {
    let line = line.trim().to_lowercase();
    let judged = |outcome: Outcome| {
        if mode.allows(outcome) {
            Command::Judge(outcome)
        } else {
            Command::Unknown(line.clone())
        }
    };

    match line.as_str() {
        "" => Command::Continue,
        "q" | "quit" | "exit" => Command::Quit,
        "retry" => Command::Retry,
        "?" | "h" | "help" => Command::Help,
        "r" | "y" => judged(Outcome::Remembered),
        "p" => judged(Outcome::Partial),
        "f" | "n" => judged(Outcome::Forgotten),
        other => match Outcome::parse_name(other) {
            Ok(outcome) => judged(outcome),
            Err(_) => Command::Unknown(line.clone()),
        },
    }
}

/// Result of a review run
#[derive(Debug, Clone)]
pub struct ReviewReport {
    pub summary: SessionSummary,
    /// Judgements kept locally that never reached storage
    pub unsaved: Vec<PersistRequest>,
    pub quit_early: bool,
}

/// A live review over a terminal-like reader and writer
pub struct ReviewLoop<S: OutcomeSink> {
    session: SessionCoordinator,
    dispatcher: PersistDispatcher<S>,
    acks: mpsc::UnboundedReceiver<PersistAck>,
    cards: HashMap<String, CardRecord>,
}

impl<S: OutcomeSink> ReviewLoop<S> {
    pub fn new(
        session: SessionCoordinator,
        dispatcher: PersistDispatcher<S>,
        acks: mpsc::UnboundedReceiver<PersistAck>,
        cards: impl IntoIterator<Item = CardRecord>,
    ) -> Self {
        let cards = cards
            .into_iter()
            .map(|card| (card.item.id.clone(), card))
            .collect();
        Self {
            session,
            dispatcher,
            acks,
            cards,
        }
    }

    pub fn session(&self) -> &SessionCoordinator {
        &self.session
    }

    /// Run until the queue empties, the user quits, or input ends
    pub async fn run<R: BufRead, W: Write>(
        mut self,
        mut input: R,
        out: &mut W,
    ) -> anyhow::Result<ReviewReport> {
        let mut quit_early = false;

        while !self.session.state().is_complete() {
            let item = self.session.present(Utc::now())?;
            self.show_front(&item, out)?;

            let outcome = match self.prompt_reveal(&mut input, out).await? {
                Some(Command::Judge(outcome)) => outcome,
                Some(_) => {
                    self.show_back(&item, out)?;
                    match self.prompt_outcome(&mut input, out).await? {
                        Some(outcome) => outcome,
                        None => {
                            quit_early = true;
                            break;
                        }
                    }
                }
                None => {
                    quit_early = true;
                    break;
                }
            };

            let judgement = self.session.judge(outcome, Utc::now())?;
            self.show_judgement(&judgement, out)?;
            self.dispatcher.dispatch(judgement.request);
            self.settle(out).await?;
        }

        self.finish(&mut input, out).await?;

        Ok(ReviewReport {
            summary: self.session.summary(),
            unsaved: self
                .session
                .failed_persists()
                .into_iter()
                .map(|entry| entry.request.clone())
                .collect(),
            quit_early,
        })
    }

    // ========================================================================
    // PROMPTS
    // ========================================================================

    /// Wait for Enter. `None` means quit; a judgement skips the reveal.
    async fn prompt_reveal<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        out: &mut W,
    ) -> anyhow::Result<Option<Command>> {
        loop {
            write!(out, "{} ", "Enter to reveal >".dimmed())?;
            out.flush()?;
            let Some(line) = read_line(input)? else {
                return Ok(None);
            };
            match parse_command(&line, self.session.engine().mode()) {
                Command::Quit => return Ok(None),
                Command::Retry => self.retry_failed(out).await?,
                Command::Help | Command::Unknown(_) => self.show_help(out)?,
                command => return Ok(Some(command)),
            }
        }
    }

    /// Ask for an outcome. `None` means quit.
    async fn prompt_outcome<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        out: &mut W,
    ) -> anyhow::Result<Option<Outcome>> {
        loop {
            write!(out, "{} ", self.outcome_prompt().dimmed())?;
            out.flush()?;
            let Some(line) = read_line(input)? else {
                return Ok(None);
            };
            match parse_command(&line, self.session.engine().mode()) {
                Command::Judge(outcome) => return Ok(Some(outcome)),
                Command::Quit => return Ok(None),
                Command::Retry => self.retry_failed(out).await?,
                Command::Continue => {}
                Command::Help | Command::Unknown(_) => self.show_help(out)?,
            }
        }
    }

    fn outcome_prompt(&self) -> String {
        let choices: Vec<&str> = self
            .session
            .engine()
            .mode()
            .outcomes()
            .into_iter()
            .map(|outcome| match outcome {
                Outcome::Remembered => "[r]emembered",
                Outcome::Partial => "[p]artial",
                Outcome::Forgotten => "[f]orgotten",
            })
            .collect();
        format!("{} >", choices.join(" "))
    }

    // ========================================================================
    // RENDERING
    // ========================================================================

    fn show_front<W: Write>(&self, item: &ReviewableItem, out: &mut W) -> anyhow::Result<()> {
        let queue = self.session.queue();
        writeln!(out)?;
        writeln!(
            out,
            "{} {}/{}  {}",
            "Card".cyan().bold(),
            queue.completed_count() + 1,
            queue.total(),
            format!(
                "tier {} | {} left | {:.0}% done",
                item.current_tier,
                queue.len(),
                self.session.progress() * 100.0
            )
            .dimmed()
        )?;
        match self.cards.get(&item.id) {
            Some(card) => writeln!(out, "{}", card.front.white().bold())?,
            None => writeln!(out, "{}", item.id.white().bold())?,
        }
        Ok(())
    }

    fn show_back<W: Write>(&self, item: &ReviewableItem, out: &mut W) -> anyhow::Result<()> {
        let back = self
            .cards
            .get(&item.id)
            .and_then(|card| card.back.as_deref())
            .unwrap_or("(no answer recorded)");
        writeln!(out, "{} {}", "Answer:".green(), back)?;
        Ok(())
    }

    fn show_judgement<W: Write>(&self, judgement: &Judgement, out: &mut W) -> anyhow::Result<()> {
        let status = if judgement.retired {
            "done".green()
        } else {
            "again later this session".yellow()
        };
        writeln!(
            out,
            "  {} tier {}, next review in {} ({})",
            judgement.request.outcome.as_str().bold(),
            judgement.update.new_tier,
            format_interval(judgement.update.interval_days),
            status
        )?;
        Ok(())
    }

    fn show_help<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        writeln!(out, "{}", "Commands:".yellow())?;
        writeln!(out, "  Enter   reveal the answer")?;
        writeln!(out, "  {}", self.outcome_prompt().trim_end_matches(" >"))?;
        writeln!(out, "  retry   re-submit reviews that failed to save")?;
        writeln!(out, "  q       end the session")?;
        Ok(())
    }

    // ========================================================================
    // PERSIST RECONCILIATION
    // ========================================================================

    fn apply_ack<W: Write>(&mut self, ack: PersistAck, out: &mut W) -> anyhow::Result<()> {
        if let AckEffect::Failed(failure) = self.session.apply_persist_result(ack) {
            writeln!(
                out,
                "  {} {} (type `retry` to try again)",
                "!".red().bold(),
                failure.to_string().red()
            )?;
        }
        Ok(())
    }

    /// Fold in whatever acks have arrived without waiting
    async fn settle<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        while let Ok(ack) = self.acks.try_recv() {
            self.apply_ack(ack, out)?;
        }
        Ok(())
    }

    /// Wait (bounded) for every in-flight persist to report
    async fn wait_in_flight<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        while self.session.pending().in_flight_count() > 0 {
            match tokio::time::timeout(SETTLE_TIMEOUT, self.acks.recv()).await {
                Ok(Some(ack)) => self.apply_ack(ack, out)?,
                Ok(None) | Err(_) => {
                    tracing::warn!(
                        in_flight = self.session.pending().in_flight_count(),
                        "Gave up waiting for persists"
                    );
                    break;
                }
            }
        }
        Ok(())
    }

    async fn retry_failed<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let requests = self.session.retry_all_failed();
        if requests.is_empty() {
            writeln!(out, "{}", "Nothing to retry.".dimmed())?;
            return Ok(());
        }
        writeln!(out, "Retrying {} review(s)...", requests.len())?;
        for request in requests {
            self.dispatcher.dispatch(request);
        }
        self.wait_in_flight(out).await
    }

    async fn finish<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> anyhow::Result<()> {
        self.wait_in_flight(out).await?;

        while !self.session.failed_persists().is_empty() {
            let failures = self.session.failed_persists().len();
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                format!("{} review(s) could not be saved.", failures).red().bold()
            )?;
            write!(
                out,
                "{} ",
                "Type `retry` to try again, or Enter to leave them unsaved >".dimmed()
            )?;
            out.flush()?;

            let Some(line) = read_line(input)? else {
                break;
            };
            match parse_command(&line, self.session.engine().mode()) {
                Command::Retry => self.retry_failed(out).await?,
                _ => break,
            }
        }
        Ok(())
    }
}

/// Next line of input, `None` at end of input
fn read_line<R: BufRead>(input: &mut R) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
