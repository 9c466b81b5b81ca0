//! Overwrite policy and the interactive overwrite prompt.
//!
//! The policy starts from the `meta_overwrite` / `meta_preserve` options and
//! can be flipped for the rest of the run by answering `Y` or `N`. Prompts
//! from different workers are serialised so only one question is on the
//! terminal at a time.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use console::style;
use crossbeam_channel::{RecvTimeoutError, bounded};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::cancel::CancellationToken;
use crate::error::{CoreError, CoreResult};

static PROMPT_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// An answer to "overwrite this value?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    /// `y`: overwrite this value
    Yes,
    /// `Y`: overwrite this value and every later one
    YesToAll,
    /// `n`: keep this value
    No,
    /// `N`: keep this value and every later one
    NoToAll,
}

impl PromptAnswer {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "y" => Some(Self::Yes),
            "Y" => Some(Self::YesToAll),
            "n" => Some(Self::No),
            "N" => Some(Self::NoToAll),
            _ => None,
        }
    }
}

/// Run-wide overwrite decision shared by all workers.
#[derive(Debug, Clone, Default)]
pub struct OverwritePolicy {
    overwrite: Arc<AtomicBool>,
    preserve: Arc<AtomicBool>,
}

impl OverwritePolicy {
    pub fn new(overwrite: bool, preserve: bool) -> Self {
        Self {
            overwrite: Arc::new(AtomicBool::new(overwrite)),
            preserve: Arc::new(AtomicBool::new(preserve)),
        }
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite.load(Ordering::SeqCst)
    }

    pub fn preserve(&self) -> bool {
        self.preserve.load(Ordering::SeqCst)
    }

    fn settled(&self) -> Option<bool> {
        if self.overwrite() {
            Some(true)
        } else if self.preserve() {
            Some(false)
        } else {
            None
        }
    }

    /// Decides whether `field` may be overwritten, prompting if the policy
    /// is still open. Returns `Cancelled` if cancellation arrives while
    /// waiting for an answer.
    pub fn should_overwrite(
        &self,
        prompter: &dyn OverwritePrompter,
        question: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<bool> {
        if let Some(decision) = self.settled() {
            return Ok(decision);
        }
        let _turn = PROMPT_LOCK.lock();
        // Another worker may have answered Y or N while we waited.
        if let Some(decision) = self.settled() {
            return Ok(decision);
        }
        cancel.check()?;
        let answer = prompter.ask(question, cancel)?;
        Ok(match answer {
            PromptAnswer::Yes => true,
            PromptAnswer::YesToAll => {
                self.overwrite.store(true, Ordering::SeqCst);
                true
            }
            PromptAnswer::No => false,
            PromptAnswer::NoToAll => {
                self.preserve.store(true, Ordering::SeqCst);
                false
            }
        })
    }
}

pub trait OverwritePrompter: Send + Sync {
    fn ask(&self, question: &str, cancel: &CancellationToken) -> CoreResult<PromptAnswer>;
}

/// Reads answers from stdin, polling the cancellation token while waiting.
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl ConsolePrompter {
    fn read_line(cancel: &CancellationToken) -> CoreResult<Option<String>> {
        let (tx, rx) = bounded(1);
        std::thread::spawn(move || {
            let mut line = String::new();
            let read = std::io::stdin().lock().read_line(&mut line);
            let _ = tx.send(read.map(|n| (n > 0).then_some(line)));
        });
        loop {
            cancel.check()?;
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(line)) => return Ok(line),
                Ok(Err(e)) => return Err(CoreError::Io(e)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

impl OverwritePrompter for ConsolePrompter {
    fn ask(&self, question: &str, cancel: &CancellationToken) -> CoreResult<PromptAnswer> {
        loop {
            eprint!(
                "{} {} ",
                question,
                style("[y = yes, Y = yes to all, n = no, N = no to all]").dim()
            );
            let _ = std::io::stderr().flush();
            match Self::read_line(cancel)? {
                // End of input: keep the existing value.
                None => return Ok(PromptAnswer::No),
                Some(line) => {
                    if let Some(answer) = PromptAnswer::parse(&line) {
                        return Ok(answer);
                    }
                    eprintln!("{}", style("Please answer y, Y, n or N.").yellow());
                }
            }
        }
    }
}

/// Replays a fixed list of answers and records each question.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<PromptAnswer>>,
    questions: Mutex<Vec<String>>,
    cancel_on_ask: bool,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = PromptAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            questions: Mutex::new(Vec::new()),
            cancel_on_ask: false,
        }
    }

    /// A prompter that cancels the run when asked anything.
    pub fn cancelling() -> Self {
        Self {
            cancel_on_ask: true,
            ..Self::default()
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

impl OverwritePrompter for ScriptedPrompter {
    fn ask(&self, question: &str, cancel: &CancellationToken) -> CoreResult<PromptAnswer> {
        self.questions.lock().push(question.to_string());
        if self.cancel_on_ask {
            cancel.cancel();
            return Err(CoreError::Cancelled);
        }
        Ok(self.answers.lock().pop_front().unwrap_or(PromptAnswer::No))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_parse_case_sensitively() {
        assert_eq!(PromptAnswer::parse("y\n"), Some(PromptAnswer::Yes));
        assert_eq!(PromptAnswer::parse("Y"), Some(PromptAnswer::YesToAll));
        assert_eq!(PromptAnswer::parse(" n "), Some(PromptAnswer::No));
        assert_eq!(PromptAnswer::parse("N"), Some(PromptAnswer::NoToAll));
        assert_eq!(PromptAnswer::parse("yes"), None);
    }

    #[test]
    fn settled_policy_skips_prompt() {
        let policy = OverwritePolicy::new(true, false);
        let prompter = ScriptedPrompter::new([]);
        let cancel = CancellationToken::new();
        assert!(policy.should_overwrite(&prompter, "q", &cancel).unwrap());
        assert!(prompter.questions().is_empty());
    }

    #[test]
    fn no_to_all_sets_preserve_for_the_run() {
        let policy = OverwritePolicy::new(false, false);
        let prompter = ScriptedPrompter::new([PromptAnswer::NoToAll]);
        let cancel = CancellationToken::new();
        assert!(!policy.should_overwrite(&prompter, "first", &cancel).unwrap());
        assert!(policy.preserve());
        assert!(!policy.should_overwrite(&prompter, "second", &cancel).unwrap());
        assert_eq!(prompter.questions(), vec!["first".to_string()]);
    }

    #[test]
    fn clones_share_the_policy() {
        let policy = OverwritePolicy::new(false, false);
        let clone = policy.clone();
        let prompter = ScriptedPrompter::new([PromptAnswer::YesToAll]);
        let cancel = CancellationToken::new();
        assert!(policy.should_overwrite(&prompter, "q", &cancel).unwrap());
        assert!(clone.overwrite());
    }

    #[test]
    fn cancellation_during_prompt_is_an_error() {
        let policy = OverwritePolicy::new(false, false);
        let prompter = ScriptedPrompter::cancelling();
        let cancel = CancellationToken::new();
        let result = policy.should_overwrite(&prompter, "q", &cancel);
        assert!(matches!(result, Err(CoreError::Cancelled)));
        assert!(cancel.is_cancelled());
    }
}
