use crate::RuntimeError;
use dialoguer::Confirm;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{stdin, stdout, IsTerminal};

/// Yes/no questions put to the user.
pub trait Prompter {
    /// Whether a user is attached to answer questions.
    fn is_interactive(&self) -> bool;

    fn confirm(&self, message: &str, default: bool) -> Result<bool, RuntimeError>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        stdin().is_terminal() && stdout().is_terminal()
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool, RuntimeError> {
        if !self.is_interactive() {
            return Err(RuntimeError::NotInteractive);
        }
        Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(|e| RuntimeError::Prompt(e.to_string()))
    }
}

/// Answers questions from a fixed list and records what was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    interactive: bool,
    answers: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn interactive(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            interactive: true,
            answers: RefCell::new(answers.into_iter().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn non_interactive() -> Self {
        Self::default()
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool, RuntimeError> {
        if !self.interactive {
            return Err(RuntimeError::NotInteractive);
        }
        self.asked.borrow_mut().push(message.to_owned());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_answers_in_order_then_default() {
        let prompter = ScriptedPrompter::interactive([true, false]);
        assert!(prompter.confirm("first?", false).unwrap());
        assert!(!prompter.confirm("second?", true).unwrap());
        assert!(prompter.confirm("third?", true).unwrap());
        assert_eq!(prompter.asked(), vec!["first?", "second?", "third?"]);
    }

    #[test]
    fn non_interactive_refuses_to_ask() {
        let prompter = ScriptedPrompter::non_interactive();
        assert!(!prompter.is_interactive());
        assert!(matches!(
            prompter.confirm("sure?", true),
            Err(RuntimeError::NotInteractive)
        ));
        assert!(prompter.asked().is_empty());
    }
}
