//! Questions for values not given on the command line
//!
//! On a terminal the questions are asked with `dialoguer`, which re-asks until the answer is
//! valid. When stdin is not a terminal (a pipe or a here-document) `dialoguer` can't be used;
//! answers are then read one line per question and an invalid answer fails the run, since a
//! script can't correct itself.

use std::io::{BufRead, IsTerminal};

use anyhow::{Context, Result, anyhow};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};

pub enum Prompter<R> {
    Terminal(ColorfulTheme),
    Piped(R),
}

impl Prompter<std::io::StdinLock<'static>> {
    pub fn for_stdin() -> Self {
        let stdin = std::io::stdin();
        if stdin.is_terminal() && console::Term::stderr().is_term() {
            Self::Terminal(ColorfulTheme::default())
        } else {
            Self::Piped(stdin.lock())
        }
    }
}

impl<R: BufRead> Prompter<R> {
    /// Ask for a value; an empty answer selects `default` when there is one
    pub fn input<T, E, F>(&mut self, question: &str, default: Option<&str>, mut validate: F) -> Result<T>
    where
        F: FnMut(&str) -> Result<T, E>,
        E: std::fmt::Display,
    {
        let answer = match self {
            Self::Terminal(theme) => {
                let mut input = Input::<String>::with_theme(&*theme)
                    .with_prompt(question)
                    .allow_empty(default.is_some())
                    .show_default(default.is_some_and(|default| !default.is_empty()));
                if let Some(default) = default {
                    input = input.default(default.to_string());
                }
                input
                    .validate_with(|answer: &String| {
                        validate(answer).map(drop).map_err(|error| error.to_string())
                    })
                    .interact_text()
                    .with_context(|| format!("failed asking {question:?}"))?
            }
            Self::Piped(input) => read_answer(input, question, default)?,
        };
        validate(&answer)
            .map_err(|error| anyhow!("{error}"))
            .with_context(|| format!("invalid answer to {question:?}"))
    }

    /// Ask a yes/no question
    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        match self {
            Self::Terminal(theme) => Confirm::with_theme(&*theme)
                .with_prompt(question)
                .default(default)
                .interact()
                .with_context(|| format!("failed asking {question:?}")),
            Self::Piped(input) => {
                let answer = read_answer(input, question, Some(if default { "Y" } else { "N" }))?;
                common::validate::yes_no(&answer)
                    .map_err(|error| anyhow!("{error}"))
                    .with_context(|| format!("invalid answer to {question:?}"))
            }
        }
    }
}

fn read_answer<R: BufRead>(input: &mut R, question: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) if !default.is_empty() => println!("{question} [{default}]"),
        _ => println!("{question}"),
    }
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .with_context(|| format!("failed reading the answer to {question:?}"))?;
    if read == 0 {
        return Err(anyhow!("no answer to {question:?}: end of input"));
    }
    let answer = line.trim_end_matches(['\n', '\r']);
    Ok(match default {
        Some(default) if answer.is_empty() => default.to_string(),
        _ => answer.to_string(),
    })
}
