//! Interactive chat loop (`raya chat`).
//!
//! A few commands are answered locally (`time`, `date`, `news <topic>`,
//! `exit`); everything else goes through [`Orchestrator::ask`]. The last
//! few exchanges are passed to the model backends as prompt context.

use chrono::Local;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use tracing::debug;

use crate::cache::AnswerCache;
use crate::orchestrator::Orchestrator;
use crate::source_news::{extract_topic, NewsSource};
use crate::traits::AskContext;

pub const PREFIX: &str = "RAYA SAY: ";
const HISTORY_TURNS: usize = 3;
const GOODBYE: &str = "Shutting down. Have a great day!";

/// What the loop should do after a line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Say(String),
    Exit(String),
}

pub struct ChatSession<'a, C: AnswerCache> {
    orchestrator: &'a mut Orchestrator<C>,
    news: Option<&'a NewsSource>,
    history: VecDeque<(String, String)>,
}

impl<'a, C: AnswerCache> ChatSession<'a, C> {
    pub fn new(orchestrator: &'a mut Orchestrator<C>, news: Option<&'a NewsSource>) -> Self {
        Self {
            orchestrator,
            news,
            history: VecDeque::new(),
        }
    }

    /// Handle one input line. Blank lines produce no reply.
    pub fn handle(&mut self, line: &str) -> Option<Reply> {
        let input = line.trim();
        if input.is_empty() {
            return None;
        }
        let command = input.to_lowercase();

        let reply = match command.as_str() {
            "exit" | "quit" | "bye" => return Some(Reply::Exit(GOODBYE.to_string())),
            "time" => format!("The current time is {}", Local::now().format("%H:%M:%S")),
            "date" => format!("Today's date is {}", Local::now().format("%Y-%m-%d")),
            c if c.starts_with("news ") => self.headlines(input),
            _ => {
                let ctx = AskContext {
                    prompt_context: self.prompt_context(),
                    ..AskContext::default()
                };
                self.orchestrator.ask(input, &ctx).text().to_string()
            }
        };

        self.remember(input, &reply);
        Some(Reply::Say(reply))
    }

    fn headlines(&self, input: &str) -> String {
        let topic = extract_topic(input);
        let Some(news) = self.news else {
            return "News feeds are disabled.".to_string();
        };
        debug!(topic = %topic, "chat news request");
        let headlines = news.topic_headlines(&topic);
        if headlines.is_empty() {
            return format!("Sorry, I couldn't find recent news about {}.", topic);
        }
        let lines: Vec<String> = headlines
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{}. {}", i + 1, h))
            .collect();
        format!("Here are some recent headlines:\n{}", lines.join("\n"))
    }

    fn remember(&mut self, input: &str, reply: &str) {
        self.history.push_back((input.to_string(), reply.to_string()));
        while self.history.len() > HISTORY_TURNS {
            self.history.pop_front();
        }
    }

    fn prompt_context(&self) -> Option<String> {
        if self.history.is_empty() {
            return None;
        }
        let turns: Vec<String> = self
            .history
            .iter()
            .map(|(user, raya)| format!("User: {}\nRAYA: {}", user, raya))
            .collect();
        Some(turns.join("\n"))
    }

    /// Read lines from `input` until EOF or an exit command.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> io::Result<()> {
        writeln!(out, "{}Hello! Ask me anything. Type 'exit' to quit.", PREFIX)?;
        write!(out, "You: ")?;
        out.flush()?;
        for line in input.lines() {
            match self.handle(&line?) {
                Some(Reply::Exit(msg)) => {
                    writeln!(out, "{}{}", PREFIX, msg)?;
                    return Ok(());
                }
                Some(Reply::Say(msg)) => writeln!(out, "{}{}", PREFIX, msg)?,
                None => {}
            }
            write!(out, "You: ")?;
            out.flush()?;
        }
        writeln!(out)?;
        Ok(())
    }
}
