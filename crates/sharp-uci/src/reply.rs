//! The buffered reply to a single engine query.

use crate::score::{Score, Wdl};

/// The ordered raw lines an engine produced for one query, ending with the
/// line that carried the wait token.
///
/// A reply is consumed and discarded per query; the client never retains
/// lines beyond the current reply, and never re-delivers a line a prior
/// query already consumed.
#[derive(Debug, Clone)]
pub struct EngineReply {
    lines: Vec<String>,
}

impl EngineReply {
    pub(crate) fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// The raw lines, in arrival order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Score of the last info line carrying one.
    pub fn last_score(&self) -> Option<Score> {
        self.lines.iter().rev().find_map(|line| parse_score(line))
    }

    /// Win/draw/loss of the last info line carrying one.
    pub fn last_wdl(&self) -> Option<Wdl> {
        self.lines.iter().rev().find_map(|line| parse_wdl(line))
    }

    /// The move token of the last `bestmove` line.
    ///
    /// The last occurrence wins: engines may emit more than one `bestmove`
    /// across retries, so the scan runs from the end of the reply.
    pub fn best_move(&self) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| {
            let mut tokens = line.split_whitespace();
            while let Some(token) = tokens.next() {
                if token == "bestmove" {
                    return tokens.next();
                }
            }
            None
        })
    }
}

/// Scans one line's whitespace tokens for `score cp <n>` or
/// `score mate <n>`. Token order elsewhere in the line does not matter.
fn parse_score(line: &str) -> Option<Score> {
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        if token != "score" {
            continue;
        }
        return match tokens.next()? {
            "cp" => tokens.next()?.parse().ok().map(Score::Cp),
            "mate" => tokens.next()?.parse().ok().map(Score::Mate),
            _ => None,
        };
    }
    None
}

/// Scans one line's tokens for `wdl <win> <draw> <loss>`.
fn parse_wdl(line: &str) -> Option<Wdl> {
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        if token != "wdl" {
            continue;
        }
        let win = tokens.next()?.parse().ok()?;
        let draw = tokens.next()?.parse().ok()?;
        let loss = tokens.next()?.parse().ok()?;
        return Some(Wdl { win, draw, loss });
    }
    None
}
