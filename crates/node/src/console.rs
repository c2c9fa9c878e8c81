#![warn(missing_docs)]
//! Operator console: one command per line of input.
//!
//! ```text
//! store <file>
//! request <file>
//! quit
//! ```
//!
//! Command words are case-insensitive. Malformed lines are reported and skipped.

use std::str::FromStr;

use ringpeer_core::dht::FileId;
use ringpeer_core::peer::Peer;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::error::Error;
use crate::error::Result;

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Place a file on the ring, entering at this peer.
    Store(FileId),
    /// Ask the ring for a file, starting at our first successor.
    Request(FileId),
    /// Leave the ring gracefully.
    Quit,
}

/// Why the console stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator typed `quit`.
    Quit,
    /// Input was closed.
    Eof,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let Some(word) = words.next() else {
            return Err(Error::UnknownCommand(String::new()));
        };
        let cmd = match word.to_lowercase().as_str() {
            "store" => Command::Store(file_arg("store", words.next())?),
            "request" => Command::Request(file_arg("request", words.next())?),
            "quit" => Command::Quit,
            _ => return Err(Error::UnknownCommand(word.to_string())),
        };
        if words.next().is_some() {
            return Err(Error::TooManyArguments(cmd.name()));
        }
        Ok(cmd)
    }
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Store(_) => "store",
            Command::Request(_) => "request",
            Command::Quit => "quit",
        }
    }
}

fn file_arg(cmd: &'static str, word: Option<&str>) -> Result<FileId> {
    let word = word.ok_or(Error::MissingArgument(cmd))?;
    word.parse()
        .map_err(|_| Error::InvalidFileId(word.to_string()))
}

/// Read commands from `input` and run them against `peer` until `quit` or end of
/// input. Complaints about bad lines and failed requests go to `output`. Only
/// errors that are fatal for the peer are returned.
pub async fn run_console<R, W>(peer: &Peer, input: R, mut output: W) -> Result<ConsoleExit>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let cmd = match line.parse::<Command>() {
            Ok(cmd) => cmd,
            Err(e) => {
                output.write_all(format!("{}\n", e).as_bytes()).await?;
                continue;
            }
        };
        let res = match cmd {
            Command::Quit => return Ok(ConsoleExit::Quit),
            Command::Store(file) => peer.store(file).await,
            Command::Request(file) => peer.request(file).await,
        };
        if let Err(e) = res {
            if e.is_fatal() {
                return Err(e.into());
            }
            tracing::warn!("{} {} failed: {}", cmd.name(), line.trim(), e);
            output
                .write_all(format!("{} failed: {}\n", cmd.name(), e).as_bytes())
                .await?;
        }
    }
    Ok(ConsoleExit::Eof)
}
