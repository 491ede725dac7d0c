//! Line-based operator console.
//!
//! Thin caller over [`Sniper`]: parses a command, runs it, renders a short
//! text reply. Lines arrive over a channel so stdin and tests share the
//! same loop.

use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;

use crate::models::ClosedPosition;
use crate::sniper::{SnipeOutcome, Sniper};

const NO_DATA: &str = "no data available";

const HELP: &str = "\
commands:
  snipe            discover candidates and buy them
  recent           list current candidates without trading
  positions        list open positions
  sell <address>   sell an open position
  help             show this message
  quit             stop the bot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Snipe,
    Recent,
    Positions,
    Sell(String),
    Help,
    Quit,
}

impl OperatorCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let command = parts.next().ok_or_else(|| "empty command".to_string())?;

        let parsed = match command.to_ascii_lowercase().as_str() {
            "snipe" | "start" => Self::Snipe,
            "recent" | "latest" => Self::Recent,
            "positions" | "pos" => Self::Positions,
            "sell" => match parts.next() {
                Some(address) => Self::Sell(address.to_string()),
                None => return Err("usage: sell <address>".to_string()),
            },
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command `{}` (try `help`)", other)),
        };

        if parts.next().is_some() {
            return Err(format!("too many arguments for `{}`", command));
        }
        Ok(parsed)
    }
}

pub struct Console {
    sniper: Sniper,
}

impl Console {
    pub fn new(sniper: Sniper) -> Self {
        Self { sniper }
    }

    /// Run one command and render the reply
    pub async fn handle(&self, command: &OperatorCommand) -> String {
        match command {
            OperatorCommand::Snipe => self.snipe().await,
            OperatorCommand::Recent => self.recent().await,
            OperatorCommand::Positions => self.positions(),
            OperatorCommand::Sell(address) => match self.sniper.sell(address).await {
                Ok(closed) => render_sold(&closed),
                Err(e) => format!("❌ Sell failed: {}", e),
            },
            OperatorCommand::Help => HELP.to_string(),
            OperatorCommand::Quit => "👋 shutting down".to_string(),
        }
    }

    async fn snipe(&self) -> String {
        let results = self.sniper.snipe().await;
        if results.is_empty() {
            return NO_DATA.to_string();
        }

        results
            .iter()
            .map(|result| {
                let address = &result.candidate.address;
                match &result.outcome {
                    SnipeOutcome::Bought(position) => format!(
                        "✅ Bought {} | {:.6} tokens @ {:.10} SOL",
                        position.label(),
                        position.quantity,
                        position.entry_price
                    ),
                    SnipeOutcome::Skipped { reason } => format!("⏭  {} skipped: {}", address, reason),
                    SnipeOutcome::Failed(e) => format!("❌ Buy {} failed: {}", address, e),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn recent(&self) -> String {
        let candidates = self.sniper.recent().await;
        if candidates.is_empty() {
            return NO_DATA.to_string();
        }

        let mut lines = vec!["🔥 Latest launches:".to_string()];
        lines.extend(candidates.iter().map(|token| {
            format!(
                "  {} {} | 24h volume ${:.0}",
                token.symbol.as_deref().unwrap_or("?"),
                token.address,
                token.volume
            )
        }));
        lines.join("\n")
    }

    fn positions(&self) -> String {
        let positions = self.sniper.positions();
        if positions.is_empty() {
            return "no open positions".to_string();
        }

        let mut lines = vec![format!("📊 {} open positions:", positions.len())];
        lines.extend(positions.iter().map(|position| {
            format!(
                "  {} | {:.6} tokens @ {:.10} SOL | {:.4} SOL in | opened {}",
                position.label(),
                position.quantity,
                position.entry_price,
                position.sol_invested,
                position.opened_at.format("%H:%M:%S")
            )
        }));
        lines.join("\n")
    }

    /// Read commands until `quit` or until every sender is gone
    ///
    /// Returns true when the operator asked to quit.
    pub async fn run(&self, mut lines: mpsc::Receiver<String>) -> bool {
        println!("👋 Solana sniper console ready. Type `help` for commands.");

        while let Some(line) = lines.recv().await {
            if line.trim().is_empty() {
                continue;
            }

            match OperatorCommand::parse(&line) {
                Ok(OperatorCommand::Quit) => {
                    println!("{}", self.handle(&OperatorCommand::Quit).await);
                    return true;
                }
                Ok(command) => println!("{}", self.handle(&command).await),
                Err(e) => println!("{}", e),
            }
        }
        false
    }
}

fn render_sold(closed: &ClosedPosition) -> String {
    match (closed.exit_price, closed.realized_pnl_sol, closed.realized_pnl_pct()) {
        (Some(price), Some(pnl), Some(pct)) => format!(
            "✅ Sold {} @ {:.10} SOL | realized {:+.4} SOL ({:+.2}%)",
            closed.position.label(),
            price,
            pnl,
            pct
        ),
        _ => format!(
            "✅ Sold {} | exit price unknown (no quote), realized P&L not computed",
            closed.position.label()
        ),
    }
}

/// Forward stdin lines from a plain OS thread
///
/// A blocking stdin read cannot be cancelled, so it stays off the runtime.
/// The thread ends at end of input or once the receiver is dropped; if it
/// is still blocked in a read when the process exits, it is simply abandoned.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);

    let spawned = thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Console input failed: {}", e);
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!("Could not start console reader: {}", e);
    }

    rx
}
