//! The engine subprocess client.
//!
//! One [`Engine`] exclusively owns one child process, its stdin handle,
//! and the reply buffer. A dedicated reader thread drains the child's
//! stdout into a channel; queries consume lines from the channel until the
//! wait token arrives, a timeout elapses, or the channel disconnects
//! (process death). No other component touches the process's pipes.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use sharp_core::{parse_long_algebraic, to_long_algebraic, Move, Position};

use crate::options::EngineOptions;
use crate::reply::EngineReply;
use crate::score::Wdl;

/// Timeout for the `uci`/`isready` handshake exchanges. Ordinary queries
/// default to waiting indefinitely, matching the depth-bounded `go`
/// commands this client issues.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the engine conversation.
///
/// Handshake failure and process death are fatal to the session: the
/// client moves to the failed state and every later call fails fast. A
/// single query timeout is local to that query; the session stays usable
/// and an [`Engine::sync`] barrier restores a known-good protocol state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("failed to spawn engine: {0}")]
    Spawn(#[from] std::io::Error),
    /// Engine executable was not found at the given path.
    #[error("engine not found at path: {0}")]
    NotFound(String),
    /// The `uci`/`uciok` or `isready`/`readyok` startup exchange failed.
    #[error("engine handshake failed: {0}")]
    HandshakeFailed(String),
    /// A query ran out of time waiting for its token. The response may
    /// still arrive later; issue a sync barrier before trusting further
    /// queries.
    #[error("engine timed out waiting for '{0}'")]
    Timeout(String),
    /// The process exited or its pipe closed mid-conversation.
    #[error("engine process died")]
    Died,
    /// A call was made after the session already failed.
    #[error("engine session is unusable after an earlier failure")]
    SessionFailed,
    /// A completed reply was missing an expected field.
    #[error("engine reply carried no {0}")]
    MissingField(&'static str),
}

/// Lifecycle of one engine session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Process spawned, handshake not yet run.
    Created,
    /// `uciok` received, options being configured.
    Started,
    /// Idle between queries.
    Ready,
    /// A query is awaiting its wait token.
    Busy,
    /// Terminal: a transport-level failure occurred.
    Failed,
}

/// Result of one full-position analysis query.
#[derive(Debug, Clone)]
pub struct PositionAnalysis {
    /// Normalized evaluation in pawns, from White's perspective.
    pub eval: f64,
    /// Win/draw/loss permille, when the engine reports them.
    pub wdl: Option<Wdl>,
    /// The raw best-move token.
    pub best_move: String,
}

/// A UCI engine subprocess and the half-duplex conversation with it.
///
/// All calls are synchronous: the caller blocks until the engine answers,
/// the timeout elapses, or the process dies. There is no concurrent
/// querying of one instance.
pub struct Engine {
    process: Child,
    stdin: ChildStdin,
    /// Lines drained from the engine by the reader thread, consumed in
    /// order. Every query scans from the next unread line; nothing is
    /// ever re-delivered.
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
    state: SessionState,
    options: EngineOptions,
    default_timeout: Option<Duration>,
}

impl Engine {
    /// Spawns the engine executable with no arguments and piped stdio.
    ///
    /// The process is not yet talking UCI; call [`start`](Self::start)
    /// next.
    pub fn spawn<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngineError::NotFound(path.display().to_string()));
        }

        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = process.stdin.take().ok_or(EngineError::Died)?;
        let stdout = process.stdout.take().ok_or(EngineError::Died)?;

        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
            // Dropping the sender disconnects the channel, which queries
            // observe as process death.
        });

        Ok(Self {
            process,
            stdin,
            lines: rx,
            reader: Some(reader),
            state: SessionState::Created,
            options: EngineOptions::default(),
            default_timeout: None,
        })
    }

    /// Runs the UCI handshake and configures the engine.
    ///
    /// Sends `uci` and waits for `uciok`, forwards every option as
    /// `setoption`, then `ucinewgame` and an `isready`/`readyok` barrier.
    /// Failure here is fatal to the session.
    pub fn start(&mut self, options: &EngineOptions) -> Result<(), EngineError> {
        self.query("uci", "uciok", Some(HANDSHAKE_TIMEOUT))
            .map_err(Self::as_handshake_failure)?;
        self.state = SessionState::Started;

        for (name, value) in options.setoption_pairs() {
            self.set_option(name, &value)?;
        }
        self.options = options.clone();

        self.send("ucinewgame")?;
        self.query("isready", "readyok", Some(HANDSHAKE_TIMEOUT))
            .map_err(Self::as_handshake_failure)?;
        self.state = SessionState::Ready;
        tracing::debug!("engine handshake complete");
        Ok(())
    }

    fn as_handshake_failure(err: EngineError) -> EngineError {
        match err {
            EngineError::Timeout(token) => {
                EngineError::HandshakeFailed(format!("no '{token}' before timeout"))
            }
            EngineError::Died => EngineError::HandshakeFailed("process exited".to_string()),
            other => other,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The option set most recently sent to the engine.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Default timeout applied by the evaluation helpers. `None` waits
    /// indefinitely.
    pub fn set_default_timeout(&mut self, timeout: Option<Duration>) {
        self.default_timeout = timeout;
    }

    /// Updates the local option cache for recognized keys (`Threads`,
    /// `MultiPV`, `UCI_showWDL`) and unconditionally forwards a
    /// `setoption` command. Unrecognized keys pass through unmodified.
    /// The engine sends no acknowledgment.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        match name {
            "Threads" => {
                if let Ok(threads) = value.parse() {
                    self.options.threads = threads;
                }
            }
            "MultiPV" => {
                if let Ok(multi_pv) = value.parse() {
                    self.options.multi_pv = multi_pv;
                }
            }
            "UCI_showWDL" => {
                if let Ok(show_wdl) = value.parse() {
                    self.options.show_wdl = show_wdl;
                }
            }
            _ => {}
        }
        self.send(&format!("setoption name {name} value {value}"))
    }

    /// Writes one command and reads lines until one contains `wait_token`.
    ///
    /// Returns the buffered lines as the reply on success. `None` timeout
    /// means wait indefinitely. On timeout the session stays usable but
    /// the engine may still deliver the response later; run
    /// [`sync`](Self::sync) before trusting further queries. Process death
    /// fails the session.
    pub fn query(
        &mut self,
        command: &str,
        wait_token: &str,
        timeout: Option<Duration>,
    ) -> Result<EngineReply, EngineError> {
        if self.state == SessionState::Failed {
            return Err(EngineError::SessionFailed);
        }
        self.send(command)?;
        self.state = SessionState::Busy;

        let deadline = timeout.map(|t| Instant::now() + t);
        let mut lines = Vec::new();
        loop {
            let line = match deadline {
                None => match self.lines.recv() {
                    Ok(line) => line,
                    Err(_) => {
                        self.state = SessionState::Failed;
                        return Err(EngineError::Died);
                    }
                },
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match self.lines.recv_timeout(remaining) {
                        Ok(line) => line,
                        Err(RecvTimeoutError::Timeout) => {
                            self.state = SessionState::Ready;
                            return Err(EngineError::Timeout(wait_token.to_string()));
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            self.state = SessionState::Failed;
                            return Err(EngineError::Died);
                        }
                    }
                }
            };
            tracing::trace!("UCI << {line}");
            let done = line.contains(wait_token);
            lines.push(line);
            if done {
                self.state = SessionState::Ready;
                return Ok(EngineReply::new(lines));
            }
        }
    }

    /// `isready`/`readyok` synchronization barrier.
    ///
    /// This is the recovery step after a query timeout: any late response
    /// lines are consumed and discarded up to the `readyok`, after which
    /// the conversation is in a known state again.
    pub fn sync(&mut self, timeout: Option<Duration>) -> Result<(), EngineError> {
        self.query("isready", "readyok", timeout).map(|_| ())
    }

    /// Sends `ucinewgame` followed by a ready barrier.
    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.send("ucinewgame")?;
        self.sync(Some(HANDSHAKE_TIMEOUT))
    }

    /// Evaluates the position to `depth`.
    ///
    /// Returns the last reported score, normalized to pawns from White's
    /// perspective.
    pub fn eval_position(&mut self, pos: &Position, depth: u32) -> Result<f64, EngineError> {
        self.send(&format!("position fen {}", pos.fen()))?;
        let reply = self.query(&format!("go depth {depth}"), "bestmove", self.default_timeout)?;
        let score = reply.last_score().ok_or(EngineError::MissingField("score"))?;
        Ok(score.normalize(pos.side_to_move()))
    }

    /// Evaluates the position reached by playing `mv`, without mutating
    /// `pos`.
    ///
    /// The engine scores the post-move position for the mover's opponent;
    /// the result is sign-flipped onto the same White-perspective scale as
    /// [`eval_position`](Self::eval_position).
    pub fn eval_move(&mut self, mv: Move, pos: &Position, depth: u32) -> Result<f64, EngineError> {
        self.send(&format!(
            "position fen {} moves {}",
            pos.fen(),
            to_long_algebraic(pos, mv)
        ))?;
        let reply = self.query(&format!("go depth {depth}"), "bestmove", self.default_timeout)?;
        let score = reply.last_score().ok_or(EngineError::MissingField("score"))?;
        Ok(score.normalize(!pos.side_to_move()))
    }

    /// Evaluates every move of `moves` against `pos`, reporting progress
    /// through `progress(done, total)`.
    pub fn eval_moves(
        &mut self,
        moves: &[Move],
        pos: &Position,
        depth: u32,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<Vec<f64>, EngineError> {
        let mut evals = Vec::with_capacity(moves.len());
        for (done, &mv) in moves.iter().enumerate() {
            progress(done, moves.len());
            evals.push(self.eval_move(mv, pos, depth)?);
        }
        progress(moves.len(), moves.len());
        Ok(evals)
    }

    /// The raw best-move token for the position at `depth`.
    pub fn best_move_token(&mut self, pos: &Position, depth: u32) -> Result<String, EngineError> {
        self.send(&format!("position fen {}", pos.fen()))?;
        let reply = self.query(&format!("go depth {depth}"), "bestmove", self.default_timeout)?;
        reply
            .best_move()
            .map(str::to_string)
            .ok_or(EngineError::MissingField("bestmove"))
    }

    /// The engine's best move, parsed against the position's legal moves.
    ///
    /// `None` when the engine reported `(none)` or a token that matches no
    /// legal move.
    pub fn best_move(&mut self, pos: &Position, depth: u32) -> Result<Option<Move>, EngineError> {
        let token = self.best_move_token(pos, depth)?;
        Ok(parse_long_algebraic(pos, &token))
    }

    /// Full analysis of one position: evaluation, WDL when reported, and
    /// the best-move token, from a single query.
    pub fn analyze(&mut self, pos: &Position, depth: u32) -> Result<PositionAnalysis, EngineError> {
        self.send(&format!("position fen {}", pos.fen()))?;
        let reply = self.query(&format!("go depth {depth}"), "bestmove", self.default_timeout)?;
        let score = reply.last_score().ok_or(EngineError::MissingField("score"))?;
        let best_move = reply
            .best_move()
            .ok_or(EngineError::MissingField("bestmove"))?
            .to_string();
        Ok(PositionAnalysis {
            eval: score.normalize(pos.side_to_move()),
            wdl: reply.last_wdl(),
            best_move,
        })
    }

    fn send(&mut self, command: &str) -> Result<(), EngineError> {
        if self.state == SessionState::Failed {
            return Err(EngineError::SessionFailed);
        }
        tracing::trace!("UCI >> {command}");
        let write = writeln!(self.stdin, "{command}").and_then(|_| self.stdin.flush());
        if write.is_err() {
            // A closed stdin pipe means the process is gone.
            self.state = SessionState::Failed;
            return Err(EngineError::Died);
        }
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "quit");
        let _ = self.stdin.flush();
        let _ = self.process.kill();
        let _ = self.process.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_nonexistent_path_is_not_found() {
        let result = Engine::spawn("/nonexistent/path/to/engine");
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn error_display_names_the_cause() {
        assert!(EngineError::Died.to_string().contains("died"));
        assert!(EngineError::Timeout("bestmove".into())
            .to_string()
            .contains("bestmove"));
        assert!(EngineError::HandshakeFailed("no uciok".into())
            .to_string()
            .contains("handshake"));
    }
}

#[cfg(all(test, unix))]
mod stub_engine_tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Writes an executable shell script standing in for a UCI engine.
    fn stub(body: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stub-engine.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod stub");
        (dir, path)
    }

    /// A well-behaved engine answering the whole protocol.
    const WELL_BEHAVED: &str = r#"
while read line; do
  case "$line" in
    uci) echo "id name stub"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 10 score cp 25 wdl 400 500 100 pv e2e4"
         echo "bestmove e2e4" ;;
    quit) exit 0 ;;
  esac
done
"#;

    /// Answers handshakes but swallows every `go`, forcing timeouts.
    const SILENT_SEARCH: &str = r#"
while read line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    quit) exit 0 ;;
  esac
done
"#;

    /// Dies as soon as a search is requested.
    const DIES_ON_GO: &str = r#"
while read line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) exit 1 ;;
    quit) exit 0 ;;
  esac
done
"#;

    fn started(body: &str) -> (TempDir, Engine) {
        let (dir, path) = stub(body);
        let mut engine = Engine::spawn(&path).expect("spawn stub");
        engine.start(&EngineOptions::default()).expect("handshake");
        (dir, engine)
    }

    #[test]
    fn handshake_reaches_ready() {
        let (_dir, engine) = started(WELL_BEHAVED);
        assert_eq!(engine.state(), SessionState::Ready);
    }

    #[test]
    fn eval_position_normalizes_for_white() {
        let (_dir, mut engine) = started(WELL_BEHAVED);
        let pos = Position::new();
        let eval = engine.eval_position(&pos, 10).expect("eval");
        assert!((eval - 0.25).abs() < 1e-9);
    }

    #[test]
    fn eval_position_flips_for_black_to_move() {
        let (_dir, mut engine) = started(WELL_BEHAVED);
        let pos = Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
            .expect("fen");
        let eval = engine.eval_position(&pos, 10).expect("eval");
        assert!((eval + 0.25).abs() < 1e-9);
    }

    #[test]
    fn eval_move_is_opponent_perspective_flipped() {
        let (_dir, mut engine) = started(WELL_BEHAVED);
        let pos = Position::new();
        let mv = sharp_core::parse_long_algebraic(&pos, "e2e4").expect("legal");
        // The stub always answers cp 25; after a White move the engine
        // scores for Black, so the White-perspective value is -0.25.
        let eval = engine.eval_move(mv, &pos, 10).expect("eval");
        assert!((eval + 0.25).abs() < 1e-9);
    }

    #[test]
    fn analyze_carries_wdl_and_best_move() {
        let (_dir, mut engine) = started(WELL_BEHAVED);
        let pos = Position::new();
        let analysis = engine.analyze(&pos, 10).expect("analyze");
        assert_eq!(analysis.best_move, "e2e4");
        assert_eq!(
            analysis.wdl,
            Some(Wdl {
                win: 400,
                draw: 500,
                loss: 100
            })
        );
    }

    #[test]
    fn timeout_leaves_session_usable_for_a_sync_barrier() {
        let (_dir, mut engine) = started(SILENT_SEARCH);
        let err = engine
            .query("go depth 10", "bestmove", Some(Duration::from_millis(100)))
            .expect_err("stub never answers go");
        assert!(matches!(err, EngineError::Timeout(_)));
        assert_eq!(engine.state(), SessionState::Ready);

        // The barrier recovers the conversation.
        engine
            .sync(Some(Duration::from_secs(5)))
            .expect("isready after timeout");
        assert_eq!(engine.state(), SessionState::Ready);
    }

    #[test]
    fn process_death_fails_the_session() {
        let (_dir, mut engine) = started(DIES_ON_GO);
        let err = engine
            .query("go depth 10", "bestmove", Some(Duration::from_secs(5)))
            .expect_err("stub dies on go");
        assert!(matches!(err, EngineError::Died));
        assert_eq!(engine.state(), SessionState::Failed);

        // Everything afterwards fails fast.
        let err = engine.sync(None).expect_err("session is gone");
        assert!(matches!(
            err,
            EngineError::SessionFailed | EngineError::Died
        ));
    }

    #[test]
    fn handshake_failure_when_engine_exits_immediately() {
        let (_dir, path) = stub("exit 0");
        let mut engine = Engine::spawn(&path).expect("spawn");
        let err = engine
            .start(&EngineOptions::default())
            .expect_err("no uciok ever comes");
        assert!(matches!(err, EngineError::HandshakeFailed(_)));
    }

    #[test]
    fn set_option_updates_the_cache_and_passes_unknown_keys_through() {
        let (_dir, mut engine) = started(WELL_BEHAVED);
        engine.set_option("Threads", "4").expect("setoption");
        assert_eq!(engine.options().threads, 4);
        // Unknown keys are forwarded without touching the cache.
        engine.set_option("Hash", "128").expect("setoption");
        assert_eq!(engine.options().threads, 4);
    }
}
