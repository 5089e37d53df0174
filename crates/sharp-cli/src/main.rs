//! sharpline - how sharp is this position?
//!
//! Drives a UCI engine to rate a position's sharpness (what fraction of
//! the legal moves make things worse), its complexity (how much deeper
//! search changes its mind), and to generate deliberately sharp lines.

mod config;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;

use config::SharpConfig;
use sharp_analysis::{
    complexity, generate_line, line_sharpness, move_distribution, ratio, MoveDist,
};
use sharp_core::{to_long_algebraic, Color, Move, NotationStyle, Position};
use sharp_uci::{Engine, Wdl};

/// Chess position sharpness analysis via a UCI engine.
#[derive(Parser)]
#[command(name = "sharpline")]
#[command(about = "Rates position sharpness and generates sharp lines with a UCI engine")]
struct Cli {
    /// Path to the UCI engine executable
    #[arg(short, long)]
    engine: PathBuf,

    /// Starting position in FEN
    #[arg(short, long, default_value = Position::STARTPOS)]
    fen: String,

    /// Search depth
    #[arg(short, long, default_value_t = 15)]
    depth: u32,

    /// Read and print moves in short algebraic notation
    #[arg(short = 'a', long)]
    short_alg: bool,

    /// Analyze every position along the given moves, not just the last
    #[arg(short, long)]
    line: bool,

    /// Generate a sharp line of N full moves from the end position
    #[arg(short, long, value_name = "N", conflicts_with = "line")]
    generate: Option<usize>,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,

    /// Moves to apply before analysis, relative to the position
    #[arg(value_name = "MOVES")]
    moves: Vec<String>,
}

#[derive(Serialize)]
struct MoveEval {
    notation: String,
    long: String,
    eval: f64,
}

#[derive(Serialize)]
struct AnalyzeReport {
    fen: String,
    depth: u32,
    eval: f64,
    wdl: Option<Wdl>,
    best_move: String,
    distribution: MoveDist,
    sharpness: Option<f64>,
    complexity: f64,
    moves: Vec<MoveEval>,
}

#[derive(Serialize)]
struct LineSharpnessReport {
    moves: Vec<String>,
    ratios: Vec<Option<f64>>,
    average: f64,
}

#[derive(Serialize)]
struct GenerateReport {
    length: usize,
    line: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let config = SharpConfig::load().context("loading sharpline.toml")?;

    // Reject a bad FEN before any engine is spawned.
    let start = Position::from_fen(&cli.fen).context("rejecting FEN before analysis")?;

    let style = if cli.short_alg {
        NotationStyle::Short
    } else {
        NotationStyle::Long
    };
    let moves = parse_moves(&start, &cli.moves, style)?;

    tracing::info!("engine: {}", cli.engine.display());
    tracing::info!("position: {} (+{} moves), depth {}", start.fen(), moves.len(), cli.depth);

    let mut engine = Engine::spawn(&cli.engine).context("spawning engine")?;
    engine
        .start(&config.engine)
        .context("engine failed the UCI handshake")?;

    if let Some(length) = cli.generate {
        run_generate(&cli, &config, &mut engine, start, &moves, length, style)
    } else if cli.line && !moves.is_empty() {
        run_line(&cli, &config, &mut engine, &start, &moves, style)
    } else {
        run_analyze(&cli, &config, &mut engine, start, &moves, style)
    }
}

/// Parses the trailing move arguments against successive positions.
fn parse_moves(start: &Position, inputs: &[String], style: NotationStyle) -> anyhow::Result<Vec<Move>> {
    let mut cursor = start.clone();
    let mut moves = Vec::with_capacity(inputs.len());
    for input in inputs {
        let Some(mv) = style.parse(&cursor, input) else {
            bail!("'{input}' matches no legal move in {}", cursor.fen());
        };
        cursor.push(mv).context("applying input move")?;
        moves.push(mv);
    }
    Ok(moves)
}

/// Single-position analysis of the end position: evaluation, per-move
/// distribution, sharpness ratio, and complexity.
fn run_analyze(
    cli: &Cli,
    config: &SharpConfig,
    engine: &mut Engine,
    mut pos: Position,
    moves: &[Move],
    style: NotationStyle,
) -> anyhow::Result<()> {
    pos.advance(moves).context("applying input moves")?;

    let analysis = engine.analyze(&pos, cli.depth)?;
    let legal = pos.legal_moves();
    let evals = engine.eval_moves(&legal, &pos, cli.depth, progress_bar)?;
    let distribution = move_distribution(&evals, analysis.eval, &config.thresholds);
    let sharpness = ratio(&distribution);
    let complexity_score = complexity(engine, &pos, cli.depth)?;

    let move_evals: Vec<MoveEval> = legal
        .iter()
        .zip(&evals)
        .map(|(&mv, &eval)| MoveEval {
            notation: style.encode(&pos, mv),
            long: to_long_algebraic(&pos, mv),
            eval,
        })
        .collect();

    let report = AnalyzeReport {
        fen: pos.fen(),
        depth: cli.depth,
        eval: analysis.eval,
        wdl: analysis.wdl,
        best_move: analysis.best_move,
        distribution,
        sharpness,
        complexity: complexity_score,
        moves: move_evals,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.fen);
    println!("Eval: {:+.2} (depth: {})", report.eval, report.depth);
    if let Some(wdl) = report.wdl {
        println!("WDL: {}/{}/{}", wdl.win, wdl.draw, wdl.loss);
    }
    println!(
        "In this position there are {} possible moves. {} to move",
        report.moves.len(),
        side_name(pos.side_to_move())
    );
    match report.sharpness {
        Some(r) => println!(
            "Sharpness ratio: (bad/(ok+bad)) {:.1}/({:.1}+{:.1}) = {:.3}",
            report.distribution.bad,
            report.distribution.good,
            report.distribution.bad,
            r
        ),
        None => println!("Sharpness ratio: undefined (no decision-relevant moves)"),
    }
    println!("Blunders: {:.1}", report.distribution.blunders);
    println!("Complexity score: {:.3}", report.complexity);
    println!("Best move: {}", report.best_move);
    for m in &report.moves {
        println!("[{:+.2}]\t{} ({})", m.eval, m.notation, m.long);
    }
    Ok(())
}

/// Whole-line analysis: sharpness of the start and of each position along
/// the input moves, plus the average.
fn run_line(
    cli: &Cli,
    config: &SharpConfig,
    engine: &mut Engine,
    start: &Position,
    moves: &[Move],
    style: NotationStyle,
) -> anyhow::Result<()> {
    let report = line_sharpness(
        engine,
        start,
        moves,
        cli.depth,
        &config.thresholds,
        progress_bar,
    )?;

    // Render the input moves for the report while replaying them.
    let mut cursor = start.clone();
    let mut rendered = Vec::with_capacity(moves.len());
    for &mv in moves {
        rendered.push(style.encode(&cursor, mv));
        cursor.push(mv).context("applying input move")?;
    }

    let out = LineSharpnessReport {
        moves: rendered,
        ratios: report.ratios,
        average: report.average,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_ratio("starting position", out.ratios[0]);
    for (mv, r) in out.moves.iter().zip(out.ratios.iter().skip(1)) {
        print_ratio(mv, *r);
    }
    println!("Average line sharpness: {:.3}", out.average);
    Ok(())
}

fn print_ratio(label: &str, ratio: Option<f64>) {
    match ratio {
        Some(r) => println!("{label} - sharpness: {r:.3}"),
        None => println!("{label} - sharpness: undefined"),
    }
}

/// Sharp-line generation from the end position.
fn run_generate(
    cli: &Cli,
    config: &SharpConfig,
    engine: &mut Engine,
    mut pos: Position,
    moves: &[Move],
    length: usize,
    style: NotationStyle,
) -> anyhow::Result<()> {
    pos.advance(moves).context("applying input moves")?;

    let line = generate_line(engine, &mut pos, length, cli.depth, &config.thresholds, style)?;

    if cli.json {
        let report = GenerateReport {
            length,
            line: line.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if line.is_empty() {
        println!("No sharp line found from this position.");
        return Ok(());
    }
    for (i, pair) in line.chunks(2).enumerate() {
        match pair {
            [white, black] => println!("{}. {} {}", i + 1, white, black),
            [white] => println!("{}. {}", i + 1, white),
            _ => unreachable!(),
        }
    }
    Ok(())
}

fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// One-line progress bar for the per-move evaluation loops.
fn progress_bar(done: usize, total: usize) {
    if total == 0 {
        return;
    }
    let mut err = std::io::stderr();
    let filled = "o".repeat(done);
    let rest = ".".repeat(total - done);
    let _ = write!(err, "\r[{filled}{rest}] {done}/{total}");
    if done == total {
        let _ = writeln!(err);
    }
    let _ = err.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_the_original_flag_set() {
        let cli = Cli::parse_from([
            "sharpline",
            "-e",
            "/usr/bin/stockfish",
            "-d",
            "12",
            "-a",
            "-l",
            "e2e4",
            "e7e5",
        ]);
        assert_eq!(cli.depth, 12);
        assert!(cli.short_alg);
        assert!(cli.line);
        assert_eq!(cli.moves, vec!["e2e4".to_string(), "e7e5".to_string()]);
        assert_eq!(cli.fen, Position::STARTPOS);
    }

    #[test]
    fn generate_conflicts_with_line() {
        let result = Cli::try_parse_from(["sharpline", "-e", "sf", "-l", "-g", "3"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_moves_walks_the_line() {
        let start = Position::new();
        let moves = parse_moves(
            &start,
            &["e2e4".to_string(), "e7e5".to_string()],
            NotationStyle::Long,
        )
        .expect("legal line");
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn parse_moves_rejects_illegal_notation() {
        let start = Position::new();
        let result = parse_moves(&start, &["e2e5".to_string()], NotationStyle::Long);
        assert!(result.is_err());
    }

    #[test]
    fn parse_moves_accepts_short_algebraic() {
        let start = Position::new();
        let moves = parse_moves(
            &start,
            &["e4".to_string(), "e5".to_string(), "Nf3".to_string()],
            NotationStyle::Short,
        )
        .expect("legal line");
        assert_eq!(moves.len(), 3);
    }
}
