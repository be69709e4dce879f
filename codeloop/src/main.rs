//! codeloop: generate code with a language model and repair it against a static analyzer.
//!
//! With an API key configured, `codeloop run` asks the model for the requested
//! types and loops until the analyzer accepts a round. Without one it reads a
//! source block from stdin, splits it once and reports analyzer findings.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::warn;

use codeloop::core::conversation::Conversation;
use codeloop::core::language::SourceLanguage;
use codeloop::core::partition::split_into_units;
use codeloop::core::requirements::parse_requirements;
use codeloop::exit_codes;
use codeloop::io::analyzer::CommandAnalyzer;
use codeloop::io::config::{DEFAULT_CONFIG_FILE, LoopConfig, load_config, write_config};
use codeloop::io::generator::{OpenAiGenerator, load_api_key};
use codeloop::io::input::{collect_requirements, read_source_block};
use codeloop::io::prompt::PromptRenderer;
use codeloop::io::units::{materialize, prepare_output_dir};
use codeloop::logging;
use codeloop::repair::{RepairConfig, RepairEvent, RepairStop, run_repair_loop};
use codeloop::single_pass::run_single_pass;

#[derive(Parser)]
#[command(
    name = "codeloop",
    version,
    about = "Generate code with a language model and repair it against a static analyzer"
)]
struct Cli {
    /// Path to the TOML config (defaults apply when missing).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate, split and verify units until the analyzer accepts a round.
    Run {
        /// Directory for unit files and the transcript.
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Read `ClassName: description` lines from a file instead of prompting.
        #[arg(long, conflicts_with = "prompt")]
        requirements: Option<PathBuf>,
        /// Free-form request text sent as the first message.
        #[arg(long)]
        prompt: Option<String>,
        /// Override the attempt budget.
        #[arg(long)]
        max_attempts: Option<u32>,
        #[arg(long)]
        language: Option<SourceLanguage>,
    },
    /// Split a source file into one file per top-level type declaration.
    Split {
        file: PathBuf,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        language: Option<SourceLanguage>,
    },
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            output_dir,
            requirements,
            prompt,
            max_attempts,
            language,
        } => {
            let mut cfg = load_config(&cli.config)?;
            if let Some(dir) = output_dir {
                cfg.output_dir = dir;
            }
            if let Some(max_attempts) = max_attempts {
                cfg.max_attempts = max_attempts;
            }
            if let Some(language) = language {
                cfg.language = language;
            }
            cfg.validate()?;
            cmd_run(&cfg, requirements.as_deref(), prompt)
        }
        Command::Split {
            file,
            output_dir,
            language,
        } => {
            let cfg = load_config(&cli.config)?;
            cmd_split(
                &file,
                output_dir.as_deref().unwrap_or(&cfg.output_dir),
                language.unwrap_or(cfg.language),
            )
        }
        Command::Init { force } => cmd_init(&cli.config, force),
    }
}

fn cmd_run(cfg: &LoopConfig, requirements: Option<&Path>, prompt: Option<String>) -> Result<i32> {
    if prepare_output_dir(&cfg.output_dir)? {
        println!("[Initialization] Create output folder at {}", cfg.output_dir.display());
    }
    let analyzer = CommandAnalyzer::from_config(&cfg.analyzer)?;

    let Some(api_key) = load_api_key(&cfg.model.api_key_env) else {
        println!(
            "No API key found in {}. Proceeding to generate {} files from input.",
            cfg.model.api_key_env,
            cfg.language.display_name()
        );
        let stdin = io::stdin();
        let source = read_source_block(stdin.lock(), &mut io::stdout())?;
        let outcome = run_single_pass(&source, &analyzer, &cfg.output_dir, cfg.language, print_event)?;
        println!(
            "[Done] {} unit(s) written, {} with diagnostics",
            outcome.files.len(),
            outcome.diagnostics()
        );
        return Ok(exit_codes::OK);
    };

    let request = initial_request(cfg, requirements, prompt)?;
    let generator = OpenAiGenerator::new(&cfg.model, api_key)?;
    let repair_config = RepairConfig {
        max_attempts: cfg.max_attempts,
        output_dir: cfg.output_dir.clone(),
        transcript_path: cfg.transcript_path(),
        language: cfg.language,
        record_rounds: true,
    };

    let outcome = run_repair_loop(
        &generator,
        &analyzer,
        &repair_config,
        Conversation::with_system(cfg.system_prompt.as_str()),
        request,
        print_event,
    )?;

    for path in &outcome.unverified {
        println!("[Warning] {} was never verified (analyzer failed)", path.display());
    }
    println!("[Transcript] {}", outcome.transcript_path.display());
    match outcome.stop {
        RepairStop::Converged if outcome.unverified.is_empty() => {
            println!("[Success] All units passed analysis after {} attempt(s)", outcome.attempts);
            Ok(exit_codes::OK)
        }
        RepairStop::Converged => {
            println!(
                "[Success] No diagnostics after {} attempt(s); {} unit(s) could not be analyzed",
                outcome.attempts,
                outcome.unverified.len()
            );
            Ok(exit_codes::OK)
        }
        RepairStop::Exhausted { last_failure } => {
            println!(
                "[Failed] Did not converge within {} attempts; last failure in {}",
                outcome.attempts,
                last_failure.file_name()
            );
            Ok(exit_codes::EXHAUSTED)
        }
    }
}

fn initial_request(
    cfg: &LoopConfig,
    requirements: Option<&Path>,
    prompt: Option<String>,
) -> Result<String> {
    if let Some(prompt) = prompt {
        if prompt.trim().is_empty() {
            bail!("--prompt must not be empty");
        }
        return Ok(prompt);
    }

    let requirements = match requirements {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read requirements {}", path.display()))?;
            let list = parse_requirements(&text);
            for line in &list.rejected {
                warn!(line, path = %path.display(), "skipping malformed requirement line");
            }
            list.accepted
        }
        None => {
            let stdin = io::stdin();
            collect_requirements(stdin.lock(), &mut io::stdout())?
        }
    };
    if requirements.is_empty() {
        bail!("no requirements given (expected `ClassName: description` lines)");
    }
    PromptRenderer::new().render_request(cfg.language, &requirements)
}

fn cmd_split(file: &Path, output_dir: &Path, language: SourceLanguage) -> Result<i32> {
    let text =
        fs::read_to_string(file).with_context(|| format!("read source {}", file.display()))?;
    let units = split_into_units(&text, language);
    if units.is_empty() {
        println!("No type declarations found in {}", file.display());
        return Ok(exit_codes::OK);
    }
    prepare_output_dir(output_dir)?;
    for path in materialize(&units, output_dir)? {
        println!("[Generated] {}", path.display());
    }
    Ok(exit_codes::OK)
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &LoopConfig::default())?;
    println!("Wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn print_event(event: &RepairEvent<'_>) {
    if let Err(err) = write_event(&mut io::stdout().lock(), event) {
        warn!(err = %err, "failed to write progress line");
    }
}

/// One progress line per event, flushed so it lands before any input prompt.
fn write_event<W: Write>(out: &mut W, event: &RepairEvent<'_>) -> io::Result<()> {
    match event {
        RepairEvent::RequestSent {
            attempt,
            max_attempts,
        } => writeln!(out, "[Request] Sending attempt {attempt}/{max_attempts}")?,
        RepairEvent::UnitWritten { path } => writeln!(out, "[Generated] {}", path.display())?,
        RepairEvent::NoUnits { attempt } => {
            writeln!(out, "[Warning] Round {attempt} produced no type declarations")?;
        }
        RepairEvent::Clean { path } => {
            writeln!(out, "[Verified] {} has no issues", path.display())?;
        }
        RepairEvent::Diagnostic { path, diagnostic } => {
            writeln!(out, "[Diagnostic] {}:\n{diagnostic}", path.display())?;
        }
        RepairEvent::ToolFailed { path, reason } => {
            writeln!(out, "[Warning] Analyzer failed on {}: {reason}", path.display())?;
        }
        RepairEvent::RoundFailed {
            attempt,
            max_attempts,
        } => writeln!(out, "[Retry] Attempt {attempt}/{max_attempts} failed, requesting a fix")?,
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "codeloop",
            "run",
            "--output-dir",
            "gen",
            "--max-attempts",
            "3",
            "--language",
            "csharp",
        ]);
        match cli.command {
            Command::Run {
                output_dir,
                max_attempts,
                language,
                ..
            } => {
                assert_eq!(output_dir, Some(PathBuf::from("gen")));
                assert_eq!(max_attempts, Some(3));
                assert_eq!(language, Some(SourceLanguage::Csharp));
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn requirements_and_prompt_conflict() {
        let result = Cli::try_parse_from([
            "codeloop",
            "run",
            "--requirements",
            "reqs.txt",
            "--prompt",
            "write Foo",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["codeloop", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn progress_lines_are_written_per_event() {
        let mut out = Vec::new();
        write_event(
            &mut out,
            &RepairEvent::RoundFailed {
                attempt: 2,
                max_attempts: 5,
            },
        )
        .expect("write retry");
        write_event(
            &mut out,
            &RepairEvent::Diagnostic {
                path: Path::new("output/Foo.java"),
                diagnostic: "Foo.java:3: error: NULL_DEREFERENCE",
            },
        )
        .expect("write diagnostic");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "[Retry] Attempt 2/5 failed, requesting a fix\n[Diagnostic] output/Foo.java:\nFoo.java:3: error: NULL_DEREFERENCE\n"
        );
    }

    #[test]
    fn requirement_file_renders_request() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("reqs.txt");
        fs::write(&path, "Account: holds money\nbroken line\n").expect("write");

        let request = initial_request(&LoopConfig::default(), Some(&path), None).expect("request");
        assert!(request.contains("Define a [Account] class, [holds money]."));
    }

    #[test]
    fn empty_requirement_file_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("reqs.txt");
        fs::write(&path, "\n\n").expect("write");
        assert!(initial_request(&LoopConfig::default(), Some(&path), None).is_err());
    }
}
