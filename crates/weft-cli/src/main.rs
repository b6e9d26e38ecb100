use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use weft_core::config::{load_global_config, resolve_db_path, resolve_pretty};
use weft_core::stack::AttentionStack;
use weft_core::store::{create_stack_file, load_stack, save_stack, Codec};
use weft_render::{render_csv, render_table};

#[derive(Parser)]
#[command(
    name = "weft",
    version,
    about = "Track the stack of threads holding your attention"
)]
struct Cli {
    /// Stack file to use instead of the resolved default
    #[arg(long, global = true, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Emit a JSON document instead of the table
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start a thread; it only takes focus when nothing else holds it
    Spawn { thread: String },
    /// Push a thread on top of the stack, making it the focus
    Interrupt { thread: String },
    /// Mark a thread finished and drop it from the stack
    Exit { thread: Option<String> },
    /// Mark a thread abandoned and drop it from the stack
    Kill { thread: Option<String> },
    /// Suspend the whole stack
    Pause,
    /// Wake the stack up again
    Resume,
    /// Resolve a tid to its thread name
    Lookup { tid: usize },
    /// Print the stack without changing it
    Show {
        /// Render the thread table as CSV
        #[arg(long)]
        csv: bool,
    },
}

struct Outcome {
    op: &'static str,
    notes: Vec<String>,
    mutated: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_global_config();
    let path = resolve_db_path(cli.file.as_deref(), config.as_ref());
    let codec = Codec {
        pretty: resolve_pretty(config.as_ref()),
    };

    let mut stack = open_stack(&path, &codec, cli.json)?;
    let outcome = run_command(&mut stack, &command)?;

    if outcome.mutated {
        save_stack(&path, &stack, &codec)
            .with_context(|| format!("failed to save {}", path.display()))?;
    }

    if cli.json {
        let doc = serde_json::json!({
            "ok": true,
            "op": outcome.op,
            "file": path.display().to_string(),
            "notes": outcome.notes,
            "view": stack.view(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    for note in &outcome.notes {
        println!("{note}");
    }
    if matches!(command, Command::Show { csv: true }) {
        print!("{}", render_csv(&stack.view())?);
    } else {
        print!("{}", render_table(&stack.view()));
    }
    Ok(())
}

fn open_stack(path: &Path, codec: &Codec, quiet: bool) -> Result<AttentionStack> {
    if !quiet {
        println!("using stack file: {}", path.display());
    }
    if !path.exists() {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        create_stack_file(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        if !quiet {
            println!("created");
        }
    }
    let stack = load_stack(path, codec)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(stack)
}

fn run_command(stack: &mut AttentionStack, command: &Command) -> Result<Outcome> {
    match command {
        Command::Spawn { thread } => {
            let name = resolve_thread_arg(stack, thread)?;
            let was_empty = stack.current().is_none() && !stack.is_paused();
            stack.spawn(&name)?;
            let note = if was_empty {
                format!("spawning and switching to: {name}")
            } else {
                format!("spawning background: {name}")
            };
            Ok(Outcome {
                op: "spawn",
                notes: vec![note],
                mutated: true,
            })
        }
        Command::Interrupt { thread } => {
            let name = resolve_thread_arg(stack, thread)?;
            stack.interrupt(&name)?;
            Ok(Outcome {
                op: "interrupt",
                notes: vec![format!("interrupted by: {name}")],
                mutated: true,
            })
        }
        Command::Exit { thread } => {
            let target = resolve_optional_thread_arg(stack, thread.as_deref())?;
            let resolved = stack.exit(target.as_deref())?;
            let mut notes = vec![format!("exited: {resolved}")];
            if target.is_none() {
                if let Some(current) = stack.current() {
                    notes.push(format!("returning to: {current}"));
                }
            }
            Ok(Outcome {
                op: "exit",
                notes,
                mutated: true,
            })
        }
        Command::Kill { thread } => {
            let target = resolve_optional_thread_arg(stack, thread.as_deref())?;
            let resolved = stack.kill(target.as_deref())?;
            let mut notes = vec![format!("killed: {resolved}")];
            if target.is_none() {
                if let Some(current) = stack.current() {
                    notes.push(format!("returning to: {current}"));
                }
            }
            Ok(Outcome {
                op: "kill",
                notes,
                mutated: true,
            })
        }
        Command::Pause => {
            if stack.is_running() {
                stack.pause();
                Ok(Outcome {
                    op: "pause",
                    notes: vec!["pause".to_string()],
                    mutated: true,
                })
            } else {
                eprintln!("not running");
                Ok(Outcome {
                    op: "pause",
                    notes: Vec::new(),
                    mutated: false,
                })
            }
        }
        Command::Resume => {
            let was_paused = stack.is_paused();
            stack.resume()?;
            if was_paused {
                let mut notes = vec!["resume".to_string()];
                if let Some(current) = stack.current() {
                    notes.push(format!("returning to current: {current}"));
                }
                Ok(Outcome {
                    op: "resume",
                    notes,
                    mutated: true,
                })
            } else {
                eprintln!("not paused");
                Ok(Outcome {
                    op: "resume",
                    notes: Vec::new(),
                    mutated: false,
                })
            }
        }
        Command::Lookup { tid } => {
            let name = stack.lookup(*tid)?.to_string();
            Ok(Outcome {
                op: "lookup",
                notes: vec![name],
                mutated: false,
            })
        }
        Command::Show { .. } => Ok(Outcome {
            op: "show",
            notes: Vec::new(),
            mutated: false,
        }),
    }
}

/// A purely numeric argument is a tid and resolves through lookup; anything
/// else is taken as a literal thread name.
fn resolve_thread_arg(stack: &AttentionStack, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        let tid: usize = trimmed.parse()?;
        return Ok(stack.lookup(tid)?.to_string());
    }
    Ok(trimmed.to_string())
}

fn resolve_optional_thread_arg(
    stack: &AttentionStack,
    raw: Option<&str>,
) -> Result<Option<String>> {
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => Ok(Some(resolve_thread_arg(stack, value)?)),
    }
}
