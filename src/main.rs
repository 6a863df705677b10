//! id3edit - ID3v2 tag viewer and editor for MP3 files
//!
//! Thin shell around the id3edit library: argument validation, usage and
//! help text, and result display.

use anyhow::{anyhow, bail, Result};
use colored::*;
use id3edit::{edit_tag, validate_mp3_path, view_tags, EditRequest, TagSlot, TagSummary};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Commands
// =============================================================================

enum Command {
    View {
        path: PathBuf,
        json: bool,
    },
    Edit {
        slot: TagSlot,
        value: String,
        path: PathBuf,
    },
    Help,
    Version,
}

// =============================================================================
// Main
// =============================================================================

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = match parse_args(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            print_usage();
            process::exit(1);
        }
    };

    let result = match command {
        Command::View { path, json } => cmd_view(&path, json),
        Command::Edit { slot, value, path } => cmd_edit(slot, &value, &path),
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args[0].as_str() {
        "-h" | "--help" => Ok(Command::Help),
        "-v" | "--version" => Ok(Command::Version),
        "view" => {
            let mut json = false;
            let mut path = None;
            for arg in &args[1..] {
                match arg.as_str() {
                    "-j" | "--json" => json = true,
                    other if other.starts_with('-') => {
                        bail!("unknown view option: {}", other)
                    }
                    other => {
                        if path.is_some() {
                            bail!("only one file per invocation");
                        }
                        path = Some(PathBuf::from(other));
                    }
                }
            }
            let path = path.ok_or_else(|| anyhow!("no MP3 file specified"))?;
            validate_mp3_path(&path)?;
            Ok(Command::View { path, json })
        }
        "edit" => {
            if args.len() < 4 {
                bail!("edit needs a tag option, a new value and an MP3 file");
            }
            if args.len() > 4 {
                bail!("too many arguments - quote tag values that contain spaces");
            }
            let slot = TagSlot::from_flag(&args[1])
                .ok_or_else(|| anyhow!("invalid tag option: {}", args[1]))?;
            Ok(Command::Edit {
                slot,
                value: args[2].clone(),
                path: PathBuf::from(&args[3]),
            })
        }
        other => bail!("unknown operation: {}", other),
    }
}

// =============================================================================
// View / Edit
// =============================================================================

fn cmd_view(path: &Path, json: bool) -> Result<()> {
    let summary = view_tags(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn cmd_edit(slot: TagSlot, value: &str, path: &Path) -> Result<()> {
    let request = EditRequest::new(slot, value, path)?;
    edit_tag(&request)?;
    println!(
        "{} {} set to {:?}",
        "✓".green(),
        request.slot.label(),
        request.value
    );
    println!();

    // Re-read the file so the user sees exactly what was written.
    cmd_view(path, false)
}

fn print_summary(summary: &TagSummary) {
    println!("{}", summary.file.cyan().bold());
    println!("  Tag:      ID3v{}", summary.version);
    for field in &summary.fields {
        println!("  {:<9} {}", format!("{}:", field.label), field.text);
    }
    if summary.fields.is_empty() {
        println!("  (no known text frames)");
    }
}

// =============================================================================
// Help / Version
// =============================================================================

fn print_version() {
    println!("id3edit version {}", VERSION);
    println!("ID3v2 tag viewer and editor for MP3 files");
}

fn print_usage() {
    println!("{} version {}", "id3edit".green().bold(), VERSION);
    println!("View and edit ID3v2 tags in MP3 files");
    println!();
    println!("{}", "USAGE:".cyan().bold());
    println!("    id3edit view [-j] <file.mp3>");
    println!("    id3edit edit <tag option> <new value> <file.mp3>");
    println!("    id3edit --help");
}

fn print_help() {
    print_version();
    println!();
    println!("{}", "USAGE:".cyan().bold());
    println!("    id3edit view [-j] <file.mp3>               Show known tags");
    println!("    id3edit edit <option> <value> <file.mp3>   Replace one tag");
    println!();
    println!("{}", "TAG OPTIONS:".cyan().bold());
    println!("    -t    Title");
    println!("    -a    Artist");
    println!("    -A    Album");
    println!("    -y    Year (4 digits)");
    println!("    -m    Comment");
    println!("    -c    Genre");
    println!();
    println!("{}", "EXAMPLES:".cyan().bold());
    println!("    id3edit view song.mp3");
    println!("    id3edit view -j song.mp3                   JSON output");
    println!("    id3edit edit -t \"New Title\" song.mp3");
    println!("    id3edit edit -y 2025 song.mp3");
    println!();
    println!("{}", "NOTES:".cyan().bold());
    println!("    - Quote values that contain spaces");
    println!("    - Edits replace the file atomically; the audio stream is never touched");
}
