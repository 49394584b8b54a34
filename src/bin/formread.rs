//! Command-line interface for formread
//!
//! Usage:
//!   formread evaluate `<document>` [-O `<out>`]                  - Dump every text fragment with its box
//!   formread read `<document>` -C `<layout>` [-O `<out>`] [-K `<key>`] [--bbox] [--no-refile]
//!                                                           - Extract the fields described by a layout
//!   formread compile -C `<layout>`                            - Print the compiled field model
//!
//! A `.json` document is taken to be a fragment dump written by `evaluate`.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use formread::error::{Error, LayoutError};
use formread::extraction::{extractor_for, read_fragments, save_fragments};
use formread::layout::LayoutSource;
use formread::settings::Loader;
use formread::{FormReader, Settings};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // RUST_LOG wins when set, e.g. RUST_LOG=formread=trace
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("formread=info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("evaluate", m)) => handle_evaluate_command(m),
        Some(("read", m)) => handle_read_command(m),
        Some(("compile", m)) => handle_compile_command(m),
        _ => unreachable!("clap requires a subcommand"),
    }
}

fn cli() -> Command {
    let document = Arg::new("document")
        .help("Path to the PDF document, or to a JSON fragment dump")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .index(1);
    let output = Arg::new("output")
        .long("output")
        .short('O')
        .help("Output file (default: next to the document)")
        .value_parser(clap::value_parser!(PathBuf));
    let layout = Arg::new("config")
        .long("config")
        .short('C')
        .help("Layout file describing the form")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf));
    let settings = Arg::new("settings")
        .long("settings")
        .help("TOML file overriding the built-in settings")
        .value_parser(clap::value_parser!(PathBuf));
    let format = Arg::new("format")
        .long("format")
        .short('f')
        .help("Output format")
        .value_parser(["json", "yaml"])
        .default_value("json");

    Command::new("formread")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract form fields from PDF documents using a declarative layout")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("evaluate")
                .about("Save every text fragment of the document with its page and box")
                .arg(document.clone())
                .arg(output.clone())
                .arg(settings.clone()),
        )
        .subcommand(
            Command::new("read")
                .about("Extract the fields described by a layout file")
                .arg(document)
                .arg(layout.clone())
                .arg(output)
                .arg(
                    Arg::new("keyname")
                        .long("keyname")
                        .short('K')
                        .help("Row field keying re-filed row_dict rows (default: Codice)"),
                )
                .arg(
                    Arg::new("bbox")
                        .long("bbox")
                        .help("Also save the fragment dump to <document>-bbox.json")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-refile")
                        .long("no-refile")
                        .help("Write the flat record list instead of the re-filed map")
                        .action(ArgAction::SetTrue),
                )
                .arg(settings.clone())
                .arg(format.clone()),
        )
        .subcommand(
            Command::new("compile")
                .about("Print the field model compiled from a layout file")
                .arg(layout)
                .arg(settings)
                .arg(format),
        )
}

fn load_settings(matches: &ArgMatches) -> Result<Settings> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<PathBuf>("settings") {
        loader = loader.with_file(path);
    }
    if let Ok(Some(key)) = matches.try_get_one::<String>("keyname") {
        loader = loader.key_field(key)?;
    }
    if let Ok(Some(true)) = matches.try_get_one::<bool>("no-refile") {
        loader = loader.refile(false)?;
    }
    Ok(loader.build()?)
}

/// Compile the layout, replaying every diagnostic of the pass
fn load_reader(matches: &ArgMatches, settings: Settings) -> Result<FormReader> {
    let path = matches
        .get_one::<PathBuf>("config")
        .context("missing layout file")?;
    let source = LayoutSource::load(path)?;
    match FormReader::from_source(&source, settings) {
        Ok((reader, diagnostics)) => {
            diagnostics.log_all();
            Ok(reader)
        }
        Err(Error::Layout(LayoutError::Validation { diagnostics })) => {
            diagnostics.log_all();
            bail!(
                "layout '{}' is invalid: {} error(s)",
                path.display(),
                diagnostics.error_count()
            )
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_evaluate_command(matches: &ArgMatches) -> Result<()> {
    let settings = load_settings(matches)?;
    let document = document_path(matches)?;
    let extractor = extractor_for(document, &settings.page);
    let fragments = read_fragments(extractor.as_ref(), document, &settings.page)?;

    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| sibling(document, "-bbox.json"));
    save_fragments(&output, &fragments)?;
    tracing::info!("Bounding boxes written to '{}'", output.display());
    Ok(())
}

fn handle_read_command(matches: &ArgMatches) -> Result<()> {
    let settings = load_settings(matches)?;
    let document = document_path(matches)?;
    let format = output_format(matches);
    let extractor = extractor_for(document, &settings.page);
    let reader = load_reader(matches, settings)?;

    let reading = reader.read(document, extractor.as_ref())?;
    reading.diagnostics.log_all();

    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| default_output(document, format));
    let result = reader.output(reading.records);
    fs::write(&output, render(&result, format)?)
        .with_context(|| format!("unable to write '{}'", output.display()))?;
    tracing::info!("Extraction results written to '{}'", output.display());

    if matches.get_flag("bbox") {
        let bbox = sibling(document, "-bbox.json");
        save_fragments(&bbox, &reading.fragments)?;
        tracing::info!("Bounding boxes saved to '{}'", bbox.display());
    }
    Ok(())
}

fn handle_compile_command(matches: &ArgMatches) -> Result<()> {
    let settings = load_settings(matches)?;
    let reader = load_reader(matches, settings)?;
    print!("{}", render(reader.layout(), output_format(matches))?);
    Ok(())
}

fn document_path(matches: &ArgMatches) -> Result<&Path> {
    matches
        .get_one::<PathBuf>("document")
        .map(PathBuf::as_path)
        .context("missing document")
}

fn output_format(matches: &ArgMatches) -> &str {
    matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("json")
}

fn render<T: Serialize>(value: &T, format: &str) -> Result<String> {
    Ok(match format {
        "yaml" => serde_yaml::to_string(value)?,
        _ => {
            let mut json = serde_json::to_string_pretty(value)?;
            json.push('\n');
            json
        }
    })
}

/// `<dir>/<stem><suffix>`
fn sibling(document: &Path, suffix: &str) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    document.with_file_name(format!("{}{}", stem, suffix))
}

/// `<stem>.json` (or `.yaml`), never the input document itself
fn default_output(document: &Path, format: &str) -> PathBuf {
    let extension = if format == "yaml" { ".yaml" } else { ".json" };
    let output = sibling(document, extension);
    if output == document {
        sibling(document, &format!("-result{}", extension))
    } else {
        output
    }
}
