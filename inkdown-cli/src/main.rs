// Command-line interface for inkdown
//
// This binary converts Markdown documents (optionally containing mermaid
// diagram fences) into finished word-processor documents.
//
// The heavy lifting lives in the inkdown-export crate. This layer parses
// arguments, loads configuration, wires up the backend registry and the
// diagram renderer, and drives directory batches.
//
// Converting:
//
// A conversion needs an input path and a target backend. The backend defaults
// to "docx"; pass --to remote to create a document on the remote service
// instead (one-time interactive sign-in, token cached next to the credentials
// file).
// Usage:
//  inkdown <input> [-o <path>] [--to <backend>]          - Convert (default)
//  inkdown convert <input> [-o <path>] [--to <backend>]  - Same as above (explicit)
//  inkdown convert <dir>                                 - Convert every top-level *.md
//  inkdown backends [--json]                             - List output backends
//
// Directory mode writes into a subdirectory named by output.directory in the
// configuration (default "docx"), converts files in sorted order, and keeps
// going when a single file fails. Authentication failures abort the whole
// batch since no later file can succeed either.

use clap::{Arg, ArgAction, Command, ValueHint};
use inkdown_config::{InkdownConfig, Loader};
use inkdown_export::backend::auth::AuthPrompt;
use inkdown_export::backend::docx::DocxBackend;
use inkdown_export::backend::remote::{RemoteBackend, RemoteOptions};
use inkdown_export::{
    publish, Backend, BackendRegistry, DiagramRenderer, ExportError, PublishArtifact,
    PublishOutcome, PublishSpec, RetryPolicy,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Decide whether a failed parse should be retried with "convert" injected
/// as the subcommand, so `inkdown notes.md` works without naming it.
fn should_inject_convert(args: &[String]) -> bool {
    args.len() > 1
        && !args[1].starts_with('-')
        && args[1] != "convert"
        && args[1] != "backends"
        && args[1] != "help"
}

fn build_cli() -> Command {
    Command::new("inkdown")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert Markdown documents to word-processor documents")
        .long_about(
            "inkdown converts Markdown (with embedded mermaid diagrams) into\n\
            finished documents.\n\n\
            Commands:\n  \
            - convert:  Convert a file, or every top-level .md file in a directory\n  \
            - backends: List the registered output backends\n\n\
            Examples:\n  \
            inkdown notes.md                              # Convert to docx ('convert' is implied)\n  \
            inkdown convert notes.md -o out/notes.docx    # Explicit output path\n  \
            inkdown convert notes/                        # Whole directory into notes/docx/\n  \
            inkdown convert notes.md --to remote          # Create a remote document\n  \
            inkdown backends --json                       # Machine-readable backend list",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to an inkdown.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert Markdown files to documents (default command)")
                .long_about(
                    "Convert a Markdown file, or a directory of Markdown files, to a\n\
                    document.\n\n\
                    Single file mode writes next to the input (inside the configured\n\
                    output subdirectory) unless -o names a file. Directory mode\n\
                    converts every top-level .md file in sorted order into the output\n\
                    subdirectory (or the directory named by -o), titling each document\n\
                    by its file stem, and reports a per-file summary at the end.\n\n\
                    Examples:\n  \
                    inkdown convert report.md                      # report's folder/docx/report.docx\n  \
                    inkdown convert report.md -o report.docx       # Exact output path\n  \
                    inkdown convert specs/ --to remote             # One remote document per file\n  \
                    inkdown convert diagram.md --use-cli           # Render diagrams locally",
                )
                .arg(
                    Arg::new("path")
                        .help("Markdown file or directory of markdown files")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file (single file mode) or directory (directory mode)")
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target backend (see 'inkdown backends')")
                        .default_value("docx")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("title")
                        .long("title")
                        .help("Document title (single file mode; defaults to the file stem)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("credentials")
                        .long("credentials")
                        .help("Credentials file for the remote backend")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("use-cli")
                        .long("use-cli")
                        .help("Render diagrams with the local mermaid CLI instead of the render service")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("backends")
                .about("List the registered output backends")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Emit the list as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Try to parse args. If no subcommand is provided, inject "convert"
    let args: Vec<String> = std::env::args().collect();
    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&args) {
        Ok(m) => m,
        Err(e) => {
            if should_inject_convert(&args) {
                let mut new_args = vec![args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&args[1..]);

                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    };

    let config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));

    match matches.subcommand() {
        Some(("convert", sub_matches)) => {
            handle_convert_command(sub_matches, &config);
        }
        Some(("backends", sub_matches)) => {
            handle_backends_command(sub_matches.get_flag("json"));
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

/// Handle the convert command
fn handle_convert_command(sub_matches: &clap::ArgMatches, config: &InkdownConfig) {
    let path = sub_matches
        .get_one::<String>("path")
        .expect("path is required");
    let backend_name = sub_matches
        .get_one::<String>("to")
        .expect("--to has a default")
        .as_str();
    let output = sub_matches.get_one::<String>("output").map(PathBuf::from);
    let title = sub_matches.get_one::<String>("title").map(|s| s.as_str());
    let use_cli = sub_matches.get_flag("use-cli");

    let mut remote_options = RemoteOptions::from(&config.remote);
    if let Some(file) = sub_matches.get_one::<String>("credentials") {
        remote_options.credentials_path = PathBuf::from(file);
    }

    // Validate the backend before touching the filesystem or network
    let registry = build_registry(config, remote_options);
    let backend = match registry.get(backend_name) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let input = Path::new(path);
    if !input.exists() {
        eprintln!("Error: {}", ExportError::InputNotFound(path.clone()));
        std::process::exit(1);
    }

    let renderer = build_renderer(config, use_cli);

    if input.is_dir() {
        convert_directory(input, output, backend, &registry, &renderer, config);
    } else {
        convert_single_file(input, title, output, backend, &registry, &renderer, config);
    }
}

fn build_registry(config: &InkdownConfig, remote_options: RemoteOptions) -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(DocxBackend::new(config.docx.image_width_in));
    registry.register(RemoteBackend::new(remote_options, Box::new(StdinPrompt)));
    registry
}

fn build_renderer(config: &InkdownConfig, use_cli: bool) -> DiagramRenderer {
    let policy = RetryPolicy::from(&config.render);
    if use_cli {
        DiagramRenderer::with_local_tool(&config.render.tool, config.render.service_url.as_str(), policy)
    } else {
        DiagramRenderer::remote(config.render.service_url.as_str(), policy)
    }
}

fn convert_single_file(
    input: &Path,
    title: Option<&str>,
    output: Option<PathBuf>,
    backend: &dyn Backend,
    registry: &BackendRegistry,
    renderer: &DiagramRenderer,
    config: &InkdownConfig,
) {
    let stem = file_stem(input);
    let title = title.unwrap_or(&stem);
    let output = output.or_else(|| default_output_path(input, backend, &config.output.directory));

    match convert_file(input, title, output, backend.name(), registry, renderer) {
        Ok(outcome) => print_outcome(&outcome),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn convert_directory(
    dir: &Path,
    output: Option<PathBuf>,
    backend: &dyn Backend,
    registry: &BackendRegistry,
    renderer: &DiagramRenderer,
    config: &InkdownConfig,
) {
    let files = markdown_files(dir).unwrap_or_else(|err| {
        eprintln!("Error reading directory '{}': {err}", dir.display());
        std::process::exit(1);
    });

    if files.is_empty() {
        println!("No markdown files found in '{}'", dir.display());
        return;
    }

    println!("Found {} markdown file(s) in '{}'", files.len(), dir.display());

    let output_dir = output.unwrap_or_else(|| dir.join(&config.output.directory));
    log::debug!("directory batch output: {}", output_dir.display());

    let mut converted = 0;
    for file in &files {
        let name = file
            .file_name()
            .unwrap_or_else(|| file.as_os_str())
            .to_string_lossy()
            .into_owned();
        println!("\nProcessing: {name}");

        let title = file_stem(file);
        let per_file_output = backend
            .file_extensions()
            .first()
            .map(|extension| output_dir.join(format!("{title}.{extension}")));

        match convert_file(file, &title, per_file_output, backend.name(), registry, renderer) {
            Ok(outcome) => {
                print_outcome(&outcome);
                converted += 1;
            }
            Err(err) if err.is_fatal() => {
                eprintln!("Error processing {name}: {err}");
                std::process::exit(1);
            }
            Err(err) => {
                eprintln!("Error processing {name}: {err}");
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "Completed: {converted} of {} files converted successfully",
        files.len()
    );
    if backend.writes_file() {
        println!("Output directory: {}", output_dir.display());
    }
}

/// Convert one markdown file through the named backend.
fn convert_file(
    input: &Path,
    title: &str,
    output: Option<PathBuf>,
    backend: &str,
    registry: &BackendRegistry,
    renderer: &DiagramRenderer,
) -> Result<PublishOutcome, ExportError> {
    let source = fs::read_to_string(input)
        .map_err(|err| ExportError::Filesystem(format!("reading {}: {err}", input.display())))?;

    let mut spec = PublishSpec::new(&source, title, backend);
    if let Some(path) = output {
        spec = spec.with_output_path(path);
    }
    publish(spec, registry, renderer)
}

fn print_outcome(outcome: &PublishOutcome) {
    match &outcome.artifact {
        PublishArtifact::File(path) => {
            println!("\nDocument created successfully: {}", path.display());
        }
        PublishArtifact::Remote { url, .. } => {
            println!("\nDocument created successfully!");
            println!("URL: {url}");
        }
    }
}

/// Handle the backends command
fn handle_backends_command(json: bool) {
    let registry = BackendRegistry::with_defaults();

    if json {
        let listing: Vec<serde_json::Value> = registry
            .list_backends()
            .iter()
            .filter_map(|name| registry.get(name).ok())
            .map(|backend| {
                serde_json::json!({
                    "name": backend.name(),
                    "description": backend.description(),
                    "extensions": backend.file_extensions(),
                    "writes_file": backend.writes_file(),
                })
            })
            .collect();

        match serde_json::to_string_pretty(&listing) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("Error listing backends: {err}");
                std::process::exit(1);
            }
        }
    } else {
        println!("Available backends:\n");
        for name in registry.list_backends() {
            if let Ok(backend) = registry.get(&name) {
                println!("  {:<10}{}", backend.name(), backend.description());
            }
        }
    }
}

/// Top-level *.md files in sorted order. Anything with the extension counts;
/// entries that turn out not to be readable files surface as per-file errors.
fn markdown_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_else(|| path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Default single-file output: `<parent>/<directory>/<stem>.<ext>`, or `None`
/// for backends that don't write files.
fn default_output_path(input: &Path, backend: &dyn Backend, directory: &str) -> Option<PathBuf> {
    let extension = backend.file_extensions().first()?;
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    Some(parent.join(directory).join(format!("{}.{extension}", file_stem(input))))
}

fn load_cli_config(explicit_path: Option<&str>) -> InkdownConfig {
    let loader = Loader::new().with_optional_file("inkdown.toml");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

/// Prompts on stdin for the one-time sign-in code.
struct StdinPrompt;

impl AuthPrompt for StdinPrompt {
    fn verification_code(&self, auth_url: &str) -> Result<String, ExportError> {
        println!("Open this URL in your browser to authorize access:");
        println!("  {auth_url}");
        print!("Enter the verification code: ");
        io::stdout()
            .flush()
            .map_err(|err| ExportError::Authentication(format!("prompt failed: {err}")))?;

        let mut code = String::new();
        io::stdin()
            .read_line(&mut code)
            .map_err(|err| ExportError::Authentication(format!("reading code: {err}")))?;
        Ok(code.trim().to_string())
    }
}
