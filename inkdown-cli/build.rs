use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the CLI from src/main.rs
// We need to duplicate this here since build scripts can't access src/ modules
fn completion_cli() -> Command {
    Command::new("inkdown")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert Markdown documents to word-processor documents")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(Arg::new("to").long("to").value_hint(ValueHint::Other))
                .arg(Arg::new("title").long("title").value_hint(ValueHint::Other))
                .arg(
                    Arg::new("credentials")
                        .long("credentials")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("use-cli")
                        .long("use-cli")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("backends").arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = completion_cli();

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "inkdown", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "inkdown", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "inkdown", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
