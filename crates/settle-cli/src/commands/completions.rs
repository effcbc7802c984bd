use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::aot::Generator;
use clap_complete::{generate, shells};

use crate::cli::{Cli, CompletionShell};
use crate::error::CliError;

const BIN_NAME: &str = "settle";

pub fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let script = completion_script(shell);

    if let Some(path) = output_path {
        std::fs::write(path, &script)?;
        println!("{}", path.display());
    } else {
        io::stdout().write_all(&script)?;
    }

    Ok(())
}

pub fn completion_script(shell: CompletionShell) -> Vec<u8> {
    let mut command = Cli::command();
    match shell {
        CompletionShell::Bash => render(shells::Bash, &mut command),
        CompletionShell::Zsh => render(shells::Zsh, &mut command),
        CompletionShell::Fish => render(shells::Fish, &mut command),
    }
}

fn render<G: Generator>(generator: G, command: &mut clap::Command) -> Vec<u8> {
    let mut buffer = Vec::new();
    generate(generator, command, BIN_NAME, &mut buffer);
    buffer
}
