//! `settle completions`

use std::io;

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::Cli;

pub fn run(shell: Shell, out: &mut impl io::Write) {
    let mut command = Cli::command();
    let name = command.get_name().to_owned();
    generate(shell, &mut command, name, out);
}
