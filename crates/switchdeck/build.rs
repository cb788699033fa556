//! Generates man pages and shell completions for `switchdeck` into
//! `$OUT_DIR/man` and `$OUT_DIR/completions` for packagers.

use std::fs;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

#[path = "src/cli.rs"]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR") else {
        panic!("OUT_DIR not set by Cargo");
    };
    let out_dir = Path::new(&out_dir);

    let mut cmd = cli::Cli::command();

    let man_dir = out_dir.join("man");
    create_dir(&man_dir);
    write_manpages(&cmd, &man_dir, "switchdeck");

    let completions_dir = out_dir.join("completions");
    create_dir(&completions_dir);
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
        if let Err(e) = clap_complete::generate_to(shell, &mut cmd, "switchdeck", &completions_dir)
        {
            panic!("failed to write {shell} completions: {e}");
        }
    }
}

fn create_dir(dir: &Path) {
    if let Err(e) = fs::create_dir_all(dir) {
        panic!("failed to create {}: {e}", dir.display());
    }
}

/// One page per visible command, named `switchdeck-<sub>-<subsub>.1`.
fn write_manpages(cmd: &clap::Command, dir: &Path, page: &str) {
    let mut buf = Vec::new();
    if let Err(e) = clap_mangen::Man::new(cmd.clone().name(page.to_owned())).render(&mut buf) {
        panic!("failed to render man page `{page}`: {e}");
    }
    let path = dir.join(format!("{page}.1"));
    if let Err(e) = fs::write(&path, buf) {
        panic!("failed to write {}: {e}", path.display());
    }

    for sub in cmd.get_subcommands().filter(|sub| !sub.is_hide_set()) {
        write_manpages(sub, dir, &format!("{page}-{}", sub.get_name()));
    }
}
