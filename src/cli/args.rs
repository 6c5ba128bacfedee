//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Only log errors

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// git-stack - infer stacked branches from history and sync them as linked
/// pull requests
#[derive(Parser, Debug)]
#[command(name = "git-stack")]
#[command(author, about, long_about = None)]
pub struct Cli {
    /// Run as if git-stack was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List every stack in the repository
    #[command(
        name = "list",
        long_about = "List every stack in the repository.\n\n\
            Stacks are inferred from commit ancestry: branches whose histories build \
            on each other form one stack. The stack containing HEAD is marked with an \
            asterisk (*). Ambiguous histories are listed under Problems.",
        after_help = "\
EXAMPLES:
    # Show all stacks
    git stack list

    # Inspect another checkout
    git stack --cwd ../other-repo list"
    )]
    List,

    /// Push the current stack and sync its pull requests
    #[command(
        name = "push",
        long_about = "Push the current stack and sync its pull requests.\n\n\
            Every branch in the stack containing HEAD gets an open pull request \
            targeting the branch below it (the base targets the default branch). \
            Branches are force-pushed with lease, and every description is updated \
            with a listing of the whole stack.\n\n\
            The token is read from GITLAB_TOKEN or GITHUB_TOKEN, falling back to \
            GIT_STACK_TOKEN.",
        after_help = "\
EXAMPLES:
    # Push the stack you are on
    git stack push

    # See every forge call
    git stack --debug push"
    )]
    Push,

    /// Print the version
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["git-stack", "list", "--cwd", "/tmp/repo", "--debug"]).unwrap();
        assert_eq!(cli.command, Command::List);
        assert_eq!(cli.cwd, Some(PathBuf::from("/tmp/repo")));
        assert!(cli.debug);
        assert!(!cli.quiet);
    }

    #[test]
    fn quiet_short_flag() {
        let cli = Cli::try_parse_from(["git-stack", "-q", "push"]).unwrap();
        assert_eq!(cli.command, Command::Push);
        assert!(cli.quiet);
    }

    #[test]
    fn debug_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["git-stack", "--debug", "--quiet", "list"]).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["git-stack"]).is_err());
    }
}
