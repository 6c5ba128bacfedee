//! list command - Show every inferred stack
//!
//! Prints one line per stack, marking the stack that holds HEAD, followed by
//! any inference problems. Degraded stacks are still listed.

use anyhow::Result;

use super::{open_workspace, Context};
use crate::core::stack::Inference;
use crate::git::GitRepo;
use crate::ui::output::{format_problems, format_stack_line, print};

/// Run the list command.
pub fn list(ctx: &Context) -> Result<()> {
    let ws = open_workspace(ctx)?;
    let head = ws.git.commit_hash("HEAD")?;
    let inference = Inference::from_repo(&ws.git, &ws.default_branch)?;

    for stack in &inference.stacks {
        print(format_stack_line(stack, stack.is_current(&head)), ctx.verbosity);
    }

    let problems = format_problems(&inference.problems);
    if !problems.is_empty() {
        print(format!("\n{problems}"), ctx.verbosity);
    }

    Ok(())
}
