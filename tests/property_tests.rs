//! Property-based tests for the description formatter, the executor, and
//! stack inference.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::time::Duration;

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use git_stack::core::infer::infer_stacks;
use git_stack::core::stack::{Branch, CommitLog, LogEntry};
use git_stack::core::types::{BranchName, Oid};
use git_stack::engine::concurrent::{Cancelled, Executor};
use git_stack::forge::mock::MockForge;
use git_stack::forge::PullRequest;
use git_stack::ui::stack_description::{format_description, BEGIN_MARKER, END_MARKER};

/// Free-form description text, occasionally containing a marker.
fn description() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[ -~\n]{0,80}",
        1 => Just(String::new()),
        1 => "[a-z ]{0,20}".prop_map(|s| format!("{s}\n\n{BEGIN_MARKER}\nstale\n{END_MARKER}\n")),
    ]
}

/// A stack of 1..6 PRs with the chosen one's description randomized.
fn stack_prs() -> impl Strategy<Value = (Vec<PullRequest>, usize, String)> {
    (1usize..6).prop_flat_map(|len| (Just(len), 0..len, description())).prop_map(
        |(len, current, body)| {
            let prs = (0..len)
                .map(|i| {
                    let number = (len - i) as u64;
                    MockForge::pull_request(number, &format!("branch-{number}"), "main", "")
                })
                .collect();
            (prs, current, body)
        },
    )
}

fn oid(n: usize) -> Oid {
    Oid::new(format!("{n:040x}")).unwrap()
}

proptest! {
    #[test]
    fn format_is_idempotent((mut prs, current, body) in stack_prs()) {
        prs[current].body = body;
        let once = format_description(&prs[current], &prs);

        prs[current].body = once.clone();
        let twice = format_description(&prs[current], &prs);

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn format_has_exactly_one_section((mut prs, current, body) in stack_prs()) {
        prop_assume!(!body.contains(BEGIN_MARKER) || body.matches(BEGIN_MARKER).count() == 1);
        prs[current].body = body;
        let formatted = format_description(&prs[current], &prs);

        prop_assert_eq!(formatted.matches(BEGIN_MARKER).count(), 1);
        prop_assert_eq!(formatted.matches(END_MARKER).count(), 1);
        let label = format!("- Current: {}", prs[current].markdown_url);
        prop_assert_eq!(formatted.contains(&label), prs.len() > 1);
    }

    #[test]
    fn executor_preserves_order(
        delays in prop::collection::vec(0u64..5, 0..12),
        limit in 1usize..5,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let executor = Executor::new(limit, CancellationToken::new());
        let input: Vec<(usize, u64)> = delays.iter().copied().enumerate().collect();

        let out = rt.block_on(executor.map(input, |(i, delay)| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok::<_, Cancelled>(i * 2)
        })).unwrap();

        let expected: Vec<usize> = (0..delays.len()).map(|i| i * 2).collect();
        prop_assert_eq!(out, expected);
    }

    /// A single chain of branches off the default branch is always one
    /// error-free stack ordered tip first.
    #[test]
    fn linear_chain_is_one_ordered_stack(
        len in 1usize..8,
        gaps in prop::collection::vec(0usize..3, 8),
    ) {
        let main = BranchName::new("main").unwrap();
        let mut entries = vec![LogEntry { oid: oid(1), parents: vec![], branches: vec![main.clone()] }];
        let mut branches = vec![Branch { name: main.clone(), tip: oid(1) }];
        let mut next = 2;
        let mut parent = oid(1);

        for (b, gap) in gaps.iter().take(len).enumerate() {
            // Unbranched commits between tips.
            for _ in 0..*gap {
                entries.push(LogEntry { oid: oid(next), parents: vec![parent.clone()], branches: vec![] });
                parent = oid(next);
                next += 1;
            }
            let name = BranchName::new(format!("b{b}")).unwrap();
            entries.push(LogEntry { oid: oid(next), parents: vec![parent.clone()], branches: vec![name.clone()] });
            branches.push(Branch { name, tip: oid(next) });
            parent = oid(next);
            next += 1;
        }
        entries.reverse();

        let inference = infer_stacks(&CommitLog {
            default_branch: main,
            default_tip: Some(oid(1)),
            entries,
            branches,
        });

        prop_assert_eq!(inference.stacks.len(), 1);
        prop_assert!(inference.problems.is_empty());
        let order: Vec<String> = inference.stacks[0]
            .local_branches()
            .iter()
            .map(|b| b.name.to_string())
            .collect();
        let expected: Vec<String> = (0..len).rev().map(|b| format!("b{b}")).collect();
        prop_assert_eq!(order, expected);
    }
}
