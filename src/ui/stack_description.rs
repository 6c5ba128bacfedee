//! ui::stack_description
//!
//! Pure functions for the stack section of pull request descriptions.
//!
//! # Design
//!
//! Every PR in a pushed stack carries a generated section listing the whole
//! stack, delimited by HTML comment markers so it can be regenerated on the
//! next push while leaving the rest of the description alone.
//!
//! Formatting is idempotent: running [`format_description`] over its own
//! output with the same PR list yields the same bytes.
//!
//! # Example Output
//!
//! ```markdown
//! Adds the login form.
//!
//! <!-- DO NOT EDIT: generated by git stack push (start)-->
//! Merge request stack:
//! - Next: !12
//! - Current: !11
//! - Prev: !10
//! <!-- DO NOT EDIT: generated by git stack push (end) -->
//! ```
//!
//! The list is in stack order, tip first: "Next" is the PR stacked on top of
//! the current one, "Prev" the one it builds on.

use crate::forge::PullRequest;

/// Marker indicating the start of the generated section.
pub const BEGIN_MARKER: &str = "<!-- DO NOT EDIT: generated by git stack push (start)-->";

/// Marker indicating the end of the generated section.
pub const END_MARKER: &str = "<!-- DO NOT EDIT: generated by git stack push (end) -->";

/// Header line of a multi-PR stack listing.
const STACK_HEADER: &str = "Merge request stack:";

/// Generate the section body listing `ordered`, tip first.
///
/// A single-PR stack has nothing to link to, so its body is empty.
pub fn stack_body(current: &PullRequest, ordered: &[PullRequest]) -> String {
    if ordered.len() == 1 {
        return String::new();
    }

    let current_index = ordered.iter().position(|pr| pr.head == current.head);
    let mut lines = vec![STACK_HEADER.to_string()];
    for (i, pr) in ordered.iter().enumerate() {
        let label = match current_index {
            Some(c) if i == c => "Current: ",
            Some(c) if i + 1 == c => "Next: ",
            Some(c) if i == c + 1 => "Prev: ",
            _ => "",
        };
        lines.push(format!("- {}{}", label, pr.markdown_url));
    }
    lines.join("\n")
}

/// Wrap `body` in the markers.
pub fn stack_section(body: &str) -> String {
    format!("{}\n{}\n{}", BEGIN_MARKER, body, END_MARKER)
}

/// Merge a generated section into an existing description.
///
/// Every marker-delimited region is replaced by `section`. Without markers,
/// the description is trimmed of trailing whitespace and the section is
/// appended after a blank line, so an empty description becomes
/// `"\n\n"` followed by the section.
///
/// A begin marker that is followed by another begin marker before any end
/// marker is left as text; the region starts at the later one.
///
/// # Example
///
/// ```
/// use git_stack::ui::stack_description::{merge_section, stack_section};
///
/// let section = stack_section("");
/// let merged = merge_section("Adds a feature.\n", &section);
/// assert_eq!(merged, format!("Adds a feature.\n\n{section}"));
///
/// // Replacing is stable.
/// assert_eq!(merge_section(&merged, &section), merged);
/// ```
pub fn merge_section(existing: &str, section: &str) -> String {
    let mut merged = String::with_capacity(existing.len() + section.len());
    let mut rest = existing;
    let mut replaced = false;

    while let Some(start) = rest.find(BEGIN_MARKER) {
        let body_start = start + BEGIN_MARKER.len();
        let after_begin = &rest[body_start..];
        let Some(end) = after_begin.find(END_MARKER) else {
            break;
        };
        if let Some(next) = after_begin[..end].find(BEGIN_MARKER) {
            // Stray begin marker; keep it and retry from the next one.
            merged.push_str(&rest[..body_start + next]);
            rest = &rest[body_start + next..];
            continue;
        }
        merged.push_str(&rest[..start]);
        merged.push_str(section);
        rest = &after_begin[end + END_MARKER.len()..];
        replaced = true;
    }

    if replaced {
        merged.push_str(rest);
        return merged;
    }

    format!("{}\n\n{}", existing.trim_end(), section)
}

/// Compute the full description for `current` given the stack's PRs in
/// order, tip first.
///
/// # Example
///
/// ```
/// use git_stack::forge::mock::MockForge;
/// use git_stack::ui::stack_description::format_description;
///
/// let prs = vec![
///     MockForge::pull_request(2, "b", "a", ""),
///     MockForge::pull_request(1, "a", "main", "Base work."),
/// ];
///
/// let description = format_description(&prs[1], &prs);
/// assert!(description.starts_with("Base work.\n\n"));
/// assert!(description.contains("- Next: !2\n- Current: !1\n"));
/// ```
pub fn format_description(current: &PullRequest, ordered: &[PullRequest]) -> String {
    let section = stack_section(&stack_body(current, ordered));
    merge_section(&current.body, &section)
}
