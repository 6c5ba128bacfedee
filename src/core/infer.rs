//! core::infer
//!
//! Stack inference: reconstruct branch stacks purely from commit ancestry.
//!
//! # Algorithm
//!
//! 1. Index the log: commit → parents, commit → branches pointing at it.
//! 2. Walk each branch's ancestry with an explicit work list. A path stops at
//!    another branch's tip (a parent candidate) or at a trunk commit. The
//!    commits visited before stopping are the branch's *segment*.
//! 3. Union branches with their parent, with co-located branches, and with
//!    branches whose segments overlap. Each group becomes one [`Stack`].
//! 4. Order each group by distance from the default branch, tip first.
//!
//! Anomalies become [`StackError`]s on the affected stack; inference itself
//! never fails. Walks stop at the first branch tip, so each commit is visited
//! by a handful of walks at most.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use super::stack::{Branch, CommitLog, Inference, InferError, Problem, Stack, StackError};
use super::types::{BranchName, Oid};
use crate::git::GitRepo;

impl Inference {
    /// Read the commit log from `git` and infer stacks from it.
    ///
    /// # Errors
    ///
    /// Only when the log cannot be read; ambiguity is reported in the result.
    pub fn from_repo(git: &dyn GitRepo, default_branch: &BranchName) -> Result<Self, InferError> {
        let log = git.log_all(default_branch)?;
        Ok(infer_stacks(&log))
    }
}

/// Where a branch's ancestry walk ended up.
#[derive(Debug, Default)]
struct Walk {
    /// Commits owned by the branch, tip included
    segment: BTreeSet<Oid>,
    /// Branch-tip commits the walk stopped at
    frontier: BTreeSet<Oid>,
    reached_trunk: bool,
    reached_root: bool,
}

/// Indexed view over a [`CommitLog`].
struct CommitGraph<'a> {
    log: &'a CommitLog,
    parents: HashMap<&'a Oid, &'a [Oid]>,
    tips: HashMap<&'a Oid, BTreeSet<&'a BranchName>>,
}

impl<'a> CommitGraph<'a> {
    fn new(log: &'a CommitLog) -> Self {
        let parents = log
            .entries
            .iter()
            .map(|e| (&e.oid, e.parents.as_slice()))
            .collect();

        let mut tips: HashMap<&Oid, BTreeSet<&BranchName>> = HashMap::new();
        let annotated = log
            .entries
            .iter()
            .flat_map(|e| e.branches.iter().map(move |name| (&e.oid, name)));
        let listed = log.branches.iter().map(|b| (&b.tip, &b.name));
        for (oid, name) in annotated.chain(listed) {
            if *name != log.default_branch {
                tips.entry(oid).or_default().insert(name);
            }
        }

        Self { log, parents, tips }
    }

    /// Trunk commits are the default tip and anything the log left out.
    fn is_trunk(&self, oid: &Oid) -> bool {
        self.log.default_tip.as_ref() == Some(oid) || !self.parents.contains_key(oid)
    }

    fn branches_at(&self, oid: &Oid) -> Vec<BranchName> {
        self.tips
            .get(oid)
            .map(|names| names.iter().map(|n| (*n).clone()).collect())
            .unwrap_or_default()
    }

    fn walk(&self, tip: &'a Oid) -> Walk {
        let mut walk = Walk::default();
        if self.is_trunk(tip) {
            walk.reached_trunk = true;
            return walk;
        }

        let mut visited: HashSet<&Oid> = HashSet::from([tip]);
        let mut pending: Vec<&Oid> = Vec::new();
        walk.segment.insert(tip.clone());
        self.expand(tip, &mut pending, &mut walk);

        while let Some(oid) = pending.pop() {
            if !visited.insert(oid) {
                continue;
            }
            if self.is_trunk(oid) {
                walk.reached_trunk = true;
            } else if self.tips.contains_key(oid) {
                walk.frontier.insert(oid.clone());
            } else {
                walk.segment.insert(oid.clone());
                self.expand(oid, &mut pending, &mut walk);
            }
        }
        walk
    }

    /// Drop frontier tips that are ancestors of another frontier tip; what
    /// remains are the nearest branches below the walk.
    fn nearest(&self, frontier: &BTreeSet<Oid>) -> BTreeSet<Oid> {
        if frontier.len() < 2 {
            return frontier.clone();
        }
        let mut covered: HashSet<&Oid> = HashSet::new();
        for tip in frontier {
            let parents = self.parents.get(tip).copied().unwrap_or_default();
            let mut pending: Vec<&Oid> = parents.iter().collect();
            let mut visited: HashSet<&Oid> = HashSet::new();
            while let Some(oid) = pending.pop() {
                if self.is_trunk(oid) || !visited.insert(oid) {
                    continue;
                }
                covered.insert(oid);
                pending.extend(self.parents.get(oid).copied().unwrap_or_default());
            }
        }
        frontier
            .iter()
            .filter(|tip| !covered.contains(tip))
            .cloned()
            .collect()
    }

    fn expand(&self, oid: &'a Oid, pending: &mut Vec<&'a Oid>, walk: &mut Walk) {
        let parents = self.parents.get(oid).copied().unwrap_or_default();
        if parents.is_empty() {
            walk.reached_root = true;
        }
        pending.extend(parents.iter());
    }
}

/// Disjoint sets over branch indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Infer every stack in `log`.
///
/// # Example
///
/// ```
/// use git_stack::core::infer::infer_stacks;
/// use git_stack::core::stack::{Branch, CommitLog, LogEntry};
/// use git_stack::core::types::{BranchName, Oid};
///
/// let oid = |n: u32| Oid::new(format!("{n:040x}")).unwrap();
/// let name = |s: &str| BranchName::new(s).unwrap();
///
/// let log = CommitLog {
///     default_branch: name("main"),
///     default_tip: Some(oid(1)),
///     entries: vec![
///         LogEntry { oid: oid(2), parents: vec![oid(1)], branches: vec![name("feature")] },
///         LogEntry { oid: oid(1), parents: vec![], branches: vec![name("main")] },
///     ],
///     branches: vec![
///         Branch { name: name("main"), tip: oid(1) },
///         Branch { name: name("feature"), tip: oid(2) },
///     ],
/// };
///
/// let inference = infer_stacks(&log);
/// assert_eq!(inference.stacks.len(), 1);
/// assert_eq!(inference.stacks[0].name(), "feature");
/// assert!(inference.problems.is_empty());
/// ```
pub fn infer_stacks(log: &CommitLog) -> Inference {
    let graph = CommitGraph::new(log);

    let mut branches: Vec<&Branch> = log
        .branches
        .iter()
        .filter(|b| b.name != log.default_branch)
        .collect();
    branches.sort_by(|a, b| a.name.cmp(&b.name));
    branches.dedup_by(|a, b| a.name == b.name);

    let index: HashMap<&BranchName, usize> = branches
        .iter()
        .enumerate()
        .map(|(i, b)| (&b.name, i))
        .collect();

    let mut sets = UnionFind::new(branches.len());
    let mut parent_of: Vec<Option<usize>> = vec![None; branches.len()];
    let mut errors: Vec<(usize, StackError)> = Vec::new();
    let mut owners: BTreeMap<Oid, Vec<usize>> = BTreeMap::new();
    let mut shared_tips: BTreeSet<Oid> = BTreeSet::new();

    for (i, branch) in branches.iter().enumerate() {
        let walk = graph.walk(&branch.tip);
        debug!(
            branch = %branch.name,
            segment = walk.segment.len(),
            frontier = walk.frontier.len(),
            reached_trunk = walk.reached_trunk,
            "walked branch ancestry"
        );

        // Co-located branches have no order between them.
        let colocated = graph.branches_at(&branch.tip);
        if colocated.len() > 1 && !graph.is_trunk(&branch.tip) {
            for name in &colocated {
                if let Some(&j) = index.get(name) {
                    sets.union(i, j);
                }
            }
            if shared_tips.insert(branch.tip.clone()) {
                errors.push((
                    i,
                    StackError::SharedTip {
                        branches: colocated,
                        commit: branch.tip.clone(),
                    },
                ));
            }
        }

        for j in walk
            .frontier
            .iter()
            .flat_map(|oid| graph.branches_at(oid))
            .filter_map(|name| index.get(&name).copied())
        {
            sets.union(i, j);
        }

        // A merge of a branch with its own ancestors still has one parent.
        let nearest = graph.nearest(&walk.frontier);
        let candidates: Vec<usize> = nearest
            .iter()
            .flat_map(|oid| graph.branches_at(oid))
            .filter_map(|name| index.get(&name).copied())
            .collect();

        match nearest.len() {
            0 if !walk.reached_trunk && walk.reached_root => errors.push((
                i,
                StackError::Unreachable {
                    branch: branch.name.clone(),
                    default_branch: log.default_branch.clone(),
                },
            )),
            0 => {}
            1 => parent_of[i] = candidates.first().copied(),
            _ => errors.push((
                i,
                StackError::AmbiguousMerge {
                    branch: branch.name.clone(),
                    candidates: candidates.iter().map(|&j| branches[j].name.clone()).collect(),
                },
            )),
        }

        for oid in walk.segment {
            owners.entry(oid).or_default().push(i);
        }
    }

    // Segments overlapping outside a branch tip mean the histories forked
    // below any branch.
    let mut diverged: BTreeSet<Vec<usize>> = BTreeSet::new();
    for (oid, members) in &owners {
        if members.len() > 1 && !shared_tips.contains(oid) {
            diverged.insert(members.clone());
        }
    }

    // A branch with several children forks the stack.
    let mut children: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (child, parent) in parent_of.iter().enumerate() {
        if let Some(parent) = parent {
            children.entry(*parent).or_default().push(child);
        }
    }
    for kids in children.into_values() {
        if kids.len() > 1 {
            diverged.insert(kids);
        }
    }

    for members in diverged {
        for pair in members.windows(2) {
            sets.union(pair[0], pair[1]);
        }
        errors.push((
            members[0],
            StackError::Diverged {
                branches: members.iter().map(|&j| branches[j].name.clone()).collect(),
            },
        ));
    }

    // Group, then order each group tip first.
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..branches.len() {
        groups.entry(sets.find(i)).or_default().push(i);
    }
    let mut group_errors: HashMap<usize, Vec<StackError>> = HashMap::new();
    for (i, err) in errors {
        group_errors.entry(sets.find(i)).or_default().push(err);
    }

    let mut stacks: Vec<Stack> = groups
        .into_iter()
        .map(|(root, mut members)| {
            let depth = |i: usize| {
                let mut depth = 0;
                let mut current = parent_of[i];
                while let Some(p) = current {
                    depth += 1;
                    if depth > branches.len() {
                        break;
                    }
                    current = parent_of[p];
                }
                depth
            };
            members.sort_by(|&a, &b| {
                depth(b)
                    .cmp(&depth(a))
                    .then_with(|| branches[a].name.cmp(&branches[b].name))
            });

            let commits: HashSet<Oid> = owners
                .iter()
                .filter(|(_, owned_by)| owned_by.iter().any(|o| members.contains(o)))
                .map(|(oid, _)| oid.clone())
                .collect();
            let ordered = members.iter().map(|&i| branches[i].clone()).collect();
            Stack::new(
                ordered,
                commits,
                group_errors.remove(&root).unwrap_or_default(),
            )
        })
        .collect();
    stacks.sort_by_key(Stack::name);

    let mut problems: Vec<Problem> = Vec::new();
    if log.default_tip.is_none() {
        problems.push(Problem {
            stack: None,
            message: format!(
                "default branch '{}' has no local ref; no stack can reach it",
                log.default_branch
            ),
        });
    }
    for stack in &stacks {
        for err in stack.errors() {
            problems.push(Problem {
                stack: Some(stack.name()),
                message: err.to_string(),
            });
        }
    }

    Inference { stacks, problems }
}
