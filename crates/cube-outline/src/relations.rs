//! Hierarchy traversal over a built [`Dimension`].
//!
//! "Instance" relations follow the position of one member occurrence only: a shared member reached
//! while walking down is a leaf of that walk. The `R` ("all hierarchies") variants also continue
//! through shared members into their primary's subtree, and walk up from every instance of a member.

use crate::model::{Dimension, MemberId};
use std::collections::{HashSet, VecDeque};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    Parent,
    Children,
    IChildren,
    Descendants,
    IDescendants,
    RDescendants,
    IRDescendants,
    Ancestors,
    IAncestors,
    RAncestors,
    IRAncestors,
    Level0,
    RLevel0,
    Leaves,
    RLeaves,
    Shared,
}

impl Relation {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword.to_ascii_lowercase().as_str() {
            "parent" => Relation::Parent,
            "children" => Relation::Children,
            "ichildren" => Relation::IChildren,
            "descendants" => Relation::Descendants,
            "idescendants" => Relation::IDescendants,
            "rdescendants" => Relation::RDescendants,
            "irdescendants" => Relation::IRDescendants,
            "ancestors" => Relation::Ancestors,
            "iancestors" => Relation::IAncestors,
            "rancestors" => Relation::RAncestors,
            "irancestors" => Relation::IRAncestors,
            "level0" => Relation::Level0,
            "rlevel0" => Relation::RLevel0,
            "leaves" => Relation::Leaves,
            "rleaves" => Relation::RLeaves,
            "shared" => Relation::Shared,
            _ => return None,
        })
    }
}

/// Whether a level/generation macro targets levels or generations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Depth {
    Level(u32),
    Generation(u32),
}

impl Depth {
    /// Resolve a `Level(n)`/`Generation(n)` argument: `Level` always means a level; for
    /// `Generation`, a positive argument is a generation and zero/negative means level `-n`.
    pub fn from_macro(is_level: bool, n: i64) -> Self {
        let magnitude = u32::try_from(n.unsigned_abs()).unwrap_or(u32::MAX);
        if is_level || n <= 0 {
            Depth::Level(magnitude)
        } else {
            Depth::Generation(magnitude)
        }
    }
}

impl Dimension {
    pub fn relation(&self, id: MemberId, relation: Relation) -> Vec<MemberId> {
        match relation {
            Relation::Parent => self.member(id).parent().into_iter().collect(),
            Relation::Children => self.children_of(id).to_vec(),
            Relation::IChildren => with_self(id, self.children_of(id).to_vec()),
            Relation::Descendants => self.descendants(id, false),
            Relation::IDescendants => with_self(id, self.descendants(id, false)),
            Relation::RDescendants => self.descendants(id, true),
            Relation::IRDescendants => with_self(id, self.descendants(id, true)),
            Relation::Ancestors => self.ancestors(id),
            Relation::IAncestors => with_self(id, self.ancestors(id)),
            Relation::RAncestors => self.rancestors(id),
            Relation::IRAncestors => with_self(id, self.rancestors(id)),
            Relation::Level0 => self.level0(id, false),
            Relation::RLevel0 => self.level0(id, true),
            Relation::Leaves => self.leaves(id, false),
            Relation::RLeaves => self.leaves(id, true),
            Relation::Shared => self
                .member(self.member(id).non_shared_member())
                .shared_instances()
                .to_vec(),
        }
    }

    /// Children in outline order; a shared member answers with its primary's children.
    pub fn children_of(&self, id: MemberId) -> &[MemberId] {
        self.member(self.member(id).non_shared_member()).children()
    }

    /// Pre-order descendants (parents before their children), excluding `id` itself.
    pub fn descendants(&self, id: MemberId, all_hierarchies: bool) -> Vec<MemberId> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(self.member(id).non_shared_member());
        for child in self.children_of(id) {
            self.walk_down(*child, all_hierarchies, &mut visited, &mut out);
        }
        out
    }

    fn walk_down(
        &self,
        id: MemberId,
        all_hierarchies: bool,
        visited: &mut HashSet<MemberId>,
        out: &mut Vec<MemberId>,
    ) {
        out.push(id);
        let member = self.member(id);
        let children = if member.is_shared() {
            if !all_hierarchies {
                return;
            }
            let primary = member.non_shared_member();
            if !visited.insert(primary) {
                return;
            }
            self.member(primary).children()
        } else {
            if !visited.insert(id) {
                return;
            }
            member.children()
        };
        for child in children {
            self.walk_down(*child, all_hierarchies, visited, out);
        }
    }

    /// Ancestors of this instance, nearest first.
    pub fn ancestors(&self, id: MemberId) -> Vec<MemberId> {
        let mut out = Vec::new();
        let mut current = self.member(id).parent();
        while let Some(parent) = current {
            out.push(parent);
            current = self.member(parent).parent();
        }
        out
    }

    /// Ancestors across every instance of the member (and of those ancestors), own hierarchy first.
    pub fn rancestors(&self, id: MemberId) -> Vec<MemberId> {
        let mut out = Vec::new();
        let mut seen: HashSet<MemberId> = HashSet::new();
        let mut walked: HashSet<MemberId> = HashSet::new();
        let mut queue = VecDeque::from([id]);
        seen.insert(self.member(id).non_shared_member());

        while let Some(next) = queue.pop_front() {
            for instance in self.instances(next) {
                if !walked.insert(instance) {
                    continue;
                }
                for ancestor in self.ancestors(instance) {
                    walked.insert(ancestor);
                    if seen.insert(self.member(ancestor).non_shared_member()) {
                        out.push(ancestor);
                        queue.push_back(ancestor);
                    }
                }
            }
        }
        out
    }

    /// `id` itself, then its primary, then every shared instance of that primary.
    fn instances(&self, id: MemberId) -> Vec<MemberId> {
        let primary = self.member(id).non_shared_member();
        let mut out = vec![id];
        let shared = self.member(primary).shared_instances().iter().copied();
        for candidate in std::iter::once(primary).chain(shared) {
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }

    pub fn level0(&self, id: MemberId, all_hierarchies: bool) -> Vec<MemberId> {
        with_self(id, self.descendants(id, all_hierarchies))
            .into_iter()
            .filter(|m| self.member(*m).level() == 0)
            .collect()
    }

    pub fn leaves(&self, id: MemberId, all_hierarchies: bool) -> Vec<MemberId> {
        with_self(id, self.descendants(id, all_hierarchies))
            .into_iter()
            .filter(|m| {
                if all_hierarchies {
                    self.children_of(*m).is_empty()
                } else {
                    self.member(*m).children().is_empty()
                }
            })
            .collect()
    }

    /// Members at `depth` relative to `id`: its subtree when the target is at or below the member,
    /// its ancestors otherwise.
    pub fn at_depth(&self, id: MemberId, depth: Depth, all_hierarchies: bool) -> Vec<MemberId> {
        let member = self.member(id);
        let below = match depth {
            Depth::Level(n) => n <= member.level(),
            Depth::Generation(n) => n >= member.generation(),
        };
        let candidates = match (below, all_hierarchies) {
            (true, _) => with_self(id, self.descendants(id, all_hierarchies)),
            (false, false) => self.ancestors(id),
            (false, true) => self.rancestors(id),
        };
        candidates
            .into_iter()
            .filter(|m| {
                let m = self.member(*m);
                match depth {
                    Depth::Level(n) => m.level() == n,
                    Depth::Generation(n) => m.generation() == n,
                }
            })
            .collect()
    }

    /// Members in the subtree of `id` (itself included) tagged with `uda`.
    pub fn with_uda(&self, id: MemberId, uda: &str) -> Vec<MemberId> {
        with_self(id, self.descendants(id, false))
            .into_iter()
            .filter(|m| self.member(*m).has_uda(uda))
            .collect()
    }
}

fn with_self(id: MemberId, mut rest: Vec<MemberId>) -> Vec<MemberId> {
    rest.insert(0, id);
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_keywords_are_case_insensitive() {
        assert_eq!(
            Relation::from_keyword("IRDESCENDANTS"),
            Some(Relation::IRDescendants)
        );
        assert_eq!(Relation::from_keyword("level0"), Some(Relation::Level0));
        assert_eq!(Relation::from_keyword("Siblings"), None);
    }

    #[test]
    fn depth_sign_selects_level_or_generation() {
        assert_eq!(Depth::from_macro(false, 2), Depth::Generation(2));
        assert_eq!(Depth::from_macro(false, 0), Depth::Level(0));
        assert_eq!(Depth::from_macro(false, -1), Depth::Level(1));
        assert_eq!(Depth::from_macro(true, 1), Depth::Level(1));
        assert_eq!(Depth::from_macro(true, -2), Depth::Level(2));
    }
}
