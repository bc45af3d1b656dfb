use crate::error::{OutlineError, OutlineResult};
use crate::model::{Dimension, MemberId};
use crate::native::MemberSource;
use crate::spec::{MapExpr, MemberRef, MemberSpec, SelectionOp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandOptions {
    /// Fail with [`OutlineError::EmptySelection`] when the final selection is empty.
    pub raise_if_empty: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            raise_if_empty: true,
        }
    }
}

/// Expands member-selection entries against one dimension.
///
/// A [`MemberSource`] is only needed for substitution variables and engine-native selections;
/// without one those entries fail with [`OutlineError::SessionRequired`].
pub struct MemberExpander<'a> {
    dimension: &'a Dimension,
    source: Option<&'a dyn MemberSource>,
}

impl std::fmt::Debug for MemberExpander<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberExpander")
            .field("dimension", &self.dimension.name())
            .field("live", &self.source.is_some())
            .finish()
    }
}

impl<'a> MemberExpander<'a> {
    pub fn new(dimension: &'a Dimension) -> Self {
        Self {
            dimension,
            source: None,
        }
    }

    pub fn with_source(dimension: &'a Dimension, source: &'a dyn MemberSource) -> Self {
        Self {
            dimension,
            source: Some(source),
        }
    }

    pub fn dimension(&self) -> &'a Dimension {
        self.dimension
    }

    pub fn expand_one(&self, spec: &str, options: &ExpandOptions) -> OutlineResult<Vec<MemberId>> {
        self.expand(&[spec], options)
    }

    /// Apply every entry, strictly left to right, to a working list that starts empty.
    pub fn expand<S: AsRef<str>>(
        &self,
        specs: &[S],
        options: &ExpandOptions,
    ) -> OutlineResult<Vec<MemberId>> {
        let dim = self.dimension;
        let mut working: Vec<MemberId> = Vec::new();

        for text in specs {
            let text = text.as_ref();
            let op = SelectionOp::parse(text)
                .map_err(|reason| OutlineError::invalid_spec(dim.name(), text, reason))?;
            working = match op {
                SelectionOp::Add(spec) => {
                    working.extend(self.resolve(&spec, text)?);
                    working
                }
                SelectionOp::Subtract(spec) => {
                    let remove = self.identities(&self.resolve(&spec, text)?);
                    working
                        .into_iter()
                        .filter(|id| !remove.contains(&self.identity(*id)))
                        .collect()
                }
                SelectionOp::Intersect(spec) => {
                    let keep = self.identities(&self.resolve(&spec, text)?);
                    working
                        .into_iter()
                        .filter(|id| keep.contains(&self.identity(*id)))
                        .collect()
                }
                SelectionOp::Filter(predicate) => working
                    .into_iter()
                    .filter(|id| predicate.matches(dim.member(*id)))
                    .collect(),
                SelectionOp::Map(expr) => working
                    .into_iter()
                    .flat_map(|id| self.map_member(id, expr))
                    .collect(),
                SelectionOp::Uniq => {
                    let mut seen = HashSet::new();
                    working
                        .into_iter()
                        .filter(|id| seen.insert(self.identity(*id)))
                        .collect()
                }
            };
        }

        let mut seen = HashSet::new();
        working.retain(|id| seen.insert(*id));

        if working.is_empty() && options.raise_if_empty {
            return Err(OutlineError::EmptySelection {
                dimension: dim.name().to_string(),
                spec: specs
                    .iter()
                    .map(|s| s.as_ref())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        Ok(working)
    }

    fn identity(&self, id: MemberId) -> MemberId {
        self.dimension.member(id).non_shared_member()
    }

    fn identities(&self, ids: &[MemberId]) -> HashSet<MemberId> {
        ids.iter().map(|id| self.identity(*id)).collect()
    }

    fn map_member(&self, id: MemberId, expr: MapExpr) -> Vec<MemberId> {
        let dim = self.dimension;
        match expr {
            MapExpr::Relation(relation) => dim.relation(id, relation),
            MapExpr::Depth {
                depth,
                all_hierarchies,
            } => dim.at_depth(id, depth, all_hierarchies),
            MapExpr::Primary => vec![self.identity(id)],
        }
    }

    /// Resolve a single member spec; `text` is the full entry, used in error messages.
    pub fn resolve(&self, spec: &MemberSpec, text: &str) -> OutlineResult<Vec<MemberId>> {
        let dim = self.dimension;
        match spec {
            MemberSpec::Name(member) => Ok(vec![self.lookup(member, text)?]),
            MemberSpec::Relation { member, relation } => {
                Ok(dim.relation(self.lookup(member, text)?, *relation))
            }
            MemberSpec::Depth {
                member,
                depth,
                all_hierarchies,
            } => Ok(dim.at_depth(self.lookup(member, text)?, *depth, *all_hierarchies)),
            MemberSpec::Uda { member, uda } => Ok(dim.with_uda(self.lookup(member, text)?, uda)),
            MemberSpec::Native(query) => self.native(query, text),
        }
    }

    fn lookup(&self, member: &MemberRef, text: &str) -> OutlineResult<MemberId> {
        let dim = self.dimension;
        let name = if member.substitution {
            let source = self.source.ok_or_else(|| OutlineError::SessionRequired {
                dimension: dim.name().to_string(),
                spec: text.to_string(),
            })?;
            source.resolve_substitution_variable(&member.name)?
        } else {
            member.name.clone()
        };
        dim.lookup(crate::spec::unquote(&name))
            .ok_or_else(|| OutlineError::unknown_member(dim.name(), text))
    }

    /// Run `query` on the server and map each returned row back to a member instance.
    ///
    /// The server reports the parent of every occurrence; when it differs from the primary
    /// member's parent the matching shared instance is used instead.
    fn native(&self, query: &str, text: &str) -> OutlineResult<Vec<MemberId>> {
        let dim = self.dimension;
        let source = self.source.ok_or_else(|| OutlineError::SessionRequired {
            dimension: dim.name().to_string(),
            spec: text.to_string(),
        })?;

        let rows = source.execute_member_query(dim.name(), query)?;
        log::debug!(
            "member query {query:?} on {} returned {} rows",
            dim.name(),
            rows.len()
        );

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let primary = dim
                .lookup(&row.name)
                .ok_or_else(|| OutlineError::unknown_member(dim.name(), &row.name))?;
            if parent_matches(dim, primary, row.parent.as_deref()) {
                out.push(primary);
                continue;
            }

            let mut candidates = dim
                .member(primary)
                .shared_instances()
                .iter()
                .copied()
                .filter(|id| parent_matches(dim, *id, row.parent.as_deref()));
            let Some(instance) = candidates.next() else {
                return Err(OutlineError::NativeMismatch {
                    dimension: dim.name().to_string(),
                    member: row.name.clone(),
                    parent: row.parent.clone().unwrap_or_default(),
                });
            };
            if candidates.next().is_some() {
                log::warn!(
                    "{} has several shared instances under {:?} in {}; using the first",
                    row.name,
                    row.parent,
                    dim.name()
                );
            }
            out.push(instance);
        }
        Ok(out)
    }
}

fn parent_matches(dim: &Dimension, id: MemberId, parent: Option<&str>) -> bool {
    let actual = dim.member(id).parent().map(|p| dim.member(p).name());
    match (actual, parent) {
        (None, None) => true,
        (Some(actual), Some(expected)) => actual.eq_ignore_ascii_case(expected),
        _ => false,
    }
}
