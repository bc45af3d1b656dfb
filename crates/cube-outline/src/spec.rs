//! Member-selection grammar.
//!
//! A selection is a sequence of entries, each optionally prefixed by a set operator:
//!
//! | entry | meaning |
//! |---|---|
//! | `Name`, `"Name"`, `[Name]` | one member (by name or alias) |
//! | `&Var` | substitution variable whose value names a member |
//! | `Name.Children`, `Name.IRDescendants`, ... | relationship macro |
//! | `Name.Level(n)`, `Name.RGeneration(n)` | members at a relative depth |
//! | `Name.UDA(tag)` | members of the subtree carrying a user-defined attribute |
//! | text containing `@`, `:` or `,` | engine-native selection, run on the server |
//! | `+entry` / `-entry` | add to / subtract from the working list |
//! | `:and entry` | intersect |
//! | `:filter predicate` | keep members matching a predicate |
//! | `:map relation` | replace each member by a relation of it |
//! | `:uniq` | collapse shared instances onto one occurrence |
//!
//! Member specs are classified in a fixed priority order: relationship macro, depth macro, UDA
//! macro, native delegation and finally plain name. Relationship suffixes that are not known
//! keywords are not macros; the whole text is then looked up as a name.

use crate::model::{Consolidation, Member, ShareOption};
use crate::relations::{Depth, Relation};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A member reference at the head of a macro or on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRef {
    pub name: String,
    /// `&Name`: resolve `name` as a substitution variable first.
    pub substitution: bool,
}

impl MemberRef {
    fn parse(text: &str) -> Self {
        let text = text.trim();
        let (substitution, rest) = match text.strip_prefix('&') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        Self {
            name: unquote(rest).to_string(),
            substitution,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberSpec {
    Name(MemberRef),
    Relation {
        member: MemberRef,
        relation: Relation,
    },
    Depth {
        member: MemberRef,
        depth: Depth,
        all_hierarchies: bool,
    },
    Uda {
        member: MemberRef,
        uda: String,
    },
    /// Engine-native selection text, passed through untouched.
    Native(String),
}

impl MemberSpec {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();

        if let Some(caps) = relation_re().captures(text) {
            if let Some(relation) = Relation::from_keyword(&caps[2]) {
                return MemberSpec::Relation {
                    member: MemberRef::parse(&caps[1]),
                    relation,
                };
            }
        }

        if let Some(caps) = depth_re().captures(text) {
            if let Ok(n) = caps[4].parse::<i64>() {
                let is_level = caps[3].to_ascii_lowercase().starts_with("lev");
                return MemberSpec::Depth {
                    member: MemberRef::parse(&caps[1]),
                    depth: Depth::from_macro(is_level, n),
                    all_hierarchies: caps.get(2).is_some(),
                };
            }
        }

        if let Some(caps) = uda_re().captures(text) {
            return MemberSpec::Uda {
                member: MemberRef::parse(&caps[1]),
                uda: unquote(&caps[2]).to_string(),
            };
        }

        if contains_unquoted(text, &['@', ':', ',']) {
            return MemberSpec::Native(text.to_string());
        }

        MemberSpec::Name(MemberRef::parse(text))
    }
}

/// One entry of a selection sequence.
#[derive(Clone, Debug)]
pub enum SelectionOp {
    Add(MemberSpec),
    Subtract(MemberSpec),
    Intersect(MemberSpec),
    Filter(Predicate),
    Map(MapExpr),
    Uniq,
}

impl SelectionOp {
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("empty member specification".to_string());
        }

        if let Some(rest) = text.strip_prefix(':') {
            let (keyword, arg) = match rest.find(char::is_whitespace) {
                Some(idx) => (&rest[..idx], rest[idx..].trim()),
                None => (rest, ""),
            };
            return match keyword.to_ascii_lowercase().as_str() {
                "and" => Ok(SelectionOp::Intersect(non_empty(arg, "and")?)),
                "filter" => Predicate::parse(arg).map(SelectionOp::Filter),
                "map" => MapExpr::parse(arg).map(SelectionOp::Map),
                "uniq" if arg.is_empty() => Ok(SelectionOp::Uniq),
                "uniq" => Err(":uniq takes no argument".to_string()),
                _ => Err(format!("unknown operator :{keyword}")),
            };
        }

        if let Some(rest) = text.strip_prefix('+') {
            return Ok(SelectionOp::Add(non_empty(rest, "+")?));
        }
        if let Some(rest) = text.strip_prefix('-') {
            return Ok(SelectionOp::Subtract(non_empty(rest, "-")?));
        }
        Ok(SelectionOp::Add(MemberSpec::parse(text)))
    }
}

fn non_empty(arg: &str, op: &str) -> Result<MemberSpec, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(format!("operator {op} needs a member specification"));
    }
    Ok(MemberSpec::parse(arg))
}

/// Per-member mapping used by `:map`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapExpr {
    Relation(Relation),
    Depth { depth: Depth, all_hierarchies: bool },
    /// Replace shared instances by their primary member.
    Primary,
}

impl MapExpr {
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("primary") {
            return Ok(MapExpr::Primary);
        }
        if let Some(relation) = Relation::from_keyword(text) {
            return Ok(MapExpr::Relation(relation));
        }
        if let Some(caps) = bare_depth_re().captures(text) {
            let n = caps[3]
                .parse::<i64>()
                .map_err(|e| format!("bad depth {}: {e}", &caps[3]))?;
            let is_level = caps[2].to_ascii_lowercase().starts_with("lev");
            return Ok(MapExpr::Depth {
                depth: Depth::from_macro(is_level, n),
                all_hierarchies: caps.get(1).is_some(),
            });
        }
        Err(format!("unknown :map expression {text:?}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberFlag {
    Shared,
    Stored,
    Dynamic,
    Label,
    Leaf,
    Formula,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn eval(self, lhs: u32, rhs: u32) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

/// Predicate accepted by `:filter`.
#[derive(Clone)]
pub enum Predicate {
    Flag { flag: MemberFlag, negated: bool },
    Level(CmpOp, u32),
    Generation(CmpOp, u32),
    Name { name: String, negated: bool },
    NameMatches(Regex),
    Uda { uda: String, negated: bool },
    Consolidation { op: Consolidation, negated: bool },
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Flag { flag, negated } => write!(f, "Flag({flag:?}, negated={negated})"),
            Predicate::Level(op, n) => write!(f, "Level({op:?}, {n})"),
            Predicate::Generation(op, n) => write!(f, "Generation({op:?}, {n})"),
            Predicate::Name { name, negated } => write!(f, "Name({name:?}, negated={negated})"),
            Predicate::NameMatches(re) => write!(f, "NameMatches({:?})", re.as_str()),
            Predicate::Uda { uda, negated } => write!(f, "Uda({uda:?}, negated={negated})"),
            Predicate::Consolidation { op, negated } => {
                write!(f, "Consolidation({op}, negated={negated})")
            }
        }
    }
}

impl Predicate {
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if let Some(caps) = flag_re().captures(text) {
            let flag = match caps[2].to_ascii_lowercase().as_str() {
                "shared" => MemberFlag::Shared,
                "stored" => MemberFlag::Stored,
                "dynamic" => MemberFlag::Dynamic,
                "label" => MemberFlag::Label,
                "leaf" => MemberFlag::Leaf,
                "formula" => MemberFlag::Formula,
                other => return Err(format!("unknown flag {other}")),
            };
            return Ok(Predicate::Flag {
                flag,
                negated: caps.get(1).is_some(),
            });
        }

        let caps = compare_re()
            .captures(text)
            .ok_or_else(|| format!("cannot parse filter {text:?}"))?;
        let field = caps[1].to_ascii_lowercase();
        let op = &caps[2];
        let value = unquote(&caps[3]);

        let equality = |op: &str| -> Result<bool, String> {
            match op {
                "=" => Ok(false),
                "!=" => Ok(true),
                _ => Err(format!("operator {op} is not supported for {field}")),
            }
        };

        match field.as_str() {
            "level" | "lev" | "generation" | "gen" => {
                let op = match op {
                    "=" => CmpOp::Eq,
                    "!=" => CmpOp::Ne,
                    "<" => CmpOp::Lt,
                    "<=" => CmpOp::Le,
                    ">" => CmpOp::Gt,
                    ">=" => CmpOp::Ge,
                    _ => return Err(format!("operator {op} is not supported for {field}")),
                };
                let n = value
                    .parse::<u32>()
                    .map_err(|e| format!("bad {field} {value:?}: {e}"))?;
                if field.starts_with("lev") {
                    Ok(Predicate::Level(op, n))
                } else {
                    Ok(Predicate::Generation(op, n))
                }
            }
            "name" if op == "=~" => Regex::new(&format!("(?i){value}"))
                .map(Predicate::NameMatches)
                .map_err(|e| format!("bad pattern {value:?}: {e}")),
            "name" => Ok(Predicate::Name {
                name: value.to_string(),
                negated: equality(op)?,
            }),
            "uda" => Ok(Predicate::Uda {
                uda: value.to_string(),
                negated: equality(op)?,
            }),
            "consolidation" => {
                let mut chars = value.chars();
                let symbol = match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => return Err(format!("bad consolidation {value:?}")),
                };
                let cons = Consolidation::from_symbol(symbol)
                    .ok_or_else(|| format!("bad consolidation {value:?}"))?;
                Ok(Predicate::Consolidation {
                    op: cons,
                    negated: equality(op)?,
                })
            }
            _ => Err(format!("unknown field {field}")),
        }
    }

    pub fn matches(&self, member: &Member) -> bool {
        match self {
            Predicate::Flag { flag, negated } => {
                let share = member.share_option();
                let hit = match flag {
                    MemberFlag::Shared => share.is_shared(),
                    MemberFlag::Stored => share.is_stored(),
                    MemberFlag::Dynamic => share.is_dynamic(),
                    MemberFlag::Label => share == ShareOption::LabelOnly,
                    MemberFlag::Leaf => member.level() == 0,
                    MemberFlag::Formula => member.formula().is_some(),
                };
                hit != *negated
            }
            Predicate::Level(op, n) => op.eval(member.level(), *n),
            Predicate::Generation(op, n) => op.eval(member.generation(), *n),
            Predicate::Name { name, negated } => {
                member.name().eq_ignore_ascii_case(name) != *negated
            }
            Predicate::NameMatches(re) => re.is_match(member.name()),
            Predicate::Uda { uda, negated } => member.has_uda(uda) != *negated,
            Predicate::Consolidation { op, negated } => {
                (member.consolidation() == *op) != *negated
            }
        }
    }
}

/// Strip one layer of `"..."` or `[...]` quoting.
pub fn unquote(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('[', ']')] {
        if text.len() >= 2 && text.starts_with(open) && text.ends_with(close) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

fn contains_unquoted(text: &str, needles: &[char]) -> bool {
    let mut in_quotes = false;
    let mut bracket_depth = 0usize;
    for ch in text.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => bracket_depth += 1,
            ']' if !in_quotes => bracket_depth = bracket_depth.saturating_sub(1),
            c if !in_quotes && bracket_depth == 0 && needles.contains(&c) => return true,
            _ => {}
        }
    }
    false
}

fn relation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^(.+)\.([A-Za-z0-9]+)$").expect("valid regex"))
}

fn depth_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^(.+)\.(R)?(Level|Lev|Generation|Gen)\(\s*(-?\d+)\s*\)$")
            .expect("valid regex")
    })
}

fn bare_depth_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(R)?(Level|Lev|Generation|Gen)\(\s*(-?\d+)\s*\)$").expect("valid regex")
    })
}

fn uda_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)^(.+)\.UDA\(\s*(.+?)\s*\)$").expect("valid regex"))
}

fn flag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(!|not\s+)?(shared|stored|dynamic|label|leaf|formula)$")
            .expect("valid regex")
    })
}

fn compare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(level|lev|generation|gen|name|uda|consolidation)\s*(=~|!=|<=|>=|=|<|>)\s*(.+?)$",
        )
        .expect("valid regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name(n: &str) -> MemberRef {
        MemberRef {
            name: n.to_string(),
            substitution: false,
        }
    }

    #[test]
    fn classifies_relation_macros_first() {
        assert_eq!(
            MemberSpec::parse("Product.Children"),
            MemberSpec::Relation {
                member: name("Product"),
                relation: Relation::Children,
            }
        );
        assert_eq!(
            MemberSpec::parse("[100-20].irancestors"),
            MemberSpec::Relation {
                member: name("100-20"),
                relation: Relation::IRAncestors,
            }
        );
    }

    #[test]
    fn unknown_relation_falls_back_to_a_plain_name() {
        assert_eq!(
            MemberSpec::parse("Product.Siblings"),
            MemberSpec::Name(name("Product.Siblings"))
        );
    }

    #[test]
    fn depth_macros_carry_the_r_prefix() {
        assert_eq!(
            MemberSpec::parse("Year.RGeneration(2)"),
            MemberSpec::Depth {
                member: name("Year"),
                depth: Depth::Generation(2),
                all_hierarchies: true,
            }
        );
        assert_eq!(
            MemberSpec::parse("Year.Generation(-1)"),
            MemberSpec::Depth {
                member: name("Year"),
                depth: Depth::Level(1),
                all_hierarchies: false,
            }
        );
    }

    #[test]
    fn uda_and_substitution_variables() {
        assert_eq!(
            MemberSpec::parse("&CurrMarket.UDA(\"Major Market\")"),
            MemberSpec::Uda {
                member: MemberRef {
                    name: "CurrMarket".to_string(),
                    substitution: true,
                },
                uda: "Major Market".to_string(),
            }
        );
    }

    #[test]
    fn native_delegation_ignores_quoted_punctuation() {
        assert_eq!(
            MemberSpec::parse("@CHILDREN(\"Market\")"),
            MemberSpec::Native("@CHILDREN(\"Market\")".to_string())
        );
        assert_eq!(
            MemberSpec::parse("Jan:Mar"),
            MemberSpec::Native("Jan:Mar".to_string())
        );
        assert_eq!(
            MemberSpec::parse("\"Sales, Net\""),
            MemberSpec::Name(name("Sales, Net"))
        );
    }

    #[test]
    fn operators_are_parsed_from_prefixes() {
        assert!(matches!(
            SelectionOp::parse("-East.Children"),
            Ok(SelectionOp::Subtract(MemberSpec::Relation { .. }))
        ));
        assert!(matches!(
            SelectionOp::parse(":AND Market.Level0"),
            Ok(SelectionOp::Intersect(MemberSpec::Relation { .. }))
        ));
        assert!(matches!(SelectionOp::parse(":uniq"), Ok(SelectionOp::Uniq)));
        assert!(matches!(
            SelectionOp::parse(":map Parent"),
            Ok(SelectionOp::Map(MapExpr::Relation(Relation::Parent)))
        ));
        assert!(SelectionOp::parse(":bogus x").is_err());
        assert!(SelectionOp::parse("-").is_err());
    }

    #[test]
    fn filter_predicates() {
        assert!(matches!(
            Predicate::parse("level >= 1"),
            Ok(Predicate::Level(CmpOp::Ge, 1))
        ));
        assert!(matches!(
            Predicate::parse("!shared"),
            Ok(Predicate::Flag {
                flag: MemberFlag::Shared,
                negated: true
            })
        ));
        assert!(matches!(
            Predicate::parse("name =~ ^100-"),
            Ok(Predicate::NameMatches(_))
        ));
        assert!(Predicate::parse("name < x").is_err());
        assert!(Predicate::parse("level = x").is_err());
    }
}
