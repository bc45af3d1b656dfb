use crate::error::{OutlineError, OutlineResult};
use crate::model::{normalize_name, Dimension, DimensionInfo, Member, MemberId};
use crate::native::MemberRecord;
use std::collections::{BTreeMap, HashMap};

/// Builds a [`Dimension`] from a flat traversal stream.
///
/// Traversal order does not guarantee that parents precede their children, so the build runs in two
/// passes: the first creates every member, the second resolves parent and shared-member links once
/// the whole node set is known.
#[derive(Clone, Debug)]
pub struct DimensionBuilder {
    info: DimensionInfo,
}

impl DimensionBuilder {
    pub fn new(info: DimensionInfo) -> Self {
        Self { info }
    }

    pub fn build(self, records: impl IntoIterator<Item = MemberRecord>) -> OutlineResult<Dimension> {
        let dimension = self.info.name.clone();

        let mut members: Vec<Member> = Vec::new();
        let mut parents: Vec<Option<String>> = Vec::new();
        let mut by_name: HashMap<String, MemberId> = HashMap::new();
        let mut shared: Vec<MemberId> = Vec::new();

        for record in records {
            let id = MemberId(members.len());
            if record.share_option.is_shared() {
                shared.push(id);
            } else if by_name.insert(normalize_name(&record.name), id).is_some() {
                return Err(OutlineError::corrupt(
                    &dimension,
                    format!("member {} appears more than once", record.name),
                ));
            }
            parents.push(record.parent);
            members.push(Member {
                id,
                name: record.name,
                unique_name: record.unique_name,
                aliases: record.aliases,
                share_option: record.share_option,
                consolidation: record.consolidation,
                generation: record.generation,
                level: record.level,
                formula: record.formula.filter(|f| !f.trim().is_empty()),
                udas: record.udas,
                parent: None,
                children: Vec::new(),
                primary: None,
                shared_instances: Vec::new(),
            });
        }

        for id in &shared {
            let name = &members[id.0].name;
            let primary = *by_name.get(&normalize_name(name)).ok_or_else(|| {
                OutlineError::corrupt(
                    &dimension,
                    format!("shared member {name} has no stored counterpart"),
                )
            })?;
            members[id.0].primary = Some(primary);
            members[primary.0].shared_instances.push(*id);
        }

        for (idx, parent) in parents.iter().enumerate() {
            let Some(parent) = parent else {
                continue;
            };
            let parent_id = *by_name.get(&normalize_name(parent)).ok_or_else(|| {
                OutlineError::corrupt(
                    &dimension,
                    format!("parent {parent} of {} was not returned", members[idx].name),
                )
            })?;
            members[idx].parent = Some(parent_id);
            members[parent_id.0].children.push(MemberId(idx));
        }

        let root = *by_name
            .get(&normalize_name(&dimension))
            .ok_or_else(|| OutlineError::corrupt(&dimension, "traversal returned no root member"))?;

        let mut by_alias: BTreeMap<String, HashMap<String, MemberId>> = BTreeMap::new();
        for member in members.iter().filter(|m| !m.is_shared()) {
            for (table, alias) in &member.aliases {
                by_alias
                    .entry(table.clone())
                    .or_default()
                    .entry(normalize_name(alias))
                    .or_insert(member.id);
            }
        }

        log::debug!(
            "built dimension {dimension}: {} members, {} shared",
            members.len(),
            shared.len()
        );

        Ok(Dimension {
            info: self.info,
            members,
            root,
            by_name,
            by_alias,
        })
    }
}
