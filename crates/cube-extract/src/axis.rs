use crate::config::ExtractOptions;
use crate::error::{ExtractError, ExtractResult};
use crate::spec::{AxisSpec, DimensionSelection, ExtractSpec, FlatSpec};
use cube_outline::{ExpandOptions, MemberExpander, MemberId, MemberSource, Outline};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Fixed single-member context (the MDX slicer).
    Pov,
    Pages,
    Rows,
    Columns,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::Pov, Axis::Pages, Axis::Rows, Axis::Columns];

    pub fn name(self) -> &'static str {
        match self {
            Axis::Pov => "pov",
            Axis::Pages => "pages",
            Axis::Rows => "rows",
            Axis::Columns => "columns",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dimension names per axis, each in query order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisAssignment {
    pub pov: Vec<String>,
    pub pages: Vec<String>,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
}

impl AxisAssignment {
    pub fn axis(&self, axis: Axis) -> &[String] {
        match axis {
            Axis::Pov => &self.pov,
            Axis::Pages => &self.pages,
            Axis::Rows => &self.rows,
            Axis::Columns => &self.columns,
        }
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut Vec<String> {
        match axis {
            Axis::Pov => &mut self.pov,
            Axis::Pages => &mut self.pages,
            Axis::Rows => &mut self.rows,
            Axis::Columns => &mut self.columns,
        }
    }

    /// Every assigned dimension with its axis, pov first.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &str)> + '_ {
        Axis::ALL
            .into_iter()
            .flat_map(move |axis| self.axis(axis).iter().map(move |d| (axis, d.as_str())))
    }

    pub fn axis_of(&self, dimension: &str) -> Option<Axis> {
        self.iter()
            .find(|(_, d)| d.eq_ignore_ascii_case(dimension))
            .map(|(axis, _)| axis)
    }
}

/// Axis placement plus the selection strings of every placed dimension, before expansion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AxisPlan {
    pub assignment: AxisAssignment,
    pub selections: Vec<DimensionSelection>,
}

/// Places the dimensions of an [`ExtractSpec`] on query axes.
#[derive(Clone, Copy, Debug)]
pub struct AxisAssigner<'a> {
    outline: &'a Outline,
}

impl<'a> AxisAssigner<'a> {
    pub fn new(outline: &'a Outline) -> Self {
        Self { outline }
    }

    pub fn assign(&self, spec: &ExtractSpec, options: &ExtractOptions) -> ExtractResult<AxisPlan> {
        match spec {
            ExtractSpec::Axes(axes) => self.assign_axes(axes),
            ExtractSpec::Flat(flat) => self.assign_flat(flat, options),
        }
    }

    fn canonical(&self, axis: Axis, dimension: &str) -> ExtractResult<String> {
        self.outline
            .info(dimension)
            .map(|info| info.name.clone())
            .ok_or_else(|| ExtractError::UnknownDimension {
                axis,
                dimension: dimension.to_string(),
            })
    }

    fn assign_axes(&self, spec: &AxisSpec) -> ExtractResult<AxisPlan> {
        if spec.columns.is_empty() {
            return Err(ExtractError::NoColumnDimension);
        }

        let mut plan = AxisPlan::default();
        let mut seen: HashMap<String, Axis> = HashMap::new();
        for axis in Axis::ALL {
            let selections = match axis {
                Axis::Pov => &spec.pov,
                Axis::Pages => &spec.pages,
                Axis::Rows => &spec.rows,
                Axis::Columns => &spec.columns,
            };
            for selection in selections {
                let name = self.canonical(axis, &selection.dimension)?;
                if let Some(first) = seen.insert(name.to_ascii_uppercase(), axis) {
                    return Err(ExtractError::DuplicateDimension {
                        dimension: name,
                        first,
                        second: axis,
                    });
                }
                plan.assignment.axis_mut(axis).push(name.clone());
                plan.selections
                    .push(DimensionSelection::new(name, selection.members.iter().cloned()));
            }
        }
        Ok(plan)
    }

    fn assign_flat(&self, spec: &FlatSpec, options: &ExtractOptions) -> ExtractResult<AxisPlan> {
        let column = match spec
            .column_dimension
            .as_deref()
            .or(options.column_dimension.as_deref())
        {
            Some(name) => self.canonical(Axis::Columns, name)?,
            None => self
                .outline
                .last_dense()
                .map(|info| info.name.clone())
                .ok_or(ExtractError::NoColumnDimension)?,
        };

        let mut explicit: HashMap<String, &DimensionSelection> = HashMap::new();
        let mut explicit_order = Vec::new();
        for selection in &spec.members {
            let axis = if selection.dimension.eq_ignore_ascii_case(&column) {
                Axis::Columns
            } else {
                Axis::Rows
            };
            let name = self.canonical(axis, &selection.dimension)?;
            if explicit.insert(name.to_ascii_uppercase(), selection).is_some() {
                return Err(ExtractError::DuplicateDimension {
                    dimension: name,
                    first: axis,
                    second: axis,
                });
            }
            explicit_order.push(name);
        }

        let mut rows: Vec<String> = self
            .outline
            .export_order()
            .into_iter()
            .map(|info| info.name.clone())
            .filter(|name| !name.eq_ignore_ascii_case(&column))
            .collect();
        // Attribute dimensions only take part when asked for.
        for name in explicit_order {
            if !name.eq_ignore_ascii_case(&column) && !rows.contains(&name) {
                rows.push(name);
            }
        }

        let mut plan = AxisPlan::default();
        for name in rows.iter().chain(std::iter::once(&column)) {
            let members = match explicit.get(&name.to_ascii_uppercase()) {
                Some(selection) => selection.members.clone(),
                None => vec![format!("\"{name}\".Level0")],
            };
            plan.selections
                .push(DimensionSelection::new(name.clone(), members));
        }
        plan.assignment.rows = rows;
        plan.assignment.columns = vec![column];
        Ok(plan)
    }
}

/// Axis placement with every selection expanded to members.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedExtract {
    pub axes: AxisAssignment,
    members: Vec<(String, Vec<MemberId>)>,
}

impl ResolvedExtract {
    /// Expand every selection of `plan`, building member graphs on demand.
    ///
    /// A pov dimension whose selection expands to more than one member cannot sit in the slicer,
    /// so it moves to the end of the page axis.
    pub fn resolve(
        outline: &mut Outline,
        source: &dyn MemberSource,
        plan: AxisPlan,
    ) -> ExtractResult<Self> {
        let mut members = Vec::with_capacity(plan.selections.len());
        for selection in &plan.selections {
            let dimension = outline.dimension(source, &selection.dimension)?;
            let ids = MemberExpander::with_source(dimension, source)
                .expand(selection.members.as_slice(), &ExpandOptions::default())?;
            log::debug!(
                "{} selection {:?} expanded to {} members",
                selection.dimension,
                selection.members,
                ids.len()
            );
            members.push((selection.dimension.clone(), ids));
        }

        let mut resolved = Self {
            axes: plan.assignment,
            members,
        };
        let (pov, moved): (Vec<String>, Vec<String>) = std::mem::take(&mut resolved.axes.pov)
            .into_iter()
            .partition(|name| resolved.members(name).len() <= 1);
        for name in &moved {
            log::debug!("pov dimension {name} has several members; placing it on the page axis");
        }
        resolved.axes.pov = pov;
        resolved.axes.pages.extend(moved);
        Ok(resolved)
    }

    /// Expanded members of `dimension`; empty when it is not part of the extract.
    pub fn members(&self, dimension: &str) -> &[MemberId] {
        self.members
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(dimension))
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the members of one dimension; used to cut partition chunks.
    pub(crate) fn with_members(&self, dimension: &str, ids: Vec<MemberId>) -> Self {
        let mut chunk = self.clone();
        if let Some(entry) = chunk
            .members
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(dimension))
        {
            entry.1 = ids;
        }
        chunk
    }
}
