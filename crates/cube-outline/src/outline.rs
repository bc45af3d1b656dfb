use crate::builder::DimensionBuilder;
use crate::error::{OutlineError, OutlineResult};
use crate::model::{normalize_name, Dimension, DimensionInfo};
use crate::native::MemberSource;
use std::collections::HashMap;

/// Dimension list of one cube plus lazily built member graphs.
///
/// Graphs are fetched on first access and replaced wholesale by [`Outline::refresh`]; they are
/// never patched in place. An `Outline` belongs to the session it was loaded from.
#[derive(Clone, Debug)]
pub struct Outline {
    cube: String,
    dimensions: Vec<DimensionInfo>,
    graphs: HashMap<String, Dimension>,
}

impl Outline {
    pub fn new(cube: impl Into<String>, dimensions: Vec<DimensionInfo>) -> Self {
        Self {
            cube: cube.into(),
            dimensions,
            graphs: HashMap::new(),
        }
    }

    /// Read the cube's dimension list; member graphs are fetched later, on demand.
    pub fn load(cube: impl Into<String>, source: &dyn MemberSource) -> OutlineResult<Self> {
        Ok(Self::new(cube, source.dimensions()?))
    }

    pub fn cube_name(&self) -> &str {
        &self.cube
    }

    /// Dimensions in outline order.
    pub fn dimension_infos(&self) -> &[DimensionInfo] {
        &self.dimensions
    }

    pub fn info(&self, name: &str) -> Option<&DimensionInfo> {
        self.dimensions
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Non-attribute dimensions in export order: sparse first, then dense, each in outline order.
    pub fn export_order(&self) -> Vec<&DimensionInfo> {
        let regular = self.dimensions.iter().filter(|d| !d.is_attribute());
        let (dense, sparse): (Vec<_>, Vec<_>) = regular.partition(|d| d.is_dense());
        sparse.into_iter().chain(dense).collect()
    }

    pub fn last_dense(&self) -> Option<&DimensionInfo> {
        self.dimensions
            .iter()
            .filter(|d| d.is_dense() && !d.is_attribute())
            .last()
    }

    /// The cached graph, if it has been built.
    pub fn get(&self, name: &str) -> Option<&Dimension> {
        self.graphs.get(&normalize_name(name))
    }

    /// The graph for `name`, building it from `source` on first access.
    pub fn dimension(
        &mut self,
        source: &dyn MemberSource,
        name: &str,
    ) -> OutlineResult<&Dimension> {
        let key = normalize_name(name);
        if !self.graphs.contains_key(&key) {
            let info = self
                .info(name)
                .cloned()
                .ok_or_else(|| OutlineError::UnknownDimension(name.to_string()))?;
            let records = source.traverse_descendants(&info.name)?;
            let dimension = DimensionBuilder::new(info).build(records)?;
            self.graphs.insert(key.clone(), dimension);
        }
        self.get(&key)
            .ok_or_else(|| OutlineError::UnknownDimension(name.to_string()))
    }

    pub fn ensure_loaded<S: AsRef<str>>(
        &mut self,
        source: &dyn MemberSource,
        names: &[S],
    ) -> OutlineResult<()> {
        for name in names {
            self.dimension(source, name.as_ref())?;
        }
        Ok(())
    }

    /// Install an already built graph, replacing any cached one.
    pub fn insert(&mut self, dimension: Dimension) {
        if self.info(dimension.name()).is_none() {
            self.dimensions.push(dimension.info().clone());
        }
        self.graphs
            .insert(normalize_name(dimension.name()), dimension);
    }

    /// Drop the cached graph so the next access rebuilds it.
    pub fn refresh(&mut self, name: &str) {
        self.graphs.remove(&normalize_name(name));
    }

    pub fn refresh_all(&mut self) {
        self.graphs.clear();
    }
}
