use log::{debug, warn};
use std::{
    collections::{btree_map, BTreeMap},
    path::Path,
};

use crate::{
    factory::RegionsType,
    regions::{Regions, RegionsSignature},
    IndexT, RegionsError, Result,
};

/// Regions of every view of a scene, keyed by view id.
///
/// Pairwise matching is only meaningful between containers of the same type, so
/// check [`RegionsPerView::signature`] before comparing views.
#[derive(Debug, Default)]
pub struct RegionsPerView {
    regions: BTreeMap<IndexT, Box<dyn Regions>>,
}

impl RegionsPerView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the regions of a view, returning the ones it replaces.
    pub fn insert(&mut self, view_id: IndexT, regions: Box<dyn Regions>) -> Option<Box<dyn Regions>> {
        self.regions.insert(view_id, regions)
    }

    pub fn get(&self, view_id: IndexT) -> Option<&dyn Regions> {
        self.regions.get(&view_id).map(|r| &**r)
    }

    pub fn get_mut(&mut self, view_id: IndexT) -> Option<&mut (dyn Regions + 'static)> {
        self.regions.get_mut(&view_id).map(|r| &mut **r)
    }

    pub fn remove(&mut self, view_id: IndexT) -> Option<Box<dyn Regions>> {
        self.regions.remove(&view_id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn view_ids(&self) -> impl Iterator<Item = IndexT> + '_ {
        self.regions.keys().copied()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, IndexT, Box<dyn Regions>> {
        self.regions.iter()
    }

    /// The signature shared by all views, or `None` when there are no views.
    pub fn signature(&self) -> Result<Option<RegionsSignature>> {
        let mut signatures = self.regions.values().map(|r| r.signature());
        let first = match signatures.next() {
            Some(s) => s,
            None => return Ok(None),
        };
        if signatures.any(|s| s != first) {
            return Err(RegionsError::Heterogeneous);
        }
        Ok(Some(first))
    }

    /// Load `<id>.feat` / `<id>.desc` from `dir` for every view in `view_ids`.
    ///
    /// Stops at the first view that cannot be loaded.
    pub fn load_all<I>(regions_type: RegionsType, dir: &Path, view_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = IndexT>,
    {
        let mut per_view = Self::new();
        for id in view_ids {
            let mut regions = regions_type.create();
            let feats = dir.join(format!("{}.feat", id));
            let descs = dir.join(format!("{}.desc", id));
            if let Err(e) = regions.load(&feats, &descs) {
                warn!("Invalid regions for view {}: {}", id, e);
                return Err(e);
            }
            per_view.insert(id, regions);
        }
        debug!(
            "Loaded {} regions for {} views",
            regions_type,
            per_view.len()
        );
        Ok(per_view)
    }

    /// Save every view as `<id>.feat` / `<id>.desc` in `dir`.
    pub fn save_all(&self, dir: &Path) -> Result<()> {
        for (id, regions) in self.iter() {
            regions.save(
                &dir.join(format!("{}.feat", id)),
                &dir.join(format!("{}.desc", id)),
            )?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a RegionsPerView {
    type Item = (&'a IndexT, &'a Box<dyn Regions>);
    type IntoIter = btree_map::Iter<'a, IndexT, Box<dyn Regions>>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}
