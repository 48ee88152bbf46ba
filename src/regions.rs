use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::{any::Any, collections::BTreeMap, fmt, path::Path};

use crate::{
    descriptor::ElementType,
    feature::{FeatureKind, PointFeature, SioPointFeature},
    metric::RegionKind,
    IndexT, Result,
};

/// Link between a feature of an image and the 3D point it observes.
///
/// Ordered by `feature_index`, then by `point3d_id`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FeatureInImage {
    pub feature_index: IndexT,
    pub point3d_id: IndexT,
}

impl FeatureInImage {
    pub fn new(feature_index: IndexT, point3d_id: IndexT) -> Self {
        Self {
            feature_index,
            point3d_id,
        }
    }
}

/// Everything that identifies a concrete region container at runtime.
///
/// Two containers can be compared or copied between only if their signatures are equal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionsSignature {
    pub feature: FeatureKind,
    pub element: ElementType,
    pub length: usize,
    pub kind: RegionKind,
}

impl fmt::Display for RegionsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}x{}/{}",
            self.feature, self.element, self.length, self.kind
        )
    }
}

/// Set of regions (features + descriptors) of one image, with the concrete
/// feature and descriptor types erased.
///
/// Features are stored in one file and descriptors in another. Operations taking
/// another `dyn Regions` check that it has the same concrete type and return
/// [`RegionsError::TypeMismatch`](crate::RegionsError::TypeMismatch) otherwise.
///
/// Containers are meant to be built once, then shared read-only between worker
/// threads. Mutation needs `&mut`, which rules out concurrent reads.
pub trait Regions: Send + Sync + Any {
    //--
    // IO - one file for region features, one file for region descriptors
    //--

    /// Read features and descriptors. On error the container may be partially filled.
    fn load(&mut self, features_path: &Path, descriptors_path: &Path) -> Result<()>;

    fn save(&self, features_path: &Path, descriptors_path: &Path) -> Result<()>;

    fn save_descriptors(&self, descriptors_path: &Path) -> Result<()>;

    /// Read only the features, leaving descriptors untouched.
    fn load_features(&mut self, features_path: &Path) -> Result<()>;

    //--
    // Description of the descriptor [type, length]
    //--

    fn signature(&self) -> RegionsSignature;

    fn kind(&self) -> RegionKind {
        self.signature().kind
    }

    fn is_scalar(&self) -> bool {
        self.kind() == RegionKind::Scalar
    }

    fn is_binary(&self) -> bool {
        self.kind() == RegionKind::Binary
    }

    /// Element type of the descriptors. Stable, usable as a dispatch key.
    fn element_type(&self) -> ElementType {
        self.signature().element
    }

    /// Rust name of the element type, for diagnostics only.
    fn type_name(&self) -> &'static str;

    fn descriptor_length(&self) -> usize {
        self.signature().length
    }

    //--
    // A region can always be represented at least by its 2D position
    //--

    fn regions_positions(&self) -> Vec<PointFeature>;

    fn region_position(&self, i: usize) -> Vector2<f64>;

    /// Number of regions. Still the feature count after `clear_descriptors`.
    fn region_count(&self) -> usize;

    fn descriptor_count(&self) -> usize;

    /// The descriptor vector itself; downcasts to `Vec<Descriptor<T, L>>`.
    fn blind_descriptors(&self) -> &dyn Any;

    /// The feature vector itself; downcasts to `Vec<F>`.
    fn features_any(&self) -> &dyn Any;

    /// All descriptors as one flat, contiguous byte array, in feature order.
    fn descriptor_raw_data(&self) -> &[u8];

    /// Drop the descriptors to reclaim memory. Features are kept.
    fn clear_descriptors(&mut self);

    /// Squared distance between descriptor `i` of `self` and descriptor `j` of `other`,
    /// using the metric of the descriptor encoding: squared L2 for scalar, squared
    /// Hamming for binary.
    fn squared_descriptor_distance(&self, i: usize, other: &dyn Regions, j: usize) -> Result<f64>;

    /// Append region `i` to `out`.
    fn copy_region(&self, i: usize, out: &mut dyn Regions) -> Result<()>;

    /// A new, empty container of the same concrete type.
    fn empty_clone(&self) -> Box<dyn Regions>;

    /// Duplicate only the regions listed in `features_in_image`, in that order.
    ///
    /// `associated_3d_points` receives the point ids in the same order, and
    /// `full_to_local` maps each original feature index to its new index. When a
    /// feature index is listed twice the later entry wins in the map; the region
    /// itself is duplicated.
    fn create_filtered_regions(
        &self,
        features_in_image: &[FeatureInImage],
        associated_3d_points: &mut Vec<IndexT>,
        full_to_local: &mut BTreeMap<IndexT, IndexT>,
    ) -> Box<dyn Regions>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Regions {
    pub fn downcast_ref<R: Regions>(&self) -> Option<&R> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<R: Regions>(&mut self) -> Option<&mut R> {
        self.as_any_mut().downcast_mut()
    }
}

impl fmt::Debug for dyn Regions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Regions")
            .field("signature", &self.signature().to_string())
            .field("regions", &self.region_count())
            .field("descriptors", &self.descriptor_count())
            .finish()
    }
}

/// Scale invariant features of `regions`, or an empty slice if it holds another feature type.
pub fn sio_point_features(regions: &dyn Regions) -> &[SioPointFeature] {
    regions
        .features_any()
        .downcast_ref::<Vec<SioPointFeature>>()
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
