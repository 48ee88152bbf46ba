use log::{debug, trace};
use nalgebra::Vector2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{any::Any, collections::BTreeMap, fmt, marker::PhantomData, path::Path};

use crate::{
    descriptor::{Descriptor, DescriptorElement},
    feature::{Feature, PointFeature, SioPointFeature},
    io,
    metric::{Binary, Scalar, SquaredMetric},
    regions::{FeatureInImage, Regions, RegionsSignature},
    IndexT, RegionsError, Result,
};

/// Regions described only by their features.
///
/// Holds what every container built on the feature type `F` shares, whatever its
/// descriptors look like.
#[derive(Clone, PartialEq, Debug)]
pub struct FeatRegions<F> {
    features: Vec<F>,
}

impl<F> Default for FeatRegions<F> {
    fn default() -> Self {
        Self {
            features: Vec::new(),
        }
    }
}

impl<F: Feature> FeatRegions<F> {
    pub fn new(features: Vec<F>) -> Self {
        Self { features }
    }

    pub fn load_features(&mut self, path: &Path) -> Result<()> {
        io::load_features(path, &mut self.features)
    }

    pub fn save_features(&self, path: &Path) -> Result<()> {
        io::save_features(path, &self.features)
    }

    pub fn positions(&self) -> Vec<PointFeature> {
        self.features
            .iter()
            .map(|f| PointFeature::new(f.x(), f.y()))
            .collect()
    }

    pub fn position(&self, i: usize) -> Vector2<f64> {
        let [x, y] = self.features[i].coords();
        Vector2::new(x as f64, y as f64)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[F] {
        &self.features
    }
}

/// Regions with features of type `F` and descriptors of `L` elements of type `T`,
/// compared with the metric of the encoding `E`.
///
/// `features()[i]` and `descriptors()[i]` always describe the same region.
/// The only exception is after [`Regions::clear_descriptors`], which leaves
/// the features in place.
pub struct FeatDescRegions<F, T, const L: usize, E> {
    feats: FeatRegions<F>,
    descs: Vec<Descriptor<T, L>>,
    encoding: PhantomData<E>,
}

/// Regions with real valued descriptors, compared by squared L2 distance.
pub type ScalarRegions<F, T, const L: usize> = FeatDescRegions<F, T, L, Scalar>;

/// Regions with bit-packed descriptors of `L` bytes, compared by squared Hamming distance.
pub type BinaryRegions<F, const L: usize> = FeatDescRegions<F, u8, L, Binary>;

pub type SiftRegions = ScalarRegions<SioPointFeature, u8, 128>;
pub type SiftFloatRegions = ScalarRegions<SioPointFeature, f32, 128>;
pub type AkazeFloatRegions = ScalarRegions<SioPointFeature, f32, 64>;
pub type AkazeLiopRegions = ScalarRegions<SioPointFeature, u8, 144>;
pub type AkazeBinaryRegions = BinaryRegions<SioPointFeature, 64>;
pub type OrbRegions = BinaryRegions<SioPointFeature, 32>;

impl<F, T, const L: usize, E> Default for FeatDescRegions<F, T, L, E> {
    fn default() -> Self {
        Self {
            feats: FeatRegions {
                features: Vec::new(),
            },
            descs: Vec::new(),
            encoding: PhantomData,
        }
    }
}

impl<F: Clone, T: Copy, const L: usize, E> Clone for FeatDescRegions<F, T, L, E> {
    fn clone(&self) -> Self {
        Self {
            feats: self.feats.clone(),
            descs: self.descs.clone(),
            encoding: PhantomData,
        }
    }
}

impl<F: PartialEq, T: PartialEq, const L: usize, E> PartialEq for FeatDescRegions<F, T, L, E> {
    fn eq(&self, other: &Self) -> bool {
        self.feats == other.feats && self.descs == other.descs
    }
}

impl<F, T, const L: usize, E> fmt::Debug for FeatDescRegions<F, T, L, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatDescRegions")
            .field("Features", &self.feats.features.len())
            .field("Descriptors", &self.descs.len())
            .field("Element", &std::any::type_name::<T>())
            .field("Length", &L)
            .field("Encoding", &std::any::type_name::<E>())
            .finish()
    }
}

/// Typed API
impl<F, T, const L: usize, E> FeatDescRegions<F, T, L, E>
where
    F: Feature,
    T: DescriptorElement,
    E: SquaredMetric<T>,
{
    pub const SIGNATURE: RegionsSignature = RegionsSignature {
        feature: F::KIND,
        element: T::ELEMENT_TYPE,
        length: L,
        kind: E::KIND,
    };

    pub fn new() -> Self {
        Self::default()
    }

    /// Build from parallel feature and descriptor arrays.
    pub fn from_parts(features: Vec<F>, descriptors: Vec<Descriptor<T, L>>) -> Result<Self> {
        if features.len() != descriptors.len() {
            return Err(RegionsError::LengthMismatch {
                features: features.len(),
                descriptors: descriptors.len(),
            });
        }
        Ok(Self {
            feats: FeatRegions::new(features),
            descs: descriptors,
            encoding: PhantomData,
        })
    }

    /// Append one region.
    pub fn push(&mut self, feature: F, descriptor: Descriptor<T, L>) {
        self.feats.features.push(feature);
        self.descs.push(descriptor);
    }

    pub fn features(&self) -> &[F] {
        self.feats.features()
    }

    pub fn descriptors(&self) -> &[Descriptor<T, L>] {
        &self.descs
    }

    /// All descriptor elements as one flat array of `len * L` values.
    pub fn descriptors_flat(&self) -> &[T] {
        Descriptor::slice_as_elements(self.descs.as_slice())
    }

    pub fn feat_regions(&self) -> &FeatRegions<F> {
        &self.feats
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.feats, &mut other.feats);
        std::mem::swap(&mut self.descs, &mut other.descs);
    }

    /// Squared distance between descriptor `i` of `self` and descriptor `j` of `other`.
    #[inline]
    pub fn squared_distance_to(&self, i: usize, other: &Self, j: usize) -> f64 {
        debug_assert!(i < self.descs.len());
        debug_assert!(j < other.descs.len());
        E::squared_distance(&self.descs[i].0, &other.descs[j].0)
    }

    /// Append region `i` to `out`.
    pub fn copy_region_to(&self, i: usize, out: &mut Self) {
        debug_assert!(i < self.feats.len() && i < self.descs.len());
        out.feats.features.push(self.feats.features[i].clone());
        out.descs.push(self.descs[i]);
    }

    /// Typed version of [`Regions::create_filtered_regions`].
    pub fn filtered(
        &self,
        features_in_image: &[FeatureInImage],
        associated_3d_points: &mut Vec<IndexT>,
        full_to_local: &mut BTreeMap<IndexT, IndexT>,
    ) -> Self {
        associated_3d_points.clear();
        full_to_local.clear();

        let mut regions = Self::default();
        regions.feats.features.reserve(features_in_image.len());
        regions.descs.reserve(features_in_image.len());
        associated_3d_points.reserve(features_in_image.len());

        for (local, feat) in features_in_image.iter().enumerate() {
            self.copy_region_to(feat.feature_index as usize, &mut regions);

            // The same feature can be associated to several 3D points.
            // The region is kept for each of them, the map keeps the last one.
            if let Some(previous) = full_to_local.insert(feat.feature_index, local as IndexT) {
                debug!(
                    "Feature {} associated more than once (local {} replaced by {})",
                    feat.feature_index, previous, local
                );
            }
            associated_3d_points.push(feat.point3d_id);
        }
        trace!(
            "Filtered {} regions down to {}",
            self.feats.len(),
            regions.feats.len()
        );
        regions
    }

    /// Load regions from a serialized archive.
    #[cfg(feature = "bincode")]
    pub fn load_archive<P: AsRef<Path>>(file: P) -> Result<Self> {
        let mut file = std::fs::File::open(file)?;
        let mut buffer: Vec<u8> = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut buffer)?;
        let regions: Self = bincode::deserialize(&buffer)?;
        if regions.feats.len() != regions.descs.len() {
            return Err(RegionsError::LengthMismatch {
                features: regions.feats.len(),
                descriptors: regions.descs.len(),
            });
        }
        Ok(regions)
    }

    /// Save regions to a serialized archive.
    #[cfg(feature = "bincode")]
    pub fn save_archive<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let serialized = bincode::serialize(&self)?;
        let mut file = std::fs::File::create(file)?;
        std::io::Write::write_all(&mut file, &serialized)?;
        Ok(())
    }

    fn downcast<'a>(&self, other: &'a dyn Regions) -> Result<&'a Self> {
        other
            .as_any()
            .downcast_ref::<Self>()
            .ok_or_else(|| RegionsError::TypeMismatch {
                expected: self.signature(),
                found: other.signature(),
            })
    }
}

impl<F, T, const L: usize, E> Regions for FeatDescRegions<F, T, L, E>
where
    F: Feature,
    T: DescriptorElement,
    E: SquaredMetric<T>,
{
    fn load(&mut self, features_path: &Path, descriptors_path: &Path) -> Result<()> {
        self.feats.load_features(features_path)?;
        io::load_descriptors(descriptors_path, &mut self.descs)?;
        if self.feats.len() != self.descs.len() {
            return Err(RegionsError::LengthMismatch {
                features: self.feats.len(),
                descriptors: self.descs.len(),
            });
        }
        Ok(())
    }

    fn save(&self, features_path: &Path, descriptors_path: &Path) -> Result<()> {
        self.feats.save_features(features_path)?;
        self.save_descriptors(descriptors_path)
    }

    fn save_descriptors(&self, descriptors_path: &Path) -> Result<()> {
        io::save_descriptors(descriptors_path, &self.descs)
    }

    fn load_features(&mut self, features_path: &Path) -> Result<()> {
        self.feats.load_features(features_path)
    }

    fn signature(&self) -> RegionsSignature {
        Self::SIGNATURE
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn regions_positions(&self) -> Vec<PointFeature> {
        self.feats.positions()
    }

    fn region_position(&self, i: usize) -> Vector2<f64> {
        self.feats.position(i)
    }

    fn region_count(&self) -> usize {
        self.feats.len()
    }

    fn descriptor_count(&self) -> usize {
        self.descs.len()
    }

    fn blind_descriptors(&self) -> &dyn Any {
        &self.descs
    }

    fn features_any(&self) -> &dyn Any {
        &self.feats.features
    }

    fn descriptor_raw_data(&self) -> &[u8] {
        Descriptor::slice_as_bytes(self.descs.as_slice())
    }

    fn clear_descriptors(&mut self) {
        self.descs = Vec::new();
    }

    fn squared_descriptor_distance(&self, i: usize, other: &dyn Regions, j: usize) -> Result<f64> {
        let other = self.downcast(other)?;
        Ok(self.squared_distance_to(i, other, j))
    }

    fn copy_region(&self, i: usize, out: &mut dyn Regions) -> Result<()> {
        let expected = self.signature();
        let found = out.signature();
        let out = out
            .as_any_mut()
            .downcast_mut::<Self>()
            .ok_or(RegionsError::TypeMismatch { expected, found })?;
        self.copy_region_to(i, out);
        Ok(())
    }

    fn empty_clone(&self) -> Box<dyn Regions> {
        Box::new(Self::default())
    }

    fn create_filtered_regions(
        &self,
        features_in_image: &[FeatureInImage],
        associated_3d_points: &mut Vec<IndexT>,
        full_to_local: &mut BTreeMap<IndexT, IndexT>,
    ) -> Box<dyn Regions> {
        Box::new(self.filtered(features_in_image, associated_3d_points, full_to_local))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// Archived as (features, descriptors).
impl<F, T, const L: usize, E> Serialize for FeatDescRegions<F, T, L, E>
where
    F: Feature,
    T: DescriptorElement,
{
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.feats.features, &self.descs).serialize(serializer)
    }
}

impl<'de, F, T, const L: usize, E> Deserialize<'de> for FeatDescRegions<F, T, L, E>
where
    F: Feature,
    T: DescriptorElement,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (features, descs) = <(Vec<F>, Vec<Descriptor<T, L>>)>::deserialize(deserializer)?;
        Ok(Self {
            feats: FeatRegions { features },
            descs,
            encoding: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::RegionKind;
    use approx::assert_relative_eq;

    type Small = ScalarRegions<PointFeature, f32, 2>;
    type SmallBinary = BinaryRegions<PointFeature, 2>;

    fn three_regions() -> Small {
        Small::from_parts(
            vec![
                PointFeature::new(0., 0.),
                PointFeature::new(1., 1.),
                PointFeature::new(2., 2.),
            ],
            vec![
                Descriptor::new([0., 0.]),
                Descriptor::new([3., 4.]),
                Descriptor::new([1., 1.]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn from_parts_rejects_unpaired_arrays() {
        let r = Small::from_parts(vec![PointFeature::new(0., 0.)], vec![]);
        assert!(matches!(
            r,
            Err(RegionsError::LengthMismatch {
                features: 1,
                descriptors: 0
            })
        ));
    }

    #[test]
    fn typed_distance_uses_encoding_metric() {
        let r = three_regions();
        assert_relative_eq!(r.squared_distance_to(0, &r, 1), 25.0);
        assert_relative_eq!(r.squared_distance_to(1, &r, 1), 0.0);

        let mut b = SmallBinary::new();
        b.push(PointFeature::new(0., 0.), Descriptor::new([0xFF, 0x00]));
        b.push(PointFeature::new(1., 0.), Descriptor::new([0x0F, 0x01]));
        assert_eq!(b.squared_distance_to(0, &b, 1), 25.0);
        assert!(b.is_binary() && !b.is_scalar());
        assert_eq!(b.kind(), RegionKind::Binary);
    }

    #[test]
    fn filtered_follows_association_order() {
        let r = three_regions();
        let mut points = vec![7];
        let mut map = BTreeMap::new();
        map.insert(42, 42);
        let f = r.filtered(
            &[FeatureInImage::new(2, 100), FeatureInImage::new(0, 101)],
            &mut points,
            &mut map,
        );
        assert_eq!(points, vec![100, 101]);
        assert_eq!(map.into_iter().collect::<Vec<_>>(), vec![(0, 1), (2, 0)]);
        assert_eq!(f.features(), &[PointFeature::new(2., 2.), PointFeature::new(0., 0.)]);
        assert_eq!(f.descriptors()[0], r.descriptors()[2]);
        assert_eq!(f.descriptors()[1], r.descriptors()[0]);
    }

    #[test]
    fn flat_views_follow_feature_order() {
        let r = three_regions();
        assert_eq!(r.descriptors_flat(), &[0., 0., 3., 4., 1., 1.]);
        assert_eq!(r.descriptor_raw_data().len(), 3 * 2 * 4);
        let blind = r
            .blind_descriptors()
            .downcast_ref::<Vec<Descriptor<f32, 2>>>()
            .unwrap();
        assert_eq!(blind.len(), 3);
    }

    #[test]
    fn swap_exchanges_contents() {
        let mut a = three_regions();
        let mut b = Small::new();
        a.swap(&mut b);
        assert_eq!(a.region_count(), 0);
        assert_eq!(b.region_count(), 3);
        assert_eq!(b.descriptor_count(), 3);
    }

    #[test]
    fn debug_reports_shape() {
        let s = format!("{:?}", three_regions());
        assert!(s.contains("Features: 3"));
        assert!(s.contains("Length: 2"));
    }
}
