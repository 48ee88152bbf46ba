use serde::{Deserialize, Serialize};
use std::fmt;

use crate::descriptor::{BinaryElement, DescriptorElement};

/// How descriptor elements are encoded, and therefore how they are compared.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Bit-packed elements, compared by squared Hamming distance.
    Binary,
    /// Real valued elements, compared by squared Euclidean distance.
    Scalar,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionKind::Binary => f.write_str("binary"),
            RegionKind::Scalar => f.write_str("scalar"),
        }
    }
}

/// Type level marker for a descriptor encoding.
pub trait Encoding: Send + Sync + 'static {
    const KIND: RegionKind;
}

/// The distance a container uses for its own element type.
///
/// Implemented once per encoding, so the metric of a container is fixed by its
/// type and resolved at compile time.
pub trait SquaredMetric<T>: Encoding {
    fn squared_distance(a: &[T], b: &[T]) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Binary;

impl Encoding for Scalar {
    const KIND: RegionKind = RegionKind::Scalar;
}

impl Encoding for Binary {
    const KIND: RegionKind = RegionKind::Binary;
}

impl<T: DescriptorElement> SquaredMetric<T> for Scalar {
    /// Squared L2 distance, accumulated in f64.
    #[inline]
    fn squared_distance(a: &[T], b: &[T]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .fold(0., |acc, (&x, &y)| {
                let d = x.to_f64() - y.to_f64();
                acc + d * d
            })
    }
}

impl<T: BinaryElement> SquaredMetric<T> for Binary {
    /// Squared Hamming distance, on the same scale as the scalar squared L2.
    #[inline]
    fn squared_distance(a: &[T], b: &[T]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let h = a
            .iter()
            .zip(b)
            .fold(0u64, |acc, (&x, &y)| acc + x.xor_count_ones(y) as u64);
        (h * h) as f64
    }
}
