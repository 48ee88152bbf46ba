use thiserror::Error;

/// Feature geometry stored alongside descriptors (positions, scale, orientation).
pub mod feature;
pub use feature::{Feature, FeatureKind, PointFeature, SioPointFeature};

/// Fixed-length descriptors and their element types.
pub mod descriptor;
pub use descriptor::{BinaryElement, Descriptor, DescriptorElement, ElementType};

/// Compile-time selection of the distance used for each descriptor encoding.
pub mod metric;
pub use metric::{Binary, Encoding, RegionKind, Scalar, SquaredMetric};

/// The type-erased region interface every container implements.
pub mod regions;
pub use regions::{sio_point_features, FeatureInImage, Regions, RegionsSignature};

/// Containers with full static knowledge of feature and descriptor types.
pub mod typed;
pub use typed::*;

/// Stable tags for the standard region containers.
pub mod factory;
pub use factory::RegionsType;

/// Region containers grouped by view.
pub mod per_view;
pub use per_view::RegionsPerView;

/// Feature text files and descriptor binary files.
pub mod io;

/// Index type shared with the reconstruction stage (view ids, feature ids, 3D point ids).
pub type IndexT = u32;

pub type Result<T> = std::result::Result<T, RegionsError>;

#[derive(Error, Debug)]
pub enum RegionsError {
    #[error("Io Error")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "bincode")]
    #[error("Regions Archive Error")]
    Archive(#[from] bincode::Error),
    #[error("Malformed feature record at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Descriptor file truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("Descriptor file has {0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("{features} features but {descriptors} descriptors")]
    LengthMismatch { features: usize, descriptors: usize },
    #[error("Regions type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: RegionsSignature,
        found: RegionsSignature,
    },
    #[error("Views hold regions of different types")]
    Heterogeneous,
    #[error("Unknown regions type {0:?}")]
    UnknownRegionsType(String),
}
