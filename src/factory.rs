use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    regions::{Regions, RegionsSignature},
    typed::*,
    RegionsError,
};

/// The standard region containers.
///
/// Use this tag, not [`Regions::type_name`], whenever the container type has to be
/// recorded on disk or sent to another process.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionsType {
    /// SIFT, 128 `u8`.
    Sift,
    /// SIFT, 128 `f32`.
    SiftFloat,
    /// AKAZE with MSURF descriptor, 64 `f32`.
    AkazeFloat,
    /// AKAZE with LIOP descriptor, 144 `u8`.
    AkazeLiop,
    /// AKAZE with MLDB binary descriptor, 64 bytes.
    AkazeMldb,
    /// ORB, 32 bytes.
    Orb,
}

impl RegionsType {
    pub const ALL: [RegionsType; 6] = [
        RegionsType::Sift,
        RegionsType::SiftFloat,
        RegionsType::AkazeFloat,
        RegionsType::AkazeLiop,
        RegionsType::AkazeMldb,
        RegionsType::Orb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionsType::Sift => "SIFT",
            RegionsType::SiftFloat => "SIFT_FLOAT",
            RegionsType::AkazeFloat => "AKAZE_FLOAT",
            RegionsType::AkazeLiop => "AKAZE_LIOP",
            RegionsType::AkazeMldb => "AKAZE_MLDB",
            RegionsType::Orb => "ORB",
        }
    }

    /// A new, empty container of this type.
    pub fn create(&self) -> Box<dyn Regions> {
        match self {
            RegionsType::Sift => Box::new(SiftRegions::new()),
            RegionsType::SiftFloat => Box::new(SiftFloatRegions::new()),
            RegionsType::AkazeFloat => Box::new(AkazeFloatRegions::new()),
            RegionsType::AkazeLiop => Box::new(AkazeLiopRegions::new()),
            RegionsType::AkazeMldb => Box::new(AkazeBinaryRegions::new()),
            RegionsType::Orb => Box::new(OrbRegions::new()),
        }
    }

    pub fn signature(&self) -> RegionsSignature {
        match self {
            RegionsType::Sift => SiftRegions::SIGNATURE,
            RegionsType::SiftFloat => SiftFloatRegions::SIGNATURE,
            RegionsType::AkazeFloat => AkazeFloatRegions::SIGNATURE,
            RegionsType::AkazeLiop => AkazeLiopRegions::SIGNATURE,
            RegionsType::AkazeMldb => AkazeBinaryRegions::SIGNATURE,
            RegionsType::Orb => OrbRegions::SIGNATURE,
        }
    }

    /// The standard type whose containers have `signature`, if any.
    pub fn from_signature(signature: &RegionsSignature) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.signature() == *signature)
    }
}

impl fmt::Display for RegionsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionsType {
    type Err = RegionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RegionsError::UnknownRegionsType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{descriptor::ElementType, metric::RegionKind};

    #[test]
    fn tags_round_trip() {
        for t in RegionsType::ALL.iter() {
            assert_eq!(t.as_str().parse::<RegionsType>().unwrap(), *t);
        }
        assert!(matches!(
            "SURF".parse::<RegionsType>(),
            Err(RegionsError::UnknownRegionsType(_))
        ));
    }

    #[test]
    fn created_containers_are_empty_and_typed() {
        for t in RegionsType::ALL.iter() {
            let r = t.create();
            assert_eq!(r.region_count(), 0);
            assert_eq!(r.signature(), t.signature());
            assert_eq!(RegionsType::from_signature(&r.signature()), Some(*t));
        }
        let sift = RegionsType::Sift.signature();
        assert_eq!(sift.element, ElementType::U8);
        assert_eq!(sift.length, 128);
        assert_eq!(sift.kind, RegionKind::Scalar);
        assert!(RegionsType::Orb.create().is_binary());
    }

    #[test]
    fn signatures_are_distinct_per_type() {
        for (n, a) in RegionsType::ALL.iter().enumerate() {
            for b in &RegionsType::ALL[n + 1..] {
                assert_ne!(a.signature(), b.signature());
            }
        }
        let orb = RegionsType::Orb.signature();
        assert_eq!(orb.to_string(), "sio_point/u8x32/binary");
    }
}
