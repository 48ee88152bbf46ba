use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Geometry of a detected feature. Every feature has at least a 2D position.
///
/// Features are written to and read from text files one record per line, so the
/// `Display` / `FromStr` pair must round trip.
pub trait Feature:
    Clone
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = String>
    + PartialEq
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: FeatureKind;

    fn x(&self) -> f32;
    fn y(&self) -> f32;

    fn coords(&self) -> [f32; 2] {
        [self.x(), self.y()]
    }
}

/// Runtime tag of a feature geometry type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Point,
    ScaleInvariantOriented,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Point => f.write_str("point"),
            FeatureKind::ScaleInvariantOriented => f.write_str("sio_point"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
/// A plain 2D image point.
pub struct PointFeature {
    pub x: f32,
    pub y: f32,
}

impl PointFeature {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
/// A scale invariant, oriented point (SIFT, AKAZE, ORB keypoints).
pub struct SioPointFeature {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    /// Radians.
    pub orientation: f32,
}

impl SioPointFeature {
    pub fn new(x: f32, y: f32, scale: f32, orientation: f32) -> Self {
        Self {
            x,
            y,
            scale,
            orientation,
        }
    }
}

impl Feature for PointFeature {
    const KIND: FeatureKind = FeatureKind::Point;

    fn x(&self) -> f32 {
        self.x
    }
    fn y(&self) -> f32 {
        self.y
    }
}

impl Feature for SioPointFeature {
    const KIND: FeatureKind = FeatureKind::ScaleInvariantOriented;

    fn x(&self) -> f32 {
        self.x
    }
    fn y(&self) -> f32 {
        self.y
    }
}

impl From<&SioPointFeature> for PointFeature {
    fn from(f: &SioPointFeature) -> Self {
        Self::new(f.x, f.y)
    }
}

impl fmt::Display for PointFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

impl fmt::Display for SioPointFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.x, self.y, self.scale, self.orientation
        )
    }
}

/// Parse exactly `N` whitespace separated floats.
fn parse_fields<const N: usize>(s: &str) -> Result<[f32; N], String> {
    let mut fields = [0f32; N];
    let mut tokens = s.split_whitespace();
    for (i, field) in fields.iter_mut().enumerate() {
        let token = tokens
            .next()
            .ok_or_else(|| format!("expected {} fields, found {}", N, i))?;
        *field = token
            .parse()
            .map_err(|e| format!("field {} ({:?}): {}", i, token, e))?;
    }
    if tokens.next().is_some() {
        return Err(format!("expected {} fields, found more", N));
    }
    Ok(fields)
}

impl FromStr for PointFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y] = parse_fields::<2>(s)?;
        Ok(Self::new(x, y))
    }
}

impl FromStr for SioPointFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y, scale, orientation] = parse_fields::<4>(s)?;
        Ok(Self::new(x, y, scale, orientation))
    }
}
