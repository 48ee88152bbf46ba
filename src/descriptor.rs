use bytemuck::{Pod, TransparentWrapper};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Numeric type a descriptor is made of.
pub trait DescriptorElement:
    Pod + Default + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync
{
    const ELEMENT_TYPE: ElementType;

    fn to_f64(self) -> f64;
}

/// Element types that can hold packed bits, and so be compared by Hamming distance.
pub trait BinaryElement: DescriptorElement {
    /// Number of differing bits between `self` and `other`.
    fn xor_count_ones(self, other: Self) -> u32;
}

/// Stable tag of a descriptor element type.
///
/// Unlike `std::any::type_name`, the string form is fixed and may be written to disk.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        }
    }

    /// Size in bytes of one element.
    pub fn size_of(&self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::U16 => 2,
            ElementType::U32 | ElementType::F32 => 4,
            ElementType::U64 | ElementType::F64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! impl_element {
    ($t:ty, $tag:ident) => {
        impl DescriptorElement for $t {
            const ELEMENT_TYPE: ElementType = ElementType::$tag;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

macro_rules! impl_binary_element {
    ($t:ty, $tag:ident) => {
        impl_element!($t, $tag);

        impl BinaryElement for $t {
            #[inline]
            fn xor_count_ones(self, other: Self) -> u32 {
                (self ^ other).count_ones()
            }
        }
    };
}

impl_binary_element!(u8, U8);
impl_binary_element!(u16, U16);
impl_binary_element!(u32, U32);
impl_binary_element!(u64, U64);
impl_element!(f32, F32);
impl_element!(f64, F64);

/// Fixed-length descriptor of `L` elements of type `T`.
///
/// Laid out exactly as `[T; L]`, so a `Vec<Descriptor<T, L>>` is one flat,
/// contiguous array of `len * L` elements.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, TransparentWrapper)]
pub struct Descriptor<T, const L: usize>(pub [T; L]);

impl<T: DescriptorElement, const L: usize> Descriptor<T, L> {
    pub const LENGTH: usize = L;

    pub fn new(data: [T; L]) -> Self {
        Self(data)
    }

    pub fn data(&self) -> &[T] {
        &self.0
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.0
    }

    /// Elements of `descriptors`, back to back.
    pub fn slice_as_elements(descriptors: &[Self]) -> &[T] {
        bytemuck::cast_slice(Self::peel_slice(descriptors))
    }

    /// Raw bytes of `descriptors`, in native element layout.
    pub fn slice_as_bytes(descriptors: &[Self]) -> &[u8] {
        bytemuck::cast_slice(Self::peel_slice(descriptors))
    }

    pub fn slice_as_bytes_mut(descriptors: &mut [Self]) -> &mut [u8] {
        bytemuck::cast_slice_mut(Self::peel_slice_mut(descriptors))
    }
}

impl<T: DescriptorElement, const L: usize> Default for Descriptor<T, L> {
    fn default() -> Self {
        Self([T::default(); L])
    }
}

impl<T: DescriptorElement, const L: usize> From<[T; L]> for Descriptor<T, L> {
    fn from(data: [T; L]) -> Self {
        Self(data)
    }
}

impl<T: fmt::Debug, const L: usize> fmt::Debug for Descriptor<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Descriptor").field(&self.0.as_slice()).finish()
    }
}

// Serde only derives arrays up to 32 elements, so go through a sequence.
impl<T: DescriptorElement, const L: usize> Serialize for Descriptor<T, L> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_slice().serialize(serializer)
    }
}

impl<'de, T: DescriptorElement, const L: usize> Deserialize<'de> for Descriptor<T, L> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = Vec::<T>::deserialize(deserializer)?;
        let len = data.len();
        let data: [T; L] = data.try_into().map_err(|_| {
            <D::Error as serde::de::Error>::invalid_length(
                len,
                &format!("a descriptor of {} elements", L).as_str(),
            )
        })?;
        Ok(Self(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_are_flat() {
        let descs = vec![
            Descriptor::<u16, 3>::new([1, 2, 3]),
            Descriptor::new([4, 5, 6]),
        ];
        let flat = Descriptor::slice_as_elements(&descs[..]);
        assert_eq!(flat, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(Descriptor::slice_as_bytes(&descs[..]).len(), 12);
    }

    #[test]
    fn bytes_write_through_to_descriptors() {
        let mut descs = vec![Descriptor::<u8, 2>::default(); 2];
        Descriptor::slice_as_bytes_mut(&mut descs[..]).copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(descs[0], Descriptor::new([1, 2]));
        assert_eq!(descs[1], Descriptor::new([3, 4]));
        assert_eq!(Descriptor::<f32, 4>::slice_as_bytes(&[]).len(), 0);
    }

    #[test]
    fn default_descriptor_is_zero() {
        let d = Descriptor::<f32, 64>::default();
        assert!(d.data().iter().all(|&v| v == 0.0));
        assert_eq!(Descriptor::<f32, 64>::LENGTH, 64);
    }

    #[test]
    fn binary_elements_count_differing_bits() {
        assert_eq!(0b1010_1010u8.xor_count_ones(0b0101_0101), 8);
        assert_eq!(0xFFFFu16.xor_count_ones(0xFFFE), 1);
        assert_eq!(7u64.xor_count_ones(7), 0);
    }

    #[test]
    fn element_tags_are_stable() {
        assert_eq!(u8::ELEMENT_TYPE.as_str(), "u8");
        assert_eq!(f32::ELEMENT_TYPE.to_string(), "f32");
        assert_eq!(ElementType::F64.size_of(), std::mem::size_of::<f64>());
    }
}
