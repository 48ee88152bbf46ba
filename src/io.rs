//! On-disk formats of region containers.
//!
//! Features are stored as text, one record per line (see [`Feature`]). Descriptors
//! are stored as a little-endian `u64` count followed by the flat array of
//! `count * L` elements, exactly as they lie in memory.

use log::{debug, warn};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    mem::size_of,
    path::Path,
};

use crate::{
    descriptor::{Descriptor, DescriptorElement},
    feature::Feature,
    RegionsError, Result,
};

const COUNT_BYTES: usize = size_of::<u64>();

/// Read feature records, replacing the content of `features`.
pub fn read_features<F: Feature, R: BufRead>(reader: R, features: &mut Vec<F>) -> Result<()> {
    features.clear();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let record = line.trim();
        if record.is_empty() {
            continue;
        }
        let feature = record.parse::<F>().map_err(|message| RegionsError::Parse {
            line: n + 1,
            message,
        })?;
        features.push(feature);
    }
    Ok(())
}

pub fn write_features<F: Feature, W: Write>(mut writer: W, features: &[F]) -> Result<()> {
    for f in features {
        writeln!(writer, "{}", f)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_features<F: Feature>(path: &Path, features: &mut Vec<F>) -> Result<()> {
    let file = File::open(path)?;
    read_features(BufReader::new(file), features)?;
    debug!("Loaded {} features from {:?}", features.len(), path);
    Ok(())
}

pub fn save_features<F: Feature>(path: &Path, features: &[F]) -> Result<()> {
    let file = File::create(path)?;
    write_features(BufWriter::new(file), features)?;
    debug!("Saved {} features to {:?}", features.len(), path);
    Ok(())
}

/// Read a descriptor array, replacing the content of `descriptors`.
pub fn read_descriptors<T, R, const L: usize>(
    mut reader: R,
    descriptors: &mut Vec<Descriptor<T, L>>,
) -> Result<()>
where
    T: DescriptorElement,
    R: Read,
{
    let mut bytes: Vec<u8> = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.len() < COUNT_BYTES {
        return Err(RegionsError::Truncated {
            expected: COUNT_BYTES,
            found: bytes.len(),
        });
    }
    let (count_bytes, payload) = bytes.split_at(COUNT_BYTES);
    let mut count_le = [0u8; COUNT_BYTES];
    count_le.copy_from_slice(count_bytes);
    let count = u64::from_le_bytes(count_le);

    let expected = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(size_of::<Descriptor<T, L>>()))
        .unwrap_or(usize::MAX);
    if payload.len() < expected {
        return Err(RegionsError::Truncated {
            expected,
            found: payload.len(),
        });
    }
    if payload.len() > expected {
        return Err(RegionsError::TrailingBytes(payload.len() - expected));
    }

    descriptors.clear();
    descriptors.resize(count as usize, Descriptor::default());
    Descriptor::slice_as_bytes_mut(descriptors.as_mut_slice()).copy_from_slice(payload);
    Ok(())
}

pub fn write_descriptors<T, W, const L: usize>(
    mut writer: W,
    descriptors: &[Descriptor<T, L>],
) -> Result<()>
where
    T: DescriptorElement,
    W: Write,
{
    writer.write_all(&(descriptors.len() as u64).to_le_bytes())?;
    writer.write_all(Descriptor::slice_as_bytes(descriptors))?;
    writer.flush()?;
    Ok(())
}

pub fn load_descriptors<T: DescriptorElement, const L: usize>(
    path: &Path,
    descriptors: &mut Vec<Descriptor<T, L>>,
) -> Result<()> {
    let file = File::open(path)?;
    read_descriptors(BufReader::new(file), descriptors).map_err(|e| {
        warn!("Cannot read descriptors from {:?}: {}", path, e);
        e
    })?;
    debug!("Loaded {} descriptors from {:?}", descriptors.len(), path);
    Ok(())
}

pub fn save_descriptors<T: DescriptorElement, const L: usize>(
    path: &Path,
    descriptors: &[Descriptor<T, L>],
) -> Result<()> {
    let file = File::create(path)?;
    write_descriptors(BufWriter::new(file), descriptors)?;
    debug!("Saved {} descriptors to {:?}", descriptors.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{PointFeature, SioPointFeature};
    use std::io::Cursor;

    #[test]
    fn feature_text_skips_blank_lines() {
        let text = "1 2\n\n  3.5 4.5  \n";
        let mut feats: Vec<PointFeature> = vec![PointFeature::new(9., 9.)];
        read_features(Cursor::new(text), &mut feats).unwrap();
        assert_eq!(
            feats,
            vec![PointFeature::new(1., 2.), PointFeature::new(3.5, 4.5)]
        );
    }

    #[test]
    fn malformed_feature_reports_line() {
        let text = "1 2 3 4\n1 2 x 4\n";
        let mut feats: Vec<SioPointFeature> = Vec::new();
        match read_features(Cursor::new(text), &mut feats) {
            Err(RegionsError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn descriptor_layout_is_count_then_elements() {
        let descs = vec![Descriptor::<u16, 2>::new([1, 2]), Descriptor::new([3, 4])];
        let mut bytes = Vec::new();
        write_descriptors(&mut bytes, &descs).unwrap();
        assert_eq!(bytes.len(), 8 + 2 * 2 * 2);
        assert_eq!(&bytes[..8], &2u64.to_le_bytes());

        let mut back: Vec<Descriptor<u16, 2>> = Vec::new();
        read_descriptors(Cursor::new(bytes), &mut back).unwrap();
        assert_eq!(back, descs);
    }

    #[test]
    fn short_descriptor_file_is_rejected() {
        let descs = vec![Descriptor::<f32, 4>::default(); 3];
        let mut bytes = Vec::new();
        write_descriptors(&mut bytes, &descs).unwrap();
        bytes.truncate(bytes.len() - 1);
        let mut back: Vec<Descriptor<f32, 4>> = Vec::new();
        assert!(matches!(
            read_descriptors(Cursor::new(bytes), &mut back),
            Err(RegionsError::Truncated { .. })
        ));
        assert!(matches!(
            read_descriptors(Cursor::new(vec![0u8; 3]), &mut back),
            Err(RegionsError::Truncated { expected: 8, found: 3 })
        ));
    }

    #[test]
    fn trailing_descriptor_bytes_are_rejected() {
        let mut bytes = Vec::new();
        write_descriptors(&mut bytes, &[Descriptor::<u8, 4>::new([1, 2, 3, 4])]).unwrap();
        bytes.push(0);
        let mut back: Vec<Descriptor<u8, 4>> = Vec::new();
        assert!(matches!(
            read_descriptors(Cursor::new(bytes), &mut back),
            Err(RegionsError::TrailingBytes(1))
        ));
    }
}
