use std::collections::BTreeMap;

use mvg_regions::*;

fn main() {
    // Regions as an extraction stage would produce them
    let mut extracted = AkazeBinaryRegions::new();
    for i in 0..8u8 {
        let mut desc = Descriptor::<u8, 64>::default();
        desc.data_mut().iter_mut().for_each(|v| *v = i.wrapping_mul(37));
        extracted.push(SioPointFeature::new(i as f32 * 10., 5., 1.5, 0.), desc);
    }
    println!("Extracted: {:?}", extracted);

    // Save and load again through the type tag only
    let dir = std::env::temp_dir();
    let (feats, descs) = (dir.join("roundtrip.feat"), dir.join("roundtrip.desc"));
    extracted.save(&feats, &descs).unwrap();

    let regions_type = RegionsType::from_signature(&extracted.signature()).unwrap();
    let mut loaded = regions_type.create();
    loaded.load(&feats, &descs).unwrap();
    println!("Loaded {} regions as {}", loaded.region_count(), regions_type);

    // Keep only the regions seen in the reconstruction
    let tracks = [FeatureInImage::new(6, 1000), FeatureInImage::new(2, 1001)];
    let mut points = Vec::new();
    let mut full_to_local = BTreeMap::new();
    let filtered = loaded.create_filtered_regions(&tracks, &mut points, &mut full_to_local);
    println!(
        "Filtered: {:?}, points {:?}, map {:?}",
        filtered, points, full_to_local
    );

    // Make sure the loaded regions match the extracted ones
    for i in 0..extracted.region_count() {
        assert_eq!(extracted.squared_descriptor_distance(i, loaded.as_ref(), i).unwrap(), 0.);
    }

    extracted.save_archive(dir.join("roundtrip.bin")).unwrap();
    assert_eq!(AkazeBinaryRegions::load_archive(dir.join("roundtrip.bin")).unwrap(), extracted);
}
