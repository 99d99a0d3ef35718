//! Property tests for the chunk codec and run-length encoding

use ndarray::Array2;
use proptest::collection::vec;
use proptest::prelude::*;
use salina::checkpoint::{join_chunks, split_to_chunks};
use salina::rle::{rle_decode, rle_encode_mask};
use tempfile::TempDir;

fn mask_strategy() -> impl Strategy<Value = (usize, usize, Vec<bool>)> {
    (1usize..=8, 1usize..=8)
        .prop_flat_map(|(h, w)| vec(any::<bool>(), h * w).prop_map(move |bits| (h, w, bits)))
}

proptest! {
    #[test]
    fn prop_chunk_round_trip(
        payload in vec(any::<u8>(), 0..2000),
        chunk_size in 1usize..500,
    ) {
        let dir = TempDir::new().unwrap();
        let names = split_to_chunks(&payload, "p", dir.path(), chunk_size).unwrap();

        if payload.is_empty() {
            prop_assert!(names.is_empty());
        } else {
            prop_assert_eq!(names.len(), payload.len().div_ceil(chunk_size));
            let joined = join_chunks("p", dir.path(), true).unwrap();
            prop_assert_eq!(joined, payload);
            // Deleting on join leaves the directory empty
            prop_assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        }
    }

    #[test]
    fn prop_chunk_sizes_respect_ceiling(
        payload in vec(any::<u8>(), 1..2000),
        chunk_size in 1usize..500,
    ) {
        let dir = TempDir::new().unwrap();
        let names = split_to_chunks(&payload, "p", dir.path(), chunk_size).unwrap();

        for name in &names {
            let len = std::fs::metadata(dir.path().join(name)).unwrap().len() as usize;
            prop_assert!(len <= chunk_size);
            prop_assert!(len > 0);
        }
    }

    #[test]
    fn prop_rle_round_trip((h, w, bits) in mask_strategy()) {
        let mask = Array2::from_shape_vec(
            (h, w),
            bits.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect(),
        )
        .unwrap();

        let rle = rle_encode_mask(mask.view());
        let decoded = rle_decode(&rle, h, w).unwrap();
        prop_assert_eq!(decoded, mask);
    }

    #[test]
    fn prop_rle_all_ones_is_single_pair(h in 1usize..=16, w in 1usize..=16) {
        let mask = Array2::<f32>::ones((h, w));
        prop_assert_eq!(rle_encode_mask(mask.view()), format!("1 {}", h * w));
    }

    #[test]
    fn prop_rle_all_zeros_is_empty(h in 1usize..=16, w in 1usize..=16) {
        let mask = Array2::<f32>::zeros((h, w));
        prop_assert_eq!(rle_encode_mask(mask.view()), "");
    }
}
