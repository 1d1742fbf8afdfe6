//! Streaming and one-shot hashing must agree bit-for-bit on every input
//! shape, including the size classes around the internal block boundaries.

use fshash_common::{Digest, Seed};
use fshash_engine::Xxh3Stream;

const QUICK_BROWN_FOX: &[u8] = b"The quick brown fox jumps over the lazy dog";

fn reference_inputs() -> Vec<Vec<u8>> {
    vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"hello world".to_vec(),
        QUICK_BROWN_FOX.to_vec(),
        vec![b'x'; 1000],
        vec![b'x'; 100_000],
    ]
}

#[test]
fn streaming_matches_one_shot_for_reference_inputs() {
    for input in reference_inputs() {
        let mut stream = Xxh3Stream::default();
        stream.update(&input);
        assert_eq!(
            stream.digest(),
            Digest::of(&input),
            "input of {} bytes",
            input.len()
        );
    }
}

#[test]
fn chunked_updates_match_one_shot() {
    for input in reference_inputs() {
        for chunk_size in [1usize, 3, 64, 1024] {
            let mut stream = Xxh3Stream::default();
            for chunk in input.chunks(chunk_size.max(1)) {
                stream.update(chunk);
            }
            assert_eq!(
                stream.digest(),
                Digest::of(&input),
                "{} bytes in {}-byte chunks",
                input.len(),
                chunk_size
            );
        }
    }
}

#[test]
fn seeded_streaming_matches_seeded_one_shot() {
    let seed = Seed::from_parts(0x1234_5678, 0x9ABC_DEF0);
    for input in reference_inputs() {
        let mut stream = Xxh3Stream::new(seed);
        stream.update(&input);
        assert_eq!(stream.digest(), Digest::of_seeded(&input, seed));
    }
}

#[test]
fn quick_brown_fox_is_43_bytes() {
    assert_eq!(QUICK_BROWN_FOX.len(), 43);
}

#[test]
fn repeated_hashing_is_bitwise_stable() {
    for input in reference_inputs() {
        assert_eq!(Digest::of(&input), Digest::of(&input));
    }
}
