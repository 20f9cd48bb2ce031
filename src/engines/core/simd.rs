//! Dispatched byte kernels
//!
//! Each operation has AVX2, SSE4.1 and scalar variants behind a
//! [`Dispatcher`], which picks the best one the processor and OS support.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use crate::engines::dispatch::{Dispatcher, FunctionDescriptor};
#[cfg(target_arch = "x86_64")]
use crate::modules::arch::Microarchitecture;
#[cfg(target_arch = "x86_64")]
use crate::modules::feature::x86;

type CountByteFn = fn(&[u8], u8) -> usize;
type FindByteFn = fn(&[u8], u8) -> Option<usize>;
type CompareFn = fn(&[u8], &[u8]) -> bool;

const COUNT_BYTE_TABLE: &[FunctionDescriptor<CountByteFn>] = &[
    #[cfg(target_arch = "x86_64")]
    FunctionDescriptor::new(count_byte_avx2_entry as CountByteFn, Microarchitecture::Unknown)
        .requires(x86::simd::AVX2)
        .requires(x86::system::YMM),
    #[cfg(target_arch = "x86_64")]
    FunctionDescriptor::new(count_byte_sse41_entry as CountByteFn, Microarchitecture::Unknown)
        .requires(x86::simd::SSE4_1)
        .requires(x86::system::XMM),
    FunctionDescriptor::default_implementation(count_byte_scalar as CountByteFn),
];

const FIND_BYTE_TABLE: &[FunctionDescriptor<FindByteFn>] = &[
    #[cfg(target_arch = "x86_64")]
    FunctionDescriptor::new(find_byte_avx2_entry as FindByteFn, Microarchitecture::Unknown)
        .requires(x86::simd::AVX2)
        .requires(x86::system::YMM),
    #[cfg(target_arch = "x86_64")]
    FunctionDescriptor::new(find_byte_sse41_entry as FindByteFn, Microarchitecture::Unknown)
        .requires(x86::simd::SSE4_1)
        .requires(x86::system::XMM),
    FunctionDescriptor::default_implementation(find_byte_scalar as FindByteFn),
];

const COMPARE_TABLE: &[FunctionDescriptor<CompareFn>] = &[
    #[cfg(target_arch = "x86_64")]
    FunctionDescriptor::new(compare_slices_avx2_entry as CompareFn, Microarchitecture::Unknown)
        .requires(x86::simd::AVX2)
        .requires(x86::system::YMM),
    #[cfg(target_arch = "x86_64")]
    FunctionDescriptor::new(compare_slices_sse41_entry as CompareFn, Microarchitecture::Unknown)
        .requires(x86::simd::SSE4_1)
        .requires(x86::system::XMM),
    FunctionDescriptor::default_implementation(compare_slices_scalar as CompareFn),
];

static COUNT_BYTE: Dispatcher<CountByteFn> = Dispatcher::new(COUNT_BYTE_TABLE);
static FIND_BYTE: Dispatcher<FindByteFn> = Dispatcher::new(FIND_BYTE_TABLE);
static COMPARE: Dispatcher<CompareFn> = Dispatcher::new(COMPARE_TABLE);

/// Count occurrences of a byte in a slice using the most efficient
/// available SIMD instruction set
pub fn count_byte(slice: &[u8], byte: u8) -> usize {
    let kernel = COUNT_BYTE.get().unwrap_or(count_byte_scalar as CountByteFn);
    kernel(slice, byte)
}

/// Find the first occurrence of a byte in a slice using the most efficient
/// available SIMD instruction set
pub fn find_byte(slice: &[u8], byte: u8) -> Option<usize> {
    let kernel = FIND_BYTE.get().unwrap_or(find_byte_scalar as FindByteFn);
    kernel(slice, byte)
}

/// Compare two slices for equality using the most efficient
/// available SIMD instruction set
pub fn compare_slices(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let kernel = COMPARE.get().unwrap_or(compare_slices_scalar as CompareFn);
    kernel(a, b)
}

/// Count a byte across chunks on the rayon pool
#[cfg(feature = "parallel")]
pub fn count_byte_parallel(slice: &[u8], byte: u8, chunk_size: usize) -> usize {
    use rayon::prelude::*;

    slice
        .par_chunks(chunk_size.max(1))
        .map(|chunk| count_byte(chunk, byte))
        .sum()
}

/// Scalar implementation for counting occurrences of a byte in a slice
fn count_byte_scalar(slice: &[u8], byte: u8) -> usize {
    slice.iter().filter(|&&b| b == byte).count()
}

/// Scalar implementation for finding a byte in a slice
fn find_byte_scalar(slice: &[u8], byte: u8) -> Option<usize> {
    slice.iter().position(|&b| b == byte)
}

/// Scalar implementation for comparing two slices
fn compare_slices_scalar(a: &[u8], b: &[u8]) -> bool {
    a == b
}

// Safe entry points for the dispatch tables. The tables only select them
// when the required features were detected.

#[cfg(target_arch = "x86_64")]
fn count_byte_avx2_entry(slice: &[u8], byte: u8) -> usize {
    unsafe { count_byte_avx2(slice, byte) }
}

#[cfg(target_arch = "x86_64")]
fn count_byte_sse41_entry(slice: &[u8], byte: u8) -> usize {
    unsafe { count_byte_sse41(slice, byte) }
}

#[cfg(target_arch = "x86_64")]
fn find_byte_avx2_entry(slice: &[u8], byte: u8) -> Option<usize> {
    unsafe { find_byte_avx2(slice, byte) }
}

#[cfg(target_arch = "x86_64")]
fn find_byte_sse41_entry(slice: &[u8], byte: u8) -> Option<usize> {
    unsafe { find_byte_sse41(slice, byte) }
}

#[cfg(target_arch = "x86_64")]
fn compare_slices_avx2_entry(a: &[u8], b: &[u8]) -> bool {
    unsafe { compare_slices_avx2(a, b) }
}

#[cfg(target_arch = "x86_64")]
fn compare_slices_sse41_entry(a: &[u8], b: &[u8]) -> bool {
    unsafe { compare_slices_sse41(a, b) }
}

/// AVX2 implementation for counting occurrences of a byte in a slice
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn count_byte_avx2(slice: &[u8], byte: u8) -> usize {
    let needle = _mm256_set1_epi8(byte as i8);
    let chunks = slice.chunks_exact(32);
    let tail = chunks.remainder();

    let mut count = 0;
    for chunk in chunks {
        let data = _mm256_loadu_si256(chunk.as_ptr() as *const __m256i);
        let hits = _mm256_movemask_epi8(_mm256_cmpeq_epi8(data, needle)) as u32;
        count += hits.count_ones() as usize;
    }
    count + count_byte_scalar(tail, byte)
}

/// SSE4.1 implementation for counting occurrences of a byte in a slice
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn count_byte_sse41(slice: &[u8], byte: u8) -> usize {
    let needle = _mm_set1_epi8(byte as i8);
    let chunks = slice.chunks_exact(16);
    let tail = chunks.remainder();

    let mut count = 0;
    for chunk in chunks {
        let data = _mm_loadu_si128(chunk.as_ptr() as *const __m128i);
        let hits = _mm_movemask_epi8(_mm_cmpeq_epi8(data, needle)) as u32;
        count += hits.count_ones() as usize;
    }
    count + count_byte_scalar(tail, byte)
}

/// AVX2 implementation for finding a byte in a slice
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn find_byte_avx2(slice: &[u8], byte: u8) -> Option<usize> {
    let needle = _mm256_set1_epi8(byte as i8);
    let chunks = slice.chunks_exact(32);
    let tail = chunks.remainder();
    let tail_start = slice.len() - tail.len();

    for (index, chunk) in chunks.enumerate() {
        let data = _mm256_loadu_si256(chunk.as_ptr() as *const __m256i);
        let hits = _mm256_movemask_epi8(_mm256_cmpeq_epi8(data, needle)) as u32;
        if hits != 0 {
            return Some(index * 32 + hits.trailing_zeros() as usize);
        }
    }
    find_byte_scalar(tail, byte).map(|pos| tail_start + pos)
}

/// SSE4.1 implementation for finding a byte in a slice
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn find_byte_sse41(slice: &[u8], byte: u8) -> Option<usize> {
    let needle = _mm_set1_epi8(byte as i8);
    let chunks = slice.chunks_exact(16);
    let tail = chunks.remainder();
    let tail_start = slice.len() - tail.len();

    for (index, chunk) in chunks.enumerate() {
        let data = _mm_loadu_si128(chunk.as_ptr() as *const __m128i);
        let hits = _mm_movemask_epi8(_mm_cmpeq_epi8(data, needle)) as u32;
        if hits != 0 {
            return Some(index * 16 + hits.trailing_zeros() as usize);
        }
    }
    find_byte_scalar(tail, byte).map(|pos| tail_start + pos)
}

/// AVX2 implementation for comparing two slices of equal length
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn compare_slices_avx2(a: &[u8], b: &[u8]) -> bool {
    let left = a.chunks_exact(32);
    let right = b.chunks_exact(32);
    let (left_tail, right_tail) = (left.remainder(), right.remainder());

    for (x, y) in left.zip(right) {
        let x = _mm256_loadu_si256(x.as_ptr() as *const __m256i);
        let y = _mm256_loadu_si256(y.as_ptr() as *const __m256i);
        if _mm256_movemask_epi8(_mm256_cmpeq_epi8(x, y)) as u32 != u32::MAX {
            return false;
        }
    }
    compare_slices_scalar(left_tail, right_tail)
}

/// SSE4.1 implementation for comparing two slices of equal length
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.1")]
unsafe fn compare_slices_sse41(a: &[u8], b: &[u8]) -> bool {
    let left = a.chunks_exact(16);
    let right = b.chunks_exact(16);
    let (left_tail, right_tail) = (left.remainder(), right.remainder());

    for (x, y) in left.zip(right) {
        let x = _mm_loadu_si128(x.as_ptr() as *const __m128i);
        let y = _mm_loadu_si128(y.as_ptr() as *const __m128i);
        // Every byte lane must match
        if _mm_movemask_epi8(_mm_cmpeq_epi8(x, y)) != 0xFFFF {
            return false;
        }
    }
    compare_slices_scalar(left_tail, right_tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::core::config::DetectionConfig;
    use crate::engines::core::context::cpu_description;
    use crate::engines::core::description::CpuDescription;
    use crate::engines::dispatch::select_function;
    use crate::engines::probe::ProbeSnapshot;
    use crate::modules::arch::Architecture;
    use rand::Rng;

    fn description(probe: ProbeSnapshot) -> CpuDescription {
        CpuDescription::detect(
            &probe,
            &DetectionConfig {
                log_summary: false,
                ..DetectionConfig::default()
            },
        )
    }

    /// Offsets either side of the 16- and 32-byte chunk edges
    const EDGES: [usize; 7] = [0, 15, 16, 31, 32, 63, 64];

    #[test]
    fn test_count_byte_at_chunk_edges() {
        let mut data = vec![0u8; 65];
        for &i in &EDGES {
            data[i] = 0xFF;
        }
        assert_eq!(count_byte(&data, 0xFF), EDGES.len());
        assert_eq!(count_byte(&data, 0), data.len() - EDGES.len());
        // Tail shorter than one chunk
        assert_eq!(count_byte(&data[33..], 0xFF), 2);
        assert_eq!(count_byte(&[], 0), 0);
    }

    #[test]
    fn test_find_byte_at_chunk_edges() {
        for &i in &EDGES {
            let mut data = vec![0x11u8; 80];
            data[i] = 0x80;
            // A later copy must not win
            data[79] = 0x80;
            assert_eq!(find_byte(&data, 0x80), Some(i), "needle at {i}");
        }
        assert_eq!(find_byte(&[0x11; 64], 0x80), None);
    }

    #[test]
    fn test_compare_slices_at_chunk_edges() {
        let a: Vec<u8> = (0..=255u8).cycle().take(96).collect();
        for &i in &EDGES {
            let mut b = a.clone();
            b[i] ^= 0x01;
            assert!(!compare_slices(&a, &b), "mismatch at {i}");
        }
        assert!(compare_slices(&a, &a.clone()));
        assert!(!compare_slices(&a, &a[..95]));
        assert!(compare_slices(&a[..31], &a[..31]));
    }

    #[test]
    fn test_scalar_without_features() {
        let plain = description(ProbeSnapshot::new(Architecture::X86));
        let selected = select_function(COUNT_BYTE_TABLE, &plain).unwrap();
        assert!(selected.is_default());
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_avx2_needs_os_support() {
        use crate::modules::feature::x86;

        let no_ymm = description(
            ProbeSnapshot::new(Architecture::X86)
                .with_features([x86::simd::AVX2, x86::simd::SSE4_1, x86::system::XMM]),
        );
        let selected = select_function(FIND_BYTE_TABLE, &no_ymm).unwrap();
        assert!(selected.simd.contains(x86::simd::SSE4_1));
        assert!(!selected.simd.contains(x86::simd::AVX2));
    }

    #[test]
    fn test_runnable_kernels_match_scalar() {
        let host = cpu_description();
        let mut rng = rand::thread_rng();
        for len in [0usize, 1, 15, 16, 17, 31, 32, 33, 100, 1000] {
            let data: Vec<u8> = (0..len).map(|_| rng.gen_range(b'A'..=b'D')).collect();
            let mut other = data.clone();
            if let Some(last) = other.last_mut() {
                *last = b'Z';
            }

            for entry in COUNT_BYTE_TABLE.iter().filter(|e| e.is_satisfied_by(host)) {
                assert_eq!((entry.function)(&data, b'C'), count_byte_scalar(&data, b'C'));
            }
            for entry in FIND_BYTE_TABLE.iter().filter(|e| e.is_satisfied_by(host)) {
                assert_eq!((entry.function)(&data, b'D'), find_byte_scalar(&data, b'D'));
            }
            for entry in COMPARE_TABLE.iter().filter(|e| e.is_satisfied_by(host)) {
                assert!((entry.function)(&data, &data));
                assert_eq!((entry.function)(&data, &other), len == 0);
            }
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_count() {
        let data = b"ACGT".repeat(4096);
        assert_eq!(count_byte_parallel(&data, b'G', 1000), 4096);
        assert_eq!(count_byte_parallel(&data, b'G', 0), 4096);
    }
}
