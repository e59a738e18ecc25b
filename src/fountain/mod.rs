use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::config;

/// xorshift32. Both sides of the wire derive repair source sets from this
/// generator, so the state transition and the seed mix are wire contract:
/// unsigned 32-bit arithmetic with wraparound, logical shifts only.
struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// Seed for repair packet `r`. The `| 1` keeps the state nonzero, which
    /// xorshift requires.
    fn for_repair(repair_index: u32) -> Self {
        Self {
            state: repair_index.wrapping_mul(2_654_435_761).wrapping_add(1) | 1,
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

/// A repair packet: the XOR of the source chunks at `source_indices`.
/// The indices are never transmitted; the decoder rederives them from
/// `(repair_index, source_count)`.
#[derive(Debug, Clone)]
pub struct RepairPacket {
    pub repair_index: u32,
    pub source_indices: Vec<u32>,
    pub data: Vec<u8>,
}

/// Number of repair packets emitted for `source_count` sources. Always at
/// least one.
pub fn repair_count(source_count: usize, ratio: f64) -> usize {
    ((source_count as f64 * ratio).ceil() as usize).max(1)
}

/// Derive the source index set for repair packet `repair_index` over
/// `source_count` sources. Deterministic; sorted ascending.
///
/// Degree is `2 + prng() % min(4, n - 1)`, i.e. between 2 and `min(5, n)`.
/// A single-source stream gets a degree-1 repair (a copy of source 0), since
/// the degree draw is undefined at `n = 1`.
pub fn repair_sources(repair_index: u32, source_count: usize) -> Vec<u32> {
    if source_count == 1 {
        return vec![0];
    }

    let mut prng = XorShift32::for_repair(repair_index);
    let span = (source_count - 1).min(config::MAX_REPAIR_DEGREE - 1) as u32;
    let degree = config::MIN_REPAIR_DEGREE + (prng.next_u32() % span) as usize;

    let mut indices = BTreeSet::new();
    while indices.len() < degree {
        indices.insert(prng.next_u32() % source_count as u32);
    }
    indices.into_iter().collect()
}

/// Generate `max(1, ceil(n * ratio))` repair packets over equal-length source
/// chunks. Each repair is independent, so generation fans out across a thread
/// pool.
pub fn generate_repair_packets(sources: &[Vec<u8>], ratio: f64) -> Vec<RepairPacket> {
    let count = repair_count(sources.len(), ratio);
    (0..count as u32)
        .into_par_iter()
        .map(|r| {
            let indices = repair_sources(r, sources.len());
            let mut data = vec![0u8; sources[0].len()];
            for &i in &indices {
                xor_into(&mut data, &sources[i as usize]);
            }
            RepairPacket {
                repair_index: r,
                source_indices: indices,
                data,
            }
        })
        .collect()
}

/// Iterative peeling decode. Any repair whose index set has exactly one
/// absent source resolves that source; repeat until a full pass over the
/// repairs recovers nothing new. Slots still `None` afterwards are
/// unrecoverable with the received repairs.
pub fn recover_packets(sources: &mut [Option<Vec<u8>>], repairs: &[RepairPacket]) {
    loop {
        let mut changed = false;
        for repair in repairs {
            let mut missing = None;
            let mut missing_count = 0;
            for &i in &repair.source_indices {
                match sources.get(i as usize) {
                    Some(None) => {
                        missing = Some(i as usize);
                        missing_count += 1;
                    }
                    Some(Some(_)) => {}
                    // Index out of range: stale repair, skip it entirely
                    None => missing_count += 2,
                }
            }

            if missing_count != 1 {
                continue;
            }
            if let Some(slot) = missing {
                let mut data = repair.data.clone();
                for &i in &repair.source_indices {
                    if i as usize != slot {
                        if let Some(Some(known)) = sources.get(i as usize) {
                            xor_into(&mut data, known);
                        }
                    }
                }
                sources[slot] = Some(data);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
