//! Cumulative-weight selection shared by hunting (rarity tiers) and the slot machine.
//!
//! `r` is drawn uniformly from `[0, total)`; the first entry whose running sum reaches
//! or exceeds `r` wins, so ties resolve in declaration order. Zero-weight entries are
//! never selected.
use rand::Rng;

pub fn pick_weighted<'a, T, R, W>(entries: &'a [T], weight: W, rng: &mut R) -> Option<&'a T>
where
    R: Rng + ?Sized,
    W: Fn(&T) -> u32,
{
    let total: u64 = entries.iter().map(|e| u64::from(weight(e))).sum();
    if total == 0 {
        return None;
    }
    let r = rng.gen::<f64>() * total as f64;
    pick_at(entries, &weight, r)
}

/// Deterministic half of [`pick_weighted`]: select by an explicit draw `r`.
pub fn pick_at<'a, T, W>(entries: &'a [T], weight: W, r: f64) -> Option<&'a T>
where
    W: Fn(&T) -> u32,
{
    let mut cumulative = 0u64;
    let mut last_positive = None;
    for entry in entries {
        let w = u64::from(weight(entry));
        if w == 0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(entry);
        if cumulative as f64 >= r {
            return Some(entry);
        }
    }
    // r beyond the total (only possible with a hand-fed draw) lands on the last live entry.
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn boundaries_select_first_reaching_entry() {
        let weights = [40u32, 25, 15];
        assert_eq!(pick_at(&weights, |w| *w, 0.0), Some(&40));
        assert_eq!(pick_at(&weights, |w| *w, 40.0), Some(&40));
        assert_eq!(pick_at(&weights, |w| *w, 40.01), Some(&25));
        assert_eq!(pick_at(&weights, |w| *w, 79.9), Some(&15));
    }

    #[test]
    fn zero_weights_are_skipped() {
        let entries = [("never", 0u32), ("always", 3)];
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let hit = pick_weighted(&entries, |e| e.1, &mut rng).unwrap();
            assert_eq!(hit.0, "always");
        }
        let empty: [(&str, u32); 1] = [("none", 0)];
        assert!(pick_weighted(&empty, |e| e.1, &mut rng).is_none());
    }

    #[test]
    fn frequencies_converge_to_weights() {
        let weights = [40u32, 25, 15, 10, 6, 3, 1];
        let mut counts = [0u32; 7];
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let trials = 200_000;
        for _ in 0..trials {
            let hit = pick_weighted(&weights, |w| *w, &mut rng).unwrap();
            let idx = weights.iter().position(|w| std::ptr::eq(w, hit)).unwrap();
            counts[idx] += 1;
        }
        for (i, w) in weights.iter().enumerate() {
            let expected = f64::from(*w) / 100.0;
            let observed = f64::from(counts[i]) / f64::from(trials);
            assert!(
                (observed - expected).abs() < 0.01,
                "entry {} expected {:.3} observed {:.3}",
                i,
                expected,
                observed
            );
        }
    }
}
