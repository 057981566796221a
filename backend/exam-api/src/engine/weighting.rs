use crate::error::{EngineError, EngineResult};

/// One chapter's slice of the question bank, as seen by the allocator.
#[derive(Debug, Clone)]
pub struct ChapterPool {
    pub chapter: String,
    pub weight: f64,
    pub available: usize,
}

/// Splits `total` question slots across chapters by configured weight using
/// the largest-remainder method, then reconciles against availability.
///
/// Each chapter gets `floor(total * weight / weight_sum)` as its base share;
/// the leftover units go one by one to the chapters with the largest
/// fractional remainder, ties broken by chapter name ascending. Chapters with
/// fewer questions than their share are clamped and the shortfall moves to
/// chapters that still have spare questions, in the same remainder order.
/// The returned vector is aligned with `pools` and always sums to `total`,
/// or the whole call fails with `InsufficientQuestions`.
pub fn allocate(total: usize, pools: &[ChapterPool]) -> EngineResult<Vec<usize>> {
    if total == 0 {
        return Err(EngineError::Validation(
            "total_questions must be positive".to_string(),
        ));
    }

    let weight_sum: f64 = pools.iter().map(|p| p.weight.max(0.0)).sum();
    if pools.is_empty() || weight_sum <= 0.0 {
        return Err(EngineError::Validation(
            "chapter weights must contain at least one positive weight".to_string(),
        ));
    }

    let available_total: usize = pools.iter().map(|p| p.available).sum();
    if available_total < total {
        return Err(EngineError::InsufficientQuestions {
            requested: total as u32,
            available: available_total as u32,
        });
    }

    let mut allocation = Vec::with_capacity(pools.len());
    let mut fractions = Vec::with_capacity(pools.len());
    for pool in pools {
        let exact = total as f64 * pool.weight.max(0.0) / weight_sum;
        let base = exact.floor() as usize;
        allocation.push(base);
        fractions.push(exact - base as f64);
    }

    // Remainder order: largest fraction first, chapter name as the stable
    // tie-break. This order is reused for shortfall redistribution below.
    let mut order: Vec<usize> = (0..pools.len()).collect();
    order.sort_by(|&a, &b| {
        fractions[b]
            .partial_cmp(&fractions[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| pools[a].chapter.cmp(&pools[b].chapter))
    });

    let mut leftover = total - allocation.iter().sum::<usize>();
    while leftover > 0 {
        for &idx in &order {
            if leftover == 0 {
                break;
            }
            allocation[idx] += 1;
            leftover -= 1;
        }
    }

    // Clamp chapters that cannot fill their share and push the shortfall to
    // chapters with spare capacity.
    let mut shortfall = 0usize;
    for (idx, pool) in pools.iter().enumerate() {
        if allocation[idx] > pool.available {
            shortfall += allocation[idx] - pool.available;
            allocation[idx] = pool.available;
        }
    }
    while shortfall > 0 {
        let mut placed = false;
        for &idx in &order {
            if shortfall == 0 {
                break;
            }
            if allocation[idx] < pools[idx].available {
                allocation[idx] += 1;
                shortfall -= 1;
                placed = true;
            }
        }
        if !placed {
            // Cannot happen while available_total >= total, checked above.
            return Err(EngineError::InsufficientQuestions {
                requested: total as u32,
                available: available_total as u32,
            });
        }
    }

    debug_assert_eq!(allocation.iter().sum::<usize>(), total);
    Ok(allocation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(chapter: &str, weight: f64, available: usize) -> ChapterPool {
        ChapterPool {
            chapter: chapter.to_string(),
            weight,
            available,
        }
    }

    #[test]
    fn allocation_sums_exactly_to_total() {
        let pools = vec![
            pool("Pharmacology", 0.32, 500),
            pool("Pharmaceutics", 0.20, 500),
            pool("Drug Laws", 0.15, 500),
            pool("Microbiology", 0.10, 500),
            pool("Pharmaceutical Chemistry", 0.10, 500),
            pool("Hospital Pharmacy", 0.07, 500),
            pool("Reasoning", 0.06, 500),
        ];
        for total in [1, 7, 10, 33, 100, 257] {
            let allocation = allocate(total, &pools).unwrap();
            assert_eq!(allocation.iter().sum::<usize>(), total, "total={}", total);
        }
    }

    #[test]
    fn remainder_goes_to_largest_fraction_first() {
        // 10 * 0.55 = 5.5 and 10 * 0.45 = 4.5: one leftover unit, equal
        // fractions resolved by chapter name ascending.
        let pools = vec![pool("beta", 0.55, 100), pool("alpha", 0.45, 100)];
        let allocation = allocate(10, &pools).unwrap();
        assert_eq!(allocation, vec![5, 5]);

        // Unequal fractions: 0.34/0.33/0.33 of 10 → 3.4/3.3/3.3, the extra
        // unit lands on the largest fraction.
        let pools = vec![
            pool("a", 0.34, 100),
            pool("b", 0.33, 100),
            pool("c", 0.33, 100),
        ];
        let allocation = allocate(10, &pools).unwrap();
        assert_eq!(allocation, vec![4, 3, 3]);
    }

    #[test]
    fn equal_fraction_ties_break_by_chapter_name() {
        // 3 of 4 equal chapters get a leftover unit; the alphabetically
        // smallest names win.
        let pools = vec![
            pool("delta", 0.25, 100),
            pool("alpha", 0.25, 100),
            pool("charlie", 0.25, 100),
            pool("bravo", 0.25, 100),
        ];
        let allocation = allocate(7, &pools).unwrap();
        // base 1 each, fractions all 0.75, leftover 3 → alpha, bravo, charlie.
        assert_eq!(allocation, vec![1, 2, 2, 2]);
    }

    #[test]
    fn shortfall_redistributes_to_chapters_with_spare_questions() {
        let pools = vec![
            pool("big", 0.5, 2), // wants 5, only has 2
            pool("mid", 0.3, 100),
            pool("small", 0.2, 100),
        ];
        let allocation = allocate(10, &pools).unwrap();
        assert_eq!(allocation.iter().sum::<usize>(), 10);
        assert_eq!(allocation[0], 2);
        assert!(allocation[1] >= 3 && allocation[2] >= 2);
    }

    #[test]
    fn fails_when_entire_bank_is_too_small() {
        let pools = vec![pool("a", 0.6, 3), pool("b", 0.4, 2)];
        let err = allocate(10, &pools).unwrap_err();
        match err {
            EngineError::InsufficientQuestions {
                requested,
                available,
            } => {
                assert_eq!(requested, 10);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn zero_total_is_a_validation_error() {
        let pools = vec![pool("a", 1.0, 10)];
        assert_eq!(allocate(0, &pools).unwrap_err().kind(), "validation");
    }

    #[test]
    fn chapters_with_zero_weight_still_absorb_shortfall() {
        let pools = vec![pool("weighted", 1.0, 4), pool("unweighted", 0.0, 10)];
        let allocation = allocate(8, &pools).unwrap();
        assert_eq!(allocation, vec![4, 4]);
    }
}
