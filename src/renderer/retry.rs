//! 重试预算与指数退避
//!
//! 延迟完全由尝试序号决定（无抖动），测试可以精确复现。

use std::time::Duration;

use serde::Serialize;

/// 一个生成序列内的有界尝试计数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryBudget {
    used: u32,
    ceiling: u32,
}

impl RetryBudget {
    pub fn new(ceiling: u32) -> Self {
        Self {
            used: 0,
            ceiling: ceiling.max(1),
        }
    }

    /// 记录一次失败的绘制尝试。
    pub fn record_failure(&mut self) {
        self.used = (self.used + 1).min(self.ceiling);
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn remaining(&self) -> u32 {
        self.ceiling - self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.ceiling
    }
}

/// 第 `retry` 次自动重试前的等待：`base * 2^(retry-1)`，不超过 `max`。
pub fn backoff_delay(base_ms: u64, retry: u32, max_ms: u64) -> Duration {
    let exponent = retry.saturating_sub(1);
    let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn delays_double_from_base() {
        assert_eq!(backoff_delay(1_000, 1, 60_000), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(1_000, 2, 60_000), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(1_000, 3, 60_000), Duration::from_millis(4_000));
    }

    #[test]
    fn delay_is_capped() {
        assert_eq!(backoff_delay(1_000, 10, 8_000), Duration::from_millis(8_000));
        assert_eq!(backoff_delay(1_000, 200, 8_000), Duration::from_millis(8_000));
    }

    #[test]
    fn budget_never_exceeds_ceiling() {
        let mut budget = RetryBudget::new(3);
        for _ in 0..10 {
            budget.record_failure();
        }
        assert_eq!(budget.used(), 3);
        assert!(budget.is_exhausted());
        assert_eq!(budget.remaining(), 0);

        budget.reset();
        assert_eq!(budget.used(), 0);
        assert_eq!(budget.remaining(), 3);
    }

    #[test]
    fn zero_ceiling_is_clamped_to_one() {
        assert_eq!(RetryBudget::new(0).ceiling(), 1);
    }

    proptest! {
        #[test]
        fn each_delay_is_double_the_previous(base in 1u64..60_000, retry in 2u32..8) {
            let max = u64::MAX;
            let previous = backoff_delay(base, retry - 1, max);
            let current = backoff_delay(base, retry, max);
            prop_assert_eq!(current, previous * 2);
        }
    }
}
