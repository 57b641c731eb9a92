use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// 模拟数据使用的随机数来源，返回 `[0, 1)` 内的值
pub trait RandomSource: Send + Sync + Debug {
    fn unit(&self) -> f64;

    /// `[min, max)` 内均匀分布
    fn between(&self, min: f64, max: f64) -> f64 {
        min + self.unit() * (max - min)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// 按顺序循环返回预设值
#[derive(Debug)]
pub struct FixedRandom {
    values: Vec<f64>,
    cursor: AtomicUsize,
}

impl FixedRandom {
    pub fn constant(value: f64) -> Self {
        Self::sequence(vec![value])
    }

    pub fn sequence(values: Vec<f64>) -> Self {
        let values = if values.is_empty() { vec![0.0] } else { values };
        Self {
            values,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl RandomSource for FixedRandom {
    fn unit(&self) -> f64 {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_random_in_range() {
        let random = SystemRandom;
        for _ in 0..100 {
            let value = random.unit();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_fixed_random_cycles() {
        let random = FixedRandom::sequence(vec![0.1, 0.9]);
        assert_eq!(random.unit(), 0.1);
        assert_eq!(random.unit(), 0.9);
        assert_eq!(random.unit(), 0.1);
        assert!((random.between(10.0, 20.0) - 19.0).abs() < 1e-9);
    }
}
