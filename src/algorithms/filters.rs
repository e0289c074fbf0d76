/// RSSI 信号滤波器
///
/// 两级滤波：
/// - 滑动中值窗口：抑制多径造成的尖峰
/// - 标量卡尔曼滤波：平滑中值输出，Q/R 可在运行时调整

use std::collections::VecDeque;

// ============================================================================
// 滑动中值窗口
// ============================================================================

/// 有界 FIFO 中值窗口，长度始终不超过容量
#[derive(Clone, Debug)]
pub struct MedianWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl MedianWindow {
    /// 创建指定容量的窗口（容量至少为 1），样本缓冲按需增长
    pub fn new(capacity: usize) -> Self {
        MedianWindow {
            samples: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// 调整容量，多余的最旧样本立即淘汰
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict();
    }

    /// 压入新样本并返回当前窗口中值
    pub fn push(&mut self, sample: f64) -> f64 {
        self.samples.push_back(sample);
        self.evict();
        self.median()
    }

    fn evict(&mut self) {
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// 当前窗口中值；偶数长度时取中间两值的平均
    pub fn median(&self) -> f64 {
        if self.samples.is_empty() {
            return f64::NAN;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// 窗口内样本（从旧到新）
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// 卡尔曼滤波器
// ============================================================================

/// 标量卡尔曼滤波器
///
/// 信标固定、接收端移动，状态只有一个 RSSI 估计值，没有运动模型。
/// Q 和 R 不存储在滤波器中，每次更新由调用方传入。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KalmanFilter1D {
    /// 当前估计值
    pub estimate: f64,
    /// 估计方差
    pub variance: f64,
}

impl KalmanFilter1D {
    /// 以首个测量值初始化，先验方差为 1.0
    pub fn new(initial_value: f64) -> Self {
        KalmanFilter1D {
            estimate: initial_value,
            variance: 1.0,
        }
    }

    /// 更新滤波器
    ///
    /// - `q`: 过程噪声
    /// - `r`: 测量噪声
    pub fn update(&mut self, measurement: f64, q: f64, r: f64) -> f64 {
        // 预测
        let predicted_variance = self.variance + q;

        // 卡尔曼增益
        let k = predicted_variance / (predicted_variance + r);

        // 更新
        self.estimate += k * (measurement - self.estimate);
        self.variance = (1.0 - k) * predicted_variance;

        self.estimate
    }
}

// ============================================================================
// 单信标滤波状态
// ============================================================================

/// 单个信标的滤波状态（中值窗口 + 卡尔曼）
#[derive(Clone, Debug)]
pub struct FilterState {
    pub median_window: MedianWindow,
    pub kalman: KalmanFilter1D,
}

impl FilterState {
    /// 首次看到信标时创建，卡尔曼估计以首个原始 RSSI 初始化
    pub fn new(first_raw_rssi: f64, window_size: usize) -> Self {
        FilterState {
            median_window: MedianWindow::new(window_size),
            kalman: KalmanFilter1D::new(first_raw_rssi),
        }
    }

    /// 处理一个原始样本，返回卡尔曼输出
    pub fn update(&mut self, raw_rssi: f64, window_size: usize, q: f64, r: f64) -> f64 {
        if self.median_window.capacity() != window_size {
            self.median_window.set_capacity(window_size);
        }
        let median = self.median_window.push(raw_rssi);
        self.kalman.update(median, q, r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        let mut window = MedianWindow::new(4);
        assert_eq!(window.push(-60.0), -60.0);
        assert_eq!(window.push(-70.0), -65.0);
        assert_eq!(window.push(-40.0), -60.0);
        assert_eq!(window.push(-90.0), -65.0);
    }

    #[test]
    fn test_median_suppresses_spike() {
        let mut window = MedianWindow::new(5);
        for rssi in [-70.0, -71.0, -69.0, -70.0] {
            window.push(rssi);
        }
        // 单个多径尖峰不影响中值
        assert_eq!(window.push(-30.0), -70.0);
    }

    #[test]
    fn test_median_window_keeps_last_w() {
        let mut window = MedianWindow::new(3);
        for i in 0..10 {
            window.push(i as f64);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.samples().collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_huge_capacity_does_not_preallocate() {
        let mut window = MedianWindow::new(usize::MAX);
        assert_eq!(window.push(-61.0), -61.0);
        assert_eq!(window.capacity(), usize::MAX);

        let mut state = FilterState::new(-70.0, 5);
        state.update(-70.0, usize::MAX, 0.05, 4.0);
        assert_eq!(state.median_window.len(), 1);
    }

    #[test]
    fn test_shrinking_capacity_evicts_oldest() {
        let mut window = MedianWindow::new(5);
        for i in 0..5 {
            window.push(i as f64);
        }
        window.set_capacity(2);
        assert_eq!(window.samples().collect::<Vec<_>>(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_kalman_filter_1d() {
        let mut filter = KalmanFilter1D::new(0.0);
        let v1 = filter.update(10.0, 0.001, 0.1);
        let v2 = filter.update(10.1, 0.001, 0.1);
        assert!(v1 > 0.0 && v1 < 10.0);
        assert!(v2 > v1 && v2 < 10.1);
    }

    #[test]
    fn test_kalman_zero_process_noise_shrinks_variance() {
        let mut filter = KalmanFilter1D::new(-60.0);
        let mut last = filter.variance;
        for _ in 0..20 {
            filter.update(-60.0, 0.0, 4.0);
            assert!(filter.variance < last);
            last = filter.variance;
        }
    }

    #[test]
    fn test_filter_state_first_sample_is_identity() {
        let mut state = FilterState::new(-65.0, 5);
        assert_eq!(state.update(-65.0, 5, 0.05, 4.0), -65.0);
    }
}
