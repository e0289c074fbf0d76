/// 定位频率调度
///
/// 扫描批次可能每秒到达多次，而求解开销较大；调度器限制求解频率，
/// 与信号调理频率解耦。节流是尽力而为的：到期的批次若信标不足，
/// 仍然不会产生定位。

use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Clone, Debug, Default)]
pub struct FixScheduler {
    /// None 表示本会话尚未产生定位（等价于纪元时间）
    last_fix_time: Option<DateTime<Utc>>,
}

impl FixScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前批次是否允许运行求解器
    pub fn is_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        let Some(last) = self.last_fix_time else {
            return true;
        };
        // 时钟回拨时 elapsed 为负，不允许定位
        match (now - last).to_std() {
            Ok(elapsed) => elapsed >= interval,
            Err(_) => false,
        }
    }

    /// 求解成功后记录定位时间
    pub fn record_fix(&mut self, now: DateTime<Utc>) {
        self.last_fix_time = Some(now);
    }

    pub fn last_fix_time(&self) -> Option<DateTime<Utc>> {
        self.last_fix_time
    }

    pub fn reset(&mut self) {
        self.last_fix_time = None;
    }
}
