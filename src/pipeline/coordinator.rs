/// 定位流水线协调器
///
/// 每批读数依次经过：调理 → 选择 →（频率门限）→ 求解，
/// 总是输出实时信号，可选输出一次定位。
///
/// 状态：
/// - `Idle`：尚未见到任何已知信标
/// - `Tracking`：至少一个信标已有滤波状态
///
/// 重置只由外部触发（新的记录会话开始），把状态恢复到 `Idle`。

use crate::algorithms::{
    BeaconSelector, BeaconSet, ConditionedSignal, MultilaterationSolver, PositionFix, RangeEstimate,
    RawReading, SignalConditioner,
};
use crate::config::PipelineConfig;
use crate::pipeline::scheduler::FixScheduler;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 流水线所处阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    Tracking,
}

/// 单个接收端/会话的全部可变状态
#[derive(Clone, Debug, Default)]
pub struct PipelineState {
    conditioner: SignalConditioner,
    scheduler: FixScheduler,
    last_fix: Option<PositionFix>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PipelinePhase {
        if self.conditioner.is_empty() {
            PipelinePhase::Idle
        } else {
            PipelinePhase::Tracking
        }
    }

    pub fn conditioner(&self) -> &SignalConditioner {
        &self.conditioner
    }

    pub fn last_fix(&self) -> Option<&PositionFix> {
        self.last_fix.as_ref()
    }

    pub fn last_fix_time(&self) -> Option<DateTime<Utc>> {
        self.scheduler.last_fix_time()
    }

    /// 清空所有滤波状态和上次定位，幂等
    pub fn reset(&mut self) {
        self.conditioner.clear();
        self.scheduler.reset();
        self.last_fix = None;
    }
}

/// 一批读数的处理结果
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PipelineOutput {
    /// 本批中已知信标的实时信号，按信标 ID 排序
    pub live_signals: BTreeMap<String, ConditionedSignal>,
    /// 本批产生的定位（如有）
    pub fix: Option<PositionFix>,
}

impl PipelineOutput {
    pub fn is_empty(&self) -> bool {
        self.live_signals.is_empty() && self.fix.is_none()
    }
}

/// 流水线协调器，独占 `PipelineState`
pub struct PositionPipeline {
    registry: Arc<BeaconSet>,
    state: PipelineState,
}

impl PositionPipeline {
    pub fn new(registry: Arc<BeaconSet>) -> Self {
        PositionPipeline {
            registry,
            state: PipelineState::new(),
        }
    }

    pub fn registry(&self) -> &BeaconSet {
        &self.registry
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn phase(&self) -> PipelinePhase {
        self.state.phase()
    }

    /// 会话重启：清空所有信标滤波状态
    pub fn reset_session(&mut self) {
        self.state.reset();
        info!("定位会话已重置");
    }

    /// 处理一条传输层扫描（beacon_id → RSSI）
    pub fn submit_scan(
        &mut self,
        scan: HashMap<String, f64>,
        arrival_time: DateTime<Utc>,
        config: &PipelineConfig,
    ) -> PipelineOutput {
        let readings = crate::ingress::to_raw_readings(scan, arrival_time);
        self.process_batch(&readings, config)
    }

    /// 处理一批原始读数
    ///
    /// 结果只取决于当前状态、输入和配置快照。批次时间取读数中最晚的到达时间。
    pub fn process_batch(&mut self, readings: &[RawReading], config: &PipelineConfig) -> PipelineOutput {
        let mut output = PipelineOutput::default();
        let Some(now) = readings.iter().map(|r| r.arrival_time).max() else {
            return output;
        };

        let params = config.filter_params();
        for reading in readings {
            if !self.registry.contains(&reading.beacon_id) {
                continue;
            }
            // 非有限值会永久污染卡尔曼估计
            if !reading.rssi.is_finite() {
                warn!("丢弃信标 {} 的无效 RSSI: {}", reading.beacon_id, reading.rssi);
                continue;
            }
            let signal = self
                .state
                .conditioner
                .condition(&reading.beacon_id, reading.rssi, &params);
            output.live_signals.insert(reading.beacon_id.clone(), signal);
        }

        if !self.state.scheduler.is_due(now, config.fix_interval()) {
            return output;
        }

        let selector = BeaconSelector::new(config.beacon_selection_count);
        let Some(selected) = selector.select_for_fix(output.live_signals.values(), &self.registry) else {
            debug!("可用信标 {} 个，不足以定位", output.live_signals.len());
            return output;
        };

        let model = config.rssi_model();
        let ranges: Vec<RangeEstimate> = selected
            .iter()
            .filter_map(|s| {
                let beacon = self.registry.get(&s.beacon_id)?;
                Some(RangeEstimate::new(beacon.clone(), model.distance(s.filtered_rssi)))
            })
            .collect();

        let solver = MultilaterationSolver::new(config.solver_options());
        match solver.solve(&ranges) {
            Ok(solution) => {
                let fix = PositionFix {
                    x: solution.x,
                    y: solution.y,
                    timestamp: now,
                    beacon_count: ranges.len(),
                    residual_rms: solution.residual_rms,
                };
                debug!("定位 {} ({} 次迭代)", fix, solution.iterations);
                self.state.scheduler.record_fix(now);
                self.state.last_fix = Some(fix.clone());
                output.fix = Some(fix);
            }
            Err(e) => {
                warn!("本周期定位失败: {}", e);
            }
        }

        output
    }
}
