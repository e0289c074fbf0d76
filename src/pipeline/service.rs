/// 定位服务 - 独立任务独占流水线状态
///
/// 传输层回调只构造扫描批次并放入队列；一个专用任务顺序消费队列，
/// 独占 `PositionPipeline`，处理结果通过输出通道发给渲染/记录端。
/// 重置命令和扫描走同一队列，因此与进行中的批次天然串行。
///
/// ```text
/// 传输层 ──submit_scan──▶ [命令队列] ──▶ 定位任务 ──▶ [事件队列] ──▶ 消费端
///                                         ▲
///                     update_config ──▶ [watch 快照]
/// ```

use crate::algorithms::BeaconSet;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::coordinator::{PipelineOutput, PositionPipeline};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// 默认队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

enum Command {
    Scan {
        scan: HashMap<String, f64>,
        arrival_time: DateTime<Utc>,
    },
    Reset,
}

/// 定位任务的输入端句柄，可克隆给多个生产者
#[derive(Clone)]
pub struct PipelineHandle {
    commands: mpsc::Sender<Command>,
    config: Arc<watch::Sender<PipelineConfig>>,
}

impl PipelineHandle {
    /// 提交一批扫描，队列满时等待
    pub async fn submit_scan(
        &self,
        scan: HashMap<String, f64>,
        arrival_time: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        self.commands
            .send(Command::Scan { scan, arrival_time })
            .await
            .map_err(|_| PipelineError::Closed)
    }

    /// 非阻塞提交，供运行在 I/O 线程上的同步回调使用
    pub fn try_submit_scan(
        &self,
        scan: HashMap<String, f64>,
        arrival_time: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        self.commands
            .try_send(Command::Scan { scan, arrival_time })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => PipelineError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => PipelineError::Closed,
            })
    }

    /// 请求重置会话，在之前提交的批次处理完之后生效
    pub async fn reset_session(&self) -> Result<(), PipelineError> {
        self.commands
            .send(Command::Reset)
            .await
            .map_err(|_| PipelineError::Closed)
    }

    /// 校验并发布新配置，下一批读数开始生效
    pub fn update_config(&self, config: PipelineConfig) -> Result<(), PipelineError> {
        config.validate()?;
        self.config.send_replace(config);
        Ok(())
    }

    /// 当前配置快照
    pub fn config(&self) -> PipelineConfig {
        *self.config.borrow()
    }
}

/// 正在运行的定位服务
pub struct PipelineService {
    pub handle: PipelineHandle,
    pub events: mpsc::Receiver<PipelineOutput>,
    pub task: JoinHandle<PositionPipeline>,
}

impl PipelineService {
    /// 启动定位任务，使用默认队列容量
    pub fn spawn(registry: Arc<BeaconSet>, config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::spawn_with_capacity(registry, config, DEFAULT_QUEUE_CAPACITY)
    }

    /// 启动定位任务
    ///
    /// 所有句柄被丢弃后任务结束，并返回流水线（含最终状态）。
    pub fn spawn_with_capacity(
        registry: Arc<BeaconSet>,
        config: PipelineConfig,
        capacity: usize,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (config_tx, config_rx) = watch::channel(config);

        let pipeline = PositionPipeline::new(registry);
        let task = tokio::spawn(run_pipeline(pipeline, command_rx, config_rx, event_tx));

        Ok(PipelineService {
            handle: PipelineHandle {
                commands: command_tx,
                config: Arc::new(config_tx),
            },
            events: event_rx,
            task,
        })
    }
}

async fn run_pipeline(
    mut pipeline: PositionPipeline,
    mut commands: mpsc::Receiver<Command>,
    config: watch::Receiver<PipelineConfig>,
    events: mpsc::Sender<PipelineOutput>,
) -> PositionPipeline {
    info!("定位任务启动，已知信标 {} 个", pipeline.registry().len());
    let mut consumer_gone = false;

    while let Some(command) = commands.recv().await {
        match command {
            Command::Scan { scan, arrival_time } => {
                // 每批只读一次配置
                let snapshot = *config.borrow();
                let output = pipeline.submit_scan(scan, arrival_time, &snapshot);
                if consumer_gone {
                    continue;
                }
                if events.send(output).await.is_err() {
                    debug!("事件接收端已关闭，继续维护滤波状态");
                    consumer_gone = true;
                }
            }
            Command::Reset => pipeline.reset_session(),
        }
    }

    info!("定位任务停止");
    pipeline
}
