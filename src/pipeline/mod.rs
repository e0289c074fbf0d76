/// 实时定位流水线
///
/// - `scheduler`：定位频率门限
/// - `coordinator`：单会话状态与批处理
/// - `service`：独占状态的异步任务，对外提供句柄和事件队列

pub mod coordinator;
pub mod scheduler;
pub mod service;

pub use coordinator::*;
pub use scheduler::*;
pub use service::*;
