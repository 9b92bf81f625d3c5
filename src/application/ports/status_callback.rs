//! Status Callback Port - 状态事件回调
//!
//! 由调用方提供，负责保存/暴露状态；核心只负责推送

use crate::domain::pipeline::StatusEvent;

pub trait StatusCallback: Send + Sync {
    fn on_status(&self, event: StatusEvent);
}

impl<F> StatusCallback for F
where
    F: Fn(StatusEvent) + Send + Sync,
{
    fn on_status(&self, event: StatusEvent) {
        self(event)
    }
}
