//! 전역 실행 제한 시간.
//!
//! 제한 시간이 지나면 타이머 태스크가 실행 토큰을 취소합니다. 취소는 권고 사항이며,
//! 진행 중인 요청이나 트랜잭션은 끝까지 수행되고 새 작업만 시작되지 않습니다.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 타이머 태스크 핸들. drop 시 타이머를 중단합니다.
#[derive(Debug)]
pub struct DeadlineGuard {
    handle: JoinHandle<()>,
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// `after` 경과 후 `token`을 취소하는 타이머를 시작합니다.
pub fn arm_deadline(token: CancellationToken, after: Duration) -> DeadlineGuard {
    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(after) => {
                tracing::warn!(
                    limit_secs = after.as_secs(),
                    "실행 제한 시간 도달, 새 작업을 시작하지 않습니다"
                );
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });

    DeadlineGuard { handle }
}
