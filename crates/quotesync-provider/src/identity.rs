//! 요청별 클라이언트 식별자 순환.
//!
//! 제공자는 같은 지문으로 반복되는 요청을 차단하는 경향이 있어,
//! 요청마다 다른 브라우저 User-Agent / Accept-Language 조합을 사용합니다.

use std::sync::atomic::{AtomicUsize, Ordering};

/// 요청 헤더에 실리는 클라이언트 식별자.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_agent: String,
    pub accept_language: String,
}

impl ClientIdentity {
    pub fn new(user_agent: impl Into<String>, accept_language: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_language: accept_language.into(),
        }
    }
}

/// 라운드 로빈 식별자 풀.
#[derive(Debug)]
pub struct IdentityPool {
    identities: Vec<ClientIdentity>,
    cursor: AtomicUsize,
}

impl IdentityPool {
    /// 주어진 식별자 목록으로 풀을 생성합니다. 비어 있으면 기본 브라우저 목록을 사용합니다.
    pub fn new(identities: Vec<ClientIdentity>) -> Self {
        if identities.is_empty() {
            return Self::browsers();
        }
        Self {
            identities,
            cursor: AtomicUsize::new(0),
        }
    }

    /// 주요 데스크톱 브라우저 식별자.
    pub fn browsers() -> Self {
        let identities = vec![
            ClientIdentity::new(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
                "en-US,en;q=0.9,pt-BR;q=0.8,pt;q=0.7",
            ),
            ClientIdentity::new(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
                "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7",
            ),
            ClientIdentity::new(
                "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
                "en-US,en;q=0.5",
            ),
            ClientIdentity::new(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36 Edg/116.0.1938.69",
                "en-US,en;q=0.9",
            ),
        ];
        Self {
            identities,
            cursor: AtomicUsize::new(0),
        }
    }

    /// 다음 식별자.
    pub fn next(&self) -> &ClientIdentity {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.identities.len();
        &self.identities[idx]
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::browsers()
    }
}
