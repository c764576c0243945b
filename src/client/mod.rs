//! Pi-hole 어플라이언스 클라이언트 모듈
//!
//! 세션 관리, 엔드포인트 동시 조회, HTTP Transport 추상화를 제공합니다.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pihole_stats::client::{Endpoint, EndpointFetcher, HttpTransport, SessionManager};
//!
//! let transport = Arc::new(HttpTransport::new("http://pi.hole", 5000)?);
//! let mut session = SessionManager::new(transport.clone(), "secret", Duration::from_secs(5));
//! let fetcher = EndpointFetcher::new(transport, Endpoint::default_table());
//! let sid = session.ensure_token().await?;
//! let responses = fetcher.fetch_all(&sid).await?;
//! ```

mod fetcher;
mod session;
mod transport;

pub use fetcher::{Endpoint, EndpointFetcher, ResponseSet};
pub use session::{parse_session_id, FileSessionStore, SessionManager, SessionStore, AUTH_PATH};
pub use transport::{HttpReply, HttpTransport, Transport, SID_HEADER};
