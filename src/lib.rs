//! Course Evaluation Client
//!
//! Client layer for the course-evaluation REST backend: an HTTP client
//! with bearer-token injection, timeout retries and user-facing error
//! classification, typed faculty and review services, and the small
//! client-side helpers that sit next to it (TTL cache, in-flight request
//! deduplication, debounce and throttle).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use course_eval_client::{ClientConfig, HttpClient, ReviewService, Session};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_file("course_eval_client.yaml")?;
//! let session = Arc::new(Session::in_memory());
//! let client = HttpClient::new(config, session)?;
//!
//! let reviews = ReviewService::new(client.clone());
//! for review in reviews.by_course(42).await? {
//!     println!("{} stars: {}", review.rating, review.content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`HttpClient`]: runs requests through the interceptor [`Pipeline`],
//!   retries timeouts with linear backoff and maps failures to [`ClientError`]
//! - [`Session`]: persisted credential, logout transition, navigation hook
//! - [`Transport`]: the wire; [`ReqwestTransport`] by default
//! - [`TtlCache`], [`RequestDeduplicator`]: short-circuit repeated reads
//! - [`Debounced`], [`Throttled`]: call-rate limiters
//! - [`FacultyService`], [`ReviewService`]: typed REST wrappers
//!
//! # Error Handling
//!
//! Every failure carries a message meant for the end user:
//!
//! ```rust,no_run
//! use course_eval_client::{Review, ReviewService};
//!
//! # async fn post(reviews: ReviewService, review: Review) {
//! match reviews.create(&review).await {
//!     Ok(saved) => println!("saved review {:?}", saved.id),
//!     Err(e) if e.is_banned() => eprintln!("muted: {}", e.message()),
//!     Err(e) => eprintln!("{}", e.message()),
//! }
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod retry;
pub mod services;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use cache::{CacheStats, TtlCache};
pub use client::HttpClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientConfig;
pub use dedup::RequestDeduplicator;
pub use error::{ClientError, Result};
pub use limiter::{Debounce, Debounced, Throttle, Throttled};
pub use metrics::{ClientMetrics, MetricsSnapshot};
pub use middleware::{Pipeline, RequestContext, RequestInterceptor, ResponseInterceptor};
pub use models::{ApiResponse, RequestDescriptor};
pub use retry::RetryPolicy;
pub use services::{Faculty, FacultyService, Review, ReviewService};
pub use session::{CredentialStore, FileStore, MemoryNavigator, MemoryStore, Navigator, Session, StoredUser};
pub use transport::{ReqwestTransport, Transport, TransportError};
