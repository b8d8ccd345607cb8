//! Photo Chat Common Library
//!
//! CLIとWeb(WASM)で共有されるセッション管理・アップロードパイプライン・
//! バックエンドゲートウェイ

pub mod types;
pub mod error;
pub mod media;
pub mod storage;
pub mod session;
pub mod mailbox;
pub mod gateway;
pub mod http;
pub mod pipeline;
pub mod chat;
pub mod prompts;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use types::{
    ChatMessage, ChatSeed, GraphEdge, GraphNode, KnowledgeGraph, Photo, PhotoListing, PhotoRef,
    ProfileSession, Role, UploadFile,
};
pub use error::{GatewayError, GatewayErrorKind, StorageError};
pub use storage::{DurableStorage, MemoryStorage};
pub use session::ProfileSessionStore;
pub use mailbox::SeedMailbox;
pub use gateway::{ApiRoutes, BackendGateway};
pub use http::HttpGateway;
pub use pipeline::{
    PipelineCause, PipelineError, PipelineStage, PipelineState, WorkflowCoordinator,
};
pub use chat::{ChatSession, SummaryKey, SummaryTracker};
pub use prompts::{fortune, Fortune, FORTUNES};
