pub mod action;
pub mod config;
pub mod context;
pub mod error;
pub mod flow;
pub mod interceptor;
pub mod package;
pub mod runner;
pub mod storage;
#[cfg(feature = "postgres")]
pub mod storage_postgres;
pub mod validation;

// Re-export commonly used types
pub use action::{Action, ActionFlowAware, Invocation, ResultCode};
pub use config::{FIRST_FLOW_ACTION, FlowConfig};
pub use context::Context;
pub use error::{FlowError, Result};
pub use flow::{ActionFlow, StepConfig, StepsData};
pub use interceptor::{ActionFlowInterceptor, Dispatch};
pub use package::{ActionKind, FlowPackage, FlowPackageBuilder};
pub use runner::FlowRunner;
pub use storage::{FlowState, InMemorySessionStorage, Session, SessionStorage};
#[cfg(feature = "postgres")]
pub use storage_postgres::PostgresSessionStorage;
pub use validation::ValidationErrors;
