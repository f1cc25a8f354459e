pub mod dispatcher;
pub mod embedding;
pub mod registry;

pub use dispatcher::{CallContext, CallDispatcher, CallMode, Handler};
pub use embedding::EmbeddingAdapter;
pub use registry::{scan, EndpointLocation, EndpointRegistry};
