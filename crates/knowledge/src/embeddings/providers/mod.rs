pub mod cohere;
pub mod mock;

pub use cohere::CohereEmbedder;
pub use mock::MockProvider;
