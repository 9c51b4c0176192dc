pub mod handlers;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod vocab;
