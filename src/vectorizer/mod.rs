pub mod context;
pub mod corpus;
pub mod embedding;
pub mod encoder;
pub mod evaluate;
pub mod termsim;
pub mod tfidf;
pub mod token;
pub mod vocab;
