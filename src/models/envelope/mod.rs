pub mod envelope;


pub use envelope::{EnvelopeError, RequestEnvelope};
