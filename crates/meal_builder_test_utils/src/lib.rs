//! Shared test utilities: in-memory port implementations for fast tests and a
//! disposable PostgreSQL for adapter tests.

pub mod fakes;
pub mod memory;
pub mod pg;

pub use fakes::{FakeIdentityProvider, FakeImageStorage, RecordingChat, SentMessage};
pub use memory::InMemoryDb;
pub use pg::{create_test_db, drop_test_db};
