//! In-memory adapters.

mod in_memory_member_repository;

pub use in_memory_member_repository::InMemoryMemberRepository;
