pub mod token_persistence;
