//! Integration tests for the collab-kit hub.
//!
//! Exercises the real hub, room directory and publisher through
//! in-memory sessions, without real network connections.

#[cfg(test)]
mod harness;

#[cfg(test)]
mod tests;
