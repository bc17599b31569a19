//! Tests for core value types

mod containers;
