//! Integration tests for Shelf-Harvest

mod harvest_tests;
