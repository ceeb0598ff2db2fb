//! Integration tests for Catalog-Mapper

mod catalog_tests;
