//! Integration tests: full scan cycles against in-memory venues.

mod mock_venue;
mod scan_cycle;
