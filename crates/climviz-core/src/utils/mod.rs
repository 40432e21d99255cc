pub mod root_finding;
