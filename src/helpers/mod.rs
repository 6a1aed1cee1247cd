pub mod sort_helpers;
