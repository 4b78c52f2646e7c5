pub mod gap_filler;
pub mod moving_average;
