pub mod periodic;
pub mod time;

#[cfg(test)]
mod time_test;
