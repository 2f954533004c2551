pub mod fixtures;

#[cfg(test)]
mod access_tests;
#[cfg(test)]
mod lead_tests;
#[cfg(test)]
mod task_tests;
#[cfg(test)]
mod user_tests;
#[cfg(test)]
mod target_tests;
