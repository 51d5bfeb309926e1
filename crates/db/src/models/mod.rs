pub mod automation_log;
pub mod project;
pub mod requirement;
pub mod team_member;
pub mod template;

#[cfg(test)]
pub(crate) mod test_utils;
