pub mod bootstrap;
pub mod console;
pub mod view_model;

#[cfg(test)]
pub(crate) mod test_support;
