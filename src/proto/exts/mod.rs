mod notification_ext;
mod path_ext;
mod value_ext;

#[cfg(test)]
mod path_ext_test;

pub use path_ext::*;
