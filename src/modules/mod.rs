pub mod interactions;
pub mod logs;
pub mod rolesync;
pub mod selfroles;
pub mod stats;
pub mod support;
pub mod system;
pub mod utility;
