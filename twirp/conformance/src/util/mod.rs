//! Runtime modules generated code imports by default.

pub mod ctxkit;
pub mod twirp;
