mod fetch;
mod hooks;
mod script;

pub use fetch::{HttpScriptHost, ScriptEvaluator};
pub use hooks::ReadyHooks;
pub use script::{ScriptHost, ScriptLoader};
